use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    CommentView, ConversationView, MessageView, NotificationView, PostView, RoomCreatedView,
    RoomView, UserData,
};

// -- Session claims --

/// Signed session token payload shared by the handlers and the server
/// binary. Canonical definition lives here in unseen-types to eliminate
/// duplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub username: String,
    pub password: String,
    pub email: Option<String>,
    pub device_fingerprint: String,
    pub avatar_gradient: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub user: UserData,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub success: bool,
    pub user: UserData,
}

// -- Posts --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    pub content: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub voice_url: Option<String>,
    pub waveform: Option<Vec<f32>>,
    pub duration: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeRequest {
    pub post_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRequest {
    pub post_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    pub post_id: Option<String>,
    pub user_id: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentRequest {
    pub post_id: String,
    pub content: String,
    pub parent_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FeedResponse {
    pub success: bool,
    pub posts: Vec<PostView>,
    pub page: u32,
    pub limit: u32,
}

#[derive(Debug, Serialize)]
pub struct PostsResponse {
    pub success: bool,
    pub posts: Vec<PostView>,
}

#[derive(Debug, Serialize)]
pub struct CommentsResponse {
    pub success: bool,
    pub comments: Vec<CommentView>,
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub recipient_id: Option<String>,
    pub room_id: Option<String>,
    pub content: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub voice_url: Option<String>,
    pub waveform: Option<Vec<f32>>,
    pub duration: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct MessagesResponse {
    pub success: bool,
    pub messages: Vec<MessageView>,
}

#[derive(Debug, Serialize)]
pub struct ConversationsResponse {
    pub success: bool,
    pub conversations: Vec<ConversationView>,
}

// -- Rooms --

#[derive(Debug, Deserialize)]
pub struct CreateRoomRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoomRequest {
    pub room_id: String,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveRoomRequest {
    pub room_id: String,
}

#[derive(Debug, Serialize)]
pub struct CreateRoomResponse {
    pub success: bool,
    pub room: RoomCreatedView,
}

#[derive(Debug, Serialize)]
pub struct RoomsResponse {
    pub success: bool,
    pub rooms: Vec<RoomView>,
}

// -- Users --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowRequest {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub mood_tag: Option<String>,
    pub avatar_gradient: Option<String>,
}

// -- Notifications --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNotificationsRequest {
    pub notification_id: Option<String>,
    #[serde(default)]
    pub mark_all_as_read: bool,
}

#[derive(Debug, Serialize)]
pub struct NotificationsResponse {
    pub success: bool,
    pub notifications: Vec<NotificationView>,
}

// -- Uploads --

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub url: String,
    pub path: String,
}

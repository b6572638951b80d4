use serde::{Deserialize, Serialize};

/// Public slice of a user row embedded in posts, comments, messages,
/// rooms and notifications. Never carries the password hash or the
/// device fingerprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicProfile {
    pub id: String,
    pub username: String,
    pub display_name: String,
    pub avatar_gradient: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mood_tag: Option<String>,
}

/// Full sanitized user record returned from auth and profile endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct UserData {
    pub id: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub display_name: String,
    pub bio: String,
    pub avatar_gradient: String,
    pub avatar_url: Option<String>,
    pub mood_tag: String,
    pub is_banned: bool,
    pub report_count: i64,
    pub followers_count: i64,
    pub following_count: i64,
    pub posts_count: i64,
    pub created_at: String,
    #[serde(rename = "isFollowing", skip_serializing_if = "Option::is_none")]
    pub is_following: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    pub id: String,
    pub user_id: String,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub voice_url: Option<String>,
    pub waveform: Option<Vec<f32>>,
    pub duration: Option<f64>,
    pub likes_count: i64,
    pub comments_count: i64,
    pub is_reported: bool,
    pub created_at: String,
    pub user: PublicProfile,
    #[serde(rename = "isLiked")]
    pub is_liked: bool,
    #[serde(rename = "isSaved")]
    pub is_saved: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    pub id: String,
    pub post_id: String,
    pub user_id: String,
    pub content: String,
    pub parent_id: Option<String>,
    pub created_at: String,
    pub user: PublicProfile,
    #[serde(rename = "isLiked")]
    pub is_liked: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageView {
    pub id: String,
    pub sender_id: String,
    pub recipient_id: Option<String>,
    pub room_id: Option<String>,
    pub content: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub voice_url: Option<String>,
    pub waveform: Option<Vec<f32>>,
    pub duration: Option<f64>,
    pub is_read: bool,
    pub created_at: String,
    pub user: PublicProfile,
}

/// Latest-message-per-partner view over direct messages.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationView {
    pub id: String,
    pub profile: PublicProfile,
    #[serde(rename = "lastMessage")]
    pub last_message: String,
    pub timestamp: String,
    pub unread: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoomView {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub created_by: String,
    pub created_at: String,
    pub creator: PublicProfile,
    #[serde(rename = "isMember")]
    pub is_member: bool,
    #[serde(rename = "memberCount")]
    pub member_count: i64,
}

/// Room as returned from creation. The plaintext password for private
/// rooms appears here exactly once and is never retrievable again.
#[derive(Debug, Clone, Serialize)]
pub struct RoomCreatedView {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub created_by: String,
    pub created_at: String,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NotificationView {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
    pub profile_id: String,
    pub post_id: Option<String>,
    pub is_read: bool,
    pub created_at: String,
    pub profile: PublicProfile,
}

/// Database row types — these map directly to SQLite rows.
/// Distinct from the unseen-types API models to keep the DB layer
/// independent; handlers convert rows into response views.

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: String,
    pub username: String,
    pub password_hash: String,
    pub email: Option<String>,
    pub device_fingerprint: String,
    pub is_banned: bool,
    pub report_count: i64,
    pub bio: String,
    pub display_name: String,
    pub avatar_gradient: String,
    pub avatar_url: Option<String>,
    pub mood_tag: String,
    pub followers_count: i64,
    pub following_count: i64,
    pub posts_count: i64,
    pub created_at: String,
}

/// Post joined with its author's public profile fields.
#[derive(Debug, Clone)]
pub struct PostRow {
    pub id: String,
    pub user_id: String,
    pub content: String,
    pub kind: String,
    pub voice_url: Option<String>,
    pub waveform: Option<String>,
    pub duration: Option<f64>,
    pub likes_count: i64,
    pub comments_count: i64,
    pub is_reported: bool,
    pub created_at: String,
    pub author_username: String,
    pub author_display_name: String,
    pub author_avatar_gradient: String,
    pub author_mood_tag: String,
}

#[derive(Debug, Clone)]
pub struct CommentRow {
    pub id: String,
    pub post_id: String,
    pub user_id: String,
    pub content: String,
    pub parent_id: Option<String>,
    pub created_at: String,
    pub author_username: String,
    pub author_display_name: String,
    pub author_avatar_gradient: String,
}

/// Message joined with the sender's public profile fields.
#[derive(Debug, Clone)]
pub struct MessageRow {
    pub id: String,
    pub sender_id: String,
    pub recipient_id: Option<String>,
    pub room_id: Option<String>,
    pub content: Option<String>,
    pub kind: String,
    pub voice_url: Option<String>,
    pub waveform: Option<String>,
    pub duration: Option<f64>,
    pub is_read: bool,
    pub created_at: String,
    pub sender_username: String,
    pub sender_display_name: String,
    pub sender_avatar_gradient: String,
}

/// Direct message with both participants' profiles, used to build the
/// conversation list.
#[derive(Debug, Clone)]
pub struct DirectMessageRow {
    pub id: String,
    pub sender_id: String,
    pub recipient_id: String,
    pub content: Option<String>,
    pub is_read: bool,
    pub created_at: String,
    pub sender_username: String,
    pub sender_display_name: String,
    pub sender_avatar_gradient: String,
    pub recipient_username: String,
    pub recipient_display_name: String,
    pub recipient_avatar_gradient: String,
}

#[derive(Debug, Clone)]
pub struct RoomRow {
    pub id: String,
    pub name: String,
    pub kind: String,
    pub password_hash: Option<String>,
    pub created_by: String,
    pub created_at: String,
    pub creator_username: String,
    pub creator_display_name: String,
    pub creator_avatar_gradient: String,
    pub member_count: i64,
}

#[derive(Debug, Clone)]
pub struct NotificationRow {
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub content: String,
    pub profile_id: String,
    pub post_id: Option<String>,
    pub is_read: bool,
    pub created_at: String,
    pub actor_username: String,
    pub actor_display_name: String,
    pub actor_avatar_gradient: String,
}

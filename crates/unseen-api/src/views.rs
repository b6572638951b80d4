//! Row-to-response conversion. Strips secrets (password hash, device
//! fingerprint, room password hash) and attaches viewer-relative flags.

use unseen_db::models::{
    CommentRow, MessageRow, NotificationRow, PostRow, RoomRow, UserRow,
};
use unseen_types::models::{
    CommentView, MessageView, NotificationView, PostView, PublicProfile, RoomCreatedView,
    RoomView, UserData,
};

pub fn user_data(row: UserRow, is_following: Option<bool>) -> UserData {
    UserData {
        id: row.id,
        username: row.username,
        email: row.email,
        display_name: row.display_name,
        bio: row.bio,
        avatar_gradient: row.avatar_gradient,
        avatar_url: row.avatar_url,
        mood_tag: row.mood_tag,
        is_banned: row.is_banned,
        report_count: row.report_count,
        followers_count: row.followers_count,
        following_count: row.following_count,
        posts_count: row.posts_count,
        created_at: row.created_at,
        is_following,
    }
}

pub fn post_view(row: PostRow, is_liked: bool, is_saved: bool) -> PostView {
    PostView {
        user: PublicProfile {
            id: row.user_id.clone(),
            username: row.author_username,
            display_name: row.author_display_name,
            avatar_gradient: row.author_avatar_gradient,
            mood_tag: Some(row.author_mood_tag),
        },
        id: row.id,
        user_id: row.user_id,
        content: row.content,
        kind: row.kind,
        voice_url: row.voice_url,
        waveform: parse_waveform(row.waveform.as_deref()),
        duration: row.duration,
        likes_count: row.likes_count,
        comments_count: row.comments_count,
        is_reported: row.is_reported,
        created_at: row.created_at,
        is_liked,
        is_saved,
    }
}

pub fn comment_view(row: CommentRow, is_liked: bool) -> CommentView {
    CommentView {
        user: PublicProfile {
            id: row.user_id.clone(),
            username: row.author_username,
            display_name: row.author_display_name,
            avatar_gradient: row.author_avatar_gradient,
            mood_tag: None,
        },
        id: row.id,
        post_id: row.post_id,
        user_id: row.user_id,
        content: row.content,
        parent_id: row.parent_id,
        created_at: row.created_at,
        is_liked,
    }
}

pub fn message_view(row: MessageRow) -> MessageView {
    MessageView {
        user: PublicProfile {
            id: row.sender_id.clone(),
            username: row.sender_username,
            display_name: row.sender_display_name,
            avatar_gradient: row.sender_avatar_gradient,
            mood_tag: None,
        },
        id: row.id,
        sender_id: row.sender_id,
        recipient_id: row.recipient_id,
        room_id: row.room_id,
        content: row.content,
        kind: row.kind,
        voice_url: row.voice_url,
        waveform: parse_waveform(row.waveform.as_deref()),
        duration: row.duration,
        is_read: row.is_read,
        created_at: row.created_at,
    }
}

pub fn room_view(row: RoomRow, is_member: bool) -> RoomView {
    RoomView {
        creator: PublicProfile {
            id: row.created_by.clone(),
            username: row.creator_username,
            display_name: row.creator_display_name,
            avatar_gradient: row.creator_avatar_gradient,
            mood_tag: None,
        },
        id: row.id,
        name: row.name,
        kind: row.kind,
        created_by: row.created_by,
        created_at: row.created_at,
        is_member,
        member_count: row.member_count,
    }
}

/// Room as returned from create/join; never exposes the password hash.
pub fn room_created_view(row: RoomRow, password: Option<String>) -> RoomCreatedView {
    RoomCreatedView {
        id: row.id,
        name: row.name,
        kind: row.kind,
        created_by: row.created_by,
        created_at: row.created_at,
        password,
    }
}

pub fn notification_view(row: NotificationRow) -> NotificationView {
    NotificationView {
        profile: PublicProfile {
            id: row.profile_id.clone(),
            username: row.actor_username,
            display_name: row.actor_display_name,
            avatar_gradient: row.actor_avatar_gradient,
            mood_tag: None,
        },
        id: row.id,
        user_id: row.user_id,
        kind: row.kind,
        content: row.content,
        profile_id: row.profile_id,
        post_id: row.post_id,
        is_read: row.is_read,
        created_at: row.created_at,
    }
}

/// Waveforms are stored as JSON text; a corrupt value degrades to None
/// rather than failing the whole response.
pub fn parse_waveform(raw: Option<&str>) -> Option<Vec<f32>> {
    raw.and_then(|s| serde_json::from_str(s).ok())
}

pub fn encode_waveform(waveform: Option<&[f32]>) -> Option<String> {
    waveform.and_then(|w| serde_json::to_string(w).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waveform_roundtrip_and_corruption() {
        let encoded = encode_waveform(Some(&[0.1, 0.5, 0.9])).unwrap();
        assert_eq!(parse_waveform(Some(&encoded)), Some(vec![0.1, 0.5, 0.9]));
        assert_eq!(parse_waveform(Some("{corrupt")), None);
        assert_eq!(parse_waveform(None), None);
    }
}

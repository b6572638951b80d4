use std::collections::HashMap;

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::error;
use uuid::Uuid;

use unseen_db::messages::NewMessage;
use unseen_types::api::{ConversationsResponse, MessagesResponse, SendMessageRequest};
use unseen_types::models::{ConversationView, PublicProfile};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::identity::Auth;
use crate::views::{encode_waveform, message_view};

pub async fn send_message(
    State(state): State<AppState>,
    Auth(claims): Auth,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.content.as_deref().is_none_or(str::is_empty) && req.voice_url.is_none() {
        return Err(ApiError::Validation("Content or voice URL is required".into()));
    }

    match (&req.recipient_id, &req.room_id) {
        (None, None) => {
            return Err(ApiError::Validation("Recipient ID or Room ID is required".into()));
        }
        (Some(_), Some(_)) => {
            return Err(ApiError::Validation(
                "Provide either a recipient or a room, not both".into(),
            ));
        }
        (Some(recipient), None) => {
            if state.db.get_user_by_id(recipient)?.is_none() {
                return Err(ApiError::NotFound("Recipient not found".into()));
            }
        }
        (None, Some(room)) => {
            if state.db.get_room(room)?.is_none() {
                return Err(ApiError::NotFound("Room not found".into()));
            }
        }
    }

    let message_id = Uuid::new_v4().to_string();
    let waveform = encode_waveform(req.waveform.as_deref());

    state.db.insert_message(
        &message_id,
        &NewMessage {
            sender_id: &claims.sub.to_string(),
            recipient_id: req.recipient_id.as_deref(),
            room_id: req.room_id.as_deref(),
            content: req.content.as_deref(),
            kind: req.kind.as_deref().unwrap_or("text"),
            voice_url: req.voice_url.as_deref(),
            waveform: waveform.as_deref(),
            duration: req.duration,
        },
    )?;

    let message = state.db.get_message(&message_id)?.ok_or(ApiError::Internal)?;

    Ok(Json(serde_json::json!({
        "success": true,
        "message": message_view(message),
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchQuery {
    pub recipient_id: Option<String>,
    pub room_id: Option<String>,
}

/// Fetch a thread. Side effect on the direct-message path: the partner's
/// unread messages to the viewer are marked read.
pub async fn fetch_messages(
    State(state): State<AppState>,
    Auth(claims): Auth,
    Query(query): Query<FetchQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = match (&query.room_id, &query.recipient_id) {
        (Some(room_id), _) => state.db.room_messages(room_id)?,
        (None, Some(partner_id)) => {
            state.db.thread_with_partner(&claims.sub.to_string(), partner_id)?
        }
        (None, None) => {
            return Err(ApiError::Validation("Recipient ID or Room ID is required".into()));
        }
    };

    Ok(Json(MessagesResponse {
        success: true,
        messages: rows.into_iter().map(message_view).collect(),
    }))
}

pub async fn conversations(
    State(state): State<AppState>,
    Auth(claims): Auth,
) -> Result<impl IntoResponse, ApiError> {
    let viewer = claims.sub.to_string();

    let db_state = state.clone();
    let viewer_id = viewer.clone();
    let rows = tokio::task::spawn_blocking(move || db_state.db.direct_messages_for(&viewer_id))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal
        })??;

    // Group by partner; rows arrive newest-first, so the first message
    // seen for a partner is the conversation's latest.
    let mut order: Vec<String> = Vec::new();
    let mut by_partner: HashMap<String, ConversationView> = HashMap::new();

    for row in rows {
        let (partner_id, partner) = if row.sender_id == viewer {
            (
                row.recipient_id.clone(),
                PublicProfile {
                    id: row.recipient_id.clone(),
                    username: row.recipient_username.clone(),
                    display_name: row.recipient_display_name.clone(),
                    avatar_gradient: row.recipient_avatar_gradient.clone(),
                    mood_tag: None,
                },
            )
        } else {
            (
                row.sender_id.clone(),
                PublicProfile {
                    id: row.sender_id.clone(),
                    username: row.sender_username.clone(),
                    display_name: row.sender_display_name.clone(),
                    avatar_gradient: row.sender_avatar_gradient.clone(),
                    mood_tag: None,
                },
            )
        };

        let conversation = by_partner.entry(partner_id.clone()).or_insert_with(|| {
            order.push(partner_id.clone());
            ConversationView {
                id: partner_id,
                profile: partner,
                last_message: row
                    .content
                    .clone()
                    .unwrap_or_else(|| "🎤 Voice message".to_string()),
                timestamp: row.created_at.clone(),
                unread: 0,
            }
        });

        if row.recipient_id == viewer && !row.is_read {
            conversation.unread += 1;
        }
    }

    let conversations = order
        .into_iter()
        .filter_map(|id| by_partner.remove(&id))
        .collect();

    Ok(Json(ConversationsResponse {
        success: true,
        conversations,
    }))
}

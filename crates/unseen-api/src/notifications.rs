use axum::{Json, extract::State, response::IntoResponse};

use unseen_types::api::{NotificationsResponse, UpdateNotificationsRequest};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::identity::Auth;
use crate::views::notification_view;

const NOTIFICATION_PAGE: u32 = 50;

pub async fn list(
    State(state): State<AppState>,
    Auth(claims): Auth,
) -> Result<impl IntoResponse, ApiError> {
    let rows = state
        .db
        .notifications_for(&claims.sub.to_string(), NOTIFICATION_PAGE)?;

    Ok(Json(NotificationsResponse {
        success: true,
        notifications: rows.into_iter().map(notification_view).collect(),
    }))
}

pub async fn update(
    State(state): State<AppState>,
    Auth(claims): Auth,
    Json(req): Json<UpdateNotificationsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let viewer = claims.sub.to_string();

    if req.mark_all_as_read {
        state.db.mark_all_notifications_read(&viewer)?;
        return Ok(Json(serde_json::json!({
            "success": true,
            "message": "All notifications marked as read",
        })));
    }

    let Some(notification_id) = &req.notification_id else {
        return Err(ApiError::Validation(
            "Notification ID or markAllAsRead flag is required".into(),
        ));
    };

    state.db.mark_notification_read(&viewer, notification_id)?;

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Notification marked as read",
    })))
}

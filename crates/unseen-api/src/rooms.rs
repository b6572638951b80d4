use std::collections::HashSet;

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use rand::Rng;
use rand::distr::Alphanumeric;
use serde::Deserialize;
use uuid::Uuid;

use unseen_types::api::{
    CreateRoomRequest, CreateRoomResponse, JoinRoomRequest, LeaveRoomRequest, RoomsResponse,
};

use crate::auth::{AppState, hash_password, verify_password};
use crate::error::ApiError;
use crate::identity::Auth;
use crate::views::{room_created_view, room_view};

const ROOM_PASSWORD_LEN: usize = 8;

/// One-time password for private rooms; shown to the creator once,
/// stored only as a hash.
fn generate_room_password() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(ROOM_PASSWORD_LEN)
        .map(char::from)
        .collect()
}

pub async fn create_room(
    State(state): State<AppState>,
    Auth(claims): Auth,
    Json(req): Json<CreateRoomRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::Validation("Room name is required".into()));
    }

    let kind = req.kind.as_deref().unwrap_or("public");
    if kind != "public" && kind != "private" {
        return Err(ApiError::Validation("Room type must be public or private".into()));
    }

    let (plain_password, password_hash) = if kind == "private" {
        let plain = generate_room_password();
        let hash = hash_password(&plain)?;
        (Some(plain), Some(hash))
    } else {
        (None, None)
    };

    let room_id = Uuid::new_v4().to_string();
    state.db.create_room(
        &room_id,
        req.name.trim(),
        kind,
        password_hash.as_deref(),
        &claims.sub.to_string(),
    )?;

    let room = state.db.get_room(&room_id)?.ok_or(ApiError::Internal)?;

    Ok(Json(CreateRoomResponse {
        success: true,
        room: room_created_view(room, plain_password),
    }))
}

pub async fn join_room(
    State(state): State<AppState>,
    Auth(claims): Auth,
    Json(req): Json<JoinRoomRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let room = state
        .db
        .get_room(&req.room_id)?
        .ok_or_else(|| ApiError::NotFound("Room not found".into()))?;

    if room.kind == "private" {
        if let Some(hash) = &room.password_hash {
            let Some(password) = &req.password else {
                return Err(ApiError::Validation(
                    "Password is required for private rooms".into(),
                ));
            };
            if !verify_password(password, hash) {
                return Err(ApiError::Unauthorized("Invalid password".into()));
            }
        }
    }

    // Idempotent: joining a room twice is a no-op
    let newly_added = state.db.add_member(&req.room_id, &claims.sub.to_string())?;

    Ok(Json(serde_json::json!({
        "success": true,
        "message": if newly_added { "Joined room successfully" } else { "Already a member" },
        "room": room_created_view(room, None),
    })))
}

pub async fn leave_room(
    State(state): State<AppState>,
    Auth(claims): Auth,
    Json(req): Json<LeaveRoomRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.db.remove_member(&req.room_id, &claims.sub.to_string())?;

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Left room successfully",
    })))
}

#[derive(Debug, Deserialize)]
pub struct ListRoomsQuery {
    /// "public", "private" or "my"
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

pub async fn list_rooms(
    State(state): State<AppState>,
    Auth(claims): Auth,
    Query(query): Query<ListRoomsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let viewer = claims.sub.to_string();

    let rows = match query.kind.as_deref() {
        Some("my") => state.db.rooms_for_member(&viewer)?,
        Some(kind @ ("public" | "private")) => state.db.list_rooms(Some(kind))?,
        _ => state.db.list_rooms(None)?,
    };

    let member_of: HashSet<String> = state.db.member_room_ids(&viewer)?.into_iter().collect();

    let rooms = rows
        .into_iter()
        .map(|row| {
            let is_member = member_of.contains(&row.id);
            room_view(row, is_member)
        })
        .collect();

    Ok(Json(RoomsResponse {
        success: true,
        rooms,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use unseen_db::Database;
    use unseen_db::users::NewUser;
    use unseen_storage::Storage;
    use unseen_types::api::Claims;

    use crate::auth::AppStateInner;

    async fn test_state() -> AppState {
        let dir = std::env::temp_dir().join(format!("unseen-rooms-{}", Uuid::new_v4()));
        Arc::new(AppStateInner {
            db: Database::open_in_memory().unwrap(),
            storage: Storage::new(dir).await.unwrap(),
            jwt_secret: "test-secret".into(),
        })
    }

    fn seed_user(state: &AppState, id: &Uuid, username: &str) {
        state
            .db
            .create_user(
                &id.to_string(),
                &NewUser {
                    username,
                    password_hash: "x",
                    email: None,
                    device_fingerprint: "fp",
                    avatar_gradient: "g",
                    display_name: username,
                },
            )
            .unwrap();
    }

    fn claims(sub: Uuid, username: &str) -> Claims {
        Claims {
            sub,
            username: username.into(),
            exp: (chrono::Utc::now() + chrono::Duration::days(1)).timestamp() as usize,
        }
    }

    #[tokio::test]
    async fn private_room_join_checks_the_password() {
        let state = test_state().await;
        let host = Uuid::new_v4();
        let guest = Uuid::new_v4();
        seed_user(&state, &host, "host");
        seed_user(&state, &guest, "guest");

        let hash = hash_password("secret-pass").unwrap();
        state
            .db
            .create_room("r1", "sealed", "private", Some(&hash), &host.to_string())
            .unwrap();

        let join = |password: Option<&str>| JoinRoomRequest {
            room_id: "r1".into(),
            password: password.map(str::to_string),
        };

        let err = join_room(State(state.clone()), Auth(claims(guest, "guest")), Json(join(None)))
            .await
            .map(|_| ())
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let err = join_room(
            State(state.clone()),
            Auth(claims(guest, "guest")),
            Json(join(Some("wrong-pass"))),
        )
        .await
        .map(|_| ())
        .unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
        assert!(!state.db.is_member("r1", &guest.to_string()).unwrap());

        assert!(
            join_room(
                State(state.clone()),
                Auth(claims(guest, "guest")),
                Json(join(Some("secret-pass"))),
            )
            .await
            .is_ok()
        );
        assert!(state.db.is_member("r1", &guest.to_string()).unwrap());
    }

    #[test]
    fn room_password_is_eight_alphanumerics() {
        for _ in 0..32 {
            let password = generate_room_password();
            assert_eq!(password.len(), ROOM_PASSWORD_LEN);
            assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }

    #[test]
    fn room_password_hash_verifies() {
        let plain = generate_room_password();
        let hash = hash_password(&plain).unwrap();
        assert!(verify_password(&plain, &hash));
        assert!(!verify_password("AAAAAAAA", &hash) || plain == "AAAAAAAA");
    }
}

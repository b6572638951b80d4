use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;

use unseen_db::users::ProfileUpdate;
use unseen_types::api::{FollowRequest, MeResponse, PostsResponse, UpdateProfileRequest};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::identity::{Auth, MaybeAuth};
use crate::posts::annotate_posts;
use crate::views::user_data;

pub async fn follow(
    State(state): State<AppState>,
    Auth(claims): Auth,
    Json(req): Json<FollowRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = claims.sub.to_string();
    if req.user_id == actor {
        return Err(ApiError::Validation("Cannot follow yourself".into()));
    }

    let following = state
        .db
        .toggle_follow(&actor, &req.user_id)?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    Ok(Json(serde_json::json!({ "success": true, "following": following })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileQuery {
    pub user_id: Option<String>,
    pub username: Option<String>,
}

pub async fn get_profile(
    State(state): State<AppState>,
    MaybeAuth(claims): MaybeAuth,
    Query(query): Query<ProfileQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let user = match (&query.user_id, &query.username) {
        (Some(id), _) => state.db.get_user_by_id(id)?,
        (None, Some(username)) => state.db.get_user_by_username(username)?,
        (None, None) => {
            return Err(ApiError::Validation("User ID or username is required".into()));
        }
    }
    .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    let is_following = match &claims {
        Some(c) if c.sub.to_string() != user.id => {
            state.db.is_following(&c.sub.to_string(), &user.id)?
        }
        _ => false,
    };

    Ok(Json(MeResponse {
        success: true,
        user: user_data(user, Some(is_following)),
    }))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Auth(claims): Auth,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .db
        .update_profile(
            &claims.sub.to_string(),
            &ProfileUpdate {
                display_name: req.display_name.as_deref(),
                bio: req.bio.as_deref(),
                mood_tag: req.mood_tag.as_deref(),
                avatar_gradient: req.avatar_gradient.as_deref(),
            },
        )?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    Ok(Json(MeResponse {
        success: true,
        user: user_data(user, None),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPostsQuery {
    pub user_id: String,
}

pub async fn user_posts(
    State(state): State<AppState>,
    MaybeAuth(claims): MaybeAuth,
    Query(query): Query<UserPostsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = state.db.posts_by_user(&query.user_id)?;
    let viewer = claims.map(|c| c.sub.to_string());
    let posts = annotate_posts(&state.db, viewer.as_deref(), rows)?;

    Ok(Json(PostsResponse {
        success: true,
        posts,
    }))
}

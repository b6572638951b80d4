use std::collections::HashSet;

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::error;
use uuid::Uuid;

use unseen_db::Database;
use unseen_db::models::PostRow;
use unseen_db::posts::NewPost;
use unseen_db::social::CommentOutcome;
use unseen_types::api::{
    CommentRequest, CommentsResponse, CreatePostRequest, FeedResponse, LikeRequest,
    PostsResponse, ReportRequest, SaveRequest,
};
use unseen_types::models::PostView;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::identity::{Auth, MaybeAuth};
use crate::views::{comment_view, encode_waveform, post_view};

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    20
}

/// Row offset for a 1-based page. Saturates instead of overflowing on
/// absurd page numbers; a saturated offset just yields an empty page.
fn feed_offset(page: u32, limit: u32) -> u32 {
    page.saturating_sub(1).saturating_mul(limit)
}

pub async fn create_post(
    State(state): State<AppState>,
    Auth(claims): Auth,
    Json(req): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.content.trim().is_empty() {
        return Err(ApiError::Validation("Content is required".into()));
    }

    let post_id = Uuid::new_v4().to_string();
    let waveform = encode_waveform(req.waveform.as_deref());

    state.db.create_post(
        &post_id,
        &NewPost {
            user_id: &claims.sub.to_string(),
            content: &req.content,
            kind: req.kind.as_deref().unwrap_or("text"),
            voice_url: req.voice_url.as_deref(),
            waveform: waveform.as_deref(),
            duration: req.duration,
        },
    )?;

    let post = state.db.get_post(&post_id)?.ok_or(ApiError::Internal)?;

    Ok(Json(serde_json::json!({
        "success": true,
        "post": post_view(post, false, false),
    })))
}

pub async fn feed(
    State(state): State<AppState>,
    MaybeAuth(claims): MaybeAuth,
    Query(query): Query<FeedQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = query.page.max(1);
    let limit = query.limit.clamp(1, 100);
    let offset = feed_offset(page, limit);
    let viewer = claims.map(|c| c.sub.to_string());

    // Run blocking DB work off the async runtime
    let db_state = state.clone();
    let posts = tokio::task::spawn_blocking(move || {
        let rows = db_state.db.feed(limit, offset)?;
        annotate_posts(&db_state.db, viewer.as_deref(), rows)
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal
    })??;

    Ok(Json(FeedResponse {
        success: true,
        posts,
        page,
        limit,
    }))
}

pub async fn like_post(
    State(state): State<AppState>,
    Auth(claims): Auth,
    Json(req): Json<LikeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let liked = state
        .db
        .toggle_like(&claims.sub.to_string(), &req.post_id)?
        .ok_or_else(|| ApiError::NotFound("Post not found".into()))?;

    Ok(Json(serde_json::json!({ "success": true, "liked": liked })))
}

pub async fn save_post(
    State(state): State<AppState>,
    Auth(claims): Auth,
    Json(req): Json<SaveRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let saved = state
        .db
        .toggle_save(&claims.sub.to_string(), &req.post_id)?
        .ok_or_else(|| ApiError::NotFound("Post not found".into()))?;

    Ok(Json(serde_json::json!({ "success": true, "saved": saved })))
}

pub async fn saved_posts(
    State(state): State<AppState>,
    Auth(claims): Auth,
) -> Result<impl IntoResponse, ApiError> {
    let viewer = claims.sub.to_string();
    let rows = state.db.saved_posts(&viewer)?;
    let posts = annotate_posts(&state.db, Some(&viewer), rows)?;

    Ok(Json(PostsResponse {
        success: true,
        posts,
    }))
}

pub async fn report(
    State(state): State<AppState>,
    Auth(claims): Auth,
    Json(req): Json<ReportRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.post_id.is_none() && req.user_id.is_none() {
        return Err(ApiError::Validation("Post ID or User ID is required".into()));
    }

    let found = state.db.create_report(
        &Uuid::new_v4().to_string(),
        &claims.sub.to_string(),
        req.post_id.as_deref(),
        req.user_id.as_deref(),
        req.reason.as_deref().unwrap_or("No reason provided"),
    )?;
    if !found {
        return Err(ApiError::NotFound("Report target not found".into()));
    }

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Report submitted successfully",
    })))
}

pub async fn create_comment(
    State(state): State<AppState>,
    Auth(claims): Auth,
    Json(req): Json<CommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.content.trim().is_empty() {
        return Err(ApiError::Validation("Post ID and content are required".into()));
    }

    let comment_id = Uuid::new_v4().to_string();
    let outcome = state.db.create_comment(
        &comment_id,
        &claims.sub.to_string(),
        &req.post_id,
        &req.content,
        req.parent_id.as_deref(),
    )?;

    match outcome {
        CommentOutcome::Created => {}
        CommentOutcome::PostMissing => {
            return Err(ApiError::NotFound("Post not found".into()));
        }
        CommentOutcome::BadParent => {
            return Err(ApiError::Validation(
                "Parent comment must exist on the same post".into(),
            ));
        }
    }

    let comment = state.db.get_comment(&comment_id)?.ok_or(ApiError::Internal)?;

    Ok(Json(serde_json::json!({
        "success": true,
        "comment": comment_view(comment, false),
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentsQuery {
    pub post_id: String,
}

pub async fn get_comments(
    State(state): State<AppState>,
    MaybeAuth(claims): MaybeAuth,
    Query(query): Query<CommentsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = state.db.comments_for_post(&query.post_id)?;

    let liked: HashSet<String> = match &claims {
        Some(c) => {
            let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
            state
                .db
                .liked_comment_ids(&c.sub.to_string(), &ids)?
                .into_iter()
                .collect()
        }
        None => HashSet::new(),
    };

    let comments = rows
        .into_iter()
        .map(|row| {
            let is_liked = liked.contains(&row.id);
            comment_view(row, is_liked)
        })
        .collect();

    Ok(Json(CommentsResponse {
        success: true,
        comments,
    }))
}

/// Attach `isLiked`/`isSaved` flags for the viewer with two batch
/// lookups instead of per-post queries.
pub(crate) fn annotate_posts(
    db: &Database,
    viewer: Option<&str>,
    rows: Vec<PostRow>,
) -> anyhow::Result<Vec<PostView>> {
    let (liked, saved): (HashSet<String>, HashSet<String>) = match viewer {
        Some(viewer_id) => {
            let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
            (
                db.liked_post_ids(viewer_id, &ids)?.into_iter().collect(),
                db.saved_post_ids(viewer_id, &ids)?.into_iter().collect(),
            )
        }
        None => (HashSet::new(), HashSet::new()),
    };

    Ok(rows
        .into_iter()
        .map(|row| {
            let is_liked = liked.contains(&row.id);
            let is_saved = saved.contains(&row.id);
            post_view(row, is_liked, is_saved)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_offset_saturates_on_huge_pages() {
        assert_eq!(feed_offset(1, 20), 0);
        assert_eq!(feed_offset(3, 20), 40);
        assert_eq!(feed_offset(u32::MAX, 100), u32::MAX);
    }
}

use axum::{
    Json,
    extract::{Multipart, State},
    response::IntoResponse,
};

use unseen_types::api::UploadResponse;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::identity::Auth;

pub const MAX_AVATAR_BYTES: usize = 2 * 1024 * 1024;
pub const MAX_VOICE_BYTES: usize = 5 * 1024 * 1024;

struct Upload {
    bytes: Vec<u8>,
    content_type: String,
    extension: String,
}

/// Extension from a client filename. Anything other than a plain
/// alphanumeric suffix falls back to the default so client input can
/// never shape the storage path.
fn extension_of(filename: Option<&str>, default: &str) -> String {
    filename
        .and_then(|name| name.rsplit_once('.').map(|(_, ext)| ext))
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(str::to_string)
        .unwrap_or_else(|| default.to_string())
}

/// Pull the `file` field out of a multipart body. Size ceilings are
/// enforced here, before anything touches storage.
async fn read_file_field(
    multipart: &mut Multipart,
    max_bytes: usize,
    default_extension: &str,
) -> Result<Upload, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::Validation("Malformed multipart body".into()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        let extension = extension_of(field.file_name(), default_extension);

        let bytes = field
            .bytes()
            .await
            .map_err(|_| ApiError::Validation("Malformed multipart body".into()))?;

        if bytes.len() > max_bytes {
            return Err(ApiError::Validation(format!(
                "File size must be less than {}MB",
                max_bytes / (1024 * 1024)
            )));
        }

        return Ok(Upload {
            bytes: bytes.to_vec(),
            content_type,
            extension,
        });
    }

    Err(ApiError::Validation("File is required".into()))
}

pub async fn avatar(
    State(state): State<AppState>,
    Auth(claims): Auth,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let upload = read_file_field(&mut multipart, MAX_AVATAR_BYTES, "png").await?;

    if !upload.content_type.starts_with("image/") {
        return Err(ApiError::Validation("File must be an image".into()));
    }

    // One avatar per user; re-uploads replace it in place
    let path = format!("avatars/{}/avatar.{}", claims.sub, upload.extension);
    let url = state.storage.store(&path, &upload.bytes).await?;

    state.db.set_avatar_url(&claims.sub.to_string(), &url)?;

    Ok(Json(UploadResponse {
        success: true,
        url,
        path,
    }))
}

pub async fn voice(
    State(state): State<AppState>,
    Auth(claims): Auth,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let upload = read_file_field(&mut multipart, MAX_VOICE_BYTES, "webm").await?;

    if !upload.content_type.starts_with("audio/") {
        return Err(ApiError::Validation("File must be an audio file".into()));
    }

    let path = format!(
        "voice/{}/{}.{}",
        claims.sub,
        chrono::Utc::now().timestamp_millis(),
        upload.extension
    );
    let url = state.storage.store(&path, &upload.bytes).await?;

    Ok(Json(UploadResponse {
        success: true,
        url,
        path,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_comes_from_filename_or_default() {
        assert_eq!(extension_of(Some("clip.ogg"), "webm"), "ogg");
        assert_eq!(extension_of(Some("photo.tar.gz"), "png"), "gz");
        assert_eq!(extension_of(Some("noext"), "png"), "png");
        assert_eq!(extension_of(None, "png"), "png");
    }

    #[test]
    fn hostile_filenames_cannot_shape_the_path() {
        assert_eq!(extension_of(Some("x.ext/../../escape"), "webm"), "webm");
        assert_eq!(extension_of(Some("../../etc/passwd"), "webm"), "webm");
        assert_eq!(extension_of(Some("trailing."), "webm"), "webm");
    }
}

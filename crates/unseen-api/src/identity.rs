use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{DecodingKey, Validation, decode};

use unseen_types::api::Claims;

use crate::auth::AppState;
use crate::error::ApiError;

/// Authenticated viewer. Extraction rejects with 401 when the session
/// token is missing, malformed, expired or carries a bad signature.
pub struct Auth(pub Claims);

/// Viewer that may or may not be authenticated. Feed and profile reads
/// use this to compute viewer-relative flags without requiring login.
pub struct MaybeAuth(pub Option<Claims>);

/// Token travels in the `auth_token` cookie set at login, with an
/// Authorization bearer header as fallback for non-browser clients.
fn token_from_parts(parts: &Parts) -> Option<String> {
    let jar = CookieJar::from_headers(&parts.headers);
    if let Some(cookie) = jar.get("auth_token") {
        return Some(cookie.value().to_string());
    }

    parts
        .headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}

/// Fails closed: any verification problem yields None.
pub fn verify_token(secret: &str, token: &str) -> Option<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .ok()
}

impl FromRequestParts<AppState> for Auth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = token_from_parts(parts)
            .ok_or_else(|| ApiError::Unauthorized("Not authenticated".into()))?;
        let claims = verify_token(&state.jwt_secret, &token)
            .ok_or_else(|| ApiError::Unauthorized("Not authenticated".into()))?;
        Ok(Auth(claims))
    }
}

impl FromRequestParts<AppState> for MaybeAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let claims = token_from_parts(parts)
            .and_then(|token| verify_token(&state.jwt_secret, &token));
        Ok(MaybeAuth(claims))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::create_token;
    use uuid::Uuid;

    #[test]
    fn token_roundtrip() {
        let user_id = Uuid::new_v4();
        let token = create_token("test-secret", user_id, "ghost").unwrap();

        let claims = verify_token("test-secret", &token).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.username, "ghost");
    }

    #[test]
    fn wrong_secret_fails_closed() {
        let token = create_token("test-secret", Uuid::new_v4(), "ghost").unwrap();
        assert!(verify_token("other-secret", &token).is_none());
    }

    #[test]
    fn garbage_token_fails_closed() {
        assert!(verify_token("test-secret", "not.a.jwt").is_none());
        assert!(verify_token("test-secret", "").is_none());
    }

    #[test]
    fn expired_token_fails_closed() {
        use jsonwebtoken::{EncodingKey, Header, encode};
        use unseen_types::api::Claims;

        let claims = Claims {
            sub: Uuid::new_v4(),
            username: "ghost".into(),
            exp: (chrono::Utc::now() - chrono::Duration::hours(1)).timestamp() as usize,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        assert!(verify_token("test-secret", &token).is_none());
    }
}

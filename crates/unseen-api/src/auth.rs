use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, response::IntoResponse};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{EncodingKey, Header, encode};
use uuid::Uuid;

use unseen_db::Database;
use unseen_db::users::NewUser;
use unseen_storage::Storage;
use unseen_types::api::{AuthResponse, Claims, LoginRequest, MeResponse, SignupRequest};

use crate::error::ApiError;
use crate::identity::Auth;
use crate::views::user_data;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub storage: Storage,
    pub jwt_secret: String,
}

const DEFAULT_AVATAR_GRADIENT: &str = "from-violet-600 via-purple-600 to-indigo-600";

pub async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // Validate input
    if req.username.len() < 3 || req.username.len() > 32 {
        return Err(ApiError::Validation(
            "Username must be between 3 and 32 characters".into(),
        ));
    }
    if req.password.len() < 8 {
        return Err(ApiError::Validation(
            "Password must be at least 8 characters".into(),
        ));
    }
    if req.device_fingerprint.trim().is_empty() {
        return Err(ApiError::Validation("Device fingerprint is required".into()));
    }

    // Check if username is taken
    if state.db.get_user_by_username(&req.username)?.is_some() {
        return Err(ApiError::Conflict("Username already taken".into()));
    }

    let password_hash = hash_password(&req.password)?;
    let user_id = Uuid::new_v4();

    state.db.create_user(
        &user_id.to_string(),
        &NewUser {
            username: &req.username,
            password_hash: &password_hash,
            email: req.email.as_deref(),
            device_fingerprint: &req.device_fingerprint,
            avatar_gradient: req
                .avatar_gradient
                .as_deref()
                .unwrap_or(DEFAULT_AVATAR_GRADIENT),
            display_name: req.display_name.as_deref().unwrap_or(&req.username),
        },
    )?;

    // Per-device account counter; informational only
    state.db.track_device(&req.device_fingerprint)?;

    let user = state
        .db
        .get_user_by_id(&user_id.to_string())?
        .ok_or(ApiError::Internal)?;

    let token = create_token(&state.jwt_secret, user_id, &req.username)?;
    let jar = jar.add(auth_cookie(&token));

    Ok((
        jar,
        Json(AuthResponse {
            success: true,
            user: user_data(user, None),
            token,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.username.is_empty() || req.password.is_empty() {
        return Err(ApiError::Validation(
            "Username and password are required".into(),
        ));
    }

    let user = state
        .db
        .get_user_by_username(&req.username)?
        .ok_or_else(|| ApiError::Unauthorized("Invalid username or password".into()))?;

    if user.is_banned {
        return Err(ApiError::Forbidden(
            "Your account has been banned due to multiple reports. Please contact support.".into(),
        ));
    }

    if !verify_password(&req.password, &user.password_hash) {
        return Err(ApiError::Unauthorized("Invalid username or password".into()));
    }

    let user_id: Uuid = user.id.parse().map_err(|_| ApiError::Internal)?;
    let token = create_token(&state.jwt_secret, user_id, &user.username)?;
    let jar = jar.add(auth_cookie(&token));

    Ok((
        jar,
        Json(AuthResponse {
            success: true,
            user: user_data(user, None),
            token,
        }),
    ))
}

pub async fn me(
    State(state): State<AppState>,
    Auth(claims): Auth,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .db
        .get_user_by_id(&claims.sub.to_string())?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    if user.is_banned {
        return Err(ApiError::Forbidden("Your account has been banned".into()));
    }

    Ok(Json(MeResponse {
        success: true,
        user: user_data(user, None),
    }))
}

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|_| ApiError::Internal)?
        .to_string();
    Ok(hash)
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed_hash) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

pub fn create_token(secret: &str, user_id: Uuid, username: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// Session cookie: HTTP-only, lax, whole app, 30 days. Matches the
/// token's own expiry; there is no refresh, clients re-authenticate.
fn auth_cookie(token: &str) -> Cookie<'static> {
    Cookie::build(("auth_token", token.to_string()))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::days(30))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_state() -> AppState {
        let dir = std::env::temp_dir().join(format!("unseen-auth-{}", Uuid::new_v4()));
        Arc::new(AppStateInner {
            db: Database::open_in_memory().unwrap(),
            storage: Storage::new(dir).await.unwrap(),
            jwt_secret: "test-secret".into(),
        })
    }

    fn signup_req(username: &str) -> SignupRequest {
        SignupRequest {
            username: username.into(),
            password: "a-long-password".into(),
            email: None,
            device_fingerprint: "fp-test".into(),
            avatar_gradient: None,
            display_name: None,
        }
    }

    #[tokio::test]
    async fn banned_account_is_rejected_at_login_and_me() {
        let state = test_state().await;
        assert!(
            signup(State(state.clone()), CookieJar::new(), Json(signup_req("ghost")))
                .await
                .is_ok()
        );

        state
            .db
            .with_conn(|conn| {
                conn.execute("UPDATE users SET is_banned = 1 WHERE username = 'ghost'", [])?;
                Ok(())
            })
            .unwrap();

        let err = login(
            State(state.clone()),
            CookieJar::new(),
            Json(LoginRequest {
                username: "ghost".into(),
                password: "a-long-password".into(),
            }),
        )
        .await
        .map(|_| ())
        .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));

        let user = state.db.get_user_by_username("ghost").unwrap().unwrap();
        let claims = Claims {
            sub: user.id.parse().unwrap(),
            username: user.username,
            exp: (chrono::Utc::now() + chrono::Duration::days(1)).timestamp() as usize,
        };
        let err = me(State(state), Auth(claims)).await.map(|_| ()).unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("hunter22-but-longer").unwrap();
        assert!(verify_password("hunter22-but-longer", &hash));
        assert!(!verify_password("wrong-password", &hash));
    }

    #[test]
    fn corrupt_hash_never_verifies() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }

    #[test]
    fn auth_cookie_shape() {
        let cookie = auth_cookie("tok");
        assert!(cookie.http_only().unwrap_or(false));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(time::Duration::days(30)));
    }
}

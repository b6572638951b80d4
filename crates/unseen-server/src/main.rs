use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use unseen_api::auth::{self, AppState, AppStateInner};
use unseen_api::uploads::{self, MAX_VOICE_BYTES};
use unseen_api::{messages, notifications, posts, rooms, users};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "unseen=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("UNSEEN_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let db_path = std::env::var("UNSEEN_DB_PATH").unwrap_or_else(|_| "unseen.db".into());
    let upload_dir = std::env::var("UNSEEN_UPLOAD_DIR").unwrap_or_else(|_| "uploads".into());
    let host = std::env::var("UNSEEN_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("UNSEEN_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    // Init database and upload storage
    let db = unseen_db::Database::open(&PathBuf::from(&db_path))?;
    let storage = unseen_storage::Storage::new(PathBuf::from(&upload_dir)).await?;
    let uploads_root = storage.root().clone();

    // Shared state
    let state: AppState = Arc::new(AppStateInner {
        db,
        storage,
        jwt_secret,
    });

    // Routes; authentication is enforced per-handler by the extractors
    let api = Router::new()
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        .route("/posts/create", post(posts::create_post))
        .route("/posts/feed", get(posts::feed))
        .route("/posts/like", post(posts::like_post))
        .route("/posts/save", post(posts::save_post).get(posts::saved_posts))
        .route("/posts/report", post(posts::report))
        .route(
            "/posts/comment",
            post(posts::create_comment).get(posts::get_comments),
        )
        .route("/messages/send", post(messages::send_message))
        .route("/messages/fetch", get(messages::fetch_messages))
        .route("/messages/conversations", get(messages::conversations))
        .route("/rooms/create", post(rooms::create_room))
        .route("/rooms/join", post(rooms::join_room))
        .route("/rooms/leave", post(rooms::leave_room))
        .route("/rooms/list", get(rooms::list_rooms))
        .route("/users/follow", post(users::follow))
        .route(
            "/users/profile",
            get(users::get_profile).put(users::update_profile),
        )
        .route("/users/posts", get(users::user_posts))
        .route(
            "/notifications",
            get(notifications::list).put(notifications::update),
        )
        .route("/upload/avatar", post(uploads::avatar))
        .route("/upload/voice", post(uploads::voice))
        // Voice clips are the largest allowed upload; leave headroom for
        // the multipart framing around them.
        .layer(DefaultBodyLimit::max(MAX_VOICE_BYTES + 64 * 1024))
        .with_state(state);

    let app = Router::new()
        .merge(api)
        .nest_service("/uploads", ServeDir::new(uploads_root))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("UNSEEN server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

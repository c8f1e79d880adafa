use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use examroom_backend::{
    config::{get_config, init_config},
    database::pool::create_pool,
    middleware::{auth, rate_limit},
    routes, AppState,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    init_config()?;
    let config = get_config();

    let pool = create_pool().await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let app_state = AppState::new(pool);

    let base_routes = Router::new().route("/health", get(routes::health::health));

    // Staff control surface: session lifecycle and monitoring.
    let staff_api = Router::new()
        .route(
            "/api/staff/assignments/:assignment_id/session",
            post(routes::staff::get_or_create_session),
        )
        .route(
            "/api/staff/sessions/:session_id/start",
            post(routes::staff::start_session),
        )
        .route(
            "/api/staff/sessions/:session_id/end",
            post(routes::staff::end_session),
        )
        .route(
            "/api/staff/sessions/:session_id",
            get(routes::staff::get_session_state),
        )
        .route(
            "/api/staff/sessions/:session_id/cheating-summary",
            get(routes::staff::cheating_summary),
        )
        .route(
            "/api/staff/participants/:participant_id/kick",
            post(routes::staff::kick_participant),
        )
        .layer(axum::middleware::from_fn(auth::require_staff))
        .layer(axum::middleware::from_fn_with_state(
            rate_limit::SurfaceLimiter::new("staff", config.staff_rps),
            rate_limit::rps_middleware,
        ));

    // Student participation surface: presence, chat, rankings. Staff
    // tokens are accepted here too (the chat is shared); handlers
    // enforce per-record ownership.
    let room_api = Router::new()
        .route("/api/room/sessions/:session_id/join", post(routes::room::join))
        .route(
            "/api/room/sessions/:session_id/status",
            get(routes::room::get_status),
        )
        .route(
            "/api/room/sessions/:session_id/messages",
            get(routes::room::get_messages).post(routes::room::send_message),
        )
        .route(
            "/api/room/sessions/:session_id/messages/read",
            post(routes::room::mark_read),
        )
        .route(
            "/api/room/sessions/:session_id/rankings",
            get(routes::room::get_rankings),
        )
        .route(
            "/api/room/participants/:participant_id/heartbeat",
            post(routes::room::heartbeat),
        )
        .route(
            "/api/room/participants/:participant_id/ready",
            post(routes::room::set_ready),
        )
        .route(
            "/api/room/participants/:participant_id/events",
            post(routes::room::log_cheating_event),
        )
        .route(
            "/api/room/participants/:participant_id/disconnect",
            post(routes::room::disconnect),
        )
        .route(
            "/api/room/participants/:participant_id/complete",
            post(routes::room::complete),
        )
        .layer(axum::middleware::from_fn(auth::require_bearer_auth))
        .layer(axum::middleware::from_fn_with_state(
            rate_limit::SurfaceLimiter::new("room", config.student_rps),
            rate_limit::rps_middleware,
        ));

    let app = base_routes
        .merge(staff_api)
        .merge(room_api)
        .with_state(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(256 * 1024));

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

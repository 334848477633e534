use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    middleware,
    response::IntoResponse,
    routing::{delete, get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use faisca_api::middleware::require_auth;
use faisca_api::state::{AppState, AppStateInner};
use faisca_api::{chats, likes, matches, notifications};
use faisca_gateway::connection;
use faisca_gateway::dispatcher::Dispatcher;
use faisca_gateway::presence::PresenceTracker;

#[derive(Clone)]
struct ServerState {
    dispatcher: Dispatcher,
    presence: PresenceTracker,
    jwt_secret: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "faisca=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("FAISCA_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let db_path = std::env::var("FAISCA_DB_PATH").unwrap_or_else(|_| "faisca.db".into());
    let host = std::env::var("FAISCA_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("FAISCA_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    // Init database
    let db = Arc::new(faisca_db::Database::open(&PathBuf::from(&db_path))?);

    // Shared state
    let dispatcher = Dispatcher::new();
    let presence = PresenceTracker::new(dispatcher.clone());
    presence.clone().spawn_sweeper();

    let app_state: AppState = Arc::new(AppStateInner::new(db, dispatcher.clone()));

    let state = ServerState {
        dispatcher,
        presence,
        jwt_secret,
    };

    // Routes
    let protected_routes = Router::new()
        .route("/events/{event_id}/attendance", post(likes::set_attendance))
        .route("/events/{event_id}/candidates", get(likes::candidates))
        .route("/events/{event_id}/likes", post(likes::like))
        .route("/events/{event_id}/likes/{to_user}", delete(likes::retract_like))
        .route("/matches", get(matches::list_matches))
        .route("/matches/{match_id}/summary", get(matches::summary))
        .route("/matches/{match_id}/open", post(matches::open_chat))
        .route("/matches/{match_id}", delete(matches::unmatch))
        .route("/chats/{chat_id}/messages", get(chats::get_messages))
        .route("/chats/{chat_id}/messages", post(chats::send_message))
        .route("/chats/{chat_id}/read", post(chats::mark_read))
        .route("/chats/{chat_id}/delivered", post(chats::mark_delivered))
        .route("/notifications", get(notifications::list))
        .route("/notifications/read-all", post(notifications::mark_all_read))
        .route("/notifications/{id}/read", post(notifications::mark_read))
        .layer(middleware::from_fn(require_auth))
        .with_state(app_state);

    let ws_route = Router::new()
        .route("/gateway", get(ws_upgrade))
        .with_state(state);

    let app = Router::new()
        .merge(protected_routes)
        .merge(ws_route)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Faisca server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn ws_upgrade(State(state): State<ServerState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| {
        connection::handle_connection(socket, state.dispatcher, state.presence, state.jwt_secret)
    })
}

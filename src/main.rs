use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use std::{net::SocketAddr, sync::Arc};
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};
use uuid::Uuid;

mod data;
mod difficulty;
mod player;
mod protocol;
mod rng;
mod round;
mod session;

use data::ToyRegistry;
use difficulty::DifficultyRegistry;
use protocol::ServerMessage;
use session::GameSession;

// ============================================================================
// App State
// ============================================================================

#[derive(Clone)]
struct AppState {
    // Session ID -> GameSession
    sessions: Arc<DashMap<String, Arc<GameSession>>>,
    // Toy and difficulty registries (loaded from TOML at startup)
    toy_registry: Arc<ToyRegistry>,
    difficulty_registry: Arc<DifficultyRegistry>,
}

impl AppState {
    fn new() -> Self {
        let data_dir = std::path::Path::new("data");

        // Load toy catalog (built-in defaults plus TOML extensions)
        let mut toy_registry = ToyRegistry::with_defaults();
        if let Err(e) = toy_registry.load_from_directory(data_dir) {
            error!("Failed to load toy registry: {}", e);
        }

        // Load difficulty tiers
        let mut difficulty_registry = DifficultyRegistry::with_defaults();
        if let Err(e) = difficulty_registry.load_from_directory(data_dir) {
            error!("Failed to load difficulty registry: {}", e);
        }

        Self {
            sessions: Arc::new(DashMap::new()),
            toy_registry: Arc::new(toy_registry),
            difficulty_registry: Arc::new(difficulty_registry),
        }
    }
}

// ============================================================================
// HTTP Handlers
// ============================================================================

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().timestamp_millis()
    }))
}

async fn matchmake_join_or_create(
    State(state): State<AppState>,
    Path(room_name): Path<String>,
) -> impl IntoResponse {
    if room_name != "toystore" {
        warn!("Matchmaking rejected: unknown room type '{}'", room_name);
        return (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": format!("Unknown room type: {}", room_name) })),
        )
            .into_response();
    }

    let session_id = Uuid::new_v4().to_string();
    let player_id = Uuid::new_v4().to_string();

    let session = Arc::new(GameSession::new(
        session_id.clone(),
        player_id.clone(),
        state.toy_registry.catalog(),
        state.difficulty_registry.clone(),
    ));
    state.sessions.insert(session_id.clone(), session);

    info!("Created session {} for player {}", session_id, player_id);

    Json(serde_json::json!({
        "session_id": session_id,
        "player_id": player_id,
    }))
    .into_response()
}

// ============================================================================
// WebSocket Handler
// ============================================================================

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let session = state.sessions.get(&session_id).map(|s| s.clone());

    match session {
        Some(session) => ws.on_upgrade(move |socket| handle_socket(socket, state, session)),
        None => {
            warn!("WebSocket rejected: unknown session {}", session_id);
            (StatusCode::FORBIDDEN, "Invalid session").into_response()
        }
    }
}

async fn handle_socket(socket: WebSocket, state: AppState, session: Arc<GameSession>) {
    let (mut sender, mut receiver) = socket.split();

    info!(
        "Player {} connected to session {}",
        session.player_id, session.id
    );

    // Subscribe to session messages
    let mut broadcast_rx = session.subscribe();

    // Send welcome message
    let welcome = ServerMessage::Welcome {
        player_id: session.player_id.clone(),
        total_savings: session.total_savings().await,
    };
    if let Ok(bytes) = protocol::encode_server_message(&welcome) {
        let _ = sender.send(Message::Binary(bytes)).await;
    }

    // Spawn task to forward session messages to the WebSocket
    let mut send_task = tokio::spawn(async move {
        while let Ok(msg) = broadcast_rx.recv().await {
            if let Ok(bytes) = protocol::encode_server_message(&msg) {
                if sender.send(Message::Binary(bytes)).await.is_err() {
                    break;
                }
            }
        }
    });

    // Handle incoming messages
    let recv_session = session.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Binary(data) => match protocol::decode_client_message(&data) {
                    Ok(client_msg) => recv_session.handle_client_message(client_msg).await,
                    Err(e) => warn!("Error decoding message: {}", e),
                },
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // Wait for either task to finish, then tear both down
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    // The session dies with the connection: stop the countdown and drop it
    session.cancel_countdown().await;
    state.sessions.remove(&session.id);
    let duration = (chrono::Utc::now() - session.created_at).num_seconds();
    info!(
        "Player {} disconnected, session {} removed after {}s",
        session.player_id, session.id, duration
    );
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("toystore_server=info".parse().unwrap()),
        )
        .init();

    let state = AppState::new();

    // Build router
    let app = Router::new()
        // Health check
        .route("/health", get(health_check))
        // Matchmaking
        .route("/matchmake/joinOrCreate/:room", post(matchmake_join_or_create))
        // WebSocket
        .route("/:session_id", get(ws_handler))
        // In development, you may want CorsLayer::permissive()
        // For production, specify allowed origins explicitly
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers([axum::http::header::CONTENT_TYPE]),
        )
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], 2567));
    info!("Toy store server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

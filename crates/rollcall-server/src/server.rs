use std::path::Path;
use std::sync::Arc;

use axum::extract::ws::{WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::{Method, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::routing::{get, get_service, MethodRouter};
use axum::Router;
use rollcall_store::{AttendanceRepo, StudentRepo};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::client::{self, ClientId, ClientRegistry};
use crate::config::ServerConfig;
use crate::event_bridge;
use crate::handlers;

/// Shared application state passed to Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub students: Arc<StudentRepo>,
    pub attendance: Arc<AttendanceRepo>,
    pub client_registry: Arc<ClientRegistry>,
}

/// Build the Axum router with all routes. Unmatched GETs are served from
/// `public_dir`, falling back to its `index.html`; other methods get 404.
pub fn build_router(state: AppState, public_dir: &Path) -> Router {
    let shell: MethodRouter = get_service(
        ServeDir::new(public_dir).fallback(ServeFile::new(public_dir.join("index.html"))),
    )
    .fallback(not_found);

    Router::new()
        .route("/api/health", get(handlers::health))
        .route(
            "/api/attendance",
            get(handlers::list_attendance).post(handlers::create_attendance),
        )
        .route(
            "/api/students",
            get(handlers::list_students).post(handlers::register_student),
        )
        .route("/ws", get(ws_handler))
        .fallback_service(shell)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Create and start the server over fresh in-memory repositories.
pub async fn start(config: ServerConfig) -> Result<ServerHandle, std::io::Error> {
    let (event_tx, _) = broadcast::channel(config.broadcast_capacity.max(1));
    let students = StudentRepo::in_memory();
    let attendance = AttendanceRepo::in_memory(event_tx);
    start_with_repos(config, students, attendance).await
}

/// Create and start the server over the given repositories. Returns a
/// handle that keeps background tasks alive and shuts the server down.
pub async fn start_with_repos(
    config: ServerConfig,
    students: StudentRepo,
    attendance: AttendanceRepo,
) -> Result<ServerHandle, std::io::Error> {
    let client_registry = Arc::new(ClientRegistry::new(config.max_send_queue));

    let bridge = event_bridge::create_bridge(Arc::clone(&client_registry), attendance.subscribe());
    let cleanup = client::start_cleanup_task(Arc::clone(&client_registry), config.cleanup_interval);

    let state = AppState {
        students: Arc::new(students),
        attendance: Arc::new(attendance),
        client_registry: Arc::clone(&client_registry),
    };

    let router = build_router(state, &config.public_dir);
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    tracing::info!(port = local_addr.port(), public_dir = %config.public_dir.display(), "Rollcall server started");

    let shutdown = CancellationToken::new();
    let server_shutdown = shutdown.clone();
    let server = tokio::spawn(async move {
        let result = axum::serve(listener, router)
            .with_graceful_shutdown(async move { server_shutdown.cancelled().await })
            .await;
        if let Err(e) = result {
            tracing::error!(error = %e, "Server terminated");
        }
    });

    Ok(ServerHandle {
        port: local_addr.port(),
        clients: client_registry,
        shutdown,
        server,
        bridge,
        cleanup,
    })
}

/// Handle returned by `start()`; keeps background tasks alive.
pub struct ServerHandle {
    pub port: u16,
    clients: Arc<ClientRegistry>,
    shutdown: CancellationToken,
    server: tokio::task::JoinHandle<()>,
    bridge: tokio::task::JoinHandle<()>,
    cleanup: tokio::task::JoinHandle<()>,
}

impl ServerHandle {
    /// Registry of connected realtime listeners.
    pub fn clients(&self) -> &Arc<ClientRegistry> {
        &self.clients
    }

    /// Stop accepting connections, wait for in-flight requests, then stop
    /// the background tasks.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        if let Err(e) = self.server.await {
            tracing::warn!(error = %e, "Server task ended abnormally");
        }
        self.bridge.abort();
        self.cleanup.abort();
        tracing::info!("Rollcall server stopped");
    }
}

async fn not_found(method: Method, uri: Uri) -> impl IntoResponse {
    (StatusCode::NOT_FOUND, format!("Cannot {method} {}", uri.path()))
}

/// WebSocket upgrade handler.
///
/// The client is registered before the 101 response goes out, so a listener
/// whose handshake has completed never misses an event.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let (client_id, rx) = state.client_registry.register();
    let failed_id = client_id.clone();
    let failed_registry = Arc::clone(&state.client_registry);

    ws.on_failed_upgrade(move |e| {
        tracing::warn!(client_id = %failed_id, error = %e, "WebSocket upgrade failed");
        failed_registry.unregister(&failed_id);
    })
    .on_upgrade(move |socket| handle_socket(socket, client_id, rx, state))
}

/// Handle a new realtime listener.
async fn handle_socket(
    socket: WebSocket,
    client_id: ClientId,
    rx: tokio::sync::mpsc::Receiver<String>,
    state: AppState,
) {
    tracing::info!(client_id = %client_id, "New client connected");

    client::handle_ws_connection(socket, client_id.clone(), rx, state.client_registry).await;

    tracing::info!(client_id = %client_id, "Client disconnected");
}

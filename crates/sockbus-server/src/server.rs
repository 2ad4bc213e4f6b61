use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use sockbus_bus::Bus;
use sockbus_settings::{BusKind, Settings};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::form::FORM_PAGE;
use crate::session::{SessionRequest, SocketGateway};

/// Shared application state passed to axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<SocketGateway>,
    pub driver: BusKind,
}

/// Build the axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/socket/connect", get(connect_handler))
        .route("/v1/socket/form", get(form_handler))
        .route("/health", get(health_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Create and start the server. Returns a handle that can shut it
/// down.
pub async fn start(settings: &Settings, bus: Arc<dyn Bus>) -> std::io::Result<ServerHandle> {
    let gateway = Arc::new(SocketGateway::new(bus, settings.socket.clone()));
    let state = AppState {
        gateway,
        driver: settings.bus.driver,
    };
    let router = build_router(state);

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    let task = tokio::spawn(async move {
        let serve = axum::serve(listener, router)
            .with_graceful_shutdown(async move { signal.cancelled().await });
        if let Err(e) = serve.await {
            tracing::error!(error = %e, "server error");
        }
    });

    tracing::info!(addr = %local_addr, "gateway listening");
    Ok(ServerHandle {
        port: local_addr.port(),
        shutdown,
        task,
    })
}

/// Handle returned by [`start`]; owns the serve task.
pub struct ServerHandle {
    port: u16,
    shutdown: CancellationToken,
    task: tokio::task::JoinHandle<()>,
}

impl ServerHandle {
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Begin graceful shutdown.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Wait for the serve task to finish.
    pub async fn stopped(self) {
        let _ = self.task.await;
    }
}

#[derive(Debug, Deserialize)]
struct ConnectParams {
    username: Option<String>,
    topics: Option<String>,
}

/// WebSocket upgrade handler. Parameters are validated before the
/// upgrade is accepted, so a bad request costs no backend call.
async fn connect_handler(
    State(state): State<AppState>,
    Query(params): Query<ConnectParams>,
    ws: WebSocketUpgrade,
) -> Response {
    let request =
        match SessionRequest::from_query(params.username.as_deref(), params.topics.as_deref()) {
            Ok(request) => request,
            Err(e) => {
                tracing::debug!(error = %e, "connect request rejected");
                return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
            }
        };

    tracing::info!(
        username = %request.username,
        topics = %request.topics,
        "connection created for user"
    );
    let gateway = Arc::clone(&state.gateway);
    ws.on_upgrade(move |socket| async move { gateway.run_session(socket, request).await })
}

async fn form_handler() -> Html<&'static str> {
    Html(FORM_PAGE)
}

/// Liveness endpoint.
async fn health_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "driver": state.driver.as_str(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sockbus_bus::MemoryBus;

    fn test_settings() -> Settings {
        let mut settings = Settings::default();
        settings.server.port = 0;
        settings
    }

    #[test]
    fn build_router_creates_routes() {
        let state = AppState {
            gateway: Arc::new(SocketGateway::new(
                Arc::new(MemoryBus::new(16)),
                Settings::default().socket,
            )),
            driver: BusKind::Memory,
        };
        let _router = build_router(state);
    }

    #[tokio::test]
    async fn server_starts_and_serves_health() {
        let bus = Arc::new(MemoryBus::new(16));
        let handle = start(&test_settings(), bus).await.unwrap();
        assert!(handle.port() > 0);

        let url = format!("http://127.0.0.1:{}/health", handle.port());
        let resp = reqwest::get(&url).await.unwrap();
        assert_eq!(resp.status(), 200);

        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["driver"], "memory");

        handle.shutdown();
        handle.stopped().await;
    }

    #[tokio::test]
    async fn form_page_is_served() {
        let bus = Arc::new(MemoryBus::new(16));
        let handle = start(&test_settings(), bus).await.unwrap();

        let url = format!("http://127.0.0.1:{}/v1/socket/form", handle.port());
        let resp = reqwest::get(&url).await.unwrap();
        assert_eq!(resp.status(), 200);
        assert!(resp.text().await.unwrap().contains("/v1/socket/connect"));

        handle.shutdown();
        handle.stopped().await;
    }
}

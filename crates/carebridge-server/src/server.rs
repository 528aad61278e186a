//! Router assembly and server lifecycle.

use std::net::SocketAddr;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{config::AppConfig, handlers, middleware as app_middleware, state::AppState};

/// Builds the application router over the wired services.
pub fn build_app(state: AppState, cfg: &AppConfig) -> Router {
    let body_limit = cfg.server.body_limit_bytes;
    Router::new()
        // Health and info endpoints
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        // Patients
        .route("/patients", post(handlers::create_patient))
        .route(
            "/patients/{id}",
            get(handlers::read_patient).delete(handlers::delete_patient),
        )
        .route("/patients/{id}/transfer", post(handlers::transfer_patient))
        .route("/patients/{id}/doctors", get(handlers::list_doctors))
        .route(
            "/patients/{id}/doctors/{doctor_id}",
            put(handlers::assign_doctor).delete(handlers::unassign_doctor),
        )
        .route("/patients/{id}/status", post(handlers::request_status_change))
        .route(
            "/patients/{id}/feedback",
            post(handlers::create_feedback).get(handlers::list_feedback),
        )
        // Chats and messages
        .route("/chats", post(handlers::get_or_create_chat))
        .route(
            "/chats/{id}/messages",
            get(handlers::get_messages).post(handlers::send_message),
        )
        .route("/messages/{id}/read", post(handlers::mark_message_as_read))
        .with_state(state)
        // Middleware stack (order: request id -> cors -> trace -> body limit)
        .layer(middleware::from_fn(app_middleware::request_id))
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    use tracing::field::Empty;
                    let req_id = req
                        .extensions()
                        .get::<axum::http::HeaderValue>()
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("")
                        .to_string();
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri(),
                        http.status_code = Empty,
                        request_id = %req_id
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        span.record(
                            "http.status_code",
                            tracing::field::display(res.status().as_u16()),
                        );
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .layer(axum::extract::DefaultBodyLimit::max(body_limit))
}

/// A configured, ready-to-run server.
pub struct CareBridgeServer {
    addr: SocketAddr,
    app: Router,
}

impl CareBridgeServer {
    /// Serves until ctrl-c.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot bind or the server fails.
    pub async fn run(self) -> std::io::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!(addr = %self.addr, "CareBridge server listening");
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("shutdown signal received");
    }
}

/// Builder wiring configuration and state into a server.
pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
}

impl ServerBuilder {
    #[must_use]
    pub fn new(config: AppConfig) -> Self {
        Self {
            addr: config.addr(),
            config,
        }
    }

    #[must_use]
    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    #[must_use]
    pub fn build(self, state: AppState) -> CareBridgeServer {
        let app = build_app(state, &self.config);
        CareBridgeServer {
            addr: self.addr,
            app,
        }
    }
}

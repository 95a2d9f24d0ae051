//! Toxgate Server - HTTP API for chat toxicity analysis.
//!
//! This crate provides the HTTP API for the Toxgate service.
//!
//! ## Endpoints
//!
//! - `POST /analyze_chat` - Score a chat message for toxicity
//!
//! ## Example
//!
//! ```no_run
//! use toxgate_server::{AppState, Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let server = Server::new(ServerConfig::default(), AppState::unavailable()).unwrap();
//!     server.run().await.unwrap();
//! }
//! ```

pub mod error;
mod handlers;
pub mod models;
pub mod state;

use std::net::SocketAddr;

use axum::routing::post;
use axum::Router;
use socket2::{Domain, Protocol, Socket, Type};
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

pub use error::{ApiError, Result};
pub use state::{AppState, ClassifierSlot};

/// Default server port.
pub const DEFAULT_PORT: u16 = 5000;

/// Default server host (all interfaces).
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to (default: 0.0.0.0).
    pub host: String,
    /// Port to bind to (default: 5000).
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ServerConfig {
    /// Sets the port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}

/// Server error types.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to address.
    #[error("failed to bind to {0}: {1}")]
    BindError(SocketAddr, std::io::Error),

    /// Server runtime error.
    #[error("server error: {0}")]
    Runtime(String),
}

/// The HTTP API server.
pub struct Server {
    router: Router,
    addr: SocketAddr,
}

impl Server {
    /// Creates a new server with the given configuration and state.
    pub fn new(config: ServerConfig, state: AppState) -> std::result::Result<Self, ServerError> {
        // Permissive CORS: the endpoint is called from browser extension
        // content scripts
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        let router = Router::new()
            .route("/analyze_chat", post(handlers::analyze_chat))
            .layer(cors)
            .with_state(state);

        let addr = format!("{}:{}", config.host, config.port)
            .parse()
            .map_err(|e| ServerError::Runtime(format!("invalid address: {}", e)))?;

        Ok(Self { router, addr })
    }

    /// Returns the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Runs the server until shutdown.
    pub async fn run(self) -> std::result::Result<(), ServerError> {
        info!("Starting Toxgate API server on {}", self.addr);

        // Create socket with SO_REUSEADDR to allow binding even when
        // sockets are lingering in TIME_WAIT
        let socket = Socket::new(Domain::for_address(self.addr), Type::STREAM, Some(Protocol::TCP))
            .map_err(|e| ServerError::BindError(self.addr, e))?;

        socket
            .set_reuse_address(true)
            .map_err(|e| ServerError::BindError(self.addr, e))?;

        socket
            .bind(&self.addr.into())
            .map_err(|e| ServerError::BindError(self.addr, e))?;
        socket
            .listen(128)
            .map_err(|e| ServerError::BindError(self.addr, e))?;

        // Set non-blocking for tokio
        socket
            .set_nonblocking(true)
            .map_err(|e| ServerError::BindError(self.addr, e))?;

        let std_listener: std::net::TcpListener = socket.into();
        let listener = tokio::net::TcpListener::from_std(std_listener)
            .map_err(|e| ServerError::BindError(self.addr, e))?;

        axum::serve(listener, self.router)
            .await
            .map_err(|e| ServerError::Runtime(e.to_string()))?;

        Ok(())
    }

    /// Returns the router for testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use toxgate_core::classifier::{ClassifierError, LabelScore, TextClassifier};

    /// Classifier returning a fixed output for every input.
    struct FixedClassifier {
        output: Vec<LabelScore>,
    }

    impl TextClassifier for FixedClassifier {
        fn classify(
            &mut self,
            _text: &str,
        ) -> std::result::Result<Vec<LabelScore>, ClassifierError> {
            Ok(self.output.clone())
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    /// Classifier failing every call.
    struct FailingClassifier;

    impl TextClassifier for FailingClassifier {
        fn classify(
            &mut self,
            _text: &str,
        ) -> std::result::Result<Vec<LabelScore>, ClassifierError> {
            Err(ClassifierError::Inference(
                "inference tensor shape mismatch".to_string(),
            ))
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    fn app_with(state: AppState) -> Router {
        Router::new()
            .route("/analyze_chat", post(handlers::analyze_chat))
            .with_state(state)
    }

    fn app_with_output(output: Vec<LabelScore>) -> Router {
        app_with(AppState::new(ClassifierSlot::ready(FixedClassifier {
            output,
        })))
    }

    async fn post_analyze(app: Router, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri("/analyze_chat")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_analyze_toxic_message() {
        let app = app_with_output(vec![LabelScore::new("toxic", 0.87)]);

        let (status, body) =
            post_analyze(app, json!({"message": "you are worthless"})).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "you are worthless");
        assert!((body["score"].as_f64().unwrap() - 0.87).abs() < 0.001);
        assert_eq!(body["label"], "toxic");
    }

    #[tokio::test]
    async fn test_analyze_without_toxic_entry() {
        let app = app_with_output(vec![LabelScore::new("non-toxic", 0.95)]);

        let (status, body) = post_analyze(app, json!({"message": "good morning"})).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "success": true,
                "message": "good morning",
                "score": 0.0,
                "label": "non-toxic"
            })
        );
    }

    #[tokio::test]
    async fn test_first_toxic_entry_wins() {
        let app = app_with_output(vec![
            LabelScore::new("toxic", 0.25),
            LabelScore::new("toxic", 0.75),
        ]);

        let (status, body) = post_analyze(app, json!({"message": "hello"})).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["score"], 0.25);
        assert_eq!(body["label"], "non-toxic");
    }

    #[tokio::test]
    async fn test_threshold_boundary_is_non_toxic() {
        let app = app_with_output(vec![LabelScore::new("toxic", 0.5)]);

        let (status, body) = post_analyze(app, json!({"message": "borderline"})).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["score"], 0.5);
        assert_eq!(body["label"], "non-toxic");
    }

    #[tokio::test]
    async fn test_empty_message_rejected() {
        let app = app_with_output(vec![LabelScore::new("toxic", 0.9)]);

        let (status, body) = post_analyze(app, json!({"message": ""})).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "No 'message' field provided"}));
    }

    #[tokio::test]
    async fn test_missing_message_rejected() {
        let app = app_with_output(vec![LabelScore::new("toxic", 0.9)]);

        let (status, body) = post_analyze(app, json!({})).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "No 'message' field provided"}));
    }

    #[tokio::test]
    async fn test_model_not_loaded() {
        let app = app_with(AppState::unavailable());

        let (status, body) = post_analyze(app, json!({"message": "hello"})).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"error": "NLP model not loaded"}));
    }

    #[tokio::test]
    async fn test_model_not_loaded_wins_over_empty_message() {
        let app = app_with(AppState::unavailable());

        let (status, body) = post_analyze(app, json!({"message": ""})).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"error": "NLP model not loaded"}));
    }

    #[tokio::test]
    async fn test_inference_failure() {
        let app = app_with(AppState::new(ClassifierSlot::ready(FailingClassifier)));

        let (status, body) = post_analyze(app, json!({"message": "hello"})).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            json!({"success": false, "error": "inference tensor shape mismatch"})
        );
    }

    #[tokio::test]
    async fn test_repeated_requests_are_identical() {
        let app = app_with_output(vec![LabelScore::new("toxic", 0.75)]);

        let (_, first) = post_analyze(app.clone(), json!({"message": "again"})).await;
        let (_, second) = post_analyze(app, json!({"message": "again"})).await;

        assert_eq!(first["score"], second["score"]);
        assert_eq!(first["label"], second["label"]);
        assert_eq!(first["label"], "toxic");
    }

    #[tokio::test]
    async fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[tokio::test]
    async fn test_server_config_with_port() {
        let config = ServerConfig::default().with_port(9000);
        assert_eq!(config.port, 9000);
    }

    #[tokio::test]
    async fn test_server_router_exposes_route() {
        let server = Server::new(ServerConfig::default(), AppState::unavailable()).unwrap();
        assert_eq!(server.addr().port(), DEFAULT_PORT);

        let (status, _) = post_analyze(server.router(), json!({"message": "hello"})).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}

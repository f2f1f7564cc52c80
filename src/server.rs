//! HTTP caption backend: `POST /api/generate-caption`.
//!
//! Keeps the upstream credential on the server. Clients send
//! `{topic, framework, model}` and receive `{caption}` or `{error}`:
//!
//! | Condition | Status | Body |
//! |-----------|--------|------|
//! | missing/blank field, bad JSON | 400 | `Missing required parameters: topic, framework, model` |
//! | no `OPENAI_API_KEY` | 500 | `AI service is not configured on the server.` |
//! | upstream non-success | upstream status | upstream `error.message` |
//! | transport failure | 500 | `Server error: …` |
//! | any method but POST | 405 | `Method not allowed` |
//! | success | 200 | `{"caption": …}` |

use crate::caption::NO_CONTENT_MESSAGE;
use crate::config::{CopywritingFramework, ServerConfig};
use crate::error::PostkitError;
use crate::prompts::{caption_system_prompt, caption_user_prompt};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// Route served by the backend.
pub const CAPTION_ROUTE: &str = "/api/generate-caption";

/// Why the backend could not produce a caption.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Missing required parameters: topic, framework, model")]
    MissingParameters,

    #[error("AI service is not configured on the server.")]
    NotConfigured,

    #[error("{message}")]
    Upstream { status: u16, message: String },

    #[error("Server error: {0}")]
    Transport(String),

    #[error("Method not allowed")]
    MethodNotAllowed,
}

impl BackendError {
    pub fn status(&self) -> StatusCode {
        match self {
            BackendError::MissingParameters => StatusCode::BAD_REQUEST,
            BackendError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            BackendError::NotConfigured | BackendError::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
            BackendError::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
        }
    }
}

impl IntoResponse for BackendError {
    fn into_response(self) -> Response {
        let mut response = (self.status(), Json(json!({ "error": self.to_string() }))).into_response();
        if matches!(self, BackendError::MethodNotAllowed) {
            response
                .headers_mut()
                .insert(header::ALLOW, HeaderValue::from_static("POST"));
        }
        response
    }
}

/// A validated caption request as received by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendRequest {
    pub topic: String,
    pub framework: CopywritingFramework,
    pub model: String,
}

impl BackendRequest {
    /// Parse a raw request body. Every field must be a non-blank string.
    pub fn from_body(body: &[u8]) -> Result<Self, BackendError> {
        let value: Value = serde_json::from_slice(body).map_err(|_| BackendError::MissingParameters)?;
        let field = |name: &str| {
            value
                .get(name)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .ok_or(BackendError::MissingParameters)
        };
        Ok(Self {
            topic: field("topic")?,
            framework: CopywritingFramework::parse_lossy(&field("framework")?),
            model: field("model")?,
        })
    }
}

/// Calls the OpenAI-compatible upstream on behalf of clients.
#[derive(Debug)]
pub struct CaptionBackend {
    client: reqwest::Client,
    config: ServerConfig,
}

impl CaptionBackend {
    pub fn new(config: ServerConfig) -> Result<Self, PostkitError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.upstream_timeout_secs))
            .build()
            .map_err(|e| PostkitError::InvalidConfig(format!("HTTP client: {e}")))?;
        if config.api_key.is_none() {
            warn!("OPENAI_API_KEY is not set; every caption request will fail");
        }
        Ok(Self { client, config })
    }

    /// Produce one caption. Exactly one upstream call, no retries.
    pub async fn generate(&self, request: &BackendRequest) -> Result<String, BackendError> {
        let api_key = self.config.api_key.as_deref().ok_or(BackendError::NotConfigured)?;

        let url = format!(
            "{}/v1/chat/completions",
            self.config.upstream_base_url.trim_end_matches('/')
        );
        let body = json!({
            "model": request.model,
            "messages": [
                { "role": "system", "content": caption_system_prompt(request.framework) },
                { "role": "user", "content": caption_user_prompt(&request.topic) },
            ],
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
            "top_p": 1,
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let status = response.status();
        let payload: Option<Value> = response.json().await.ok();

        if !status.is_success() {
            let message = payload
                .as_ref()
                .and_then(|v| v.pointer("/error/message"))
                .and_then(Value::as_str)
                .unwrap_or("Failed to fetch from upstream provider")
                .to_string();
            return Err(BackendError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        Ok(payload
            .as_ref()
            .and_then(|v| v.pointer("/choices/0/message/content"))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(NO_CONTENT_MESSAGE)
            .to_string())
    }
}

async fn generate_caption(State(backend): State<Arc<CaptionBackend>>, body: Bytes) -> Response {
    let result = match BackendRequest::from_body(&body) {
        Ok(request) => {
            info!("Caption request: framework={} model={}", request.framework, request.model);
            backend.generate(&request).await
        }
        Err(e) => Err(e),
    };

    match result {
        Ok(caption) => (StatusCode::OK, Json(json!({ "caption": caption }))).into_response(),
        Err(e) => {
            if e.status().is_server_error() {
                error!("Caption request failed: {}", e);
            } else {
                warn!("Caption request rejected: {}", e);
            }
            e.into_response()
        }
    }
}

async fn method_not_allowed() -> BackendError {
    BackendError::MethodNotAllowed
}

/// Router exposing [`CAPTION_ROUTE`]. Other methods on the route answer 405
/// with the usual `{error}` body.
pub fn router(backend: Arc<CaptionBackend>) -> Router {
    Router::new()
        .route(
            CAPTION_ROUTE,
            post(generate_caption).fallback(method_not_allowed),
        )
        .with_state(backend)
}

/// Serve on an already-bound listener until Ctrl-C.
pub async fn serve_on(listener: TcpListener, config: ServerConfig) -> Result<(), PostkitError> {
    let backend = Arc::new(CaptionBackend::new(config)?);
    if let Ok(addr) = listener.local_addr() {
        info!("Caption backend listening on http://{}{}", addr, CAPTION_ROUTE);
    }
    axum::serve(listener, router(backend))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .map_err(|e| PostkitError::Internal(format!("Server error: {e}")))
}

/// Bind `config.listen_addr` and serve until Ctrl-C.
pub async fn serve(config: ServerConfig) -> Result<(), PostkitError> {
    let listener = TcpListener::bind(&config.listen_addr).await.map_err(|e| {
        PostkitError::InvalidConfig(format!("Cannot listen on {}: {}", config.listen_addr, e))
    })?;
    serve_on(listener, config).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_requires_all_fields() {
        for body in [
            r#"{"topic":"a","framework":"aida"}"#,
            r#"{"topic":"  ","framework":"aida","model":"m"}"#,
            r#"{"topic":"a","framework":"aida","model":7}"#,
            "not json",
            "",
        ] {
            let err = BackendRequest::from_body(body.as_bytes()).unwrap_err();
            assert!(matches!(err, BackendError::MissingParameters), "{body}");
        }
    }

    #[test]
    fn unknown_framework_falls_back_to_auto() {
        let req = BackendRequest::from_body(br#"{"topic":"a","framework":"haiku","model":"m"}"#).unwrap();
        assert_eq!(req.framework, CopywritingFramework::Auto);
    }

    #[test]
    fn error_statuses() {
        assert_eq!(BackendError::MissingParameters.status(), StatusCode::BAD_REQUEST);
        assert_eq!(BackendError::NotConfigured.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            BackendError::Upstream { status: 429, message: "slow down".into() }.status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            BackendError::Transport("refused".into()).to_string(),
            "Server error: refused"
        );
    }

    #[tokio::test]
    async fn method_not_allowed_has_json_body_and_allow_header() {
        let response = method_not_allowed().await.into_response();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[header::ALLOW], "POST");
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value, json!({ "error": "Method not allowed" }));
    }

    #[tokio::test]
    async fn missing_key_is_not_configured_without_calling() {
        let backend = CaptionBackend::new(ServerConfig {
            upstream_base_url: "http://127.0.0.1:9".into(),
            ..ServerConfig::default()
        })
        .unwrap();
        let req = BackendRequest {
            topic: "a".into(),
            framework: CopywritingFramework::Auto,
            model: "m".into(),
        };
        assert!(matches!(backend.generate(&req).await, Err(BackendError::NotConfigured)));
    }
}

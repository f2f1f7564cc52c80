//! Caption client that goes through the caption backend over HTTP.

use super::{CaptionGenerator, CaptionRequest, NO_CONTENT_MESSAGE};
use crate::config::CaptionConfig;
use crate::error::{CaptionError, PostkitError};
use crate::pipeline::postprocess::clean_caption;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

/// POSTs `{topic, framework, model}` to a caption backend and reads `{caption}`.
#[derive(Debug, Clone)]
pub struct ProxyCaptionClient {
    client: reqwest::Client,
    endpoint: String,
    default_model: String,
}

impl ProxyCaptionClient {
    pub fn new(config: &CaptionConfig) -> Result<Self, PostkitError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| PostkitError::InvalidConfig(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            default_model: config.proxy_model.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn request(&self, request: &CaptionRequest) -> Result<String, CaptionError> {
        request.validate()?;

        let model = request.model.as_deref().unwrap_or(&self.default_model);
        let body = json!({
            "topic": request.topic.trim(),
            "framework": request.framework.as_str(),
            "model": model,
        });
        debug!("POST {} framework={} model={}", self.endpoint, request.framework, model);

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| CaptionError::Request(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| CaptionError::Request(e.to_string()))?;
        let parsed: Option<Value> = serde_json::from_str(&text).ok();

        if !status.is_success() {
            let message = parsed
                .as_ref()
                .and_then(|v| v.get("error"))
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("HTTP error! status: {}", status.as_u16()));
            return Err(CaptionError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        let caption = parsed
            .as_ref()
            .and_then(|v| v.get("caption"))
            .and_then(Value::as_str)
            .map(clean_caption)
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| NO_CONTENT_MESSAGE.to_string());
        Ok(caption)
    }
}

#[async_trait]
impl CaptionGenerator for ProxyCaptionClient {
    fn name(&self) -> &str {
        "proxy"
    }

    async fn generate_caption(&self, request: &CaptionRequest) -> String {
        match self.request(request).await {
            Ok(caption) => caption,
            Err(e) => {
                warn!("Caption request failed: {}", e);
                e.user_message()
            }
        }
    }
}

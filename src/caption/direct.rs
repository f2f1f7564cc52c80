//! In-process caption client built on an `edgequake-llm` provider.

use super::{CaptionGenerator, CaptionRequest, NO_CONTENT_MESSAGE};
use crate::config::CaptionConfig;
use crate::error::{CaptionError, PostkitError};
use crate::pipeline::postprocess::clean_caption;
use crate::prompts::{caption_system_prompt, caption_user_prompt};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Returned verbatim when no API key is configured for the direct path;
/// the user-facing form of [`CaptionError::NotConfigured`].
pub const DISABLED_MESSAGE: &str = "AI caption generation is disabled. Please configure the API Key.";

/// Calls an LLM provider directly, without a backend in between.
///
/// When no provider could be set up (API key missing) every call returns
/// [`DISABLED_MESSAGE`] instead of touching the network.
pub struct DirectCaptionClient {
    provider: Option<Arc<dyn LLMProvider>>,
    provider_name: String,
    system_prompt: Option<String>,
    temperature: f32,
    max_tokens: usize,
    timeout: Duration,
}

impl std::fmt::Debug for DirectCaptionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectCaptionClient")
            .field("provider_name", &self.provider_name)
            .field("enabled", &self.provider.is_some())
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl DirectCaptionClient {
    /// Create the client from configuration.
    ///
    /// The API key is read from `config.direct_api_key_env`. A missing or
    /// blank key yields a disabled client; a key the provider factory rejects
    /// is a configuration error.
    pub fn from_config(config: &CaptionConfig) -> Result<Self, PostkitError> {
        let key_present = std::env::var(&config.direct_api_key_env)
            .map(|k| !k.trim().is_empty())
            .unwrap_or(false);

        let provider = if key_present {
            let p = ProviderFactory::create_llm_provider(&config.direct_provider, &config.direct_model)
                .map_err(|e| {
                    PostkitError::InvalidConfig(format!(
                        "Could not create caption provider '{}': {}",
                        config.direct_provider, e
                    ))
                })?;
            info!(
                "Direct captions via {} / {}",
                config.direct_provider, config.direct_model
            );
            Some(p)
        } else {
            warn!(
                "{} is not set; AI caption generation is disabled",
                config.direct_api_key_env
            );
            None
        };

        Ok(Self::build(provider, config))
    }

    /// Use a pre-built provider, bypassing environment lookup.
    pub fn with_provider(provider: Arc<dyn LLMProvider>, config: &CaptionConfig) -> Self {
        Self::build(Some(provider), config)
    }

    fn build(provider: Option<Arc<dyn LLMProvider>>, config: &CaptionConfig) -> Self {
        Self {
            provider,
            provider_name: config.direct_provider.clone(),
            system_prompt: config.system_prompt.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.provider.is_some()
    }

    /// System and user messages for one request.
    fn messages(&self, request: &CaptionRequest) -> Vec<ChatMessage> {
        let system = self
            .system_prompt
            .clone()
            .unwrap_or_else(|| caption_system_prompt(request.framework));
        vec![
            ChatMessage::system(system),
            ChatMessage::user(caption_user_prompt(&request.topic)),
        ]
    }

    fn options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        }
    }

    async fn request(&self, request: &CaptionRequest) -> Result<String, CaptionError> {
        let provider = self.provider.as_ref().ok_or(CaptionError::NotConfigured)?;
        request.validate()?;

        if let Some(ref model) = request.model {
            debug!("Direct client ignores per-request model '{}'", model);
        }

        let start = Instant::now();
        let messages = self.messages(request);
        let options = self.options();

        let response = tokio::time::timeout(self.timeout, provider.chat(&messages, Some(&options)))
            .await
            .map_err(|_| CaptionError::Request(format!("timed out after {}s", self.timeout.as_secs())))?
            .map_err(|e| CaptionError::Request(e.to_string()))?;

        debug!(
            "Caption: {} input tokens, {} output tokens, {:?}",
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );

        let caption = clean_caption(&response.content);
        if caption.is_empty() {
            Ok(NO_CONTENT_MESSAGE.to_string())
        } else {
            Ok(caption)
        }
    }
}

#[async_trait]
impl CaptionGenerator for DirectCaptionClient {
    fn name(&self) -> &str {
        "direct"
    }

    async fn generate_caption(&self, request: &CaptionRequest) -> String {
        match self.request(request).await {
            Ok(caption) => caption,
            Err(CaptionError::NotConfigured) => CaptionError::NotConfigured.user_message(),
            Err(e) => {
                warn!("{} caption request failed: {}", self.provider_name, e);
                e.user_message()
            }
        }
    }
}

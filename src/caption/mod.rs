//! Caption generation: turn a topic and a copywriting framework into post text.
//!
//! Two implementations sit behind the [`CaptionGenerator`] trait:
//!
//! * [`ProxyCaptionClient`] — POSTs to a caption backend (see
//!   [`crate::server`]) that holds the upstream credential.
//! * [`DirectCaptionClient`] — calls an `edgequake-llm` provider in-process
//!   with a locally configured API key.
//!
//! Both make exactly one external call per invocation and never retry. Every
//! failure comes back as a string starting with `"Error:"`, so callers can
//! display the result without branching.

mod direct;
mod proxy;

pub use direct::{DirectCaptionClient, DISABLED_MESSAGE};
pub use proxy::ProxyCaptionClient;

use crate::config::{CaptionConfig, CaptionProvider, CopywritingFramework};
use crate::error::{CaptionError, PostkitError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Returned when the service answered successfully but with no text.
pub const NO_CONTENT_MESSAGE: &str = "No content generated.";

/// A single caption request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptionRequest {
    /// Free-text post subject. Must be non-empty after trimming.
    pub topic: String,
    pub framework: CopywritingFramework,
    /// Model override; the generator's configured model is used when `None`.
    pub model: Option<String>,
}

impl CaptionRequest {
    pub fn new(topic: impl Into<String>, framework: CopywritingFramework) -> Self {
        Self {
            topic: topic.into(),
            framework,
            model: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Reject requests that must not reach the network.
    pub(crate) fn validate(&self) -> Result<(), CaptionError> {
        if self.topic.trim().is_empty() {
            return Err(CaptionError::Validation("topic".into()));
        }
        Ok(())
    }
}

/// Something that can write a caption.
#[async_trait]
pub trait CaptionGenerator: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Generate a caption, or an `"Error: …"` string describing why not.
    async fn generate_caption(&self, request: &CaptionRequest) -> String;
}

/// Build the generator selected by `config.provider`.
pub fn build_generator(config: &CaptionConfig) -> Result<Arc<dyn CaptionGenerator>, PostkitError> {
    Ok(match config.provider {
        CaptionProvider::Proxy => Arc::new(ProxyCaptionClient::new(config)?),
        CaptionProvider::Direct => Arc::new(DirectCaptionClient::from_config(config)?),
    })
}

//! Post assembly: one finished caption per destination.
//!
//! A destination is a page identifier (normally an absolute URL) plus
//! optional contact text appended below the shared caption.

use crate::caption::{CaptionGenerator, CaptionRequest, DISABLED_MESSAGE};
use crate::error::CaptionFailed;
use crate::output::GeneratedPost;
use crate::pipeline::input::is_url;
use crate::store::DestinationStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Label of the single post produced when no destination is given.
pub const PLACEHOLDER_LABEL: &str = "Your Page Name";

/// Label for a destination that has contact text but no identifier.
pub const UNNAMED_LABEL: &str = "Default Page";

/// Separator between the caption and a destination's contact text.
pub const CONTACT_DELIMITER: &str = "\n\n---\n\n";

/// A page a post is addressed to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    pub identifier: String,
    pub contact_text: String,
}

impl Destination {
    pub fn new(identifier: impl Into<String>, contact_text: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            contact_text: contact_text.into(),
        }
    }

    /// Parse the CLI form `IDENTIFIER|CONTACT`; the contact part is optional.
    pub fn parse(s: &str) -> Self {
        match s.split_once('|') {
            Some((id, contact)) => Self::new(id.trim(), contact.trim()),
            None => Self::new(s.trim(), ""),
        }
    }

    /// Only destinations with an absolute http(s) identifier are saved.
    pub fn is_persistable(&self) -> bool {
        is_url(self.identifier.trim())
    }

    fn is_blank(&self) -> bool {
        self.identifier.trim().is_empty() && self.contact_text.trim().is_empty()
    }
}

/// Display label for a destination identifier.
///
/// The last non-empty path segment of an absolute URL, otherwise the
/// identifier itself, or [`UNNAMED_LABEL`] when it is empty.
pub fn destination_label(identifier: &str) -> String {
    if identifier.trim().is_empty() {
        return UNNAMED_LABEL.to_string();
    }
    reqwest::Url::parse(identifier.trim())
        .ok()
        .and_then(|url| {
            url.path_segments()?
                .filter(|s| !s.is_empty())
                .last()
                .map(str::to_string)
        })
        .unwrap_or_else(|| identifier.to_string())
}

/// Combine a base caption with each destination's contact text.
///
/// Always yields at least one post.
pub fn assemble(base_caption: &str, destinations: &[Destination]) -> Vec<GeneratedPost> {
    let base = base_caption.trim();
    let posts: Vec<_> = destinations
        .iter()
        .filter(|d| !d.is_blank())
        .map(|d| {
            let contact = d.contact_text.trim();
            let final_caption = if contact.is_empty() {
                base.to_string()
            } else {
                format!("{base}{CONTACT_DELIMITER}{contact}")
            };
            GeneratedPost {
                destination_label: destination_label(&d.identifier),
                final_caption,
            }
        })
        .collect();

    if posts.is_empty() {
        return vec![GeneratedPost {
            destination_label: PLACEHOLDER_LABEL.to_string(),
            final_caption: base.to_string(),
        }];
    }
    posts
}

/// Fill in missing contact text from previously saved destinations.
pub fn fill_contacts_from_store(store: &DestinationStore, destinations: &[Destination]) -> Vec<Destination> {
    destinations
        .iter()
        .map(|d| {
            if !d.contact_text.trim().is_empty() {
                return d.clone();
            }
            match store.get(&d.identifier) {
                Some(saved) => {
                    debug!("Using saved contact text for {}", d.identifier.trim());
                    Destination::new(d.identifier.clone(), saved)
                }
                None => d.clone(),
            }
        })
        .collect()
}

/// True when `caption` is a generator diagnostic rather than post text.
pub fn is_caption_failure(caption: &str) -> bool {
    caption.starts_with("Error:") || caption == DISABLED_MESSAGE
}

/// Save the destinations, request one caption and assemble the posts.
///
/// Persistable destinations are merged into `store` before the caption is
/// requested, so they are remembered even when generation fails. The save
/// runs on the blocking thread pool.
pub async fn generate_posts(
    generator: &dyn CaptionGenerator,
    store: Option<&Arc<DestinationStore>>,
    request: &CaptionRequest,
    destinations: &[Destination],
) -> Result<Vec<GeneratedPost>, CaptionFailed> {
    if let Some(store) = store {
        store.merge_in_background(destinations).await;
    }

    let caption = generator.generate_caption(request).await;
    if is_caption_failure(&caption) {
        return Err(CaptionFailed(caption));
    }

    let posts = assemble(&caption, destinations);
    info!("Assembled {} posts via {}", posts.len(), generator.name());
    Ok(posts)
}

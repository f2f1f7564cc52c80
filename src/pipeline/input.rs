//! Input resolution: load a user-supplied path or URL into an in-memory asset.
//!
//! Assets are read fully into memory; decoding happens later in the batch
//! runner so that an undecodable image only fails its own slot. This stage
//! only fails for problems with the *source* (missing file, no permission,
//! download error).

use crate::error::PostkitError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// An encoded image asset (photo or logo) held in memory.
#[derive(Debug, Clone)]
pub struct ImageAsset {
    /// Display name: file name for local files, the URL for downloads.
    pub name: String,
    /// Encoded bytes; shared so batches can be re-run without copying.
    pub bytes: Arc<[u8]>,
}

impl ImageAsset {
    pub fn new(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Load an asset from a local path or an HTTP/HTTPS URL.
pub async fn load_asset(input: &str, timeout_secs: u64) -> Result<ImageAsset, PostkitError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        load_local(Path::new(input)).await
    }
}

/// Load several assets, preserving their order. Stops at the first failure.
pub async fn load_assets(inputs: &[String], timeout_secs: u64) -> Result<Vec<ImageAsset>, PostkitError> {
    let mut assets = Vec::with_capacity(inputs.len());
    for input in inputs {
        assets.push(load_asset(input, timeout_secs).await?);
    }
    Ok(assets)
}

/// Read a local file, mapping I/O failures to input errors.
async fn load_local(path: &Path) -> Result<ImageAsset, PostkitError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => PostkitError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => PostkitError::FileNotFound {
            path: path.to_path_buf(),
        },
    })?;

    debug!("Loaded local asset: {} ({} bytes)", path.display(), bytes.len());
    Ok(ImageAsset::new(display_name(path), bytes))
}

/// Download a URL into memory.
async fn download_url(url: &str, timeout_secs: u64) -> Result<ImageAsset, PostkitError> {
    info!("Downloading image from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| PostkitError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            PostkitError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            PostkitError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(PostkitError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| PostkitError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    info!("Downloaded {} bytes from {}", bytes.len(), url);
    Ok(ImageAsset::new(url, bytes.to_vec()))
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| PathBuf::from(path).display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/photo.jpg"));
        assert!(is_url("http://example.com/photo.jpg"));
        assert!(!is_url("/tmp/photo.jpg"));
        assert!(!is_url("photo.jpg"));
        assert!(!is_url("ftp://example.com/photo.jpg"));
        assert!(!is_url(""));
    }

    #[tokio::test]
    async fn missing_file_is_file_not_found() {
        let err = load_asset("/definitely/not/a/real/photo.jpg", 5)
            .await
            .unwrap_err();
        assert!(matches!(err, PostkitError::FileNotFound { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn local_file_is_loaded_with_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logo.png");
        std::fs::write(&path, b"\x89PNG fake").unwrap();

        let asset = load_asset(path.to_str().unwrap(), 5).await.unwrap();
        assert_eq!(asset.name, "logo.png");
        assert_eq!(&*asset.bytes, b"\x89PNG fake");
    }

    #[tokio::test]
    async fn load_assets_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut inputs = Vec::new();
        for i in 0..3 {
            let p = dir.path().join(format!("{i}.jpg"));
            std::fs::write(&p, [i as u8]).unwrap();
            inputs.push(p.to_string_lossy().into_owned());
        }
        let assets = load_assets(&inputs, 5).await.unwrap();
        let names: Vec<_> = assets.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["0.jpg", "1.jpg", "2.jpg"]);
    }
}

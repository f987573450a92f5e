//! Upload adapter: the single boundary between asset migration and the store.

use std::path::{Path, PathBuf};
use tracing::debug;

use super::{ObjectStore, StoreError};

/// Cache hint sent with every upload.
pub const CACHE_CONTROL: &str = "max-age=3600";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedObject {
    /// Public URL of the object.
    pub url: String,
    /// Object key inside the bucket, as echoed by the store.
    pub path: String,
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("local file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("bucket \"{0}\" does not exist; create it in the storage dashboard first")]
    BucketNotFound(String),

    #[error("failed to read {}: {source}", .path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// MIME type from the file extension; unknown extensions are treated as JPEG.
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "image/jpeg",
    }
}

/// Read `local_path` and upsert it to `bucket/remote_path`.
///
/// Fails without uploading when the file is missing or the bucket does not
/// exist. Never retries.
pub async fn upload_file(
    store: &dyn ObjectStore,
    local_path: &Path,
    bucket: &str,
    remote_path: &str,
) -> Result<UploadedObject, UploadError> {
    if !tokio::fs::try_exists(local_path).await.unwrap_or(false) {
        return Err(UploadError::FileNotFound(local_path.to_path_buf()));
    }

    let buckets = store.list_buckets().await?;
    if !buckets.iter().any(|b| b == bucket) {
        return Err(UploadError::BucketNotFound(bucket.to_string()));
    }

    let body = tokio::fs::read(local_path)
        .await
        .map_err(|source| UploadError::ReadFile {
            path: local_path.to_path_buf(),
            source,
        })?;
    let content_type = content_type_for(local_path);
    debug!(bucket, remote_path, content_type, "upload");

    let path = store
        .put_object(bucket, remote_path, body, content_type, CACHE_CONTROL)
        .await?;
    let url = store.public_url(bucket, &path);
    Ok(UploadedObject { url, path })
}

//! Remote object storage.
//!
//! - [`ObjectStore`] trait for abstracting the bucket API
//! - [`SupabaseStorage`] production client for the Supabase Storage REST API
//! - [`upload_file`] the upload adapter used by asset migration

#[cfg(test)]
pub(crate) mod memory;
pub mod supabase;
pub mod upload;

use async_trait::async_trait;

pub use supabase::{StorageSettings, SupabaseStorage};
pub use upload::{content_type_for, upload_file, UploadError, UploadedObject};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("storage api returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("invalid storage url: {0}")]
    InvalidUrl(String),
}

/// Trait for the handful of bucket operations the migrator needs.
///
/// Production code uses [`SupabaseStorage`]; tests use an in-memory store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Names of every bucket visible to the credential.
    async fn list_buckets(&self) -> Result<Vec<String>, StoreError>;

    /// Upsert one object. Returns the object key as echoed back by the store.
    async fn put_object(
        &self,
        bucket: &str,
        path: &str,
        body: Vec<u8>,
        content_type: &str,
        cache_control: &str,
    ) -> Result<String, StoreError>;

    async fn object_exists(&self, bucket: &str, path: &str) -> Result<bool, StoreError>;

    /// Public URL for an object. Pure; performs no request.
    fn public_url(&self, bucket: &str, path: &str) -> String;
}

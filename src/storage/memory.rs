//! In-memory object store for tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{ObjectStore, StoreError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub content_type: String,
    pub cache_control: String,
}

#[derive(Default)]
pub struct MemoryObjectStore {
    buckets: Vec<String>,
    objects: Mutex<HashMap<(String, String), StoredObject>>,
    failing_paths: HashSet<String>,
    put_calls: AtomicUsize,
}

impl MemoryObjectStore {
    pub fn with_buckets(buckets: &[&str]) -> Self {
        Self {
            buckets: buckets.iter().map(|b| b.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn failing_path(mut self, path: &str) -> Self {
        self.failing_paths.insert(path.to_string());
        self
    }

    /// Seed an object as if an earlier run had uploaded it.
    pub fn with_object(self, bucket: &str, path: &str, body: &[u8]) -> Self {
        self.objects.lock().unwrap().insert(
            (bucket.to_string(), path.to_string()),
            StoredObject {
                body: body.to_vec(),
                content_type: "image/jpeg".into(),
                cache_control: String::new(),
            },
        );
        self
    }

    pub fn put_calls(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }

    pub fn object(&self, bucket: &str, path: &str) -> Option<StoredObject> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), path.to_string()))
            .cloned()
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn list_buckets(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.buckets.clone())
    }

    async fn put_object(
        &self,
        bucket: &str,
        path: &str,
        body: Vec<u8>,
        content_type: &str,
        cache_control: &str,
    ) -> Result<String, StoreError> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_paths.contains(path) {
            return Err(StoreError::Api {
                status: 413,
                message: "The object exceeded the maximum allowed size".into(),
            });
        }
        self.objects.lock().unwrap().insert(
            (bucket.to_string(), path.to_string()),
            StoredObject {
                body,
                content_type: content_type.to_string(),
                cache_control: cache_control.to_string(),
            },
        );
        Ok(path.to_string())
    }

    async fn object_exists(&self, bucket: &str, path: &str) -> Result<bool, StoreError> {
        Ok(self
            .objects
            .lock()
            .unwrap()
            .contains_key(&(bucket.to_string(), path.to_string())))
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("https://cdn.test/storage/v1/object/public/{bucket}/{path}")
    }
}

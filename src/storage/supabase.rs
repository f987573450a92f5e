use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::{ObjectStore, StoreError};
use crate::util::env::{env_req, SUPABASE_SERVICE_ROLE_KEY, SUPABASE_URL};

#[derive(Clone)]
pub struct StorageSettings {
    pub base_url: String,
    pub service_key: String,
}

impl std::fmt::Debug for StorageSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageSettings")
            .field("base_url", &self.base_url)
            .field("service_key", &"***")
            .finish()
    }
}

impl StorageSettings {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            base_url: env_req(SUPABASE_URL)?,
            service_key: env_req(SUPABASE_SERVICE_ROLE_KEY)?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct BucketInfo {
    name: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(rename = "Key")]
    key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
    error: Option<String>,
}

/// Supabase Storage REST client authenticated with the service-role key.
pub struct SupabaseStorage {
    base: Url,
    service_key: String,
    http: Client,
}

impl SupabaseStorage {
    pub fn new(settings: &StorageSettings) -> Result<Self, StoreError> {
        let base = Url::parse(settings.base_url.trim())
            .map_err(|e| StoreError::InvalidUrl(format!("{}: {e}", SUPABASE_URL)))?;
        if base.cannot_be_a_base() || !matches!(base.scheme(), "http" | "https") {
            return Err(StoreError::InvalidUrl(format!(
                "{SUPABASE_URL} must be an http(s) URL"
            )));
        }
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            base,
            service_key: settings.service_key.clone(),
            http,
        })
    }

    /// `{base}/storage/v1/{segments...}/{object path...}` with each segment percent-encoded.
    fn endpoint(&self, segments: &[&str], object_path: Option<&str>) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut parts) = url.path_segments_mut() {
            parts.pop_if_empty().extend(["storage", "v1"]).extend(segments);
            if let Some(path) = object_path {
                parts.extend(path.split('/').filter(|s| !s.is_empty()));
            }
        }
        url
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
    }
}

/// The store echoes `{bucket}/{path}`; callers want the key inside the bucket.
fn canonical_path(bucket: &str, requested: &str, echoed: Option<&str>) -> String {
    echoed
        .map(|key| {
            key.strip_prefix(bucket)
                .and_then(|rest| rest.strip_prefix('/'))
                .unwrap_or(key)
                .to_string()
        })
        .unwrap_or_else(|| requested.to_string())
}

async fn api_error(resp: Response) -> StoreError {
    let status = resp.status().as_u16();
    let text = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorBody>(&text)
        .ok()
        .and_then(|b| b.message.or(b.error))
        .unwrap_or(text);
    StoreError::Api { status, message }
}

#[async_trait]
impl ObjectStore for SupabaseStorage {
    async fn list_buckets(&self) -> Result<Vec<String>, StoreError> {
        let resp = self
            .authed(self.http.get(self.endpoint(&["bucket"], None)))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(api_error(resp).await);
        }
        let buckets: Vec<BucketInfo> = resp.json().await?;
        Ok(buckets.into_iter().map(|b| b.name).collect())
    }

    async fn put_object(
        &self,
        bucket: &str,
        path: &str,
        body: Vec<u8>,
        content_type: &str,
        cache_control: &str,
    ) -> Result<String, StoreError> {
        let url = self.endpoint(&["object", bucket], Some(path));
        debug!(bucket, path, bytes = body.len(), "uploading object");
        let resp = self
            .authed(self.http.post(url))
            .header("x-upsert", "true")
            .header(reqwest::header::CACHE_CONTROL, cache_control)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(api_error(resp).await);
        }
        let echoed: UploadResponse = resp.json().await?;
        Ok(canonical_path(bucket, path, echoed.key.as_deref()))
    }

    async fn object_exists(&self, bucket: &str, path: &str) -> Result<bool, StoreError> {
        let url = self.endpoint(&["object", bucket], Some(path));
        let resp = self.authed(self.http.head(url)).send().await?;
        match resp.status() {
            s if s.is_success() => Ok(true),
            // Storage answers 400 for missing objects on some versions.
            StatusCode::NOT_FOUND | StatusCode::BAD_REQUEST => Ok(false),
            _ => Err(api_error(resp).await),
        }
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        self.endpoint(&["object", "public", bucket], Some(path))
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> SupabaseStorage {
        SupabaseStorage::new(&StorageSettings {
            base_url: base.into(),
            service_key: "service-role".into(),
        })
        .unwrap()
    }

    #[test]
    fn test_public_url_layout() {
        let store = client("https://abc.supabase.co/");
        assert_eq!(
            store.public_url("gallery", "gallery/event1.jpg"),
            "https://abc.supabase.co/storage/v1/object/public/gallery/gallery/event1.jpg"
        );
    }

    #[test]
    fn test_object_segments_are_encoded() {
        let store = client("https://abc.supabase.co");
        let url = store.endpoint(&["object", "team"], Some("team/Dr Ada #1.png"));
        assert_eq!(
            url.as_str(),
            "https://abc.supabase.co/storage/v1/object/team/team/Dr%20Ada%20%231.png"
        );
    }

    #[test]
    fn test_canonical_path_strips_bucket_prefix() {
        assert_eq!(
            canonical_path("gallery", "gallery/a.jpg", Some("gallery/gallery/a.jpg")),
            "gallery/a.jpg"
        );
        assert_eq!(canonical_path("news", "news/b.png", None), "news/b.png");
    }

    #[test]
    fn test_rejects_non_http_base() {
        let err = SupabaseStorage::new(&StorageSettings {
            base_url: "mailto:ops@example.org".into(),
            service_key: "k".into(),
        });
        assert!(matches!(err, Err(StoreError::InvalidUrl(_))));
    }

    #[test]
    fn test_settings_debug_hides_key() {
        let settings = StorageSettings {
            base_url: "https://abc.supabase.co".into(),
            service_key: "super-secret".into(),
        };
        assert!(!format!("{settings:?}").contains("super-secret"));
    }

    mod http {
        use super::*;
        use wiremock::matchers::{header, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        #[tokio::test]
        async fn test_upload_sends_upsert_headers_and_strips_bucket() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/storage/v1/object/gallery/gallery/event1.jpg"))
                .and(header("x-upsert", "true"))
                .and(header("cache-control", "max-age=3600"))
                .and(header("content-type", "image/jpeg"))
                .and(header("apikey", "service-role"))
                .and(header("authorization", "Bearer service-role"))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_json(serde_json::json!({ "Key": "gallery/gallery/event1.jpg" })),
                )
                .expect(1)
                .mount(&server)
                .await;

            let key = client(&server.uri())
                .put_object("gallery", "gallery/event1.jpg", b"jpg".to_vec(), "image/jpeg", "max-age=3600")
                .await
                .unwrap();
            assert_eq!(key, "gallery/event1.jpg");
        }

        #[tokio::test]
        async fn test_api_message_reaches_error_unchanged() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/storage/v1/object/news/news/big.jpg"))
                .respond_with(ResponseTemplate::new(413).set_body_json(serde_json::json!({
                    "statusCode": "413",
                    "error": "Payload too large",
                    "message": "The object exceeded the maximum allowed size"
                })))
                .mount(&server)
                .await;

            let err = client(&server.uri())
                .put_object("news", "news/big.jpg", b"jpg".to_vec(), "image/jpeg", "max-age=3600")
                .await
                .unwrap_err();
            assert!(
                matches!(err, StoreError::Api { status: 413, ref message } if message == "The object exceeded the maximum allowed size"),
                "{err:?}"
            );
        }

        #[tokio::test]
        async fn test_list_buckets_returns_names() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/storage/v1/bucket"))
                .and(header("authorization", "Bearer service-role"))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                    { "id": "gallery", "name": "gallery", "public": true },
                    { "id": "team", "name": "team", "public": true }
                ])))
                .mount(&server)
                .await;

            let buckets = client(&server.uri()).list_buckets().await.unwrap();
            assert_eq!(buckets, vec!["gallery".to_string(), "team".to_string()]);
        }

        #[tokio::test]
        async fn test_object_exists_status_mapping() {
            let server = MockServer::start().await;
            for (object, status) in [("here.jpg", 200), ("gone.jpg", 404), ("old.jpg", 400), ("boom.jpg", 500)] {
                Mock::given(method("HEAD"))
                    .and(path(format!("/storage/v1/object/team/team/{object}")))
                    .respond_with(ResponseTemplate::new(status))
                    .mount(&server)
                    .await;
            }
            let store = client(&server.uri());

            assert!(store.object_exists("team", "team/here.jpg").await.unwrap());
            assert!(!store.object_exists("team", "team/gone.jpg").await.unwrap());
            assert!(!store.object_exists("team", "team/old.jpg").await.unwrap());
            assert!(matches!(
                store.object_exists("team", "team/boom.jpg").await,
                Err(StoreError::Api { status: 500, .. })
            ));
        }
    }
}

//! Supabase Storage over its REST object API.
//!
//! Uploads go to `POST {url}/storage/v1/object/{bucket}/{key}` with
//! `x-upsert: true`; public objects are served from
//! `{url}/storage/v1/object/public/{bucket}/{key}`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};

use super::{validate_key, Bucket, StorageBackend, StorageError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct SupabaseStorage {
    url: String,
    service_key: String,
    client: reqwest::Client,
}

impl SupabaseStorage {
    pub fn new(url: String, service_key: String) -> Result<Self, StorageError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            service_key,
            client,
        })
    }

    /// `{url}/storage/v1/object/[public/]{bucket}/{key}` with encoded segments.
    fn object_url(&self, public: bool, bucket: Bucket, key: &str) -> Result<Url, StorageError> {
        validate_key(key)?;
        let mut url = Url::parse(&self.url)
            .map_err(|e| StorageError::InvalidKey(format!("{}: {e}", self.url)))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| StorageError::InvalidKey(self.url.clone()))?;
            segments.pop_if_empty().extend(["storage", "v1", "object"]);
            if public {
                segments.push("public");
            }
            segments.push(bucket.as_str()).extend(key.split('/'));
        }
        Ok(url)
    }
}

#[async_trait]
impl StorageBackend for SupabaseStorage {
    async fn put(
        &self,
        bucket: Bucket,
        key: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(), StorageError> {
        let url = self.object_url(false, bucket, key)?;
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .header("x-upsert", "true")
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Provider {
                status: status.as_u16(),
                body,
            });
        }
        tracing::debug!(bucket = %bucket, key, "Uploaded object to Supabase");
        Ok(())
    }

    async fn get(&self, bucket: Bucket, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let url = self.object_url(false, bucket, key)?;
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(Some(response.bytes().await?.to_vec())),
            StatusCode::NOT_FOUND => Ok(None),
            status => Err(StorageError::Provider {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            }),
        }
    }

    fn public_url(&self, bucket: Bucket, key: &str) -> String {
        self.object_url(true, bucket, key)
            .map(String::from)
            .unwrap_or_else(|_| format!("{}/storage/v1/object/public/{bucket}/{key}", self.url))
    }

    fn name(&self) -> &'static str {
        "supabase"
    }
}

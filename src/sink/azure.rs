//! `AzureBlobStore`: [`ObjectStore`] over the Azure Blob Storage REST API.
//!
//! Requests are authorised with the storage account's Shared Key: each request is
//! signed with HMAC-SHA256 over its canonical form, keyed by the base64-decoded
//! account key. Uploads use Put Blob with block blobs, which replaces any existing
//! blob at the same path.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use sha2::Sha256;
use tracing::{debug, error};

use crate::config::StorageConfig;
use crate::contract::ObjectStore;
use crate::error::StoreError;

pub const API_VERSION: &str = "2021-08-06";
const BLOB_TYPE: &str = "BlockBlob";
const JSON_CONTENT_TYPE: &str = "application/json";
const USER_AGENT: &str = concat!("jira-harvest/", env!("CARGO_PKG_VERSION"));

type HmacSha256 = Hmac<Sha256>;

pub struct AzureBlobStore {
    client: reqwest::Client,
    endpoint: String,
    account: String,
    container: String,
    key: Vec<u8>,
}

impl AzureBlobStore {
    /// Build a store for the configured account and container. Performs no I/O.
    pub fn new(config: &StorageConfig) -> Result<Self, StoreError> {
        let key = STANDARD.decode(config.account_key.trim())?;
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            client,
            endpoint: config.blob_endpoint(),
            account: config.account_name.clone(),
            container: config.container.clone(),
            key,
        })
    }

    /// Full URL of a blob; each path segment is percent-encoded.
    pub fn blob_url(&self, path: &str) -> String {
        let encoded: Vec<_> = path.split('/').map(urlencoding::encode).collect();
        format!(
            "{}/{}/{}",
            self.endpoint,
            urlencoding::encode(&self.container),
            encoded.join("/")
        )
    }
}

/// Canonical string signed for a Put Blob request.
///
/// `url_path` is the request's already-encoded URL path, so emulator endpoints that
/// carry the account name in their path are signed as they are addressed.
pub fn put_blob_string_to_sign(
    account: &str,
    url_path: &str,
    content_length: usize,
    content_type: &str,
    ms_date: &str,
) -> String {
    // An empty body is signed with an empty Content-Length.
    let length = if content_length == 0 {
        String::new()
    } else {
        content_length.to_string()
    };
    // VERB, Content-Encoding, Content-Language, Content-Length, Content-MD5,
    // Content-Type, Date, If-Modified-Since, If-Match, If-None-Match,
    // If-Unmodified-Since, Range.
    let mut canonical = format!("PUT\n\n\n{length}\n\n{content_type}\n\n\n\n\n\n\n");
    canonical.push_str(&format!("x-ms-blob-type:{BLOB_TYPE}\n"));
    canonical.push_str(&format!("x-ms-date:{ms_date}\n"));
    canonical.push_str(&format!("x-ms-version:{API_VERSION}\n"));
    canonical.push_str(&format!("/{account}{url_path}"));
    canonical
}

/// Base64 HMAC-SHA256 signature of `string_to_sign`.
pub fn sign(key: &[u8], string_to_sign: &str) -> Result<String, StoreError> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| StoreError::SigningKey)?;
    mac.update(string_to_sign.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

#[async_trait]
impl ObjectStore for AzureBlobStore {
    async fn put_blob(&self, path: &str, content: String) -> Result<(), StoreError> {
        let url = self.blob_url(path);
        let ms_date = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        let content_length = content.len();

        let mut request = self
            .client
            .put(&url)
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .header("x-ms-blob-type", BLOB_TYPE)
            .header("x-ms-date", &ms_date)
            .header("x-ms-version", API_VERSION)
            .body(content)
            .build()?;

        let canonical = put_blob_string_to_sign(
            &self.account,
            request.url().path(),
            content_length,
            JSON_CONTENT_TYPE,
            &ms_date,
        );
        let signature = sign(&self.key, &canonical)?;
        let authorization = HeaderValue::from_str(&format!(
            "SharedKey {}:{}",
            self.account, signature
        ))
        .map_err(|_| StoreError::SigningKey)?;
        request.headers_mut().insert(AUTHORIZATION, authorization);

        debug!(url = %url, bytes = content_length, "PUT blob");
        let response = self.client.execute(request).await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, url = %url, "Blob upload rejected");
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

use super::BlobStore;
use crate::error::AppError;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::Client;
use sha2::Sha256;
use std::collections::HashMap;

const API_VERSION: &str = "2023-11-03";

/// Azure Blob Storage access, authenticated with Shared Key signing over
/// plain REST calls rather than a storage SDK crate, so requests are
/// signed by hand the same way the `azure-storage-blob` crate does
/// internally.
pub struct AzureBlobStore {
    http: Client,
    account_name: String,
    account_key: Vec<u8>,
    container: String,
}

impl AzureBlobStore {
    pub fn from_connection_string(conn_string: &str, container: String) -> Result<Self, AppError> {
        let parts = parse_connection_string(conn_string)?;
        let account_name = parts
            .get("AccountName")
            .cloned()
            .ok_or_else(|| AppError::ConfigurationError("connection string missing AccountName".into()))?;
        let account_key_b64 = parts
            .get("AccountKey")
            .cloned()
            .ok_or_else(|| AppError::ConfigurationError("connection string missing AccountKey".into()))?;
        let account_key = STANDARD
            .decode(account_key_b64)
            .map_err(|e| AppError::ConfigurationError(format!("invalid AccountKey: {e}")))?;

        Ok(Self {
            http: Client::new(),
            account_name,
            account_key,
            container,
        })
    }

    fn blob_url(&self, blob_name: &str) -> String {
        format!(
            "https://{}.blob.core.windows.net/{}/{}",
            self.account_name, self.container, blob_name
        )
    }

    fn canonicalized_resource(&self, blob_name: &str) -> String {
        format!("/{}/{}/{}", self.account_name, self.container, blob_name)
    }

    fn sign(&self, string_to_sign: &str) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(&self.account_key)
            .expect("HMAC accepts key of any length");
        mac.update(string_to_sign.as_bytes());
        STANDARD.encode(mac.finalize().into_bytes())
    }

    fn auth_header(&self, verb: &str, blob_name: &str, content_length: usize, x_ms_headers: &[(&str, &str)]) -> (String, String) {
        let date = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();

        let mut canonicalized_headers: Vec<String> = x_ms_headers
            .iter()
            .map(|(k, v)| format!("{k}:{v}"))
            .collect();
        canonicalized_headers.sort();
        let canonicalized_headers = canonicalized_headers.join("\n");

        let content_length_str = if content_length == 0 {
            String::new()
        } else {
            content_length.to_string()
        };

        let string_to_sign = format!(
            "{verb}\n\n\n{content_length_str}\n\n\n\n\n\n\n\n\n{canonicalized_headers}\n{resource}",
            resource = self.canonicalized_resource(blob_name),
        );

        let signature = self.sign(&string_to_sign);
        (
            date,
            format!("SharedKey {}:{}", self.account_name, signature),
        )
    }
}

fn parse_connection_string(conn_string: &str) -> Result<HashMap<String, String>, AppError> {
    let mut parts = HashMap::new();
    for segment in conn_string.split(';') {
        if segment.is_empty() {
            continue;
        }
        let mut kv = segment.splitn(2, '=');
        let key = kv.next().unwrap_or_default();
        let value = kv
            .next()
            .ok_or_else(|| AppError::ConfigurationError(format!("malformed connection string segment '{segment}'")))?;
        parts.insert(key.to_string(), value.to_string());
    }
    Ok(parts)
}

#[async_trait]
impl BlobStore for AzureBlobStore {
    async fn get(&self, name: &str) -> Result<Option<String>, AppError> {
        let x_ms_date = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        let x_ms_headers = [
            ("x-ms-date", x_ms_date.as_str()),
            ("x-ms-version", API_VERSION),
        ];
        let (date, auth) = self.auth_header("GET", name, 0, &x_ms_headers);

        let response = self
            .http
            .get(self.blob_url(name))
            .header("x-ms-date", &date)
            .header("x-ms-version", API_VERSION)
            .header("Authorization", &auth)
            .send()
            .await
            .map_err(|e| AppError::BlobStoreError(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(AppError::BlobStoreError(format!(
                "fetching blob '{name}' failed: HTTP {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AppError::BlobStoreError(e.to_string()))?;
        Ok(Some(body))
    }

    async fn put(&self, name: &str, contents: &str) -> Result<(), AppError> {
        let x_ms_date = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        let x_ms_headers = [
            ("x-ms-blob-type", "BlockBlob"),
            ("x-ms-date", x_ms_date.as_str()),
            ("x-ms-version", API_VERSION),
        ];
        let (date, auth) = self.auth_header("PUT", name, contents.len(), &x_ms_headers);

        let response = self
            .http
            .put(self.blob_url(name))
            .header("x-ms-date", &date)
            .header("x-ms-version", API_VERSION)
            .header("x-ms-blob-type", "BlockBlob")
            .header("Content-Length", contents.len())
            .header("Authorization", &auth)
            .body(contents.to_string())
            .send()
            .await
            .map_err(|e| AppError::BlobStoreError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AppError::BlobStoreError(format!(
                "uploading blob '{name}' failed: HTTP {}",
                response.status()
            )));
        }

        Ok(())
    }
}

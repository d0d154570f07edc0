// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use crate::error::{Result, SdkError};
use crate::pinning::CertificatePin;
use crate::types::{ClientRecord, DeleteReceipt, ErrorBody, FileStat, Health, UploadReceipt};

/// Where backup clients keep their chunk index
pub const CHUNK_INDEX_PATH: &str = "/chunks/index";

/// Client for the file operations of one Strongbox tenant.
pub struct StrongboxClient {
    base_url: String,
    client: Client,
    token: String,
}

impl StrongboxClient {
    /// Create a client over an already configured HTTP client.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>, client: Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            token: token.into(),
        }
    }

    /// Talk HTTPS to a gateway, trusting only the pinned certificate.
    pub fn with_pin(
        base_url: impl Into<String>,
        token: impl Into<String>,
        pin: &CertificatePin,
    ) -> Result<Self> {
        Ok(Self::new(base_url, token, pin.http_client()?))
    }

    /// Talk plain HTTP to a gateway running without TLS.
    pub fn plaintext(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self::new(base_url, token, Client::new())
    }

    fn url(&self, route: &str, path: &str) -> String {
        format!("{}/{}/{}", self.base_url, route, path.trim_start_matches('/'))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.bearer_auth(&self.token).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => status.canonical_reason().unwrap_or("error").to_string(),
        };
        Err(SdkError::Status { status, message })
    }

    async fn json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        Ok(self.send(request).await?.json().await?)
    }

    /// Liveness of the gateway.
    pub async fn health(&self) -> Result<Health> {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;
        Ok(response.json().await?)
    }

    /// The record of the client this token belongs to.
    pub async fn client_info(&self) -> Result<ClientRecord> {
        self.json(self.client.get(format!("{}/getClientByAuthCode", self.base_url)))
            .await
    }

    /// Bytes this client may still store before hitting its quota.
    pub async fn available_space(&self) -> Result<u64> {
        Ok(self.client_info().await?.remaining())
    }

    /// The stored chunk index, or `None` if none was saved yet.
    pub async fn load_chunk_index(&self) -> Result<Option<Vec<u8>>> {
        self.try_download(CHUNK_INDEX_PATH).await
    }

    pub async fn save_chunk_index(&self, index: Vec<u8>) -> Result<UploadReceipt> {
        self.upload(CHUNK_INDEX_PATH, index).await
    }

    /// Store `content` at `path`, replacing what was there.
    pub async fn upload(&self, path: &str, content: Vec<u8>) -> Result<UploadReceipt> {
        let part = Part::bytes(content)
            .file_name("upload")
            .mime_str("application/octet-stream")?;
        let form = Form::new().part("uploadfile", part);

        self.json(
            self.client
                .post(format!("{}/upload", self.base_url))
                .header("Path", path)
                .multipart(form),
        )
        .await
    }

    /// Read the file at `path`.
    pub async fn download(&self, path: &str) -> Result<Vec<u8>> {
        let response = self.send(self.client.get(self.url("download", path))).await?;
        Ok(response.bytes().await?.to_vec())
    }

    /// Read the file at `path`, mapping a 404 to `None`.
    pub async fn try_download(&self, path: &str) -> Result<Option<Vec<u8>>> {
        match self.download(path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn stat(&self, path: &str) -> Result<FileStat> {
        self.json(self.client.get(self.url("stat", path))).await
    }

    pub async fn mkdir(&self, path: &str) -> Result<()> {
        self.send(self.client.get(self.url("mkdir", path))).await?;
        Ok(())
    }

    pub async fn delete(&self, path: &str) -> Result<DeleteReceipt> {
        self.json(
            self.client
                .delete(format!("{}/delete", self.base_url))
                .header("Path", path),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls_are_joined_without_double_slashes() {
        let client = StrongboxClient::plaintext("http://localhost:42024/", "token");
        assert_eq!(
            client.url("download", "/chunks/a"),
            "http://localhost:42024/download/chunks/a"
        );
        assert_eq!(client.url("stat", "x"), "http://localhost:42024/stat/x");
    }
}

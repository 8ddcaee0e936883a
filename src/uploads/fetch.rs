//! Download of logos given by URL.

use super::error::UploadError;
use bytes::{Bytes, BytesMut};
use reqwest::{Client, Url};
use std::time::Duration;
use synedrius_common::paths::filename_from_url_path;

/// A downloaded image body.
#[derive(Debug)]
pub struct FetchedImage {
    pub bytes: Bytes,
    /// `Content-Type` reported by the remote server, if any
    pub media_type: Option<String>,
    /// Filename derived from the URL path
    pub name: String,
}

/// HTTP client for remote logos with a timeout and a body size cap.
#[derive(Debug, Clone)]
pub struct RemoteFetcher {
    client: Client,
    max_bytes: usize,
}

/// Parse and check a remote logo URL. Only absolute http(s) URLs are accepted.
pub fn parse_remote_url(raw: &str) -> Result<Url, UploadError> {
    let raw = raw.trim();
    let url = Url::parse(raw).map_err(|e| UploadError::InvalidUrl(format!("{raw}: {e}")))?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(url),
        scheme => Err(UploadError::InvalidUrl(format!(
            "unsupported scheme '{scheme}'"
        ))),
    }
}

impl RemoteFetcher {
    pub fn new(timeout: Duration, max_bytes: usize) -> Result<Self, UploadError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| UploadError::Fetch(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, max_bytes })
    }

    pub async fn fetch(&self, raw_url: &str) -> Result<FetchedImage, UploadError> {
        let url = parse_remote_url(raw_url)?;
        let name = filename_from_url_path(url.path());

        tracing::debug!("Fetching remote logo {}", url);

        let mut response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| UploadError::Fetch(e.to_string()))?
            .error_for_status()
            .map_err(|e| UploadError::Fetch(e.to_string()))?;

        if response
            .content_length()
            .is_some_and(|len| len > self.max_bytes as u64)
        {
            return Err(UploadError::TooLarge {
                max_bytes: self.max_bytes,
            });
        }

        let media_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let mut body = BytesMut::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| UploadError::Fetch(e.to_string()))?
        {
            if body.len() + chunk.len() > self.max_bytes {
                return Err(UploadError::TooLarge {
                    max_bytes: self.max_bytes,
                });
            }
            body.extend_from_slice(&chunk);
        }

        tracing::debug!("Fetched {} bytes from {}", body.len(), url);

        Ok(FetchedImage {
            bytes: body.freeze(),
            media_type,
            name,
        })
    }
}

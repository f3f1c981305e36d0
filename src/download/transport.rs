// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! HTTP transport used by the resolver.
//!
//! [`Transport`] is the seam between the resolver and the network. The
//! production implementation is [`HttpTransport`]; tests substitute their
//! own implementation to count requests or inject failures.

use std::io::Read;

use crate::config::ResolverConfig;
use crate::error::{ResolverError, ResolverResult};

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// An open response body.
pub struct TransportResponse {
    /// Value of `Content-Length`, when the server sent one.
    pub content_length: Option<u64>,
    pub body: Box<dyn Read + Send>,
}

impl TransportResponse {
    pub fn new(content_length: Option<u64>, body: impl Read + Send + 'static) -> Self {
        Self {
            content_length,
            body: Box::new(body),
        }
    }

    /// Drain the body into memory.
    pub fn into_bytes(mut self) -> ResolverResult<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.content_length.unwrap_or(0).min(1 << 20) as usize);
        self.body
            .read_to_end(&mut buf)
            .map_err(|e| ResolverError::NetworkError(format!("Failed to read response body: {}", e)))?;
        Ok(buf)
    }
}

impl std::fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportResponse")
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Issues GET requests.
///
/// Implementations must report a non-success status as
/// [`ResolverError::NetworkError`] rather than returning the error page body.
pub trait Transport {
    fn get(&self, url: &str) -> ResolverResult<TransportResponse>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn get(&self, url: &str) -> ResolverResult<TransportResponse> {
        (**self).get(url)
    }
}

/// Blocking reqwest client with connect and request timeouts.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new(config: &ResolverConfig) -> ResolverResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ResolverError::NetworkError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str) -> ResolverResult<TransportResponse> {
        tracing::debug!("GET {}", url);

        let response = self.client.get(url).send().map_err(|e| {
            if e.is_connect() {
                ResolverError::NetworkError(format!("Cannot connect to {}", url))
            } else if e.is_timeout() {
                ResolverError::NetworkError(format!("Request to {} timed out", url))
            } else {
                ResolverError::NetworkError(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResolverError::NetworkError(format!(
                "HTTP {} for {}",
                status, url
            )));
        }

        let content_length = response.content_length();
        Ok(TransportResponse::new(content_length, response))
    }
}

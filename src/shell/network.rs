//! Network transport used by the shell and the API client.

use std::time::Duration;

use async_trait::async_trait;
use axum::http::HeaderMap;
use tracing::debug;

use super::fetch::{is_hop_by_hop, FetchRequest, FetchResponse, ResponseKind};
use crate::errors::AppError;

/// Anything that can turn a request into a response.
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, AppError>;
}

/// reqwest-backed transport. Responses from `origin` are `basic`, all others `cors`.
#[derive(Clone)]
pub struct HttpNetwork {
    client: reqwest::Client,
    origin: String,
}

impl HttpNetwork {
    pub fn new(origin: impl Into<String>, timeout: Duration) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            origin: origin.into(),
        })
    }

    fn kind_for(&self, url: &reqwest::Url) -> ResponseKind {
        match reqwest::Url::parse(&self.origin) {
            Ok(origin) if origin.origin() == url.origin() => ResponseKind::Basic,
            _ => ResponseKind::Cors,
        }
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, AppError> {
        let mut headers = HeaderMap::new();
        for (name, value) in request.headers.iter() {
            if !is_hop_by_hop(name) {
                headers.append(name.clone(), value.clone());
            }
        }

        debug!(method = %request.method, url = %request.url, "sending HTTP request");

        let response = self
            .client
            .request(request.method, &request.url)
            .headers(headers)
            .body(request.body)
            .send()
            .await?;

        let status = response.status();
        let kind = self.kind_for(response.url());
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        debug!(url = %request.url, %status, "received HTTP response");

        Ok(FetchResponse {
            status,
            headers,
            body,
            kind,
        })
    }
}

//! Scripted in-process network for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use axum::http::StatusCode;

use super::{FetchRequest, FetchResponse, Network, ResponseKind};
use crate::errors::AppError;

#[derive(Default)]
pub struct StubNetwork {
    routes: Mutex<HashMap<String, FetchResponse>>,
    requests: Mutex<Vec<FetchRequest>>,
    offline: Mutex<bool>,
}

impl StubNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(&self, url: &str, response: FetchResponse) {
        self.routes.lock().unwrap().insert(url.to_string(), response);
    }

    pub fn route_basic(&self, url: &str, content_type: &'static str, body: &'static str) {
        let mut response = FetchResponse::synthetic(StatusCode::OK, content_type, body);
        response.kind = ResponseKind::Basic;
        self.route(url, response);
    }

    pub fn route_json(&self, url: &str, body: serde_json::Value) {
        let mut response =
            FetchResponse::synthetic(StatusCode::OK, "application/json", body.to_string());
        response.kind = ResponseKind::Cors;
        self.route(url, response);
    }

    /// Answer POSTs to `url` whose JSON body carries `"action": action`.
    pub fn route_action(&self, url: &str, action: &str, body: serde_json::Value) {
        self.route_json(&format!("{}#{}", url, action), body);
    }

    pub fn set_offline(&self, offline: bool) {
        *self.offline.lock().unwrap() = offline;
    }

    pub fn requests(&self) -> Vec<FetchRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count_for(&self, url: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.url == url)
            .count()
    }

    /// Request bodies sent to `url`, decoded as JSON.
    pub fn json_bodies(&self, url: &str) -> Vec<serde_json::Value> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.url == url)
            .filter_map(|r| serde_json::from_slice(&r.body).ok())
            .collect()
    }
}

#[async_trait]
impl Network for StubNetwork {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, AppError> {
        self.requests.lock().unwrap().push(request.clone());

        if *self.offline.lock().unwrap() {
            return Err(AppError::Network("connection refused".into()));
        }

        let action = serde_json::from_slice::<serde_json::Value>(&request.body)
            .ok()
            .and_then(|body| body["action"].as_str().map(str::to_string));

        let routes = self.routes.lock().unwrap();
        action
            .and_then(|action| routes.get(&format!("{}#{}", request.url, action)))
            .or_else(|| routes.get(&request.url))
            .cloned()
            .ok_or_else(|| AppError::Network(format!("no route for {}", request.url)))
    }
}

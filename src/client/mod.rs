//! API gateway client for the attendance service.
//!
//! Validates the identity and endpoint locally, then sends one POST per action
//! and normalizes the outcome into an [`ActionResult`]. Nothing escapes this
//! boundary as a panic or raw transport error.

use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::configured_endpoint;
use crate::db::Repository;
use crate::models::{Action, ActionRequest, ApiEnvelope};
use crate::shell::{FetchRequest, Network};

/// Local storage key holding the last validated identity.
pub const IDENTITY_KEY: &str = "userName";

/// A CORS-safelisted content type, so browsers never send a pre-flight.
pub const SIMPLE_CONTENT_TYPE: &str = "text/plain;charset=utf-8";

pub const MSG_NAME_REQUIRED: &str = "Please enter your name";
pub const MSG_ENDPOINT_MISSING: &str =
    "API URL is not configured. Set ATTENDANCE_API_URL to the attendance service URL.";
pub const MSG_GENERIC_FAILURE: &str = "An error occurred";

/// Source of the identity (user name) field.
pub trait IdentityInput: Send + Sync {
    fn value(&self) -> String;
    fn set_value(&self, value: &str);
}

/// Global "loading" indicator.
pub trait LoadingIndicator: Send + Sync {
    fn set_loading(&self, loading: bool);
}

/// Clears the loading indicator on every exit path.
struct LoadingGuard<'a> {
    indicator: &'a dyn LoadingIndicator,
}

impl<'a> LoadingGuard<'a> {
    fn start(indicator: &'a dyn LoadingIndicator) -> Self {
        indicator.set_loading(true);
        Self { indicator }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.indicator.set_loading(false);
    }
}

/// Failure of a single action call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// Rejected locally, no request was sent.
    #[error("{0}")]
    Validation(String),
    /// The service answered `ok: false`.
    #[error("{0}")]
    Service(String),
    /// The request failed or the body was not a service envelope.
    #[error("Failed to communicate with the server: {0}")]
    Transport(String),
}

impl ClientError {
    /// Text shown to the user.
    pub fn message(&self) -> String {
        self.to_string()
    }
}

/// Successful service answer.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionSuccess {
    pub message: String,
    pub data: Option<Value>,
}

pub type ActionResult = Result<ActionSuccess, ClientError>;

pub struct ApiClient {
    endpoint: Option<String>,
    user_id: String,
    network: Arc<dyn Network>,
    storage: Arc<Repository>,
    identity: Arc<dyn IdentityInput>,
    loading: Arc<dyn LoadingIndicator>,
}

impl ApiClient {
    pub fn new(
        endpoint: Option<String>,
        user_id: impl Into<String>,
        network: Arc<dyn Network>,
        storage: Arc<Repository>,
        identity: Arc<dyn IdentityInput>,
        loading: Arc<dyn LoadingIndicator>,
    ) -> Self {
        Self {
            endpoint,
            user_id: user_id.into(),
            network,
            storage,
            identity,
            loading,
        }
    }

    /// Send `action` for the current identity.
    pub async fn call(&self, action: Action, extra: Map<String, Value>) -> ActionResult {
        let name = self.identity.value().trim().to_string();
        if name.is_empty() {
            return Err(ClientError::Validation(MSG_NAME_REQUIRED.to_string()));
        }

        let Some(endpoint) = configured_endpoint(self.endpoint.as_deref()) else {
            return Err(ClientError::Validation(MSG_ENDPOINT_MISSING.to_string()));
        };

        if let Err(e) = self.storage.set_item(IDENTITY_KEY, &name).await {
            warn!("Failed to persist identity: {}", e);
        }

        let request = ActionRequest::new(action, &self.user_id, name).with_extra(extra);
        let body = request.to_body().to_string();

        let _loading = LoadingGuard::start(self.loading.as_ref());

        info!(%action, "Sending action request");
        debug!("Request body: {}", body);

        let response = self
            .network
            .fetch(FetchRequest::post(endpoint, SIMPLE_CONTENT_TYPE, body))
            .await
            .map_err(|e| {
                error!(%action, "Action request failed: {}", e);
                ClientError::Transport(e.to_string())
            })?;

        debug!(%action, status = %response.status, "Received action response");

        let envelope: ApiEnvelope = serde_json::from_slice(&response.body).map_err(|e| {
            error!(%action, "Malformed action response: {}", e);
            ClientError::Transport(e.to_string())
        })?;

        if envelope.ok {
            Ok(ActionSuccess {
                message: envelope.message.unwrap_or_default(),
                data: envelope.data,
            })
        } else {
            let message = envelope
                .message
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| MSG_GENERIC_FAILURE.to_string());
            error!(%action, "Service rejected action: {}", message);
            Err(ClientError::Service(message))
        }
    }

    /// Identity remembered from the last validated call.
    pub async fn stored_identity(&self) -> Option<String> {
        match self.storage.get_item(IDENTITY_KEY).await {
            Ok(value) => value.filter(|v| !v.trim().is_empty()),
            Err(e) => {
                warn!("Failed to read stored identity: {}", e);
                None
            }
        }
    }
}

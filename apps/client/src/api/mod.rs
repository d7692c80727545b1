//! Typed clients for each backend service. Every client reaches the network
//! only through the shared `Gateway`, so all of them get bearer injection and
//! 401 recovery.

pub mod auth;
pub mod catalog;
pub mod generation_feed;
pub mod interview_stages;
pub mod job_applications;
pub mod ml;
pub mod objectives;
pub mod resumes;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::errors::ApiError;
use crate::gateway::{ApiRequest, Gateway, HttpResponse};

/// A gateway bound to one service root.
#[derive(Clone)]
pub struct ServiceClient {
    gateway: Arc<Gateway>,
    base_url: String,
}

impl ServiceClient {
    pub fn new(gateway: Arc<Gateway>, base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            gateway,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn gateway(&self) -> &Arc<Gateway> {
        &self.gateway
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `path` is appended verbatim and should start with `/`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Sends and unwraps the `{ success, message?, data }` envelope.
    pub async fn send<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        self.gateway.execute_json(request).await
    }

    /// Sends and decodes a bare JSON body (no envelope).
    pub async fn send_bare<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        self.gateway.execute(request).await?.json()
    }

    /// Sends and ignores the response body.
    pub async fn send_empty(&self, request: ApiRequest) -> Result<(), ApiError> {
        self.gateway.execute(request).await?;
        Ok(())
    }

    pub async fn send_raw(&self, request: ApiRequest) -> Result<HttpResponse, ApiError> {
        self.gateway.execute(request).await
    }
}

/// Decodes an envelope payload whose shape varies between backend versions
/// into one of the documented shapes. Anything else is an error, never an
/// empty default.
pub(crate) fn decode_shape<T: DeserializeOwned>(endpoint: &str, data: Value) -> Result<T, ApiError> {
    serde_json::from_value(data).map_err(|e| ApiError::unexpected_shape(endpoint, e.to_string()))
}

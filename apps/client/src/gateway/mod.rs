//! Token-refresh gateway: the single path by which every client reaches a
//! backend service.
//!
//! Every request gets the current access token as a bearer header. A 401 on
//! a request that has not been retried yet triggers one refresh exchange
//! against the auth service; concurrent 401s queue behind it and are all
//! replayed with the new token. A request is retried at most once.

pub mod refresh;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::future::join_all;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::credentials::{CredentialPair, CredentialStore};
use crate::errors::{error_message, ApiError, RefreshError};
use crate::models::auth::{RefreshTokenRequest, TokenGrant};
use crate::models::Envelope;

use self::refresh::{Claim, RefreshState, Waiter};
pub use self::transport::{ReqwestTransport, Transport};

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(serde_json::Value),
    Multipart(MultipartForm),
}

/// Cloneable description of a multipart body so it can be resent on replay.
#[derive(Debug, Clone, Default)]
pub struct MultipartForm {
    pub fields: Vec<(String, String)>,
    pub files: Vec<FilePart>,
}

impl MultipartForm {
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn file(mut self, part: FilePart) -> Self {
        self.files.push(part);
        self
    }
}

#[derive(Debug, Clone)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub mime: String,
    pub content: Bytes,
}

/// An outgoing request. `retried` is the per-request marker that bounds
/// 401 recovery to a single replay.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
    retried: bool,
}

impl ApiRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
            retried: false,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::PUT, url)
    }

    pub fn patch(url: impl Into<String>) -> Self {
        Self::new(Method::PATCH, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::DELETE, url)
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn query_opt<V: ToString>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.query(key, value),
            None => self,
        }
    }

    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, ApiError> {
        self.body = RequestBody::Json(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn multipart(mut self, form: MultipartForm) -> Self {
        self.body = RequestBody::Multipart(form);
        self
    }

    /// Opts out of 401 recovery: a 401 is returned to the caller as-is.
    /// Used for public endpoints where 401 means bad credentials.
    pub fn no_refresh(mut self) -> Self {
        self.retried = true;
        self
    }

    pub fn is_retried(&self) -> bool {
        self.retried
    }

    pub(crate) fn mark_retried(&mut self) {
        self.retried = true;
    }
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Converts a non-2xx response into `ApiError::Status`.
    pub fn error_for_status(self) -> Result<Self, ApiError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(self.status_error())
        }
    }

    fn status_error(&self) -> ApiError {
        ApiError::Status {
            status: self.status,
            message: error_message(self.status, &self.body),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Gateway
// ────────────────────────────────────────────────────────────────────────────

pub struct Gateway {
    transport: Arc<dyn Transport>,
    credentials: Arc<dyn CredentialStore>,
    refresh_url: String,
    refresh_timeout: Duration,
    refresh: RefreshState,
}

impl Gateway {
    /// `auth_base_url` is the auth service's `/auth` root; the refresh
    /// exchange posts to `{auth_base_url}/refresh`.
    pub fn new(
        transport: Arc<dyn Transport>,
        credentials: Arc<dyn CredentialStore>,
        auth_base_url: &str,
        refresh_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            credentials,
            refresh_url: format!("{}/refresh", auth_base_url.trim_end_matches('/')),
            refresh_timeout,
            refresh: RefreshState::default(),
        }
    }

    pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.credentials
    }

    pub fn is_refreshing(&self) -> bool {
        self.refresh.is_refreshing()
    }

    /// Sends `request` with the current access token and recovers from a
    /// first 401 by refreshing. Returns 2xx responses; every other status is
    /// an `ApiError::Status`.
    pub async fn execute(&self, request: ApiRequest) -> Result<HttpResponse, ApiError> {
        let sent_with = self.credentials.access_token();
        let response = self.transport.send(&request, sent_with.as_deref()).await?;

        if !response.is_unauthorized() {
            return response.error_for_status();
        }
        if request.is_retried() {
            return Err(response.status_error());
        }

        match self
            .refresh
            .claim(request, sent_with.as_deref(), self.credentials.as_ref())
        {
            Claim::Queued(receiver) => receiver
                .await
                .unwrap_or_else(|_| Err(ApiError::Refresh(RefreshError::Abandoned))),
            Claim::Rotated(request, token) => {
                debug!("Access token rotated since request was sent; replaying");
                self.replay(request, &token).await
            }
            Claim::Lead(request, guard) => {
                let Some(refresh_token) = self.credentials.refresh_token() else {
                    warn!("Received 401 with no refresh token stored; clearing credentials");
                    self.credentials.clear_tokens();
                    guard.fail(RefreshError::MissingToken);
                    return Err(response.status_error());
                };

                let pair = match self.exchange(&refresh_token).await {
                    Ok(pair) => pair,
                    Err(e) => {
                        warn!("Token refresh failed, clearing credentials: {e}");
                        self.credentials.clear_tokens();
                        guard.fail(e.clone());
                        return Err(ApiError::Refresh(e));
                    }
                };

                self.credentials.set_tokens(&pair);
                info!("Access token refreshed");

                let waiters = guard.succeed();
                self.replay_waiters(waiters, &pair.access_token).await;
                self.replay(request, &pair.access_token).await
            }
        }
    }

    /// `execute` followed by decoding the `{ success, message?, data }` envelope.
    pub async fn execute_json<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> Result<T, ApiError> {
        let response = self.execute(request).await?;
        unwrap_envelope(response.json::<Envelope<T>>()?)
    }

    /// Replays queued requests in enqueue order. All of them complete before
    /// this returns, so the leader's own replay is always last.
    async fn replay_waiters(&self, waiters: Vec<Waiter>, token: &str) {
        if waiters.is_empty() {
            return;
        }
        debug!("Replaying {} queued request(s)", waiters.len());

        join_all(waiters.into_iter().map(|waiter| async move {
            if waiter.reply.is_closed() {
                debug!("Caller of {} stopped waiting; not replaying", waiter.request.url);
                return;
            }
            let result = self.replay(waiter.request, token).await;
            let _ = waiter.reply.send(result);
        }))
        .await;
    }

    async fn replay(&self, request: ApiRequest, token: &str) -> Result<HttpResponse, ApiError> {
        debug!("Replaying {} {} with refreshed token", request.method, request.url);
        self.transport
            .send(&request, Some(token))
            .await?
            .error_for_status()
    }

    /// `POST /auth/refresh`, sent without a bearer token and outside the
    /// 401 interception path.
    async fn exchange(&self, refresh_token: &str) -> Result<CredentialPair, RefreshError> {
        let request = ApiRequest::post(&self.refresh_url)
            .json(&RefreshTokenRequest {
                refresh_token: refresh_token.to_string(),
            })
            .map_err(|e| RefreshError::Malformed(e.to_string()))?;

        let response =
            match tokio::time::timeout(self.refresh_timeout, self.transport.send(&request, None))
                .await
            {
                Ok(Ok(response)) => response,
                Ok(Err(e)) => return Err(RefreshError::Transport(e.to_string())),
                Err(_) => return Err(RefreshError::TimedOut(self.refresh_timeout.as_secs())),
            };

        if !response.is_success() {
            return Err(RefreshError::Rejected {
                status: response.status,
                message: error_message(response.status, &response.body),
            });
        }

        let envelope: Envelope<TokenGrant> = serde_json::from_slice(&response.body)
            .map_err(|e| RefreshError::Malformed(e.to_string()))?;
        if !envelope.success {
            return Err(RefreshError::Rejected {
                status: response.status,
                message: envelope
                    .message
                    .unwrap_or_else(|| "refresh reported failure".to_string()),
            });
        }

        Ok(envelope.data.into())
    }
}

pub fn unwrap_envelope<T>(envelope: Envelope<T>) -> Result<T, ApiError> {
    if envelope.success {
        Ok(envelope.data)
    } else {
        Err(ApiError::Unsuccessful(
            envelope
                .message
                .unwrap_or_else(|| "server reported failure".to_string()),
        ))
    }
}

//! In-process transport for tests: records every call and answers from a
//! closure, optionally after a (virtual-time) delay.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Method;
use serde_json::{json, Value};

use crate::credentials::{CredentialPair, CredentialStore, MemoryCredentialStore};
use crate::errors::ApiError;
use crate::gateway::{ApiRequest, Gateway, HttpResponse, RequestBody, Transport};

pub(crate) const AUTH_BASE: &str = "http://auth.test/api/v1/auth";
pub(crate) const JOBS_BASE: &str = "http://jobs.test/api/v1";
pub(crate) const ML_BASE: &str = "http://ml.test/api/v1";

#[derive(Debug, Clone)]
pub(crate) struct RecordedCall {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
    pub bearer: Option<String>,
}

impl RecordedCall {
    pub fn json_body(&self) -> Value {
        match &self.body {
            RequestBody::Json(value) => value.clone(),
            _ => Value::Null,
        }
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

pub(crate) enum Reply {
    Respond(HttpResponse),
    Delayed(Duration, HttpResponse),
    Fail(String),
    Hang,
}

type Handler = dyn Fn(&RecordedCall) -> Reply + Send + Sync;

pub(crate) struct FakeTransport {
    calls: Mutex<Vec<RecordedCall>>,
    handler: Box<Handler>,
}

impl FakeTransport {
    pub fn new(handler: impl Fn(&RecordedCall) -> Reply + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            handler: Box::new(handler),
        })
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, url: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.url == url)
            .collect()
    }

    pub fn refresh_calls(&self) -> usize {
        self.calls_to(&format!("{AUTH_BASE}/refresh")).len()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(
        &self,
        request: &ApiRequest,
        bearer: Option<&str>,
    ) -> Result<HttpResponse, ApiError> {
        let call = RecordedCall {
            method: request.method.clone(),
            url: request.url.clone(),
            query: request.query.clone(),
            body: request.body.clone(),
            bearer: bearer.map(str::to_owned),
        };
        self.calls.lock().unwrap().push(call.clone());

        match (self.handler)(&call) {
            Reply::Respond(response) => Ok(response),
            Reply::Delayed(delay, response) => {
                tokio::time::sleep(delay).await;
                Ok(response)
            }
            Reply::Fail(message) => Err(ApiError::Transport(message)),
            Reply::Hang => std::future::pending().await,
        }
    }
}

pub(crate) fn respond(status: u16, body: Value) -> Reply {
    Reply::Respond(json_response(status, body))
}

pub(crate) fn ok(data: Value) -> Reply {
    respond(200, envelope(data))
}

pub(crate) fn unauthorized() -> Reply {
    respond(401, json!({"success": false, "message": "token expired"}))
}

pub(crate) fn json_response(status: u16, body: Value) -> HttpResponse {
    HttpResponse {
        status,
        content_type: Some("application/json".to_string()),
        body: Bytes::from(body.to_string()),
    }
}

pub(crate) fn envelope(data: Value) -> Value {
    json!({"success": true, "message": "ok", "data": data})
}

pub(crate) fn token_grant(access: &str, refresh: &str) -> Value {
    envelope(json!({
        "user": user_json(),
        "access_token": access,
        "refresh_token": refresh,
        "expires_at": 1_900_000_000
    }))
}

pub(crate) fn user_json() -> Value {
    json!({
        "id": "u-1",
        "username": "ada",
        "email": "ada@example.com",
        "first_name": "Ada",
        "last_name": "Lovelace",
        "role": "user",
        "is_active": true,
        "is_verified": true,
        "last_login": null,
        "created_at": "2024-01-01T00:00:00Z",
        "updated_at": "2024-01-01T00:00:00Z"
    })
}

pub(crate) fn credentials(access: &str, refresh: &str) -> Arc<MemoryCredentialStore> {
    Arc::new(MemoryCredentialStore::with_tokens(&CredentialPair {
        access_token: access.to_string(),
        refresh_token: refresh.to_string(),
    }))
}

pub(crate) fn gateway(
    transport: Arc<FakeTransport>,
    credentials: Arc<dyn CredentialStore>,
) -> Arc<Gateway> {
    Arc::new(Gateway::new(
        transport,
        credentials,
        AUTH_BASE,
        Duration::from_secs(15),
    ))
}

// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! reqwest implementation of [`RemoteApi`].

use std::time::Duration;

use reqwest::{Client, Method, StatusCode};
use serde_json::{json, Value};
use tracing::debug;

use mm_core::{AnniversaryRecord, DataType, MessageRecord, PhotoRecord};

use super::remote::{BackendSchema, CreateReceipt, RemoteApi, RemoteError, RemoteFuture, RemoteResult};
use super::wire;

const ANNIVERSARIES_PATH: &str = "/api/anniversaries";
const MESSAGES_PATH: &str = "/api/messages";
const PHOTOS_PATH: &str = "/api/photos";
const LOGIN_PATH: &str = "/api/admin/login";
const VERIFY_PATH: &str = "/api/admin/verify";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for the memorial backend.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: Client,
    base_url: String,
    schema: BackendSchema,
}

impl HttpRemote {
    /// Create a client for the backend at `base_url`.
    pub fn new(base_url: &str, schema: BackendSchema, timeout: Duration) -> RemoteResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Network {
                url: base_url.to_string(),
                message: e.to_string(),
            })?;
        Ok(HttpRemote {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            schema,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request and decode the JSON body. An empty body decodes as null.
    ///
    /// With `missing_ok`, a 404 is reported as `Ok(None)`.
    async fn call(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        bearer: Option<&str>,
        missing_ok: bool,
    ) -> RemoteResult<Option<Value>> {
        let url = self.url(path);
        debug!("{method} {url}");

        let mut request = self.client.request(method, &url);
        if let Some(body) = body {
            request = request.json(body);
        }
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| transport_error(&url, e))?;
        let status = response.status();
        let text = response.text().await.map_err(|e| transport_error(&url, e))?;

        if missing_ok && status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(RemoteError::Status {
                url,
                status: status.as_u16(),
                message: error_message(status, &text),
            });
        }
        if text.trim().is_empty() {
            return Ok(Some(Value::Null));
        }
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| RemoteError::Decode {
                url,
                message: e.to_string(),
            })
    }

    async fn get_json(&self, path: &str) -> RemoteResult<Value> {
        Ok(self
            .call(Method::GET, path, None, None, false)
            .await?
            .unwrap_or(Value::Null))
    }

    async fn send_json(&self, method: Method, path: &str, body: &Value) -> RemoteResult<Value> {
        Ok(self
            .call(method, path, Some(body), None, false)
            .await?
            .unwrap_or(Value::Null))
    }

    /// Fetch a KV collection as raw rows, so rows are written back untouched.
    async fn get_rows(&self, path: &str) -> RemoteResult<Vec<Value>> {
        match self.get_json(path).await? {
            Value::Array(rows) => Ok(rows),
            Value::Null => Ok(Vec::new()),
            _ => Err(RemoteError::Decode {
                url: self.url(path),
                message: "expected a JSON array".to_string(),
            }),
        }
    }

    fn decode_error(&self, path: &str, e: wire::WireError) -> RemoteError {
        RemoteError::Decode {
            url: self.url(path),
            message: e.to_string(),
        }
    }

    /// List the photo gallery.
    pub async fn fetch_photos(&self) -> RemoteResult<Vec<PhotoRecord>> {
        let body = self.get_json(PHOTOS_PATH).await?;
        wire::parse_photos(body).map_err(|e| self.decode_error(PHOTOS_PATH, e))
    }

    /// Exchange admin credentials for a token.
    pub async fn login(&self, username: &str, password: &str) -> RemoteResult<String> {
        let body = json!({ "username": username, "password": password });
        let response = self.send_json(Method::POST, LOGIN_PATH, &body).await?;
        response
            .get("token")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| RemoteError::Decode {
                url: self.url(LOGIN_PATH),
                message: "response has no token".to_string(),
            })
    }

    /// Ask the backend whether a token is still valid.
    pub async fn verify(&self, token: &str) -> RemoteResult<bool> {
        match self
            .call(Method::GET, VERIFY_PATH, None, Some(token), false)
            .await
        {
            Ok(body) => Ok(body
                .as_ref()
                .and_then(|b| b.get("valid"))
                .and_then(Value::as_bool)
                .unwrap_or(false)),
            Err(RemoteError::Status { status: 401, .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn create_anniversary_inner(&self, record: &AnniversaryRecord) -> RemoteResult<CreateReceipt> {
        match self.schema {
            BackendSchema::Relational => {
                let body = wire::anniversary_body(record);
                let response = self.send_json(Method::POST, ANNIVERSARIES_PATH, &body).await?;
                Ok(wire::parse_receipt(response))
            }
            BackendSchema::KvArray => {
                let row = wire::kv_anniversary_row(record);
                let id = wire::kv_anniversary_id(&row);
                let mut rows = self.get_rows(ANNIVERSARIES_PATH).await?;
                // Replaying a create must not append the same row twice.
                let already_stored = id.is_some()
                    && rows.iter().any(|existing| wire::kv_anniversary_id(existing) == id);
                if !already_stored {
                    rows.push(row);
                    self.send_json(Method::POST, ANNIVERSARIES_PATH, &Value::Array(rows))
                        .await?;
                }
                Ok(CreateReceipt { id })
            }
        }
    }

    async fn create_message_inner(&self, record: &MessageRecord) -> RemoteResult<CreateReceipt> {
        match self.schema {
            BackendSchema::Relational => {
                let body = wire::message_body(record);
                let response = self.send_json(Method::POST, MESSAGES_PATH, &body).await?;
                Ok(wire::parse_receipt(response))
            }
            BackendSchema::KvArray => {
                let row = wire::kv_message_row(record);
                let id = wire::kv_message_id(&row);
                let rows = self.get_rows(MESSAGES_PATH).await?;
                let already_stored = id.is_some()
                    && rows.iter().any(|existing| wire::kv_message_id(existing) == id);
                if !already_stored {
                    // A single-row array is appended by the worker.
                    self.send_json(Method::POST, MESSAGES_PATH, &Value::Array(vec![row]))
                        .await?;
                }
                Ok(CreateReceipt { id })
            }
        }
    }

    async fn delete_inner(&self, data_type: DataType, id: &str) -> RemoteResult<()> {
        let path = match data_type {
            DataType::Anniversary => ANNIVERSARIES_PATH,
            DataType::Message => MESSAGES_PATH,
        };
        match (self.schema, data_type) {
            (BackendSchema::Relational, _) => {
                let body = wire::delete_body(id);
                self.call(Method::DELETE, path, Some(&body), None, true)
                    .await?;
                Ok(())
            }
            (BackendSchema::KvArray, DataType::Anniversary) => {
                let rows = self.get_rows(path).await?;
                let before = rows.len();
                let kept: Vec<Value> = rows
                    .into_iter()
                    .filter(|row| wire::kv_anniversary_id(row).as_deref() != Some(id))
                    .collect();
                if kept.len() == before {
                    debug!(id, "anniversary already gone");
                    return Ok(());
                }
                self.send_json(Method::POST, path, &Value::Array(kept)).await?;
                Ok(())
            }
            (BackendSchema::KvArray, DataType::Message) => {
                let rows = self.get_rows(path).await?;
                let Some(row) = rows
                    .iter()
                    .find(|row| wire::kv_message_id(row).as_deref() == Some(id))
                else {
                    debug!(id, "message already gone");
                    return Ok(());
                };
                let body = wire::kv_message_delete_body(row);
                self.call(Method::DELETE, path, Some(&body), None, true)
                    .await?;
                Ok(())
            }
        }
    }
}

impl RemoteApi for HttpRemote {
    fn fetch_anniversaries(&self) -> RemoteFuture<'_, Vec<AnniversaryRecord>> {
        Box::pin(async move {
            let body = self.get_json(ANNIVERSARIES_PATH).await?;
            wire::parse_anniversaries(body).map_err(|e| self.decode_error(ANNIVERSARIES_PATH, e))
        })
    }

    fn fetch_messages(&self) -> RemoteFuture<'_, Vec<MessageRecord>> {
        Box::pin(async move {
            let body = self.get_json(MESSAGES_PATH).await?;
            wire::parse_messages(body).map_err(|e| self.decode_error(MESSAGES_PATH, e))
        })
    }

    fn create_anniversary<'a>(
        &'a self,
        record: &'a AnniversaryRecord,
    ) -> RemoteFuture<'a, CreateReceipt> {
        Box::pin(self.create_anniversary_inner(record))
    }

    fn create_message<'a>(&'a self, record: &'a MessageRecord) -> RemoteFuture<'a, CreateReceipt> {
        Box::pin(self.create_message_inner(record))
    }

    fn delete_record<'a>(&'a self, data_type: DataType, id: &'a str) -> RemoteFuture<'a, ()> {
        Box::pin(self.delete_inner(data_type, id))
    }
}

fn transport_error(url: &str, e: reqwest::Error) -> RemoteError {
    if e.is_timeout() {
        RemoteError::Timeout {
            url: url.to_string(),
        }
    } else {
        RemoteError::Network {
            url: url.to_string(),
            message: e.to_string(),
        }
    }
}

/// Prefer the backend's `{error}` message, then the raw body, then the status reason.
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        if let Some(message) = value.get("error").and_then(Value::as_str) {
            return message.to_string();
        }
    }
    let trimmed = body.trim();
    if !trimmed.is_empty() {
        return trimmed.chars().take(200).collect();
    }
    status
        .canonical_reason()
        .unwrap_or("unexpected status")
        .to_string()
}

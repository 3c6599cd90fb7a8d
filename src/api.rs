//! Thin REST client for the alumni backend.
//!
//! The backend speaks the Strapi envelope: successful bodies look like
//! `{"data": ..., "meta": {...}}` and rejections like
//! `{"error": {"status": 400, "message": "..."}}`.

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::Config;

const DUPLICATE_MARKERS: [&str; 3] = ["unique", "duplicate", "already exists"];

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("{message}")]
    Rejected { status: u16, message: String },
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Rejected { status, .. } => Some(*status),
            ApiError::Network(err) => err.status().map(|status| status.as_u16()),
            ApiError::Decode(_) => None,
        }
    }

    /// Whether the backend refused a create because the record already exists.
    ///
    /// A 409 is authoritative. Strapi reports unique-constraint violations as a
    /// generic 400, so the message text is checked as well.
    pub fn is_duplicate_conflict(&self) -> bool {
        match self {
            ApiError::Rejected { status, message } => {
                if *status == StatusCode::CONFLICT.as_u16() {
                    return true;
                }
                let lowered = message.to_lowercase();
                DUPLICATE_MARKERS
                    .iter()
                    .any(|marker| lowered.contains(marker))
            }
            _ => false,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub meta: Value,
}

impl Envelope {
    pub fn page_count(&self) -> Option<u64> {
        self.meta
            .pointer("/pagination/pageCount")
            .and_then(Value::as_u64)
    }

    pub fn total(&self) -> Option<u64> {
        self.meta.pointer("/pagination/total").and_then(Value::as_u64)
    }
}

#[derive(Serialize)]
struct DataBody<'a, T: Serialize> {
    data: &'a T,
}

#[derive(Clone, Debug)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(
        base_url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        Self::new(
            config.api_url.clone(),
            config.api_token.clone(),
            config.request_timeout,
        )
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, self.url(path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    pub async fn get_envelope(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<Envelope, ApiError> {
        debug!(path, params = query.len(), "GET");
        let response = self.request(Method::GET, path).query(query).send().await?;
        read_envelope(check(response).await?).await
    }

    pub async fn send_data<T: Serialize>(
        &self,
        method: Method,
        path: &str,
        data: &T,
    ) -> Result<Envelope, ApiError> {
        debug!(%method, path, "sending data");
        let response = self
            .request(method, path)
            .json(&DataBody { data })
            .send()
            .await?;
        read_envelope(check(response).await?).await
    }

    /// GET returning the raw JSON body. Some custom routes answer without the
    /// envelope, so callers pick `data` out themselves.
    pub async fn get_value(&self, path: &str, query: &[(String, String)]) -> Result<Value, ApiError> {
        debug!(path, params = query.len(), "GET");
        let response = self.request(Method::GET, path).query(query).send().await?;
        read_value(check(response).await?).await
    }

    /// Sends `body` as-is (no `{data}` wrapping) and returns the raw JSON reply.
    pub async fn send_value(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        debug!(%method, path, "sending");
        let mut builder = self.request(method, path);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        read_value(check(builder.send().await?).await?).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        debug!(path, "DELETE");
        let response = self.request(Method::DELETE, path).send().await?;
        check(response).await?;
        Ok(())
    }

    /// Issues a GET and reports the status code without treating 4xx as an error.
    pub async fn status_of(&self, path: &str, query: &[(String, String)]) -> Result<StatusCode, ApiError> {
        let response = self.request(Method::GET, path).query(query).send().await?;
        Ok(response.status())
    }

    /// Starts a binary download; the caller streams the body.
    pub async fn open_download(&self, path: &str, accept: &str) -> Result<Response, ApiError> {
        debug!(path, "opening download");
        let response = self
            .request(Method::GET, path)
            .header(reqwest::header::ACCEPT, accept)
            .send()
            .await?;
        check(response).await
    }
}

async fn check(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ApiError::Rejected {
        status: status.as_u16(),
        message: rejection_message(status, &body),
    })
}

async fn read_envelope(response: Response) -> Result<Envelope, ApiError> {
    let body = response.text().await?;
    if body.trim().is_empty() {
        return Ok(Envelope::default());
    }
    serde_json::from_str(&body).map_err(|err| ApiError::Decode(err.to_string()))
}

async fn read_value(response: Response) -> Result<Value, ApiError> {
    let body = response.text().await?;
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&body).map_err(|err| ApiError::Decode(err.to_string()))
}

/// Takes `data` out of an enveloped body and passes anything else through.
pub fn unwrap_data(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.get("data").is_some_and(|data| !data.is_null()) => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

pub fn rejection_message(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        let message = value
            .pointer("/error/message")
            .or_else(|| value.get("message"))
            .and_then(Value::as_str);
        if let Some(message) = message {
            return message.to_string();
        }
    }
    let trimmed = body.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }
    status
        .canonical_reason()
        .unwrap_or("request failed")
        .to_string()
}

/// Flattens the `{id, attributes: {...}}` entry shape into a single object.
pub fn normalize_entry(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.get("attributes").is_some_and(Value::is_object) => {
            let mut flat = match map.remove("attributes") {
                Some(Value::Object(attributes)) => attributes,
                _ => serde_json::Map::new(),
            };
            for key in ["id", "documentId"] {
                if let Some(value) = map.remove(key) {
                    flat.insert(key.to_string(), value);
                }
            }
            Value::Object(flat)
        }
        other => other,
    }
}

pub fn decode_entry<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    serde_json::from_value(normalize_entry(value)).map_err(|err| ApiError::Decode(err.to_string()))
}

pub fn decode_list<T: DeserializeOwned>(value: Value) -> Result<Vec<T>, ApiError> {
    match value {
        Value::Array(items) => items.into_iter().map(decode_entry).collect(),
        Value::Null => Ok(Vec::new()),
        other => Err(ApiError::Decode(format!("expected a list, got {other}"))),
    }
}

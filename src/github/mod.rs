//! GitHub REST client.
//!
//! Attaches authentication and API version headers to every call, decodes
//! 2xx bodies, and classifies everything else into [`GitHubError`]. This is
//! the only place an HTTP status is interpreted. No call is ever retried.

pub mod query;
pub mod transport;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::GitHubConfig;
use crate::error::{FieldError, GitHubError, GitHubResult};

pub use query::{Pagination, Query, encode_path};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};

/// Pinned REST API version.
pub const API_VERSION: &str = "2022-11-28";

const ACCEPT: &str = "application/vnd.github+json";

/// Body of a [`GitHubClient::request`] call.
#[derive(Debug, Clone)]
pub enum RequestBody {
    Empty,
    Json(serde_json::Value),
    Raw { content_type: String, bytes: Vec<u8> },
}

/// Rate-limit metadata GitHub attaches to every response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateLimitInfo {
    pub limit: Option<u64>,
    pub remaining: Option<u64>,
    pub used: Option<u64>,
    pub reset: Option<DateTime<Utc>>,
}

impl RateLimitInfo {
    pub fn from_response(response: &HttpResponse) -> Self {
        let num = |name: &str| response.header(name).and_then(|v| v.trim().parse::<u64>().ok());
        Self {
            limit: num("x-ratelimit-limit"),
            remaining: num("x-ratelimit-remaining"),
            used: num("x-ratelimit-used"),
            reset: num("x-ratelimit-reset")
                .and_then(|secs| i64::try_from(secs).ok())
                .and_then(|secs| DateTime::from_timestamp(secs, 0)),
        }
    }
}

/// Authenticated GitHub REST client. Cheap to clone; holds no mutable state.
#[derive(Clone)]
pub struct GitHubClient {
    config: Arc<GitHubConfig>,
    transport: Arc<dyn HttpTransport>,
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl GitHubClient {
    /// Client using the given transport.
    pub fn new(config: GitHubConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            config: Arc::new(config),
            transport,
        }
    }

    /// Client using a fresh [`ReqwestTransport`].
    pub fn with_reqwest(config: GitHubConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::new(config, Arc::new(ReqwestTransport::new()?)))
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> GitHubResult<T> {
        self.json(Method::GET, path, None).await
    }

    pub async fn post<T: DeserializeOwned>(&self, path: &str, body: &impl Serialize) -> GitHubResult<T> {
        self.json(Method::POST, path, Some(to_json(body)?)).await
    }

    pub async fn put<T: DeserializeOwned>(&self, path: &str, body: &impl Serialize) -> GitHubResult<T> {
        self.json(Method::PUT, path, Some(to_json(body)?)).await
    }

    pub async fn patch<T: DeserializeOwned>(&self, path: &str, body: &impl Serialize) -> GitHubResult<T> {
        self.json(Method::PATCH, path, Some(to_json(body)?)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> GitHubResult<T> {
        self.json(Method::DELETE, path, None).await
    }

    /// Low-level call: returns the raw 2xx response, or the classified error.
    pub async fn request(&self, method: Method, path: &str, body: RequestBody) -> GitHubResult<HttpResponse> {
        let mut headers = vec![
            ("Authorization".to_owned(), format!("Bearer {}", self.config.token)),
            ("Accept".to_owned(), ACCEPT.to_owned()),
            ("X-GitHub-Api-Version".to_owned(), API_VERSION.to_owned()),
            ("User-Agent".to_owned(), self.config.user_agent.clone()),
        ];
        let body = match body {
            RequestBody::Empty => None,
            RequestBody::Json(value) => {
                headers.push(("Content-Type".to_owned(), "application/json".to_owned()));
                Some(serde_json::to_vec(&value).map_err(|e| GitHubError::Decode(e.to_string()))?)
            }
            RequestBody::Raw { content_type, bytes } => {
                headers.push(("Content-Type".to_owned(), content_type));
                Some(bytes)
            }
        };

        let url = self.url(path);
        debug!(method = %method, url, "GitHub request");
        let request = HttpRequest {
            method: method.clone(),
            url,
            headers,
            body,
        };

        let response = self
            .transport
            .send(request)
            .await
            .map_err(GitHubError::Transport)?;

        let rate = RateLimitInfo::from_response(&response);
        debug!(
            method = %method,
            path,
            status = response.status,
            rate_remaining = rate.remaining,
            rate_limit = rate.limit,
            "GitHub response"
        );

        if response.is_success() {
            Ok(response)
        } else {
            let err = classify(&response);
            warn!(method = %method, path, status = response.status, error = %err, "GitHub request failed");
            Err(err)
        }
    }

    async fn json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> GitHubResult<T> {
        let body = body.map_or(RequestBody::Empty, RequestBody::Json);
        let response = self.request(method, path, body).await?;
        decode(&response)
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_owned();
        }
        let path = path.trim_start_matches('/');
        format!("{}/{path}", self.config.base_url)
    }
}

fn to_json(body: &impl Serialize) -> GitHubResult<serde_json::Value> {
    serde_json::to_value(body).map_err(|e| GitHubError::Decode(e.to_string()))
}

/// Decode a 2xx body. An empty body decodes as JSON `null`.
fn decode<T: DeserializeOwned>(response: &HttpResponse) -> GitHubResult<T> {
    let result = if response.body.iter().all(u8::is_ascii_whitespace) {
        serde_json::from_value(serde_json::Value::Null)
    } else {
        serde_json::from_slice(&response.body)
    };
    result.map_err(|e| GitHubError::Decode(e.to_string()))
}

/// Map a non-2xx response onto the error taxonomy.
pub fn classify(response: &HttpResponse) -> GitHubError {
    let parsed: Option<serde_json::Value> = serde_json::from_slice(&response.body).ok();
    let message = parsed
        .as_ref()
        .and_then(|v| v.get("message"))
        .and_then(serde_json::Value::as_str)
        .map(str::to_owned)
        .or_else(|| {
            let text = String::from_utf8_lossy(&response.body).trim().to_owned();
            (!text.is_empty()).then_some(text)
        })
        .unwrap_or_else(|| status_reason(response.status));

    match response.status {
        401 => GitHubError::Authentication { message },
        403 => GitHubError::Permission { message },
        404 => GitHubError::NotFound { message },
        409 => GitHubError::Conflict { message },
        422 => GitHubError::Validation {
            message,
            errors: parsed.as_ref().map(field_errors).unwrap_or_default(),
        },
        429 => GitHubError::RateLimit {
            message,
            reset_at: rate_limit_reset(response),
        },
        status => GitHubError::Api { status, message },
    }
}

/// Reset time from `x-ratelimit-reset` (epoch seconds), else `retry-after`
/// (seconds from now).
fn rate_limit_reset(response: &HttpResponse) -> Option<DateTime<Utc>> {
    RateLimitInfo::from_response(response).reset.or_else(|| {
        let secs: i64 = response.header("retry-after")?.trim().parse().ok()?;
        Some(Utc::now() + chrono::Duration::seconds(secs))
    })
}

fn field_errors(body: &serde_json::Value) -> Vec<FieldError> {
    let Some(items) = body.get("errors").and_then(serde_json::Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .map(|item| match item {
            serde_json::Value::String(s) => FieldError {
                message: Some(s.clone()),
                ..FieldError::default()
            },
            other => serde_json::from_value(other.clone()).unwrap_or_else(|_| FieldError {
                message: Some(other.to_string()),
                ..FieldError::default()
            }),
        })
        .collect()
}

fn status_reason(status: u16) -> String {
    reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .map_or_else(|| format!("HTTP {status}"), str::to_owned)
}

//! Error types for the oa-github crate.
//!
//! [`GitHubError`] is produced only by the REST client when it classifies a
//! response; every layer above treats it as an opaque tagged value.
//! [`ToolError`] adds the dispatcher-level failures that never reach GitHub.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One field-level entry from a GitHub 422 response body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let location = match (&self.resource, &self.field) {
            (Some(resource), Some(field)) => format!("{resource}.{field}"),
            (None, Some(field)) => field.clone(),
            (Some(resource), None) => resource.clone(),
            (None, None) => String::new(),
        };
        let reason = match (&self.code, &self.message) {
            (Some(code), Some(message)) if code == "custom" => message.clone(),
            (Some(code), Some(message)) => format!("{code} ({message})"),
            (Some(code), None) => code.clone(),
            (None, Some(message)) => message.clone(),
            (None, None) => "invalid".to_owned(),
        };
        if location.is_empty() {
            write!(f, "{reason}")
        } else {
            write!(f, "{location}: {reason}")
        }
    }
}

/// Classified failure of a GitHub REST call.
#[derive(Debug, thiserror::Error)]
pub enum GitHubError {
    /// 401: the token is missing, expired, or revoked.
    #[error("Authentication Failed: {message}")]
    Authentication { message: String },

    /// 403: the token lacks access to the resource.
    #[error("Permission Denied: {message}")]
    Permission { message: String },

    /// 404.
    #[error("Not Found: {message}")]
    NotFound { message: String },

    /// 409: the resource changed underneath the request.
    #[error("Conflict: {message}")]
    Conflict { message: String },

    /// 422, with the remote field-level error list.
    #[error("Validation Error: {message}")]
    Validation {
        message: String,
        errors: Vec<FieldError>,
    },

    /// 429, with the reset time when GitHub reported one.
    #[error("Rate Limit Exceeded: {message}")]
    RateLimit {
        message: String,
        reset_at: Option<DateTime<Utc>>,
    },

    /// Any other non-2xx status.
    #[error("GitHub API Error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The request never produced an HTTP response.
    #[error("transport error: {0}")]
    Transport(String),

    /// A 2xx body did not match the expected shape.
    #[error("failed to decode GitHub response: {0}")]
    Decode(String),
}

/// Short tag for each error variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Authentication,
    Permission,
    NotFound,
    Conflict,
    Validation,
    RateLimit,
    Api,
    Transport,
    Decode,
}

impl GitHubError {
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Authentication { .. } => ErrorKind::Authentication,
            Self::Permission { .. } => ErrorKind::Permission,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::RateLimit { .. } => ErrorKind::RateLimit,
            Self::Api { .. } => ErrorKind::Api,
            Self::Transport(_) => ErrorKind::Transport,
            Self::Decode(_) => ErrorKind::Decode,
        }
    }

    /// The most specific detail lines available for this error, if any.
    pub fn detail(&self) -> Vec<String> {
        match self {
            Self::Validation { errors, .. } => errors.iter().map(ToString::to_string).collect(),
            Self::RateLimit {
                reset_at: Some(reset),
                ..
            } => vec![format!("Resets at: {}", reset.to_rfc3339())],
            Self::RateLimit { reset_at: None, .. } => {
                vec!["Resets at: unknown (no rate-limit headers in response)".to_owned()]
            }
            _ => Vec::new(),
        }
    }
}

/// Convenience result type for REST operations.
pub type GitHubResult<T> = Result<T, GitHubError>;

/// Failures raised by the tool dispatcher.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// No tool registered under this name.
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Arguments were rejected before any request was issued.
    #[error("Validation Error: invalid arguments for {tool}")]
    InvalidArguments {
        tool: String,
        violations: Vec<String>,
    },

    /// A classified REST failure, forwarded unchanged.
    #[error(transparent)]
    GitHub(#[from] GitHubError),

    /// Result serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ToolError {
    /// Render the error as the text of an error envelope.
    pub fn render(&self) -> String {
        let detail = match self {
            Self::InvalidArguments { violations, .. } => violations.clone(),
            Self::GitHub(e) => e.detail(),
            Self::UnknownTool(_) | Self::Json(_) => Vec::new(),
        };
        let mut text = format!("Error: {self}");
        if let Self::GitHub(GitHubError::RateLimit { .. }) = self {
            for line in detail {
                text.push('\n');
                text.push_str(&line);
            }
        } else if !detail.is_empty() {
            text.push_str("\nDetails:");
            for line in detail {
                text.push_str("\n  - ");
                text.push_str(&line);
            }
        }
        text
    }
}

/// Startup configuration failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is not set")]
    MissingToken(&'static str),

    #[error("invalid GitHub API base URL {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_error_display() {
        let e = FieldError {
            resource: Some("Issue".to_owned()),
            field: Some("title".to_owned()),
            code: Some("missing_field".to_owned()),
            message: None,
        };
        assert_eq!(e.to_string(), "Issue.title: missing_field");

        let custom = FieldError {
            resource: Some("PullRequest".to_owned()),
            field: None,
            code: Some("custom".to_owned()),
            message: Some("A pull request already exists".to_owned()),
        };
        assert_eq!(custom.to_string(), "PullRequest: A pull request already exists");
    }

    #[test]
    fn test_render_validation_lists_fields() {
        let err = ToolError::from(GitHubError::Validation {
            message: "Validation Failed".to_owned(),
            errors: vec![
                FieldError {
                    field: Some("name".to_owned()),
                    code: Some("already_exists".to_owned()),
                    ..FieldError::default()
                },
                FieldError {
                    message: Some("name is too long".to_owned()),
                    ..FieldError::default()
                },
            ],
        });
        let text = err.render();
        assert!(text.starts_with("Error: Validation Error: Validation Failed"));
        assert!(text.contains("  - name: already_exists"));
        assert!(text.contains("  - name is too long"));
    }

    #[test]
    fn test_render_rate_limit_shows_reset() {
        let reset = DateTime::from_timestamp(1_700_000_000, 0).expect("timestamp");
        let err = ToolError::from(GitHubError::RateLimit {
            message: "API rate limit exceeded".to_owned(),
            reset_at: Some(reset),
        });
        let text = err.render();
        assert!(text.contains("Rate Limit Exceeded"));
        assert!(text.contains("Resets at: 2023-11-14T22:13:20+00:00"));
    }

    #[test]
    fn test_render_unknown_tool() {
        let err = ToolError::UnknownTool("frobnicate".to_owned());
        assert_eq!(err.render(), "Error: Unknown tool: frobnicate");
    }

    #[test]
    fn test_kind_tags() {
        let err = GitHubError::Api {
            status: 502,
            message: "Bad Gateway".to_owned(),
        };
        assert_eq!(err.kind(), ErrorKind::Api);
        assert_eq!(err.to_string(), "GitHub API Error (502): Bad Gateway");
        assert!(err.detail().is_empty());
    }
}

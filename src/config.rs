//! Process configuration read from the environment.
//!
//! The values are resolved once at startup and handed to
//! [`GitHubClient::new`](crate::github::GitHubClient::new) explicitly; nothing
//! below the binary reads the environment.

use tracing::debug;

use crate::error::ConfigError;

/// Primary token variable.
pub const TOKEN_ENV: &str = "GITHUB_PERSONAL_ACCESS_TOKEN";

/// Accepted when [`TOKEN_ENV`] is unset (matches the `gh` / Actions convention).
pub const FALLBACK_TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Optional base-URL override for GitHub Enterprise deployments.
pub const BASE_URL_ENV: &str = "GITHUB_API_URL";

pub const DEFAULT_BASE_URL: &str = "https://api.github.com";

/// Connection settings for the GitHub REST client.
#[derive(Clone)]
pub struct GitHubConfig {
    /// Bearer token. Never logged.
    pub token: String,
    /// API root without a trailing slash.
    pub base_url: String,
    pub user_agent: String,
}

impl std::fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("token", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl GitHubConfig {
    /// Build a config for `base_url` with the given token.
    pub fn new(token: impl Into<String>, base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            token: token.into(),
            base_url: normalize_base_url(base_url)?,
            user_agent: format!("oa-github/{}", env!("CARGO_PKG_VERSION")),
        })
    }

    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through `lookup`, treating blank values as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let token = get(TOKEN_ENV)
            .or_else(|| get(FALLBACK_TOKEN_ENV))
            .ok_or(ConfigError::MissingToken(TOKEN_ENV))?;
        let base_url = get(BASE_URL_ENV).unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());

        let config = Self::new(token.trim(), &base_url)?;
        debug!(base_url = config.base_url, "GitHub configuration loaded");
        Ok(config)
    }
}

fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let parsed = url::Url::parse(trimmed).map_err(|e| ConfigError::InvalidBaseUrl {
        url: raw.to_owned(),
        reason: e.to_string(),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidBaseUrl {
            url: raw.to_owned(),
            reason: format!("unsupported scheme {:?}", parsed.scheme()),
        });
    }
    Ok(trimmed.to_owned())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_missing_token_fails() {
        let err = GitHubConfig::from_lookup(lookup(&[])).expect_err("should fail");
        assert!(matches!(err, ConfigError::MissingToken(TOKEN_ENV)));
    }

    #[test]
    fn test_blank_token_counts_as_missing() {
        let err = GitHubConfig::from_lookup(lookup(&[(TOKEN_ENV, "   ")])).expect_err("should fail");
        assert!(matches!(err, ConfigError::MissingToken(_)));
    }

    #[test]
    fn test_defaults_and_fallback_token() {
        let config = GitHubConfig::from_lookup(lookup(&[(FALLBACK_TOKEN_ENV, "ghp_x")]))
            .expect("config");
        assert_eq!(config.token, "ghp_x");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert!(config.user_agent.starts_with("oa-github/"));
    }

    #[test]
    fn test_base_url_override_trims_slash() {
        let config = GitHubConfig::from_lookup(lookup(&[
            (TOKEN_ENV, "t"),
            (BASE_URL_ENV, "https://ghe.example.com/api/v3/"),
        ]))
        .expect("config");
        assert_eq!(config.base_url, "https://ghe.example.com/api/v3");
    }

    #[test]
    fn test_invalid_base_url() {
        let err = GitHubConfig::from_lookup(lookup(&[(TOKEN_ENV, "t"), (BASE_URL_ENV, "ftp://x")]))
            .expect_err("should fail");
        assert!(matches!(err, ConfigError::InvalidBaseUrl { .. }));
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = GitHubConfig::new("secret-token", DEFAULT_BASE_URL).expect("config");
        assert!(!format!("{config:?}").contains("secret-token"));
    }
}

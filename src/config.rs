//! Provider configuration.
//!
//! The host hands the provider block to `Configure` as a JSON object. Each
//! setting can also come from the environment; an explicit value in the
//! provider block always wins.

use std::fmt;

use serde_json::Value;

use crate::error::ProviderError;
use crate::schema::{Attribute, Schema};

/// Environment variable holding the API user id.
pub const ENV_USERID: &str = "GLESYS_USERID";
/// Environment variable holding the API token.
pub const ENV_TOKEN: &str = "GLESYS_TOKEN";
/// Environment variable overriding the API base URL.
pub const ENV_API_URL: &str = "GLESYS_API_URL";
/// API base URL used when neither the config nor the environment sets one.
pub const DEFAULT_API_URL: &str = "https://api.glesys.com";

/// Resolved settings for talking to the GleSYS API.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Account user id, e.g. `CL12345`.
    pub userid: String,
    /// API key for the account.
    pub token: String,
    /// Base URL of the API, without trailing slash.
    pub api_endpoint: String,
    /// `User-Agent` sent with every request.
    pub user_agent: String,
}

impl ProviderConfig {
    /// Resolve the configuration from a provider block, falling back to the
    /// process environment.
    pub fn from_value(config: &Value) -> Result<Self, ProviderError> {
        Self::from_value_with_env(config, |key| std::env::var(key).ok())
    }

    /// Like [`ProviderConfig::from_value`] with an explicit environment lookup.
    pub fn from_value_with_env<F>(config: &Value, env: F) -> Result<Self, ProviderError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let setting = |key: &str, env_key: &str| -> Option<String> {
            config
                .get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .or_else(|| env(env_key).filter(|s| !s.is_empty()))
        };

        let userid = setting("userid", ENV_USERID).ok_or_else(|| {
            ProviderError::Configuration(format!(
                "userid must be set in the provider block or via {}",
                ENV_USERID
            ))
        })?;
        let token = setting("token", ENV_TOKEN).ok_or_else(|| {
            ProviderError::Configuration(format!(
                "token must be set in the provider block or via {}",
                ENV_TOKEN
            ))
        })?;
        let api_endpoint = setting("api_endpoint", ENV_API_URL)
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let parsed = reqwest::Url::parse(&api_endpoint).map_err(|e| {
            ProviderError::Configuration(format!("invalid api_endpoint '{}': {}", api_endpoint, e))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ProviderError::Configuration(format!(
                "api_endpoint must be an http(s) URL, got '{}'",
                api_endpoint
            )));
        }

        Ok(Self {
            userid,
            token,
            api_endpoint: api_endpoint.trim_end_matches('/').to_string(),
            user_agent: default_user_agent(),
        })
    }

    /// Schema of the provider block.
    pub fn schema() -> Schema {
        Schema::v0()
            .with_attribute(
                "userid",
                Attribute::optional_string().with_description(
                    "UserId for the GleSYS API. Can also be set with GLESYS_USERID.",
                ),
            )
            .with_attribute(
                "token",
                Attribute::optional_string()
                    .sensitive()
                    .with_description("API token for the GleSYS API. Can also be set with GLESYS_TOKEN."),
            )
            .with_attribute(
                "api_endpoint",
                Attribute::optional_string().with_description(
                    "Base URL for API requests. Defaults to GLESYS_API_URL or https://api.glesys.com.",
                ),
            )
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("userid", &self.userid)
            .field("token", &"<redacted>")
            .field("api_endpoint", &self.api_endpoint)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

fn default_user_agent() -> String {
    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_explicit_values() {
        let config = json!({
            "userid": "CL12345",
            "token": "secret",
            "api_endpoint": "https://api.example.test/"
        });
        let resolved = ProviderConfig::from_value_with_env(&config, no_env).unwrap();
        assert_eq!(resolved.userid, "CL12345");
        assert_eq!(resolved.token, "secret");
        assert_eq!(resolved.api_endpoint, "https://api.example.test");
        assert!(resolved.user_agent.starts_with("glesys-provider/"));
    }

    #[test]
    fn test_env_fallback_and_default_endpoint() {
        let env = |key: &str| match key {
            ENV_USERID => Some("CL1".to_string()),
            ENV_TOKEN => Some("from-env".to_string()),
            _ => None,
        };
        let resolved = ProviderConfig::from_value_with_env(&json!({}), env).unwrap();
        assert_eq!(resolved.userid, "CL1");
        assert_eq!(resolved.token, "from-env");
        assert_eq!(resolved.api_endpoint, DEFAULT_API_URL);
    }

    #[test]
    fn test_explicit_wins_over_env() {
        let env = |key: &str| match key {
            ENV_USERID => Some("CL-env".to_string()),
            ENV_TOKEN => Some("env-token".to_string()),
            ENV_API_URL => Some("https://env.example.test".to_string()),
            _ => None,
        };
        let config = json!({"userid": "CL-explicit"});
        let resolved = ProviderConfig::from_value_with_env(&config, env).unwrap();
        assert_eq!(resolved.userid, "CL-explicit");
        assert_eq!(resolved.token, "env-token");
        assert_eq!(resolved.api_endpoint, "https://env.example.test");
    }

    #[test]
    fn test_missing_token_is_configuration_error() {
        let config = json!({"userid": "CL12345"});
        let err = ProviderConfig::from_value_with_env(&config, no_env).unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
        assert!(err.to_string().contains(ENV_TOKEN));
    }

    #[test]
    fn test_invalid_endpoint() {
        let config = json!({"userid": "CL1", "token": "t", "api_endpoint": "not a url"});
        let err = ProviderConfig::from_value_with_env(&config, no_env).unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));

        let config = json!({"userid": "CL1", "token": "t", "api_endpoint": "ftp://api.glesys.com"});
        assert!(ProviderConfig::from_value_with_env(&config, no_env).is_err());
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = json!({"userid": "CL1", "token": "hunter2"});
        let resolved = ProviderConfig::from_value_with_env(&config, no_env).unwrap();
        let debug = format!("{:?}", resolved);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }
}

//! HTTP transport for the GleSYS API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use super::error::ApiError;
use crate::config::ProviderConfig;

/// Moves one API call over the wire.
///
/// `path` is `<module>/<function>`, e.g. `server/details`. On success the
/// inner `response` object of the reply is returned with its `status`
/// removed.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(&self, path: &str, body: Value) -> Result<Value, ApiError>;
}

/// Reply envelope used by every endpoint.
#[derive(Debug, Deserialize)]
struct Envelope {
    response: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct Status {
    code: u16,
    #[serde(default)]
    text: String,
}

/// [`Transport`] backed by `reqwest`, authenticating with HTTP basic auth.
pub struct HttpTransport {
    client: Client,
    endpoint: String,
    userid: String,
    token: String,
}

impl HttpTransport {
    pub fn new(config: &ProviderConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.api_endpoint.trim_end_matches('/').to_string(),
            userid: config.userid.clone(),
            token: config.token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}/", self.endpoint, path.trim_matches('/'))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, path: &str, body: Value) -> Result<Value, ApiError> {
        let url = self.url(path);
        debug!(%url, "POST");

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.userid, Some(&self.token))
            .json(&body)
            .send()
            .await?;

        let http_status = response.status();
        let text = response.text().await?;
        parse_reply(http_status, &text)
    }
}

/// Turn a raw reply into the inner response object or an error.
fn parse_reply(http_status: StatusCode, body: &str) -> Result<Value, ApiError> {
    let envelope = serde_json::from_str::<Envelope>(body);

    let mut response = match envelope {
        Ok(envelope) => envelope.response,
        Err(_) if http_status == StatusCode::NOT_FOUND => {
            return Err(ApiError::NotFound(truncate_body(body)))
        },
        Err(_) if !http_status.is_success() => {
            return Err(ApiError::from_status(http_status.as_u16(), truncate_body(body)))
        },
        Err(e) => return Err(ApiError::Decode(e)),
    };

    let status = response
        .remove("status")
        .map(serde_json::from_value::<Status>)
        .transpose()?;

    match status {
        Some(status) if !(200..300).contains(&status.code) => {
            Err(ApiError::from_status(status.code, status.text))
        },
        _ if http_status == StatusCode::NOT_FOUND => Err(ApiError::NotFound(truncate_body(body))),
        _ if !http_status.is_success() => Err(ApiError::from_status(http_status.as_u16(), truncate_body(body))),
        _ => Ok(Value::Object(response)),
    }
}

fn truncate_body(body: &str) -> String {
    body.trim().chars().take(200).collect()
}

use crate::{ConfigError, JSON_CONTENT_TYPE};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;

/// The request every iteration sends. Immutable for the duration of a run.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestSpec {
    pub url: Url,
    pub method: String,
    pub headers: BTreeMap<String, String>,
    pub body: Bytes,
    /// Per-request deadline. Requests exceeding it are reported as timeouts.
    pub timeout: Option<Duration>,
}

impl RequestSpec {
    /// POST `payload` as JSON to `url`, with `Content-Type: application/json`.
    pub fn json<T: Serialize>(url: &str, payload: &T) -> Result<Self, ConfigError> {
        let url = parse_url(url)?;
        let body = serde_json::to_vec(payload)?;

        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_string(), JSON_CONTENT_TYPE.to_string());

        Ok(Self {
            url,
            method: "POST".to_string(),
            headers,
            body: Bytes::from(body),
            timeout: None,
        })
    }

    /// Point the request at another http(s) URL.
    pub fn with_url(mut self, url: &str) -> Result<Self, ConfigError> {
        self.url = parse_url(url)?;
        Ok(self)
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Header lookup ignoring ASCII case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Body of a text-completion request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionPayload {
    pub prompt: String,
    pub max_tokens: u32,
}

impl CompletionPayload {
    pub fn new(prompt: &str, max_tokens: u32) -> Self {
        Self {
            prompt: prompt.to_string(),
            max_tokens,
        }
    }
}

impl Default for CompletionPayload {
    fn default() -> Self {
        Self::new("Once upon a time", 20)
    }
}

pub(crate) fn parse_url(url: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(url)?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::UnsupportedScheme(other.to_string())),
    }
}

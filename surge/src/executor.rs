use crate::BoxedFut;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method};
use std::sync::Arc;
use surge_core::{IterationError, Outcome, RequestSpec};
use thiserror::Error;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("Invalid HTTP method `{0}`")]
    InvalidMethod(String),

    #[error("Invalid header `{0}`")]
    InvalidHeader(String),

    #[error("Error building HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Sends the configured request and classifies the response.
///
/// Cheap to clone; clones share the same connection pool.
#[derive(Debug, Clone)]
pub struct RequestExecutor {
    client: Client,
    method: Method,
    headers: HeaderMap,
    spec: Arc<RequestSpec>,
}

impl RequestExecutor {
    pub fn new(spec: RequestSpec) -> Result<Self, ExecutorError> {
        let method = Method::from_bytes(spec.method.as_bytes())
            .map_err(|_| ExecutorError::InvalidMethod(spec.method.clone()))?;

        let mut headers = HeaderMap::new();
        for (name, value) in &spec.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| ExecutorError::InvalidHeader(name.clone()))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|_| ExecutorError::InvalidHeader(name.clone()))?;
            headers.insert(header_name, header_value);
        }

        let mut builder = Client::builder();
        if let Some(timeout) = spec.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            method,
            headers,
            spec: Arc::new(spec),
        })
    }

    pub fn spec(&self) -> &RequestSpec {
        &self.spec
    }

    /// Perform one request. Failures are returned as [`IterationError`]s, never panics.
    pub async fn execute(&self) -> Outcome {
        let res = self
            .client
            .request(self.method.clone(), self.spec.url.as_str())
            .headers(self.headers.clone())
            .body(self.spec.body.clone())
            .send()
            .await
            .map_err(classify)?;

        let status = res.status();
        // NOTE: Reading the body is part of the iteration; a slow body counts towards latency.
        res.bytes().await.map_err(classify)?;

        if status.is_success() {
            Ok(status.as_u16())
        } else {
            Err(IterationError::Http(status.as_u16()))
        }
    }

    /// The iteration action to hand to a [`LoadTest`](crate::LoadTest).
    pub fn action(&self) -> impl Fn() -> BoxedFut + Send + Sync + Clone + 'static {
        let executor = self.clone();
        move || {
            let executor = executor.clone();
            Box::pin(async move { executor.execute().await }) as BoxedFut
        }
    }
}

fn classify(err: reqwest::Error) -> IterationError {
    if err.is_timeout() {
        IterationError::Timeout
    } else {
        trace!("Request failed: {err:?}");
        IterationError::Network(err.to_string())
    }
}

use crate::error::{ConfigError, Error};
use crate::model::{HeaderSet, Outcome, ParamSet};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use std::time::{Duration, Instant};
use tracing::debug;
use url::Url;

pub const DEFAULT_USER_AGENT: &str = "WAF-Tester/1.0";
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Sends one request and reports what happened. Never fails: transport
/// problems come back as a sentinel [`Outcome`].
#[async_trait]
pub trait Issuer: Send + Sync {
    async fn issue(&self, url: &Url, params: Option<&ParamSet>) -> Outcome;
}

/// GET issuer backed by a pooled `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpIssuer {
    client: reqwest::Client,
    header_map: HeaderMap,
    headers: HeaderSet,
    timeout: Duration,
}

impl HttpIssuer {
    pub fn new(headers: &HeaderSet) -> Result<Self, Error> {
        Self::with_timeout(headers, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(headers: &HeaderSet, timeout: Duration) -> Result<Self, Error> {
        let headers = with_default_user_agent(headers);

        let mut header_map = HeaderMap::with_capacity(headers.len());
        for (name, value) in &headers {
            let header_name =
                HeaderName::from_bytes(name.as_bytes()).map_err(|e| ConfigError::Header {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;
            let header_value = HeaderValue::from_str(value).map_err(|e| ConfigError::Header {
                name: name.clone(),
                reason: e.to_string(),
            })?;
            header_map.insert(header_name, header_value);
        }

        // Requests go straight to the target; proxy environment variables are ignored.
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .no_proxy()
            .build()?;

        Ok(Self {
            client,
            header_map,
            headers,
            timeout,
        })
    }

    /// Headers sent with every request, including the injected User-Agent.
    pub fn headers(&self) -> &HeaderSet {
        &self.headers
    }
}

#[async_trait]
impl Issuer for HttpIssuer {
    async fn issue(&self, url: &Url, params: Option<&ParamSet>) -> Outcome {
        let mut request = self
            .client
            .get(url.clone())
            .headers(self.header_map.clone());
        if let Some(params) = params {
            request = request.query(params);
        }

        let start = Instant::now();
        let response = request.send().await;
        let elapsed = start.elapsed();

        match response {
            Ok(res) => Outcome::response(
                res.status().as_u16(),
                elapsed,
                params.cloned(),
                self.headers.clone(),
            ),
            Err(e) => {
                let message = if e.is_timeout() {
                    format!("timeout after {}s: {}", self.timeout.as_secs_f64(), e)
                } else {
                    e.to_string()
                };
                debug!(url = %url, error = %message, "request failed");
                Outcome::failure(message, elapsed, params.cloned(), self.headers.clone())
            }
        }
    }
}

/// Add `User-Agent: WAF-Tester/1.0` unless the caller already set a
/// non-empty one under any casing.
pub fn with_default_user_agent(headers: &HeaderSet) -> HeaderSet {
    let mut headers = headers.clone();
    let user_agent = headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(USER_AGENT.as_str()))
        .map(|(name, value)| (name.clone(), value.trim().is_empty()));

    match user_agent {
        Some((_, false)) => {}
        Some((name, true)) => {
            headers.insert(name, DEFAULT_USER_AGENT.to_string());
        }
        None => {
            headers.insert("User-Agent".to_string(), DEFAULT_USER_AGENT.to_string());
        }
    }
    headers
}

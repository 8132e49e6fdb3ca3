//! Run configuration.
//!
//! A [`RunConfig`] can only be obtained through a validating constructor,
//! so every value the engine sees is complete and in range.

use crate::error::ConfigError;
use crate::limiter::RateScope;
use crate::model::{HeaderSet, ParamSet};
use reqwest::header::{HeaderName, HeaderValue};
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::time::Duration;
use url::Url;

pub const MIN_THREADS: usize = 1;
pub const MAX_THREADS: usize = 100;
pub const MIN_DURATION_SECS: u64 = 1;
pub const MAX_DURATION_SECS: u64 = 3600;
pub const MAX_RATE_LIMIT: u32 = 1000;

/// Key used for every line of a plain-text params file.
pub const TEXT_PARAM_KEY: &str = "param";

#[derive(Debug, Clone)]
pub struct RunConfig {
    url: Url,
    threads: usize,
    duration_secs: u64,
    rate_limit: u32,
    rate_scope: RateScope,
    params: Vec<ParamSet>,
    headers: HeaderSet,
}

impl RunConfig {
    /// Validate the scalar settings and load params/headers from disk.
    pub fn new(
        url: &str,
        threads: usize,
        duration_secs: u64,
        rate_limit: u32,
        params_source: Option<&Path>,
        headers_source: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        let url = validate_url(url)?;
        validate_ranges(threads, duration_secs, rate_limit)?;

        let params = match params_source {
            Some(path) => load_params(path)?,
            None => Vec::new(),
        };
        let headers = match headers_source {
            Some(path) => load_headers(path)?,
            None => HeaderSet::new(),
        };
        validate_headers(&headers)?;

        Ok(Self {
            url,
            threads,
            duration_secs,
            rate_limit,
            rate_scope: RateScope::default(),
            params,
            headers,
        })
    }

    /// Validate in-memory values.
    pub fn from_parts(
        url: &str,
        threads: usize,
        duration_secs: u64,
        rate_limit: u32,
        params: Vec<ParamSet>,
        headers: HeaderSet,
    ) -> Result<Self, ConfigError> {
        let url = validate_url(url)?;
        validate_ranges(threads, duration_secs, rate_limit)?;
        validate_headers(&headers)?;

        Ok(Self {
            url,
            threads,
            duration_secs,
            rate_limit,
            rate_scope: RateScope::default(),
            params,
            headers,
        })
    }

    pub fn with_rate_scope(mut self, rate_scope: RateScope) -> Self {
        self.rate_scope = rate_scope;
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    pub fn duration_secs(&self) -> u64 {
        self.duration_secs
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }

    /// Requests per second, 0 meaning unlimited.
    pub fn rate_limit(&self) -> u32 {
        self.rate_limit
    }

    pub fn rate_scope(&self) -> RateScope {
        self.rate_scope
    }

    pub fn params(&self) -> &[ParamSet] {
        &self.params
    }

    pub fn headers(&self) -> &HeaderSet {
        &self.headers
    }
}

fn validate_url(raw: &str) -> Result<Url, ConfigError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ConfigError::EmptyUrl);
    }
    if !(raw.starts_with("http://") || raw.starts_with("https://")) {
        return Err(ConfigError::Scheme(raw.to_string()));
    }

    let url = Url::parse(raw).map_err(|source| ConfigError::Url {
        url: raw.to_string(),
        source,
    })?;

    if !url.host_str().is_some_and(|host| !host.is_empty()) {
        return Err(ConfigError::MissingHost(raw.to_string()));
    }

    // `Url` rewrites numeric hosts such as `10` or `2130706433` into dotted
    // IPv4 form, so the host rules run on the text as typed.
    let host = typed_host(raw);
    if host.len() < 3 {
        return Err(ConfigError::HostTooShort(host.to_string()));
    }
    if !host.contains('.') {
        return Err(ConfigError::HostWithoutDot(host.to_string()));
    }

    Ok(url)
}

/// Host part of an absolute URL as written, without userinfo or port.
fn typed_host(raw: &str) -> &str {
    let rest = raw.split_once("://").map_or(raw, |(_, rest)| rest);
    let authority = rest.split(['/', '\\', '?', '#']).next().unwrap_or_default();
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, host)| host);
    if host_port.starts_with('[') {
        return host_port
            .find(']')
            .map_or(host_port, |end| &host_port[..=end]);
    }
    host_port.split(':').next().unwrap_or_default()
}

fn validate_ranges(threads: usize, duration_secs: u64, rate_limit: u32) -> Result<(), ConfigError> {
    if !(MIN_THREADS..=MAX_THREADS).contains(&threads) {
        return Err(ConfigError::Threads {
            value: threads,
            min: MIN_THREADS,
            max: MAX_THREADS,
        });
    }
    if !(MIN_DURATION_SECS..=MAX_DURATION_SECS).contains(&duration_secs) {
        return Err(ConfigError::Duration {
            value: duration_secs,
            min: MIN_DURATION_SECS,
            max: MAX_DURATION_SECS,
        });
    }
    if rate_limit > MAX_RATE_LIMIT {
        return Err(ConfigError::RateLimit {
            value: rate_limit,
            max: MAX_RATE_LIMIT,
        });
    }
    Ok(())
}

fn validate_headers(headers: &HeaderSet) -> Result<(), ConfigError> {
    for (name, value) in headers {
        HeaderName::from_bytes(name.as_bytes()).map_err(|e| ConfigError::Header {
            name: name.clone(),
            reason: e.to_string(),
        })?;
        HeaderValue::from_str(value).map_err(|e| ConfigError::Header {
            name: name.clone(),
            reason: e.to_string(),
        })?;
    }
    Ok(())
}

fn has_extension(path: &Path, allowed: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| allowed.iter().any(|a| ext.eq_ignore_ascii_case(a)))
        .unwrap_or(false)
}

fn read_source(path: &Path, allowed: &[&str], expected: &'static str) -> Result<String, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }
    if !has_extension(path, allowed) {
        return Err(ConfigError::Extension {
            path: path.to_path_buf(),
            expected,
        });
    }
    fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_json(path: &Path, content: &str) -> Result<Value, ConfigError> {
    serde_json::from_str(content).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn structure(path: &Path, reason: impl Into<String>) -> ConfigError {
    ConfigError::Structure {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

/// Load a list of parameter sets from a `.json` array of objects, or from a
/// `.txt` file with one value per line.
pub fn load_params(path: &Path) -> Result<Vec<ParamSet>, ConfigError> {
    let content = read_source(path, &["json", "txt"], ".json or .txt")?;

    if has_extension(path, &["txt"]) {
        return Ok(content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| ParamSet::from([(TEXT_PARAM_KEY.to_string(), line.to_string())]))
            .collect());
    }

    let Value::Array(entries) = parse_json(path, &content)? else {
        return Err(structure(path, "params file must contain a list of parameter sets"));
    };

    entries
        .into_iter()
        .enumerate()
        .map(|(idx, entry)| {
            let Value::Object(map) = entry else {
                return Err(structure(path, format!("entry {idx} is not an object")));
            };
            map.into_iter()
                .map(|(key, value)| match scalar_to_string(value) {
                    Some(value) => Ok((key, value)),
                    None => Err(structure(
                        path,
                        format!("entry {idx}: value of {key:?} must be a scalar"),
                    )),
                })
                .collect::<Result<ParamSet, ConfigError>>()
        })
        .collect()
}

/// Load a header map from a `.json` object of strings.
pub fn load_headers(path: &Path) -> Result<HeaderSet, ConfigError> {
    let content = read_source(path, &["json"], ".json")?;

    let Value::Object(map) = parse_json(path, &content)? else {
        return Err(structure(path, "headers file must contain a key-value object"));
    };

    map.into_iter()
        .map(|(name, value)| match value {
            Value::String(value) => Ok((name, value)),
            _ => Err(structure(path, format!("value of header {name:?} must be a string"))),
        })
        .collect()
}

fn scalar_to_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::new()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

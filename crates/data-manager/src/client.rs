//! Source client: ordered-endpoint HTTP fetch with envelope validation.
//!
//! The portal's statistics endpoints are unreliable in three independent ways:
//! a given deployment may only carry some of them, their bodies may start with
//! diagnostic text emitted before the JSON payload, and the envelope may
//! report failure while still answering 200. The client therefore walks an
//! ordered candidate list and returns the first endpoint that produces a
//! non-empty, valid payload; per-endpoint failures stay internal.

use chrono::Utc;
use log::{debug, warn};
use portal_charts_shared::{AggregateSnapshot, SeriesKey};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Per-attempt wait before an endpoint is treated as failed
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Which query an endpoint answers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointAction {
    /// `action=<key>_historico`: a time series for one key
    Historico,
    /// `action=general`: aggregate totals for every key
    General,
}

/// One candidate origin, ordered within its list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    pub url: String,
    pub action: EndpointAction,
}

impl Endpoint {
    pub fn historico(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            action: EndpointAction::Historico,
        }
    }

    pub fn general(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            action: EndpointAction::General,
        }
    }
}

/// Envelope every origin wraps its answers in
#[derive(Debug, Deserialize)]
struct SourceEnvelope {
    #[serde(default)]
    success: bool,
    data: Option<Value>,
    message: Option<String>,
}

/// Raw payload handed to the normalizer
#[derive(Debug, Clone, PartialEq)]
pub enum RawSeries {
    /// Historical records, field names still unresolved
    Records(Vec<Value>),
    /// Aggregate answer to be expanded into a short progression
    Aggregate(AggregateSnapshot),
}

/// Successful fetch plus where it came from
#[derive(Debug, Clone)]
pub struct FetchedPayload {
    pub raw: RawSeries,
    pub endpoint: String,
    pub message: Option<String>,
}

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("request to {url} failed: {message}")]
    Http { url: String, message: String },

    #[error("no JSON payload in response from {url}")]
    Preamble { url: String },

    #[error("JSON parse failed for {url}: {message}")]
    Parse { url: String, message: String },

    #[error("origin {url} rejected the request: {message}")]
    Envelope { url: String, message: String },

    #[error("origin {url} returned no usable data")]
    EmptyData { url: String },

    #[error("all {attempted} endpoints failed for series {key}")]
    AllEndpointsFailed {
        key: String,
        attempted: usize,
        failures: Vec<String>,
    },
}

/// HTTP client over an ordered list of candidate endpoints
pub struct SourceClient {
    http: reqwest::Client,
    timeout: Duration,
}

impl SourceClient {
    pub fn new(timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            timeout,
        }
    }

    /// Try `endpoints` strictly in order and return the first non-empty,
    /// valid payload. `params` (period, filters) are appended to historico
    /// queries only. No endpoint is retried within one call.
    pub async fn fetch_series(
        &self,
        key: SeriesKey,
        endpoints: &[Endpoint],
        params: &[(String, String)],
    ) -> Result<FetchedPayload, SourceError> {
        let mut failures = Vec::with_capacity(endpoints.len());

        for endpoint in endpoints {
            match self.attempt(key, endpoint, params).await {
                Ok(payload) => {
                    debug!(
                        "series {} served by {} ({} remaining candidates skipped)",
                        key,
                        endpoint.url,
                        endpoints.len() - failures.len() - 1
                    );
                    return Ok(payload);
                }
                Err(err) => {
                    debug!("endpoint {} failed for {}: {}", endpoint.url, key, err);
                    failures.push(err.to_string());
                }
            }
        }

        warn!(
            "all {} endpoints failed for series {}",
            endpoints.len(),
            key
        );
        Err(SourceError::AllEndpointsFailed {
            key: key.to_string(),
            attempted: endpoints.len(),
            failures,
        })
    }

    async fn attempt(
        &self,
        key: SeriesKey,
        endpoint: &Endpoint,
        params: &[(String, String)],
    ) -> Result<FetchedPayload, SourceError> {
        let url = &endpoint.url;
        let action = match endpoint.action {
            EndpointAction::Historico => key.historico_action(),
            EndpointAction::General => "general".to_string(),
        };

        // Cache-busting parameter defeats intermediary caches on the intranet
        let mut query: Vec<(String, String)> = vec![
            ("action".to_string(), action),
            ("_".to_string(), Utc::now().timestamp_millis().to_string()),
        ];
        if endpoint.action == EndpointAction::Historico {
            query.extend(params.iter().cloned());
        }

        let response = self
            .http
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(&query)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| SourceError::Http {
                url: url.clone(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Http {
                url: url.clone(),
                message: format!("HTTP {}", status),
            });
        }

        let body = response.text().await.map_err(|e| SourceError::Http {
            url: url.clone(),
            message: e.to_string(),
        })?;

        let envelope = parse_envelope(url, &body)?;
        self.validate(key, endpoint, envelope)
    }

    /// Envelope and shape checks shared by both actions
    fn validate(
        &self,
        key: SeriesKey,
        endpoint: &Endpoint,
        envelope: SourceEnvelope,
    ) -> Result<FetchedPayload, SourceError> {
        let url = &endpoint.url;

        if !envelope.success {
            return Err(SourceError::Envelope {
                url: url.clone(),
                message: envelope
                    .message
                    .unwrap_or_else(|| "success flag not set".to_string()),
            });
        }

        let data = match envelope.data {
            Some(Value::Null) | None => {
                return Err(SourceError::EmptyData { url: url.clone() })
            }
            Some(data) => data,
        };

        let raw = match endpoint.action {
            EndpointAction::Historico => match data {
                Value::Array(items) => {
                    if items.is_empty() {
                        // An empty series is not a success: the next
                        // candidate may still hold real history.
                        return Err(SourceError::EmptyData { url: url.clone() });
                    }
                    RawSeries::Records(items)
                }
                // Some origins answer the historico action with the
                // aggregate shape; the normalizer expands it.
                Value::Object(_) => match AggregateSnapshot::from_value(&data) {
                    Some(snapshot) => RawSeries::Aggregate(snapshot),
                    None => return Err(SourceError::EmptyData { url: url.clone() }),
                },
                _ => {
                    return Err(SourceError::Envelope {
                        url: url.clone(),
                        message: "data is neither an array nor an aggregate object".to_string(),
                    })
                }
            },
            EndpointAction::General => match data.get(key.as_str()) {
                Some(section) => match AggregateSnapshot::from_value(section) {
                    Some(snapshot) => RawSeries::Aggregate(snapshot),
                    None => return Err(SourceError::EmptyData { url: url.clone() }),
                },
                None => return Err(SourceError::EmptyData { url: url.clone() }),
            },
        };

        Ok(FetchedPayload {
            raw,
            endpoint: url.clone(),
            message: envelope.message,
        })
    }
}

impl Default for SourceClient {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_TIMEOUT)
    }
}

/// Parse a body that may carry non-JSON preamble: PHP origins emit warnings
/// and notices ahead of the payload, so parsing starts at the first brace.
fn parse_envelope(url: &str, body: &str) -> Result<SourceEnvelope, SourceError> {
    let tail = extract_json(body).ok_or_else(|| SourceError::Preamble {
        url: url.to_string(),
    })?;

    serde_json::from_str(tail).map_err(|e| SourceError::Parse {
        url: url.to_string(),
        message: e.to_string(),
    })
}

/// Slice of `body` starting at the first `{` or `[`, if any
fn extract_json(body: &str) -> Option<&str> {
    let start = body.find(|c: char| c == '{' || c == '[')?;
    Some(&body[start..])
}

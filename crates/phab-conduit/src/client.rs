//! Conduit HTTP client
//!
//! Conduit calls are form-encoded POSTs to `{base_url}/api/{method}` with a
//! JSON `params` field and `output=json`. Every response is wrapped in an
//! envelope of `result` / `error_code` / `error_info`; an error envelope is
//! surfaced as a [`ConduitError`].

use crate::error::ClientError;
use crate::Result;
use phab_domain::{ConduitError, Diff, Revision};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::debug;

/// Conduit endpoint configuration
#[derive(Debug, Clone)]
pub struct ConduitConfig {
    /// Base URL of the Phabricator install
    pub base_url: String,
    /// API token (optional for anonymous-readable installs)
    pub token: Option<String>,
}

impl Default for ConduitConfig {
    fn default() -> Self {
        ConduitConfig {
            base_url: std::env::var("PHAB_CONDUIT_URL")
                .unwrap_or_else(|_| "https://secure.phabricator.com".to_string()),
            token: std::env::var("PHAB_CONDUIT_TOKEN").ok(),
        }
    }
}

impl ConduitConfig {
    /// Create a new config from environment variables
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Create config for a specific install
    pub fn new(base_url: &str) -> Self {
        ConduitConfig {
            base_url: base_url.to_string(),
            token: None,
        }
    }

    /// Set the API token
    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }
}

/// The Conduit response envelope.
#[derive(Debug, Deserialize)]
struct ConduitEnvelope {
    #[serde(default)]
    result: Option<Value>,

    /// Error code; numeric on some installs, a symbolic `ERR-*` string on others.
    #[serde(default)]
    error_code: Option<Value>,

    #[serde(default)]
    error_info: Option<String>,
}

impl ConduitEnvelope {
    /// Unwrap the envelope, converting an error envelope into [`ConduitError`].
    fn into_result(self) -> Result<Value> {
        let errored =
            self.error_code.as_ref().map(|c| !c.is_null()).unwrap_or(false) || self.error_info.is_some();

        if errored {
            let mut code = 0;
            let mut symbol = None;
            match self.error_code {
                Some(Value::Number(n)) => code = n.as_i64().unwrap_or(0) as i32,
                Some(Value::String(s)) => match s.trim().parse::<i32>() {
                    Ok(n) => code = n,
                    Err(_) => symbol = Some(s),
                },
                _ => {}
            }

            let info = self
                .error_info
                .unwrap_or_else(|| "no error info supplied".to_string());
            let message = match symbol {
                Some(s) => format!("{}: {}", s, info),
                None => info,
            };
            return Err(ConduitError::with_code(message, code).into());
        }

        self.result.ok_or_else(|| {
            ClientError::MalformedResponse("envelope has neither result nor error".to_string())
        })
    }
}

/// Client for a single Conduit endpoint
pub struct ConduitClient {
    config: ConduitConfig,
    http_client: reqwest::Client,
}

impl ConduitClient {
    /// Create a new Conduit client
    pub fn new(config: ConduitConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("phab-bridge/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("Failed to create HTTP client");

        ConduitClient {
            config,
            http_client,
        }
    }

    /// Create client from environment variables
    pub fn from_env() -> Self {
        Self::new(ConduitConfig::from_env())
    }

    /// Issue a raw Conduit call and unwrap the response envelope.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let url = format!(
            "{}/api/{}",
            self.config.base_url.trim_end_matches('/'),
            method
        );

        let mut params = params;
        if let Some(token) = &self.config.token {
            if let Some(obj) = params.as_object_mut() {
                obj.insert("__conduit__".to_string(), json!({ "token": token }));
            }
        }

        debug!(method = %method, "Calling conduit");

        let form = [
            ("params", serde_json::to_string(&params)?),
            ("output", "json".to_string()),
        ];
        let response = self.http_client.post(&url).form(&form).send().await?;

        if !response.status().is_success() {
            return Err(ClientError::Http(format!(
                "{} returned HTTP {}",
                method,
                response.status()
            )));
        }

        let envelope: ConduitEnvelope = response.json().await?;
        envelope.into_result()
    }

    /// Connection check via `conduit.ping`; returns the server hostname.
    pub async fn ping(&self) -> Result<String> {
        let value = self.call("conduit.ping", json!({})).await?;
        value
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| {
                ClientError::MalformedResponse("conduit.ping did not return a hostname".to_string())
            })
    }

    /// Fetch diffs by diff id via `differential.querydiffs`.
    pub async fn query_diffs(&self, ids: &[u64]) -> Result<Vec<Diff>> {
        let value = self
            .call("differential.querydiffs", json!({ "ids": ids }))
            .await?;
        parse_query_diffs(value)
    }

    /// Fetch revisions by revision id via `differential.query`.
    pub async fn query_revisions(&self, ids: &[u64]) -> Result<Vec<Revision>> {
        let value = self
            .call("differential.query", json!({ "ids": ids }))
            .await?;
        parse_query_revisions(value)
    }
}

/// Decode a `differential.querydiffs` result: a dictionary of id -> diff.
///
/// An empty dictionary arrives as `[]` (PHP serialization artifact).
fn parse_query_diffs(value: Value) -> Result<Vec<Diff>> {
    if value.as_array().map(|a| a.is_empty()).unwrap_or(false) {
        return Ok(vec![]);
    }
    let map: BTreeMap<String, Diff> = serde_json::from_value(value)?;
    Ok(map.into_values().collect())
}

/// Decode a `differential.query` result: a list of revision dictionaries.
fn parse_query_revisions(value: Value) -> Result<Vec<Revision>> {
    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_new() {
        let config = ConduitConfig::new("https://phab.example.com");
        assert_eq!(config.base_url, "https://phab.example.com");
        assert!(config.token.is_none());
    }

    #[test]
    fn test_config_with_token() {
        let config = ConduitConfig::new("https://phab.example.com").with_token("api-abc");
        assert_eq!(config.token, Some("api-abc".to_string()));
    }

    #[test]
    fn test_config_from_env_has_url() {
        let config = ConduitConfig::from_env();
        assert!(!config.base_url.is_empty());
    }

    #[test]
    fn test_envelope_success() {
        let envelope: ConduitEnvelope = serde_json::from_value(json!({
            "result": { "hello": "world" },
            "error_code": null,
            "error_info": null
        }))
        .unwrap();

        let result = envelope.into_result().unwrap();
        assert_eq!(result["hello"], "world");
    }

    #[test]
    fn test_envelope_numeric_error_code() {
        let envelope: ConduitEnvelope = serde_json::from_value(json!({
            "result": null,
            "error_code": 7,
            "error_info": "invalid session"
        }))
        .unwrap();

        match envelope.into_result() {
            Err(ClientError::Conduit(err)) => {
                assert_eq!(err.code, 7);
                assert_eq!(err.message, "invalid session");
            }
            other => panic!("expected conduit error, got {:?}", other),
        }
    }

    #[test]
    fn test_envelope_symbolic_error_code() {
        let envelope: ConduitEnvelope = serde_json::from_value(json!({
            "result": null,
            "error_code": "ERR-CONDUIT-CALL",
            "error_info": "method does not exist"
        }))
        .unwrap();

        match envelope.into_result() {
            Err(ClientError::Conduit(err)) => {
                assert_eq!(err.code, 0);
                assert!(err.message.contains("ERR-CONDUIT-CALL"));
                assert!(err.message.contains("method does not exist"));
            }
            other => panic!("expected conduit error, got {:?}", other),
        }
    }

    #[test]
    fn test_envelope_numeric_string_error_code() {
        let envelope: ConduitEnvelope = serde_json::from_value(json!({
            "error_code": "429",
            "error_info": "rate limited"
        }))
        .unwrap();

        match envelope.into_result() {
            Err(ClientError::Conduit(err)) => assert_eq!(err.code, 429),
            other => panic!("expected conduit error, got {:?}", other),
        }
    }

    #[test]
    fn test_envelope_missing_result_is_malformed() {
        let envelope: ConduitEnvelope = serde_json::from_value(json!({})).unwrap();
        assert!(matches!(
            envelope.into_result(),
            Err(ClientError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_parse_query_diffs() {
        let result = json!({
            "42": {
                "id": "42",
                "revisionID": "123",
                "dateCreated": "1404329408",
                "branch": "master",
                "unitStatus": 3,
                "lintStatus": 1
            }
        });

        let diffs = parse_query_diffs(result).unwrap();
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].formatted_revision_id(), "D123");
        assert_eq!(diffs[0].unit_status, 3);
    }

    #[test]
    fn test_parse_query_diffs_empty_php_dict() {
        let diffs = parse_query_diffs(json!([])).unwrap();
        assert!(diffs.is_empty());
    }

    #[tokio::test]
    async fn test_call_unreachable_endpoint_is_http_error() {
        let client = ConduitClient::new(ConduitConfig::new("http://127.0.0.1:1"));
        let result = client.call("conduit.ping", json!({})).await;
        assert!(matches!(result, Err(ClientError::Http(_))));
    }

    #[test]
    fn test_parse_query_revisions() {
        let result = json!([
            {
                "id": "123",
                "phid": "PHID-DREV-abcd",
                "title": "Add retry to uploader",
                "statusName": "Needs Review",
                "status": "0"
            }
        ]);

        let revisions = parse_query_revisions(result).unwrap();
        assert_eq!(revisions.len(), 1);
        assert_eq!(revisions[0].phid, "PHID-DREV-abcd");
        assert_eq!(revisions[0].status_name, "Needs Review");
    }
}

//! HTTP transport for the Labelforge API.
//!
//! The client owns a shared `ureq` agent, attaches the workspace API key to
//! every request, and turns non-2xx responses into typed [`ApiError`]s. A
//! fixed allow-list of transient server statuses is retried with jittered
//! exponential backoff; everything else propagates immediately. The upload
//! pipeline never sees any of this, only "it eventually returns or raises".

use std::time::Duration;

use log::{debug, warn};
use rand::RngExt;
use serde::Serialize;
use serde_json::Value;

use crate::error::{ApiError, LabelforgeError};

/// Default API endpoint.
pub const BASE_API: &str = "https://api.labelforge.ai";

/// Statuses retried by the transport; everything else is surfaced as-is.
const RETRY_STATUS_CODES: [u16; 4] = [500, 502, 503, 504];

const DEFAULT_RETRIES: u32 = 3;
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const BACKOFF_BASE_MS: u64 = 500;
const BACKOFF_JITTER_MS: u64 = 250;

/// API client for the Labelforge platform.
///
/// Cloning is cheap (the underlying agent is shared) and clones may be used
/// concurrently; each request is stateless.
#[derive(Clone)]
pub struct Client {
    agent: ureq::Agent,
    base_url: String,
    api_key: String,
    retries: u32,
}

impl Client {
    /// Creates a client for the production API with the given workspace
    /// API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, BASE_API)
    }

    /// Creates a client against a custom base URL.
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS)))
            .http_status_as_error(false)
            .build();

        Self {
            agent: config.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            retries: DEFAULT_RETRIES,
        }
    }

    /// Overrides how many times transient server errors are retried.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// `GET` a path relative to the base URL.
    pub fn get(&self, path: &str, params: &[(&str, &str)]) -> Result<Value, LabelforgeError> {
        self.request("GET", path, None, params)
    }

    /// `POST` a JSON body to a path relative to the base URL.
    pub fn post(&self, path: &str, json: &impl Serialize) -> Result<Value, LabelforgeError> {
        let body = serde_json::to_value(json).map_err(|source| {
            LabelforgeError::UnexpectedResponse {
                path: path.to_string(),
                source,
            }
        })?;
        self.request("POST", path, Some(body), &[])
    }

    /// Makes the HTTP request and returns the deserialized response body.
    ///
    /// Non-2xx responses raise [`ApiError`] carrying the parsed message,
    /// details, and status code.
    pub fn request(
        &self,
        method: &str,
        path: &str,
        json: Option<Value>,
        params: &[(&str, &str)],
    ) -> Result<Value, LabelforgeError> {
        let url = format!("{}{}", self.base_url, path);

        let mut attempt = 0;
        loop {
            debug!("{method} {url} (attempt {attempt})");
            let mut response = self.send(method, &url, json.as_ref(), params)?;

            let status = response.status().as_u16();
            if attempt < self.retries && RETRY_STATUS_CODES.contains(&status) {
                let delay = backoff_delay(attempt);
                warn!("{method} {url} returned {status}, retrying in {delay:?}");
                std::thread::sleep(delay);
                attempt += 1;
                continue;
            }

            let success = response.status().is_success();
            let text = response.body_mut().read_to_string().unwrap_or_default();
            return parse_body(status, success, &text);
        }
    }

    /// `PUT` raw bytes to an absolute URL, typically a pre-signed
    /// destination outside the API host.
    pub fn put_bytes(
        &self,
        url: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<(), LabelforgeError> {
        let mut response = self
            .agent
            .put(url)
            .header("Content-Type", content_type)
            .send(bytes)?;

        let status = response.status().as_u16();
        if response.status().is_success() {
            return Ok(());
        }
        let text = response.body_mut().read_to_string().unwrap_or_default();
        parse_body(status, false, &text).map(|_| ())
    }

    fn send(
        &self,
        method: &str,
        url: &str,
        json: Option<&Value>,
        params: &[(&str, &str)],
    ) -> Result<ureq::http::Response<ureq::Body>, LabelforgeError> {
        let sdk_header = format!(
            "Labelforge-SDK/Rust; Version: {}",
            env!("CARGO_PKG_VERSION")
        );

        let response = match method {
            "GET" => {
                let mut request = self
                    .agent
                    .get(url)
                    .header("X-Api-Key", &self.api_key)
                    .header("X-Client-Sdk", &sdk_header);
                for (key, value) in params {
                    request = request.query(*key, *value);
                }
                request.call()?
            }
            _ => {
                let mut request = self
                    .agent
                    .post(url)
                    .header("X-Api-Key", &self.api_key)
                    .header("X-Client-Sdk", &sdk_header);
                for (key, value) in params {
                    request = request.query(*key, *value);
                }
                match json {
                    Some(body) => request.send_json(body)?,
                    None => request.send_empty()?,
                }
            }
        };
        Ok(response)
    }
}

fn backoff_delay(attempt: u32) -> Duration {
    let jitter = rand::rng().random_range(0..BACKOFF_JITTER_MS);
    Duration::from_millis(BACKOFF_BASE_MS * 2u64.pow(attempt) + jitter)
}

/// Turns a response body into a JSON value, or a typed API error for
/// non-2xx statuses.
///
/// Bodies that fail to parse as JSON degrade to `{"message": <text>}` so
/// the error path always has something to report.
fn parse_body(status: u16, success: bool, text: &str) -> Result<Value, LabelforgeError> {
    let data = serde_json::from_str::<Value>(text)
        .ok()
        .filter(|value| value.is_object() || value.is_array())
        .unwrap_or_else(|| serde_json::json!({ "message": text }));

    if success {
        return Ok(data);
    }

    Err(ApiError {
        message: data
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
        details: data
            .get("details")
            .cloned()
            .unwrap_or_else(|| Value::Array(Vec::new())),
        status_code: status,
    }
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_body_passes_through() {
        let value = parse_body(200, true, r#"{"id": "abc"}"#).expect("parse");
        assert_eq!(value["id"], "abc");
    }

    #[test]
    fn array_bodies_are_valid() {
        let value = parse_body(201, true, r#"[{"id": "a"}]"#).expect("parse");
        assert!(value.is_array());
    }

    #[test]
    fn non_json_success_body_becomes_message() {
        let value = parse_body(204, true, "").expect("parse");
        assert_eq!(value["message"], "");
    }

    #[test]
    fn error_response_carries_message_details_and_status() {
        let err = parse_body(
            422,
            false,
            r#"{"message": "invalid", "details": [{"field": "name"}]}"#,
        )
        .unwrap_err();

        match err {
            LabelforgeError::Api(api) => {
                assert_eq!(api.status_code, 422);
                assert_eq!(api.message.as_deref(), Some("invalid"));
                assert_eq!(api.details[0]["field"], "name");
            }
            other => panic!("expected api error, got {other}"),
        }
    }

    #[test]
    fn error_without_details_defaults_to_empty_list() {
        let err = parse_body(500, false, "gateway exploded").unwrap_err();
        match err {
            LabelforgeError::Api(api) => {
                assert_eq!(api.status_code, 500);
                assert_eq!(api.message.as_deref(), Some("gateway exploded"));
                assert_eq!(api.details, Value::Array(Vec::new()));
            }
            other => panic!("expected api error, got {other}"),
        }
    }

    #[test]
    fn backoff_grows_with_attempts() {
        let first = backoff_delay(0);
        let third = backoff_delay(2);
        assert!(first >= Duration::from_millis(BACKOFF_BASE_MS));
        assert!(third >= Duration::from_millis(BACKOFF_BASE_MS * 4));
    }
}

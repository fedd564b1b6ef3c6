//! HTTP client for the Proxmox management API.
//!
//! Authentication follows the Proxmox ticket scheme: a login request to
//! `access/ticket` yields a ticket that subsequent requests present as a
//! cookie. Tickets expire server-side after two hours, so the client renews
//! its ticket once it passes [`TICKET_RENEW_AGE`].
//!
//! Every response body is a JSON envelope `{"data": ...}`; [`PmgApi::get`]
//! returns the unwrapped payload.

use async_trait::async_trait;
use reqwest::{header, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::ExporterConfig;

/// Path prefix of the JSON flavour of the management API.
const API_ROOT: &str = "api2/json";

/// Age after which the auth ticket is renewed, comfortably below the
/// two-hour server-side expiry.
const TICKET_RENEW_AGE: Duration = Duration::from_secs(1800);

/// Overall timeout per API request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for establishing the TCP connection.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors talking to the management API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Remote returned HTTP {status} for {path}")]
    Status { status: StatusCode, path: String },
    #[error("Failed to decode response from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Unexpected payload from {path}: expected {expected}")]
    UnexpectedPayload {
        path: String,
        expected: &'static str,
    },
}

/// Read access to the management API.
///
/// Collectors depend on this trait rather than on the concrete client, so
/// tests can substitute canned payloads.
#[async_trait]
pub trait PmgApi: Send + Sync {
    /// GET `path` below the API root and return the unwrapped `data` payload.
    async fn get(&self, path: &str) -> Result<Value, ApiError>;

    /// GET a path whose payload is a list of entries.
    ///
    /// A `null` payload counts as an empty list; the API returns that for
    /// some endpoints when nothing is configured.
    async fn get_list(&self, path: &str) -> Result<Vec<Value>, ApiError> {
        match self.get(path).await? {
            Value::Array(entries) => Ok(entries),
            Value::Null => Ok(Vec::new()),
            _ => Err(ApiError::UnexpectedPayload {
                path: path.to_string(),
                expected: "array",
            }),
        }
    }

    /// GET a path whose payload is a single object.
    async fn get_object(&self, path: &str) -> Result<Value, ApiError> {
        let value = self.get(path).await?;
        if value.is_object() {
            Ok(value)
        } else {
            Err(ApiError::UnexpectedPayload {
                path: path.to_string(),
                expected: "object",
            })
        }
    }
}

#[derive(Debug, Deserialize)]
struct TicketResponse {
    data: TicketData,
}

#[derive(Debug, Deserialize)]
struct TicketData {
    ticket: String,
}

struct AuthTicket {
    ticket: String,
    issued_at: Instant,
}

/// Client for a single Proxmox Mail Gateway (or PVE/PBS) instance.
pub struct PmgClient {
    http: reqwest::Client,
    base_url: String,
    user: String,
    password: String,
    cookie_name: &'static str,
    auth: Mutex<AuthTicket>,
}

impl PmgClient {
    /// Build the client and perform the initial login.
    ///
    /// Fails when the remote is unreachable or rejects the credentials, so
    /// misconfiguration surfaces at startup rather than on the first scrape.
    pub async fn connect(config: &ExporterConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .danger_accept_invalid_certs(!config.verify_ssl)
            .build()?;

        let authority = host_authority(&config.host, config.service.default_port());
        let base_url = format!("{}://{}/{}", config.backend.scheme(), authority, API_ROOT);

        let client = Self {
            http,
            base_url,
            user: config.user.clone(),
            password: config.password.clone(),
            cookie_name: config.service.auth_cookie_name(),
            auth: Mutex::new(AuthTicket {
                ticket: String::new(),
                issued_at: Instant::now(),
            }),
        };

        let auth = client.login().await?;
        *client.auth.lock().await = auth;

        info!(
            host = %authority,
            user = %config.user,
            "Connected to management API"
        );

        Ok(client)
    }

    /// Request a fresh auth ticket.
    async fn login(&self) -> Result<AuthTicket, ApiError> {
        let path = "access/ticket";
        let url = format!("{}/{}", self.base_url, path);

        let response = self
            .http
            .post(&url)
            .form(&[
                ("username", self.user.as_str()),
                ("password", self.password.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ApiError::Status {
                status: response.status(),
                path: path.to_string(),
            });
        }

        let body: TicketResponse = response.json().await.map_err(|e| ApiError::Decode {
            path: path.to_string(),
            source: e,
        })?;

        Ok(AuthTicket {
            ticket: body.data.ticket,
            issued_at: Instant::now(),
        })
    }

    /// Current ticket, renewing it first when it has aged out.
    ///
    /// The mutex serializes renewals so concurrent scrapes trigger at most
    /// one login.
    async fn ticket(&self) -> Result<String, ApiError> {
        let mut auth = self.auth.lock().await;
        if auth.issued_at.elapsed() >= TICKET_RENEW_AGE {
            debug!("Auth ticket aged out, renewing");
            *auth = self.login().await?;
        }
        Ok(auth.ticket.clone())
    }
}

#[async_trait]
impl PmgApi for PmgClient {
    async fn get(&self, path: &str) -> Result<Value, ApiError> {
        let ticket = self.ticket().await?;
        let url = format!("{}/{}", self.base_url, path);
        debug!(path, "API request");

        let response = self
            .http
            .get(&url)
            .header(header::COOKIE, format!("{}={}", self.cookie_name, ticket))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ApiError::Status {
                status: response.status(),
                path: path.to_string(),
            });
        }

        let body: Value = response.json().await.map_err(|e| ApiError::Decode {
            path: path.to_string(),
            source: e,
        })?;

        Ok(unwrap_data(body))
    }
}

/// Append the service default port unless the host names a port already.
fn host_authority(host: &str, default_port: u16) -> String {
    if host.contains(':') {
        host.to_string()
    } else {
        format!("{host}:{default_port}")
    }
}

/// Pull the payload out of the `{"data": ...}` response envelope.
fn unwrap_data(mut body: Value) -> Value {
    body.get_mut("data").map(Value::take).unwrap_or(Value::Null)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashMap;

    /// In-memory API substitute mapping paths to canned payloads.
    ///
    /// Unknown paths answer with HTTP 404, mirroring a remote fault.
    pub(crate) struct StubApi {
        responses: HashMap<String, Value>,
    }

    impl StubApi {
        pub(crate) fn new() -> Self {
            Self {
                responses: HashMap::new(),
            }
        }

        pub(crate) fn with(mut self, path: &str, payload: Value) -> Self {
            self.responses.insert(path.to_string(), payload);
            self
        }
    }

    #[async_trait]
    impl PmgApi for StubApi {
        async fn get(&self, path: &str) -> Result<Value, ApiError> {
            match self.responses.get(path) {
                Some(payload) => Ok(payload.clone()),
                None => Err(ApiError::Status {
                    status: StatusCode::NOT_FOUND,
                    path: path.to_string(),
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::StubApi;
    use super::*;
    use serde_json::json;

    #[test]
    fn test_host_authority() {
        assert_eq!(host_authority("pmg.example.com", 8006), "pmg.example.com:8006");
        assert_eq!(host_authority("pmg.example.com:9443", 8006), "pmg.example.com:9443");
        assert_eq!(host_authority("10.0.0.5", 8007), "10.0.0.5:8007");
    }

    #[test]
    fn test_unwrap_data() {
        assert_eq!(unwrap_data(json!({"data": [1, 2]})), json!([1, 2]));
        assert_eq!(unwrap_data(json!({"data": null})), Value::Null);
        assert_eq!(unwrap_data(json!({"other": 1})), Value::Null);
    }

    #[tokio::test]
    async fn test_get_list_accepts_array() {
        let api = StubApi::new().with("nodes", json!([{"node": "pmg1"}]));
        let entries = api.get_list("nodes").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["node"], "pmg1");
    }

    #[tokio::test]
    async fn test_get_list_treats_null_as_empty() {
        let api = StubApi::new().with("config/pbs", Value::Null);
        let entries = api.get_list("config/pbs").await.unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn test_get_list_rejects_object() {
        let api = StubApi::new().with("nodes", json!({"node": "pmg1"}));
        let err = api.get_list("nodes").await.unwrap_err();
        assert!(matches!(err, ApiError::UnexpectedPayload { expected: "array", .. }));
    }

    #[tokio::test]
    async fn test_get_object_accepts_object() {
        let api = StubApi::new().with("version", json!({"version": "8.1"}));
        let value = api.get_object("version").await.unwrap();
        assert_eq!(value["version"], "8.1");
    }

    #[tokio::test]
    async fn test_get_object_rejects_array() {
        let api = StubApi::new().with("version", json!([]));
        let err = api.get_object("version").await.unwrap_err();
        assert!(matches!(err, ApiError::UnexpectedPayload { expected: "object", .. }));
    }

    #[tokio::test]
    async fn test_unknown_path_is_a_status_error() {
        let api = StubApi::new();
        let err = api.get("nodes").await.unwrap_err();
        match err {
            ApiError::Status { status, path } => {
                assert_eq!(status, StatusCode::NOT_FOUND);
                assert_eq!(path, "nodes");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}

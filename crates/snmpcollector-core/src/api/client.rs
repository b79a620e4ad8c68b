//! API client for communicating with the snmpcollector REST API.
//!
//! Every public operation follows the same sequence: make sure the session
//! is fresh (logging in if needed), attach the session cookie, send the
//! request, then unwrap the response or fail with a typed error.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{header, Client, Method, StatusCode};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::auth::{Credentials, LoginExchange, Session, SESSION_TTL_SECS};
use crate::models::{ApiResponse, DeviceConfig, ResourcePath};

use super::{ApiError, Result};

// ============================================================================
// Constants
// ============================================================================

const LOGIN_PATH: &str = "/login";

/// Reloads all device configs from the database into the running agent
const RELOAD_PATH: &str = "/api/rt/agent/reload";

const DEVICES_INFO_PATH: &str = "/api/rt/device/info";

/// HTTP request timeout in seconds.
/// Reloading a large agent can take a while, so this is generous.
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub request_timeout: Duration,
    /// How long a session is trusted after login
    pub session_ttl: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            session_ttl: Duration::from_secs(SESSION_TTL_SECS as u64),
        }
    }
}

/// API client for one snmpcollector instance.
///
/// Owns the credentials and the session for its whole lifetime. No request
/// is made until the first operation is called. The session sits behind a
/// mutex that is held across the login round trip, so concurrent callers
/// never log in twice for the same expiry.
pub struct ApiClient {
    client: Client,
    credentials: Credentials,
    session: Mutex<Session>,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str, username: &str, password: &str) -> Result<Self> {
        Self::with_options(
            Credentials::new(base_url, username, password),
            ClientOptions::default(),
        )
    }

    pub fn with_options(credentials: Credentials, options: ClientOptions) -> Result<Self> {
        let client = Client::builder()
            .timeout(options.request_timeout)
            .build()?;

        Ok(Self {
            client,
            credentials,
            session: Mutex::new(Session::with_ttl(options.session_ttl)),
        })
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// When the current session expires, or `None` before the first login
    pub async fn session_expires_at(&self) -> Option<DateTime<Utc>> {
        self.session.lock().await.expires_at()
    }

    /// Forget the current session; the next request logs in again
    pub async fn invalidate_session(&self) {
        self.session.lock().await.invalidate();
    }

    /// Log in if the session is missing or expired, without making a
    /// resource request
    pub async fn authenticate(&self) -> Result<()> {
        self.cookie_header().await.map(|_| ())
    }

    async fn cookie_header(&self) -> Result<String> {
        let mut session = self.session.lock().await;
        session.ensure_valid(&self.credentials, self).await?;
        Ok(session.cookie()?.header_value())
    }

    /// Send an authenticated request to `path` and unwrap the response.
    ///
    /// Any status other than 200 fails with `ApiError::Request`. A 200 with
    /// a JSON content type is parsed, anything else is returned as text.
    pub async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&B>,
    ) -> Result<ApiResponse> {
        let cookie = self.cookie_header().await?;
        let url = self.credentials.url(path);

        debug!(%method, path, "Sending request");

        let mut request = self
            .client
            .request(method.clone(), &url)
            .header(header::COOKIE, cookie);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(payload) = body {
            request = request.json(payload);
        }

        let response = request.send().await?;
        Self::read_response(method, path, response).await
    }

    async fn read_response(
        method: Method,
        path: &str,
        response: reqwest::Response,
    ) -> Result<ApiResponse> {
        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            warn!(%method, path, %status, "Request failed");
            return Err(ApiError::request(method, path, status, body));
        }

        let is_json = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(ApiResponse::is_json_content_type)
            .unwrap_or(false);

        let text = response.text().await?;
        if !is_json {
            return Ok(ApiResponse::Text(text));
        }

        let value = serde_json::from_str(&text).map_err(|e| {
            ApiError::InvalidResponse(format!("{} {} returned malformed JSON: {}", method, path, e))
        })?;
        Ok(ApiResponse::Json(value))
    }

    async fn get(&self, path: &str) -> Result<ApiResponse> {
        self.send::<()>(Method::GET, path, &[], None).await
    }

    // ===== Runtime =====

    /// Reload all device configs from the database into the running agent
    pub async fn reload_config(&self) -> Result<ApiResponse> {
        self.get(RELOAD_PATH).await
    }

    /// Fetch all devices and their runtime info
    pub async fn get_devices_info(&self) -> Result<ApiResponse> {
        self.get(DEVICES_INFO_PATH).await
    }

    // ===== Device configuration =====

    /// Fetch all device configs from the database
    pub async fn get_devices_config(&self) -> Result<ApiResponse> {
        self.get(&ResourcePath::collection(false).to_path()).await
    }

    /// Fetch one device config, from the running agent or the database
    pub async fn get_device_config(&self, id: &str, runtime: bool) -> Result<ApiResponse> {
        self.get(&ResourcePath::device(id, runtime).to_path()).await
    }

    pub async fn update_device_config(
        &self,
        id: &str,
        config: &DeviceConfig,
        runtime: bool,
    ) -> Result<ApiResponse> {
        let path = ResourcePath::device(id, runtime).to_path();
        self.send(Method::PUT, &path, &[], Some(config)).await
    }

    pub async fn create_device_config(
        &self,
        config: &DeviceConfig,
        runtime: bool,
    ) -> Result<ApiResponse> {
        let path = ResourcePath::collection(runtime).to_path();
        self.send(Method::POST, &path, &[], Some(config)).await
    }

    /// Delete a device config. The service answers with plain text on success.
    pub async fn delete_device_config(&self, id: &str, runtime: bool) -> Result<ApiResponse> {
        let path = ResourcePath::device(id, runtime).to_path();
        self.send::<()>(Method::DELETE, &path, &[], None).await
    }
}

impl LoginExchange for ApiClient {
    fn login(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<Vec<(String, String)>>> + Send {
        async move {
            let url = credentials.url(LOGIN_PATH);

            let response = self
                .client
                .post(&url)
                .form(&[
                    ("username", credentials.username()),
                    ("password", credentials.password()),
                ])
                .send()
                .await
                .map_err(|e| ApiError::Authentication(format!("Login request failed: {}", e)))?;

            let status = response.status();
            if status != StatusCode::OK {
                let body = response.text().await.unwrap_or_default();
                warn!(%status, user = credentials.username(), "Login rejected");
                return Err(ApiError::login_rejected(status, &body));
            }

            Ok(response
                .cookies()
                .map(|c| (c.name().to_string(), c.value().to_string()))
                .collect())
        }
    }
}

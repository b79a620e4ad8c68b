use std::fmt;
use std::future::Future;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use super::Credentials;
use crate::api::{ApiError, Result};

/// Every session cookie issued by the service starts with this
pub const SESSION_COOKIE_PREFIX: &str = "snmpcollector-sess-";

/// Cookie name used by a service running with the default instance id
pub const DEFAULT_SESSION_COOKIE: &str = "snmpcollector-sess-my_instance_cookie";

/// Session validity in seconds.
/// The service does not report an expiry, so one hour from login is assumed.
pub const SESSION_TTL_SECS: i64 = 3600;

/// Performs the login round trip for a `Session`.
///
/// Implementations return the cookies set by the login response as
/// (name, value) pairs, and fail with `ApiError::Authentication` when the
/// service does not accept the login.
pub trait LoginExchange {
    fn login(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<Vec<(String, String)>>> + Send;
}

/// Session cookie harvested from a login response
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken {
    pub name: String,
    pub value: String,
}

impl SessionToken {
    /// Value for a `Cookie` request header
    pub fn header_value(&self) -> String {
        format!("{}={}", self.name, self.value)
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionToken")
            .field("name", &self.name)
            .field("value", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct SessionData {
    pub token: SessionToken,
    pub logged_in_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionData {
    /// Expiry is clamped to the latest representable time
    pub fn new(token: SessionToken, ttl: Duration) -> Self {
        let logged_in_at = Utc::now();
        let expires_at = logged_in_at
            .checked_add_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            token,
            logged_in_at,
            expires_at,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    pub fn time_until_expiry(&self) -> Duration {
        self.expires_at - Utc::now()
    }
}

/// Pick the session cookie out of a login response.
///
/// The default instance cookie wins; otherwise the first cookie carrying the
/// session prefix is used, which covers services started with a custom
/// instance id.
pub fn harvest_token(cookies: &[(String, String)]) -> Result<SessionToken> {
    let found = cookies
        .iter()
        .find(|(name, _)| name == DEFAULT_SESSION_COOKIE)
        .or_else(|| {
            cookies
                .iter()
                .find(|(name, _)| name.starts_with(SESSION_COOKIE_PREFIX))
        });

    match found {
        Some((name, value)) => Ok(SessionToken {
            name: name.clone(),
            value: value.clone(),
        }),
        None => {
            let names: Vec<&str> = cookies.iter().map(|(name, _)| name.as_str()).collect();
            warn!(?names, "Login response carried no session cookie");
            Err(ApiError::Authentication(format!(
                "No cookie starting with '{}' in login response",
                SESSION_COOKIE_PREFIX
            )))
        }
    }
}

/// The single session held by a client.
///
/// Starts empty and is filled by the first `ensure_valid`. A session with no
/// data counts as expired.
#[derive(Debug)]
pub struct Session {
    pub data: Option<SessionData>,
    ttl: Duration,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            data: None,
            ttl: Duration::seconds(SESSION_TTL_SECS),
        }
    }

    /// Create a session with a non-default validity window
    pub fn with_ttl(ttl: std::time::Duration) -> Self {
        let ttl = Duration::from_std(ttl).unwrap_or_else(|_| {
            warn!(?ttl, "Session lifetime out of range, using default");
            Duration::seconds(SESSION_TTL_SECS)
        });
        Self { data: None, ttl }
    }

    /// Check if session is valid (exists and not expired)
    pub fn is_valid(&self) -> bool {
        self.data.as_ref().map(|d| !d.is_expired()).unwrap_or(false)
    }

    /// Log in through `exchange` unless the current session is still valid.
    ///
    /// On failure the previous session data is kept as it was.
    pub async fn ensure_valid<L>(&mut self, credentials: &Credentials, exchange: &L) -> Result<()>
    where
        L: LoginExchange + ?Sized,
    {
        if self.is_valid() {
            return Ok(());
        }

        debug!(
            user = credentials.username(),
            had_session = self.data.is_some(),
            "Session missing or expired, logging in"
        );

        let cookies = exchange.login(credentials).await?;
        let token = harvest_token(&cookies)?;
        let data = SessionData::new(token, self.ttl);

        info!(
            cookie = %data.token.name,
            expires_in_secs = data.time_until_expiry().num_seconds(),
            "Logged in"
        );
        self.data = Some(data);
        Ok(())
    }

    /// The cookie to attach to an authenticated request
    pub fn cookie(&self) -> Result<&SessionToken> {
        self.data
            .as_ref()
            .map(|d| &d.token)
            .ok_or(ApiError::NotAuthenticated)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.data.as_ref().map(|d| d.expires_at)
    }

    /// Drop the session so the next request logs in again
    pub fn invalidate(&mut self) {
        self.data = None;
    }
}

use std::fmt;

use anyhow::{Context, Result};
use keyring::Entry;

const SERVICE_NAME: &str = "snmpcollector";

/// Service endpoint plus the login used against it.
///
/// Fixed for the lifetime of a client. The base URL is stored without a
/// trailing slash so resource paths can be appended directly.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    base_url: String,
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    /// Absolute URL for a path on the service
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

pub struct CredentialStore;

impl CredentialStore {
    /// Keychain accounts are per user and per service instance
    fn entry(base_url: &str, username: &str) -> Result<Entry> {
        let account = format!("{}@{}", username, base_url.trim_end_matches('/'));
        Entry::new(SERVICE_NAME, &account).context("Failed to create keyring entry")
    }

    /// Store a password in the OS keychain
    pub fn store(base_url: &str, username: &str, password: &str) -> Result<()> {
        Self::entry(base_url, username)?
            .set_password(password)
            .context("Failed to store password in keychain")?;
        Ok(())
    }

    /// Retrieve the password for a user on a service instance
    pub fn get_password(base_url: &str, username: &str) -> Result<String> {
        Self::entry(base_url, username)?
            .get_password()
            .context("Failed to retrieve password from keychain")
    }

    /// Delete stored credentials
    pub fn delete(base_url: &str, username: &str) -> Result<()> {
        Self::entry(base_url, username)?
            .delete_credential()
            .context("Failed to delete credential from keychain")?;
        Ok(())
    }

    pub fn has_credentials(base_url: &str, username: &str) -> bool {
        Self::entry(base_url, username)
            .map(|entry| entry.get_password().is_ok())
            .unwrap_or(false)
    }
}

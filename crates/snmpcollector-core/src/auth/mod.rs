//! Authentication module for managing snmpcollector sessions and credentials.
//!
//! This module provides:
//! - `Session`: Cookie-based session management with automatic expiry
//! - `Credentials`: The service endpoint and login for one client
//! - `CredentialStore`: Secure OS-level credential storage via keyring
//!
//! The service issues no expiry with its session cookie, so sessions are
//! treated as valid for one hour after login.

pub mod credentials;
pub mod session;

pub use credentials::{CredentialStore, Credentials};
pub use session::{
    harvest_token, LoginExchange, Session, SessionData, SessionToken, DEFAULT_SESSION_COOKIE,
    SESSION_COOKIE_PREFIX, SESSION_TTL_SECS,
};

use reqwest::{Method, StatusCode};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Unable to {method} {path} ({status}): {}", truncate_body(.body))]
    Request {
        method: Method,
        path: String,
        status: StatusCode,
        /// Raw response body, untruncated
        body: String,
    },

    #[error("Not authenticated - no session token available")]
    NotAuthenticated,

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

pub type Result<T> = std::result::Result<T, ApiError>;

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Truncate a response body to avoid logging excessive data
fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY_LENGTH {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY_LENGTH;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
}

impl ApiError {
    pub fn request(method: Method, path: &str, status: StatusCode, body: String) -> Self {
        ApiError::Request {
            method,
            path: path.to_string(),
            status,
            body,
        }
    }

    /// Build an authentication error from a rejected login response
    pub fn login_rejected(status: StatusCode, body: &str) -> Self {
        ApiError::Authentication(format!(
            "Unable to login ({}): {}",
            status,
            truncate_body(body)
        ))
    }

    pub fn is_authentication(&self) -> bool {
        matches!(self, ApiError::Authentication(_))
    }
}

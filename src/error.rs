//! Error taxonomy shared by the marketplace client and the catalog workflows

use thiserror::Error;

/// Everything a marketplace round trip or a user action can fail with.
#[derive(Error, Debug)]
pub enum AppError {
    /// Credential rejected, expired, or missing the required scopes.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The request never produced an HTTP response.
    #[error("network failure: {0}")]
    Network(String),

    /// Non-2xx response. `payload` keeps the marketplace's error body.
    #[error("marketplace API error ({status}): {message}")]
    Api {
        status: u16,
        message: String,
        payload: Option<serde_json::Value>,
    },

    /// Malformed user input, rejected before any network call.
    #[error("invalid input: {0}")]
    Validation(String),

    /// A response body that does not match the expected schema.
    #[error("unexpected response shape: {0}")]
    Decode(String),
}

impl AppError {
    /// Short message meant for the person at the keyboard.
    pub fn user_message(&self) -> String {
        match self {
            Self::Auth(reason) => {
                format!("The access token was rejected ({reason}). Paste a fresh token in settings.")
            }
            Self::Network(_) => "Could not reach the marketplace. This is usually a connectivity, \
                                 proxy or cross-origin restriction, not a problem with the token."
                .to_string(),
            Self::Api { status, message, .. } => {
                format!("The marketplace refused the request ({status}): {message}")
            }
            Self::Validation(reason) => reason.clone(),
            Self::Decode(reason) => format!("The marketplace answered in an unexpected format: {reason}"),
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            Self::Api {
                status: status.as_u16(),
                message: err.to_string(),
                payload: None,
            }
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_message_does_not_blame_the_token() {
        let message = AppError::Network("connection refused".to_string()).user_message();
        assert!(message.contains("not a problem with the token"));
        assert_ne!(
            message,
            AppError::Auth("401".to_string()).user_message()
        );
    }

    #[test]
    fn api_message_carries_marketplace_text() {
        let err = AppError::Api {
            status: 400,
            message: "invalid dimensions for category".to_string(),
            payload: None,
        };
        assert!(err.user_message().contains("invalid dimensions for category"));
        assert!(!err.is_network());
    }
}

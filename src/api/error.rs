//! API error types.

use thiserror::Error;

/// Failure returned by a [`BookingApi`](super::BookingApi) call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// HTTP 400.
    #[error("bad request: {message}")]
    BadRequest { message: String },

    /// HTTP 409.
    #[error("conflict: {message}")]
    Conflict { message: String },

    /// HTTP 5xx.
    #[error("server error: {message}")]
    Server { message: String },

    /// Any other status the client does not handle.
    #[error("unexpected HTTP status {0}")]
    UnknownStatus(u16),

    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The response body did not match the expected shape.
    #[error("decode error: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::Server {
            message: message.into(),
        }
    }

    /// Map an error status and its message to the matching variant.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        match status {
            400 => Self::bad_request(message),
            409 => Self::conflict(message),
            500..=599 => Self::server(message),
            _ => Self::UnknownStatus(status),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status() {
        assert_eq!(ApiError::from_status(400, "x"), ApiError::bad_request("x"));
        assert_eq!(ApiError::from_status(409, "x"), ApiError::conflict("x"));
        assert_eq!(ApiError::from_status(503, "x"), ApiError::server("x"));
        assert_eq!(ApiError::from_status(404, "x"), ApiError::UnknownStatus(404));
    }

    #[test]
    fn test_display() {
        assert_eq!(
            ApiError::conflict("email already in use").to_string(),
            "conflict: email already in use"
        );
        assert_eq!(ApiError::UnknownStatus(418).to_string(), "unexpected HTTP status 418");
    }
}

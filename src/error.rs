//! Error types and bridge rejections

use crate::response::Response;
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for this crate
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for plugin operations
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Transport failure reported by the HTTP stack
    #[error("Network error: {message}")]
    Network {
        /// Error message
        message: String,
    },

    /// TLS/Certificate error, including pinning mismatches
    #[error("TLS error: {message}")]
    Tls {
        /// Error message
        message: String,
    },

    /// Timeout error
    #[error("Request timed out")]
    Timeout,

    /// The server answered with a non-success status (native backend only)
    #[error("Request failed with status {}", .response.status)]
    Status {
        /// The full response, body included
        response: Box<Response>,
    },

    /// Pinning was requested but no certificates were supplied
    #[error("SSL Pinning key not provided")]
    PinningNotConfigured,

    /// A pinned certificate asset could not be loaded
    #[error("Failed to load certificate '{name}': {message}")]
    Certificate {
        /// Asset name as given in `sslPinning.certs`
        name: String,
        /// Error message
        message: String,
    },

    /// A public key pin is not a base64 SHA-256 digest
    #[error("Invalid public key pin: {0}")]
    InvalidPin(String),

    /// The save directory for a file response is not writable
    #[error("App lacks permission to write to: {}", .path.display())]
    WritePermissionDenied {
        /// Directory that could not be written
        path: PathBuf,
    },

    /// A file name contained path components
    #[error("Invalid file name: {0}")]
    InvalidFileName(String),

    /// A file reference in form data had neither `uri` nor `path`
    #[error("Form field '{field}' references a file without uri or path")]
    MissingFileLocation {
        /// Form field name
        field: String,
    },

    /// The operation has no implementation on this backend
    #[error("{0} is not available on this platform")]
    Unavailable(&'static str),

    /// Unknown bridge method
    #[error("Method not implemented: {0}")]
    Unimplemented(String),

    /// Request options could not be used as given
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// UTF-8 conversion error
    #[error("UTF-8 conversion error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Base64 decoding error
    #[error("Base64 error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            return Error::Timeout;
        }

        #[cfg(feature = "native")]
        {
            let mut source = std::error::Error::source(&error);
            while let Some(cause) = source {
                let tls = cause.downcast_ref::<rustls::Error>().or_else(|| {
                    cause
                        .downcast_ref::<std::io::Error>()
                        .and_then(|io| io.get_ref())
                        .and_then(|inner| inner.downcast_ref::<rustls::Error>())
                });
                if let Some(tls) = tls {
                    return Error::Tls {
                        message: tls.to_string(),
                    };
                }
                source = cause.source();
            }
        }

        if error.is_builder() {
            return Error::InvalidRequest(error.to_string());
        }

        Error::Network {
            message: error.to_string(),
        }
    }
}

/// A failed plugin call as seen by the bridge host
#[derive(Debug, Clone, Serialize)]
pub struct Rejection {
    /// Human readable message
    pub message: String,
    /// Stable machine readable code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
    /// Extra payload, the response for a failed status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl Error {
    /// Stable code for the bridge, when the host can act on it
    pub fn code(&self) -> Option<&'static str> {
        match self {
            Error::WritePermissionDenied { .. } => Some("WRITE_PERMISSION_DENIED"),
            Error::PinningNotConfigured => Some("SSL_PINNING_MISSING"),
            Error::Certificate { .. } | Error::InvalidPin(_) | Error::Tls { .. } => {
                Some("SSL_ERROR")
            }
            Error::Timeout => Some("TIMEOUT"),
            Error::Unavailable(_) => Some("UNAVAILABLE"),
            Error::Unimplemented(_) => Some("UNIMPLEMENTED"),
            Error::Json(_) | Error::InvalidRequest(_) => Some("INVALID_REQUEST"),
            _ => None,
        }
    }

    /// Convert into the shape a plugin host rejects a call with
    pub fn rejection(&self) -> Rejection {
        match self {
            Error::Status { response } => Rejection {
                message: "Request failed".to_string(),
                code: Some("HTTP_STATUS"),
                data: serde_json::to_value(response.as_ref()).ok(),
            },
            Error::Json(e) => Rejection {
                message: "Invalid request JSON".to_string(),
                code: self.code(),
                data: Some(serde_json::Value::String(e.to_string())),
            },
            Error::Io(e) => Rejection {
                message: "File Exception".to_string(),
                code: self.code(),
                data: Some(serde_json::Value::String(e.to_string())),
            },
            _ => Rejection {
                message: self.to_string(),
                code: self.code(),
                data: None,
            },
        }
    }
}

// latex-proxy-client - util/error.rs
//
// Typed error hierarchy with context-preserving error chains.
// All errors preserve the causal chain for diagnostic logging.
//
// The backend only ever reports one kind of failure ("request failed" with a
// human-readable message). Everything else here describes what went wrong on
// the client side of the exchange.

use std::fmt;
use std::io;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// API errors
// ---------------------------------------------------------------------------

/// Errors produced by the API client.
#[derive(Debug)]
pub enum ApiError {
    /// The backend answered with a non-success status.
    ///
    /// `message` comes from the `msg` field of a JSON error body, the raw
    /// body text, or the generic fallback, in that order. Its `Display` is
    /// exactly `message` so callers can show it verbatim.
    Request { status: u16, message: String },

    /// The HTTP exchange itself failed (connection refused, DNS, TLS, ...).
    Transport { url: String, source: reqwest::Error },

    /// A success body was not valid JSON for the expected type.
    Decode {
        path: String,
        source: serde_json::Error,
    },

    /// A request body could not be serialised.
    Encode {
        path: String,
        source: serde_json::Error,
    },

    /// The backend returned no body where the operation needs one.
    EmptyResponse { path: String },

    /// A header value (usually the bearer token) contains invalid characters.
    InvalidHeader {
        name: &'static str,
        source: reqwest::header::InvalidHeaderValue,
    },
}

impl ApiError {
    /// Human-readable message suitable for a toast.
    pub fn message(&self) -> String {
        match self {
            Self::Request { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// HTTP status of a failed request, if the backend answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Request { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request { message, .. } => f.write_str(message),
            Self::Transport { url, source } => write!(f, "Request to '{url}' failed: {source}"),
            Self::Decode { path, source } => {
                write!(f, "Malformed response from '{path}': {source}")
            }
            Self::Encode { path, source } => {
                write!(f, "Cannot encode request body for '{path}': {source}")
            }
            Self::EmptyResponse { path } => {
                write!(f, "Empty response from '{path}' where a body was expected")
            }
            Self::InvalidHeader { name, source } => {
                write!(f, "Invalid value for header '{name}': {source}")
            }
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport { source, .. } => Some(source),
            Self::Decode { source, .. } => Some(source),
            Self::Encode { source, .. } => Some(source),
            Self::InvalidHeader { source, .. } => Some(source),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Storage errors
// ---------------------------------------------------------------------------

/// Errors related to durable key/value storage.
#[derive(Debug)]
pub enum StorageError {
    /// I/O error with path context.
    Io {
        path: PathBuf,
        operation: &'static str,
        source: io::Error,
    },

    /// The storage file or a stored value is not valid JSON.
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io {
                path,
                operation,
                source,
            } => write!(
                f,
                "I/O error during {operation} on '{}': {source}",
                path.display()
            ),
            Self::Json { path, source } => {
                write!(f, "Invalid JSON in '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
        }
    }
}

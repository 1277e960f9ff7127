// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Error types for simplereq
//!
//! Format and unsupported-feature errors are raised by this crate before any
//! network activity. Transport failures from reqwest/rustls are propagated
//! unchanged.

use thiserror::Error;

/// Result type alias for simplereq operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for simplereq
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed input: URL, NO_PROXY token, proxy URL, PEM material
    #[error("Format error: {0}")]
    Format(String),

    /// URL parsing failed
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Requested feature is deliberately not implemented
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// Auth value of a kind that cannot be turned into basic credentials
    #[error("Unsupported auth: {kind}")]
    UnsupportedAuth { kind: String },

    /// HTTP request failed in the transport
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The transport was closed before the request went out
    #[error("Transport is closed")]
    Closed,

    /// TLS configuration could not be assembled
    #[error("TLS error: {0}")]
    Tls(String),

    /// I/O error (reading CA bundles, client certificates)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a format error
    pub fn format<S: Into<String>>(msg: S) -> Self {
        Error::Format(msg.into())
    }

    /// Create a not-implemented error
    pub fn not_implemented<S: Into<String>>(what: S) -> Self {
        Error::NotImplemented(what.into())
    }

    /// Create an unsupported-auth error naming the received kind
    pub fn unsupported_auth<S: Into<String>>(kind: S) -> Self {
        Error::UnsupportedAuth { kind: kind.into() }
    }

    /// Create a TLS error
    pub fn tls<S: Into<String>>(msg: S) -> Self {
        Error::Tls(msg.into())
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this is a format error
    pub fn is_format(&self) -> bool {
        matches!(self, Error::Format(_) | Error::Url(_))
    }

    /// Check if this error reports an unsupported feature
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Error::NotImplemented(_) | Error::UnsupportedAuth { .. })
    }

    /// Check if this error came from the transport
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Http(_))
    }

    /// Check if this is a timeout reported by the transport
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Http(e) if e.is_timeout())
    }

    /// Get the URL the transport was talking to, if known
    pub fn url(&self) -> Option<&url::Url> {
        match self {
            Error::Http(e) => e.url(),
            _ => None,
        }
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Other(s.to_string())
    }
}

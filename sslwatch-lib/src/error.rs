//! Error handling for certificate and WHOIS checks.
//!
//! This module defines one error type that covers every way a single check
//! can fail, from name resolution to certificate parsing to unreadable
//! domain files. Its `Display` output is what the dashboard shows to users,
//! so the messages are written as complete sentences.

use std::fmt;
use std::time::Duration;

/// Main error type for sslwatch operations.
///
/// Every variant carries enough context to produce a user-facing message
/// without further lookups.
#[derive(Debug, Clone)]
pub enum SslWatchError {
    /// Domain name that can never be checked (empty, not a valid DNS name)
    InvalidDomain { domain: String, reason: String },

    /// Name resolution failed
    Resolve { domain: String },

    /// TCP connection could not be established
    Connect { domain: String, port: u16 },

    /// Connect or handshake did not finish in time
    Timeout {
        domain: String,
        port: u16,
        duration: Duration,
    },

    /// The peer certificate failed verification
    CertificateVerification { domain: String, reason: String },

    /// The TLS handshake failed for a reason other than the certificate
    Handshake { domain: String, reason: String },

    /// Certificate fields could not be extracted
    ParseError { domain: String, message: String },

    /// WHOIS lookup failed
    WhoisError { domain: String, message: String },

    /// Domain list file does not exist
    FileNotFound { path: String },

    /// Domain list file exists but could not be read
    FileError { path: String, message: String },

    /// Invalid configuration value
    ConfigError { message: String },

    /// The check was abandoned because the worker pool shut down
    Cancelled { domain: String },

    /// Anything that does not fit the categories above
    Internal { message: String },
}

impl SslWatchError {
    /// Create a new invalid domain error.
    pub fn invalid_domain<D: Into<String>, R: Into<String>>(domain: D, reason: R) -> Self {
        Self::InvalidDomain {
            domain: domain.into(),
            reason: reason.into(),
        }
    }

    /// Create a new name resolution error.
    pub fn resolve<D: Into<String>>(domain: D) -> Self {
        Self::Resolve {
            domain: domain.into(),
        }
    }

    /// Create a new connection error.
    pub fn connect<D: Into<String>>(domain: D, port: u16) -> Self {
        Self::Connect {
            domain: domain.into(),
            port,
        }
    }

    /// Create a new timeout error.
    pub fn timeout<D: Into<String>>(domain: D, port: u16, duration: Duration) -> Self {
        Self::Timeout {
            domain: domain.into(),
            port,
            duration,
        }
    }

    /// Create a new certificate verification error.
    pub fn verification<D: Into<String>, R: Into<String>>(domain: D, reason: R) -> Self {
        Self::CertificateVerification {
            domain: domain.into(),
            reason: reason.into(),
        }
    }

    /// Create a new handshake error.
    pub fn handshake<D: Into<String>, R: Into<String>>(domain: D, reason: R) -> Self {
        Self::Handshake {
            domain: domain.into(),
            reason: reason.into(),
        }
    }

    /// Create a new certificate parse error.
    pub fn parse<D: Into<String>, M: Into<String>>(domain: D, message: M) -> Self {
        Self::ParseError {
            domain: domain.into(),
            message: message.into(),
        }
    }

    /// Create a new WHOIS error.
    pub fn whois<D: Into<String>, M: Into<String>>(domain: D, message: M) -> Self {
        Self::WhoisError {
            domain: domain.into(),
            message: message.into(),
        }
    }

    /// Create a new file error.
    pub fn file_error<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::FileError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new configuration error.
    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new cancellation error.
    pub fn cancelled<D: Into<String>>(domain: D) -> Self {
        Self::Cancelled {
            domain: domain.into(),
        }
    }

    /// Create a new internal error.
    pub fn internal<M: Into<String>>(message: M) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Domain this error is about, if any.
    pub fn domain(&self) -> Option<&str> {
        match self {
            Self::InvalidDomain { domain, .. }
            | Self::Resolve { domain }
            | Self::Connect { domain, .. }
            | Self::Timeout { domain, .. }
            | Self::CertificateVerification { domain, .. }
            | Self::Handshake { domain, .. }
            | Self::ParseError { domain, .. }
            | Self::WhoisError { domain, .. }
            | Self::Cancelled { domain } => Some(domain),
            Self::FileNotFound { .. }
            | Self::FileError { .. }
            | Self::ConfigError { .. }
            | Self::Internal { .. } => None,
        }
    }

    /// Whether this error came from the network path (resolve, connect, handshake).
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            Self::Resolve { .. }
                | Self::Connect { .. }
                | Self::Timeout { .. }
                | Self::CertificateVerification { .. }
                | Self::Handshake { .. }
        )
    }
}

impl fmt::Display for SslWatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDomain { domain, reason } => {
                write!(f, "Invalid domain '{}': {}", domain, reason)
            }
            Self::Resolve { domain } => {
                write!(f, "Could not resolve hostname: '{}'.", domain)
            }
            Self::Connect { domain, port } | Self::Timeout { domain, port, .. } => {
                write!(f, "Could not connect to '{}' on port {}.", domain, port)
            }
            Self::CertificateVerification { domain, reason } => {
                write!(f, "SSL verification error for '{}': {}", domain, reason)
            }
            Self::Handshake { domain, reason } => {
                write!(f, "SSL handshake with '{}' failed: {}", domain, reason)
            }
            Self::ParseError { domain, .. } => {
                write!(f, "Could not parse certificate for '{}'.", domain)
            }
            Self::WhoisError { domain, message } => {
                write!(
                    f,
                    "Could not retrieve whois info for '{}':\n{}",
                    domain, message
                )
            }
            Self::FileNotFound { path } => {
                write!(f, "File not found: '{}'", path)
            }
            Self::FileError { path, message } => {
                write!(f, "Could not read file '{}': {}", path, message)
            }
            Self::ConfigError { message } => {
                write!(f, "Configuration error: {}", message)
            }
            Self::Cancelled { domain } => {
                write!(f, "Check cancelled for '{}'.", domain)
            }
            Self::Internal { message } => {
                write!(f, "An unexpected error occurred: {}", message)
            }
        }
    }
}

impl std::error::Error for SslWatchError {}

impl From<std::io::Error> for SslWatchError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal {
            message: format!("I/O error: {}", err),
        }
    }
}

//! Core data types for certificate and WHOIS checks.
//!
//! This module defines the result messages produced by background checks,
//! the certificate status classification and the tunable check settings.

use crate::error::SslWatchError;
use std::fmt;
use std::time::Duration;

/// Days-left threshold at or below which a certificate is in WARNING state.
pub const WARNING_DAYS: i64 = 30;

/// Days-left threshold at or below which a certificate is in ALERT state.
pub const ALERT_DAYS: i64 = 10;

/// Expiry classification of a certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CertStatus {
    /// More than 30 days left
    Ok,
    /// 11 to 30 days left
    Warning,
    /// 0 to 10 days left
    Alert,
    /// Already expired
    Expired,
}

impl CertStatus {
    /// Classify a certificate by the whole days left until expiry.
    ///
    /// Boundaries are inclusive on the lower status: 10 days is ALERT,
    /// 30 days is WARNING, 31 days is OK.
    pub fn from_days_left(days_left: i64) -> Self {
        if days_left < 0 {
            CertStatus::Expired
        } else if days_left <= ALERT_DAYS {
            CertStatus::Alert
        } else if days_left <= WARNING_DAYS {
            CertStatus::Warning
        } else {
            CertStatus::Ok
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CertStatus::Ok => "OK",
            CertStatus::Warning => "WARNING",
            CertStatus::Alert => "ALERT",
            CertStatus::Expired => "EXPIRED",
        }
    }
}

/// Outcome of a WHOIS lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhoisStatus {
    Success,
    Error,
}

impl WhoisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WhoisStatus::Success => "WHOIS_SUCCESS",
            WhoisStatus::Error => "WHOIS_ERROR",
        }
    }
}

/// Fields extracted from a server's leaf certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateReport {
    /// The domain that was checked (e.g., "example.com")
    pub domain: String,

    /// Subject common name, or "N/A"
    pub subject_cn: String,

    /// Issuer organization name, falling back to issuer common name, or "N/A"
    pub issuer_cn: String,

    /// Start of validity, formatted YYYY-MM-DD
    pub issued_on: String,

    /// End of validity, formatted YYYY-MM-DD
    pub expires_on: String,

    /// Whole days until expiry, negative once expired
    pub days_left: i64,

    /// Classification derived from `days_left`
    pub status: CertStatus,
}

/// A completion message from one background check.
///
/// Exactly one variant is populated per message; consumers match exhaustively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckResult {
    /// Certificate fetched and classified
    Certificate(CertificateReport),

    /// Transient placeholder shown while a job is in flight
    Info { message: String },

    /// Terminal failure of one check (or of reading the input file)
    Error {
        domain: Option<String>,
        message: String,
    },

    /// Raw WHOIS record text
    Whois {
        domain: String,
        status: WhoisStatus,
        data: String,
    },
}

impl CheckResult {
    /// Create an info placeholder.
    pub fn info<M: Into<String>>(message: M) -> Self {
        CheckResult::Info {
            message: message.into(),
        }
    }

    /// Create an error result, optionally tied to a domain.
    pub fn error<M: Into<String>>(domain: Option<&str>, message: M) -> Self {
        CheckResult::Error {
            domain: domain.map(str::to_string),
            message: message.into(),
        }
    }

    /// Domain this result is about, if it has one.
    pub fn domain(&self) -> Option<&str> {
        match self {
            CheckResult::Certificate(report) => Some(&report.domain),
            CheckResult::Info { .. } => None,
            CheckResult::Error { domain, .. } => domain.as_deref(),
            CheckResult::Whois { domain, .. } => Some(domain),
        }
    }

    /// Display category of this result.
    pub fn kind(&self) -> ResultKind {
        match self {
            CheckResult::Certificate(report) => report.status.into(),
            CheckResult::Info { .. } => ResultKind::Info,
            CheckResult::Error { .. } => ResultKind::Error,
            CheckResult::Whois { .. } => ResultKind::Unknown,
        }
    }

    pub fn is_info(&self) -> bool {
        matches!(self, CheckResult::Info { .. })
    }
}

impl From<SslWatchError> for CheckResult {
    fn from(err: SslWatchError) -> Self {
        CheckResult::Error {
            domain: err.domain().map(str::to_string),
            message: err.to_string(),
        }
    }
}

/// Display category used for coloring and layout.
///
/// `Info`, `Error` and `Unknown` entries always render as a fixed two-line
/// block; certificate categories follow the compact/detailed toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultKind {
    Ok,
    Warning,
    Alert,
    Expired,
    Info,
    Error,
    Unknown,
}

impl ResultKind {
    /// Whether this kind renders as a fixed two-line block.
    pub fn is_block(&self) -> bool {
        matches!(
            self,
            ResultKind::Info | ResultKind::Error | ResultKind::Unknown
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResultKind::Ok => "OK",
            ResultKind::Warning => "WARNING",
            ResultKind::Alert => "ALERT",
            ResultKind::Expired => "EXPIRED",
            ResultKind::Info => "INFO",
            ResultKind::Error => "ERROR",
            ResultKind::Unknown => "UNKNOWN",
        }
    }
}

impl From<CertStatus> for ResultKind {
    fn from(status: CertStatus) -> Self {
        match status {
            CertStatus::Ok => ResultKind::Ok,
            CertStatus::Warning => ResultKind::Warning,
            CertStatus::Alert => ResultKind::Alert,
            CertStatus::Expired => ResultKind::Expired,
        }
    }
}

/// Configuration options for checks and the worker pool.
#[derive(Debug, Clone)]
pub struct CheckConfig {
    /// Maximum number of checks running at once
    /// Default: 20, Range: 1-100
    pub concurrency: usize,

    /// Timeout for the TCP connect and for the TLS handshake
    /// Default: 5 seconds
    pub timeout: Duration,

    /// Timeout for a WHOIS lookup; `None` waits indefinitely
    /// Default: 30 seconds
    pub whois_timeout: Option<Duration>,

    /// TLS port to connect to
    /// Default: 443
    pub port: u16,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            concurrency: 20,
            timeout: Duration::from_secs(5),
            whois_timeout: Some(Duration::from_secs(30)),
            port: 443,
        }
    }
}

impl CheckConfig {
    /// Set the worker cap.
    ///
    /// Automatically clamps concurrency to 1-100 to prevent resource exhaustion.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.clamp(1, 100);
        self
    }

    /// Set custom timeout for certificate checks.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set WHOIS timeout; a zero duration disables it.
    pub fn with_whois_timeout(mut self, timeout: Duration) -> Self {
        self.whois_timeout = if timeout.is_zero() {
            None
        } else {
            Some(timeout)
        };
        self
    }

    /// Set the TLS port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}

impl fmt::Display for CertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ResultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

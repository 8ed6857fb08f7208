//! Main domain checker implementation.
//!
//! This module provides the `DomainChecker` that pairs the TLS certificate
//! client with the WHOIS client and exposes both through the `DomainInspector`
//! trait consumed by the worker pool.

use crate::concurrent::DomainInspector;
use crate::error::SslWatchError;
use crate::protocols::{CertificateChecker, WhoisClient};
use crate::types::{CheckConfig, CheckResult};
use async_trait::async_trait;

/// Checker that performs real network lookups.
///
/// # Example
///
/// ```rust,no_run
/// use sslwatch_lib::{CheckResult, DomainChecker};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let checker = DomainChecker::new()?;
///     if let CheckResult::Certificate(report) = checker.check_certificate("example.com").await {
///         println!("{} expires in {} days", report.domain, report.days_left);
///     }
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct DomainChecker {
    /// Configuration settings for this checker instance
    config: CheckConfig,
    /// TLS client for certificate checks
    certificates: CertificateChecker,
    /// WHOIS client for registration records
    whois: WhoisClient,
}

impl DomainChecker {
    /// Create a new checker with default configuration.
    ///
    /// Default settings:
    /// - Port: 443
    /// - Certificate timeout: 5 seconds
    /// - WHOIS timeout: 30 seconds
    pub fn new() -> Result<Self, SslWatchError> {
        Self::with_config(CheckConfig::default())
    }

    /// Create a new checker with custom configuration.
    ///
    /// # Example
    ///
    /// ```rust
    /// use sslwatch_lib::{CheckConfig, DomainChecker};
    /// use std::time::Duration;
    ///
    /// let config = CheckConfig::default()
    ///     .with_timeout(Duration::from_secs(10))
    ///     .with_whois_timeout(Duration::ZERO);
    ///
    /// let checker = DomainChecker::with_config(config).unwrap();
    /// ```
    pub fn with_config(config: CheckConfig) -> Result<Self, SslWatchError> {
        let certificates = CertificateChecker::with_config(config.clone())?;
        let whois = WhoisClient::with_timeout(config.whois_timeout);

        Ok(Self {
            config,
            certificates,
            whois,
        })
    }

    /// Fetch and classify the certificate for one domain.
    pub async fn check_certificate(&self, domain: &str) -> CheckResult {
        self.certificates.check(domain).await
    }

    /// Fetch the WHOIS record for one domain.
    pub async fn lookup_whois(&self, domain: &str) -> CheckResult {
        self.whois.lookup(domain).await
    }

    /// Get the current configuration for this checker.
    pub fn config(&self) -> &CheckConfig {
        &self.config
    }
}

#[async_trait]
impl DomainInspector for DomainChecker {
    async fn check_certificate(&self, domain: &str) -> CheckResult {
        DomainChecker::check_certificate(self, domain).await
    }

    async fn lookup_whois(&self, domain: &str) -> CheckResult {
        DomainChecker::lookup_whois(self, domain).await
    }
}

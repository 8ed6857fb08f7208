//! TLS certificate retrieval and classification.
//!
//! Connects to a domain on its TLS port, completes a verified handshake
//! against the webpki root store, and extracts the leaf certificate's
//! subject, issuer and validity window.

use crate::error::SslWatchError;
use crate::types::{CertStatus, CertificateReport, CheckConfig, CheckResult};
use crate::utils::validate_domain;
use chrono::{DateTime, Utc};
use std::io;
use std::sync::Arc;
use tokio::net::{lookup_host, TcpStream};
use tokio::time::timeout;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{self, CertificateError, ClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;
use tracing::debug;
use x509_parser::prelude::{parse_x509_certificate, AttributeTypeAndValue};

const SECONDS_PER_DAY: i64 = 86_400;

/// Client that fetches and classifies a domain's TLS certificate.
///
/// The connector is built once and shared between checks; cloning the
/// checker is cheap.
#[derive(Clone)]
pub struct CertificateChecker {
    config: CheckConfig,
    connector: TlsConnector,
}

impl CertificateChecker {
    /// Create a checker with default settings (port 443, 5 second timeout).
    pub fn new() -> Result<Self, SslWatchError> {
        Self::with_config(CheckConfig::default())
    }

    /// Create a checker with custom settings.
    pub fn with_config(config: CheckConfig) -> Result<Self, SslWatchError> {
        let mut roots = RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let tls = ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .map_err(|e| SslWatchError::config(format!("TLS setup failed: {}", e)))?
            .with_root_certificates(roots)
            .with_no_client_auth();

        Ok(Self {
            config,
            connector: TlsConnector::from(Arc::new(tls)),
        })
    }

    /// Check one domain and convert the outcome into a result message.
    ///
    /// Never fails: every error becomes a `CheckResult::Error` naming the domain.
    pub async fn check(&self, domain: &str) -> CheckResult {
        match self.fetch_report(domain).await {
            Ok(report) => CheckResult::Certificate(report),
            Err(err) => {
                debug!(
                    domain,
                    error = %err,
                    network = err.is_network(),
                    "certificate check failed"
                );
                err.into()
            }
        }
    }

    /// Fetch the leaf certificate and build a report from it.
    ///
    /// # Errors
    ///
    /// Returns `SslWatchError` if:
    /// - The domain is empty or not a valid DNS name
    /// - The name cannot be resolved
    /// - The connection or handshake fails or times out
    /// - The certificate fails verification
    /// - The certificate fields cannot be parsed
    pub async fn fetch_report(&self, domain: &str) -> Result<CertificateReport, SslWatchError> {
        validate_domain(domain)?;
        let domain = domain.trim();

        let der = self.fetch_leaf_certificate(domain).await?;
        parse_certificate(domain, &der, Utc::now())
    }

    async fn fetch_leaf_certificate(&self, domain: &str) -> Result<Vec<u8>, SslWatchError> {
        let port = self.config.port;
        let limit = self.config.timeout;

        let server_name = ServerName::try_from(domain.to_string())
            .map_err(|_| SslWatchError::invalid_domain(domain, "not a valid DNS name"))?;

        let addrs: Vec<_> = timeout(limit, lookup_host((domain, port)))
            .await
            .map_err(|_| SslWatchError::timeout(domain, port, limit))?
            .map_err(|_| SslWatchError::resolve(domain))?
            .collect();
        if addrs.is_empty() {
            return Err(SslWatchError::resolve(domain));
        }

        let stream = timeout(limit, TcpStream::connect(&addrs[..]))
            .await
            .map_err(|_| SslWatchError::timeout(domain, port, limit))?
            .map_err(|_| SslWatchError::connect(domain, port))?;

        let tls = timeout(limit, self.connector.connect(server_name, stream))
            .await
            .map_err(|_| SslWatchError::timeout(domain, port, limit))?
            .map_err(|err| classify_handshake_error(domain, port, err))?;

        let (_, session) = tls.get_ref();
        let leaf = session
            .peer_certificates()
            .and_then(|chain| chain.first())
            .ok_or_else(|| SslWatchError::parse(domain, "server presented no certificate"))?;

        Ok(leaf.as_ref().to_vec())
    }
}

/// Map a failed handshake onto the error taxonomy.
///
/// tokio-rustls wraps `rustls::Error` inside the `io::Error`; anything
/// without a TLS cause is a transport failure. Every branch keeps the domain
/// so batch failures stay attributable.
fn classify_handshake_error(domain: &str, port: u16, err: io::Error) -> SslWatchError {
    match err
        .get_ref()
        .and_then(|inner| inner.downcast_ref::<rustls::Error>())
    {
        Some(rustls::Error::InvalidCertificate(reason)) => {
            SslWatchError::verification(domain, describe_certificate_error(reason))
        }
        Some(other) => SslWatchError::handshake(domain, other.to_string()),
        None => SslWatchError::connect(domain, port),
    }
}

fn describe_certificate_error(reason: &CertificateError) -> String {
    match reason {
        CertificateError::Expired | CertificateError::ExpiredContext { .. } => {
            "certificate has expired".to_string()
        }
        CertificateError::NotValidYet | CertificateError::NotValidYetContext { .. } => {
            "certificate is not yet valid".to_string()
        }
        CertificateError::NotValidForName | CertificateError::NotValidForNameContext { .. } => {
            "hostname mismatch".to_string()
        }
        CertificateError::UnknownIssuer => "unable to get local issuer certificate".to_string(),
        CertificateError::Revoked => "certificate has been revoked".to_string(),
        CertificateError::BadSignature => "certificate signature failure".to_string(),
        other => other.to_string(),
    }
}

/// Build a report from a DER-encoded certificate, relative to `now`.
pub fn parse_certificate(
    domain: &str,
    der: &[u8],
    now: DateTime<Utc>,
) -> Result<CertificateReport, SslWatchError> {
    let (_, cert) =
        parse_x509_certificate(der).map_err(|e| SslWatchError::parse(domain, e.to_string()))?;

    let validity = cert.validity();
    let issued = to_utc(domain, validity.not_before.timestamp())?;
    let expires = to_utc(domain, validity.not_after.timestamp())?;

    let subject_cn = first_text(cert.subject().iter_common_name());
    let issuer_cn = first_text(cert.issuer().iter_organization())
        .or_else(|| first_text(cert.issuer().iter_common_name()));

    let days_left = days_until(expires, now);

    Ok(CertificateReport {
        domain: domain.to_string(),
        subject_cn: subject_cn.unwrap_or_else(|| "N/A".to_string()),
        issuer_cn: issuer_cn.unwrap_or_else(|| "N/A".to_string()),
        issued_on: issued.format("%Y-%m-%d").to_string(),
        expires_on: expires.format("%Y-%m-%d").to_string(),
        days_left,
        status: CertStatus::from_days_left(days_left),
    })
}

/// Whole days from `now` until `expires`, rounded toward negative infinity.
///
/// An expiry one hour in the past is -1 days, not 0.
pub fn days_until(expires: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (expires - now).num_seconds().div_euclid(SECONDS_PER_DAY)
}

fn to_utc(domain: &str, timestamp: i64) -> Result<DateTime<Utc>, SslWatchError> {
    DateTime::from_timestamp(timestamp, 0)
        .ok_or_else(|| SslWatchError::parse(domain, "validity date out of range"))
}

fn first_text<'a, 'b: 'a, I>(mut attrs: I) -> Option<String>
where
    I: Iterator<Item = &'a AttributeTypeAndValue<'b>>,
{
    attrs.find_map(|attr| attr.as_str().ok().map(str::to_string))
}

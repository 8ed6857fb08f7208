//! Protocol implementations for domain checks.
//!
//! This module contains the network-facing clients: TLS certificate
//! retrieval and WHOIS lookups.

/// TLS handshake and certificate classification
pub mod tls;

/// WHOIS protocol implementation
pub mod whois;

// Re-export commonly used functions and types
pub use tls::{days_until, parse_certificate, CertificateChecker};
pub use whois::WhoisClient;

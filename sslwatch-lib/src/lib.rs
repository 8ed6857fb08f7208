//! # sslwatch Library
//!
//! Certificate health and WHOIS checks for the sslwatch terminal dashboard.
//!
//! The library fetches a domain's TLS certificate, classifies it by the number
//! of days left before expiry, and looks up WHOIS records. Checks run in a
//! bounded background pool that reports every outcome as a `CheckResult`
//! message, so a UI thread can drain results without ever blocking on the
//! network.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sslwatch_lib::{CheckOrchestrator, DomainChecker};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let checker = DomainChecker::new()?;
//!     let mut pool = CheckOrchestrator::new(
//!         Arc::new(checker),
//!         20,
//!         tokio::runtime::Handle::current(),
//!     );
//!
//!     pool.spawn_certificate_checks(vec!["example.com".to_string()]);
//!     loop {
//!         if let Some(result) = pool.try_recv_certificate() {
//!             println!("{:?} {}", result.domain(), result.kind());
//!             break;
//!         }
//!         tokio::time::sleep(std::time::Duration::from_millis(50)).await;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Verified TLS**: Handshakes are verified against the webpki root store
//! - **Expiry Classification**: OK / WARNING / ALERT / EXPIRED by days left
//! - **WHOIS Lookups**: Raw registration records via the system `whois` tool
//! - **Bounded Concurrency**: Capped, cancellable background checks

// Re-export main public API types and functions
// This makes them available as sslwatch_lib::TypeName
pub use checker::DomainChecker;
pub use concurrent::{CheckOrchestrator, DomainInspector, RequestId, WhoisReply};
pub use config::{env_config_from, load_env_config, parse_timeout_string, EnvConfig};
pub use error::SslWatchError;
pub use protocols::{days_until, parse_certificate, CertificateChecker, WhoisClient};
pub use types::{
    CertStatus, CertificateReport, CheckConfig, CheckResult, ResultKind, WhoisStatus, ALERT_DAYS,
    WARNING_DAYS,
};
pub use utils::{parse_domain_lines, read_domains_from_file, validate_domain};

// Internal modules - these are not part of the public API
mod checker;
mod concurrent;
mod config;
mod error;
mod protocols;
mod types;
mod utils;

// Type alias for convenience
pub type Result<T> = std::result::Result<T, SslWatchError>;

// Library version and metadata
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

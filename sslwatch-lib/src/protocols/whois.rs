//! WHOIS lookups through the system `whois` command.
//!
//! WHOIS responses are unstructured text that varies between registries, so
//! the client returns the raw record for display instead of parsing it.

use crate::error::SslWatchError;
use crate::types::{CheckResult, WhoisStatus};
use crate::utils::validate_domain;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// WHOIS client that shells out to the system's `whois` tool.
#[derive(Clone, Debug)]
pub struct WhoisClient {
    /// Timeout for a single lookup; `None` waits for the command to exit
    timeout: Option<Duration>,
}

impl WhoisClient {
    /// Create a new WHOIS client with default settings (30 second timeout).
    pub fn new() -> Self {
        Self {
            timeout: Some(Duration::from_secs(30)),
        }
    }

    /// Create a new WHOIS client with a custom timeout.
    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    /// Look up a domain and convert the outcome into a result message.
    ///
    /// Success carries the record text; failure carries a readable reason.
    /// Both arrive as `CheckResult::Whois`.
    pub async fn lookup(&self, domain: &str) -> CheckResult {
        let domain = domain.trim();
        match self.fetch_record(domain).await {
            Ok(data) => CheckResult::Whois {
                domain: domain.to_string(),
                status: WhoisStatus::Success,
                data,
            },
            Err(err) => {
                debug!(domain, error = %err, "whois lookup failed");
                CheckResult::Whois {
                    domain: domain.to_string(),
                    status: WhoisStatus::Error,
                    data: err.to_string(),
                }
            }
        }
    }

    /// Run the lookup and return the raw record text.
    ///
    /// # Errors
    ///
    /// Returns `SslWatchError::WhoisError` if:
    /// - The `whois` command is not installed
    /// - The lookup times out
    /// - The command exits unsuccessfully without printing a record
    pub async fn fetch_record(&self, domain: &str) -> Result<String, SslWatchError> {
        validate_domain(domain).map_err(|e| SslWatchError::whois(domain, e.to_string()))?;

        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.execute_whois_command(domain))
                .await
                .map_err(|_| {
                    SslWatchError::whois(domain, format!("lookup timed out after {:?}", limit))
                })?,
            None => self.execute_whois_command(domain).await,
        }
    }

    /// Execute the system whois command and collect its output.
    async fn execute_whois_command(&self, domain: &str) -> Result<String, SslWatchError> {
        // kill_on_drop reaps the child when the lookup is timed out or cancelled
        let output = Command::new("whois")
            .arg(domain)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                SslWatchError::whois(
                    domain,
                    format!(
                        "Failed to execute whois command: {}. Make sure 'whois' is installed.",
                        e
                    ),
                )
            })?;

        interpret_output(
            domain,
            output.status.success(),
            &String::from_utf8_lossy(&output.stdout),
            &String::from_utf8_lossy(&output.stderr),
        )
    }
}

impl Default for WhoisClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Decide whether a finished whois run produced a usable record.
///
/// Some whois implementations exit non-zero even after printing a full
/// record (e.g. on referral failures), so any non-empty stdout is kept.
fn interpret_output(
    domain: &str,
    success: bool,
    stdout: &str,
    stderr: &str,
) -> Result<String, SslWatchError> {
    let record = stdout.trim_end();
    if !record.trim().is_empty() {
        return Ok(record.to_string());
    }

    let reason = stderr.trim();
    if !success && !reason.is_empty() {
        Err(SslWatchError::whois(domain, reason))
    } else if !success {
        Err(SslWatchError::whois(domain, "whois exited with an error"))
    } else {
        Err(SslWatchError::whois(domain, "empty response"))
    }
}

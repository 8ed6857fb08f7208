//! Utility functions for domain input handling.
//!
//! This module contains domain name validation and the reader for
//! newline-delimited domain list files used by batch imports.

use crate::error::SslWatchError;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Validate a domain name before any network work is attempted.
///
/// This is a basic sanity check; anything it lets through that is not a
/// real host fails later with a resolution error.
///
/// # Arguments
///
/// * `domain` - The domain name to validate
///
/// # Returns
///
/// `Ok(())` if usable, `Err(SslWatchError)` if not.
pub fn validate_domain(domain: &str) -> Result<(), SslWatchError> {
    let domain = domain.trim();

    if domain.is_empty() {
        return Err(SslWatchError::invalid_domain(
            domain,
            "Domain name cannot be empty",
        ));
    }

    if domain.len() > 253 {
        return Err(SslWatchError::invalid_domain(
            domain,
            "Domain name longer than 253 characters",
        ));
    }

    if domain.chars().any(char::is_whitespace) {
        return Err(SslWatchError::invalid_domain(
            domain,
            "Domain name cannot contain whitespace",
        ));
    }

    Ok(())
}

/// Read newline-delimited domains from a file.
///
/// Blank lines and lines starting with '#' are skipped, and anything after
/// an inline '#' is dropped. Surrounding whitespace is trimmed.
///
/// # Errors
///
/// Returns `SslWatchError::FileNotFound` if the path does not exist and
/// `SslWatchError::FileError` for any other read failure.
pub fn read_domains_from_file<P: AsRef<Path>>(path: P) -> Result<Vec<String>, SslWatchError> {
    let path = path.as_ref();
    let display = path.display().to_string();

    let content = fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => SslWatchError::FileNotFound { path: display.clone() },
        _ => SslWatchError::file_error(&display, e.to_string()),
    })?;

    Ok(parse_domain_lines(&content))
}

/// Extract domains from the text of a domain list.
pub fn parse_domain_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .filter_map(|line| {
            // Handle inline comments
            let domain_part = line.split('#').next().unwrap_or("").trim();
            if domain_part.is_empty() {
                None
            } else {
                Some(domain_part.to_string())
            }
        })
        .collect()
}

//! Error types for trust store construction and certificate retrieval.

use std::{io, path::PathBuf, time::Duration};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by [`crate::Monitor`] construction and [`crate::Host`] fetches.
///
/// Construction errors (`ConfigRead`, `InvalidPem`) abort the whole monitor.
/// Every other variant is local to the host that produced it.
#[derive(Debug, Error)]
pub enum Error {
    /// An additional CA file could not be read
    #[error("failed to read additional CA file {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// An additional CA file contained malformed PEM (strict policy only)
    #[error("invalid PEM in additional CA file {}: {reason}", path.display())]
    InvalidPem { path: PathBuf, reason: String },

    /// The domain cannot be used as a TLS server name
    #[error("invalid server name: {domain}")]
    InvalidServerName { domain: String },

    /// DNS resolution or TCP connect failed
    #[error("failed to connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: io::Error,
    },

    /// TLS negotiation failed after the TCP connection was established
    #[error("TLS handshake with {domain} failed: {source}")]
    Handshake {
        domain: String,
        #[source]
        source: io::Error,
    },

    /// Connect plus handshake did not finish in time
    #[error("timed out after {timeout:?} fetching certificate from {domain}")]
    Timeout { domain: String, timeout: Duration },

    /// The handshake succeeded but the peer presented no certificates
    #[error("no certificates returned by {domain}")]
    NoCertificate { domain: String },

    /// The leaf certificate could not be decoded
    #[error("failed to parse certificate from {domain}: {reason}")]
    Parse { domain: String, reason: String },
}

impl Error {
    /// Stable, low-cardinality label used for metrics and logs
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ConfigRead { .. } => "config_read",
            Self::InvalidPem { .. } => "invalid_pem",
            Self::InvalidServerName { .. } => "server_name",
            Self::Connect { .. } => "connect",
            Self::Handshake { .. } => "handshake",
            Self::Timeout { .. } => "timeout",
            Self::NoCertificate { .. } => "no_certificate",
            Self::Parse { .. } => "parse",
        }
    }

    /// True for dial, DNS, handshake and timeout failures
    #[must_use]
    pub const fn is_connect_failure(&self) -> bool {
        matches!(
            self,
            Self::InvalidServerName { .. }
                | Self::Connect { .. }
                | Self::Handshake { .. }
                | Self::Timeout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_config_read_display_names_path() {
        let err = Error::ConfigRead {
            path: PathBuf::from("/missing/ca.pem"),
            source: io::Error::new(io::ErrorKind::NotFound, "No such file or directory"),
        };
        let msg = err.to_string();
        assert!(msg.contains("/missing/ca.pem"));
        assert!(msg.contains("No such file or directory"));
        assert!(err.source().is_some());
        assert_eq!(err.kind(), "config_read");
        assert!(!err.is_connect_failure());
    }

    #[test]
    fn test_no_certificate_display() {
        let err = Error::NoCertificate {
            domain: "example.com".to_string(),
        };
        assert_eq!(err.to_string(), "no certificates returned by example.com");
        assert_eq!(err.kind(), "no_certificate");
        assert!(!err.is_connect_failure());
    }

    #[test]
    fn test_connect_failures_grouped() {
        let errors = [
            Error::InvalidServerName {
                domain: "bad name".to_string(),
            },
            Error::Connect {
                address: "example.com:443".to_string(),
                source: io::Error::from(io::ErrorKind::ConnectionRefused),
            },
            Error::Handshake {
                domain: "example.com".to_string(),
                source: io::Error::from(io::ErrorKind::UnexpectedEof),
            },
            Error::Timeout {
                domain: "example.com".to_string(),
                timeout: Duration::from_secs(10),
            },
        ];

        for err in &errors {
            assert!(err.is_connect_failure(), "{err:?}");
        }
    }

    #[test]
    fn test_kinds_are_distinct() {
        let kinds = [
            Error::InvalidPem {
                path: PathBuf::from("ca.pem"),
                reason: "garbage".to_string(),
            }
            .kind(),
            Error::Parse {
                domain: "example.com".to_string(),
                reason: "bad der".to_string(),
            }
            .kind(),
            Error::Timeout {
                domain: "example.com".to_string(),
                timeout: Duration::from_millis(1),
            }
            .kind(),
        ];
        assert_eq!(kinds, ["invalid_pem", "parse", "timeout"]);
    }
}

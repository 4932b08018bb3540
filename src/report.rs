use crate::{error::Error, monitor::Host};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Serializable snapshot of one host, used for JSON output
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostReport {
    pub domain: String,
    pub fetched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_before: Option<DateTime<Utc>>,
    pub not_after: DateTime<Utc>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dns_names: Vec<String>,
    pub seconds_until_expiry: f64,
    pub minutes_until_expiry: f64,
    pub hours_until_expiry: f64,
    pub expired: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HostReport {
    /// Snapshot `host` at `now`, attaching the outcome of its last fetch
    #[must_use]
    pub fn new(host: &Host, now: DateTime<Utc>, last_error: Option<&Error>) -> Self {
        let cert = host.certificate();
        let fetched = host.is_fetched();
        let seconds = host.seconds_until_expiry_at(now);

        Self {
            domain: host.domain_name().to_string(),
            fetched,
            subject: fetched.then(|| cert.subject.clone()),
            issuer: fetched.then(|| cert.issuer.clone()),
            serial: fetched.then(|| cert.serial.clone()),
            not_before: fetched.then_some(cert.not_before),
            not_after: cert.not_after,
            dns_names: cert.dns_names.clone(),
            seconds_until_expiry: seconds,
            minutes_until_expiry: host.minutes_until_expiry_at(now),
            hours_until_expiry: host.hours_until_expiry_at(now),
            expired: seconds < 0.0,
            error: last_error.map(ToString::to_string),
        }
    }
}

//! Monitor how long until the TLS leaf certificates of a set of domains expire.
//!
//! Certificates are fetched without verification, so expired and untrusted
//! certificates are reported like any other.

pub mod cli;
pub mod error;
pub mod metrics;
pub mod monitor;
pub mod pulse;
pub mod report;
pub mod tls;

pub use error::{Error, Result};
pub use monitor::{Host, Monitor, MonitorOptions};
pub use report::HostReport;

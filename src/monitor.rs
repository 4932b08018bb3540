//! Monitored hosts and the monitor that wires them to a shared trust context
//!
//! ```rust,no_run
//! use certpulse::Monitor;
//!
//! # async fn run() -> certpulse::Result<()> {
//! let mut monitor = Monitor::new(["example.com"], None)?;
//! for result in monitor.fetch_all().await {
//!     result?;
//! }
//! let host = &monitor.hosts()[0];
//! println!("{} expires in {:.1}h", host.domain_name(), host.hours_until_expiry());
//! # Ok(())
//! # }
//! ```

use crate::{
    error::{Error, Result},
    tls::{
        Certificate, ConnectionPolicy, DEFAULT_PORT, DEFAULT_TIMEOUT, PemPolicy, TrustStore,
        peer_certificates,
    },
};
use chrono::{DateTime, TimeDelta, Utc};
use futures::future::join_all;
use rustls::pki_types::CertificateDer;
use std::{path::PathBuf, sync::Arc, time::Duration};
use tracing::{debug, info};

/// Options applied to every host of a monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorOptions {
    /// Port the TLS connection is opened on
    pub port: u16,
    /// Bound for connect plus handshake
    pub timeout: Duration,
    /// Handling of malformed PEM in additional CA files
    pub pem_policy: PemPolicy,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            timeout: DEFAULT_TIMEOUT,
            pem_policy: PemPolicy::default(),
        }
    }
}

/// One monitored domain and the last leaf certificate it presented.
///
/// Starts with [`Certificate::default`], whose expiry is the Unix epoch, so an
/// unfetched host reports a large negative time to expiry. Only a successful
/// [`Host::fetch`] replaces the certificate; failures leave it untouched.
#[derive(Debug, Clone)]
pub struct Host {
    domain_name: String,
    certificate: Certificate,
    policy: Arc<ConnectionPolicy>,
}

impl Host {
    #[must_use]
    pub fn new(domain_name: impl Into<String>, policy: Arc<ConnectionPolicy>) -> Self {
        Self {
            domain_name: domain_name.into(),
            certificate: Certificate::default(),
            policy,
        }
    }

    #[must_use]
    pub fn domain_name(&self) -> &str {
        &self.domain_name
    }

    /// Last retrieved leaf certificate, or the placeholder
    #[must_use]
    pub const fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    #[must_use]
    pub fn is_fetched(&self) -> bool {
        !self.certificate.is_placeholder()
    }

    #[must_use]
    pub fn policy(&self) -> &ConnectionPolicy {
        &self.policy
    }

    /// Retrieve the current leaf certificate using the policy timeout.
    ///
    /// Dropping the returned future cancels the fetch without touching the
    /// stored certificate.
    ///
    /// # Errors
    ///
    /// Returns a connect family error if the host cannot be reached,
    /// [`Error::NoCertificate`] if the peer presented nothing, or
    /// [`Error::Parse`] if the leaf does not decode.
    pub async fn fetch(&mut self) -> Result<()> {
        let timeout = self.policy.timeout();
        self.fetch_with_timeout(timeout).await
    }

    /// Same as [`Host::fetch`] with an explicit timeout
    ///
    /// # Errors
    ///
    /// See [`Host::fetch`]
    pub async fn fetch_with_timeout(&mut self, timeout: Duration) -> Result<()> {
        let chain = peer_certificates(&self.domain_name, &self.policy, timeout).await?;
        self.adopt_peer_certificates(&chain)
    }

    /// Adopt the first certificate of a peer chain as the current certificate.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoCertificate`] for an empty chain and [`Error::Parse`]
    /// for an undecodable leaf; the stored certificate is unchanged in both
    /// cases.
    pub fn adopt_peer_certificates(&mut self, chain: &[CertificateDer<'_>]) -> Result<()> {
        let Some(leaf) = chain.first() else {
            return Err(Error::NoCertificate {
                domain: self.domain_name.clone(),
            });
        };

        let certificate = Certificate::from_der(leaf.as_ref()).map_err(|e| Error::Parse {
            domain: self.domain_name.clone(),
            reason: e.to_string(),
        })?;

        debug!(
            domain = %self.domain_name,
            subject = %certificate.subject,
            not_after = %certificate.not_after,
            "adopted leaf certificate"
        );
        self.certificate = certificate;
        Ok(())
    }

    #[must_use]
    pub fn seconds_until_expiry(&self) -> f64 {
        self.seconds_until_expiry_at(Utc::now())
    }

    #[must_use]
    pub fn minutes_until_expiry(&self) -> f64 {
        self.minutes_until_expiry_at(Utc::now())
    }

    #[must_use]
    pub fn hours_until_expiry(&self) -> f64 {
        self.hours_until_expiry_at(Utc::now())
    }

    /// Seconds between `now` and the certificate's `not_after`, negative once expired
    #[must_use]
    pub fn seconds_until_expiry_at(&self, now: DateTime<Utc>) -> f64 {
        as_seconds(self.certificate.time_until_expiry(now))
    }

    #[must_use]
    pub fn minutes_until_expiry_at(&self, now: DateTime<Utc>) -> f64 {
        self.seconds_until_expiry_at(now) / 60.0
    }

    #[must_use]
    pub fn hours_until_expiry_at(&self, now: DateTime<Utc>) -> f64 {
        self.seconds_until_expiry_at(now) / 3600.0
    }

    /// True when the stored certificate (or the placeholder) is past `not_after`
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.seconds_until_expiry() < 0.0
    }
}

#[allow(clippy::cast_precision_loss)]
fn as_seconds(delta: TimeDelta) -> f64 {
    delta.num_seconds() as f64 + f64::from(delta.subsec_nanos()) / 1_000_000_000.0
}

/// A fixed set of hosts sharing one trust store and connection policy.
///
/// Hosts keep the input order, duplicates included. Construction performs no
/// network I/O; build a new monitor to change the configuration.
#[derive(Debug)]
pub struct Monitor {
    hosts: Vec<Host>,
    extra_ca_paths: Option<Vec<PathBuf>>,
    trust_store: Arc<TrustStore>,
    policy: Arc<ConnectionPolicy>,
}

impl Monitor {
    /// Build a monitor with the default port, timeout and PEM policy
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigRead`] if an additional CA file cannot be read
    pub fn new<I, S>(domain_names: I, extra_ca_paths: Option<Vec<PathBuf>>) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_options(domain_names, extra_ca_paths, MonitorOptions::default())
    }

    /// Build a monitor with explicit options
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigRead`] if an additional CA file cannot be read,
    /// or [`Error::InvalidPem`] under [`PemPolicy::Strict`]
    pub fn with_options<I, S>(
        domain_names: I,
        extra_ca_paths: Option<Vec<PathBuf>>,
        options: MonitorOptions,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let trust_store = Arc::new(TrustStore::build(
            extra_ca_paths.as_deref(),
            options.pem_policy,
        )?);

        let policy = Arc::new(
            ConnectionPolicy::new(Arc::clone(&trust_store))
                .with_port(options.port)
                .with_timeout(options.timeout),
        );

        let hosts: Vec<Host> = domain_names
            .into_iter()
            .map(|domain| Host::new(domain, Arc::clone(&policy)))
            .collect();

        info!(
            hosts = hosts.len(),
            roots = trust_store.len(),
            port = options.port,
            timeout = ?options.timeout,
            "certificate monitor ready"
        );

        Ok(Self {
            hosts,
            extra_ca_paths,
            trust_store,
            policy,
        })
    }

    #[must_use]
    pub fn hosts(&self) -> &[Host] {
        &self.hosts
    }

    pub fn hosts_mut(&mut self) -> &mut [Host] {
        &mut self.hosts
    }

    /// First host with the given domain name
    #[must_use]
    pub fn host(&self, domain_name: &str) -> Option<&Host> {
        self.hosts.iter().find(|h| h.domain_name() == domain_name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    /// Additional CA files given at construction
    #[must_use]
    pub fn extra_ca_paths(&self) -> Option<&[PathBuf]> {
        self.extra_ca_paths.as_deref()
    }

    #[must_use]
    pub fn trust_store(&self) -> &TrustStore {
        &self.trust_store
    }

    #[must_use]
    pub fn policy(&self) -> &ConnectionPolicy {
        &self.policy
    }

    /// Fetch every host concurrently, one result per host in host order.
    ///
    /// A failing host never affects the others.
    pub async fn fetch_all(&mut self) -> Vec<Result<()>> {
        join_all(self.hosts.iter_mut().map(|host| host.fetch())).await
    }
}

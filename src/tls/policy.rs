use super::{AcceptAnyServerCert, TrustStore, probe::ensure_crypto_provider};
use rustls::ClientConfig;
use std::{fmt, sync::Arc, time::Duration};
use tokio_rustls::TlsConnector;

/// Port every host is contacted on unless configured otherwise
pub const DEFAULT_PORT: u16 = 443;

/// Upper bound for DNS resolution, TCP connect and TLS negotiation together
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// TLS client configuration shared by every host of a monitor.
///
/// Binds a [`TrustStore`] as root-of-trust reference material and disables
/// certificate chain verification (see [`AcceptAnyServerCert`]). Immutable
/// once built.
#[derive(Clone)]
pub struct ConnectionPolicy {
    trust_store: Arc<TrustStore>,
    client_config: Arc<ClientConfig>,
    port: u16,
    timeout: Duration,
}

impl fmt::Debug for ConnectionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionPolicy")
            .field("roots", &self.trust_store.len())
            .field("port", &self.port)
            .field("timeout", &self.timeout)
            .field("verification", &"disabled")
            .finish()
    }
}

impl ConnectionPolicy {
    /// Build the policy for a trust store, with the default port and timeout
    #[must_use]
    pub fn new(trust_store: Arc<TrustStore>) -> Self {
        ensure_crypto_provider();

        let verifier = AcceptAnyServerCert::new(Arc::clone(&trust_store));
        let client_config = ClientConfig::builder()
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(verifier))
            .with_no_client_auth();

        Self {
            trust_store,
            client_config: Arc::new(client_config),
            port: DEFAULT_PORT,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn trust_store(&self) -> &TrustStore {
        &self.trust_store
    }

    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Always `false`, see [`AcceptAnyServerCert`]
    #[must_use]
    pub const fn verifies_certificates(&self) -> bool {
        false
    }

    /// A connector sharing this policy's client configuration
    #[must_use]
    pub fn connector(&self) -> TlsConnector {
        TlsConnector::from(Arc::clone(&self.client_config))
    }
}

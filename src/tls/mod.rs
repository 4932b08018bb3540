//! TLS trust material, connection policy and certificate retrieval
//!
//! # Module Organization
//!
//! - `trust_store` - System roots plus operator supplied PEM files
//! - `verifier` - Verifier that accepts any server certificate
//! - `policy` - Client configuration shared by every host
//! - `certificate` - Decoded leaf certificate
//! - `probe` - Connect, handshake and collect the peer certificates
//!
//! # Example
//!
//! ```rust,no_run
//! use certpulse::tls::{ConnectionPolicy, PemPolicy, TrustStore, peer_certificates};
//! use std::sync::Arc;
//!
//! # async fn run() -> certpulse::Result<()> {
//! let store = TrustStore::build(None, PemPolicy::Lenient)?;
//! let policy = ConnectionPolicy::new(Arc::new(store));
//! let chain = peer_certificates("example.com", &policy, policy.timeout()).await?;
//! # Ok(())
//! # }
//! ```

pub mod certificate;
pub mod policy;
pub mod probe;
pub mod trust_store;
pub mod verifier;

// Re-export commonly used types
pub use certificate::Certificate;
pub use policy::{ConnectionPolicy, DEFAULT_PORT, DEFAULT_TIMEOUT};
pub use probe::{ensure_crypto_provider, peer_certificates};
pub use trust_store::{PemLoad, PemPolicy, TrustStore};
pub use verifier::AcceptAnyServerCert;

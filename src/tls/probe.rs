use super::ConnectionPolicy;
use crate::error::{Error, Result};
use rustls::pki_types::{CertificateDer, ServerName};
use std::{net::IpAddr, sync::OnceLock, time::Duration};
use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    net::TcpStream,
    time,
};
use tokio_rustls::client::TlsStream;
use tracing::{debug, warn};

static CRYPTO_PROVIDER_INIT: OnceLock<()> = OnceLock::new();

/// Ensure the rustls crypto provider is initialized
///
/// This should be called before any TLS operations. It's safe to call
/// multiple times as initialization only happens once. If another provider
/// was installed first, that one is kept.
pub fn ensure_crypto_provider() {
    CRYPTO_PROVIDER_INIT.get_or_init(|| {
        if rustls::crypto::ring::default_provider()
            .install_default()
            .is_err()
        {
            debug!("rustls crypto provider already installed");
        }
    });
}

/// Upper bound for the close_notify sent after the chain is collected
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Connect to `domain` and return the certificates presented during the
/// handshake, leaf first.
///
/// DNS resolution, TCP connect and TLS negotiation are bounded together by
/// `timeout`. Certificate verification is disabled by the policy, so expired
/// or untrusted certificates are returned too. The connection is closed
/// before returning; a close that stalls is abandoned without failing the
/// fetch.
///
/// # Errors
///
/// Returns [`Error::InvalidServerName`], [`Error::Connect`],
/// [`Error::Handshake`] or [`Error::Timeout`].
pub async fn peer_certificates(
    domain: &str,
    policy: &ConnectionPolicy,
    timeout: Duration,
) -> Result<Vec<CertificateDer<'static>>> {
    let mut tls_stream = time::timeout(timeout, handshake(domain, policy))
        .await
        .map_err(|_| Error::Timeout {
            domain: domain.to_string(),
            timeout,
        })??;

    let (_, connection) = tls_stream.get_ref();
    let certs: Vec<CertificateDer<'static>> = connection
        .peer_certificates()
        .map(|chain| chain.iter().map(|c| c.clone().into_owned()).collect())
        .unwrap_or_default();

    debug!(
        domain,
        port = policy.port(),
        certificates = certs.len(),
        protocol = ?connection.protocol_version(),
        "TLS handshake completed"
    );

    close(&mut tls_stream, domain, CLOSE_TIMEOUT.min(timeout)).await;

    Ok(certs)
}

async fn handshake(domain: &str, policy: &ConnectionPolicy) -> Result<TlsStream<TcpStream>> {
    let server_name = server_name_from_host(domain)?;
    let port = policy.port();

    let stream = TcpStream::connect((domain, port))
        .await
        .map_err(|source| Error::Connect {
            address: format!("{domain}:{port}"),
            source,
        })?;

    policy
        .connector()
        .connect(server_name, stream)
        .await
        .map_err(|source| Error::Handshake {
            domain: domain.to_string(),
            source,
        })
}

/// Best effort close_notify, the socket is released on drop either way
async fn close<S: AsyncWrite + Unpin>(stream: &mut S, domain: &str, limit: Duration) {
    match time::timeout(limit, stream.shutdown()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(domain, "failed to close TLS connection cleanly: {e}"),
        Err(_) => debug!(domain, "TLS close timed out, dropping connection"),
    }
}

fn server_name_from_host(host: &str) -> Result<ServerName<'static>> {
    host.parse::<IpAddr>().map_or_else(
        |_| {
            ServerName::try_from(host.to_string()).map_err(|_| Error::InvalidServerName {
                domain: host.to_string(),
            })
        },
        |ip| Ok(ServerName::from(ip)),
    )
}

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use certpulse::{Monitor, MonitorOptions};
use rcgen::{
    BasicConstraints, CertificateParams, DistinguishedName, DnType, IsCa, KeyPair, date_time_ymd,
};
use rustls::{
    ServerConfig,
    pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer},
};
use std::{env, sync::Arc, time::Duration};
use tokio::{io::AsyncReadExt, net::TcpListener, task::JoinHandle};
use tokio_rustls::TlsAcceptor;

pub const LOCALHOST: &str = "127.0.0.1";

/// Tests that reach public hosts only run when this is set
pub fn network_tests_enabled() -> bool {
    env::var("CERTPULSE_NETWORK_TESTS").is_ok()
}

/// Self-signed leaf for `name`, valid from 2020-01-01 until `not_after`
pub fn leaf_params(name: &str, not_after: (i32, u8, u8)) -> CertificateParams {
    let mut params = CertificateParams::new(vec![name.to_string()]).unwrap();
    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, name);
    params.distinguished_name = dn;
    params.not_before = date_time_ymd(2020, 1, 1);
    params.not_after = date_time_ymd(not_after.0, not_after.1, not_after.2);
    params
}

/// A CA and its key, for serving a chain or writing an extra CA file
pub struct TestCa {
    pub cert: rcgen::Certificate,
    pub key: KeyPair,
}

impl TestCa {
    pub fn new(name: &str) -> Self {
        let mut params = CertificateParams::new(Vec::<String>::new()).unwrap();
        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, name);
        params.distinguished_name = dn;
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        let key = KeyPair::generate().unwrap();
        let cert = params.self_signed(&key).unwrap();
        Self { cert, key }
    }

    pub fn pem(&self) -> String {
        self.cert.pem()
    }

    pub fn der(&self) -> CertificateDer<'static> {
        self.cert.der().clone()
    }
}

/// TLS server on 127.0.0.1 that completes handshakes with a fixed chain
pub struct TestServer {
    pub port: u16,
    pub chain: Vec<CertificateDer<'static>>,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Serve a self-signed leaf built from `params`
    pub async fn self_signed(params: CertificateParams) -> Self {
        let key = KeyPair::generate().unwrap();
        let cert = params.self_signed(&key).unwrap();
        Self::serve(vec![cert.der().clone()], &key).await
    }

    /// Serve a leaf signed by `ca`, followed by the CA certificate
    pub async fn signed_by(params: CertificateParams, ca: &TestCa) -> Self {
        let key = KeyPair::generate().unwrap();
        let cert = params.signed_by(&key, &ca.cert, &ca.key).unwrap();
        Self::serve(vec![cert.der().clone(), ca.der()], &key).await
    }

    async fn serve(chain: Vec<CertificateDer<'static>>, key: &KeyPair) -> Self {
        certpulse::tls::ensure_crypto_provider();

        let private_key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key.serialize_der()));
        let config = ServerConfig::builder()
            .with_no_client_auth()
            .with_single_cert(chain.clone(), private_key)
            .unwrap();
        let acceptor = TlsAcceptor::from(Arc::new(config));

        let listener = TcpListener::bind((LOCALHOST, 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let handle = tokio::spawn(async move {
            loop {
                let Ok((socket, _)) = listener.accept().await else {
                    return;
                };
                let acceptor = acceptor.clone();
                tokio::spawn(async move {
                    if let Ok(mut stream) = acceptor.accept(socket).await {
                        // wait for the client's close_notify
                        let mut buf = [0u8; 64];
                        let _ = stream.read(&mut buf).await;
                    }
                });
            }
        });

        Self {
            port,
            chain,
            handle,
        }
    }

    pub fn leaf(&self) -> &CertificateDer<'static> {
        self.chain.first().unwrap()
    }

    /// Stop accepting and release the port
    pub async fn stop(self) {
        self.handle.abort();
        let _ = self.handle.await;
    }
}

/// TCP server that accepts connections and never answers
pub async fn silent_server() -> (u16, JoinHandle<()>) {
    let listener = TcpListener::bind((LOCALHOST, 0)).await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let handle = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    (port, handle)
}

/// A port nothing listens on
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind((LOCALHOST, 0)).await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

pub fn options(port: u16) -> MonitorOptions {
    MonitorOptions {
        port,
        timeout: Duration::from_secs(5),
        ..MonitorOptions::default()
    }
}

pub fn local_monitor(domains: &[&str], port: u16) -> Monitor {
    Monitor::with_options(domains.iter().copied(), None, options(port)).unwrap()
}

use crate::error::{Error, Result};
use rustls::{RootCertStore, pki_types::CertificateDer};
use rustls_pemfile::certs;
use std::{
    env, fs,
    io::Cursor,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::{debug, warn};

/// Well-known CA bundle files, in order of preference
const KNOWN_CA_BUNDLE_PATHS: &[&str] = &[
    "/etc/ssl/certs/ca-certificates.crt", // Debian/Ubuntu
    "/etc/pki/tls/certs/ca-bundle.crt",   // RHEL/CentOS/Fedora
    "/etc/ssl/ca-bundle.pem",             // openSUSE
    "/etc/ssl/cert.pem",                  // macOS, Alpine
];

/// Well-known CA certificate directories
const KNOWN_CA_DIR_PATHS: &[&str] = &["/etc/ssl/certs"];

/// How malformed PEM content in an additional CA file is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PemPolicy {
    /// Skip entries that fail to decode and keep going
    #[default]
    Lenient,
    /// Reject files with malformed entries or without any certificate
    Strict,
}

impl FromStr for PemPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lenient" => Ok(Self::Lenient),
            "strict" => Ok(Self::Strict),
            _ => Err(format!("Invalid PEM policy: {s}")),
        }
    }
}

/// Outcome of appending one PEM blob to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PemLoad {
    /// Certificates added to the root pool
    pub added: usize,
    /// Entries that could not be decoded or were not valid certificates
    pub skipped: usize,
}

/// Pool of trusted root certificates.
///
/// Seeded from the operating system trust store and optionally extended with
/// operator supplied PEM files. Always initialized: when no system store can
/// be found the pool is simply empty.
#[derive(Debug, Clone)]
pub struct TrustStore {
    roots: RootCertStore,
}

impl Default for TrustStore {
    fn default() -> Self {
        Self::empty()
    }
}

impl TrustStore {
    /// Create a store without any root certificate
    #[must_use]
    pub fn empty() -> Self {
        Self {
            roots: RootCertStore::empty(),
        }
    }

    /// Load the operating system trust store.
    ///
    /// Lookup order matches `OpenSSL`:
    /// 1. `SSL_CERT_FILE`
    /// 2. bundle discovered by `openssl-probe`
    /// 3. well-known bundle paths
    /// 4. `SSL_CERT_DIR`, the probed directory, then well-known directories
    ///
    /// Falls back to an empty store instead of failing.
    #[must_use]
    pub fn system() -> Self {
        let mut store = Self::empty();

        if let Some(bundle) = find_system_ca_bundle()
            && let Ok(data) = fs::read(&bundle)
        {
            let loaded = store.add_pem(&data);
            if loaded.added > 0 {
                debug!(
                    path = %bundle.display(),
                    added = loaded.added,
                    "loaded system CA bundle"
                );
                return store;
            }
        }

        for dir in system_ca_dirs() {
            let added = store.add_pem_directory(&dir);
            if added > 0 {
                debug!(path = %dir.display(), added, "loaded system CA directory");
                return store;
            }
        }

        warn!("no system trust store found, starting from an empty root pool");
        store
    }

    /// Build the store used by a monitor: system roots plus every extra file, in order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigRead`] if an extra file cannot be read, or
    /// [`Error::InvalidPem`] under [`PemPolicy::Strict`] when a file holds
    /// malformed entries or no certificate at all.
    pub fn build(extra_ca_paths: Option<&[PathBuf]>, policy: PemPolicy) -> Result<Self> {
        let mut store = Self::system();

        for path in extra_ca_paths.unwrap_or_default() {
            store.add_pem_file(path, policy)?;
        }

        Ok(store)
    }

    /// Append the certificates found in a PEM file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigRead`] if the file cannot be read, or
    /// [`Error::InvalidPem`] under [`PemPolicy::Strict`].
    pub fn add_pem_file(&mut self, path: &Path, policy: PemPolicy) -> Result<PemLoad> {
        let data = fs::read(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;

        let loaded = self.add_pem(&data);

        if policy == PemPolicy::Strict {
            if loaded.skipped > 0 {
                return Err(Error::InvalidPem {
                    path: path.to_path_buf(),
                    reason: format!("{} malformed certificate entries", loaded.skipped),
                });
            }
            if loaded.added == 0 {
                return Err(Error::InvalidPem {
                    path: path.to_path_buf(),
                    reason: "no certificates found".to_string(),
                });
            }
        } else if loaded.skipped > 0 {
            warn!(
                path = %path.display(),
                skipped = loaded.skipped,
                "ignoring malformed entries in additional CA file"
            );
        }

        debug!(path = %path.display(), added = loaded.added, "loaded additional CA file");
        Ok(loaded)
    }

    /// Append every certificate found in a PEM blob, skipping what does not decode
    pub fn add_pem(&mut self, data: &[u8]) -> PemLoad {
        let mut reader = Cursor::new(data);
        let mut decoded: Vec<CertificateDer<'static>> = Vec::new();
        let mut skipped = 0;

        for item in certs(&mut reader) {
            match item {
                Ok(der) => decoded.push(der),
                Err(_) => skipped += 1,
            }
        }

        let (added, ignored) = self.roots.add_parsable_certificates(decoded);

        PemLoad {
            added,
            skipped: skipped + ignored,
        }
    }

    /// Load every PEM file of a directory, like `OpenSSL`'s `-CApath`
    fn add_pem_directory(&mut self, dir: &Path) -> usize {
        let Ok(entries) = fs::read_dir(dir) else {
            return 0;
        };

        let mut total = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_file()
                && is_pem_cert_file(&path)
                && let Ok(data) = fs::read(&path)
            {
                total += self.add_pem(&data).added;
            }
        }
        total
    }

    /// Number of root certificates in the pool
    #[must_use]
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// The underlying rustls root store
    #[must_use]
    pub const fn roots(&self) -> &RootCertStore {
        &self.roots
    }
}

fn find_system_ca_bundle() -> Option<PathBuf> {
    if let Ok(path) = env::var("SSL_CERT_FILE")
        && Path::new(&path).exists()
    {
        return Some(PathBuf::from(path));
    }

    if let Some(file) = openssl_probe::probe().cert_file
        && file.exists()
    {
        return Some(file);
    }

    KNOWN_CA_BUNDLE_PATHS
        .iter()
        .map(PathBuf::from)
        .find(|path| path.exists())
}

fn system_ca_dirs() -> Vec<PathBuf> {
    let probe = openssl_probe::probe();
    env::var("SSL_CERT_DIR")
        .ok()
        .map(PathBuf::from)
        .into_iter()
        .chain(probe.cert_dir)
        .chain(KNOWN_CA_DIR_PATHS.iter().map(PathBuf::from))
        .collect()
}

/// `.pem`, `.crt`, `.cer` and `OpenSSL` hash links (`a1b2c3d4.0`)
fn is_pem_cert_file(path: &Path) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    matches!(ext, "pem" | "crt" | "cer")
        || (ext.len() == 1 && ext.bytes().all(|b| b.is_ascii_digit()))
}

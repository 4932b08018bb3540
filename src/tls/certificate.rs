use anyhow::{Result, anyhow};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use x509_parser::{
    extensions::GeneralName,
    objects::{oid_registry, oid2sn},
    prelude::{FromDer, X509Certificate},
    time::ASN1Time,
};

/// Leaf certificate retrieved from a TLS handshake.
///
/// `Certificate::default()` is the placeholder held by hosts that were never
/// fetched: no DER, empty names, and a validity window pinned to the Unix
/// epoch so it always reads as already expired.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Certificate {
    /// Subject distinguished name
    pub subject: String,
    /// Issuer distinguished name
    pub issuer: String,
    /// Serial number, colon separated hex
    pub serial: String,
    /// Start of the validity window (UTC)
    pub not_before: DateTime<Utc>,
    /// End of the validity window (UTC)
    pub not_after: DateTime<Utc>,
    /// DNS names from the subject alternative name extension
    pub dns_names: Vec<String>,
    /// X.509 version (1, 2 or 3)
    pub version: u32,
    /// Signature algorithm short name, or its OID when unknown
    pub signature_algorithm: String,
    #[serde(skip)]
    der: Vec<u8>,
}

impl Certificate {
    /// Decode a DER encoded X.509 certificate
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a valid certificate, declare a
    /// version other than v1 to v3, or carry an out of range validity
    /// timestamp
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let (_, cert) = X509Certificate::from_der(der)
            .map_err(|e| anyhow!("failed to parse certificate: {e}"))?;

        // encoded as 0 to 2, the parser accepts any u32
        let raw_version = cert.version().0;
        if raw_version > 2 {
            return Err(anyhow!("unsupported certificate version {raw_version}"));
        }

        let validity = cert.validity();
        let not_before = to_utc(&validity.not_before)?;
        let not_after = to_utc(&validity.not_after)?;

        let dns_names = match cert.subject_alternative_name() {
            Ok(Some(san)) => san
                .value
                .general_names
                .iter()
                .filter_map(|name| match name {
                    GeneralName::DNSName(dns) => Some((*dns).to_string()),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        };

        let algorithm = &cert.signature_algorithm.algorithm;
        let signature_algorithm = oid2sn(algorithm, oid_registry())
            .map_or_else(|_| algorithm.to_id_string(), str::to_string);

        Ok(Self {
            subject: cert.subject().to_string(),
            issuer: cert.issuer().to_string(),
            serial: cert.raw_serial_as_string(),
            not_before,
            not_after,
            dns_names,
            version: raw_version + 1,
            signature_algorithm,
            der: der.to_vec(),
        })
    }

    /// Raw DER bytes, empty for the placeholder
    #[must_use]
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// True until a certificate has been adopted
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.der.is_empty()
    }

    /// Signed time left until `not_after`, negative once expired
    #[must_use]
    pub fn time_until_expiry(&self, now: DateTime<Utc>) -> Duration {
        self.not_after.signed_duration_since(now)
    }
}

fn to_utc(time: &ASN1Time) -> Result<DateTime<Utc>> {
    let raw = time.to_datetime();
    DateTime::<Utc>::from_timestamp(raw.unix_timestamp(), raw.nanosecond())
        .ok_or_else(|| anyhow!("invalid certificate timestamp"))
}

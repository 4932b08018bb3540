use prometheus::{
    Encoder, GaugeVec, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGaugeVec, Registry,
    opts, register_gauge_vec_with_registry, register_histogram_with_registry,
    register_int_counter_vec_with_registry, register_int_counter_with_registry,
    register_int_gauge_vec_with_registry,
};
use std::sync::LazyLock;

pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

trait ResultExt<T> {
    fn or_exit(self, context: &str) -> T;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: std::fmt::Display,
{
    fn or_exit(self, context: &str) -> T {
        match self {
            Ok(value) => value,
            Err(err) => {
                eprintln!("failed to initialize metric ({context}): {err}");
                std::process::exit(1);
            }
        }
    }
}

// Certificate metrics
pub static CERT_EXPIRY_SECONDS: LazyLock<GaugeVec> = LazyLock::new(|| {
    register_gauge_vec_with_registry!(
        opts!(
            "certpulse_cert_expiry_seconds",
            "Seconds until the leaf certificate expires (negative if expired)"
        ),
        &["domain"],
        &REGISTRY
    )
    .or_exit("metric can be created")
});

pub static CERT_NOT_AFTER: LazyLock<IntGaugeVec> = LazyLock::new(|| {
    register_int_gauge_vec_with_registry!(
        opts!(
            "certpulse_cert_not_after_timestamp",
            "Unix timestamp of the leaf certificate not_after field"
        ),
        &["domain"],
        &REGISTRY
    )
    .or_exit("metric can be created")
});

pub static CERT_INFO: LazyLock<IntGaugeVec> = LazyLock::new(|| {
    register_int_gauge_vec_with_registry!(
        opts!(
            "certpulse_cert_info",
            "Leaf certificate currently served (value is always 1)"
        ),
        &["domain", "issuer", "serial"],
        &REGISTRY
    )
    .or_exit("metric can be created")
});

// Fetch metrics
pub static FETCH_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec_with_registry!(
        opts!("certpulse_fetch_total", "Total certificate fetches by result"),
        &["domain", "result"],
        &REGISTRY
    )
    .or_exit("metric can be created")
});

pub static FETCH_ERRORS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec_with_registry!(
        opts!(
            "certpulse_fetch_errors_total",
            "Total certificate fetch errors by kind (connect, handshake, timeout, parse, ...)"
        ),
        &["domain", "kind"],
        &REGISTRY
    )
    .or_exit("metric can be created")
});

pub static LAST_SUCCESS: LazyLock<IntGaugeVec> = LazyLock::new(|| {
    register_int_gauge_vec_with_registry!(
        opts!(
            "certpulse_last_success_timestamp",
            "Unix timestamp of the last successful fetch"
        ),
        &["domain"],
        &REGISTRY
    )
    .or_exit("metric can be created")
});

// Loop metrics
pub static RUNTIME: LazyLock<Histogram> = LazyLock::new(|| {
    register_histogram_with_registry!(
        HistogramOpts::new("certpulse_runtime", "iteration latency in seconds"),
        &REGISTRY
    )
    .or_exit("metric can be created")
});

pub static ITERATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec_with_registry!(
        opts!("certpulse_iterations_total", "Total monitoring iterations"),
        &["status"],
        &REGISTRY
    )
    .or_exit("metric can be created")
});

pub static PANICS_RECOVERED: LazyLock<IntCounter> = LazyLock::new(|| {
    register_int_counter_with_registry!(
        opts!(
            "certpulse_panics_recovered_total",
            "Total panics recovered from"
        ),
        &REGISTRY
    )
    .or_exit("metric can be created")
});

/// Encode and return metrics for HTTP export
///
/// # Errors
///
/// Returns an error if metrics encoding fails
pub fn encode_metrics() -> Result<Vec<u8>, String> {
    let mut buffer = Vec::new();
    let encoder = prometheus::TextEncoder::new();

    encoder
        .encode(&REGISTRY.gather(), &mut buffer)
        .map_err(|e| format!("could not encode custom metrics: {e}"))?;

    Ok(buffer)
}

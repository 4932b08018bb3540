use crate::{
    error::Result as FetchResult,
    metrics::{
        CERT_EXPIRY_SECONDS, CERT_INFO, CERT_NOT_AFTER, FETCH_ERRORS, FETCH_TOTAL,
        ITERATIONS_TOTAL, LAST_SUCCESS, PANICS_RECOVERED, RUNTIME, encode_metrics,
    },
    monitor::{Host, Monitor},
    report::HostReport,
};
use axum::{Router, http::StatusCode, response::IntoResponse, routing::get};
use chrono::{DateTime, Duration, Utc};
use futures::FutureExt;
use serde::Serialize;
use std::{
    collections::HashMap,
    future::IntoFuture,
    net::{IpAddr, SocketAddr},
};
use tokio::{net::TcpListener, task, time};
use tracing::{error, info, warn};

/// Issuer and serial currently exported per domain by `certpulse_cert_info`
type CertInfoLabels = HashMap<String, (String, String)>;

#[derive(Serialize, Debug, Default)]
struct Pulse {
    runtime_ms: i64,
    time: String,
    version: String,
    failed: usize,
    hosts: Vec<HostReport>,
}

/// Start the monitoring service
///
/// # Errors
///
/// Returns an error if the service fails to start or bind to the port
pub async fn start(
    monitor: Monitor,
    interval: u16,
    listen: Option<IpAddr>,
    port: u16,
) -> anyhow::Result<()> {
    let app = Router::new().route("/metrics", get(metrics_handler));

    // Bind to socket with smart fallback
    let (listener, bind_addr) = match listen {
        Some(addr) => {
            let socket_addr = SocketAddr::new(addr, port).to_string();
            let listener = TcpListener::bind(&socket_addr).await?;
            (listener, socket_addr)
        }
        None => {
            // Auto mode: try IPv6 first, fallback to IPv4
            if let Ok(l) = TcpListener::bind(format!("[::]:{port}")).await {
                (l, format!("[::]:{port}"))
            } else {
                let socket_addr = format!("0.0.0.0:{port}");
                (TcpListener::bind(&socket_addr).await?, socket_addr)
            }
        }
    };

    info!(
        listen = %bind_addr,
        interval,
        hosts = monitor.len(),
        "serving /metrics"
    );

    let monitor_handle = task::spawn(async move { run_loop(monitor, interval).await });

    let server = axum::serve(listener, app.into_make_service()).into_future();

    tokio::select! {
        result = server => {
            result?;
        }
        result = monitor_handle => {
            match result {
                Ok(()) => {
                    error!("monitoring loop exited unexpectedly");
                    anyhow::bail!("Monitoring loop stopped");
                }
                Err(e) => {
                    error!("monitoring loop panicked: {e}");
                    anyhow::bail!("Monitoring loop panicked: {e}");
                }
            }
        }
    }

    Ok(())
}

/// Fetch every host once and print the reports as a JSON array
///
/// # Errors
///
/// Returns an error if any host could not be fetched
pub async fn check_once(mut monitor: Monitor) -> anyhow::Result<()> {
    let results = monitor.fetch_all().await;
    let now = Utc::now();

    let reports: Vec<HostReport> = monitor
        .hosts()
        .iter()
        .zip(&results)
        .map(|(host, result)| {
            if let Err(e) = result {
                warn!(domain = host.domain_name(), kind = e.kind(), "{e}");
            }
            HostReport::new(host, now, result.as_ref().err())
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&reports)?);

    let failed = results.iter().filter(|r| r.is_err()).count();
    if failed > 0 {
        anyhow::bail!("{failed} of {} hosts could not be fetched", results.len());
    }

    Ok(())
}

async fn metrics_handler() -> impl IntoResponse {
    match encode_metrics() {
        Ok(buffer) => (StatusCode::OK, buffer),
        Err(e) => {
            error!("{e}");
            (StatusCode::INTERNAL_SERVER_ERROR, Vec::new())
        }
    }
}

#[inline]
fn update_cert_info_metric(
    domain: &str,
    current: Option<(&str, &str)>,
    last_labels: &mut CertInfoLabels,
) {
    if let Some((issuer, serial)) = last_labels.get(domain)
        && Some((issuer.as_str(), serial.as_str())) != current
    {
        let _ = CERT_INFO.remove_label_values(&[domain, issuer.as_str(), serial.as_str()]);
    }

    if let Some((issuer, serial)) = current {
        CERT_INFO.with_label_values(&[domain, issuer, serial]).set(1);
        last_labels.insert(domain.to_string(), (issuer.to_string(), serial.to_string()));
    } else {
        last_labels.remove(domain);
    }
}

/// Update the per-domain metrics for one fetch outcome and build its report
fn record_host(
    host: &Host,
    result: &FetchResult<()>,
    now: DateTime<Utc>,
    last_labels: &mut CertInfoLabels,
) -> HostReport {
    let domain = host.domain_name();

    match result {
        Ok(()) => {
            FETCH_TOTAL.with_label_values(&[domain, "success"]).inc();
            LAST_SUCCESS.with_label_values(&[domain]).set(now.timestamp());
        }
        Err(e) => {
            warn!(domain, kind = e.kind(), "{e}");
            FETCH_TOTAL.with_label_values(&[domain, "error"]).inc();
            FETCH_ERRORS.with_label_values(&[domain, e.kind()]).inc();
        }
    }

    // a failed fetch keeps the previous certificate, keep exporting it
    if host.is_fetched() {
        let cert = host.certificate();
        CERT_EXPIRY_SECONDS
            .with_label_values(&[domain])
            .set(host.seconds_until_expiry_at(now));
        CERT_NOT_AFTER
            .with_label_values(&[domain])
            .set(cert.not_after.timestamp());
        update_cert_info_metric(
            domain,
            Some((cert.issuer.as_str(), cert.serial.as_str())),
            last_labels,
        );
    }

    HostReport::new(host, now, result.as_ref().err())
}

async fn iterate(monitor: &mut Monitor, last_labels: &mut CertInfoLabels) -> Pulse {
    let start = Utc::now();
    let timer = RUNTIME.start_timer();

    let results = monitor.fetch_all().await;

    timer.observe_duration();
    let end = Utc::now();

    let hosts: Vec<HostReport> = monitor
        .hosts()
        .iter()
        .zip(&results)
        .map(|(host, result)| record_host(host, result, end, last_labels))
        .collect();

    let failed = results.iter().filter(|r| r.is_err()).count();
    let status = if failed == 0 { "success" } else { "error" };
    ITERATIONS_TOTAL.with_label_values(&[status]).inc();

    Pulse {
        runtime_ms: end.signed_duration_since(start).num_milliseconds(),
        time: start.to_rfc3339(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        failed,
        hosts,
    }
}

#[inline]
fn remaining_sleep_duration(wait_time: Duration, runtime: Duration) -> Option<time::Duration> {
    wait_time
        .checked_sub(&runtime)
        .and_then(|remaining| remaining.to_std().ok())
        .filter(|duration| !duration.is_zero())
}

async fn run_loop(mut monitor: Monitor, every: u16) {
    let mut last_labels = CertInfoLabels::new();

    loop {
        // Catch panics in individual iterations to keep loop alive
        let iteration_result = std::panic::AssertUnwindSafe(async {
            let now = Utc::now();
            let wait_time = Duration::seconds(every.into());

            let pulse = iterate(&mut monitor, &mut last_labels).await;

            if let Ok(serialized) = serde_json::to_string(&pulse) {
                println!("{serialized}");
            }

            // Sleep for remaining interval time to maintain fixed interval
            let runtime = Utc::now().signed_duration_since(now);
            if let Some(remaining) = remaining_sleep_duration(wait_time, runtime) {
                time::sleep(remaining).await;
            }
        })
        .catch_unwind()
        .await;

        if let Err(panic_info) = iteration_result {
            error!("panic in monitoring loop iteration: {panic_info:?}");
            PANICS_RECOVERED.inc();
            time::sleep(time::Duration::from_secs(every.into())).await;
        }
    }
}

use crate::{
    cli::actions::{Action, Domains},
    monitor::MonitorOptions,
    tls::PemPolicy,
};
use anyhow::{Context, Result};
use clap::ArgMatches;
use std::{net::IpAddr, path::PathBuf, time::Duration};

/// Build the per-host options from the TLS related flags
fn extract_monitor_options(matches: &ArgMatches) -> MonitorOptions {
    let defaults = MonitorOptions::default();

    let port = matches
        .get_one::<u16>("tls-port")
        .copied()
        .unwrap_or(defaults.port);

    let timeout = matches
        .get_one::<u64>("timeout")
        .copied()
        .map_or(defaults.timeout, Duration::from_secs);

    let pem_policy = if matches.get_flag("strict-pem") {
        PemPolicy::Strict
    } else {
        PemPolicy::Lenient
    };

    MonitorOptions {
        port,
        timeout,
        pem_policy,
    }
}

/// Convert `ArgMatches` into typed Action enum with validation
///
/// # Errors
///
/// Returns an error if the listen address is invalid
pub fn dispatch(matches: &ArgMatches) -> Result<Action> {
    let domains = Domains {
        names: matches
            .get_many::<String>("domain")
            .map(|values| values.cloned().collect())
            .unwrap_or_default(),
        file: matches.get_one::<PathBuf>("domains-file").cloned(),
    };

    let ca_files: Option<Vec<PathBuf>> = matches
        .get_many::<PathBuf>("ca-file")
        .map(|values| values.cloned().collect());

    let options = extract_monitor_options(matches);

    if matches.get_flag("once") {
        return Ok(Action::Check {
            domains,
            ca_files,
            options,
        });
    }

    // Extract interval with default
    let interval = matches.get_one::<u16>("interval").copied().unwrap_or(300);

    // Extract and validate listen address
    let listen = matches
        .get_one::<String>("listen")
        .map(|addr| {
            addr.parse::<IpAddr>()
                .with_context(|| format!("Invalid IP address: {addr}"))
        })
        .transpose()?;

    // Extract port with default
    let port = matches.get_one::<u16>("port").copied().unwrap_or(9300);

    Ok(Action::Monitor {
        domains,
        ca_files,
        options,
        interval,
        listen,
        port,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use crate::cli::commands;

    #[test]
    fn test_dispatch_defaults() {
        let cmd = commands::new();
        let matches = cmd
            .try_get_matches_from(vec!["certpulse", "--domain", "example.com"])
            .unwrap();

        let action = dispatch(&matches).unwrap();
        match action {
            Action::Monitor {
                domains,
                ca_files,
                options,
                interval,
                listen,
                port,
            } => {
                assert_eq!(domains.names, vec!["example.com"]);
                assert!(domains.file.is_none());
                assert!(ca_files.is_none());
                assert_eq!(options, MonitorOptions::default());
                assert_eq!(interval, 300);
                assert_eq!(listen, None);
                assert_eq!(port, 9300);
            }
            Action::Check { .. } => panic!("expected Monitor"),
        }
    }

    #[test]
    fn test_dispatch_custom_values() {
        let cmd = commands::new();
        let matches = cmd
            .try_get_matches_from(vec![
                "certpulse",
                "-d",
                "a.example,b.example",
                "--interval",
                "60",
                "--port",
                "8080",
                "--tls-port",
                "8443",
                "--timeout",
                "3",
            ])
            .unwrap();

        let action = dispatch(&matches).unwrap();
        match action {
            Action::Monitor {
                domains,
                options,
                interval,
                port,
                ..
            } => {
                assert_eq!(domains.names, vec!["a.example", "b.example"]);
                assert_eq!(interval, 60);
                assert_eq!(port, 8080);
                assert_eq!(options.port, 8443);
                assert_eq!(options.timeout, Duration::from_secs(3));
                assert_eq!(options.pem_policy, PemPolicy::Lenient);
            }
            Action::Check { .. } => panic!("expected Monitor"),
        }
    }

    #[test]
    fn test_dispatch_with_listen() {
        let cmd = commands::new();
        let matches = cmd
            .try_get_matches_from(vec![
                "certpulse",
                "-d",
                "example.com",
                "--listen",
                "127.0.0.1",
            ])
            .unwrap();

        match dispatch(&matches).unwrap() {
            Action::Monitor { listen, .. } => {
                assert_eq!(listen, Some("127.0.0.1".parse().unwrap()));
            }
            Action::Check { .. } => panic!("expected Monitor"),
        }
    }

    #[test]
    fn test_dispatch_with_ipv6_listen() {
        let cmd = commands::new();
        let matches = cmd
            .try_get_matches_from(vec!["certpulse", "-d", "example.com", "--listen", "::"])
            .unwrap();

        match dispatch(&matches).unwrap() {
            Action::Monitor { listen, .. } => {
                assert_eq!(listen, Some("::".parse().unwrap()));
            }
            Action::Check { .. } => panic!("expected Monitor"),
        }
    }

    #[test]
    fn test_dispatch_once() {
        let cmd = commands::new();
        let matches = cmd
            .try_get_matches_from(vec![
                "certpulse",
                "--domains-file",
                "/etc/certpulse/domains",
                "--ca-file",
                "/etc/ssl/internal.pem",
                "--strict-pem",
                "--once",
            ])
            .unwrap();

        match dispatch(&matches).unwrap() {
            Action::Check {
                domains,
                ca_files,
                options,
            } => {
                assert!(domains.names.is_empty());
                assert_eq!(domains.file, Some(PathBuf::from("/etc/certpulse/domains")));
                assert_eq!(ca_files, Some(vec![PathBuf::from("/etc/ssl/internal.pem")]));
                assert_eq!(options.pem_policy, PemPolicy::Strict);
            }
            Action::Monitor { .. } => panic!("expected Check"),
        }
    }

    #[test]
    fn test_dispatch_invalid_listen() {
        let cmd = commands::new();
        let matches = cmd
            .try_get_matches_from(vec![
                "certpulse",
                "-d",
                "example.com",
                "--listen",
                "not-an-ip",
            ])
            .unwrap();

        let result = dispatch(&matches);
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Invalid IP address")
        );
    }
}

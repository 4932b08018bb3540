mod run;

pub use run::read_domain_names;

use crate::monitor::MonitorOptions;
use std::{net::IpAddr, path::PathBuf};

/// Where the list of domains comes from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Domains {
    /// Domains given on the command line, in order
    pub names: Vec<String>,
    /// Optional file with one domain per line, read after `names`
    pub file: Option<PathBuf>,
}

/// Action enum representing each possible command
#[derive(Debug)]
pub enum Action {
    Monitor {
        domains: Domains,
        ca_files: Option<Vec<PathBuf>>,
        options: MonitorOptions,
        interval: u16,
        listen: Option<IpAddr>,
        port: u16,
    },
    Check {
        domains: Domains,
        ca_files: Option<Vec<PathBuf>>,
        options: MonitorOptions,
    },
}

impl Action {
    /// Execute the action
    ///
    /// # Errors
    ///
    /// Returns an error if the action fails to execute
    pub async fn execute(self) -> anyhow::Result<()> {
        run::execute(self).await
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use crate::tls::PemPolicy;
    use std::time::Duration;

    fn domains() -> Domains {
        Domains {
            names: vec!["example.com".to_string()],
            file: None,
        }
    }

    #[test]
    fn test_action_debug() {
        let action = Action::Monitor {
            domains: domains(),
            ca_files: None,
            options: MonitorOptions::default(),
            interval: 300,
            listen: None,
            port: 9300,
        };

        let debug_str = format!("{action:?}");
        assert!(debug_str.contains("Monitor"));
        assert!(debug_str.contains("example.com"));
    }

    #[test]
    fn test_action_with_ipv6_listen() {
        let listen_addr = "::1".parse::<IpAddr>().unwrap();
        let action = Action::Monitor {
            domains: domains(),
            ca_files: None,
            options: MonitorOptions::default(),
            interval: 15,
            listen: Some(listen_addr),
            port: 3000,
        };

        match action {
            Action::Monitor { listen, .. } => {
                assert_eq!(listen.unwrap().to_string(), "::1");
            }
            Action::Check { .. } => panic!("expected Monitor"),
        }
    }

    #[test]
    fn test_action_check_with_options() {
        let options = MonitorOptions {
            port: 8443,
            timeout: Duration::from_secs(3),
            pem_policy: PemPolicy::Strict,
        };
        let action = Action::Check {
            domains: Domains {
                names: Vec::new(),
                file: Some(PathBuf::from("/etc/certpulse/domains")),
            },
            ca_files: Some(vec![PathBuf::from("/etc/ssl/internal.pem")]),
            options,
        };

        match action {
            Action::Check {
                domains,
                ca_files,
                options,
            } => {
                assert!(domains.names.is_empty());
                assert_eq!(domains.file, Some(PathBuf::from("/etc/certpulse/domains")));
                assert_eq!(ca_files.unwrap().len(), 1);
                assert_eq!(options.port, 8443);
                assert_eq!(options.pem_policy, PemPolicy::Strict);
            }
            Action::Monitor { .. } => panic!("expected Check"),
        }
    }

    #[test]
    fn test_domains_default_is_empty() {
        let domains = Domains::default();
        assert!(domains.names.is_empty());
        assert!(domains.file.is_none());
    }
}

use super::{Action, Domains};
use crate::{monitor::Monitor, pulse};
use anyhow::{Context, Result};
use std::{fs, path::Path};
use tracing::debug;

/// Execute the action's business logic by delegating to the appropriate module
pub async fn execute(action: Action) -> Result<()> {
    match action {
        Action::Monitor {
            domains,
            ca_files,
            options,
            interval,
            listen,
            port,
        } => {
            let monitor = Monitor::with_options(load_domains(&domains)?, ca_files, options)?;
            pulse::start(monitor, interval, listen, port).await
        }
        Action::Check {
            domains,
            ca_files,
            options,
        } => {
            let monitor = Monitor::with_options(load_domains(&domains)?, ca_files, options)?;
            pulse::check_once(monitor).await
        }
    }
}

/// Read one domain per line, skipping blank lines and `#` comments
///
/// # Errors
///
/// Returns an error if the file cannot be read
pub fn read_domain_names(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read domains file {}", path.display()))?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

fn load_domains(domains: &Domains) -> Result<Vec<String>> {
    let mut names: Vec<String> = domains
        .names
        .iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect();

    if let Some(path) = &domains.file {
        let from_file = read_domain_names(path)?;
        debug!(path = %path.display(), domains = from_file.len(), "loaded domains file");
        names.extend(from_file);
    }

    if names.is_empty() {
        anyhow::bail!("no domains to monitor");
    }

    Ok(names)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_read_domain_names_skips_comments_and_blanks() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "# production").unwrap();
        writeln!(file, "example.com").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "   www.example.org   ").unwrap();
        writeln!(file, "  # disabled.example").unwrap();
        writeln!(file, "example.com").unwrap();

        let names = read_domain_names(file.path()).unwrap();
        assert_eq!(names, vec!["example.com", "www.example.org", "example.com"]);
    }

    #[test]
    fn test_read_domain_names_missing_file() {
        let err = read_domain_names(Path::new("/nonexistent/certpulse/domains")).unwrap_err();
        assert!(err.to_string().contains("failed to read domains file"));
    }

    #[test]
    fn test_load_domains_appends_file_after_flags() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "from-file.example").unwrap();

        let domains = Domains {
            names: vec!["flag.example".to_string(), " ".to_string()],
            file: Some(file.path().to_path_buf()),
        };

        let names = load_domains(&domains).unwrap();
        assert_eq!(names, vec!["flag.example", "from-file.example"]);
    }

    #[test]
    fn test_load_domains_empty_is_an_error() {
        let file = NamedTempFile::new().unwrap();
        let domains = Domains {
            names: Vec::new(),
            file: Some(file.path().to_path_buf()),
        };

        let err = load_domains(&domains).unwrap_err();
        assert!(err.to_string().contains("no domains"));
    }

    #[tokio::test]
    async fn test_execute_check_missing_ca_file() {
        let action = Action::Check {
            domains: Domains {
                names: vec!["example.com".to_string()],
                file: None,
            },
            ca_files: Some(vec!["/nonexistent/certpulse/ca.pem".into()]),
            options: crate::monitor::MonitorOptions::default(),
        };

        let err = execute(action).await.unwrap_err();
        assert!(err.to_string().contains("/nonexistent/certpulse/ca.pem"));
    }
}

use clap::{
    Arg, ArgAction, ArgGroup, ColorChoice, Command,
    builder::styling::{AnsiColor, Effects, Styles},
};

/// Pure clap command definitions with zero business logic
#[must_use]
#[allow(clippy::too_many_lines)]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new(env!("CARGO_PKG_NAME"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("domain")
                .action(ArgAction::Append)
                .env("CERTPULSE_DOMAINS")
                .help("domain to monitor, repeat or separate with commas")
                .long("domain")
                .short('d')
                .value_delimiter(',')
                .value_name("DOMAIN"),
        )
        .arg(
            Arg::new("domains-file")
                .env("CERTPULSE_DOMAINS_FILE")
                .help("file with one domain per line")
                .long("domains-file")
                .long_help(
                    "File with one domain per line.\n\
                    Blank lines and lines starting with '#' are ignored.\n\
                    Domains from this file are monitored after the ones given with --domain."
                )
                .short('f')
                .value_name("PATH")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .group(
            ArgGroup::new("domains")
                .args(["domain", "domains-file"])
                .multiple(true)
                .required(true),
        )
        .arg(
            Arg::new("ca-file")
                .action(ArgAction::Append)
                .env("CERTPULSE_CA_FILE")
                .help("additional PEM file with trusted CA certificates")
                .long("ca-file")
                .long_help(
                    "Additional PEM file with CA certificates appended to the system trust store.\n\
                    May be repeated. Certificates are not verified against the store,\n\
                    it is only kept as handshake context.\n\n\
                    Example: /etc/ssl/internal-ca.pem"
                )
                .value_name("PATH")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(
            Arg::new("strict-pem")
                .action(ArgAction::SetTrue)
                .env("CERTPULSE_STRICT_PEM")
                .help("fail on malformed PEM in --ca-file instead of skipping it")
                .long("strict-pem"),
        )
        .arg(
            Arg::new("tls-port")
                .default_value("443")
                .env("CERTPULSE_TLS_PORT")
                .help("port the TLS connection is opened on")
                .long("tls-port")
                .value_parser(clap::value_parser!(u16).range(1..)),
        )
        .arg(
            Arg::new("timeout")
                .default_value("10")
                .env("CERTPULSE_TIMEOUT")
                .help("seconds allowed for connect plus handshake")
                .long("timeout")
                .short('t')
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new("interval")
                .default_value("300")
                .env("CERTPULSE_INTERVAL")
                .help("number of seconds between checks")
                .long("interval")
                .short('i')
                .value_parser(clap::value_parser!(u16).range(1..)),
        )
        .arg(
            Arg::new("listen")
                .env("CERTPULSE_LISTEN")
                .help("IP address to bind to (default: [::]:port, accepts both IPv6 and IPv4)")
                .long("listen")
                .long_help(
                    "IP address to bind to:\n\
                    Not specified (default) binds to [::]:port which accepts both IPv6 and IPv4 connections.\n\
                    Falls back to 0.0.0.0:port if IPv6 is unavailable.\n\n\
                    Specific IPv4 examples: '0.0.0.0', '127.0.0.1'\n\
                    Specific IPv6: '::', '::1'"
                )
                .short('l')
                .value_name("IP"),
        )
        .arg(
            Arg::new("port")
                .default_value("9300")
                .env("CERTPULSE_PORT")
                .help("listening port for /metrics")
                .long("port")
                .short('p')
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("once")
                .action(ArgAction::SetTrue)
                .help("fetch every domain once, print a JSON report and exit")
                .long("once")
                .conflicts_with("listen"),
        )
        .arg(
            Arg::new("verbose")
                .action(ArgAction::Count)
                .help("increase log verbosity (-v debug, -vv trace)")
                .long("verbose")
                .short('v'),
        )
}

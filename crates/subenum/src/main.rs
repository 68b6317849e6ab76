mod bruteforce;
mod classify;
mod config;
mod dns;
mod enumerate;
mod error;
mod model;
mod modules;
mod ports;
mod report;
mod scan;

pub use error::{Error, Result};

use clap::{Arg, ArgAction, ArgMatches, Command};
use config::{parse_engines, parse_ports, Config, DEFAULT_CONFIG_PATH};
use model::{is_hostname, is_wildcard, normalize};
use modules::Registry;
use report::ensure_dir;
use scan::{scan, ScanSettings};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{error, info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = cli().get_matches();
    let registry = Registry::builtin()?;

    if args.get_flag("list") {
        modules::display_all(&registry);
        return Ok(());
    }

    let no_color = args.get_flag("no-color");
    if no_color {
        colored::control::set_override(false);
    }

    let domain = match args.get_one::<String>("domain") {
        Some(domain) => validate_domain(domain)?,
        None => return Err(Error::CliUsage("--domain is required".into())),
    };
    let verbose = args.get_flag("verbose");

    // create filename
    let timestamp = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
    let filename = format!("{}", timestamp);

    let save_logs = args.get_flag("logs");
    let output_dir = PathBuf::from(format!("output/subenum/{}", domain));
    if save_logs {
        ensure_dir(&output_dir)?;
    }
    init_tracing_subscriber(verbose, !no_color, save_logs, &output_dir, &filename)?;

    let settings = match build_settings(&args, &registry, domain, verbose) {
        Ok(settings) => settings,
        Err(err) => {
            error!("{:12} - {}", "CONFIG ERROR", err);
            return Err(err);
        }
    };

    info!("Scanning {} (run_{})", settings.domain, timestamp);
    let report = scan(&registry, &settings)?;

    if !report.failed_sources.is_empty() {
        let failed: Vec<&str> = report
            .failed_sources
            .iter()
            .map(|failure| failure.module.as_str())
            .collect();
        warn!("{} sources failed: {}", failed.len(), failed.join(", "));
    }

    Ok(())
}

fn cli() -> Command {
    Command::new(clap::crate_name!())
        .version(clap::crate_version!())
        .about("Enumerate the subdomains of a target from public sources")
        .arg(
            Arg::new("domain")
                .short('d')
                .long("domain")
                .help("Domain to enumerate subdomains for")
                .value_name("DOMAIN")
                .required_unless_present("list"),
        )
        .arg(
            Arg::new("engines")
                .short('e')
                .long("engines")
                .help("Comma-separated list of sources to query (default: all known sources)")
                .value_name("ENGINES"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .help("Save results to this file (.json for the full report)")
                .value_name("FILE"),
        )
        .arg(
            Arg::new("ports")
                .short('p')
                .long("ports")
                .help("Comma-separated list of ports to scan (e.g. 80,443)")
                .value_name("PORTS"),
        )
        .arg(
            Arg::new("bruteforce")
                .short('b')
                .long("bruteforce")
                .action(ArgAction::SetTrue)
                .help("Brute force subdomains from the wordlist"),
        )
        .arg(
            Arg::new("wordlist")
                .short('w')
                .long("wordlist")
                .help("Wordlist used by the brute force")
                .value_name("FILE"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .help("Configuration file")
                .value_name("FILE")
                .default_value(DEFAULT_CONFIG_PATH),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Enable verbose output"),
        )
        .arg(
            Arg::new("no-color")
                .short('n')
                .long("no-color")
                .action(ArgAction::SetTrue)
                .help("Disable colorized output"),
        )
        .arg(
            Arg::new("logs")
                .short('s')
                .long("logs")
                .action(ArgAction::SetTrue)
                .help("Save logs into a .log file"),
        )
        .arg(
            Arg::new("list")
                .short('l')
                .long("list")
                .action(ArgAction::SetTrue)
                .help("List all sources"),
        )
}

fn validate_domain(domain: &str) -> Result<String> {
    let domain = normalize(domain);
    if !is_hostname(&domain) || is_wildcard(&domain) {
        return Err(Error::InvalidDomain(domain));
    }
    Ok(domain)
}

/// Loads the configuration file and lays the CLI flags over it.
fn build_settings(
    args: &ArgMatches,
    registry: &Registry,
    domain: String,
    verbose: bool,
) -> Result<ScanSettings> {
    let config_path = args
        .get_one::<String>("config")
        .map(|path| path.as_str())
        .unwrap_or(DEFAULT_CONFIG_PATH);
    let mut config = Config::load(Path::new(config_path))?;

    if let Some(ports) = args.get_one::<String>("ports") {
        config.ports = Some(parse_ports(ports)?);
    }
    if let Some(wordlist) = args.get_one::<String>("wordlist") {
        config.wordlist = PathBuf::from(wordlist);
    }

    let engines = select_engines(
        args.get_one::<String>("engines").map(|e| e.as_str()),
        &config,
        registry,
    )?;

    Ok(ScanSettings {
        domain,
        engines,
        bruteforce: args.get_flag("bruteforce"),
        output: args.get_one::<String>("output").map(PathBuf::from),
        verbose,
        config,
    })
}

/// `--engines` wins, then the engines enabled in the file, then every
/// registered source.
fn select_engines(cli_engines: Option<&str>, config: &Config, registry: &Registry) -> Result<Vec<String>> {
    let engines = match cli_engines {
        Some(list) => parse_engines(list),
        None => {
            let enabled = config.enabled_engines();
            if enabled.is_empty() {
                registry.names()
            } else {
                enabled
            }
        }
    };

    if engines.is_empty() {
        return Err(Error::NoEnginesSelected);
    }
    Ok(engines)
}

fn init_tracing_subscriber(
    verbose: bool,
    ansi: bool,
    save_logs_file: bool,
    output_dir: &Path,
    filename: &str,
) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,subenum={}", level)));

    // base for the subscriber
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_file(false)
        .with_target(false);

    let res = if save_logs_file {
        let filename = format!("{}.log", filename);
        let file_appender = RollingFileAppender::new(Rotation::NEVER, output_dir, filename);
        let subscriber = subscriber
            .with_ansi(false)
            .with_writer(file_appender)
            .finish();

        // add log in terminal as an additional layer
        let stderr_layer = layer()
            .with_span_events(FmtSpan::CLOSE)
            .with_ansi(ansi)
            .with_file(false)
            .with_target(false)
            .with_writer(std::io::stderr);

        tracing::subscriber::set_global_default(subscriber.with(stderr_layer))
    } else {
        let subscriber = subscriber
            .with_ansi(ansi)
            .with_writer(std::io::stderr)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
    };

    res.map_err(|err| Error::Logging(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn cli_accepts_the_documented_flags() {
        let args = cli()
            .try_get_matches_from([
                "subenum", "-d", "example.com", "-e", "crtsh,baidu", "-o", "out.txt", "-p",
                "80,443", "-b", "-v", "-n",
            ])
            .unwrap();

        assert_eq!(args.get_one::<String>("domain").unwrap(), "example.com");
        assert_eq!(args.get_one::<String>("engines").unwrap(), "crtsh,baidu");
        assert!(args.get_flag("bruteforce"));
        assert!(args.get_flag("verbose"));
        assert!(args.get_flag("no-color"));
        assert!(!args.get_flag("logs"));
        assert_eq!(args.get_one::<String>("config").unwrap(), DEFAULT_CONFIG_PATH);
    }

    #[test]
    fn cli_requires_a_domain() {
        assert!(cli().try_get_matches_from(["subenum", "-b"]).is_err());
        assert!(cli().try_get_matches_from(["subenum", "--list"]).is_ok());
    }

    #[test]
    fn domain_must_be_a_hostname() {
        assert_eq!(validate_domain(" Example.COM. ").unwrap(), "example.com");
        assert!(matches!(validate_domain("localhost"), Err(Error::InvalidDomain(_))));
        assert!(matches!(validate_domain("*.example.com"), Err(Error::InvalidDomain(_))));
    }

    #[test]
    fn engine_selection_order() {
        let registry = Registry::builtin().unwrap();
        let mut config = Config::default();

        let all = select_engines(None, &config, &registry).unwrap();
        assert_eq!(all, registry.names());

        config.engines = BTreeMap::from([("crtsh".to_string(), true), ("baidu".to_string(), false)]);
        assert_eq!(select_engines(None, &config, &registry).unwrap(), vec!["crtsh"]);

        let picked = select_engines(Some("netcraft,google"), &config, &registry).unwrap();
        assert_eq!(picked, vec!["netcraft", "google"]);

        assert!(matches!(
            select_engines(Some(" , "), &config, &registry),
            Err(Error::NoEnginesSelected)
        ));
    }
}

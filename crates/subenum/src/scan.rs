use crate::bruteforce::{bruteforce, read_wordlist};
use crate::classify::{classify, clean};
use crate::config::Config;
use crate::dns::{DnsResolver, Resolve};
use crate::enumerate::enumerate;
use crate::model::{merge, PortScanResult, ScanReport, SourceFailure};
use crate::modules::Registry;
use crate::ports::PortScanner;
use crate::report::{export, write_to_console};
use crate::Result;
use std::collections::BTreeSet;
use std::path::PathBuf;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{error, info, instrument, trace, warn};

/// What one run was asked to do, after CLI flags were applied on top of
/// the configuration file.
#[derive(Debug, Clone)]
pub struct ScanSettings {
    pub domain: String,
    pub engines: Vec<String>,
    pub bruteforce: bool,
    pub output: Option<PathBuf>,
    pub verbose: bool,
    pub config: Config,
}

// region:        --- Scan main function

#[tokio::main]
#[instrument(name = "scan", level = "info", skip_all)]
pub async fn scan(registry: &Registry, settings: &ScanSettings) -> Result<ScanReport> {
    trace!("Start scan on {}", settings.domain);

    let resolver = DnsResolver::new(&settings.config.resolver_ips()?, settings.config.dns_timeout());
    let report = run(registry, &resolver, settings).await?;

    // sinks never abort the run
    if let Some(path) = &settings.output {
        match export(&report, path) {
            Ok(()) => info!("Results saved to {:?}", path),
            Err(err) => error!("Writing results: {}", err),
        }
    }
    if let Err(err) = write_to_console(&report.classification, &report.open_ports) {
        error!("Writing to console: {}", err);
    }

    Ok(report)
}

// endregion:     --- Scan main function

// region:        --- Scan subfunctions

/// Runs the stages in order. The host set is only touched between stages.
pub async fn run<R>(registry: &Registry, resolver: &R, settings: &ScanSettings) -> Result<ScanReport>
where
    R: Resolve + ?Sized,
{
    let config = &settings.config;
    let domain = settings.domain.as_str();

    let enumeration = enumerate(
        registry,
        &settings.engines,
        domain,
        &config.api_keys,
        config.source_timeout(),
    )
    .await?;
    let mut subdomains = clean(&enumeration.subdomains);
    info!("{} subdomains enumerated", subdomains.len());

    if settings.bruteforce {
        let found = scan_bruteforce(resolver, settings).await;
        subdomains = merge(&subdomains, &found);
    }

    let open_ports = match &config.ports {
        Some(ports) if !ports.is_empty() => scan_ports(ports, &subdomains, settings).await,
        _ => PortScanResult::new(),
    };

    let classification = classify(resolver, &subdomains, config.concurrency.classify).await;

    let generated_at = OffsetDateTime::now_utc().format(&Rfc3339)?;
    let failed_sources = enumeration
        .failures
        .iter()
        .map(|(module, err)| SourceFailure {
            module: module.clone(),
            reason: err.to_string(),
        })
        .collect();

    Ok(ScanReport {
        domain: domain.to_string(),
        generated_at,
        classification,
        open_ports,
        failed_sources,
    })
}

#[instrument(name = "bruteforce", level = "info", skip_all)]
async fn scan_bruteforce<R>(resolver: &R, settings: &ScanSettings) -> BTreeSet<String>
where
    R: Resolve + ?Sized,
{
    let config = &settings.config;
    let words = match read_wordlist(&config.wordlist) {
        Ok(words) => words,
        Err(err) => {
            error!("Reading wordlist {:?}: {}", config.wordlist, err);
            return BTreeSet::new();
        }
    };
    if words.is_empty() {
        warn!("Wordlist {:?} is empty", config.wordlist);
        return BTreeSet::new();
    }

    let found = bruteforce(resolver, &settings.domain, &words, config.threads).await;
    clean(&found)
}

async fn scan_ports(
    ports: &[u16],
    subdomains: &BTreeSet<String>,
    settings: &ScanSettings,
) -> PortScanResult {
    let config = &settings.config;
    PortScanner::new(ports.to_vec(), settings.verbose)
        .with_concurrency(config.concurrency.hosts, config.concurrency.ports)
        .with_timeout(config.port_timeout())
        .scan(subdomains)
        .await
}

// endregion:     --- Scan subfunctions

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::fake::FakeResolver;
    use crate::modules::subdomains::SubdomainModule;
    use crate::modules::{Module, ModuleConstructor};
    use crate::Error;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::time::{SystemTime, UNIX_EPOCH};

    struct Canned(&'static str, Vec<&'static str>);

    impl Module for Canned {
        fn name(&self) -> String {
            self.0.to_string()
        }
        fn description(&self) -> String {
            String::new()
        }
    }

    #[async_trait]
    impl SubdomainModule for Canned {
        async fn enumerate(&self) -> Result<HashSet<String>> {
            if self.1.is_empty() {
                return Err(Error::SourceParseError {
                    module: self.name(),
                    reason: "unexpected body".to_string(),
                });
            }
            Ok(self.1.iter().map(|h| h.to_string()).collect())
        }
    }

    fn registry() -> Registry {
        let alpha: ModuleConstructor = Arc::new(|_: &str, _: Option<&str>| {
            Box::new(Canned(
                "alpha",
                vec!["www.example.com", "old.example.com<BR>*.example.com"],
            )) as Box<dyn SubdomainModule>
        });
        let broken: ModuleConstructor = Arc::new(|_: &str, _: Option<&str>| {
            Box::new(Canned("broken", vec![])) as Box<dyn SubdomainModule>
        });
        Registry::load(vec![
            ("alpha".to_string(), alpha),
            ("broken".to_string(), broken),
        ])
        .unwrap()
    }

    fn settings(bruteforce: bool, wordlist: PathBuf) -> ScanSettings {
        let config = Config {
            wordlist,
            ..Config::default()
        };
        ScanSettings {
            domain: "example.com".to_string(),
            engines: vec!["alpha".to_string(), "broken".to_string()],
            bruteforce,
            output: None,
            verbose: false,
            config,
        }
    }

    #[tokio::test]
    async fn runs_every_stage_and_keeps_failures() {
        let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
        let wordlist = std::env::temp_dir().join(format!("subenum-{}-words.txt", nanos));
        std::fs::write(&wordlist, "mail\nnothing\n").unwrap();
        let resolver = FakeResolver::new(&["www.example.com", "mail.example.com"]);

        let report = run(&registry(), &resolver, &settings(true, wordlist.clone()))
            .await
            .unwrap();
        std::fs::remove_file(&wordlist).unwrap();

        let classification = report.classification;
        assert_eq!(classification.valid, vec!["mail.example.com", "www.example.com"]);
        assert_eq!(classification.invalid, vec!["old.example.com"]);
        assert_eq!(classification.wildcard, vec!["*.example.com"]);
        assert!(report.open_ports.is_empty());
        assert_eq!(report.failed_sources.len(), 1);
        assert_eq!(report.failed_sources[0].module, "broken");
    }

    #[tokio::test]
    async fn missing_wordlist_only_empties_the_bruteforce_stage() {
        let resolver = FakeResolver::new(&["www.example.com"]);
        let settings = settings(true, PathBuf::from("/definitely/not/here/words.txt"));

        let report = run(&registry(), &resolver, &settings).await.unwrap();

        assert_eq!(report.classification.valid, vec!["www.example.com"]);
        assert_eq!(report.classification.total(), 3);
    }

    #[tokio::test]
    async fn no_known_engine_aborts() {
        let resolver = FakeResolver::new(&[]);
        let mut settings = settings(false, PathBuf::new());
        settings.engines = vec!["google".to_string()];

        let res = run(&registry(), &resolver, &settings).await;
        assert!(matches!(res, Err(Error::NoUsableSources)));
    }
}

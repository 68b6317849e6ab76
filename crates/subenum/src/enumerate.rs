use crate::model::{normalize, EnumerationReport};
use crate::modules::subdomains::SubdomainModule;
use crate::modules::Registry;
use crate::{Error, Result};
use futures::future::join_all;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

pub const DEFAULT_SOURCE_TIMEOUT_MS: u64 = 30000;

/// Builds one module per selected name. Unknown names are skipped.
pub fn build_modules(
    registry: &Registry,
    names: &[String],
    domain: &str,
    api_keys: &HashMap<String, String>,
) -> Vec<Box<dyn SubdomainModule>> {
    let mut seen = HashSet::new();
    names
        .iter()
        .filter(|name| seen.insert(name.as_str()))
        .filter_map(|name| {
            let api_key = api_keys.get(name).map(|key| key.as_str());
            let module = registry.build(name, domain, api_key);
            if module.is_none() {
                warn!("Unknown source {:?}, skipping", name);
            }
            module
        })
        .collect()
}

/// Runs every module in its own task under its own timeout, waits for all
/// of them, then merges the successes.
#[instrument(name = "subdomains", level = "info", skip_all)]
pub async fn run_modules(
    modules: Vec<Box<dyn SubdomainModule>>,
    timeout: Duration,
) -> Result<EnumerationReport> {
    if modules.is_empty() {
        error!("No usable source for this run");
        return Err(Error::NoUsableSources);
    }
    info!("Querying {} sources", modules.len());

    let tasks: Vec<(String, tokio::task::JoinHandle<Result<HashSet<String>>>)> = modules
        .into_iter()
        .map(|module| {
            let name = module.name();
            let task_name = name.clone();
            let handle = tokio::spawn(async move {
                match tokio::time::timeout(timeout, module.enumerate()).await {
                    Ok(res) => res,
                    Err(_) => Err(Error::SourceTimeout(task_name)),
                }
            });
            (name, handle)
        })
        .collect();

    let outcomes = join_all(
        tasks
            .into_iter()
            .map(|(name, handle)| async move { (name, handle.await) }),
    )
    .await;

    let mut report = EnumerationReport::default();
    for (name, outcome) in outcomes {
        match outcome {
            Ok(Ok(subdomains)) => {
                info!("{}: {} subdomains", name, subdomains.len());
                let subdomains: BTreeSet<String> =
                    subdomains.iter().map(|host| normalize(host)).collect();
                report.subdomains.extend(subdomains);
            }
            Ok(Err(err)) => {
                error!("{}: {}", name, err);
                report.failures.push((name, err));
            }
            Err(join_err) => {
                error!("{}: task aborted: {}", name, join_err);
                report.failures.push((name.clone(), Error::SourcePanicked(name)));
            }
        }
    }

    debug!(
        "{} subdomains merged, {} sources failed",
        report.subdomains.len(),
        report.failures.len()
    );
    Ok(report)
}

pub async fn enumerate(
    registry: &Registry,
    names: &[String],
    domain: &str,
    api_keys: &HashMap<String, String>,
    timeout: Duration,
) -> Result<EnumerationReport> {
    let modules = build_modules(registry, names, domain, api_keys);
    run_modules(modules, timeout).await
}

use crate::dns::Resolve;
use crate::model::{is_hostname, is_wildcard, normalize, Classification};
use futures::{stream, StreamExt};
use lazy_regex::regex;
use std::collections::BTreeSet;
use tracing::{info, instrument, trace};

pub const DEFAULT_CLASSIFY_CONCURRENCY: usize = 30;

/// Splits fields that still hold line-break tags or newlines, normalizes
/// every fragment and drops the ones that cannot be hostnames.
pub fn clean<I, S>(raw: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    raw.into_iter()
        .flat_map(|field| {
            regex!(r"(?i)<br\s*/?>|\r?\n")
                .split(field.as_ref())
                .map(normalize)
                .collect::<Vec<String>>()
        })
        .filter(|fragment| is_hostname(fragment))
        .collect()
}

/// Partitions the cleaned hosts. Wildcards are never handed to the
/// resolver; every other host is Valid when it has an A record.
#[instrument(name = "classify", level = "info", skip_all)]
pub async fn classify<R>(resolver: &R, hosts: &BTreeSet<String>, concurrency: usize) -> Classification
where
    R: Resolve + ?Sized,
{
    let mut classification = Classification::default();

    let (wildcards, candidates): (Vec<&String>, Vec<&String>) =
        hosts.iter().partition(|host| is_wildcard(host));
    classification.wildcard = wildcards.into_iter().cloned().collect();

    let checked: Vec<(String, bool)> = stream::iter(candidates)
        .map(|host| async move {
            let resolves = resolver.resolves(host).await;
            trace!("{:12} - {} {}", "CHECKED", host, resolves);
            (host.clone(), resolves)
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    for (host, resolves) in checked {
        if resolves {
            classification.valid.push(host);
        } else {
            classification.invalid.push(host);
        }
    }
    classification.valid.sort();
    classification.invalid.sort();

    info!(
        "{} valid, {} invalid, {} wildcard",
        classification.valid.len(),
        classification.invalid.len(),
        classification.wildcard.len()
    );
    classification
}

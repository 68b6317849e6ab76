use crate::dns::Resolve;
use crate::model::normalize;
use crate::Result;
use futures::{stream, StreamExt};
use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use tracing::{debug, info, instrument};

pub const DEFAULT_BRUTEFORCE_CONCURRENCY: usize = 30;

/// One label per line; blanks and `#` comments are ignored, duplicates
/// keep their first position.
pub fn read_wordlist(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)?;
    Ok(parse_wordlist(&content))
}

pub fn parse_wordlist(content: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    content
        .lines()
        .map(normalize)
        .filter(|label| !label.is_empty() && !label.starts_with('#'))
        .filter(|label| seen.insert(label.clone()))
        .collect()
}

/// Tries `label.domain` for every label, keeping at most `concurrency`
/// lookups in flight, and returns the names that resolved.
#[instrument(name = "bruteforce", level = "info", skip_all, fields(domain = domain))]
pub async fn bruteforce<R>(
    resolver: &R,
    domain: &str,
    words: &[String],
    concurrency: usize,
) -> BTreeSet<String>
where
    R: Resolve + ?Sized,
{
    info!("{} candidates to resolve", words.len());

    let found: BTreeSet<String> = stream::iter(words.iter())
        .map(|label| {
            let candidate = normalize(&format!("{}.{}", label, domain));
            async move {
                if resolver.resolves(&candidate).await {
                    info!("Found subdomain: {}", candidate);
                    Some(candidate)
                } else {
                    debug!("{:12} - {:?}", "NOT RESOLVED", candidate);
                    None
                }
            }
        })
        .buffer_unordered(concurrency.max(1))
        .filter_map(|candidate| async move { candidate })
        .collect()
        .await;

    info!("{} subdomains found by brute force", found.len());
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::fake::FakeResolver;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn words(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|l| l.to_string()).collect()
    }

    #[tokio::test]
    async fn keeps_only_resolving_candidates() {
        let resolver = FakeResolver::new(&["www.example.com", "mail.example.com"]);
        let found = bruteforce(
            &resolver,
            "example.com",
            &words(&["www", "mail", "doesnotexist123"]),
            DEFAULT_BRUTEFORCE_CONCURRENCY,
        )
        .await;

        let expected: BTreeSet<String> = ["www.example.com", "mail.example.com"]
            .iter()
            .map(|h| h.to_string())
            .collect();
        assert_eq!(found, expected);
        // every label is attempted, no early exit
        assert_eq!(resolver.queried().len(), 3);
    }

    struct CountingResolver {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl Resolve for CountingResolver {
        async fn resolves(&self, _host: &str) -> bool {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            false
        }
    }

    #[tokio::test]
    async fn in_flight_lookups_are_bounded() {
        let resolver = CountingResolver {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        };
        let labels: Vec<String> = (0..50).map(|i| format!("w{}", i)).collect();

        let found = bruteforce(&resolver, "example.com", &labels, 4).await;

        assert!(found.is_empty());
        assert!(resolver.peak.load(Ordering::SeqCst) <= 4);
    }

    #[test]
    fn wordlist_skips_blanks_comments_and_duplicates() {
        let labels = parse_wordlist("www\n\n# admin panels\nAdmin\nwww\n  dev  \n");
        assert_eq!(labels, vec!["www", "admin", "dev"]);
    }
}

pub mod baidu;
pub mod crtsh;
pub mod dnsdumpster;
pub mod hackertarget;
pub mod netcraft;
pub mod virustotal;
pub mod web_archive;

use super::Module;
use crate::model::{belongs_to, is_hostname, normalize};
use crate::Result;
use async_trait::async_trait;
use reqwest::Url;
use std::collections::HashSet;
use tracing::trace;

/// A source of candidate hostnames for one target domain.
///
/// Implementations own their HTTP session for the duration of `enumerate`
/// and only fail with the source errors (`SourceUnavailable`,
/// `SourceTimeout`, `SourceParseError`).
#[async_trait]
pub trait SubdomainModule: Module + Send + Sync {
    async fn enumerate(&self) -> Result<HashSet<String>>;
}

/// Normalizes candidates and keeps the hostnames under `domain`.
pub fn collect_hosts<I>(candidates: I, domain: &str) -> HashSet<String>
where
    I: IntoIterator<Item = String>,
{
    candidates
        .into_iter()
        .map(|candidate| normalize(&candidate))
        .filter(|host| is_hostname(host) && is_dns_name(host) && belongs_to(host, domain))
        .inspect(|host| trace!("Collecting: {:?}", host))
        .collect()
}

// leftovers of markup never make it past extraction
fn is_dns_name(host: &str) -> bool {
    host.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '*'))
}

/// Host part of a scraped link, which may lack its scheme.
pub fn host_of(link: &str) -> Option<String> {
    let link = link.trim();
    let parsed = if link.contains("://") {
        Url::parse(link)
    } else {
        Url::parse(&format!("http://{}", link))
    };
    parsed
        .ok()
        .and_then(|url| url.host_str().map(|host| host.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collect_hosts_filters_out_of_scope_candidates() {
        let hosts = collect_hosts(
            vec![
                "WWW.example.com".to_string(),
                "www.example.com.".to_string(),
                "other.org".to_string(),
                "admin@example.com".to_string(),
                "*.example.com".to_string(),
                "a\">b.example.com".to_string(),
            ],
            "example.com",
        );
        let mut hosts: Vec<String> = hosts.into_iter().collect();
        hosts.sort();
        assert_eq!(hosts, vec!["*.example.com", "www.example.com"]);
    }

    #[test]
    fn host_of_accepts_bare_and_full_links() {
        assert_eq!(
            host_of("https://api.example.com/v1?x=1"),
            Some("api.example.com".to_string())
        );
        assert_eq!(host_of("blog.example.com/post"), Some("blog.example.com".to_string()));
        assert_eq!(host_of("http://"), None);
    }
}

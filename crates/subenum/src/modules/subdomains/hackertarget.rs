use super::{collect_hosts, SubdomainModule};
use crate::modules::{http_request, new_http_client, Module};
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use tracing::{debug, instrument};

// region:        --- Module info

pub struct HackerTarget {
    domain: String,
}

impl HackerTarget {
    pub fn new(domain: &str) -> Self {
        Self {
            domain: domain.to_string(),
        }
    }
}

impl Module for HackerTarget {
    fn name(&self) -> String {
        "hackertarget".to_string()
    }
    fn description(&self) -> String {
        "Use the hackertarget.com hostsearch API".to_string()
    }
}

// endregion:     --- Module info

impl HackerTarget {
    /// Body is `host,ip` lines, or a single plain-text error line.
    fn extract(&self, body: &str) -> Result<HashSet<String>> {
        if body.trim_start().starts_with("error") || body.contains("API count exceeded") {
            return Err(Error::SourceUnavailable {
                module: self.name(),
                reason: body.lines().next().unwrap_or_default().to_string(),
            });
        }

        let candidates = body
            .lines()
            .filter_map(|line| line.split(',').next())
            .map(|host| host.to_string());

        Ok(collect_hosts(candidates, &self.domain))
    }
}

#[async_trait]
impl SubdomainModule for HackerTarget {
    #[instrument(name = "enumerate", level = "debug", fields(module = %self.name()), skip_all)]
    async fn enumerate(&self) -> Result<HashSet<String>> {
        let http_client = new_http_client(&self.name())?;
        let url = format!("https://api.hackertarget.com/hostsearch/?q={}", self.domain);
        let body = http_request(&self.name(), http_client.get(url)).await?;

        let subdomains = self.extract(&body)?;
        debug!("{} collected", subdomains.len());
        Ok(subdomains)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_csv_lines() {
        let body = "vpn.example.com,10.0.0.1\nftp.example.com,10.0.0.2\n\n,\nmalformed";
        let hosts = HackerTarget::new("example.com").extract(body).unwrap();

        let mut hosts: Vec<String> = hosts.into_iter().collect();
        hosts.sort();
        assert_eq!(hosts, vec!["ftp.example.com", "vpn.example.com"]);
    }

    #[test]
    fn quota_message_is_unavailable() {
        let res = HackerTarget::new("example.com").extract("API count exceeded - Increase Quota");
        assert!(matches!(res, Err(Error::SourceUnavailable { .. })));
    }
}

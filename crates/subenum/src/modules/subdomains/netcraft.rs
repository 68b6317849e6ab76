use super::{collect_hosts, host_of, SubdomainModule};
use crate::modules::{http_request, new_http_client, Module};
use crate::Result;
use async_trait::async_trait;
use lazy_regex::regex;
use std::collections::HashSet;
use tracing::{debug, instrument};

// region:        --- Module info

pub struct Netcraft {
    domain: String,
}

impl Netcraft {
    pub fn new(domain: &str) -> Self {
        Self {
            domain: domain.to_string(),
        }
    }
}

impl Module for Netcraft {
    fn name(&self) -> String {
        "netcraft".to_string()
    }
    fn description(&self) -> String {
        "Scrape searchdns.netcraft.com results".to_string()
    }
}

// endregion:     --- Module info

impl Netcraft {
    fn extract(&self, body: &str) -> HashSet<String> {
        let hosts = regex!(r#"<a class="results-table__host" href="(.*?)""#)
            .captures_iter(body)
            .filter_map(|caps| caps.get(1))
            .filter_map(|link| host_of(link.as_str()));

        collect_hosts(hosts, &self.domain)
    }
}

#[async_trait]
impl SubdomainModule for Netcraft {
    #[instrument(name = "enumerate", level = "debug", fields(module = %self.name()), skip_all)]
    async fn enumerate(&self) -> Result<HashSet<String>> {
        let http_client = new_http_client(&self.name())?;
        let url = format!(
            "https://searchdns.netcraft.com/?restriction=site+ends+with&host={}",
            self.domain
        );
        let body = http_request(&self.name(), http_client.get(url)).await?;

        let subdomains = self.extract(&body);
        debug!("{} collected", subdomains.len());
        Ok(subdomains)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_result_links() {
        let body = r#"
            <a class="results-table__host" href="https://www.example.com/">www</a>
            <a class="results-table__host" href="http://docs.example.com">docs</a>
            <a class="results-table__host" href="">empty</a>
            <a class="other" href="https://skip.example.com/">skip</a>
        "#;
        let hosts = Netcraft::new("example.com").extract(body);

        let mut hosts: Vec<String> = hosts.into_iter().collect();
        hosts.sort();
        assert_eq!(hosts, vec!["docs.example.com", "www.example.com"]);
    }
}

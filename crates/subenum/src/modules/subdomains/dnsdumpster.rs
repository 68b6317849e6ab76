use super::{collect_hosts, SubdomainModule};
use crate::modules::{http_request, new_http_client, Module};
use crate::Result;
use async_trait::async_trait;
use lazy_regex::regex;
use std::collections::HashSet;
use tracing::{debug, instrument};

// region:        --- Module info

pub struct DnsDumpster {
    domain: String,
}

impl DnsDumpster {
    pub fn new(domain: &str) -> Self {
        Self {
            domain: domain.to_string(),
        }
    }
}

impl Module for DnsDumpster {
    fn name(&self) -> String {
        "dnsdumpster".to_string()
    }
    fn description(&self) -> String {
        "Scrape dnsdumpster.com host tables".to_string()
    }
}

// endregion:     --- Module info

impl DnsDumpster {
    fn extract(&self, body: &str) -> HashSet<String> {
        let cells = regex!(r#"<td class="col-md-4">(.*?)<br>"#)
            .captures_iter(body)
            .filter_map(|caps| caps.get(1))
            .map(|cell| cell.as_str().to_string());

        collect_hosts(cells, &self.domain)
    }
}

#[async_trait]
impl SubdomainModule for DnsDumpster {
    #[instrument(name = "enumerate", level = "debug", fields(module = %self.name()), skip_all)]
    async fn enumerate(&self) -> Result<HashSet<String>> {
        let http_client = new_http_client(&self.name())?;
        let body = http_request(&self.name(), http_client.get("https://dnsdumpster.com/")).await?;

        let subdomains = self.extract(&body);
        debug!("{} collected", subdomains.len());
        Ok(subdomains)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_host_cells() {
        let body = r##"
            <tr><td class="col-md-4">ns1.example.com<br><a href="#">x</a></td></tr>
            <tr><td class="col-md-4"> mx.example.com <br></td></tr>
            <tr><td class="col-md-4">broken cell without break</td></tr>
            <tr><td class="col-md-3">skip.example.com<br></td></tr>
        "##;
        let hosts = DnsDumpster::new("example.com").extract(body);

        let mut hosts: Vec<String> = hosts.into_iter().collect();
        hosts.sort();
        assert_eq!(hosts, vec!["mx.example.com", "ns1.example.com"]);
    }
}

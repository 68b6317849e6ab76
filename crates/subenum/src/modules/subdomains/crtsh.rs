use super::{collect_hosts, SubdomainModule};
use crate::modules::{http_request, new_http_client, Module};
use crate::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;
use tracing::{debug, instrument};

// region:        --- Module info

pub struct CrtSh {
    domain: String,
}

impl CrtSh {
    pub fn new(domain: &str) -> Self {
        Self {
            domain: domain.to_string(),
        }
    }
}

impl Module for CrtSh {
    fn name(&self) -> String {
        "crtsh".to_string()
    }

    fn description(&self) -> String {
        "Use crt.sh/ to find subdomains".to_string()
    }
}

// endregion:     --- Module info

#[derive(Debug, Deserialize)]
struct CrtShEntry {
    #[serde(default)]
    name_value: String,
}

impl CrtSh {
    fn extract(&self, body: &str) -> Result<HashSet<String>> {
        let entries: Vec<CrtShEntry> =
            serde_json::from_str(body).map_err(|err| Error::SourceParseError {
                module: self.name(),
                reason: err.to_string(),
            })?;

        // one certificate may carry several names
        let candidates = entries.into_iter().flat_map(|entry| {
            entry
                .name_value
                .split('\n')
                .map(|name| name.to_string())
                .collect::<Vec<String>>()
        });

        Ok(collect_hosts(candidates, &self.domain))
    }
}

#[async_trait]
impl SubdomainModule for CrtSh {
    #[instrument(name = "enumerate", level = "debug", fields(module = %self.name()), skip_all)]
    async fn enumerate(&self) -> Result<HashSet<String>> {
        let http_client = new_http_client(&self.name())?;
        let url = format!("https://crt.sh/?q=%25.{}&output=json", self.domain);
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
    fn splits_multi_name_certificates() {
        let body = r#"[
            {"name_value": "www.example.com\nmail.example.com"},
            {"name_value": "*.example.com"},
            {"name_value": "unrelated.org"},
            {"issuer_name": "no name here"}
        ]"#;
        let hosts = CrtSh::new("example.com").extract(body).unwrap();

        assert_eq!(hosts.len(), 3);
        assert!(hosts.contains("www.example.com"));
        assert!(hosts.contains("mail.example.com"));
        assert!(hosts.contains("*.example.com"));
    }

    #[test]
    fn html_body_is_a_parse_error() {
        let res = CrtSh::new("example.com").extract("<html>busy</html>");
        assert!(matches!(res, Err(Error::SourceParseError { .. })));
    }
}

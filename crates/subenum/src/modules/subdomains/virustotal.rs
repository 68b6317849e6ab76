use super::{collect_hosts, SubdomainModule};
use crate::modules::{http_request, new_http_client, Module};
use crate::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;
use tracing::{debug, instrument, warn};

// region:        --- Module info

pub struct VirusTotal {
    domain: String,
    api_key: Option<String>,
}

impl VirusTotal {
    pub fn new(domain: &str, api_key: Option<&str>) -> Self {
        Self {
            domain: domain.to_string(),
            api_key: api_key.map(|key| key.to_string()),
        }
    }
}

impl Module for VirusTotal {
    fn name(&self) -> String {
        "virustotal".to_string()
    }
    fn description(&self) -> String {
        "Use the VirusTotal v3 API to find subdomains (api key)".to_string()
    }
}

// endregion:     --- Module info

#[derive(Debug, Deserialize)]
struct VirusTotalResponse {
    #[serde(default)]
    data: Vec<VirusTotalItem>,
}

#[derive(Debug, Deserialize)]
struct VirusTotalItem {
    #[serde(default)]
    id: Option<String>,
}

impl VirusTotal {
    fn extract(&self, body: &str) -> Result<HashSet<String>> {
        let response: VirusTotalResponse =
            serde_json::from_str(body).map_err(|err| Error::SourceParseError {
                module: self.name(),
                reason: err.to_string(),
            })?;

        let candidates = response.data.into_iter().filter_map(|item| item.id);
        Ok(collect_hosts(candidates, &self.domain))
    }
}

#[async_trait]
impl SubdomainModule for VirusTotal {
    #[instrument(name = "enumerate", level = "debug", fields(module = %self.name()), skip_all)]
    async fn enumerate(&self) -> Result<HashSet<String>> {
        let http_client = new_http_client(&self.name())?;
        let url = format!(
            "https://www.virustotal.com/api/v3/domains/{}/subdomains",
            self.domain
        );

        let mut request = http_client.get(url);
        match &self.api_key {
            Some(key) => request = request.header("x-apikey", key),
            None => warn!("No api key configured, the request will likely be refused"),
        }
        let body = http_request(&self.name(), request).await?;

        let subdomains = self.extract(&body)?;
        debug!("{} collected", subdomains.len());
        Ok(subdomains)
    }
}

use super::{collect_hosts, host_of, SubdomainModule};
use crate::modules::{http_request, new_http_client, Module};
use crate::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;
use tracing::{debug, instrument, trace};

// region:        --- Module info

pub struct WebArchive {
    domain: String,
}

impl WebArchive {
    pub fn new(domain: &str) -> Self {
        Self {
            domain: domain.to_string(),
        }
    }
}

impl Module for WebArchive {
    fn name(&self) -> String {
        "webarchive".to_string()
    }
    fn description(&self) -> String {
        "Use web.archive.org to find subdomains".to_string()
    }
}

// endregion:     --- Module info

#[derive(Debug, Deserialize)]
struct WebArchiveResponse(Vec<Vec<String>>);

impl WebArchive {
    fn extract(&self, body: &str) -> Result<HashSet<String>> {
        // an empty index answers with an empty body
        if body.trim().is_empty() {
            return Ok(HashSet::new());
        }

        let response: WebArchiveResponse =
            serde_json::from_str(body).map_err(|err| Error::SourceParseError {
                module: self.name(),
                reason: err.to_string(),
            })?;

        let hosts = response
            .0
            .into_iter()
            .flatten()
            .filter(|url| url != "original")
            .filter_map(|url| {
                let host = host_of(&url);
                if host.is_none() {
                    trace!("Parsing url: {:?}", url);
                }
                host
            });

        Ok(collect_hosts(hosts, &self.domain))
    }
}

#[async_trait]
impl SubdomainModule for WebArchive {
    #[instrument(name = "enumerate", level = "debug", fields(module = %self.name()), skip_all)]
    async fn enumerate(&self) -> Result<HashSet<String>> {
        let http_client = new_http_client(&self.name())?;
        let url = format!("https://web.archive.org/cdx/search/cdx?url={}&output=json&matchType=domain&fl=original&collapse=urlkey", self.domain);
        let body = http_request(&self.name(), http_client.get(url)).await?;

        let subdomains = self.extract(&body)?;
        debug!("{} collected", subdomains.len());
        Ok(subdomains)
    }
}

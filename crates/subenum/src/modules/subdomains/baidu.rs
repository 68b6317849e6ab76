use super::{collect_hosts, host_of, SubdomainModule};
use crate::modules::{http_request, new_http_client, Module};
use crate::Result;
use async_trait::async_trait;
use lazy_regex::regex;
use std::collections::HashSet;
use tracing::{debug, instrument};

// region:        --- Module info

pub struct Baidu {
    domain: String,
}

impl Baidu {
    pub fn new(domain: &str) -> Self {
        Self {
            domain: domain.to_string(),
        }
    }
}

impl Module for Baidu {
    fn name(&self) -> String {
        "baidu".to_string()
    }
    fn description(&self) -> String {
        "Search baidu.com for site: results".to_string()
    }
}

// endregion:     --- Module info

impl Baidu {
    fn extract(&self, body: &str) -> HashSet<String> {
        let hosts = regex!(r#"<a[^>]*?class="c-showurl"[^>]*>(.*?)</a>"#)
            .captures_iter(body)
            .filter_map(|caps| caps.get(1))
            .map(|link| {
                regex!(r#"<.*?>|>|<|&nbsp;"#)
                    .replace_all(link.as_str(), "")
                    .into_owned()
            })
            .filter_map(|link| host_of(&link));

        collect_hosts(hosts, &self.domain)
    }
}

#[async_trait]
impl SubdomainModule for Baidu {
    #[instrument(name = "enumerate", level = "debug", fields(module = %self.name()), skip_all)]
    async fn enumerate(&self) -> Result<HashSet<String>> {
        let http_client = new_http_client(&self.name())?;
        let query = format!("site:{} -www.{}", self.domain, self.domain);
        let request = http_client
            .get("https://www.baidu.com/s")
            .query(&[("wd", query.as_str()), ("pn", "0")]);
        let body = http_request(&self.name(), request).await?;

        let subdomains = self.extract(&body);
        debug!("{} collected", subdomains.len());
        Ok(subdomains)
    }
}

pub mod subdomains;

use self::subdomains::baidu::Baidu;
use self::subdomains::crtsh::CrtSh;
use self::subdomains::dnsdumpster::DnsDumpster;
use self::subdomains::hackertarget::HackerTarget;
use self::subdomains::netcraft::Netcraft;
use self::subdomains::virustotal::VirusTotal;
use self::subdomains::web_archive::WebArchive;
use self::subdomains::SubdomainModule;
use crate::{Error, Result};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, RequestBuilder};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

// region:        --- Constants

const HTTP_REQUEST_TIMEOUT_MS: u64 = 20000;
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;
const HTTP_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0";

// domain handed to constructors when the registry checks an entry
const CHECK_DOMAIN: &str = "example.com";

// endregion:     --- Constants

pub trait Module {
    fn name(&self) -> String;
    fn description(&self) -> String;
}

// region:        --- Registry

pub type ModuleConstructor =
    Arc<dyn Fn(&str, Option<&str>) -> Box<dyn SubdomainModule> + Send + Sync>;

/// Name-keyed table of the source constructors available to a run.
#[derive(Clone)]
pub struct Registry {
    constructors: BTreeMap<String, ModuleConstructor>,
}

impl Registry {
    /// Registers every entry whose constructor yields a module reporting the
    /// same name. Broken entries are skipped; an empty table is an error.
    pub fn load(entries: Vec<(String, ModuleConstructor)>) -> Result<Self> {
        let mut constructors = BTreeMap::new();

        for (name, constructor) in entries {
            if name.trim().is_empty() {
                warn!("Skipping source registered without a name");
                continue;
            }
            if constructors.contains_key(&name) {
                warn!("Skipping duplicate source: {}", name);
                continue;
            }
            let module_name = constructor(CHECK_DOMAIN, None).name();
            if module_name != name {
                warn!(
                    "Skipping source {}: constructor builds {:?} instead",
                    name, module_name
                );
                continue;
            }
            debug!("Registered source: {}", name);
            constructors.insert(name, constructor);
        }

        if constructors.is_empty() {
            return Err(Error::RegistryLoad("no usable source registered".into()));
        }

        info!("{} sources registered", constructors.len());
        Ok(Self { constructors })
    }

    pub fn builtin() -> Result<Self> {
        Self::load(builtin_modules())
    }

    pub fn list(&self) -> &BTreeMap<String, ModuleConstructor> {
        &self.constructors
    }

    pub fn names(&self) -> Vec<String> {
        self.constructors.keys().cloned().collect()
    }

    pub fn build(
        &self,
        name: &str,
        domain: &str,
        api_key: Option<&str>,
    ) -> Option<Box<dyn SubdomainModule>> {
        self.constructors
            .get(name)
            .map(|constructor| constructor(domain, api_key))
    }
}

fn entry(
    name: &str,
    constructor: fn(&str, Option<&str>) -> Box<dyn SubdomainModule>,
) -> (String, ModuleConstructor) {
    (name.to_string(), Arc::new(constructor))
}

pub fn builtin_modules() -> Vec<(String, ModuleConstructor)> {
    vec![
        entry("baidu", |domain, _| Box::new(Baidu::new(domain))),
        entry("crtsh", |domain, _| Box::new(CrtSh::new(domain))),
        entry("dnsdumpster", |domain, _| Box::new(DnsDumpster::new(domain))),
        entry("hackertarget", |domain, _| Box::new(HackerTarget::new(domain))),
        entry("netcraft", |domain, _| Box::new(Netcraft::new(domain))),
        entry("virustotal", |domain, key| {
            Box::new(VirusTotal::new(domain, key))
        }),
        entry("webarchive", |domain, _| Box::new(WebArchive::new(domain))),
    ]
}

pub fn display_all(registry: &Registry) {
    println!("\nSubdomains modules");
    for (name, constructor) in registry.list() {
        let module = constructor(CHECK_DOMAIN, None);
        println!("- {:15}{}", name, module.description());
    }
}

// endregion:     --- Registry

// region:        --- HTTP requests

/// Builds the per-run HTTP session of a module. The client is owned by the
/// `enumerate` call that created it and closed when that call returns.
pub fn new_http_client(module: &str) -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(HTTP_USER_AGENT));

    Client::builder()
        .timeout(Duration::from_millis(HTTP_REQUEST_TIMEOUT_MS))
        .default_headers(headers)
        .build()
        .map_err(|err| Error::from_source(module, err))
}

pub async fn http_request(module: &str, request: RequestBuilder) -> Result<String> {
    http_request_capped(module, request, MAX_BODY_BYTES).await
}

/// Sends the request and reads at most `max_bytes` of body.
#[instrument(name = "HTTP_request", level = "debug", skip_all, fields(module = module))]
async fn http_request_capped(
    module: &str,
    request: RequestBuilder,
    max_bytes: usize,
) -> Result<String> {
    debug!("Sending request");
    let mut res = request
        .send()
        .await
        .map_err(|err| Error::from_source(module, err))?;
    debug!("Receive with status: {}", res.status());

    if !res.status().is_success() {
        return Err(Error::SourceUnavailable {
            module: module.to_string(),
            reason: format!("HTTP status {}", res.status()),
        });
    }

    let too_large = || Error::SourceUnavailable {
        module: module.to_string(),
        reason: format!("response body larger than {} bytes", max_bytes),
    };
    if res
        .content_length()
        .is_some_and(|length| length > max_bytes as u64)
    {
        return Err(too_large());
    }

    let mut bytes: Vec<u8> = Vec::new();
    while let Some(chunk) = res
        .chunk()
        .await
        .map_err(|err| Error::from_source(module, err))?
    {
        if bytes.len() + chunk.len() > max_bytes {
            return Err(too_large());
        }
        bytes.extend_from_slice(&chunk);
    }

    // invalid UTF-8 is replaced rather than rejected
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

// endregion:     --- HTTP requests

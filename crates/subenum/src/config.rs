use crate::bruteforce::DEFAULT_BRUTEFORCE_CONCURRENCY;
use crate::classify::DEFAULT_CLASSIFY_CONCURRENCY;
use crate::dns::DEFAULT_RESOLVERS;
use crate::enumerate::DEFAULT_SOURCE_TIMEOUT_MS;
use crate::ports::{DEFAULT_HOST_CONCURRENCY, DEFAULT_PORT_CONCURRENCY, SOCKET_CON_TIMEOUT_MS};
use crate::{Error, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";
const DEFAULT_WORDLIST_PATH: &str = "wordlists/subdomains.txt";
const RESOLVE_DNS_TIMEOUT_MS: u64 = 4000;

// region:        --- Config file

/// Content of `config.yaml`. Every key is optional but the file must exist.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub engines: BTreeMap<String, bool>,
    pub api_keys: HashMap<String, String>,
    pub ports: Option<Vec<u16>>,
    pub threads: usize,
    pub resolvers: Vec<String>,
    pub wordlist: PathBuf,
    pub timeouts: Timeouts,
    pub concurrency: Concurrency,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Timeouts {
    pub source_ms: u64,
    pub dns_ms: u64,
    pub port_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Concurrency {
    pub hosts: usize,
    pub ports: usize,
    pub classify: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            engines: BTreeMap::new(),
            api_keys: HashMap::new(),
            ports: None,
            threads: DEFAULT_BRUTEFORCE_CONCURRENCY,
            resolvers: DEFAULT_RESOLVERS.iter().map(|ip| ip.to_string()).collect(),
            wordlist: PathBuf::from(DEFAULT_WORDLIST_PATH),
            timeouts: Timeouts::default(),
            concurrency: Concurrency::default(),
        }
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            source_ms: DEFAULT_SOURCE_TIMEOUT_MS,
            dns_ms: RESOLVE_DNS_TIMEOUT_MS,
            port_ms: SOCKET_CON_TIMEOUT_MS,
        }
    }
}

impl Default for Concurrency {
    fn default() -> Self {
        Self {
            hosts: DEFAULT_HOST_CONCURRENCY,
            ports: DEFAULT_PORT_CONCURRENCY,
            classify: DEFAULT_CLASSIFY_CONCURRENCY,
        }
    }
}

impl Config {
    /// A missing file is an error of its own: no defaults are substituted.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::ConfigMissing(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path).map_err(|err| Error::ConfigLoad {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;
        let config = Self::parse(&content).map_err(|err| match err {
            Error::ConfigLoad { reason, .. } => Error::ConfigLoad {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        })?;

        info!("Configuration loaded from {:?}", path);
        debug!("{:?}", config);
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = if content.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(content).map_err(|err| Error::ConfigLoad {
                path: PathBuf::new(),
                reason: err.to_string(),
            })?
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let invalid = |reason: String| Error::ConfigLoad {
            path: PathBuf::new(),
            reason,
        };

        if self.threads == 0 {
            return Err(invalid("threads must be greater than 0".into()));
        }
        if self.concurrency.hosts == 0 || self.concurrency.ports == 0 || self.concurrency.classify == 0 {
            return Err(invalid("concurrency values must be greater than 0".into()));
        }
        if let Some(ports) = &self.ports {
            if ports.contains(&0) {
                return Err(Error::InvalidPort("0".into()));
            }
        }
        self.resolver_ips()?;
        Ok(())
    }

    pub fn resolver_ips(&self) -> Result<Vec<IpAddr>> {
        self.resolvers
            .iter()
            .map(|ip| {
                ip.parse::<IpAddr>().map_err(|_| Error::ConfigLoad {
                    path: PathBuf::new(),
                    reason: format!("invalid resolver address {:?}", ip),
                })
            })
            .collect()
    }

    /// Engines switched on in the file, in name order.
    pub fn enabled_engines(&self) -> Vec<String> {
        self.engines
            .iter()
            .filter(|(_, enabled)| **enabled)
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn source_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.source_ms)
    }

    pub fn dns_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.dns_ms)
    }

    pub fn port_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.port_ms)
    }
}

// endregion:     --- Config file

// region:        --- CLI parsing helpers

/// Parses `80,443, 8080` into ports, rejecting anything outside 1..=65535.
pub fn parse_ports(list: &str) -> Result<Vec<u16>> {
    let mut ports = Vec::new();
    for item in list.split(',').map(str::trim).filter(|item| !item.is_empty()) {
        match item.parse::<u16>() {
            Ok(port) if port > 0 => {
                if !ports.contains(&port) {
                    ports.push(port);
                }
            }
            _ => return Err(Error::InvalidPort(item.to_string())),
        }
    }
    Ok(ports)
}

pub fn parse_engines(list: &str) -> Vec<String> {
    list.split(',')
        .map(|name| name.trim().to_lowercase())
        .filter(|name| !name.is_empty())
        .collect()
}

// endregion:     --- CLI parsing helpers

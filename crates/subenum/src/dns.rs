use crate::Error;
use async_trait::async_trait;
use hickory_resolver::config::{NameServerConfigGroup, ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;
use std::net::IpAddr;
use std::{sync::Arc, time::Duration};
use tracing::{debug, trace};

pub const DEFAULT_RESOLVERS: &[&str] = &["8.8.8.8", "8.8.4.4"];
const DNS_PORT: u16 = 53;

/// Anything able to tell whether a hostname has an A record.
#[async_trait]
pub trait Resolve: Send + Sync {
    async fn resolves(&self, host: &str) -> bool;
}

#[derive(Clone)]
pub struct DnsResolver {
    inner: Arc<TokioAsyncResolver>,
}

impl DnsResolver {
    /// Resolver querying only the given nameservers, or the system
    /// configuration when the list is empty.
    pub fn new(nameservers: &[IpAddr], timeout: Duration) -> Self {
        let mut opts = ResolverOpts::default();
        opts.timeout = timeout;
        opts.attempts = 1;
        debug!("DNS resolver options: {:?}", opts);

        let config = if nameservers.is_empty() {
            ResolverConfig::default()
        } else {
            let group = NameServerConfigGroup::from_ips_clear(nameservers, DNS_PORT, true);
            ResolverConfig::from_parts(None, vec![], group)
        };
        let dns_resolver = TokioAsyncResolver::tokio(config, opts);

        debug!("DNS resolver created on {:?}", nameservers);
        Self {
            inner: Arc::new(dns_resolver),
        }
    }

    pub async fn lookup_a(&self, host: &str) -> Result<Vec<IpAddr>, Error> {
        match self.inner.ipv4_lookup(host).await {
            Ok(lookup) => Ok(lookup.iter().map(|a| IpAddr::V4(a.0)).collect()),
            Err(err) => Err(Error::ResolutionFailure {
                host: host.to_string(),
                reason: err.to_string(),
            }),
        }
    }
}

#[async_trait]
impl Resolve for DnsResolver {
    async fn resolves(&self, host: &str) -> bool {
        match self.lookup_a(host).await {
            Ok(ips) => {
                trace!("{:12} - {} {:?}", "RESOLVED", host, ips);
                !ips.is_empty()
            }
            Err(err) => {
                // NXDOMAIN, no answer and timeouts all count as absent
                trace!("{:12} - {:?}", "NOT RESOLVED", err);
                false
            }
        }
    }
}

#[cfg(test)]
pub mod fake {
    use super::Resolve;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// Resolves a fixed set of names and remembers every query.
    #[derive(Default)]
    pub struct FakeResolver {
        known: HashSet<String>,
        pub queried: Mutex<Vec<String>>,
    }

    impl FakeResolver {
        pub fn new(known: &[&str]) -> Self {
            Self {
                known: known.iter().map(|h| h.to_string()).collect(),
                queried: Mutex::new(Vec::new()),
            }
        }

        pub fn queried(&self) -> Vec<String> {
            self.queried.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Resolve for FakeResolver {
        async fn resolves(&self, host: &str) -> bool {
            self.queried.lock().unwrap().push(host.to_string());
            self.known.contains(host)
        }
    }
}

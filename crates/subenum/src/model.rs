use crate::Error;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

// region:        --- Hostnames

pub const WILDCARD_MARKER: &str = "*.";

/// Lower-cased, trimmed, without the trailing root dot.
pub fn normalize(host: &str) -> String {
    host.trim().trim_end_matches('.').to_lowercase()
}

pub fn is_hostname(host: &str) -> bool {
    !host.is_empty() && host.contains('.') && !host.contains('@')
}

pub fn is_wildcard(host: &str) -> bool {
    host.starts_with(WILDCARD_MARKER)
}

/// True when `host` is `domain` itself or one of its subdomains.
pub fn belongs_to(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

// endregion:     --- Hostnames

// region:        --- Models

/// Outcome of one enumeration stage: the merged hostnames plus, for
/// diagnostics, every source that did not succeed.
#[derive(Debug, Default)]
pub struct EnumerationReport {
    pub subdomains: BTreeSet<String>,
    pub failures: Vec<(String, Error)>,
}

pub type PortScanResult = BTreeMap<String, Vec<u16>>;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub valid: Vec<String>,
    pub invalid: Vec<String>,
    pub wildcard: Vec<String>,
}

impl Classification {
    pub fn total(&self) -> usize {
        self.valid.len() + self.invalid.len() + self.wildcard.len()
    }
}

#[derive(Debug, Serialize)]
pub struct ScanReport {
    pub domain: String,
    pub generated_at: String,
    pub classification: Classification,
    pub open_ports: PortScanResult,
    pub failed_sources: Vec<SourceFailure>,
}

#[derive(Debug, Serialize)]
pub struct SourceFailure {
    pub module: String,
    pub reason: String,
}

// endregion:     --- Models

/// Set union used at every stage boundary.
pub fn merge(a: &BTreeSet<String>, b: &BTreeSet<String>) -> BTreeSet<String> {
    a.union(b).cloned().collect()
}

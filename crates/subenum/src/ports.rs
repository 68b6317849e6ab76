use crate::model::{is_wildcard, PortScanResult};
use crate::{Error, Result};
use futures::{stream, StreamExt};
use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::{net::TcpStream, sync::mpsc};
use tracing::{debug, info, instrument, trace};

pub const DEFAULT_HOST_CONCURRENCY: usize = 10;
pub const DEFAULT_PORT_CONCURRENCY: usize = 10;
pub const SOCKET_CON_TIMEOUT_MS: u64 = 1000;

pub struct PortScanner {
    ports: Vec<u16>,
    host_concurrency: usize,
    port_concurrency: usize,
    timeout: Duration,
    verbose: bool,
}

// region:        --- Constructors

impl PortScanner {
    pub fn new(ports: Vec<u16>, verbose: bool) -> Self {
        Self {
            ports,
            host_concurrency: DEFAULT_HOST_CONCURRENCY,
            port_concurrency: DEFAULT_PORT_CONCURRENCY,
            timeout: Duration::from_millis(SOCKET_CON_TIMEOUT_MS),
            verbose,
        }
    }

    pub fn with_concurrency(mut self, hosts: usize, ports: usize) -> Self {
        self.host_concurrency = hosts.max(1);
        self.port_concurrency = ports.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

// endregion:     --- Constructors

impl PortScanner {
    /// Scans every host, at most `host_concurrency` at a time. Hosts
    /// without any open port are left out of the result.
    #[instrument(name = "ports", level = "info", skip_all)]
    pub async fn scan(&self, hosts: &BTreeSet<String>) -> PortScanResult {
        info!(
            "Scanning {} ports on {} hosts",
            self.ports.len(),
            hosts.len()
        );

        let result: PortScanResult = stream::iter(hosts.iter())
            .filter(|host| {
                let skip = is_wildcard(host);
                async move { !skip }
            })
            .map(|host| async move {
                let open_ports = self.scan_host(host).await;
                (host.clone(), open_ports)
            })
            .buffer_unordered(self.host_concurrency)
            .filter(|(_, open_ports)| {
                let keep = !open_ports.is_empty();
                async move { keep }
            })
            .collect()
            .await;

        info!("{} hosts with open ports", result.len());
        result
    }

    async fn scan_host(&self, host: &str) -> Vec<u16> {
        let socket_address = match resolve_host(host).await {
            Ok(address) => address,
            Err(err) => {
                debug!("Skipping port scan: {:?}", err);
                return Vec::new();
            }
        };

        // one channel feeds port numbers, the other collects open ones; the
        // output side is only drained once every port is tried, so it must
        // hold every port
        let (input_tx, input_rx) = mpsc::channel(self.port_concurrency);
        let (output_tx, output_rx) = mpsc::channel(self.ports.len().max(1));

        let ports = self.ports.clone();
        tokio::spawn(async move {
            for port in ports {
                let _ = input_tx.send(port).await;
            }
        });

        let timeout = self.timeout;
        tokio_stream::wrappers::ReceiverStream::new(input_rx)
            .for_each_concurrent(self.port_concurrency, |port| {
                let output_tx = output_tx.clone();
                async move {
                    match scan_port(host, socket_address, port, timeout).await {
                        Ok(port) => {
                            let _ = output_tx.send(port).await;
                        }
                        Err(err) => trace!("{:12} - {:?}", "CLOSED", err),
                    }
                }
            })
            .await;
        drop(output_tx);

        let mut open_ports: Vec<u16> = tokio_stream::wrappers::ReceiverStream::new(output_rx)
            .collect()
            .await;
        open_ports.sort_unstable();
        open_ports.dedup();

        if !open_ports.is_empty() {
            if self.verbose {
                info!("{} - Open ports: {:?}", host, open_ports);
            } else {
                debug!("{} - Open ports: {:?}", host, open_ports);
            }
        }
        open_ports
    }
}

async fn resolve_host(host: &str) -> Result<SocketAddr> {
    let mut addresses = tokio::net::lookup_host((host, 0))
        .await
        .map_err(|err| Error::ResolutionFailure {
            host: host.to_string(),
            reason: err.to_string(),
        })?;

    addresses.next().ok_or_else(|| Error::ResolutionFailure {
        host: host.to_string(),
        reason: "no address".to_string(),
    })
}

/// Refused, timed out and failed connections all count as closed.
async fn scan_port(
    host: &str,
    mut socket_address: SocketAddr,
    port: u16,
    timeout: Duration,
) -> Result<u16> {
    socket_address.set_port(port);

    match tokio::time::timeout(timeout, TcpStream::connect(&socket_address)).await {
        Ok(Ok(_stream)) => Ok(port),
        _ => Err(Error::PortProbeFailure {
            host: host.to_string(),
            port,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    async fn closed_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    }

    fn hosts(hosts: &[&str]) -> BTreeSet<String> {
        hosts.iter().map(|h| h.to_string()).collect()
    }

    #[tokio::test]
    async fn reports_only_open_ports() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let open = listener.local_addr().unwrap().port();
        let closed_a = closed_port().await;
        let closed_b = closed_port().await;

        let scanner = PortScanner::new(vec![closed_a, open, closed_b], false)
            .with_timeout(Duration::from_millis(300));
        let result = scanner.scan(&hosts(&["127.0.0.1"])).await;

        assert_eq!(result.len(), 1);
        assert_eq!(result.get("127.0.0.1"), Some(&vec![open]));
    }

    #[tokio::test]
    async fn hosts_without_open_ports_are_absent() {
        let closed = closed_port().await;

        let scanner =
            PortScanner::new(vec![closed], true).with_timeout(Duration::from_millis(300));
        let result = scanner.scan(&hosts(&["127.0.0.1", "*.example.com"])).await;

        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn open_ports_come_back_sorted() {
        let first = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let second = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut expected = vec![
            first.local_addr().unwrap().port(),
            second.local_addr().unwrap().port(),
        ];
        expected.sort_unstable();

        let scanner = PortScanner::new(vec![expected[1], expected[0]], false)
            .with_concurrency(1, 1)
            .with_timeout(Duration::from_millis(300));
        let result = scanner.scan(&hosts(&["127.0.0.1"])).await;

        assert_eq!(result.get("127.0.0.1"), Some(&expected));
    }

    #[tokio::test]
    async fn more_open_ports_than_workers_completes() {
        let mut listeners = Vec::new();
        for _ in 0..12 {
            listeners.push(TcpListener::bind("127.0.0.1:0").await.unwrap());
        }
        let mut expected: Vec<u16> = listeners
            .iter()
            .map(|listener| listener.local_addr().unwrap().port())
            .collect();
        expected.sort_unstable();

        let scanner = PortScanner::new(expected.clone(), false)
            .with_concurrency(1, DEFAULT_PORT_CONCURRENCY)
            .with_timeout(Duration::from_millis(300));
        let result = tokio::time::timeout(
            Duration::from_secs(10),
            scanner.scan(&hosts(&["127.0.0.1"])),
        )
        .await
        .expect("port scan did not finish");

        assert_eq!(result.get("127.0.0.1"), Some(&expected));
    }
}

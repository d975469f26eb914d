use std::net::{Ipv4Addr, SocketAddrV4};
use std::time::Duration;

use futures::future::join_all;
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Where to look for neighbours, relative to the node's own host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryRange {
    /// Offsets added to the last octet of the host address, inclusive
    pub ip_start: u8,
    pub ip_end: u8,

    /// Ports to probe, inclusive
    pub port_start: u16,
    pub port_end: u16,
}

/// Every `ip:port` in the range except the node's own address
pub fn candidate_addresses(host: Ipv4Addr, port: u16, range: &DiscoveryRange) -> Vec<SocketAddrV4> {
    let own = SocketAddrV4::new(host, port);
    let [a, b, c, last] = host.octets();
    let mut candidates = Vec::new();

    for guess_port in range.port_start..=range.port_end {
        for offset in range.ip_start..=range.ip_end {
            let Some(guess_last) = last.checked_add(offset) else {
                continue;
            };
            let candidate = SocketAddrV4::new(Ipv4Addr::new(a, b, c, guess_last), guess_port);
            if candidate != own {
                candidates.push(candidate);
            }
        }
    }

    candidates
}

async fn is_listening(address: SocketAddrV4, probe_timeout: Duration) -> bool {
    matches!(timeout(probe_timeout, TcpStream::connect(address)).await, Ok(Ok(_)))
}

/// Probes every candidate concurrently and returns those accepting TCP connections
pub async fn find_neighbours(
    host: Ipv4Addr,
    port: u16,
    range: &DiscoveryRange,
    probe_timeout: Duration,
) -> Vec<String> {
    let candidates = candidate_addresses(host, port, range);
    let probes = candidates.iter().map(|address| is_listening(*address, probe_timeout));
    let reachable = join_all(probes).await;

    candidates
        .into_iter()
        .zip(reachable)
        .filter(|(_, reachable)| *reachable)
        .map(|(address, _)| address.to_string())
        .collect()
}

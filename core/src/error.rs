use std::io;
use std::net::Ipv4Addr;

use pingx_common::network::range::NetworkRange;
use pingx_protocols::icmp::IcmpError;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Raw ICMP sockets usually need root or `CAP_NET_RAW`.
    #[error("failed to open ICMP socket: {0}")]
    Open(#[source] io::Error),
    #[error("failed to send echo request to {target}: {source}")]
    Write {
        target: Ipv4Addr,
        #[source]
        source: io::Error,
    },
    #[error("failed to read from ICMP socket: {0}")]
    Read(#[source] io::Error),
    #[error("transport already closed")]
    Closed,
}

/// Failures that end a scan before any probe is sent.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("cannot start scan: {0}")]
    TransportOpen(#[source] TransportError),
    #[error("no targets to probe in {0}")]
    NoTargets(NetworkRange),
    #[error("cannot build echo request: {0}")]
    Probe(#[from] IcmpError),
    #[error("scan task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

//! # ICMP host discovery
//!
//! Sweeps an IPv4 [`NetworkRange`](pingx_common::network::range::NetworkRange)
//! with echo requests and streams back every address that answered.
//!
//! * [`network`] owns the socket side: the [`ProbeTransport`](network::transport::ProbeTransport)
//!   abstraction and its raw-socket implementation.
//! * [`scanner`] drives a scan: enumeration, probing, reply correlation and
//!   retry-driven termination.

pub mod error;
pub mod network;
pub mod scanner;

pub use error::{ScanError, TransportError};
pub use scanner::signal::StopSignal;
pub use scanner::{ScanPhase, ScanStream, ScanSummary, perform_discovery, scan, scan_with};

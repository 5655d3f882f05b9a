pub mod discover;
pub mod networks;

use clap::{Args, Parser, Subcommand};
use pingx_common::config::ScanConfig;
use pingx_common::network::range::NetworkRange;

#[derive(Parser)]
#[command(name = "pingx")]
#[command(about = "Find live hosts with an ICMP echo sweep.")]
pub struct CommandLine {
    /// Print debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the IPv4 networks of local interfaces
    #[command(alias = "n")]
    Networks,
    /// Discover live hosts in a network
    #[command(alias = "d")]
    Discover(DiscoverArgs),
}

#[derive(Args, Debug)]
pub struct DiscoverArgs {
    /// Network to sweep, e.g. 192.168.1.0/24 or 192.168.1.0/255.255.255.0.
    /// Prompts for one of the local networks when omitted.
    pub target: Option<NetworkRange>,
    /// Abort the sweep after this many seconds
    #[arg(short, long)]
    pub timeout: Option<u64>,
    /// Do not probe the network and broadcast address
    #[arg(long)]
    pub skip_edges: bool,
    /// Probes sent to a silent host before giving up on it
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u8).range(1..))]
    pub attempts: u8,
}

impl DiscoverArgs {
    pub fn to_config(&self) -> ScanConfig {
        ScanConfig {
            max_attempts: self.attempts,
            skip_network_and_broadcast: self.skip_edges,
            ..ScanConfig::default()
        }
    }
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

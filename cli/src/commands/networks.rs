use pingx_common::network::interface::{self, LocalNetwork};
use pingx_common::network::range::NetworkRange;
use tracing::warn;

use crate::terminal::print;

/// Prints the local IPv4 networks and returns them in the printed order.
pub fn networks() -> Vec<LocalNetwork> {
    let nets: Vec<LocalNetwork> = interface::local_ipv4_networks();
    if nets.is_empty() {
        warn!("No interface with an IPv4 network is up");
    }
    for (idx, net) in nets.iter().enumerate() {
        print::list_entry(idx + 1, &net.interface, &describe(&net.range));
    }
    nets
}

fn describe(range: &NetworkRange) -> String {
    format!(
        "{}/{} ({} addresses)",
        range.start(),
        range.prefix_len(),
        range.address_count()
    )
}

use pnet::datalink::{self, NetworkInterface};
use pnet::ipnetwork::IpNetwork;
use tracing::trace;

use crate::network::range::NetworkRange;

/// An IPv4 network configured on a local interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalNetwork {
    pub interface: String,
    pub range: NetworkRange,
}

/// Lists the IPv4 networks of every interface that is up and not a loopback.
pub fn local_ipv4_networks() -> Vec<LocalNetwork> {
    collect_ipv4_networks(&datalink::interfaces())
}

fn collect_ipv4_networks(interfaces: &[NetworkInterface]) -> Vec<LocalNetwork> {
    interfaces
        .iter()
        .filter(|intf| is_viable(intf))
        .flat_map(|intf| {
            intf.ips.iter().filter_map(move |net| match net {
                IpNetwork::V4(v4) if !v4.ip().is_loopback() => Some(LocalNetwork {
                    interface: intf.name.clone(),
                    range: NetworkRange::from(*v4),
                }),
                _ => None,
            })
        })
        .collect()
}

fn is_viable(interface: &NetworkInterface) -> bool {
    if !interface.is_up() || interface.is_loopback() || interface.name.starts_with("lo") {
        trace!("Skipping interface {}", interface.name);
        return false;
    }
    true
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;
    use pnet::ipnetwork::{Ipv4Network, Ipv6Network};
    use std::net::{Ipv4Addr, Ipv6Addr};

    const IFF_UP: u32 = 1;
    const IFF_LOOPBACK: u32 = 1 << 3;

    fn ni(name: &str, ips: &[IpNetwork], flags: u32) -> NetworkInterface {
        NetworkInterface {
            name: name.into(),
            description: "".into(),
            index: 0,
            mac: None,
            ips: ips.to_vec(),
            flags,
        }
    }

    fn v4(a: u8, b: u8, c: u8, d: u8, p: u8) -> IpNetwork {
        IpNetwork::V4(Ipv4Network::new(Ipv4Addr::new(a, b, c, d), p).unwrap())
    }

    fn v6(s: &str, p: u8) -> IpNetwork {
        IpNetwork::V6(Ipv6Network::new(s.parse::<Ipv6Addr>().unwrap(), p).unwrap())
    }

    #[test]
    fn keeps_ipv4_networks_of_up_interfaces() {
        let interfaces = vec![
            ni("enp9s0", &[v4(192, 168, 1, 20, 24), v6("fe80::1", 64)], IFF_UP),
            ni("wlan0", &[v4(10, 0, 0, 5, 16)], IFF_UP),
        ];

        let nets = collect_ipv4_networks(&interfaces);
        assert_eq!(nets.len(), 2);
        assert_eq!(nets[0].interface, "enp9s0");
        assert_eq!(nets[0].range.start(), Ipv4Addr::new(192, 168, 1, 0));
        assert_eq!(nets[0].range.prefix_len(), 24);
        assert_eq!(nets[1].range.base, Ipv4Addr::new(10, 0, 0, 5));
    }

    #[test]
    fn skips_down_loopback_and_v6_only() {
        let interfaces = vec![
            ni("lo", &[v4(127, 0, 0, 1, 8)], IFF_UP | IFF_LOOPBACK),
            ni("lo1", &[v4(10, 9, 9, 9, 24)], IFF_UP),
            ni("eth1", &[v4(192, 168, 2, 2, 24)], 0),
            ni("tun0", &[v6("2001:db8::1", 64)], IFF_UP),
        ];

        assert!(collect_ipv4_networks(&interfaces).is_empty());
    }
}

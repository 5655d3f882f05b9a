//! # Network Range Model
//!
//! An IPv4 address plus subnet mask, and the enumeration of every host
//! address it covers.
//!
//! The range is inclusive: the network address (host bits zeroed) and the
//! broadcast address (host bits set) are part of it.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use pnet::ipnetwork::Ipv4Network;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RangeError {
    #[error("invalid IPv4 address '{0}'")]
    InvalidAddress(String),
    #[error("invalid prefix length '{0}', expected 0-32")]
    InvalidPrefix(String),
    #[error("subnet mask {0} is not a contiguous prefix")]
    NonContiguousMask(Ipv4Addr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NetworkRange {
    pub base: Ipv4Addr,
    pub mask: Ipv4Addr,
}

impl NetworkRange {
    /// Creates a range without validating `mask`.
    ///
    /// A mask that is not a contiguous prefix still enumerates the integer
    /// interval between `base & mask` and `base | !mask`.
    pub fn new(base: Ipv4Addr, mask: Ipv4Addr) -> Self {
        Self { base, mask }
    }

    pub fn from_prefix(base: Ipv4Addr, prefix: u8) -> Result<Self, RangeError> {
        let network = Ipv4Network::new(base, prefix)
            .map_err(|_| RangeError::InvalidPrefix(prefix.to_string()))?;
        Ok(Self::new(base, network.mask()))
    }

    /// The masked start of the range, host bits zeroed.
    pub fn start(&self) -> Ipv4Addr {
        Ipv4Addr::from(u32::from(self.base) & u32::from(self.mask))
    }

    /// The masked end of the range, host bits set.
    pub fn end(&self) -> Ipv4Addr {
        Ipv4Addr::from(u32::from(self.base) | !u32::from(self.mask))
    }

    /// Number of addresses in the range. A /0 holds 2^32 of them, hence `u64`.
    pub fn address_count(&self) -> u64 {
        u64::from(u32::from(self.end())) - u64::from(u32::from(self.start())) + 1
    }

    pub fn prefix_len(&self) -> u32 {
        u32::from(self.mask).leading_ones()
    }

    /// Every address from [`start`](Self::start) to [`end`](Self::end), ascending.
    pub fn hosts(&self) -> impl Iterator<Item = Ipv4Addr> + Clone + use<> {
        let start: u32 = self.start().into();
        let end: u32 = self.end().into();
        (start..=end).map(Ipv4Addr::from)
    }
}

impl From<Ipv4Network> for NetworkRange {
    fn from(network: Ipv4Network) -> Self {
        Self::new(network.ip(), network.mask())
    }
}

impl fmt::Display for NetworkRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.mask)
    }
}

impl FromStr for NetworkRange {
    type Err = RangeError;

    /// Parses `192.168.1.0/24`, `192.168.1.0/255.255.255.0` or a bare address,
    /// which is taken as a /32.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let Some((ip_str, mask_str)) = s.split_once('/') else {
            let base = parse_addr(s)?;
            return Ok(Self::new(base, Ipv4Addr::BROADCAST));
        };

        let base = parse_addr(ip_str)?;

        if mask_str.contains('.') {
            let mask = parse_addr(mask_str)?;
            ensure_contiguous(mask)?;
            return Ok(Self::new(base, mask));
        }

        let prefix = mask_str
            .parse::<u8>()
            .map_err(|_| RangeError::InvalidPrefix(mask_str.to_string()))?;
        Self::from_prefix(base, prefix)
    }
}

fn parse_addr(s: &str) -> Result<Ipv4Addr, RangeError> {
    s.parse::<Ipv4Addr>()
        .map_err(|_| RangeError::InvalidAddress(s.to_string()))
}

fn ensure_contiguous(mask: Ipv4Addr) -> Result<(), RangeError> {
    let bits: u32 = mask.into();
    if bits.leading_ones() + bits.trailing_zeros() == 32 {
        Ok(())
    } else {
        Err(RangeError::NonContiguousMask(mask))
    }
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

    fn range(s: &str) -> NetworkRange {
        s.parse().unwrap()
    }

    #[test]
    fn slash_30_yields_four_hosts() {
        let net = NetworkRange::new(
            Ipv4Addr::new(192, 168, 1, 0),
            Ipv4Addr::new(255, 255, 255, 252),
        );
        let hosts: Vec<Ipv4Addr> = net.hosts().collect();
        assert_eq!(
            hosts,
            vec![
                Ipv4Addr::new(192, 168, 1, 0),
                Ipv4Addr::new(192, 168, 1, 1),
                Ipv4Addr::new(192, 168, 1, 2),
                Ipv4Addr::new(192, 168, 1, 3),
            ]
        );
    }

    #[test]
    fn host_bits_of_base_are_ignored() {
        let net = range("10.1.2.77/24");
        assert_eq!(net.start(), Ipv4Addr::new(10, 1, 2, 0));
        assert_eq!(net.end(), Ipv4Addr::new(10, 1, 2, 255));
        assert_eq!(net.hosts().next(), Some(Ipv4Addr::new(10, 1, 2, 0)));
    }

    #[test]
    fn enumeration_is_ascending_unique_and_bounded() {
        for prefix in [22u8, 24, 27, 30, 31, 32] {
            let net = NetworkRange::from_prefix(Ipv4Addr::new(172, 16, 5, 130), prefix).unwrap();
            let start: u32 = net.start().into();
            let end: u32 = net.end().into();
            let hosts: Vec<u32> = net.hosts().map(u32::from).collect();

            assert_eq!(hosts.len() as u64, net.address_count(), "/{prefix}");
            assert_eq!(hosts.len() as u64, u64::from(end - start) + 1, "/{prefix}");
            assert!(hosts.windows(2).all(|w| w[0] < w[1]), "/{prefix} not ascending");
            assert!(hosts.iter().all(|h| (start..=end).contains(h)), "/{prefix} out of range");
        }
    }

    #[test]
    fn network_and_broadcast_are_included() {
        let hosts: Vec<Ipv4Addr> = range("10.0.0.0/29").hosts().collect();
        assert_eq!(hosts.first(), Some(&Ipv4Addr::new(10, 0, 0, 0)));
        assert_eq!(hosts.last(), Some(&Ipv4Addr::new(10, 0, 0, 7)));
    }

    #[test]
    fn hosts_is_restartable() {
        let net = range("10.0.0.0/28");
        let first: Vec<Ipv4Addr> = net.hosts().collect();
        let second: Vec<Ipv4Addr> = net.hosts().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn slash_zero_length_does_not_overflow() {
        let net = range("0.0.0.0/0");
        assert_eq!(net.address_count(), 1u64 << 32);
        assert_eq!(net.prefix_len(), 0);
    }

    #[test]
    fn parses_dotted_mask_and_bare_host() {
        let net = range("192.168.0.10/255.255.255.0");
        assert_eq!(net.prefix_len(), 24);
        assert_eq!(net.to_string(), "192.168.0.10/255.255.255.0");

        let single = range("8.8.8.8");
        assert_eq!(single.address_count(), 1);
        assert_eq!(single.hosts().collect::<Vec<_>>(), vec![Ipv4Addr::new(8, 8, 8, 8)]);
    }

    #[test]
    fn rejects_invalid_input() {
        assert!(matches!(
            "10.0.0.0/33".parse::<NetworkRange>(),
            Err(RangeError::InvalidPrefix(_))
        ));
        assert!(matches!(
            "10.0.0.256/24".parse::<NetworkRange>(),
            Err(RangeError::InvalidAddress(_))
        ));
        assert!(matches!(
            "10.0.0.0/255.0.255.0".parse::<NetworkRange>(),
            Err(RangeError::NonContiguousMask(_))
        ));
        assert!("lan".parse::<NetworkRange>().is_err());
    }

    #[test]
    fn malformed_mask_still_enumerates_interval() {
        let net = NetworkRange::new(Ipv4Addr::new(10, 0, 0, 0), Ipv4Addr::new(255, 255, 255, 253));
        // Host bit pattern 0b10 spans 10.0.0.0 through 10.0.0.2.
        assert_eq!(net.address_count(), 3);
        assert_eq!(net.hosts().last(), Some(Ipv4Addr::new(10, 0, 0, 2)));
    }
}

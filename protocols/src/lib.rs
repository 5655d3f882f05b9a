//! Wire formats spoken by the scanner.
//!
//! Only ICMPv4 echo is needed for host discovery; packets are assembled and
//! dissected with the `pnet` packet types.

pub mod icmp;

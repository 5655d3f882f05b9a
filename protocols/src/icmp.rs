use pnet::packet::Packet;
use pnet::packet::icmp::echo_reply::{EchoReplyPacket, MutableEchoReplyPacket};
use pnet::packet::icmp::echo_request::MutableEchoRequestPacket;
use pnet::packet::icmp::{IcmpCode, IcmpPacket, IcmpTypes, checksum};

/// Type, code, checksum, identifier and sequence number. Echo probes carry no payload.
pub const ICMP_ECHO_HDR_LEN: usize = 8;

const DEFAULT_SEQUENCE: u16 = 2333;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum IcmpError {
    #[error("truncated ICMP message ({0} bytes)")]
    Truncated(usize),
    #[error("echo reply without an echo body ({0} bytes)")]
    MissingEchoBody(usize),
    #[error("buffer too small for an echo header")]
    Buffer,
}

/// Identifier and sequence number stamped on every probe of one scanner.
///
/// Replies carrying a different identity were triggered by someone else
/// (another scanner, a `ping` running next to us) and must be ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProbeIdentity {
    pub identifier: u16,
    pub sequence: u16,
}

impl ProbeIdentity {
    pub fn new(identifier: u16, sequence: u16) -> Self {
        Self {
            identifier,
            sequence,
        }
    }

    /// A fresh identity with a random identifier, so that two scanners on the
    /// same host do not claim each other's replies.
    pub fn random() -> Self {
        Self::new(rand::random(), DEFAULT_SEQUENCE)
    }
}

/// Builds the echo request sent to every target.
///
/// The datagram does not depend on the destination, so callers build it once
/// and reuse the bytes for every send.
pub fn create_echo_request(identity: ProbeIdentity) -> Result<Vec<u8>, IcmpError> {
    let mut buffer: Vec<u8> = vec![0u8; ICMP_ECHO_HDR_LEN];
    {
        let mut echo = MutableEchoRequestPacket::new(&mut buffer).ok_or(IcmpError::Buffer)?;
        echo.set_icmp_type(IcmpTypes::EchoRequest);
        echo.set_icmp_code(IcmpCode::new(0));
        echo.set_identifier(identity.identifier);
        echo.set_sequence_number(identity.sequence);
        echo.set_checksum(0);
    }
    set_checksum(&mut buffer)?;
    Ok(buffer)
}

/// Builds the echo reply a live host would answer with.
///
/// Used by responders and simulated transports.
pub fn create_echo_reply(identity: ProbeIdentity) -> Result<Vec<u8>, IcmpError> {
    let mut buffer: Vec<u8> = vec![0u8; ICMP_ECHO_HDR_LEN];
    {
        let mut echo = MutableEchoReplyPacket::new(&mut buffer).ok_or(IcmpError::Buffer)?;
        echo.set_icmp_type(IcmpTypes::EchoReply);
        echo.set_icmp_code(IcmpCode::new(0));
        echo.set_identifier(identity.identifier);
        echo.set_sequence_number(identity.sequence);
        echo.set_checksum(0);
    }
    set_checksum(&mut buffer)?;
    Ok(buffer)
}

fn set_checksum(buffer: &mut [u8]) -> Result<(), IcmpError> {
    let csum: u16 = {
        let icmp = IcmpPacket::new(buffer).ok_or(IcmpError::Buffer)?;
        checksum(&icmp)
    };
    buffer[2..4].copy_from_slice(&csum.to_be_bytes());
    Ok(())
}

/// Reads the identity out of an inbound ICMP message.
///
/// Returns `Ok(None)` for anything that is not an echo reply, which is the
/// normal case for a raw socket seeing all ICMP traffic of the host.
pub fn get_echo_reply_identity(bytes: &[u8]) -> Result<Option<ProbeIdentity>, IcmpError> {
    let icmp = IcmpPacket::new(bytes).ok_or(IcmpError::Truncated(bytes.len()))?;
    if icmp.get_icmp_type() != IcmpTypes::EchoReply {
        return Ok(None);
    }

    let reply = EchoReplyPacket::new(icmp.packet()).ok_or(IcmpError::MissingEchoBody(bytes.len()))?;
    Ok(Some(ProbeIdentity::new(
        reply.get_identifier(),
        reply.get_sequence_number(),
    )))
}

/// True if `bytes` is an echo reply to a probe stamped with `identity`.
pub fn is_reply_to(bytes: &[u8], identity: ProbeIdentity) -> Result<bool, IcmpError> {
    Ok(get_echo_reply_identity(bytes)? == Some(identity))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

use std::io;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use pnet::{
    packet::{
        Packet,
        icmp::IcmpPacket,
        ip::IpNextHeaderProtocols,
    },
    transport::{
        self,
        TransportChannelType,
        TransportProtocol,
        TransportReceiver,
        TransportSender,
    },
};

use crate::error::TransportError;

const TRANSPORT_BUFFER_SIZE: usize = 4096;
const CHANNEL_TYPE_ICMP: TransportChannelType =
    TransportChannelType::Layer4(TransportProtocol::Ipv4(IpNextHeaderProtocols::Icmp));

/// What became of a single send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Sent,
    /// The kernel send queue was full. Nothing went out; the next retry
    /// sweep covers the target.
    Deferred,
}

/// Datagram I/O used by the scanner.
///
/// `send` is called from the sweep loop while `receive_with_timeout` blocks on
/// the receiver thread, so both must be callable concurrently.
pub trait ProbeTransport: Send + Sync + 'static {
    fn send(&self, target: Ipv4Addr, payload: &[u8]) -> Result<SendOutcome, TransportError>;

    /// Waits at most `max_wait` for one inbound ICMP message.
    ///
    /// `Ok(None)` means the wait timed out.
    fn receive_with_timeout(
        &self,
        max_wait: Duration,
    ) -> Result<Option<(Vec<u8>, Ipv4Addr)>, TransportError>;

    /// Releases the socket. Calling it again is a no-op.
    fn close(&self);
}

impl<T: ProbeTransport + ?Sized> ProbeTransport for Arc<T> {
    fn send(&self, target: Ipv4Addr, payload: &[u8]) -> Result<SendOutcome, TransportError> {
        (**self).send(target, payload)
    }

    fn receive_with_timeout(
        &self,
        max_wait: Duration,
    ) -> Result<Option<(Vec<u8>, Ipv4Addr)>, TransportError> {
        (**self).receive_with_timeout(max_wait)
    }

    fn close(&self) {
        (**self).close()
    }
}

/// Raw IPv4 ICMP socket, not bound to any local address.
///
/// The kernel prepends the IP header on send; on receive `pnet` strips it, so
/// both directions deal in bare ICMP messages.
pub struct IcmpTransport {
    tx: Mutex<Option<TransportSender>>,
    rx: Mutex<Option<TransportReceiver>>,
}

impl IcmpTransport {
    pub fn open() -> Result<Self, TransportError> {
        let (tx, rx) = transport::transport_channel(TRANSPORT_BUFFER_SIZE, CHANNEL_TYPE_ICMP)
            .map_err(TransportError::Open)?;
        Ok(Self {
            tx: Mutex::new(Some(tx)),
            rx: Mutex::new(Some(rx)),
        })
    }
}

impl ProbeTransport for IcmpTransport {
    fn send(&self, target: Ipv4Addr, payload: &[u8]) -> Result<SendOutcome, TransportError> {
        let packet = IcmpPacket::new(payload).ok_or_else(|| TransportError::Write {
            target,
            source: io::Error::new(io::ErrorKind::InvalidInput, "payload is not an ICMP message"),
        })?;

        let mut guard = lock(&self.tx);
        let sender = guard.as_mut().ok_or(TransportError::Closed)?;
        match sender.send_to(packet, IpAddr::V4(target)) {
            Ok(_) => Ok(SendOutcome::Sent),
            Err(e) => classify_send_error(target, e),
        }
    }

    fn receive_with_timeout(
        &self,
        max_wait: Duration,
    ) -> Result<Option<(Vec<u8>, Ipv4Addr)>, TransportError> {
        let mut guard = lock(&self.rx);
        let receiver = guard.as_mut().ok_or(TransportError::Closed)?;
        let mut iter = transport::icmp_packet_iter(receiver);
        match iter.next_with_timeout(max_wait) {
            Ok(Some((packet, IpAddr::V4(source)))) => Ok(Some((packet.packet().to_vec(), source))),
            Ok(Some((_, IpAddr::V6(_)))) | Ok(None) => Ok(None),
            Err(e) if e.kind() == io::ErrorKind::TimedOut || e.kind() == io::ErrorKind::WouldBlock => {
                Ok(None)
            }
            Err(e) => Err(TransportError::Read(e)),
        }
    }

    fn close(&self) {
        lock(&self.tx).take();
        lock(&self.rx).take();
    }
}

/// Separates transient send-queue exhaustion from real write failures.
///
/// `ENOBUFS` shows up under wide sweeps when the kernel cannot queue another
/// datagram; the target stays pending and is probed again on the next sweep.
pub fn classify_send_error(target: Ipv4Addr, error: io::Error) -> Result<SendOutcome, TransportError> {
    if error.raw_os_error() == Some(libc::ENOBUFS) {
        return Ok(SendOutcome::Deferred);
    }
    Err(TransportError::Write {
        target,
        source: error,
    })
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
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
    use pingx_protocols::icmp::{self, ProbeIdentity};

    const TARGET: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 1);

    #[test]
    fn enobufs_is_deferred_not_failed() {
        let error = io::Error::from_raw_os_error(libc::ENOBUFS);
        assert_eq!(classify_send_error(TARGET, error).unwrap(), SendOutcome::Deferred);
    }

    #[test]
    fn other_write_errors_surface() {
        let error = io::Error::from_raw_os_error(libc::EHOSTUNREACH);
        match classify_send_error(TARGET, error) {
            Err(TransportError::Write { target, .. }) => assert_eq!(target, TARGET),
            other => panic!("expected write error, got {other:?}"),
        }
    }

    #[test]
    #[ignore]
    fn raw_socket_echoes_loopback() {
        let transport = IcmpTransport::open().unwrap();
        let identity = ProbeIdentity::random();
        let probe = icmp::create_echo_request(identity).unwrap();
        let loopback = Ipv4Addr::LOCALHOST;

        assert_eq!(transport.send(loopback, &probe).unwrap(), SendOutcome::Sent);

        let mut answered = false;
        for _ in 0..10 {
            if let Some((bytes, source)) = transport
                .receive_with_timeout(Duration::from_millis(200))
                .unwrap()
            {
                if source == loopback && icmp::is_reply_to(&bytes, identity).unwrap_or(false) {
                    answered = true;
                    break;
                }
            }
        }
        assert!(answered, "loopback did not answer our echo request");

        transport.close();
        transport.close();
        assert!(matches!(transport.send(loopback, &probe), Err(TransportError::Closed)));
    }
}

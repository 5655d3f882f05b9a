//! An in-memory [`ProbeTransport`] that plays the network.
//!
//! Hosts marked responsive answer every echo request with a matching echo
//! reply. Scans against it need no privileges and finish as fast as the
//! configured timings allow.

use std::collections::{HashMap, HashSet};
use std::io;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use pingx_protocols::icmp::{self, ProbeIdentity};
use pnet::packet::icmp::echo_request::EchoRequestPacket;

use crate::error::TransportError;
use crate::network::transport::{ProbeTransport, SendOutcome};

type Datagram = (Vec<u8>, Ipv4Addr);

pub struct SimulatedTransport {
    responsive: HashSet<Ipv4Addr>,
    answer_from_attempt: HashMap<Ipv4Addr, usize>,
    replies_per_probe: usize,
    failing: HashSet<Ipv4Addr>,
    congested: HashSet<Ipv4Addr>,
    inbox_tx: Mutex<Sender<Datagram>>,
    inbox_rx: Mutex<Receiver<Datagram>>,
    sends: Mutex<HashMap<Ipv4Addr, usize>>,
    closes: AtomicUsize,
    closed: AtomicBool,
}

impl Default for SimulatedTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedTransport {
    pub fn new() -> Self {
        let (inbox_tx, inbox_rx) = mpsc::channel();
        Self {
            responsive: HashSet::new(),
            answer_from_attempt: HashMap::new(),
            replies_per_probe: 1,
            failing: HashSet::new(),
            congested: HashSet::new(),
            inbox_tx: Mutex::new(inbox_tx),
            inbox_rx: Mutex::new(inbox_rx),
            sends: Mutex::new(HashMap::new()),
            closes: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Hosts that answer every probe.
    pub fn responsive<I: IntoIterator<Item = Ipv4Addr>>(mut self, hosts: I) -> Self {
        self.responsive.extend(hosts);
        self
    }

    /// `host` ignores its first `attempt - 1` probes and answers from then on.
    pub fn answers_from_attempt(mut self, host: Ipv4Addr, attempt: usize) -> Self {
        self.answer_from_attempt.insert(host, attempt);
        self
    }

    /// Every answered probe produces `count` identical replies.
    pub fn replies_per_probe(mut self, count: usize) -> Self {
        self.replies_per_probe = count;
        self
    }

    /// Sends to `host` fail with a write error.
    pub fn failing_sends(mut self, host: Ipv4Addr) -> Self {
        self.failing.insert(host);
        self
    }

    /// Sends to `host` hit a full send queue.
    pub fn congested(mut self, host: Ipv4Addr) -> Self {
        self.congested.insert(host);
        self
    }

    /// Queues an arbitrary inbound datagram, as if it arrived from `source`.
    pub fn inject(&self, bytes: Vec<u8>, source: Ipv4Addr) {
        let _ = lock(&self.inbox_tx).send((bytes, source));
    }

    /// Number of send calls made for `host`, whatever their outcome.
    pub fn sends_to(&self, host: Ipv4Addr) -> usize {
        lock(&self.sends).get(&host).copied().unwrap_or(0)
    }

    pub fn total_sends(&self) -> usize {
        lock(&self.sends).values().sum()
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn answers(&self, host: Ipv4Addr, attempt: usize) -> bool {
        match self.answer_from_attempt.get(&host) {
            Some(first) => attempt >= *first,
            None => self.responsive.contains(&host),
        }
    }
}

impl ProbeTransport for SimulatedTransport {
    fn send(&self, target: Ipv4Addr, payload: &[u8]) -> Result<SendOutcome, TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }

        let attempt = {
            let mut sends = lock(&self.sends);
            let count = sends.entry(target).or_insert(0);
            *count += 1;
            *count
        };

        if self.congested.contains(&target) {
            return Ok(SendOutcome::Deferred);
        }
        if self.failing.contains(&target) {
            return Err(TransportError::Write {
                target,
                source: io::Error::other("simulated write failure"),
            });
        }

        if self.answers(target, attempt) {
            let request = EchoRequestPacket::new(payload).ok_or_else(|| TransportError::Write {
                target,
                source: io::Error::new(io::ErrorKind::InvalidInput, "not an echo request"),
            })?;
            let identity =
                ProbeIdentity::new(request.get_identifier(), request.get_sequence_number());
            let reply = icmp::create_echo_reply(identity).map_err(|e| TransportError::Write {
                target,
                source: io::Error::new(io::ErrorKind::InvalidData, e),
            })?;
            for _ in 0..self.replies_per_probe {
                self.inject(reply.clone(), target);
            }
        }

        Ok(SendOutcome::Sent)
    }

    fn receive_with_timeout(
        &self,
        max_wait: Duration,
    ) -> Result<Option<(Vec<u8>, Ipv4Addr)>, TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        match lock(&self.inbox_rx).recv_timeout(max_wait) {
            Ok(datagram) => Ok(Some(datagram)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(TransportError::Closed),
        }
    }

    fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.closed.store(true, Ordering::SeqCst);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

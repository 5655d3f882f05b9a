use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use pingx_protocols::icmp::{self, ProbeIdentity};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, trace, warn};

use crate::error::TransportError;
use crate::network::transport::ProbeTransport;
use crate::scanner::signal::StopSignal;
use crate::scanner::tracker::LivenessTracker;

/// Blocking read loop correlating echo replies with pending targets.
///
/// Owns the only sender of the result stream; the stream closes when
/// [`run`](Self::run) returns.
pub(crate) struct ReplyReceiver<T> {
    pub transport: Arc<T>,
    pub tracker: Arc<LivenessTracker>,
    pub identity: ProbeIdentity,
    pub results: UnboundedSender<String>,
    pub halt: StopSignal,
    pub poll_delay: Duration,
    pub idle_delay: Duration,
}

impl<T: ProbeTransport> ReplyReceiver<T> {
    /// Reads until halted and returns how many hosts were reported.
    ///
    /// The read timeout adapts: short while replies keep coming in, long once
    /// a read comes back empty.
    pub fn run(self) -> usize {
        let mut delay = self.poll_delay;
        let mut found = 0;

        while !self.halt.is_stopped() {
            match self.transport.receive_with_timeout(delay) {
                Ok(Some((bytes, source))) => {
                    delay = self.poll_delay;
                    if self.accept(&bytes, source) {
                        found += 1;
                    }
                }
                Ok(None) => delay = self.idle_delay,
                Err(TransportError::Closed) => break,
                Err(e) => {
                    warn!("{e}");
                    delay = self.idle_delay;
                    std::thread::sleep(self.poll_delay);
                }
            }
        }

        trace!("Receiver stopped after {found} hosts");
        found
    }

    fn accept(&self, bytes: &[u8], source: Ipv4Addr) -> bool {
        match icmp::is_reply_to(bytes, self.identity) {
            Ok(true) => {}
            Ok(false) => return false,
            Err(e) => {
                debug!("Dropping ICMP message from {source}: {e}");
                return false;
            }
        }

        if !self.tracker.resolve(source) {
            trace!("Ignoring late or duplicate reply from {source}");
            return false;
        }

        debug!("{source} is alive");
        if self.results.send(source.to_string()).is_err() {
            trace!("Result stream dropped by consumer");
        }
        true
    }
}

//! The scan **orchestrator**.
//!
//! A scan walks through `Idle → Enumerating → Probing → Draining → Done`:
//!
//! 1. The [`NetworkRange`] is expanded into its target addresses.
//! 2. The transport is opened and a receiver thread starts correlating
//!    replies ([`receiver`]).
//! 3. Every target gets one echo request right away.
//! 4. A periodic sweep re-probes silent targets until each one has either
//!    answered or used up its retry budget ([`tracker`]).
//! 5. The receiver is halted, which closes the result stream, and the
//!    transport is released.
//!
//! Only a failure to open the transport or an empty target set end a scan
//! with an error; everything else costs at most one probe attempt.

use std::fmt;
use std::net::Ipv4Addr;
use std::sync::Arc;

use pingx_common::config::ScanConfig;
use pingx_common::network::range::NetworkRange;
use pingx_protocols::icmp::{self, ProbeIdentity};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, trace, warn};

use crate::error::{ScanError, TransportError};
use crate::network::transport::{IcmpTransport, ProbeTransport, SendOutcome};

mod receiver;
pub mod signal;
pub mod tracker;

use receiver::ReplyReceiver;
use signal::StopSignal;
use tracker::LivenessTracker;

/// Lifecycle of a scan. Phases only ever move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    Idle,
    Enumerating,
    Probing,
    Draining,
    Done,
    /// The scan could not start. Never observed on a [`ScanStream`]: a failed
    /// scan yields its [`ScanError`] instead of a stream.
    Failed,
}

impl fmt::Display for ScanPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScanPhase::Idle => "idle",
            ScanPhase::Enumerating => "enumerating",
            ScanPhase::Probing => "probing",
            ScanPhase::Draining => "draining",
            ScanPhase::Done => "done",
            ScanPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub targets: usize,
    pub alive: usize,
    pub unanswered: usize,
    pub cancelled: bool,
}

/// A running scan.
///
/// Yields discovered hosts in the order their replies arrived and ends once
/// the scan is over. Dropping it does not abort the scan; use
/// [`stop`](Self::stop) for that.
pub struct ScanStream {
    results: mpsc::UnboundedReceiver<String>,
    stop: StopSignal,
    phase: watch::Receiver<ScanPhase>,
    driver: JoinHandle<ScanSummary>,
}

impl ScanStream {
    pub async fn next(&mut self) -> Option<String> {
        self.results.recv().await
    }

    pub fn stop(&self) {
        self.stop.stop();
    }

    pub fn phase(&self) -> ScanPhase {
        *self.phase.borrow()
    }

    /// A handle on the phase that outlives the stream.
    pub fn phases(&self) -> watch::Receiver<ScanPhase> {
        self.phase.clone()
    }

    /// Waits for every result, then for the scan to wrap up.
    pub async fn collect(mut self) -> Result<Vec<String>, ScanError> {
        let mut hosts = Vec::new();
        while let Some(host) = self.next().await {
            hosts.push(host);
        }
        self.finish().await?;
        Ok(hosts)
    }

    /// Waits for the scan to wrap up. Results not read yet are discarded.
    pub async fn finish(self) -> Result<ScanSummary, ScanError> {
        Ok(self.driver.await?)
    }
}

/// Sweeps `range` over a raw ICMP socket.
pub async fn scan(
    range: NetworkRange,
    config: ScanConfig,
    stop: StopSignal,
) -> Result<ScanStream, ScanError> {
    scan_with(range, config, stop, IcmpTransport::open).await
}

/// Sweeps `range` and waits for the complete list of live hosts.
pub async fn perform_discovery(
    range: NetworkRange,
    config: ScanConfig,
) -> Result<Vec<String>, ScanError> {
    scan(range, config, StopSignal::new()).await?.collect().await
}

/// Sweeps `range` over the transport returned by `open`.
///
/// Fails before anything is sent if the range yields no targets or the
/// transport cannot be opened. Must be called from within a tokio runtime.
pub async fn scan_with<T, F>(
    range: NetworkRange,
    config: ScanConfig,
    stop: StopSignal,
    open: F,
) -> Result<ScanStream, ScanError>
where
    T: ProbeTransport,
    F: FnOnce() -> Result<T, TransportError>,
{
    let (phase_tx, phase_rx) = watch::channel(ScanPhase::Idle);
    let fail = |err: ScanError| {
        trace!("Scan phase: {}", ScanPhase::Failed);
        error!("{err}");
        err
    };

    set_phase(&phase_tx, ScanPhase::Enumerating);
    let targets: Vec<Ipv4Addr> = enumerate_targets(&range, &config);
    if targets.is_empty() {
        return Err(fail(ScanError::NoTargets(range)));
    }

    let identity: ProbeIdentity = config.identity.unwrap_or_else(ProbeIdentity::random);
    let probe: Vec<u8> = icmp::create_echo_request(identity).map_err(|e| fail(e.into()))?;
    let transport: Arc<T> = Arc::new(open().map_err(|e| fail(ScanError::TransportOpen(e)))?);

    info!("Probing {} addresses in {range}", targets.len());
    set_phase(&phase_tx, ScanPhase::Probing);

    let tracker = Arc::new(LivenessTracker::new());
    let (results_tx, results_rx) = mpsc::unbounded_channel();
    let halt = StopSignal::new();

    let receiver = ReplyReceiver {
        transport: Arc::clone(&transport),
        tracker: Arc::clone(&tracker),
        identity,
        results: results_tx,
        halt: halt.clone(),
        poll_delay: config.poll_delay,
        idle_delay: config.idle_delay,
    };
    let receiver_handle = tokio::task::spawn_blocking(move || receiver.run());

    let sweeper = Sweeper {
        transport,
        tracker,
        probe,
        config,
        stop: stop.clone(),
        halt,
        phase: phase_tx,
    };
    let driver = tokio::spawn(sweeper.run(range, targets, receiver_handle));

    Ok(ScanStream {
        results: results_rx,
        stop,
        phase: phase_rx,
        driver,
    })
}

fn enumerate_targets(range: &NetworkRange, config: &ScanConfig) -> Vec<Ipv4Addr> {
    let (start, end) = (range.start(), range.end());
    range
        .hosts()
        .filter(|ip| !config.skip_network_and_broadcast || (*ip != start && *ip != end))
        .collect()
}

fn set_phase(phase: &watch::Sender<ScanPhase>, next: ScanPhase) {
    trace!("Scan phase: {next}");
    phase.send_replace(next);
}

struct Sweeper<T> {
    transport: Arc<T>,
    tracker: Arc<LivenessTracker>,
    probe: Vec<u8>,
    config: ScanConfig,
    stop: StopSignal,
    halt: StopSignal,
    phase: watch::Sender<ScanPhase>,
}

impl<T: ProbeTransport> Sweeper<T> {
    async fn run(
        self,
        range: NetworkRange,
        targets: Vec<Ipv4Addr>,
        receiver: JoinHandle<usize>,
    ) -> ScanSummary {
        self.probe_all(&targets);

        set_phase(&self.phase, ScanPhase::Draining);
        let cancelled = self.drain().await || self.stop.is_stopped();

        self.halt.stop();
        let alive = match receiver.await {
            Ok(found) => found,
            Err(e) => {
                error!("Receiver task failed: {e}");
                self.tracker.resolved_count()
            }
        };
        self.transport.close();
        set_phase(&self.phase, ScanPhase::Done);

        let summary = ScanSummary {
            targets: targets.len(),
            alive,
            unanswered: targets.len().saturating_sub(alive),
            cancelled,
        };
        if cancelled {
            info!("Scan of {range} cancelled, {alive} hosts answered so far");
        } else {
            info!("Scan of {range} finished: {alive}/{} hosts answered", summary.targets);
        }
        summary
    }

    fn probe_all(&self, targets: &[Ipv4Addr]) {
        for &target in targets {
            if self.stop.is_stopped() {
                return;
            }
            // Registered before the send so an early reply finds its entry.
            self.tracker.register(target);
            self.send(target);
        }
    }

    /// Runs retry sweeps. Returns true if the scan was cancelled.
    async fn drain(&self) -> bool {
        loop {
            if self.tracker.unresolved_count() == 0 {
                return false;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.sweep_interval) => {}
                _ = self.stop.stopped() => return true,
            }

            let due = self.tracker.claim_retries(self.config.max_attempts);
            if due.is_empty() {
                return false;
            }
            trace!("Re-probing {} silent targets", due.len());
            for target in due {
                if self.stop.is_stopped() {
                    return true;
                }
                self.send(target);
            }
        }
    }

    fn send(&self, target: Ipv4Addr) {
        match self.transport.send(target, &self.probe) {
            Ok(SendOutcome::Sent) => {}
            Ok(SendOutcome::Deferred) => trace!("Send queue full, {target} waits for the next sweep"),
            Err(e) => warn!("{e}"),
        }
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

use std::time::Duration;

use pingx_protocols::icmp::ProbeIdentity;

const DEFAULT_POLL_DELAY: Duration = Duration::from_millis(100);
const DEFAULT_IDLE_DELAY: Duration = Duration::from_secs(1);
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(1);
const DEFAULT_MAX_ATTEMPTS: u8 = 3;

/// Timing and retry settings of one scan.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Read timeout used while replies keep arriving.
    pub poll_delay: Duration,
    /// Read timeout used after a read came back empty.
    pub idle_delay: Duration,
    /// Pause between two retry sweeps.
    pub sweep_interval: Duration,
    /// Probes sent to a silent target before it is given up on.
    pub max_attempts: u8,
    /// Pins the probe identity. A random identifier is drawn when unset.
    pub identity: Option<ProbeIdentity>,
    /// Leaves the network and broadcast address out of the target set.
    pub skip_network_and_broadcast: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            poll_delay: DEFAULT_POLL_DELAY,
            idle_delay: DEFAULT_IDLE_DELAY,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            identity: None,
            skip_network_and_broadcast: false,
        }
    }
}

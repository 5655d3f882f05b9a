use std::net::Ipv4Addr;

use dashmap::DashMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryState {
    pub attempts: u8,
    pub resolved: bool,
}

/// Per-target retry bookkeeping of one scan.
///
/// Shared by the sweep loop and the receiver thread. Every update runs under
/// the lock of the shard owning the key, so the two never serialize on a
/// single global lock and a target flips to resolved exactly once.
#[derive(Debug, Default)]
pub struct LivenessTracker {
    states: DashMap<Ipv4Addr, RetryState>,
}

impl LivenessTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the first probe for `target`. Known targets are left as they are.
    pub fn register(&self, target: Ipv4Addr) {
        self.states.entry(target).or_insert(RetryState {
            attempts: 1,
            resolved: false,
        });
    }

    /// Marks `target` as alive.
    ///
    /// True only for the call that performed the transition; unknown targets
    /// and targets resolved earlier yield false.
    pub fn resolve(&self, target: Ipv4Addr) -> bool {
        match self.states.get_mut(&target) {
            Some(mut state) if !state.resolved => {
                state.resolved = true;
                true
            }
            _ => false,
        }
    }

    /// Collects every unresolved target with budget left and charges it one attempt.
    pub fn claim_retries(&self, max_attempts: u8) -> Vec<Ipv4Addr> {
        let mut due = Vec::new();
        for mut entry in self.states.iter_mut() {
            let state = entry.value_mut();
            if !state.resolved && state.attempts < max_attempts {
                state.attempts += 1;
                due.push(*entry.key());
            }
        }
        due
    }

    #[cfg(test)]
    fn state(&self, target: Ipv4Addr) -> Option<RetryState> {
        self.states.get(&target).map(|state| *state)
    }

    pub fn resolved_count(&self) -> usize {
        self.states.iter().filter(|entry| entry.resolved).count()
    }

    pub fn unresolved_count(&self) -> usize {
        self.states.len() - self.resolved_count()
    }
}

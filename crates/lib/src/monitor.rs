//! Backend connectivity tracking.
//!
//! The driver probes the model-list endpoint once at startup and once per
//! [`POLL_INTERVAL`]; `observe` folds each probe result into the link state
//! and reports only edge transitions, so a failure streak notifies once and
//! the first success after it notifies once.

use std::time::Duration;

/// Time between connectivity probes.
pub const POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Connectivity to the backend as last observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Link {
    /// Optimistic default until the first probe completes.
    #[default]
    Connected,
    Disconnected,
}

#[derive(Debug, Default)]
pub struct ConnectionMonitor {
    link: Link,
}

impl ConnectionMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn link(&self) -> Link {
        self.link
    }

    /// Fold one probe result into the state. Returns `Some(new_state)` only
    /// when the state changed, never on a repeated success or failure.
    pub fn observe(&mut self, ok: bool) -> Option<Link> {
        let next = if ok { Link::Connected } else { Link::Disconnected };
        if next == self.link {
            return None;
        }
        self.link = next;
        Some(next)
    }
}

use std::sync::Mutex;

use tracing::debug;

/// Channel lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// Running the connect-then-create sequence.
    Connecting,
    /// A transport connection exists; the receive loop is not up yet.
    Connected,
    /// Receive loop running; the channel is usable.
    Running,
    /// Teardown in progress.
    Closing,
    /// Torn down; the transport connection has been released.
    Closed,
}

/// Shared, observable lifecycle cell.
#[derive(Debug)]
pub(crate) struct StateCell {
    inner: Mutex<ChannelState>,
}

impl StateCell {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(ChannelState::Connecting),
        }
    }

    pub fn get(&self) -> ChannelState {
        *self.inner.lock().expect("state lock poisoned")
    }

    pub fn set(&self, next: ChannelState) {
        let mut state = self.inner.lock().expect("state lock poisoned");
        if *state != next {
            debug!(from = ?*state, to = ?next, "channel state transition");
            *state = next;
        }
    }
}

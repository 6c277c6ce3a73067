use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic counters for channel activity.
///
/// Recoverable receive-side conditions land here (and in the log)
/// instead of surfacing to callers.
#[derive(Debug, Default)]
pub struct ChannelStats {
    frames_received: AtomicU64,
    frames_malformed: AtomicU64,
    topic_misses: AtomicU64,
    callbacks_failed: AtomicU64,
    acks_sent: AtomicU64,
    posts_confirmed: AtomicU64,
    posts_unconfirmed: AtomicU64,
}

impl ChannelStats {
    pub(crate) fn mark_frame(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn mark_malformed(&self) {
        self.frames_malformed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn mark_miss(&self) {
        self.topic_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn mark_callback_failed(&self) {
        self.callbacks_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn mark_ack(&self) {
        self.acks_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn mark_confirmed(&self) {
        self.posts_confirmed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn mark_unconfirmed(&self) {
        self.posts_unconfirmed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            frames_received: self.frames_received.load(Ordering::Relaxed),
            frames_malformed: self.frames_malformed.load(Ordering::Relaxed),
            topic_misses: self.topic_misses.load(Ordering::Relaxed),
            callbacks_failed: self.callbacks_failed.load(Ordering::Relaxed),
            acks_sent: self.acks_sent.load(Ordering::Relaxed),
            posts_confirmed: self.posts_confirmed.load(Ordering::Relaxed),
            posts_unconfirmed: self.posts_unconfirmed.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`ChannelStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub frames_received: u64,
    pub frames_malformed: u64,
    pub topic_misses: u64,
    pub callbacks_failed: u64,
    pub acks_sent: u64,
    pub posts_confirmed: u64,
    pub posts_unconfirmed: u64,
}

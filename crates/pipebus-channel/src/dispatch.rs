use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

use bytes::Bytes;
use tracing::warn;

use crate::registry::Callback;
use crate::stats::ChannelStats;

/// Run a subscriber callback on its own thread, isolated from the
/// receive loop. A panicking callback is reported and absorbed; nothing
/// waits for the callback to finish.
pub(crate) fn dispatch(
    topic: &str,
    callback: Arc<Callback>,
    payload: Bytes,
    stats: &Arc<ChannelStats>,
) {
    let stats = Arc::clone(stats);
    let thread_stats = Arc::clone(&stats);
    let thread_topic = topic.to_string();
    let spawned = thread::Builder::new()
        .name(format!("pipebus-dispatch-{topic}"))
        .spawn(move || {
            if catch_unwind(AssertUnwindSafe(|| callback(payload))).is_err() {
                thread_stats.mark_callback_failed();
                warn!(topic = %thread_topic, "subscriber callback panicked");
            }
        });

    if let Err(err) = spawned {
        stats.mark_callback_failed();
        warn!(topic, %err, "failed to spawn dispatch thread");
    }
}

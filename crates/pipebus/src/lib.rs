//! Topic publish/subscribe over named local pipes.
//!
//! pipebus gives two local processes a named, bidirectional channel with
//! a lightweight topic protocol on top: frames are `topic<delimiter>payload`,
//! routed to per-topic callbacks on the receiving side and acknowledged
//! back to the sender with a bounded retry loop.
//!
//! # Crate Structure
//!
//! - [`transport`] — Named duplex message endpoints (Unix domain sockets)
//! - [`frame`] — Topic-delimited framing and length acknowledgments
//! - [`channel`] — Channel lifecycle, subscriptions, and reliable posting

/// Re-export transport types.
pub mod transport {
    pub use pipebus_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use pipebus_frame::*;
}

/// Re-export channel types.
pub mod channel {
    pub use pipebus_channel::*;
}

//! Topic publish/subscribe channels over named duplex endpoints.
//!
//! This is the "just works" layer. A [`Channel`] connects to (or
//! creates) a named endpoint, receives `topic<delimiter>payload` frames
//! on a dedicated thread, routes them to subscribed callbacks, and
//! acknowledges every consumed frame so the sender's retry loop can
//! confirm delivery.

pub mod channel;
pub mod config;
mod dispatch;
pub mod error;
pub mod registry;
pub mod state;
pub mod stats;

pub use channel::Channel;
pub use config::ChannelConfig;
pub use error::{ChannelError, Result};
pub use registry::{Callback, SubscriptionRegistry};
pub use state::ChannelState;
pub use stats::{ChannelStats, StatsSnapshot};

use pipebus_frame::FrameError;
use pipebus_transport::TransportError;

/// Errors surfaced by a channel.
///
/// Receive-side conditions (malformed frames, unsubscribed topics,
/// failing callbacks) never appear here; the receive loop absorbs them
/// and reports through the log and [`crate::stats::ChannelStats`].
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// Neither connecting to nor creating the named endpoint worked.
    /// Fatal: construction and rebind abort with this.
    #[error("channel {name:?} unavailable: {source}")]
    Unavailable {
        name: String,
        #[source]
        source: TransportError,
    },

    /// Frame-level error, e.g. a topic containing the delimiter.
    #[error(transparent)]
    Frame(#[from] FrameError),

    /// The channel has been closed.
    #[error("channel is closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, ChannelError>;

use std::path::PathBuf;

/// Errors that can occur on a duplex endpoint.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// No endpoint with the given name exists to connect to.
    #[error("no endpoint named {name:?}")]
    NotFound { name: String },

    /// The endpoint exists but is mid-handshake with another party.
    #[error("endpoint {name:?} is busy")]
    Busy { name: String },

    /// The endpoint name contains characters that cannot map to a path.
    #[error("invalid endpoint name {name:?}: {reason}")]
    NameInvalid { name: String, reason: &'static str },

    /// The socket path is too long for the platform.
    #[error("socket path too long ({len} bytes, max {max}): {path}")]
    PathTooLong {
        path: PathBuf,
        len: usize,
        max: usize,
    },

    /// The connection is in a broken or invalid state.
    #[error("connection broken: {0}")]
    Broken(&'static str),

    /// The endpoint has been closed.
    #[error("endpoint closed")]
    Closed,

    /// An I/O error occurred on the underlying stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;

//! Named duplex message endpoints for local IPC.
//!
//! An endpoint is identified by name; one process creates it and waits
//! for a peer, the other connects. Endpoints carry whole messages (the
//! internal chunk layer preserves boundaries over stream sockets) and
//! support a write-then-wait-for-reply transaction whose reply is routed
//! past the receiving side's ordinary read path.
//!
//! This is the lowest layer of pipebus. Everything else builds on the
//! [`Wire`] and [`Conn`] traits provided here.

pub mod chunk;
pub mod error;
pub mod path;
pub mod reader;
pub mod traits;

#[cfg(unix)]
pub mod uds;

pub use error::{Result, TransportError};
pub use traits::{Conn, ReadEvent, Wire};

#[cfg(unix)]
pub use uds::{UdsConn, UdsWire};

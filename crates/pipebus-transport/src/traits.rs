use crate::error::Result;

/// Outcome of a single [`Conn::read`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadEvent {
    /// `len` bytes of the current message were copied into the buffer.
    /// `more` is true when the message continues past what was delivered.
    Data { len: usize, more: bool },
    /// No message arrived within the poll interval. State is preserved;
    /// a partially delivered message resumes on the next call.
    Idle,
    /// The peer disconnected or the endpoint was shut down.
    Closed,
}

/// A connected duplex endpoint carrying whole messages.
///
/// One side reads messages while the other runs write-then-wait
/// transactions against it; replies written with [`Conn::reply`] are
/// routed to the in-flight [`Conn::transact`] on the peer, never to the
/// peer's own read path.
pub trait Conn: Send + Sync + 'static {
    /// True once a peer is attached. An endpoint created with
    /// [`Wire::create`] starts detached and attaches when a peer
    /// connects; a connected endpoint is attached from the start.
    fn poll_attached(&self) -> Result<bool>;

    /// Read up to `buf.len()` bytes of the next message (blocking, with
    /// an internal poll timeout so callers can observe shutdown).
    fn read(&self, buf: &mut [u8]) -> Result<ReadEvent>;

    /// Write one message.
    fn write(&self, bytes: &[u8]) -> Result<()>;

    /// Write one message on the reply path.
    fn reply(&self, bytes: &[u8]) -> Result<()>;

    /// Write one message and wait for the peer's reply, capped at
    /// `max_reply` bytes. An absent peer or a reply timeout yields an
    /// empty reply rather than an error.
    fn transact(&self, bytes: &[u8], max_reply: usize) -> Result<Vec<u8>>;

    /// Shut the endpoint down. Idempotent; a blocked read observes
    /// [`ReadEvent::Closed`] on its next wakeup.
    fn close(&self);
}

/// Factory for duplex endpoints identified by name.
pub trait Wire: Send + Sync + 'static {
    type Conn: Conn;

    /// Connect to an existing endpoint of the given name.
    fn connect(&self, name: &str) -> Result<Self::Conn>;

    /// Create a new endpoint of the given name and wait for a peer.
    fn create(&self, name: &str) -> Result<Self::Conn>;
}

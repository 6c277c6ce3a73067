use std::io::ErrorKind;
use std::net::Shutdown;
use std::os::unix::fs::{FileTypeExt, PermissionsExt};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::Duration;

use tracing::{debug, info};

use crate::chunk::{write_chunk, KIND_DATA, KIND_REPLY};
use crate::error::{Result, TransportError};
use crate::path::socket_path;
use crate::reader::MessageReader;
use crate::traits::{Conn, ReadEvent, Wire};

/// Default permission mode for created socket paths.
const SOCKET_MODE: u32 = 0o600;

/// Unix-domain-socket transport.
///
/// Endpoints behave like single-instance message-mode pipes: one side
/// creates the endpoint and waits for exactly one peer, the other
/// connects to it by name. Message boundaries and transaction replies
/// are carried by the internal chunk layer.
#[derive(Debug, Clone)]
pub struct UdsWire {
    /// How long a blocked read waits before reporting [`ReadEvent::Idle`].
    pub poll_interval: Duration,
    /// How long a transaction waits for the peer's reply.
    pub reply_timeout: Duration,
}

impl Default for UdsWire {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(25),
            reply_timeout: Duration::from_secs(1),
        }
    }
}

impl Wire for UdsWire {
    type Conn = UdsConn;

    fn connect(&self, name: &str) -> Result<UdsConn> {
        let path = socket_path(name)?;
        match UnixStream::connect(&path) {
            Ok(stream) => {
                debug!(?path, "connected to endpoint");
                UdsConn::attached(stream, self, None)
            }
            Err(err) => Err(match err.kind() {
                ErrorKind::NotFound => TransportError::NotFound {
                    name: name.to_string(),
                },
                ErrorKind::ConnectionRefused | ErrorKind::WouldBlock => TransportError::Busy {
                    name: name.to_string(),
                },
                _ => TransportError::Io(err),
            }),
        }
    }

    fn create(&self, name: &str) -> Result<UdsConn> {
        let path = socket_path(name)?;

        // Remove a stale socket if one exists, but never remove other files.
        if path.exists() {
            let metadata = std::fs::symlink_metadata(&path)?;
            if metadata.file_type().is_socket() {
                debug!(?path, "removing stale socket");
                std::fs::remove_file(&path)?;
            } else {
                return Err(TransportError::Io(std::io::Error::new(
                    ErrorKind::AlreadyExists,
                    "existing path is not a unix socket",
                )));
            }
        }

        let listener = match UnixListener::bind(&path) {
            Ok(listener) => listener,
            Err(err) if err.kind() == ErrorKind::AddrInUse => {
                return Err(TransportError::Busy {
                    name: name.to_string(),
                })
            }
            Err(err) => return Err(TransportError::Io(err)),
        };
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(SOCKET_MODE))?;
        listener.set_nonblocking(true)?;

        info!(?path, "created endpoint, awaiting peer");
        Ok(UdsConn::listening(listener, path, self))
    }
}

/// A connected (or peer-awaiting) UDS endpoint.
pub struct UdsConn {
    listener: Mutex<Option<UnixListener>>,
    reader: Mutex<Option<MessageReader<UnixStream>>>,
    writer: Mutex<Option<UnixStream>>,
    reply_slot: Mutex<Option<Vec<u8>>>,
    reply_ready: Condvar,
    poll_interval: Duration,
    reply_timeout: Duration,
    /// Socket file owned by the creator side, removed on close.
    created_path: Option<PathBuf>,
    closed: AtomicBool,
}

impl UdsConn {
    fn attached(stream: UnixStream, wire: &UdsWire, created_path: Option<PathBuf>) -> Result<Self> {
        let (reader, writer) = Self::split(stream, wire.poll_interval)?;
        Ok(Self {
            listener: Mutex::new(None),
            reader: Mutex::new(Some(reader)),
            writer: Mutex::new(Some(writer)),
            reply_slot: Mutex::new(None),
            reply_ready: Condvar::new(),
            poll_interval: wire.poll_interval,
            reply_timeout: wire.reply_timeout,
            created_path,
            closed: AtomicBool::new(false),
        })
    }

    fn listening(listener: UnixListener, path: PathBuf, wire: &UdsWire) -> Self {
        Self {
            listener: Mutex::new(Some(listener)),
            reader: Mutex::new(None),
            writer: Mutex::new(None),
            reply_slot: Mutex::new(None),
            reply_ready: Condvar::new(),
            poll_interval: wire.poll_interval,
            reply_timeout: wire.reply_timeout,
            created_path: Some(path),
            closed: AtomicBool::new(false),
        }
    }

    fn split(
        stream: UnixStream,
        poll_interval: Duration,
    ) -> Result<(MessageReader<UnixStream>, UnixStream)> {
        let read_half = stream.try_clone()?;
        read_half.set_read_timeout(Some(poll_interval))?;
        Ok((MessageReader::new(read_half), stream))
    }

    fn complete_reply(&self, reply: Vec<u8>) {
        let mut slot = self.reply_slot.lock().expect("reply slot poisoned");
        *slot = Some(reply);
        self.reply_ready.notify_all();
    }

    /// Peer-is-gone write failures; the caller's retry logic owns these.
    fn is_peer_gone(err: &TransportError) -> bool {
        match err {
            TransportError::Broken(_) => true,
            TransportError::Io(io) => matches!(
                io.kind(),
                ErrorKind::BrokenPipe | ErrorKind::ConnectionReset | ErrorKind::NotConnected
            ),
            _ => false,
        }
    }
}

impl Conn for UdsConn {
    fn poll_attached(&self) -> Result<bool> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        if self.reader.lock().expect("reader poisoned").is_some() {
            return Ok(true);
        }

        let mut guard = self.listener.lock().expect("listener poisoned");
        let Some(listener) = guard.as_ref() else {
            return Err(TransportError::Broken("endpoint has no listener"));
        };
        match listener.accept() {
            Ok((stream, _addr)) => {
                // Accepted sockets may inherit the listener's non-blocking flag.
                stream.set_nonblocking(false)?;
                let (reader, writer) = Self::split(stream, self.poll_interval)?;
                *self.reader.lock().expect("reader poisoned") = Some(reader);
                *self.writer.lock().expect("writer poisoned") = Some(writer);
                // Single-instance endpoint: no further peers.
                *guard = None;
                debug!("peer attached");
                Ok(true)
            }
            Err(err) if err.kind() == ErrorKind::WouldBlock => Ok(false),
            Err(err) => Err(TransportError::Io(err)),
        }
    }

    fn read(&self, buf: &mut [u8]) -> Result<ReadEvent> {
        if self.closed.load(Ordering::SeqCst) {
            return Ok(ReadEvent::Closed);
        }
        let mut guard = self.reader.lock().expect("reader poisoned");
        let Some(reader) = guard.as_mut() else {
            return Ok(ReadEvent::Idle);
        };
        reader.next_event(buf, &mut |reply| self.complete_reply(reply))
    }

    fn write(&self, bytes: &[u8]) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        let mut guard = self.writer.lock().expect("writer poisoned");
        let Some(stream) = guard.as_mut() else {
            return Err(TransportError::Broken("no peer attached"));
        };
        write_chunk(stream, KIND_DATA, bytes)
    }

    fn reply(&self, bytes: &[u8]) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        let mut guard = self.writer.lock().expect("writer poisoned");
        let Some(stream) = guard.as_mut() else {
            return Err(TransportError::Broken("no peer attached"));
        };
        write_chunk(stream, KIND_REPLY, bytes)
    }

    fn transact(&self, bytes: &[u8], max_reply: usize) -> Result<Vec<u8>> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }

        // Discard any reply left over from a timed-out transaction.
        *self.reply_slot.lock().expect("reply slot poisoned") = None;

        {
            let mut guard = self.writer.lock().expect("writer poisoned");
            let Some(stream) = guard.as_mut() else {
                return Ok(Vec::new());
            };
            match write_chunk(stream, KIND_DATA, bytes) {
                Ok(()) => {}
                Err(err) if Self::is_peer_gone(&err) => return Ok(Vec::new()),
                Err(err) => return Err(err),
            }
        }

        let slot = self.reply_slot.lock().expect("reply slot poisoned");
        let (mut slot, _timeout) = self
            .reply_ready
            .wait_timeout_while(slot, self.reply_timeout, |slot| {
                slot.is_none() && !self.closed.load(Ordering::SeqCst)
            })
            .expect("reply slot poisoned");

        let mut reply = slot.take().unwrap_or_default();
        reply.truncate(max_reply);
        Ok(reply)
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(stream) = self.writer.lock().expect("writer poisoned").take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
        *self.listener.lock().expect("listener poisoned") = None;
        self.reply_ready.notify_all();
        if let Some(path) = &self.created_path {
            let _ = std::fs::remove_file(path);
        }
        debug!("endpoint closed");
    }
}

impl Drop for UdsConn {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for UdsConn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UdsConn")
            .field("closed", &self.closed.load(Ordering::SeqCst))
            .field("created_path", &self.created_path)
            .finish()
    }
}

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use pipebus_frame::{decode_ack, decode_frame, encode_ack, encode_frame, FrameConfig, MAX_ACK_LEN};
use pipebus_transport::{Conn, ReadEvent, TransportError, Wire};
#[cfg(unix)]
use pipebus_transport::UdsWire;
use tracing::{debug, trace, warn};

use crate::config::ChannelConfig;
use crate::dispatch::dispatch;
use crate::error::{ChannelError, Result};
use crate::registry::SubscriptionRegistry;
use crate::state::{ChannelState, StateCell};
use crate::stats::{ChannelStats, StatsSnapshot};

/// Buffer handed to the transport per read; messages larger than this
/// arrive in pieces.
const READ_BUF_LEN: usize = 1024;

/// Sleep between attach polls while the creator waits for a peer.
const ATTACH_POLL: Duration = Duration::from_millis(10);

/// Bounded tight loop for "busy" signals during connect.
const BUSY_RETRY_LIMIT: u32 = 64;
const BUSY_RETRY_DELAY: Duration = Duration::from_millis(1);

/// A named topic publish/subscribe channel between two local processes.
///
/// On construction the channel connects to an existing endpoint of the
/// given name, or creates one and waits for a peer. A dedicated thread
/// then receives frames, routes them to subscribed callbacks, and
/// acknowledges each consumed frame back to the sender.
pub struct Channel<W: Wire> {
    wire: W,
    config: ChannelConfig,
    frame_config: FrameConfig,
    name: Mutex<String>,
    registry: Arc<SubscriptionRegistry>,
    stats: Arc<ChannelStats>,
    state: StateCell,
    conn: Mutex<Option<Arc<W::Conn>>>,
    loop_ctl: Mutex<Option<ReceiveLoop>>,
}

struct ReceiveLoop {
    stop: Arc<AtomicBool>,
    handle: thread::JoinHandle<()>,
}

#[cfg(unix)]
impl Channel<UdsWire> {
    /// Open a channel on the default Unix transport with default config.
    pub fn open(name: &str) -> Result<Self> {
        Self::open_with_config(name, ChannelConfig::default())
    }

    /// Open a channel on the default Unix transport.
    pub fn open_with_config(name: &str, config: ChannelConfig) -> Result<Self> {
        Self::with_wire(UdsWire::default(), name, config)
    }
}

impl<W: Wire> Channel<W> {
    /// Open a channel over an explicit transport.
    pub fn with_wire(wire: W, name: &str, config: ChannelConfig) -> Result<Self> {
        let frame_config = config.frame_config();
        frame_config.validate()?;

        let channel = Self {
            wire,
            config,
            frame_config,
            name: Mutex::new(name.to_string()),
            registry: Arc::new(SubscriptionRegistry::new()),
            stats: Arc::new(ChannelStats::default()),
            state: StateCell::new(),
            conn: Mutex::new(None),
            loop_ctl: Mutex::new(None),
        };

        let conn = channel.establish(name)?;
        *channel.conn.lock().expect("conn lock poisoned") = Some(Arc::clone(&conn));
        channel.start_loop(conn, name)?;
        Ok(channel)
    }

    /// Connect-then-create. Only total failure is fatal.
    fn establish(&self, name: &str) -> Result<Arc<W::Conn>> {
        self.state.set(ChannelState::Connecting);

        let mut busy_attempts = 0u32;
        let conn = loop {
            match self.wire.connect(name) {
                Ok(conn) => {
                    debug!(name, "connected to existing endpoint");
                    break conn;
                }
                Err(TransportError::Busy { .. }) if busy_attempts < BUSY_RETRY_LIMIT => {
                    busy_attempts += 1;
                    thread::sleep(BUSY_RETRY_DELAY);
                }
                Err(err) => {
                    debug!(name, %err, "connect failed, creating endpoint");
                    match self.wire.create(name) {
                        Ok(conn) => break conn,
                        Err(source) => {
                            return Err(ChannelError::Unavailable {
                                name: name.to_string(),
                                source,
                            })
                        }
                    }
                }
            }
        };

        self.state.set(ChannelState::Connected);
        Ok(Arc::new(conn))
    }

    fn start_loop(&self, conn: Arc<W::Conn>, name: &str) -> Result<()> {
        let stop = Arc::new(AtomicBool::new(false));
        let ctx = LoopCtx {
            conn,
            registry: Arc::clone(&self.registry),
            stats: Arc::clone(&self.stats),
            frame_config: self.frame_config.clone(),
            stop: Arc::clone(&stop),
        };

        let handle = thread::Builder::new()
            .name(format!("pipebus-recv-{name}"))
            .spawn(move || receive_loop(ctx))
            .map_err(|err| {
                if let Some(conn) = self.conn.lock().expect("conn lock poisoned").take() {
                    conn.close();
                }
                self.state.set(ChannelState::Closed);
                ChannelError::Unavailable {
                    name: name.to_string(),
                    source: TransportError::Io(err),
                }
            })?;

        *self.loop_ctl.lock().expect("loop lock poisoned") = Some(ReceiveLoop { stop, handle });
        self.state.set(ChannelState::Running);
        Ok(())
    }

    /// Bind `topic` to `callback`, replacing any existing binding.
    pub fn subscribe<F>(&self, topic: impl Into<String>, callback: F)
    where
        F: Fn(Bytes) + Send + Sync + 'static,
    {
        self.registry.subscribe(topic, callback);
    }

    /// Remove the binding for `topic`. Returns true if one existed.
    pub fn unsubscribe(&self, topic: &str) -> bool {
        self.registry.unsubscribe(topic)
    }

    /// Send a message and wait for the receiver's acknowledgment.
    ///
    /// Returns `Ok(true)` once a reply matches the frame's byte length,
    /// `Ok(false)` when every attempt went unconfirmed. Blocks for up to
    /// `(retries + 1) × (reply timeout + retry delay)`; must not be
    /// called from a subscriber callback of the same transport, which
    /// only supports one transaction at a time.
    pub fn post_message(&self, topic: &str, payload: &[u8]) -> Result<bool> {
        let conn = {
            let guard = self.conn.lock().expect("conn lock poisoned");
            guard.as_ref().cloned().ok_or(ChannelError::Closed)?
        };

        let frame = encode_frame(topic, payload, &self.frame_config)?;
        let expected = frame.len() as u64;

        let attempts = self.config.retries.saturating_add(1);
        for attempt in 1..=attempts {
            match conn.transact(&frame, MAX_ACK_LEN) {
                Ok(reply) => {
                    if decode_ack(&reply) == Some(expected) {
                        trace!(topic, attempt, "delivery confirmed");
                        self.stats.mark_confirmed();
                        return Ok(true);
                    }
                    debug!(topic, attempt, reply_len = reply.len(), "acknowledgment mismatch");
                }
                Err(err) => debug!(topic, attempt, %err, "transaction failed"),
            }
            if attempt < attempts {
                thread::sleep(self.config.retry_delay);
            }
        }

        self.stats.mark_unconfirmed();
        warn!(topic, attempts, "delivery unconfirmed after retries");
        Ok(false)
    }

    /// Re-point the channel at a new endpoint name.
    ///
    /// Stops the receive loop, closes the current connection, and runs
    /// the same connect-then-create sequence under the new name. Total
    /// failure closes the channel and surfaces as
    /// [`ChannelError::Unavailable`].
    pub fn rebind(&self, name: &str) -> Result<()> {
        if matches!(
            self.state.get(),
            ChannelState::Closing | ChannelState::Closed
        ) {
            return Err(ChannelError::Closed);
        }

        self.stop_loop();
        if let Some(conn) = self.conn.lock().expect("conn lock poisoned").take() {
            conn.close();
        }

        let conn = match self.establish(name) {
            Ok(conn) => conn,
            Err(err) => {
                self.state.set(ChannelState::Closed);
                return Err(err);
            }
        };
        *self.conn.lock().expect("conn lock poisoned") = Some(Arc::clone(&conn));
        *self.name.lock().expect("name lock poisoned") = name.to_string();
        self.start_loop(conn, name)
    }

    /// Tear the channel down: stop the receive loop, wait for it to
    /// finish, then close the transport connection. Idempotent.
    pub fn close(&self) {
        if matches!(
            self.state.get(),
            ChannelState::Closing | ChannelState::Closed
        ) {
            return;
        }
        self.state.set(ChannelState::Closing);
        self.stop_loop();
        if let Some(conn) = self.conn.lock().expect("conn lock poisoned").take() {
            conn.close();
        }
        self.state.set(ChannelState::Closed);
    }

    /// Request a stop and block until the loop thread has exited. The
    /// join is the "finished" signal; the connection stays open until
    /// the loop can no longer touch it.
    fn stop_loop(&self) {
        let ctl = self.loop_ctl.lock().expect("loop lock poisoned").take();
        if let Some(ctl) = ctl {
            ctl.stop.store(true, Ordering::SeqCst);
            if ctl.handle.join().is_err() {
                warn!("receive loop panicked");
            }
        }
    }

    /// Current endpoint name.
    pub fn name(&self) -> String {
        self.name.lock().expect("name lock poisoned").clone()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ChannelState {
        self.state.get()
    }

    /// Counters for received frames, drops, and delivery outcomes.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }
}

impl<W: Wire> Drop for Channel<W> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<W: Wire> std::fmt::Debug for Channel<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("name", &self.name())
            .field("state", &self.state.get())
            .field("topics", &self.registry.len())
            .finish()
    }
}

struct LoopCtx<C: Conn> {
    conn: Arc<C>,
    registry: Arc<SubscriptionRegistry>,
    stats: Arc<ChannelStats>,
    frame_config: FrameConfig,
    stop: Arc<AtomicBool>,
}

/// The receive loop: accumulate a frame, dispatch it, acknowledge it.
///
/// Runs until a stop is requested or the transport breaks. Recoverable
/// conditions are absorbed here; the loop never exits over a bad frame.
fn receive_loop<C: Conn>(ctx: LoopCtx<C>) {
    // A creator endpoint attaches when its peer connects.
    while !ctx.stop.load(Ordering::SeqCst) {
        match ctx.conn.poll_attached() {
            Ok(true) => break,
            Ok(false) => thread::sleep(ATTACH_POLL),
            Err(err) => {
                warn!(%err, "endpoint unusable before peer attached");
                return;
            }
        }
    }

    let mut read_buf = [0u8; READ_BUF_LEN];
    let mut frame_buf = BytesMut::new();

    while !ctx.stop.load(Ordering::SeqCst) {
        match ctx.conn.read(&mut read_buf) {
            Ok(ReadEvent::Data { len, more }) => {
                frame_buf.extend_from_slice(&read_buf[..len]);
                if more {
                    continue;
                }
                let wire = frame_buf.split().freeze();
                consume_frame(&ctx, &wire);
            }
            Ok(ReadEvent::Idle) => continue,
            Ok(ReadEvent::Closed) => {
                debug!("peer closed, receive loop exiting");
                return;
            }
            Err(err) => {
                warn!(%err, "transport broken, receive loop exiting");
                return;
            }
        }
    }
}

fn consume_frame<C: Conn>(ctx: &LoopCtx<C>, wire: &Bytes) {
    ctx.stats.mark_frame();

    let (topic, payload) = match decode_frame(wire, &ctx.frame_config) {
        Ok(frame) => (frame.topic, frame.payload),
        Err(err) => {
            // Undecodable frames go unacknowledged: the sender must not
            // take them as delivered.
            ctx.stats.mark_malformed();
            debug!(%err, "dropping undecodable frame");
            return;
        }
    };

    match ctx.registry.get(&topic) {
        Some(callback) => dispatch(&topic, callback, payload, &ctx.stats),
        None => {
            ctx.stats.mark_miss();
            warn!(topic = %topic, "no subscriber for topic");
        }
    }

    // Consumed, with or without a subscriber: acknowledge the frame.
    let ack = encode_ack(wire.len());
    match ctx.conn.reply(&ack) {
        Ok(()) => ctx.stats.mark_ack(),
        Err(err) => debug!(%err, "failed to write acknowledgment"),
    }
}

//! Internal chunk layer for stream sockets.
//!
//! Unix domain stream sockets do not preserve message boundaries, so each
//! message travels as a chunk: a kind byte, a 4-byte little-endian length,
//! then the body. The layer is invisible above the [`crate::Conn`]
//! contract: callers see whole messages, the way a message-mode pipe
//! would deliver them.

use std::io::{ErrorKind, Write};

use bytes::{BufMut, BytesMut};

use crate::error::{Result, TransportError};

/// Chunk header: kind (1) + length (4) = 5 bytes.
pub const CHUNK_HEADER: usize = 5;

/// Chunk kind: application message ("D").
pub const KIND_DATA: u8 = 0x44;

/// Chunk kind: transaction reply ("R").
pub const KIND_REPLY: u8 = 0x52;

/// Maximum chunk body accepted from the wire: 16 MiB.
pub const MAX_CHUNK_BODY: usize = 16 * 1024 * 1024;

/// A parsed chunk header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub kind: u8,
    pub len: usize,
}

/// Encode a chunk (header + body) into `dst`.
pub fn encode_chunk(kind: u8, body: &[u8], dst: &mut BytesMut) -> Result<()> {
    if body.len() > MAX_CHUNK_BODY {
        return Err(TransportError::Broken("outbound chunk exceeds size cap"));
    }
    dst.reserve(CHUNK_HEADER + body.len());
    dst.put_u8(kind);
    dst.put_u32_le(body.len() as u32);
    dst.put_slice(body);
    Ok(())
}

/// Parse a chunk header from the front of `src` without consuming it.
///
/// Returns `Ok(None)` if fewer than [`CHUNK_HEADER`] bytes are buffered.
pub fn peek_header(src: &[u8]) -> Result<Option<ChunkHeader>> {
    if src.len() < CHUNK_HEADER {
        return Ok(None);
    }
    let kind = src[0];
    if kind != KIND_DATA && kind != KIND_REPLY {
        return Err(TransportError::Broken("invalid chunk kind on wire"));
    }
    let len = u32::from_le_bytes(src[1..CHUNK_HEADER].try_into().unwrap()) as usize;
    if len > MAX_CHUNK_BODY {
        return Err(TransportError::Broken("inbound chunk exceeds size cap"));
    }
    Ok(Some(ChunkHeader { kind, len }))
}

/// Write a whole chunk to a stream, retrying short and interrupted writes.
pub fn write_chunk<W: Write>(stream: &mut W, kind: u8, body: &[u8]) -> Result<()> {
    let mut wire = BytesMut::with_capacity(CHUNK_HEADER + body.len());
    encode_chunk(kind, body, &mut wire)?;

    let mut offset = 0usize;
    while offset < wire.len() {
        match stream.write(&wire[offset..]) {
            Ok(0) => return Err(TransportError::Broken("peer closed during write")),
            Ok(n) => offset += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
            Err(err) => return Err(TransportError::Io(err)),
        }
    }

    loop {
        match stream.flush() {
            Ok(()) => return Ok(()),
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
            Err(err) => return Err(TransportError::Io(err)),
        }
    }
}

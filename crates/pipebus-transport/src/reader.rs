use std::io::{ErrorKind, Read};

use bytes::{Buf, BytesMut};

use crate::chunk::{peek_header, CHUNK_HEADER, KIND_DATA, KIND_REPLY};
use crate::error::{Result, TransportError};
use crate::traits::ReadEvent;

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Demultiplexes chunks from any `Read` stream.
///
/// Data chunks surface as [`ReadEvent::Data`], delivered in pieces sized
/// to the caller's buffer. Reply chunks never reach the caller; they are
/// handed to `on_reply` so an in-flight transaction can be completed
/// from the read path.
pub struct MessageReader<R> {
    inner: R,
    buf: BytesMut,
    /// Bytes of the current data message not yet delivered to the caller.
    pending: Option<usize>,
}

impl<R: Read> MessageReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            pending: None,
        }
    }

    /// Pump the stream until something happens: part of a data message is
    /// delivered, the poll interval elapses, or the stream ends.
    pub fn next_event(
        &mut self,
        out: &mut [u8],
        on_reply: &mut dyn FnMut(Vec<u8>),
    ) -> Result<ReadEvent> {
        loop {
            if let Some(remaining) = self.pending {
                let take = remaining.min(self.buf.len()).min(out.len());
                if take > 0 {
                    out[..take].copy_from_slice(&self.buf[..take]);
                    self.buf.advance(take);
                    let left = remaining - take;
                    self.pending = if left == 0 { None } else { Some(left) };
                    return Ok(ReadEvent::Data {
                        len: take,
                        more: left > 0,
                    });
                }
            } else if let Some(header) = peek_header(&self.buf)? {
                match header.kind {
                    KIND_DATA => {
                        self.buf.advance(CHUNK_HEADER);
                        if header.len == 0 {
                            return Ok(ReadEvent::Data { len: 0, more: false });
                        }
                        self.pending = Some(header.len);
                        continue;
                    }
                    // A reply is routed whole; wait for its full body.
                    KIND_REPLY if self.buf.len() >= CHUNK_HEADER + header.len => {
                        self.buf.advance(CHUNK_HEADER);
                        let body = self.buf.split_to(header.len);
                        on_reply(body.to_vec());
                        continue;
                    }
                    _ => {}
                }
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            match self.inner.read(&mut chunk) {
                Ok(0) => return Ok(ReadEvent::Closed),
                Ok(n) => self.buf.extend_from_slice(&chunk[..n]),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err)
                    if err.kind() == ErrorKind::WouldBlock || err.kind() == ErrorKind::TimedOut =>
                {
                    return Ok(ReadEvent::Idle)
                }
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::chunk::encode_chunk;

    fn no_reply(_: Vec<u8>) {
        panic!("unexpected reply chunk");
    }

    #[test]
    fn single_message_in_one_read() {
        let mut wire = BytesMut::new();
        encode_chunk(KIND_DATA, b"hello", &mut wire).unwrap();

        let mut reader = MessageReader::new(Cursor::new(wire.to_vec()));
        let mut out = [0u8; 64];
        let event = reader.next_event(&mut out, &mut no_reply).unwrap();

        assert_eq!(event, ReadEvent::Data { len: 5, more: false });
        assert_eq!(&out[..5], b"hello");
    }

    #[test]
    fn message_larger_than_caller_buffer_reports_more() {
        let body = vec![0xABu8; 100];
        let mut wire = BytesMut::new();
        encode_chunk(KIND_DATA, &body, &mut wire).unwrap();

        let mut reader = MessageReader::new(Cursor::new(wire.to_vec()));
        let mut out = [0u8; 16];
        let mut collected = Vec::new();

        loop {
            match reader.next_event(&mut out, &mut no_reply).unwrap() {
                ReadEvent::Data { len, more } => {
                    collected.extend_from_slice(&out[..len]);
                    if !more {
                        break;
                    }
                }
                other => panic!("unexpected event: {other:?}"),
            }
        }

        assert_eq!(collected, body);
    }

    #[test]
    fn reply_chunks_are_routed_not_delivered() {
        let mut wire = BytesMut::new();
        encode_chunk(KIND_REPLY, b"12", &mut wire).unwrap();
        encode_chunk(KIND_DATA, b"payload", &mut wire).unwrap();

        let mut reader = MessageReader::new(Cursor::new(wire.to_vec()));
        let mut replies = Vec::new();
        let mut out = [0u8; 64];

        let event = reader
            .next_event(&mut out, &mut |r| replies.push(r))
            .unwrap();

        assert_eq!(event, ReadEvent::Data { len: 7, more: false });
        assert_eq!(replies, vec![b"12".to_vec()]);
    }

    #[test]
    fn byte_by_byte_stream_still_assembles() {
        struct ByteByByte {
            bytes: Vec<u8>,
            pos: usize,
        }

        impl Read for ByteByByte {
            fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
                if self.pos >= self.bytes.len() || buf.is_empty() {
                    return Ok(0);
                }
                buf[0] = self.bytes[self.pos];
                self.pos += 1;
                Ok(1)
            }
        }

        let mut wire = BytesMut::new();
        encode_chunk(KIND_DATA, b"slow", &mut wire).unwrap();

        let mut reader = MessageReader::new(ByteByByte {
            bytes: wire.to_vec(),
            pos: 0,
        });
        let mut out = [0u8; 64];
        let event = reader.next_event(&mut out, &mut no_reply).unwrap();

        assert_eq!(event, ReadEvent::Data { len: 4, more: false });
        assert_eq!(&out[..4], b"slow");
    }

    #[test]
    fn eof_is_closed() {
        let mut reader = MessageReader::new(Cursor::new(Vec::<u8>::new()));
        let mut out = [0u8; 8];
        assert_eq!(
            reader.next_event(&mut out, &mut no_reply).unwrap(),
            ReadEvent::Closed
        );
    }

    #[test]
    fn would_block_is_idle_and_state_survives() {
        struct StutteringReader {
            chunks: Vec<Option<Vec<u8>>>,
        }

        impl Read for StutteringReader {
            fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
                if self.chunks.is_empty() {
                    return Ok(0);
                }
                match self.chunks.remove(0) {
                    None => Err(std::io::Error::from(ErrorKind::WouldBlock)),
                    Some(bytes) => {
                        buf[..bytes.len()].copy_from_slice(&bytes);
                        Ok(bytes.len())
                    }
                }
            }
        }

        let mut wire = BytesMut::new();
        encode_chunk(KIND_DATA, b"resume", &mut wire).unwrap();
        let wire = wire.to_vec();
        let (first, second) = wire.split_at(3);

        let mut reader = MessageReader::new(StutteringReader {
            chunks: vec![Some(first.to_vec()), None, Some(second.to_vec())],
        });
        let mut out = [0u8; 64];

        assert_eq!(
            reader.next_event(&mut out, &mut no_reply).unwrap(),
            ReadEvent::Idle
        );
        let event = reader.next_event(&mut out, &mut no_reply).unwrap();
        assert_eq!(event, ReadEvent::Data { len: 6, more: false });
        assert_eq!(&out[..6], b"resume");
    }

    #[test]
    fn interrupted_read_retries() {
        struct InterruptedThenData {
            hit: bool,
            bytes: Vec<u8>,
        }

        impl Read for InterruptedThenData {
            fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
                if !self.hit {
                    self.hit = true;
                    return Err(std::io::Error::from(ErrorKind::Interrupted));
                }
                if self.bytes.is_empty() {
                    return Ok(0);
                }
                let n = self.bytes.len().min(buf.len());
                buf[..n].copy_from_slice(&self.bytes[..n]);
                self.bytes.drain(..n);
                Ok(n)
            }
        }

        let mut wire = BytesMut::new();
        encode_chunk(KIND_DATA, b"ok", &mut wire).unwrap();

        let mut reader = MessageReader::new(InterruptedThenData {
            hit: false,
            bytes: wire.to_vec(),
        });
        let mut out = [0u8; 8];
        let event = reader.next_event(&mut out, &mut no_reply).unwrap();
        assert_eq!(event, ReadEvent::Data { len: 2, more: false });
    }

    #[test]
    fn garbage_on_wire_is_broken() {
        let mut reader = MessageReader::new(Cursor::new(vec![0x00u8; 16]));
        let mut out = [0u8; 8];
        let err = reader.next_event(&mut out, &mut no_reply).unwrap_err();
        assert!(matches!(err, TransportError::Broken(_)));
    }
}

use bytes::{BufMut, Bytes, BytesMut};
use tracing::trace;

use crate::error::{FrameError, Result};

/// Default delimiter between topic and payload.
pub const DEFAULT_DELIMITER: u8 = b':';

/// Default maximum payload size: 64 KiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 64 * 1024;

/// Configuration for the frame codec.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Delimiter byte between topic and payload. Must be ASCII.
    pub delimiter: u8,
    /// Maximum payload size in bytes.
    pub max_payload: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER,
            max_payload: DEFAULT_MAX_PAYLOAD,
        }
    }
}

impl FrameConfig {
    /// Reject a delimiter outside the ASCII range.
    pub fn validate(&self) -> Result<()> {
        if !self.delimiter.is_ascii() {
            return Err(FrameError::DelimiterNotAscii(self.delimiter));
        }
        Ok(())
    }
}

/// A decoded topic-routed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Routing key. Never contains the delimiter.
    pub topic: String,
    /// Opaque payload bytes.
    pub payload: Bytes,
}

impl Frame {
    pub fn new(topic: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }

    /// The total wire size of this frame (topic + delimiter + payload).
    pub fn wire_size(&self) -> usize {
        self.topic.len() + 1 + self.payload.len()
    }
}

/// Encode a frame into the wire format.
///
/// Wire format: `<topic-bytes><delimiter-byte><payload-bytes>`, no length
/// prefix. The delimiter is the sole separator, so a topic containing it
/// is rejected rather than silently truncated on the far side.
pub fn encode_frame(topic: &str, payload: &[u8], config: &FrameConfig) -> Result<Bytes> {
    if topic.as_bytes().contains(&config.delimiter) {
        return Err(FrameError::TopicContainsDelimiter {
            topic: topic.to_string(),
            delimiter: config.delimiter as char,
        });
    }
    if payload.len() > config.max_payload {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: config.max_payload,
        });
    }

    let mut wire = BytesMut::with_capacity(topic.len() + 1 + payload.len());
    wire.put_slice(topic.as_bytes());
    wire.put_u8(config.delimiter);
    wire.put_slice(payload);
    Ok(wire.freeze())
}

/// Decode a frame from an accumulated wire buffer.
///
/// Splits on the first occurrence of the delimiter; everything after it
/// is payload, including further delimiter bytes.
pub fn decode_frame(wire: &[u8], config: &FrameConfig) -> Result<Frame> {
    let split = wire
        .iter()
        .position(|&b| b == config.delimiter)
        .ok_or(FrameError::MalformedFrame {
            reason: "no delimiter",
        })?;

    let topic = std::str::from_utf8(&wire[..split]).map_err(|_| FrameError::MalformedFrame {
        reason: "topic is not valid UTF-8",
    })?;
    let payload = &wire[split + 1..];
    if payload.len() > config.max_payload {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: config.max_payload,
        });
    }

    trace!(topic, payload_len = payload.len(), "decoded frame");
    Ok(Frame {
        topic: topic.to_string(),
        payload: Bytes::copy_from_slice(payload),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_roundtrip() {
        let config = FrameConfig::default();
        let wire = encode_frame("Topic1", b"hello", &config).unwrap();
        assert_eq!(wire.as_ref(), b"Topic1:hello");

        let frame = decode_frame(&wire, &config).unwrap();
        assert_eq!(frame.topic, "Topic1");
        assert_eq!(frame.payload.as_ref(), b"hello");
    }

    #[test]
    fn splits_on_first_delimiter_only() {
        let config = FrameConfig::default();
        let frame = decode_frame(b"clock:12:30:45", &config).unwrap();
        assert_eq!(frame.topic, "clock");
        assert_eq!(frame.payload.as_ref(), b"12:30:45");
    }

    #[test]
    fn missing_delimiter_is_malformed() {
        let config = FrameConfig::default();
        let err = decode_frame(b"no delimiter here", &config).unwrap_err();
        assert!(matches!(err, FrameError::MalformedFrame { .. }));
    }

    #[test]
    fn empty_input_is_malformed() {
        let config = FrameConfig::default();
        let err = decode_frame(b"", &config).unwrap_err();
        assert!(matches!(err, FrameError::MalformedFrame { .. }));
    }

    #[test]
    fn topic_with_delimiter_rejected_on_encode() {
        let config = FrameConfig::default();
        let err = encode_frame("bad:topic", b"x", &config).unwrap_err();
        assert!(matches!(err, FrameError::TopicContainsDelimiter { .. }));
    }

    #[test]
    fn custom_delimiter() {
        let config = FrameConfig {
            delimiter: b'|',
            ..FrameConfig::default()
        };
        let wire = encode_frame("with:colon", b"data", &config).unwrap();
        assert_eq!(wire.as_ref(), b"with:colon|data");

        let frame = decode_frame(&wire, &config).unwrap();
        assert_eq!(frame.topic, "with:colon");
        assert_eq!(frame.payload.as_ref(), b"data");
    }

    #[test]
    fn empty_payload_roundtrip() {
        let config = FrameConfig::default();
        let wire = encode_frame("beat", b"", &config).unwrap();
        let frame = decode_frame(&wire, &config).unwrap();
        assert_eq!(frame.topic, "beat");
        assert!(frame.payload.is_empty());
    }

    #[test]
    fn empty_topic_roundtrip() {
        let config = FrameConfig::default();
        let wire = encode_frame("", b"anonymous", &config).unwrap();
        let frame = decode_frame(&wire, &config).unwrap();
        assert_eq!(frame.topic, "");
        assert_eq!(frame.payload.as_ref(), b"anonymous");
    }

    #[test]
    fn non_utf8_topic_is_malformed() {
        let config = FrameConfig::default();
        let err = decode_frame(&[0xFF, 0xFE, b':', b'x'], &config).unwrap_err();
        assert!(matches!(err, FrameError::MalformedFrame { .. }));
    }

    #[test]
    fn oversized_payload_rejected() {
        let config = FrameConfig {
            max_payload: 4,
            ..FrameConfig::default()
        };
        let err = encode_frame("t", b"oversized", &config).unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { .. }));

        let err = decode_frame(b"t:oversized", &config).unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { .. }));
    }

    #[test]
    fn non_ascii_delimiter_rejected_by_validate() {
        let config = FrameConfig {
            delimiter: 0xA9,
            ..FrameConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(FrameError::DelimiterNotAscii(0xA9))
        ));
        assert!(FrameConfig::default().validate().is_ok());
    }

    #[test]
    fn wire_size_matches_encoded_length() {
        let config = FrameConfig::default();
        let frame = Frame::new("Topic1", Bytes::from_static(b"hello"));
        let wire = encode_frame(&frame.topic, &frame.payload, &config).unwrap();
        assert_eq!(frame.wire_size(), wire.len());
        assert_eq!(frame.wire_size(), 12);
    }
}

//! Length acknowledgments.
//!
//! After consuming a frame the receiver writes back the frame's byte
//! length as decimal ASCII digits. The sender confirms delivery by
//! comparing the reply against the number of bytes it wrote; the two
//! sides compute the same number because the ack always covers the
//! complete accumulated frame, never a partial read.

use bytes::Bytes;

/// Upper bound on a well-formed ack: `u64::MAX` has 20 decimal digits.
pub const MAX_ACK_LEN: usize = 20;

/// Encode a frame length as a decimal-ASCII acknowledgment.
pub fn encode_ack(frame_len: usize) -> Bytes {
    Bytes::from(frame_len.to_string())
}

/// Decode an acknowledgment back into a frame length.
///
/// Returns `None` for an empty reply (no peer, or the peer timed out)
/// and for anything that is not a plain decimal number.
pub fn decode_ack(reply: &[u8]) -> Option<u64> {
    if reply.is_empty() || reply.len() > MAX_ACK_LEN {
        return None;
    }
    if !reply.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(reply).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_decimal_ascii() {
        assert_eq!(encode_ack(12).as_ref(), b"12");
        assert_eq!(encode_ack(0).as_ref(), b"0");
    }

    #[test]
    fn roundtrip() {
        assert_eq!(decode_ack(&encode_ack(4096)), Some(4096));
    }

    #[test]
    fn empty_reply_is_none() {
        assert_eq!(decode_ack(b""), None);
    }

    #[test]
    fn junk_is_none() {
        assert_eq!(decode_ack(b"12x"), None);
        assert_eq!(decode_ack(b"-5"), None);
        assert_eq!(decode_ack(b" 12"), None);
    }

    #[test]
    fn overlong_reply_is_none() {
        assert_eq!(decode_ack(&[b'9'; MAX_ACK_LEN + 1]), None);
    }
}

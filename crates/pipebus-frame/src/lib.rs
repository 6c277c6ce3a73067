//! Topic-delimited message framing for pipebus.
//!
//! Every message is framed as `topic<delimiter>payload` with no length
//! prefix; the delimiter is the sole separator. The companion ack codec
//! encodes the decimal frame length the receiver writes back after
//! consuming a frame.

pub mod ack;
pub mod codec;
pub mod error;

pub use ack::{decode_ack, encode_ack, MAX_ACK_LEN};
pub use codec::{
    decode_frame, encode_frame, Frame, FrameConfig, DEFAULT_DELIMITER, DEFAULT_MAX_PAYLOAD,
};
pub use error::{FrameError, Result};

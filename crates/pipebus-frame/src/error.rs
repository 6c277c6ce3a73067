/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The bytes do not form a `topic<delimiter>payload` frame.
    #[error("malformed frame: {reason}")]
    MalformedFrame { reason: &'static str },

    /// The topic contains the delimiter byte and cannot be framed.
    #[error("topic {topic:?} contains the delimiter byte {delimiter:?}")]
    TopicContainsDelimiter { topic: String, delimiter: char },

    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The configured delimiter is not a single ASCII byte.
    #[error("delimiter must be ASCII (got byte {0:#04x})")]
    DelimiterNotAscii(u8),
}

pub type Result<T> = std::result::Result<T, FrameError>;

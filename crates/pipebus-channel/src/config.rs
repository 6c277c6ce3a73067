use std::time::Duration;

use pipebus_frame::{FrameConfig, DEFAULT_DELIMITER, DEFAULT_MAX_PAYLOAD};

/// Channel behavior configuration.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Delimiter byte between topic and payload. Must be ASCII.
    pub delimiter: u8,
    /// Retries after the first delivery attempt. Zero means exactly one
    /// attempt.
    pub retries: u32,
    /// Sleep between delivery attempts.
    pub retry_delay: Duration,
    /// Maximum payload size accepted in either direction.
    pub max_payload: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER,
            retries: 3,
            retry_delay: Duration::from_millis(50),
            max_payload: DEFAULT_MAX_PAYLOAD,
        }
    }
}

impl ChannelConfig {
    pub(crate) fn frame_config(&self) -> FrameConfig {
        FrameConfig {
            delimiter: self.delimiter,
            max_payload: self.max_payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_frame_codec() {
        let config = ChannelConfig::default();
        assert_eq!(config.delimiter, b':');
        assert_eq!(config.retries, 3);
        assert!(config.frame_config().validate().is_ok());
    }
}

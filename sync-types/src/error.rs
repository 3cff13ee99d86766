//! Error types for convo-sync wire handling.

use thiserror::Error;

/// Errors that can occur while encoding or decoding frames.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A frame could not be decoded (malformed JSON or unknown `type`)
    #[error("decode failed: {0}")]
    Decode(#[source] serde_json::Error),

    /// A command could not be encoded
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// Frame decoded but its content is unusable
    #[error("invalid data: {0}")]
    InvalidData(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = SyncError::InvalidData("missing conversation".into());
        assert_eq!(err.to_string(), "invalid data: missing conversation");
    }

    #[test]
    fn decode_error_keeps_source() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = SyncError::Decode(source);
        assert!(err.to_string().starts_with("decode failed"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SyncError>();
    }
}

use thiserror::Error;

/// Errors surfaced by the voice pipeline.
///
/// Construction failures (`DeviceOpen`, `DeviceStart`, `CodecInit`) are fatal
/// to the object being built. Frame-level `Encode`/`Decode` failures are
/// handled inside the pipeline by dropping the frame and only appear here
/// for diagnostics.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VoiceError {
    #[error("couldn't open device: {0}")]
    DeviceOpen(String),

    #[error("couldn't start device: {0}")]
    DeviceStart(String),

    #[error("codec initialization failed: {0}")]
    CodecInit(String),

    /// Wraps the failure that prevented a requested stream from being built.
    /// Only delivered through a creation request's completion callback.
    #[error("stream creation failed: {0}")]
    StreamCreation(Box<VoiceError>),

    #[error("encoding failed: {0}")]
    Encode(String),

    #[error("decoding failed: {0}")]
    Decode(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("configuration failed: {0}")]
    Configuration(String),

    #[error("stream creation queue is full")]
    QueueFull,

    #[error("output engine stopped")]
    EngineStopped,

    #[error("unsupported operation: {0}")]
    Unsupported(String),
}

impl VoiceError {
    /// Returns the underlying cause of a `StreamCreation` error, or `self`.
    pub fn root_cause(&self) -> &VoiceError {
        match self {
            Self::StreamCreation(inner) => inner.root_cause(),
            other => other,
        }
    }
}

/// Errors reported by an audio backend implementation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Another client already owns the audio subsystem.
    #[error("audio subsystem already initialized")]
    AlreadyInitialized,

    #[error("device not available: {0}")]
    DeviceUnavailable(String),

    #[error("backend call failed: {0}")]
    Failed(String),
}

/// Errors reported by codec implementations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("output buffer too small")]
    BufferTooSmall,

    #[error("corrupted packet")]
    CorruptedPacket,

    #[error("codec failure: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_cause_unwraps_nested_creation_errors() {
        let err = VoiceError::StreamCreation(Box::new(VoiceError::StreamCreation(Box::new(
            VoiceError::CodecInit("bad rate".into()),
        ))));

        assert_eq!(err.root_cause(), &VoiceError::CodecInit("bad rate".into()));
    }

    #[test]
    fn display_includes_cause() {
        let err = VoiceError::StreamCreation(Box::new(VoiceError::DeviceOpen("url".into())));
        assert_eq!(
            err.to_string(),
            "stream creation failed: couldn't open device: url"
        );
    }
}

//! Protocol error taxonomy shared by the frame decoder and the command
//! interpreters.

use thiserror::Error;

/// Everything that can go wrong between the socket and the map grid.
///
/// Only stream-level failures tear down the connection; all other variants
/// are logged and the session keeps reading frames.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The stream ended in the middle of a frame.
    #[error("stream ended mid-frame: needed {needed} bytes, got {got}")]
    ShortRead { needed: usize, got: usize },

    /// Transport failure on the underlying socket.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The command name matched no entry in the dispatch table.
    #[error("unknown command {0:?}")]
    UnknownCommand(String),

    /// A command body did not match its expected shape.
    #[error("malformed {command} payload: {reason}")]
    MalformedPayload {
        command: &'static str,
        reason: String,
    },

    /// Darkness value outside [0,255].
    #[error("darkness value {0} out of range")]
    InvalidDarkness(u16),

    /// Layer index outside the fixed layer count.
    #[error("layer {0} out of range")]
    InvalidLayer(usize),

    /// Face pixel data failed to decode; a placeholder was substituted.
    #[error("image data for face {face} failed to decode")]
    ImageDecodeFailure { face: u16 },
}

impl ProtocolError {
    /// Whether this error must tear down the reader loop.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ProtocolError::ShortRead { .. } | ProtocolError::Io(_)
        )
    }

    /// Convenience constructor for payload shape mismatches.
    pub fn malformed(command: &'static str, reason: impl Into<String>) -> Self {
        ProtocolError::MalformedPayload {
            command,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_errors_are_fatal() {
        assert!(
            ProtocolError::ShortRead {
                needed: 10,
                got: 3
            }
            .is_fatal()
        );
        assert!(
            ProtocolError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "eof"
            ))
            .is_fatal()
        );
    }

    #[test]
    fn interpreter_errors_are_recoverable() {
        assert!(!ProtocolError::UnknownCommand("bogus".to_string()).is_fatal());
        assert!(!ProtocolError::malformed("stats", "truncated").is_fatal());
        assert!(!ProtocolError::InvalidDarkness(300).is_fatal());
        assert!(!ProtocolError::InvalidLayer(7).is_fatal());
        assert!(!ProtocolError::ImageDecodeFailure { face: 12 }.is_fatal());
    }
}

//! Error types for bearer operations.

use crate::types::MessageClass;
use std::io;
use thiserror::Error;

/// Errors that can occur during bearer operations.
#[derive(Error, Debug)]
pub enum BearerError {
    /// I/O error reported by the transport.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Unrecognized PDU type in a frame header.
    #[error("Unsupported PDU type: 0x{0:02X}")]
    UnsupportedPduType(u8),

    /// No handler registered for the message class of an inbound PDU.
    #[error("No handler registered for {0:?}")]
    NoHandler(MessageClass),

    /// An inbound segment would exceed the reassembly buffer.
    #[error("Reassembly overflow: segment needs {needed} bytes, {capacity} available")]
    ReassemblyOverflow { needed: usize, capacity: usize },

    /// A continuation or last segment arrived with no reassembly in progress.
    #[error("Orphan segment: no reassembly in progress")]
    OrphanSegment,

    /// A frame without even a header byte.
    #[error("Empty frame")]
    EmptyFrame,

    /// A zero-length PDU was passed to send.
    #[error("Empty PDU")]
    EmptyPdu,

    /// An outbound PDU exceeds the maximum the peer could reassemble.
    #[error("PDU too large: {size} bytes exceeds maximum of {max} bytes")]
    PduTooLarge { size: usize, max: usize },

    /// A send was started while another transfer is still in flight.
    #[error("Transfer already in progress")]
    TransferInProgress,

    /// No link is open.
    #[error("Not connected")]
    NotConnected,

    /// The bearer configuration is unusable.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(&'static str),
}

/// Result type alias for bearer operations.
pub type Result<T> = std::result::Result<T, BearerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BearerError::UnsupportedPduType(0x2A);
        assert_eq!(format!("{err}"), "Unsupported PDU type: 0x2A");

        let err = BearerError::ReassemblyOverflow {
            needed: 30,
            capacity: 12,
        };
        assert_eq!(
            format!("{err}"),
            "Reassembly overflow: segment needs 30 bytes, 12 available"
        );

        let err = BearerError::PduTooLarge { size: 100, max: 66 };
        assert_eq!(
            format!("{err}"),
            "PDU too large: 100 bytes exceeds maximum of 66 bytes"
        );
    }

    #[test]
    fn test_from_io_error() {
        let io_err = io::Error::new(io::ErrorKind::BrokenPipe, "test");
        let err: BearerError = io_err.into();
        assert!(matches!(err, BearerError::Io(_)));
    }
}

//! Inbound proxy PDU reassembly.

use bytes::{Bytes, BytesMut};

use crate::error::{BearerError, Result};
use crate::types::{PduType, SarField};

/// Reassembles segmented proxy PDUs from a stream of inbound frames.
///
/// The reassembler is a pure state machine: it accepts one decoded frame at a
/// time and returns the complete PDU once the terminal frame arrives. Frame
/// ordering is the transport's responsibility; segments of one message must
/// arrive in sequence without duplication.
#[derive(Debug)]
pub struct Reassembler {
    buffer: BytesMut,
    capacity: usize,
    pdu_type: PduType,
    in_progress: bool,
}

impl Reassembler {
    /// Create a reassembler for PDUs of up to `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
            capacity,
            pdu_type: PduType::NetworkPdu,
            in_progress: false,
        }
    }

    /// Feed one decoded frame to the reassembler.
    ///
    /// Returns `Some((pdu_type, pdu))` when the frame completes a message,
    /// `None` when more segments are needed. A continuation or last segment
    /// without a preceding first segment is rejected with
    /// [`BearerError::OrphanSegment`]; a segment that would exceed the
    /// capacity is rejected with [`BearerError::ReassemblyOverflow`] and
    /// discards the partial message.
    pub fn feed(
        &mut self,
        sar: SarField,
        pdu_type: PduType,
        payload: &[u8],
    ) -> Result<Option<(PduType, Bytes)>> {
        match sar {
            SarField::CompleteMessage => {
                // A complete message leaves any partial reassembly untouched
                self.check_capacity(0, payload.len())?;
                Ok(Some((pdu_type, Bytes::copy_from_slice(payload))))
            }
            SarField::FirstSegment => {
                self.buffer.clear();
                self.check_capacity(0, payload.len())?;
                self.buffer.extend_from_slice(payload);
                self.pdu_type = pdu_type;
                self.in_progress = true;
                Ok(None)
            }
            SarField::Continuation => {
                self.append_segment(payload)?;
                Ok(None)
            }
            SarField::LastSegment => {
                self.append_segment(payload)?;
                self.in_progress = false;
                let pdu = self.buffer.split().freeze();
                Ok(Some((self.pdu_type, pdu)))
            }
        }
    }

    /// Number of bytes accumulated for the in-progress message.
    pub fn offset(&self) -> usize {
        self.buffer.len()
    }

    /// Check if a segmented message is being reassembled.
    pub fn is_in_progress(&self) -> bool {
        self.in_progress
    }

    /// Discard any partial reassembly state.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.in_progress = false;
    }

    fn append_segment(&mut self, payload: &[u8]) -> Result<()> {
        if !self.in_progress {
            return Err(BearerError::OrphanSegment);
        }
        if let Err(err) = self.check_capacity(self.buffer.len(), payload.len()) {
            // Partial message is unusable once a segment is dropped
            self.reset();
            return Err(err);
        }
        self.buffer.extend_from_slice(payload);
        Ok(())
    }

    fn check_capacity(&self, offset: usize, payload_len: usize) -> Result<()> {
        if offset + payload_len > self.capacity {
            return Err(BearerError::ReassemblyOverflow {
                needed: payload_len,
                capacity: self.capacity - offset,
            });
        }
        Ok(())
    }
}

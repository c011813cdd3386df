//! Outbound proxy PDU segmentation.

use bytes::Bytes;

use crate::error::{BearerError, Result};
use crate::frame::{FrameHeader, build_frame};
use crate::types::{PduType, SarField};

/// State of an in-flight outbound transfer.
///
/// The source is a shared view of the caller's bytes; nothing is copied until
/// each frame is built. At most one transfer exists at a time.
#[derive(Debug)]
struct OutgoingTransfer {
    source: Bytes,
    pdu_type: PduType,
    offset: usize,
    state: SarField,
}

/// One frame produced by the segmenter.
#[derive(Debug)]
pub struct SegmentFrame {
    /// Wire bytes: header byte followed by the segment payload.
    pub frame: Vec<u8>,
    /// True when this frame finishes the transfer.
    pub complete: bool,
}

/// Drives an outbound PDU out as a sequence of frames, one per send grant.
#[derive(Debug)]
pub struct Segmenter {
    transfer: Option<OutgoingTransfer>,
    max_pdu_size: usize,
}

impl Segmenter {
    /// Create a segmenter for PDUs of up to `max_pdu_size` bytes.
    pub fn new(max_pdu_size: usize) -> Self {
        Self {
            transfer: None,
            max_pdu_size,
        }
    }

    /// Start a transfer.
    ///
    /// Decides the initial SAR state from the PDU length and the current MTU:
    /// a PDU that fits a single frame payload goes out as a complete message,
    /// anything larger starts a segmented transfer.
    pub fn begin(&mut self, pdu_type: PduType, source: Bytes, mtu: usize) -> Result<()> {
        if source.is_empty() {
            return Err(BearerError::EmptyPdu);
        }
        if source.len() > self.max_pdu_size {
            return Err(BearerError::PduTooLarge {
                size: source.len(),
                max: self.max_pdu_size,
            });
        }
        if self.transfer.is_some() {
            return Err(BearerError::TransferInProgress);
        }

        let state = if source.len() <= mtu - 1 {
            SarField::CompleteMessage
        } else {
            SarField::FirstSegment
        };
        self.transfer = Some(OutgoingTransfer {
            source,
            pdu_type,
            offset: 0,
            state,
        });
        Ok(())
    }

    /// Build the next frame of the active transfer.
    ///
    /// The frame's SAR state was fixed when the transfer began or by the
    /// previous call; the state for the following frame is decided here, after
    /// the current one is cut. Returns `None` when no transfer is active.
    pub fn next_frame(&mut self, mtu: usize) -> Option<SegmentFrame> {
        let transfer = self.transfer.as_mut()?;

        let segment_len = (transfer.source.len() - transfer.offset).min(mtu - 1);
        let header = FrameHeader::new(transfer.state, transfer.pdu_type as u8);
        let payload = &transfer.source[transfer.offset..transfer.offset + segment_len];
        let frame = build_frame(header, payload);
        transfer.offset += segment_len;

        let complete = transfer.state.is_terminal();
        if !complete {
            let remaining = transfer.source.len() - transfer.offset;
            transfer.state = if remaining > mtu - 1 {
                SarField::Continuation
            } else {
                SarField::LastSegment
            };
        }
        if complete {
            self.transfer = None;
        }

        Some(SegmentFrame { frame, complete })
    }

    /// Check if a transfer is in flight.
    pub fn is_active(&self) -> bool {
        self.transfer.is_some()
    }

    /// Cancel the active transfer, reporting the PDU type it carried.
    pub fn abort(&mut self) -> Option<PduType> {
        self.transfer.take().map(|transfer| transfer.pdu_type)
    }
}

//! Bluetooth Mesh GATT bearer framing layer.
//!
//! This crate carries mesh control and data messages over a
//! connection-oriented, MTU-limited, half-duplex GATT-style link: it segments
//! arbitrarily sized outbound PDUs into transport-sized frames, reassembles
//! inbound frames back into complete PDUs, and arbitrates fairly among the
//! independent message classes (network PDUs, beacons, a reserved advertising
//! class) competing for the single send opportunity the transport grants at a
//! time.
//!
//! # Features
//!
//! - Proxy PDU segmentation and reassembly with strict buffer bounds
//! - Round-robin send arbitration with bounded-step selection
//! - Zero-copy outbound transfers over [`bytes::Bytes`]
//! - Transport abstraction via the [`BearerTransport`] trait
//! - Single-threaded, event-driven, run-to-completion execution
//!
//! # Example
//!
//! ```no_run
//! use bytes::Bytes;
//! use mesh_bearer_rs::{
//!     BearerEvent, BearerSession, BearerTransport, ConnectionHandle, MessageClass, PduType,
//!     Result,
//! };
//!
//! # struct GattTransport;
//! # impl BearerTransport for GattTransport {
//! #     fn send_frame(&mut self, _: ConnectionHandle, _: &[u8]) -> Result<()> { Ok(()) }
//! #     fn request_send_opportunity(&mut self, _: ConnectionHandle) {}
//! #     fn current_mtu(&self, _: ConnectionHandle) -> usize { 23 }
//! # }
//! # let transport = GattTransport;
//! let mut session = BearerSession::new(transport);
//!
//! // Deliver reassembled network PDUs and claim send grants
//! session.register_handler(MessageClass::MeshMessage, |session, event| match event {
//!     BearerEvent::Received { pdu, .. } => println!("network PDU: {pdu:?}"),
//!     BearerEvent::ReadyToSend => {
//!         session.send(PduType::NetworkPdu, Bytes::from_static(b"...")).ok();
//!     }
//!     BearerEvent::TransferAborted => println!("link closed mid-transfer"),
//! });
//!
//! session.on_link_open(ConnectionHandle(0x0040));
//! session.request_send(MessageClass::MeshMessage).unwrap();
//! ```
//!
//! # Protocol Overview
//!
//! Every frame starts with a one-byte header; the rest is payload:
//!
//! ```text
//! +--------+--------------------------+
//! | SAR(2) |     PDU type (6 bits)    |  (1 byte)
//! +--------+--------------------------+
//! |           Payload ...             |  (up to MTU - 1 bytes)
//! +-----------------------------------+
//! ```
//!
//! The 2-bit SAR field tags a frame as a complete message, first segment,
//! continuation or last segment. Segments of one PDU travel in order over the
//! half-duplex link; at most one outbound transfer and one inbound reassembly
//! are in progress at a time.

pub mod config;
pub mod error;
pub mod frame;
pub mod reassembly;
pub mod scheduler;
pub mod segmentation;
pub mod session;
pub mod transport;
pub mod types;

// Re-export commonly used types at the crate root
pub use config::BearerConfig;
pub use error::{BearerError, Result};
pub use frame::{FRAME_HEADER_SIZE, FrameHeader};
pub use reassembly::Reassembler;
pub use scheduler::SendScheduler;
pub use segmentation::{SegmentFrame, Segmenter};
pub use session::{BearerEvent, BearerSession};
pub use transport::{BearerTransport, ConnectionHandle};
pub use types::{
    DEFAULT_ATT_MTU, MAX_PROXY_PDU_SIZE, MessageClass, NUM_CLASSES, PduType, SarField,
};

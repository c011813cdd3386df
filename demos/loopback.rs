//! Loopback segmentation and reassembly example.
//!
//! This example segments a network PDU through one bearer session, carries
//! the frames over to a second session and reassembles the original message,
//! without a real GATT link.
//!
//! Run with: cargo run --example loopback

use bytes::Bytes;
use mesh_bearer_rs::{
    BearerEvent, BearerSession, BearerTransport, ConnectionHandle, MessageClass, PduType, Result,
};
use std::cell::RefCell;
use std::rc::Rc;

const LINK: ConnectionHandle = ConnectionHandle(0x0040);

/// Records outbound frames instead of driving a radio.
#[derive(Default)]
struct RecordingTransport {
    frames: Vec<Vec<u8>>,
}

impl BearerTransport for RecordingTransport {
    fn send_frame(&mut self, _connection: ConnectionHandle, frame: &[u8]) -> Result<()> {
        self.frames.push(frame.to_vec());
        Ok(())
    }

    fn request_send_opportunity(&mut self, _connection: ConnectionHandle) {}

    fn current_mtu(&self, _connection: ConnectionHandle) -> usize {
        23
    }
}

fn main() {
    println!("=== Mesh Bearer Loopback ===\n");

    // A 30-byte network PDU does not fit one frame at the default ATT MTU of
    // 23, so it goes out segmented as 22 + 8 payload bytes
    let pdu: Vec<u8> = (0..30).collect();
    println!("--- Sender: segmenting a {}-byte network PDU ---", pdu.len());

    let mut sender = BearerSession::new(RecordingTransport::default());
    sender.on_link_open(LINK);

    let outbound = Bytes::from(pdu.clone());
    sender.register_handler(MessageClass::MeshMessage, move |session, event| {
        if let BearerEvent::ReadyToSend = event {
            session.send(PduType::NetworkPdu, outbound.clone()).unwrap();
        }
    });

    sender.request_send(MessageClass::MeshMessage).unwrap();
    sender.on_send_opportunity(LINK);
    while sender.transfer_active() {
        sender.on_send_opportunity(LINK);
    }

    for (index, frame) in sender.transport().frames.iter().enumerate() {
        println!(
            "frame {}: header 0b{:08b}, {} payload bytes",
            index + 1,
            frame[0],
            frame.len() - 1
        );
    }

    println!("\n--- Receiver: reassembling ---");
    let received = Rc::new(RefCell::new(Vec::new()));

    let mut receiver = BearerSession::new(RecordingTransport::default());
    receiver.on_link_open(LINK);
    let sink = Rc::clone(&received);
    receiver.register_handler(MessageClass::MeshMessage, move |_, event| {
        if let BearerEvent::Received { pdu_type, pdu } = event {
            sink.borrow_mut().push((pdu_type, pdu));
        }
    });

    for frame in &sender.transport().frames {
        receiver.on_frame(LINK, frame);
    }

    let received = received.borrow();
    let (pdu_type, reassembled) = &received[0];
    println!("received one {pdu_type:?} PDU, {} bytes", reassembled.len());
    println!(
        "matches original: {}",
        reassembled.as_ref() == pdu.as_slice()
    );
}

//! Send arbitration example.
//!
//! Two message classes keep a PDU queued at all times; the bearer shares the
//! link's send grants between them in round-robin order, so neither class can
//! starve the other.
//!
//! Run with: cargo run --example arbitration

use bytes::Bytes;
use mesh_bearer_rs::{
    BearerEvent, BearerSession, BearerTransport, ConnectionHandle, MessageClass, PduType, Result,
};
use std::cell::RefCell;
use std::rc::Rc;

const LINK: ConnectionHandle = ConnectionHandle(0x0040);

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
    println!("=== Send Arbitration ===\n");

    let grants = Rc::new(RefCell::new(Vec::new()));

    let mut session = BearerSession::new(RecordingTransport::default());
    session.on_link_open(LINK);

    let producers = [
        (
            MessageClass::MeshMessage,
            PduType::NetworkPdu,
            Bytes::from_static(&[0x11; 8]),
        ),
        (
            MessageClass::MeshBeacon,
            PduType::Beacon,
            Bytes::from_static(&[0x22; 8]),
        ),
    ];
    for (class, pdu_type, payload) in producers {
        let sink = Rc::clone(&grants);
        session.register_handler(class, move |session, event| {
            if let BearerEvent::ReadyToSend = event {
                sink.borrow_mut().push(class);
                session.send(pdu_type, payload.clone()).unwrap();
            }
        });
    }

    // Both classes request; each re-requests as soon as it is granted, so
    // the link stays contended for all six opportunities
    session.request_send(MessageClass::MeshMessage).unwrap();
    session.request_send(MessageClass::MeshBeacon).unwrap();

    for _ in 0..6 {
        session.on_send_opportunity(LINK);
        let granted = *grants.borrow().last().unwrap();
        session.request_send(granted).unwrap();
    }

    println!("grant order over six opportunities:");
    for (index, class) in grants.borrow().iter().enumerate() {
        println!("  grant {}: {:?}", index + 1, class);
    }
    println!(
        "\n{} frames went out on the link",
        session.transport().frames.len()
    );
}

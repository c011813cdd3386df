//! Bearer session: dispatch, handler registration and link lifecycle.

use bytes::Bytes;
use log::{debug, error, info, warn};

use crate::config::BearerConfig;
use crate::error::{BearerError, Result};
use crate::frame::split_frame;
use crate::reassembly::Reassembler;
use crate::scheduler::SendScheduler;
use crate::segmentation::Segmenter;
use crate::transport::{BearerTransport, ConnectionHandle};
use crate::types::{MessageClass, NUM_CLASSES, PduType};

/// Event delivered to a class handler.
#[derive(Debug)]
pub enum BearerEvent {
    /// A complete PDU was reassembled for this class.
    Received {
        /// Type decoded from the frame header.
        pdu_type: PduType,
        /// The assembled PDU bytes.
        pdu: Bytes,
    },
    /// This class won the current send opportunity and may call
    /// [`BearerSession::send`] now.
    ReadyToSend,
    /// The link closed while this class's transfer was in flight.
    TransferAborted,
}

type ClassHandler<T> = Box<dyn FnMut(&mut BearerSession<T>, BearerEvent)>;

/// A single-connection, half-duplex bearer session.
///
/// The session owns the transport, the segmentation and reassembly engines,
/// the send scheduler and the per-class handler table. Every entry point runs
/// to completion inside the dispatch of one external event; waiting to send is
/// represented by pending flags satisfied by future grants, never by blocking.
///
/// # Example
///
/// ```no_run
/// use bytes::Bytes;
/// use mesh_bearer_rs::{BearerEvent, BearerSession, MessageClass, PduType};
/// # use mesh_bearer_rs::{BearerTransport, ConnectionHandle, Result};
/// # struct MyTransport;
/// # impl BearerTransport for MyTransport {
/// #     fn send_frame(&mut self, _: ConnectionHandle, _: &[u8]) -> Result<()> { Ok(()) }
/// #     fn request_send_opportunity(&mut self, _: ConnectionHandle) {}
/// #     fn current_mtu(&self, _: ConnectionHandle) -> usize { 23 }
/// # }
/// # let transport = MyTransport;
///
/// let mut session = BearerSession::new(transport);
/// session.register_handler(MessageClass::MeshMessage, |session, event| {
///     if let BearerEvent::ReadyToSend = event {
///         let _ = session.send(PduType::NetworkPdu, Bytes::from_static(b"pdu"));
///     }
/// });
/// session.request_send(MessageClass::MeshMessage).ok();
/// ```
pub struct BearerSession<T: BearerTransport> {
    transport: T,
    config: BearerConfig,
    link: Option<ConnectionHandle>,
    mtu: usize,
    reassembler: Reassembler,
    segmenter: Segmenter,
    scheduler: SendScheduler,
    handlers: [Option<ClassHandler<T>>; NUM_CLASSES],
}

impl<T: BearerTransport> BearerSession<T> {
    /// Create a session with the default configuration.
    pub fn new(transport: T) -> Self {
        // The default configuration always validates
        Self::build(transport, BearerConfig::default())
    }

    /// Create a session with a custom configuration.
    pub fn with_config(transport: T, config: BearerConfig) -> Result<Self> {
        if !config.validate() {
            return Err(BearerError::InvalidConfig(
                "MTU must leave room for a header byte and one payload byte",
            ));
        }
        Ok(Self::build(transport, config))
    }

    fn build(transport: T, config: BearerConfig) -> Self {
        let mtu = config.default_mtu;
        let reassembler = Reassembler::new(config.max_pdu_size);
        let segmenter = Segmenter::new(config.max_pdu_size);
        Self {
            transport,
            config,
            link: None,
            mtu,
            reassembler,
            segmenter,
            scheduler: SendScheduler::new(),
            handlers: std::array::from_fn(|_| None),
        }
    }

    /// Register the handler for a message class, replacing any previous one.
    pub fn register_handler<F>(&mut self, class: MessageClass, handler: F)
    where
        F: FnMut(&mut Self, BearerEvent) + 'static,
    {
        self.handlers[class.index()] = Some(Box::new(handler));
    }

    /// The open connection, if any.
    pub fn link(&self) -> Option<ConnectionHandle> {
        self.link
    }

    /// The MTU in effect for outbound segmentation.
    pub fn mtu(&self) -> usize {
        self.mtu
    }

    /// Check if an outbound transfer is in flight.
    pub fn transfer_active(&self) -> bool {
        self.segmenter.is_active()
    }

    /// Access the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutable access to the transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Ask for a future send opportunity on behalf of a class.
    ///
    /// The class is notified with [`BearerEvent::ReadyToSend`] once the
    /// scheduler grants it an opportunity.
    pub fn request_send(&mut self, class: MessageClass) -> Result<()> {
        let link = self.link.ok_or(BearerError::NotConnected)?;
        self.scheduler.request(class);
        self.transport.request_send_opportunity(link);
        Ok(())
    }

    /// Send a PDU, segmenting it if it exceeds the current MTU.
    ///
    /// Must be called from within a granted [`BearerEvent::ReadyToSend`]
    /// callback: the first frame goes out on the caller's grant, and further
    /// segments are driven by the opportunities this session requests itself.
    /// The source bytes are shared, not copied; the view is released when the
    /// transfer completes or aborts.
    pub fn send(&mut self, pdu_type: PduType, pdu: Bytes) -> Result<()> {
        let link = self.link.ok_or(BearerError::NotConnected)?;
        self.segmenter.begin(pdu_type, pdu, self.mtu)?;
        self.send_next_segment(link)
    }

    /// Cancel the in-flight transfer, if any, reporting the PDU type it
    /// carried. Escape hatch for a stalled peer that never grants again.
    pub fn abort_transfer(&mut self) -> Option<PduType> {
        self.segmenter.abort()
    }

    /// Deliver an inbound frame to the bearer.
    ///
    /// Errors on this path are consumed and logged; a bad frame never tears
    /// down the session.
    pub fn on_frame(&mut self, connection: ConnectionHandle, frame: &[u8]) {
        let Some(link) = self.link else {
            debug!("dropping frame: no link open");
            return;
        };
        if link != connection {
            return;
        }

        let (header, payload) = match split_frame(frame) {
            Ok(parts) => parts,
            Err(err) => {
                warn!("dropping inbound frame: {err}");
                return;
            }
        };
        let Some(pdu_type) = PduType::from_u6(header.pdu_type) else {
            warn!("{}", BearerError::UnsupportedPduType(header.pdu_type));
            return;
        };
        let Some(class) = pdu_type.message_class() else {
            warn!("dropping PDU type {pdu_type}: not carried by this bearer");
            return;
        };
        if self.handlers[class.index()].is_none() {
            debug!("dropping {pdu_type:?} PDU: {}", BearerError::NoHandler(class));
            return;
        }

        // A frame longer than the assumed default means the peer negotiated a
        // larger MTU; pick it up for outbound segmentation. MTU only raises.
        if frame.len() > self.config.default_mtu - 1 {
            let negotiated = self.transport.current_mtu(link);
            if negotiated > self.mtu {
                info!("peer uses larger MTU {negotiated}, enabling long frames");
                self.mtu = negotiated;
            }
        }

        match self.reassembler.feed(header.sar, pdu_type, payload) {
            Ok(Some((pdu_type, pdu))) => {
                self.dispatch(class, BearerEvent::Received { pdu_type, pdu });
            }
            Ok(None) => {}
            Err(err @ BearerError::ReassemblyOverflow { .. }) => error!("{err}"),
            Err(err) => warn!("dropping inbound frame: {err}"),
        }
    }

    /// Consume one send grant from the transport.
    ///
    /// An in-flight transfer owns the grant; otherwise the next pending class
    /// is granted in round-robin order, and with nothing pending the grant is
    /// absorbed. Grants for an unknown or stale handle are ignored.
    pub fn on_send_opportunity(&mut self, connection: ConnectionHandle) {
        let Some(link) = self.link else { return };
        if link != connection {
            return;
        }

        if self.segmenter.is_active() {
            if let Err(err) = self.send_next_segment(link) {
                error!("segment send failed: {err}");
            }
            return;
        }

        if let Some(class) = self.scheduler.next_grant() {
            info!("can send now: {class:?}");
            self.dispatch(class, BearerEvent::ReadyToSend);
        }
    }

    /// React to the transport opening a link.
    ///
    /// Stores the handle and resets the MTU and all engine state: a new link
    /// starts clean.
    pub fn on_link_open(&mut self, connection: ConnectionHandle) {
        info!("link open on {connection}");
        self.link = Some(connection);
        self.mtu = self.config.default_mtu;
        self.reassembler.reset();
        self.segmenter.abort();
        self.scheduler.clear();
    }

    /// React to the transport closing the link.
    ///
    /// Clears the handle and all pending state. A class whose transfer was in
    /// flight is notified with [`BearerEvent::TransferAborted`]; its source
    /// bytes are released.
    pub fn on_link_close(&mut self, connection: ConnectionHandle) {
        if self.link != Some(connection) {
            return;
        }
        info!("link closed on {connection}");
        self.link = None;
        self.mtu = self.config.default_mtu;
        self.reassembler.reset();
        self.scheduler.clear();
        if let Some(pdu_type) = self.segmenter.abort() {
            if let Some(class) = pdu_type.message_class() {
                self.dispatch(class, BearerEvent::TransferAborted);
            }
        }
    }

    fn send_next_segment(&mut self, link: ConnectionHandle) -> Result<()> {
        let Some(step) = self.segmenter.next_frame(self.mtu) else {
            return Ok(());
        };
        if let Err(err) = self.transport.send_frame(link, &step.frame) {
            // No retransmission: a failed frame ends the transfer
            self.segmenter.abort();
            return Err(err);
        }
        if !step.complete {
            self.transport.request_send_opportunity(link);
        }
        Ok(())
    }

    fn dispatch(&mut self, class: MessageClass, event: BearerEvent) {
        let Some(mut handler) = self.handlers[class.index()].take() else {
            return;
        };
        handler(self, event);
        // The handler may have re-registered itself; keep the newer one
        let slot = &mut self.handlers[class.index()];
        if slot.is_none() {
            *slot = Some(handler);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::io;
    use std::rc::Rc;

    const LINK: ConnectionHandle = ConnectionHandle(0x0040);

    #[derive(Debug, Default)]
    struct RecordingTransport {
        frames: Vec<Vec<u8>>,
        grant_requests: usize,
        negotiated_mtu: usize,
        fail_sends: bool,
    }

    impl RecordingTransport {
        fn new() -> Self {
            Self {
                negotiated_mtu: 23,
                ..Self::default()
            }
        }

        fn with_mtu(negotiated_mtu: usize) -> Self {
            Self {
                negotiated_mtu,
                ..Self::default()
            }
        }
    }

    impl BearerTransport for RecordingTransport {
        fn send_frame(&mut self, _connection: ConnectionHandle, frame: &[u8]) -> Result<()> {
            if self.fail_sends {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "link gone").into());
            }
            self.frames.push(frame.to_vec());
            Ok(())
        }

        fn request_send_opportunity(&mut self, _connection: ConnectionHandle) {
            self.grant_requests += 1;
        }

        fn current_mtu(&self, _connection: ConnectionHandle) -> usize {
            self.negotiated_mtu
        }
    }

    fn open_session() -> BearerSession<RecordingTransport> {
        let mut session = BearerSession::new(RecordingTransport::new());
        session.on_link_open(LINK);
        session
    }

    /// Queue a PDU on a class: request a send and transmit on the grant.
    fn send_on_grant(
        session: &mut BearerSession<RecordingTransport>,
        class: MessageClass,
        pdu_type: PduType,
        pdu: Vec<u8>,
    ) {
        let pdu = Bytes::from(pdu);
        session.register_handler(class, move |session, event| {
            if let BearerEvent::ReadyToSend = event {
                session.send(pdu_type, pdu.clone()).unwrap();
            }
        });
        session.request_send(class).unwrap();
        session.on_send_opportunity(LINK);
    }

    #[test]
    fn test_small_single_frame_scenario() {
        // MTU 23, 10-byte network PDU: one frame of length 11
        let mut session = open_session();
        send_on_grant(
            &mut session,
            MessageClass::MeshMessage,
            PduType::NetworkPdu,
            vec![0xC3; 10],
        );

        let transport = session.transport();
        assert_eq!(transport.frames.len(), 1);
        assert_eq!(transport.frames[0].len(), 11);
        assert_eq!(transport.frames[0][0], 0b00_000000);
        assert_eq!(&transport.frames[0][1..], &[0xC3; 10]);
        // One grant consumed by the request, none needed afterwards
        assert_eq!(transport.grant_requests, 1);
        assert!(!session.transfer_active());
    }

    #[test]
    fn test_two_segment_scenario() {
        // MTU 23: 30 bytes go out as 22 + 8 across two grants
        let pdu: Vec<u8> = (0..30).collect();
        let mut session = open_session();
        send_on_grant(
            &mut session,
            MessageClass::MeshMessage,
            PduType::NetworkPdu,
            pdu.clone(),
        );

        assert!(session.transfer_active());
        // request_send asked once, the unfinished segment asked again
        assert_eq!(session.transport().grant_requests, 2);

        session.on_send_opportunity(LINK);
        assert!(!session.transfer_active());

        let transport = session.transport();
        assert_eq!(transport.frames.len(), 2);
        assert_eq!(transport.frames[0][0], 0b01_000000);
        assert_eq!(transport.frames[0].len(), 23);
        assert_eq!(transport.frames[1][0], 0b11_000000);
        assert_eq!(transport.frames[1].len(), 9);
        assert_eq!(&transport.frames[1][1..], &pdu[22..]);
        assert_eq!(transport.grant_requests, 2);
    }

    #[test]
    fn test_round_trip_lengths() {
        // Segment through one session, reassemble through another
        for len in [1usize, 21, 22, 23, 24, 44, 65, 66] {
            let pdu: Vec<u8> = (0..len).map(|i| (i % 256) as u8).collect();

            let mut sender = open_session();
            send_on_grant(
                &mut sender,
                MessageClass::MeshMessage,
                PduType::NetworkPdu,
                pdu.clone(),
            );
            while sender.transfer_active() {
                sender.on_send_opportunity(LINK);
            }

            let received = Rc::new(RefCell::new(Vec::new()));
            let mut receiver = open_session();
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
            assert_eq!(received.len(), 1, "len {len}");
            assert_eq!(received[0].0, PduType::NetworkPdu, "len {len}");
            assert_eq!(received[0].1.as_ref(), pdu.as_slice(), "len {len}");
        }
    }

    #[test]
    fn test_link_close_during_transfer() {
        // Three-segment send, link closes after segment one
        let aborted = Rc::new(RefCell::new(false));
        let flag = Rc::clone(&aborted);

        let pdu = Bytes::from(vec![0x55u8; 60]);
        let mut session = open_session();
        session.register_handler(MessageClass::MeshMessage, move |session, event| {
            match event {
                BearerEvent::ReadyToSend => {
                    session.send(PduType::NetworkPdu, pdu.clone()).unwrap();
                }
                BearerEvent::TransferAborted => *flag.borrow_mut() = true,
                BearerEvent::Received { .. } => {}
            }
        });
        session.request_send(MessageClass::MeshMessage).unwrap();
        session.on_send_opportunity(LINK);

        assert_eq!(session.transport().frames.len(), 1);
        assert!(session.transfer_active());

        session.on_link_close(LINK);
        assert!(*aborted.borrow());
        assert!(!session.transfer_active());
        assert_eq!(session.link(), None);

        // A grant on the stale handle must not send anything
        session.on_send_opportunity(LINK);
        assert_eq!(session.transport().frames.len(), 1);
    }

    #[test]
    fn test_round_robin_between_classes() {
        let grants = Rc::new(RefCell::new(Vec::new()));

        let mut session = open_session();
        for class in [MessageClass::MeshMessage, MessageClass::MeshBeacon] {
            let sink = Rc::clone(&grants);
            session.register_handler(class, move |_, event| {
                if let BearerEvent::ReadyToSend = event {
                    sink.borrow_mut().push(class);
                }
            });
        }

        session.request_send(MessageClass::MeshMessage).unwrap();
        session.request_send(MessageClass::MeshBeacon).unwrap();

        for _ in 0..20 {
            session.on_send_opportunity(LINK);
            let granted = *grants.borrow().last().unwrap();
            session.request_send(granted).unwrap();
        }

        let grants = grants.borrow();
        for pair in grants.chunks(2) {
            if pair.len() == 2 {
                assert_ne!(pair[0], pair[1]);
            }
        }
    }

    #[test]
    fn test_grant_absorbed_when_idle() {
        let mut session = open_session();
        session.register_handler(MessageClass::MeshMessage, |_, _| {
            panic!("no event expected");
        });
        session.on_send_opportunity(LINK);
        assert!(session.transport().frames.is_empty());
    }

    #[test]
    fn test_mismatched_grant_handle_ignored() {
        let granted = Rc::new(RefCell::new(0usize));
        let count = Rc::clone(&granted);

        let mut session = open_session();
        session.register_handler(MessageClass::MeshMessage, move |_, event| {
            if let BearerEvent::ReadyToSend = event {
                *count.borrow_mut() += 1;
            }
        });
        session.request_send(MessageClass::MeshMessage).unwrap();

        session.on_send_opportunity(ConnectionHandle(0x0999));
        assert_eq!(*granted.borrow(), 0);

        // Still pending: the real grant arrives later
        session.on_send_opportunity(LINK);
        assert_eq!(*granted.borrow(), 1);
    }

    #[test]
    fn test_request_send_without_link() {
        let mut session = BearerSession::new(RecordingTransport::new());
        let err = session.request_send(MessageClass::MeshMessage).unwrap_err();
        assert!(matches!(err, BearerError::NotConnected));
    }

    #[test]
    fn test_send_without_link() {
        let mut session = BearerSession::new(RecordingTransport::new());
        let err = session
            .send(PduType::NetworkPdu, Bytes::from_static(&[1]))
            .unwrap_err();
        assert!(matches!(err, BearerError::NotConnected));
    }

    #[test]
    fn test_unsupported_type_dropped() {
        let mut session = open_session();
        session.register_handler(MessageClass::MeshMessage, |_, _| {
            panic!("no delivery expected");
        });
        // Type 0x2A is not a proxy PDU type
        session.on_frame(LINK, &[0b00_101010, 1, 2, 3]);
    }

    #[test]
    fn test_unregistered_class_dropped_without_state_change() {
        let received = Rc::new(RefCell::new(Vec::new()));

        let mut session = open_session();
        let sink = Rc::clone(&received);
        session.register_handler(MessageClass::MeshMessage, move |_, event| {
            if let BearerEvent::Received { pdu, .. } = event {
                sink.borrow_mut().push(pdu);
            }
        });

        // No beacon handler: a beacon first-segment must not start reassembly
        session.on_frame(LINK, &[0b01_000001, 9, 9]);

        // An in-order network PDU still reassembles cleanly
        session.on_frame(LINK, &[0b01_000000, 1, 2]);
        session.on_frame(LINK, &[0b11_000000, 3, 4]);

        let received = received.borrow();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].as_ref(), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_mtu_escalation_from_long_inbound_frame() {
        let mut session = BearerSession::new(RecordingTransport::with_mtu(69));
        session.on_link_open(LINK);
        session.register_handler(MessageClass::MeshMessage, move |session, event| {
            if let BearerEvent::ReadyToSend = event {
                session
                    .send(PduType::NetworkPdu, Bytes::from(vec![0u8; 60]))
                    .unwrap();
            }
        });
        assert_eq!(session.mtu(), 23);

        // A 30-byte inbound frame exceeds the default MTU: query the transport
        let mut frame = vec![0b00_000000u8];
        frame.extend_from_slice(&[7; 29]);
        session.on_frame(LINK, &frame);
        assert_eq!(session.mtu(), 69);

        // Outbound segmentation now fits 60 bytes in a single frame
        session.request_send(MessageClass::MeshMessage).unwrap();
        session.on_send_opportunity(LINK);
        let transport = session.transport();
        assert_eq!(transport.frames.len(), 1);
        assert_eq!(transport.frames[0].len(), 61);
    }

    #[test]
    fn test_mtu_resets_on_reopen() {
        let mut session = BearerSession::new(RecordingTransport::with_mtu(69));
        session.on_link_open(LINK);
        session.register_handler(MessageClass::MeshMessage, |_, _| {});

        let mut frame = vec![0b00_000000u8];
        frame.extend_from_slice(&[7; 29]);
        session.on_frame(LINK, &frame);
        assert_eq!(session.mtu(), 69);

        session.on_link_close(LINK);
        session.on_link_open(ConnectionHandle(0x0041));
        assert_eq!(session.mtu(), 23);
    }

    #[test]
    fn test_send_during_reassembly_keeps_both_directions_intact() {
        // Inbound reassembly and an outbound transfer use independent
        // buffers, so interleaving them corrupts neither message
        let received = Rc::new(RefCell::new(Vec::new()));

        let mut session = open_session();
        let sink = Rc::clone(&received);
        session.register_handler(MessageClass::MeshMessage, move |session, event| match event {
            BearerEvent::ReadyToSend => {
                session
                    .send(PduType::NetworkPdu, Bytes::from(vec![0xEEu8; 30]))
                    .unwrap();
            }
            BearerEvent::Received { pdu, .. } => sink.borrow_mut().push(pdu),
            BearerEvent::TransferAborted => {}
        });

        // Inbound first segment arrives, then the session gets to send
        session.on_frame(LINK, &[0b01_000000, 1, 2, 3]);
        session.request_send(MessageClass::MeshMessage).unwrap();
        session.on_send_opportunity(LINK);
        session.on_send_opportunity(LINK);

        // Outbound went out whole
        let frames = session.transport().frames.clone();
        assert_eq!(frames.len(), 2);
        let mut sent = Vec::new();
        for frame in &frames {
            sent.extend_from_slice(&frame[1..]);
        }
        assert_eq!(sent, vec![0xEEu8; 30]);

        // Inbound reassembly finishes undisturbed
        session.on_frame(LINK, &[0b11_000000, 4, 5]);
        let received = received.borrow();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].as_ref(), &[1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_send_failure_aborts_transfer() {
        let mut session = open_session();
        session.transport_mut().fail_sends = true;
        session.register_handler(MessageClass::MeshMessage, |session, event| {
            if let BearerEvent::ReadyToSend = event {
                let err = session
                    .send(PduType::NetworkPdu, Bytes::from(vec![0u8; 30]))
                    .unwrap_err();
                assert!(matches!(err, BearerError::Io(_)));
            }
        });
        session.request_send(MessageClass::MeshMessage).unwrap();
        session.on_send_opportunity(LINK);
        assert!(!session.transfer_active());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = BearerConfig::default().with_default_mtu(1);
        let result = BearerSession::with_config(RecordingTransport::new(), config);
        assert!(matches!(result, Err(BearerError::InvalidConfig(_))));
    }
}

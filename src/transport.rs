//! Transport interface consumed by the bearer.

use crate::error::Result;

/// Handle identifying the underlying transport connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ConnectionHandle(pub u16);

impl std::fmt::Display for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:04X}", self.0)
    }
}

/// The connection-oriented transport the bearer runs over.
///
/// The transport owns link establishment, MTU negotiation and byte delivery;
/// the bearer only asks it to move single frames and to signal future send
/// opportunities. One call to [`BearerTransport::request_send_opportunity`]
/// obtains exactly one future grant, delivered back through
/// [`BearerSession::on_send_opportunity`](crate::BearerSession::on_send_opportunity).
pub trait BearerTransport {
    /// Transmit one frame on the connection. No implicit chunking: the frame
    /// must already fit the negotiated MTU.
    fn send_frame(&mut self, connection: ConnectionHandle, frame: &[u8]) -> Result<()>;

    /// Ask for exactly one future send grant on the connection.
    fn request_send_opportunity(&mut self, connection: ConnectionHandle);

    /// The currently negotiated MTU for the connection.
    fn current_mtu(&self, connection: ConnectionHandle) -> usize;
}

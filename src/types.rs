//! Core proxy PDU types and constants.

/// Default ATT MTU assumed until the transport reports a larger negotiated value.
pub const DEFAULT_ATT_MTU: usize = 23;

/// Maximum proxy PDU size the bearer can reassemble.
pub const MAX_PROXY_PDU_SIZE: usize = 66;

/// Number of message classes competing for send opportunities.
pub const NUM_CLASSES: usize = 3;

/// SAR field of the proxy PDU header (top 2 bits of the first byte).
///
/// The ordinals are transmitted on the wire and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SarField {
    /// The frame carries a complete message.
    CompleteMessage = 0,
    /// First segment of a segmented message.
    FirstSegment = 1,
    /// Intermediate segment.
    Continuation = 2,
    /// Final segment; the message is complete after this frame.
    LastSegment = 3,
}

impl SarField {
    /// Create a SarField from the top 2 bits of a header byte value.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::CompleteMessage),
            1 => Some(Self::FirstSegment),
            2 => Some(Self::Continuation),
            3 => Some(Self::LastSegment),
            _ => None,
        }
    }

    /// Check if a frame carrying this field finishes a message.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::CompleteMessage | Self::LastSegment)
    }
}

/// Proxy PDU type (low 6 bits of the header byte).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PduType {
    /// Mesh network PDU.
    NetworkPdu = 0x00,
    /// Mesh beacon.
    Beacon = 0x01,
    /// Proxy configuration message.
    ProxyConfiguration = 0x02,
    /// Provisioning PDU.
    ProvisioningPdu = 0x03,
}

impl PduType {
    /// Create a PduType from a 6-bit header field value.
    pub fn from_u6(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::NetworkPdu),
            0x01 => Some(Self::Beacon),
            0x02 => Some(Self::ProxyConfiguration),
            0x03 => Some(Self::ProvisioningPdu),
            _ => None,
        }
    }

    /// The message class that owns PDUs of this type, if any.
    ///
    /// Only network PDUs and beacons are routed to class handlers; the other
    /// types are recognized on the wire but not carried by this bearer.
    pub fn message_class(&self) -> Option<MessageClass> {
        match self {
            Self::NetworkPdu => Some(MessageClass::MeshMessage),
            Self::Beacon => Some(MessageClass::MeshBeacon),
            _ => None,
        }
    }
}

impl std::fmt::Display for PduType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:02X}", *self as u8)
    }
}

/// Message class - an independent producer competing for send opportunities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageClass {
    /// Mesh data messages (network PDUs).
    MeshMessage = 0,
    /// Mesh beacons.
    MeshBeacon = 1,
    /// Reserved advertising-bearer class.
    ReservedAdvertising = 2,
}

impl MessageClass {
    /// Create a MessageClass from its scheduler slot index.
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::MeshMessage),
            1 => Some(Self::MeshBeacon),
            2 => Some(Self::ReservedAdvertising),
            _ => None,
        }
    }

    /// Scheduler slot index of this class.
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// The PDU type this class puts on the wire, if it carries one.
    pub fn pdu_type(&self) -> Option<PduType> {
        match self {
            Self::MeshMessage => Some(PduType::NetworkPdu),
            Self::MeshBeacon => Some(PduType::Beacon),
            Self::ReservedAdvertising => None,
        }
    }
}

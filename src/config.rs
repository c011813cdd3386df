//! Bearer configuration.

use crate::types::{DEFAULT_ATT_MTU, MAX_PROXY_PDU_SIZE};

/// Configuration for a bearer session.
///
/// # Example
///
/// ```
/// use mesh_bearer_rs::BearerConfig;
///
/// let config = BearerConfig::default()
///     .with_default_mtu(23)
///     .with_max_pdu_size(66);
/// ```
#[derive(Debug, Clone)]
pub struct BearerConfig {
    /// MTU assumed for a fresh link until the transport reports a larger
    /// negotiated value.
    pub default_mtu: usize,
    /// Largest PDU the bearer will reassemble or send.
    pub max_pdu_size: usize,
}

impl Default for BearerConfig {
    fn default() -> Self {
        Self {
            default_mtu: DEFAULT_ATT_MTU,
            max_pdu_size: MAX_PROXY_PDU_SIZE,
        }
    }
}

impl BearerConfig {
    /// Set the MTU assumed on link open.
    pub fn with_default_mtu(mut self, default_mtu: usize) -> Self {
        self.default_mtu = default_mtu;
        self
    }

    /// Set the largest supported PDU size.
    pub fn with_max_pdu_size(mut self, max_pdu_size: usize) -> Self {
        self.max_pdu_size = max_pdu_size;
        self
    }

    /// Check the configuration is usable: the MTU must leave room for the
    /// header byte and at least one payload byte.
    pub fn validate(&self) -> bool {
        self.default_mtu >= 2 && self.max_pdu_size > 0
    }
}

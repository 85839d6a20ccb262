use serde::{Deserialize, Serialize};

use crate::utils::ProtocolError;

/// Which side of the exchange an envelope speaks for. Not sticky: each
/// envelope on a connection carries its own role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Producer,
    Consumer,
    #[default]
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransmissionMode {
    /// Queue for a later pull.
    Buffered,
    /// Push to current subscribers now.
    Broadcast,
    #[default]
    #[serde(other)]
    Unknown,
}

/// One protocol message. Absent fields take their zero value, so a frame
/// with no `role` decodes and is then rejected as an unknown role.
///
/// ```json
/// {"role": "producer", "topic": "orders", "transmissionMode": "buffered", "message": "order-1"}
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Envelope {
    pub role: Role,
    pub topic: String,
    pub subscribe: bool,
    pub transmission_mode: TransmissionMode,
    pub message: String,
}

impl Envelope {
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        serde_json::from_slice(bytes).map_err(ProtocolError::Decode)
    }
}

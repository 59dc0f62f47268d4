//! Forging participant identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Length in bytes of an account address.
pub const ADDRESS_LENGTH: usize = 20;

/// Opaque identifier of a block-producing participant.
///
/// Two fee records carrying equal ids are paid to the same payee. The
/// contents are never interpreted; ordering and hashing are by the raw
/// string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Canonical `0x`-prefixed lowercase hex form of an account address.
    ///
    /// ```
    /// # use epochfee_types::ParticipantId;
    /// let id = ParticipantId::from_address(&[0xab; 20]);
    /// assert_eq!(id.as_str(), "0xabababababababababababababababababababab");
    /// ```
    pub fn from_address(address: &[u8; ADDRESS_LENGTH]) -> Self {
        Self(format!("0x{}", hex::encode(address)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ParticipantId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ParticipantId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

//! GUID identities used by the `#GUID` heap.

use std::fmt;

/// A 16-byte GUID as stored in the `#GUID` heap.
///
/// Each metadata generation is identified by a pair of GUIDs: `enc_id` names
/// the generation itself and `enc_base_id` names the generation immediately
/// preceding it. The writer never invents GUIDs; the caller supplies a fresh
/// `enc_id` so that output stays deterministic for identical inputs.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Guid(pub [u8; 16]);

impl Guid {
    /// The all-zero GUID, used as `enc_base_id` of generation 0.
    pub const ZERO: Guid = Guid([0; 16]);

    /// Creates a GUID from raw bytes.
    #[must_use]
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Guid(bytes)
    }

    /// Returns the raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Returns true if this is the all-zero GUID.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0; 16]
    }
}

impl fmt::Debug for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Guid({self})")
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7], b[8], b[9], b[10], b[11], b[12], b[13], b[14], b[15]
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_guid() {
        assert!(Guid::ZERO.is_zero());
        assert!(!Guid::from_bytes([1; 16]).is_zero());
    }

    #[test]
    fn test_display_format() {
        let guid = Guid::from_bytes([
            0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC, 0xDE, 0xF0, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66,
            0x77, 0x88,
        ]);
        assert_eq!(guid.to_string(), "12345678-9abc-def0-1122-334455667788");
    }
}

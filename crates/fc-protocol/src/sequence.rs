//! Sequence identifier type

use serde::{Deserialize, Serialize};
use std::fmt;

/// 30-bit request correlation number, reused cyclically
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SequenceId(u32);

impl SequenceId {
    /// Mask selecting the id bits of a packet header
    pub const MASK: u32 = 0x3FFF_FFFF;

    /// Largest representable id
    pub const MAX: SequenceId = SequenceId(Self::MASK);

    /// Create a new sequence id, discarding bits above the 30-bit range
    pub fn new(id: u32) -> Self {
        Self(id & Self::MASK)
    }

    /// Get the raw id value
    pub fn as_u32(&self) -> u32 {
        self.0
    }

    /// The id following this one, wrapping to 0 after [`SequenceId::MAX`]
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1) & Self::MASK)
    }
}

impl fmt::Display for SequenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u32> for SequenceId {
    fn from(id: u32) -> Self {
        Self::new(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_id_display() {
        assert_eq!(format!("{}", SequenceId::new(42)), "#42");
    }

    #[test]
    fn test_sequence_id_masks_high_bits() {
        assert_eq!(SequenceId::new(0xC000_0007).as_u32(), 7);
        assert_eq!(SequenceId::from(u32::MAX), SequenceId::MAX);
    }

    #[test]
    fn test_sequence_id_wraps() {
        assert_eq!(SequenceId::new(41).next(), SequenceId::new(42));
        assert_eq!(SequenceId::MAX.next(), SequenceId::new(0));
    }
}

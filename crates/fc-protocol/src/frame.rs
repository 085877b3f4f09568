//! Packet header encoding/decoding
//!
//! Every packet starts with a 12-byte header, all fields little-endian:
//! - header word: 4 bytes, flags in bits 31..30, sequence id in bits 29..0
//! - total size: 4 bytes, the whole packet including the header
//! - word count: 4 bytes

use bytes::{Buf, BufMut, BytesMut};

use crate::error::FramingError;
use crate::message::MessageFlags;
use crate::sequence::SequenceId;

/// Size of the packet header in bytes
pub const HEADER_SIZE: usize = 12;

/// Bytes that must be buffered before the total size is known
pub const SIZE_PREFIX: usize = 8;

/// Default upper bound on a single packet (16 MiB)
pub const MAX_PACKET_SIZE: usize = 16 * 1024 * 1024;

/// Per-word overhead: 4-byte length plus the NUL terminator
pub const WORD_OVERHEAD: usize = 5;

/// Packet header containing routing and length information
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Correlation id
    pub id: SequenceId,
    /// Origin/response bits
    pub flags: MessageFlags,
    /// Size of the whole packet in bytes
    pub total_size: u32,
    /// Number of words following the header
    pub word_count: u32,
}

impl FrameHeader {
    /// Create a new packet header
    pub fn new(id: SequenceId, flags: MessageFlags, total_size: u32, word_count: u32) -> Self {
        Self {
            id,
            flags,
            total_size,
            word_count,
        }
    }

    /// Encode the header into a byte buffer
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(HEADER_SIZE);
        dst.put_u32_le(((self.flags.bits() as u32) << 30) | self.id.as_u32());
        dst.put_u32_le(self.total_size);
        dst.put_u32_le(self.word_count);
    }

    /// Decode a header from the front of a packet without consuming it
    pub fn decode(src: &[u8]) -> Result<Self, FramingError> {
        if src.len() < HEADER_SIZE {
            return Err(FramingError::TruncatedHeader {
                expected: HEADER_SIZE,
                actual: src.len(),
            });
        }

        let mut buf = &src[..HEADER_SIZE];
        let head = buf.get_u32_le();
        let total_size = buf.get_u32_le();
        let word_count = buf.get_u32_le();

        Ok(Self {
            id: SequenceId::new(head),
            flags: MessageFlags::from_bits((head >> 30) as u8),
            total_size,
            word_count,
        })
    }

    /// Read the declared total size of the packet at the front of `src`
    ///
    /// Returns None until [`SIZE_PREFIX`] bytes are available.
    pub fn peek_total_size(src: &[u8]) -> Option<usize> {
        if src.len() < SIZE_PREFIX {
            return None;
        }
        let mut size = &src[4..SIZE_PREFIX];
        Some(size.get_u32_le() as usize)
    }
}

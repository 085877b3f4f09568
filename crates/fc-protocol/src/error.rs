//! Protocol error types

use thiserror::Error;

/// Errors raised while encoding or decoding a single packet.
///
/// A framing error is always scoped to one frame. The framer reports it and
/// carries on with the bytes that follow.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FramingError {
    /// Fewer bytes than the fixed packet header
    #[error("Truncated header: need {expected} bytes, got {actual}")]
    TruncatedHeader { expected: usize, actual: usize },

    /// Declared packet size exceeds the bytes available
    #[error("Truncated packet: declared {declared} bytes, got {actual}")]
    TruncatedPacket { declared: usize, actual: usize },

    /// Declared packet size cannot even hold the header
    #[error("Invalid packet size {declared}: smaller than the {minimum}-byte header")]
    UndersizedPacket { declared: usize, minimum: usize },

    /// A word runs past the end of the declared packet
    #[error("Word {index} overruns packet: needs {needed} bytes, {remaining} remaining")]
    WordOverrun {
        index: usize,
        needed: usize,
        remaining: usize,
    },

    /// A word is not followed by its zero terminator
    #[error("Word {index} is missing its NUL terminator")]
    MissingTerminator { index: usize },

    /// Bytes left over after the declared word count
    #[error("{0} trailing bytes after last word")]
    TrailingBytes(usize),

    /// Outgoing word contains a NUL byte and cannot be framed
    #[error("Word {index} contains a NUL byte")]
    NulInWord { index: usize },

    /// Outgoing packet does not fit the 32-bit size field
    #[error("Packet too large: {size} bytes")]
    PacketTooLarge { size: usize },
}

/// Errors raised by [`crate::Table::decode`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    /// A count word is not a non-negative integer
    #[error("Invalid {field} count at word {offset}: {value:?}")]
    InvalidCount {
        field: &'static str,
        offset: usize,
        value: String,
    },

    /// Fewer words remain than the counts declare
    #[error("Table truncated at word {offset}: need {needed} more words, {remaining} remaining")]
    Truncated {
        offset: usize,
        needed: usize,
        remaining: usize,
    },
}

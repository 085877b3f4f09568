//! Message types for the Frostbite RCON protocol
//!
//! Every packet on the wire carries one [`Message`]: a sequence id, two
//! origin/response flag bits and an ordered list of words. The first word of a
//! request names the command; the first word of a response is a status
//! (`"OK"` on success).
//!
//! # Message Flow
//!
//! 1. Client sends a request (`from_server = false`, `response = false`)
//! 2. Server answers with the same id and `response = true`
//! 3. Once events are enabled, the server pushes its own requests
//!    (`from_server = true`), which the client acknowledges with a response
//!    carrying the same id

use serde::{Deserialize, Serialize};

use crate::sequence::SequenceId;

/// Status word of a successful response
pub const STATUS_OK: &str = "OK";

/// Origin and direction bits of a packet header
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageFlags {
    /// Packet answers an earlier request
    pub response: bool,
    /// Packet belongs to a server-initiated exchange
    pub from_server: bool,
}

impl MessageFlags {
    /// Bit set for responses
    pub const RESPONSE: u8 = 0x1;
    /// Bit set for server-initiated exchanges
    pub const FROM_SERVER: u8 = 0x2;

    /// Client-originated request
    pub const REQUEST: MessageFlags = MessageFlags {
        response: false,
        from_server: false,
    };

    /// Server-originated request (an event)
    pub const EVENT: MessageFlags = MessageFlags {
        response: false,
        from_server: true,
    };

    /// Convert to the 2-bit wire representation
    pub fn bits(&self) -> u8 {
        let mut bits = 0;
        if self.response {
            bits |= Self::RESPONSE;
        }
        if self.from_server {
            bits |= Self::FROM_SERVER;
        }
        bits
    }

    /// Convert from the 2-bit wire representation, ignoring higher bits
    pub fn from_bits(bits: u8) -> Self {
        Self {
            response: bits & Self::RESPONSE != 0,
            from_server: bits & Self::FROM_SERVER != 0,
        }
    }
}

/// One decoded protocol packet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Correlation id
    pub id: SequenceId,
    /// Origin/response bits
    pub flags: MessageFlags,
    /// Payload words
    pub words: Vec<String>,
}

impl Message {
    /// Create a message from its parts
    pub fn new(id: SequenceId, flags: MessageFlags, words: Vec<String>) -> Self {
        Self { id, flags, words }
    }

    /// Create a client request
    pub fn request(id: SequenceId, words: Vec<String>) -> Self {
        Self::new(id, MessageFlags::REQUEST, words)
    }

    /// Create a server-originated event
    pub fn event(id: SequenceId, words: Vec<String>) -> Self {
        Self::new(id, MessageFlags::EVENT, words)
    }

    /// Create the `OK` acknowledgement for a server-originated request
    pub fn acknowledge(&self) -> Self {
        Self::new(
            self.id,
            MessageFlags {
                response: true,
                from_server: self.flags.from_server,
            },
            vec![STATUS_OK.to_string()],
        )
    }

    /// Whether the packet answers an earlier request
    pub fn is_response(&self) -> bool {
        self.flags.response
    }

    /// Whether the packet belongs to a server-initiated exchange
    pub fn is_from_server(&self) -> bool {
        self.flags.from_server
    }

    /// First word, if any
    pub fn head(&self) -> Option<&str> {
        self.words.first().map(String::as_str)
    }

    /// Words after the first
    pub fn tail(&self) -> &[String] {
        self.words.get(1..).unwrap_or(&[])
    }
}

/// Words of an outgoing request
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Command(Vec<String>);

impl Command {
    /// Create a command from its words
    pub fn new(words: Vec<String>) -> Self {
        Self(words)
    }

    /// Words of the command
    pub fn words(&self) -> &[String] {
        &self.0
    }

    /// Consume into the word list
    pub fn into_words(self) -> Vec<String> {
        self.0
    }

    /// Append an argument
    pub fn arg(mut self, word: impl Into<String>) -> Self {
        self.0.push(word.into());
        self
    }
}

/// A command line is split on whitespace
impl From<&str> for Command {
    fn from(line: &str) -> Self {
        Self(line.split_whitespace().map(String::from).collect())
    }
}

impl From<String> for Command {
    fn from(line: String) -> Self {
        Self::from(line.as_str())
    }
}

impl From<Vec<String>> for Command {
    fn from(words: Vec<String>) -> Self {
        Self(words)
    }
}

impl From<&[&str]> for Command {
    fn from(words: &[&str]) -> Self {
        Self(words.iter().map(|w| w.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Command {
    fn from(words: [&str; N]) -> Self {
        Self(words.iter().map(|w| w.to_string()).collect())
    }
}

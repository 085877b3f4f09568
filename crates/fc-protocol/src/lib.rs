//! fc-protocol: Wire protocol for Frostbite RCON
//!
//! This crate defines the binary packet format spoken by Frostbite-family game
//! servers on their remote administration port, the framer that reassembles
//! packets from a TCP byte stream, and the table layout used by list-style
//! results.

pub mod codec;
pub mod error;
pub mod frame;
pub mod message;
pub mod sequence;
pub mod table;

pub use codec::{decode, encode, encode_to_bytes, encoded_len, CodecError, PacketCodec};
pub use error::{FramingError, TableError};
pub use frame::{FrameHeader, HEADER_SIZE, MAX_PACKET_SIZE};
pub use message::{Command, Message, MessageFlags, STATUS_OK};
pub use sequence::SequenceId;
pub use table::{tabulate, Row, Table};

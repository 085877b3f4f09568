//! Packet codec and tokio framer
//!
//! [`encode`] and [`decode`] convert a single [`Message`] to and from its
//! wire bytes. [`PacketCodec`] wraps them in a `tokio_util` codec that
//! reassembles packets from an arbitrarily chunked byte stream.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::FramingError;
use crate::frame::{FrameHeader, HEADER_SIZE, MAX_PACKET_SIZE, WORD_OVERHEAD};
use crate::message::Message;

/// Stream-level codec failures
///
/// Unlike [`FramingError`], these cannot be isolated to one packet and end
/// the stream.
#[derive(Error, Debug)]
pub enum CodecError {
    /// Declared packet size is beyond the configured limit
    #[error("Packet too large: {size} bytes exceeds maximum of {max} bytes")]
    Oversized { size: usize, max: usize },

    /// Outgoing message could not be framed
    #[error("Framing error: {0}")]
    Framing(#[from] FramingError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Number of bytes `message` occupies on the wire
pub fn encoded_len(message: &Message) -> usize {
    HEADER_SIZE
        + message
            .words
            .iter()
            .map(|w| w.len() + WORD_OVERHEAD)
            .sum::<usize>()
}

/// Append the wire encoding of `message` to `dst`
pub fn encode(message: &Message, dst: &mut BytesMut) -> Result<(), FramingError> {
    if let Some(index) = message.words.iter().position(|w| w.as_bytes().contains(&0)) {
        return Err(FramingError::NulInWord { index });
    }

    let size = encoded_len(message);
    let total_size = u32::try_from(size).map_err(|_| FramingError::PacketTooLarge { size })?;

    dst.reserve(size);
    FrameHeader::new(
        message.id,
        message.flags,
        total_size,
        message.words.len() as u32,
    )
    .encode(dst);

    for word in &message.words {
        dst.put_u32_le(word.len() as u32);
        dst.extend_from_slice(word.as_bytes());
        dst.put_u8(0);
    }

    Ok(())
}

/// Encode `message` into a fresh buffer
pub fn encode_to_bytes(message: &Message) -> Result<Bytes, FramingError> {
    let mut buf = BytesMut::with_capacity(encoded_len(message));
    encode(message, &mut buf)?;
    Ok(buf.freeze())
}

/// Decode one packet
///
/// `packet` must start at a packet boundary. Bytes past the declared total
/// size are ignored.
pub fn decode(packet: &[u8]) -> Result<Message, FramingError> {
    let header = FrameHeader::decode(packet)?;
    let declared = header.total_size as usize;

    if declared < HEADER_SIZE {
        return Err(FramingError::UndersizedPacket {
            declared,
            minimum: HEADER_SIZE,
        });
    }
    if declared > packet.len() {
        return Err(FramingError::TruncatedPacket {
            declared,
            actual: packet.len(),
        });
    }

    let mut body = &packet[HEADER_SIZE..declared];
    let word_count = header.word_count as usize;
    let mut words = Vec::with_capacity(word_count.min(body.len() / WORD_OVERHEAD));

    for index in 0..word_count {
        if body.len() < 4 {
            return Err(FramingError::WordOverrun {
                index,
                needed: 4,
                remaining: body.len(),
            });
        }
        let len = body.get_u32_le() as usize;
        let needed = len.saturating_add(1);
        if body.len() < needed {
            return Err(FramingError::WordOverrun {
                index,
                needed,
                remaining: body.len(),
            });
        }
        if body[len] != 0 {
            return Err(FramingError::MissingTerminator { index });
        }
        words.push(String::from_utf8_lossy(&body[..len]).into_owned());
        body.advance(needed);
    }

    if !body.is_empty() {
        return Err(FramingError::TrailingBytes(body.len()));
    }

    Ok(Message::new(header.id, header.flags, words))
}

/// Length-prefixed packet framer
///
/// Decoding yields `Result<Message, FramingError>` items: a malformed packet
/// is surfaced as an `Err` item, its bytes are consumed, and the stream keeps
/// going. Only an over-limit size declaration fails the stream itself.
#[derive(Debug)]
pub struct PacketCodec {
    max_packet_size: usize,
}

impl PacketCodec {
    /// Create a codec with the default packet size limit
    pub fn new() -> Self {
        Self::with_max_packet_size(MAX_PACKET_SIZE)
    }

    /// Create a codec accepting packets up to `max_packet_size` bytes
    pub fn with_max_packet_size(max_packet_size: usize) -> Self {
        Self { max_packet_size }
    }

    /// Configured packet size limit
    pub fn max_packet_size(&self) -> usize {
        self.max_packet_size
    }
}

impl Default for PacketCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for PacketCodec {
    type Item = Result<Message, FramingError>;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let declared = match FrameHeader::peek_total_size(src) {
            Some(size) => size,
            None => return Ok(None), // Need more data
        };

        if declared > self.max_packet_size {
            return Err(CodecError::Oversized {
                size: declared,
                max: self.max_packet_size,
            });
        }

        // A size below the header can never be satisfied; skip one header's
        // worth of bytes so the stream can make progress.
        if declared < HEADER_SIZE {
            if src.len() < HEADER_SIZE {
                return Ok(None);
            }
            tracing::debug!(declared, "Skipping packet with undersized length field");
            src.advance(HEADER_SIZE);
            return Ok(Some(Err(FramingError::UndersizedPacket {
                declared,
                minimum: HEADER_SIZE,
            })));
        }

        if src.len() < declared {
            src.reserve(declared - src.len());
            return Ok(None);
        }

        let packet = src.split_to(declared);
        Ok(Some(decode(&packet)))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(item) = self.decode(src)? {
            return Ok(Some(item));
        }
        if src.is_empty() {
            return Ok(None);
        }

        // Stream ended mid-packet
        let actual = src.len();
        let error = match FrameHeader::peek_total_size(src) {
            Some(declared) => FramingError::TruncatedPacket { declared, actual },
            None => FramingError::TruncatedHeader {
                expected: HEADER_SIZE,
                actual,
            },
        };
        src.clear();
        Ok(Some(Err(error)))
    }
}

impl Encoder<Message> for PacketCodec {
    type Error = CodecError;

    fn encode(&mut self, message: Message, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let size = encoded_len(&message);
        if size > self.max_packet_size {
            return Err(CodecError::Oversized {
                size,
                max: self.max_packet_size,
            });
        }
        encode(&message, dst)?;
        Ok(())
    }
}

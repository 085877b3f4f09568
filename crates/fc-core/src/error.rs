//! Core error types for frostcon

use std::path::PathBuf;
use std::time::Duration;

use fc_protocol::{CodecError, FramingError, SequenceId, TableError};
use thiserror::Error;

/// Top-level error type for the frostcon ecosystem
#[derive(Error, Debug)]
pub enum FcError {
    /// Malformed packet, isolated to that packet
    #[error("Framing error: {0}")]
    Framing(#[from] FramingError),

    /// Well-formed packet that breaks protocol rules
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolViolation),

    /// Server refused a command
    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    /// Connection error
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    /// Login exchange failed
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Protocol violations reported as notifications; never fatal
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolViolation {
    /// A packet carried no words
    #[error("Empty message received (id {id})")]
    EmptyMessage { id: SequenceId },

    /// A server event did not match the arguments its decoder expects
    #[error("Malformed {event} event: {reason}")]
    MalformedEvent { event: String, reason: String },
}

/// Failure delivered to the callback of a single request
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Server answered with a status other than `OK`
    #[error("{}", rejection_text(.status, .detail))]
    Rejected { status: String, detail: Vec<String> },

    /// A pre-send filter refused the request
    #[error("Request vetoed: {0}")]
    Vetoed(String),

    /// No socket to write to
    #[error("Not connected")]
    NotConnected,

    /// Connection went away before the response arrived
    #[error("Connection closed")]
    ConnectionClosed,

    /// Request words could not be framed
    #[error("Cannot encode request: {0}")]
    Encoding(#[from] FramingError),

    /// Response did not have the shape the caller expected
    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl CommandError {
    /// Status word of a rejection, if this is one
    pub fn status(&self) -> Option<&str> {
        match self {
            CommandError::Rejected { status, .. } => Some(status),
            _ => None,
        }
    }
}

impl From<TableError> for CommandError {
    fn from(err: TableError) -> Self {
        CommandError::Malformed(err.to_string())
    }
}

fn rejection_text(status: &str, detail: &[String]) -> String {
    std::iter::once(status)
        .chain(detail.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Connection-related errors; terminal for the connection
#[derive(Error, Debug)]
pub enum ConnectionError {
    /// TCP connect failed
    #[error("Connection to {address} failed: {source}")]
    ConnectFailed {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// TCP connect did not finish in time
    #[error("Connection to {address} timed out after {after:?}")]
    Timeout { address: String, after: Duration },

    /// Stream-level codec failure
    #[error("Stream error: {0}")]
    Codec(#[from] CodecError),

    /// I/O error on an established connection
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Login exchange errors; terminal for the connection
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The challenge request was refused
    #[error("Challenge request failed: {0}")]
    Challenge(CommandError),

    /// The hashed password was refused
    #[error("Login rejected: {0}")]
    Rejected(CommandError),

    /// Challenge response carried no salt
    #[error("Server sent no login challenge")]
    MissingChallenge,

    /// Challenge is not a hex string
    #[error("Malformed login challenge: {0:?}")]
    MalformedChallenge(String),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialize error
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

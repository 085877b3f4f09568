//! Game extensions
//!
//! An extension registers behaviour on a [`Session`] when loaded: bus
//! handlers, named operations, event decoders and a login hook. Family
//! extensions load the more generic ones first (`bf4` → `bf` → `core`), and
//! [`Session::use_extension`] ignores repeated loads, so each family only
//! needs to name its direct parent.
//!
//! Extensions are resolved from a static registry; see [`lookup`].

mod bf;
mod bf4;
mod frostbite;

pub use self::bf::{Bf3Extension, BfExtension};
pub use self::bf4::{Bf4Commands, Bf4Extension};
pub use self::frostbite::{CoreCommands, CoreExtension, ServerVersion};

use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value;
use thiserror::Error;

use fc_core::CommandError;
use fc_protocol::TableError;

use crate::session::Session;

/// Game families known to [`lookup`]
pub const FAMILIES: &[&str] = &["core", "bf", "bf3", "bf4"];

/// Behaviour attached to a session at load time
pub trait Extension: Send + Sync {
    /// Unique name; a second load under the same name is skipped
    fn name(&self) -> &'static str;

    /// Register handlers, operations and decoders on `session`
    fn load(&self, session: &Session) -> Result<(), ExtensionError>;
}

/// Resolve a game family to its extension
pub fn lookup(family: &str) -> Option<&'static dyn Extension> {
    match family {
        "core" => Some(&CoreExtension),
        "bf" => Some(&BfExtension),
        "bf3" => Some(&Bf3Extension),
        "bf4" => Some(&Bf4Extension),
        _ => None,
    }
}

/// Extension loading errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtensionError {
    /// No extension is registered for the family
    #[error("Unknown game family {0:?} (expected one of: {})", FAMILIES.join(", "))]
    UnknownFamily(String),
}

/// Named operation failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OperationError {
    /// No operation with this name is defined
    #[error("Unknown operation: {0}")]
    Unknown(String),

    /// A request made by the operation failed
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Arguments do not fit the operation
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// Result could not be converted to JSON
    #[error("Cannot serialize result: {0}")]
    Serialize(String),
}

impl From<TableError> for OperationError {
    fn from(err: TableError) -> Self {
        OperationError::Command(err.into())
    }
}

/// Outcome of a named operation
pub type OperationResult = Result<Value, OperationError>;

/// A named operation on a session
pub type Operation = Arc<dyn Fn(Session, Vec<String>) -> BoxFuture<'static, OperationResult> + Send + Sync>;

/// Turns the argument words of a raw event into typed values
pub type EventDecoder = Arc<dyn Fn(&[String]) -> Result<Vec<Value>, DecodeError> + Send + Sync>;

/// Event argument decoding failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Fewer arguments than the event carries
    #[error("missing argument {index}")]
    MissingArgument { index: usize },

    /// Argument is not a number
    #[error("argument {index} is not a number: {value:?}")]
    InvalidNumber { index: usize, value: String },

    /// Embedded table is malformed
    #[error(transparent)]
    Table(#[from] TableError),
}

/// Convert a value to JSON for an operation result
pub(crate) fn to_json<T: serde::Serialize>(value: &T) -> OperationResult {
    serde_json::to_value(value).map_err(|e| OperationError::Serialize(e.to_string()))
}

/// Rewrite a raw event name into its normalized form
///
/// The first `.on<Capital>` becomes `.<lowercase capital>`; the rest of the
/// name is kept as is (`player.onJoin` → `player.join`,
/// `server.onRoundOverTeamScores` → `server.roundOverTeamScores`). Names
/// without that shape are returned unchanged.
pub fn normalize_event_name(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut from = 0;
    while let Some(found) = raw[from..].find(".on") {
        let dot = from + found;
        let capital = dot + 3;
        if let Some(c) = bytes.get(capital).filter(|c| c.is_ascii_uppercase()) {
            let mut name = String::with_capacity(raw.len() - 2);
            name.push_str(&raw[..=dot]);
            name.push(c.to_ascii_lowercase() as char);
            name.push_str(&raw[capital + 1..]);
            return name;
        }
        from = dot + 1;
    }
    raw.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use fc_core::config::ClientConfig;

    #[test]
    fn test_normalize_event_name() {
        assert_eq!(normalize_event_name("player.onJoin"), "player.join");
        assert_eq!(
            normalize_event_name("server.onRoundOverTeamScores"),
            "server.roundOverTeamScores"
        );
        assert_eq!(normalize_event_name("punkBuster.onMessage"), "punkBuster.message");
    }

    #[test]
    fn test_normalize_leaves_other_names() {
        assert_eq!(normalize_event_name("player.join"), "player.join");
        assert_eq!(normalize_event_name("player.online"), "player.online");
        assert_eq!(normalize_event_name("custom"), "custom");
        assert_eq!(normalize_event_name(""), "");
        // Only the first match is rewritten
        assert_eq!(normalize_event_name("a.onX.onY"), "a.x.onY");
        // Skips a non-matching occurrence
        assert_eq!(normalize_event_name("a.online.onKick"), "a.online.kick");
    }

    #[test]
    fn test_lookup() {
        for family in FAMILIES {
            assert_eq!(lookup(family).map(|e| e.name()), Some(*family));
        }
        assert!(lookup("bf2").is_none());
    }

    #[test]
    fn test_use_family_is_idempotent() {
        let session = Session::new(ClientConfig::default());
        session.use_family("bf4").unwrap();
        session.use_family("bf4").unwrap();
        session.use_family("core").unwrap();
        assert_eq!(session.extensions(), vec!["bf4", "bf", "core"]);
    }

    #[test]
    fn test_use_unknown_family() {
        let session = Session::new(ClientConfig::default());
        let err = session.use_family("quake").unwrap_err();
        assert_eq!(err, ExtensionError::UnknownFamily("quake".into()));
        assert!(err.to_string().contains("bf4"));
    }

    #[test]
    fn test_family_operations() {
        let session = Session::with_game(ClientConfig::default().with_game("bf4")).unwrap();
        let names = session.operation_names();
        for op in ["eventsEnabled", "help", "listPlayers", "logout", "quit", "serverInfo", "version"] {
            assert!(names.iter().any(|n| n == op), "missing {}", op);
        }
        assert!(session.event_decoder("player.onKill").is_some());
    }
}

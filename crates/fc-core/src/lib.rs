//! fc-core: Shared error taxonomy and configuration for frostcon
//!
//! This crate provides the error types reported by the client session and the
//! configuration structures used by the client library and the CLI.

pub mod config;
pub mod error;

pub use error::{AuthError, CommandError, ConnectionError, FcError, ProtocolViolation};

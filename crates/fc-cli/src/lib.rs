//! fc-cli: Command-line interface for frostcon
//!
//! Provides the `frostcon` binary for sending commands to a Frostbite
//! game server and watching its events.

pub mod commands;
pub mod output;

//! fc-client: Async client for the Frostbite RCON protocol
//!
//! This crate provides:
//! - [`Session`]: connection lifecycle, request multiplexing and dispatch
//! - [`EventBus`]: publish/subscribe for connection and server notifications
//! - Login via [`HashedLogin`]
//! - Game extensions (`core`, `bf`, `bf3`, `bf4`) adding named operations
//!   and normalized events
//!
//! # Example
//!
//! ```no_run
//! use fc_client::{CoreCommands, Session, Topic};
//! use fc_core::config::ClientConfig;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::new("127.0.0.1:47200")
//!     .with_password("secret")
//!     .with_game("bf4");
//! let session = Session::with_game(config)?;
//!
//! session.subscribe("player.join", |_, event| println!("{}", event));
//! session.connect().await?;
//!
//! let version = session.version().await?;
//! println!("{} {}", version.game, version.version);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod bus;
pub mod extensions;
pub mod multiplexer;
pub mod notification;
pub mod session;

pub use auth::{login_digest, HashedLogin, LoginHook};
pub use bus::{EventBus, SubscriptionId};
pub use extensions::{
    Bf4Commands, CoreCommands, DecodeError, Extension, ExtensionError, OperationError,
    ServerVersion,
};
pub use multiplexer::RequestTable;
pub use notification::{NamedEvent, Notification, Topic};
pub use session::{ConnectionState, Session};

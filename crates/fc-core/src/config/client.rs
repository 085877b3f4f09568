//! Client configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use fc_protocol::MAX_PACKET_SIZE;

use super::serde_utils::duration_secs;
use crate::error::ConfigError;

/// Default server address (the usual Frostbite admin port)
pub const DEFAULT_ADDRESS: &str = "127.0.0.1:47200";

/// Game family loaded when none is configured
pub const DEFAULT_GAME: &str = "core";

/// On-disk configuration file layout
///
/// ```toml
/// [client]
/// address = "203.0.113.7:47200"
/// password = "secret"
/// game = "bf4"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    /// Client settings
    pub client: ClientConfig,
}

/// Configuration for an RCON client session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server address (`host:port`)
    pub address: String,

    /// RCON password; no login is attempted without one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Game family whose extensions are loaded (`core`, `bf`, `bf3`, `bf4`)
    pub game: String,

    /// TCP connect timeout; requests themselves are never timed out
    #[serde(with = "duration_secs")]
    pub connect_timeout: Duration,

    /// Answer server-originated events with an `OK` response
    pub acknowledge_events: bool,

    /// Largest packet accepted from the server
    pub max_packet_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            password: None,
            game: DEFAULT_GAME.to_string(),
            connect_timeout: Duration::from_secs(10),
            acknowledge_events: true,
            max_packet_size: MAX_PACKET_SIZE,
        }
    }
}

impl ClientConfig {
    /// Create a configuration for `address` with everything else defaulted
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }

    /// Set the RCON password
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Set the game family
    pub fn with_game(mut self, game: impl Into<String>) -> Self {
        self.game = game.into();
        self
    }

    /// Check values that would make a session unusable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.address.trim().is_empty() {
            return Err(ConfigError::Invalid("address must not be empty".into()));
        }
        if self.max_packet_size < fc_protocol::HEADER_SIZE {
            return Err(ConfigError::Invalid(format!(
                "max_packet_size must be at least {} bytes",
                fc_protocol::HEADER_SIZE
            )));
        }
        if self.game.trim().is_empty() {
            return Err(ConfigError::Invalid("game must not be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.address, DEFAULT_ADDRESS);
        assert_eq!(config.game, "core");
        assert!(config.password.is_none());
        assert!(config.acknowledge_events);
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let file: ConfigFile = toml::from_str(
            r#"
            [client]
            address = "203.0.113.7:47200"
            password = "secret"
            connect_timeout = 2.5
            "#,
        )
        .unwrap();

        assert_eq!(file.client.address, "203.0.113.7:47200");
        assert_eq!(file.client.password.as_deref(), Some("secret"));
        assert_eq!(file.client.connect_timeout, Duration::from_millis(2500));
        assert_eq!(file.client.game, DEFAULT_GAME);
        assert_eq!(file.client.max_packet_size, MAX_PACKET_SIZE);
    }

    #[test]
    fn test_password_not_serialized_when_absent() {
        let text = toml::to_string_pretty(&ConfigFile::default()).unwrap();
        assert!(text.contains("[client]"));
        assert!(!text.contains("password"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(ClientConfig::new("  ").validate().is_err());

        let mut config = ClientConfig::new("localhost:47200");
        config.max_packet_size = 4;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        assert!(ClientConfig::new("localhost:47200")
            .with_game("")
            .validate()
            .is_err());
    }

    #[test]
    fn test_builders() {
        let config = ClientConfig::new("localhost:1")
            .with_password("pw")
            .with_game("bf4");
        assert_eq!(config.password.as_deref(), Some("pw"));
        assert_eq!(config.game, "bf4");
    }
}

//! CLI command implementations

mod call;
mod config;
mod exec;
mod watch;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use fc_client::Session;
use fc_core::config::{self as fc_config, ClientConfig, ConfigFile};

pub use call::call_command;
pub use config::{config_init, config_path, config_show};
pub use exec::exec_command;
pub use watch::watch_command;

/// Connection settings given on the command line; they win over the file
#[derive(Debug, Clone, Default)]
pub struct ConnectionOverrides {
    pub address: Option<String>,
    pub password: Option<String>,
    pub game: Option<String>,
}

/// Resolve the configuration file path
pub fn resolve_config_path(config_path: Option<&PathBuf>) -> PathBuf {
    config_path
        .cloned()
        .unwrap_or_else(fc_config::default_config_path)
}

/// Build the client configuration from the file (when present) and overrides
///
/// A missing default file is not an error; a missing file named with
/// `--config` is.
pub fn load_client_config(
    config_path: Option<&PathBuf>,
    overrides: &ConnectionOverrides,
) -> Result<ClientConfig> {
    let path = resolve_config_path(config_path);
    let mut config = if config_path.is_some() || path.exists() {
        read_config_file(&path)?.client
    } else {
        ClientConfig::default()
    };

    if let Some(address) = &overrides.address {
        config.address = address.clone();
    }
    if let Some(password) = &overrides.password {
        config.password = Some(password.clone());
    }
    if let Some(game) = &overrides.game {
        config.game = game.clone();
    }

    config.validate().context("Invalid client configuration")?;
    Ok(config)
}

fn read_config_file(path: &Path) -> Result<ConfigFile> {
    fc_config::load_config(path)
        .with_context(|| format!("Failed to load config file: {:?}", path))
}

/// Create a session for `config` and connect it
pub async fn open_session(config: ClientConfig) -> Result<Session> {
    let address = config.address.clone();
    let session = Session::with_game(config).context("Failed to load game extensions")?;

    tracing::info!(address = %address, "Connecting");
    session
        .connect()
        .await
        .with_context(|| format!("Failed to connect to {}", address))?;
    Ok(session)
}

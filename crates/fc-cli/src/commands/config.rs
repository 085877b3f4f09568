//! Config command implementations

use std::path::PathBuf;

use anyhow::{Context, Result};

use fc_core::config::{self, ConfigFile};

use super::resolve_config_path;
use crate::output::{print_error, print_info, print_success, print_warning};

/// Print the configuration file path
pub fn config_path(config_path: Option<&PathBuf>) -> Result<()> {
    println!("{}", resolve_config_path(config_path).display());
    Ok(())
}

/// Show the configuration file; the password is masked
pub fn config_show(config_path: Option<&PathBuf>) -> Result<()> {
    let path = resolve_config_path(config_path);

    if !path.exists() {
        print_warning(&format!("No configuration file found at {:?}", path));
        print_info("Run 'frostcon config init' to create one");
        return Ok(());
    }

    print_info(&format!("Configuration file: {:?}", path));

    let mut file: ConfigFile = config::load_config(&path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;
    if file.client.password.is_some() {
        file.client.password = Some("********".to_string());
    }

    println!("{}", toml::to_string_pretty(&file)?);
    Ok(())
}

/// Write a default configuration file
pub fn config_init(config_path: Option<&PathBuf>, force: bool) -> Result<()> {
    let path = resolve_config_path(config_path);

    if path.exists() && !force {
        print_error(&format!("Config file already exists: {:?}", path));
        print_info("Use --force to overwrite");
        return Ok(());
    }

    config::save_config(&path, &ConfigFile::default())
        .with_context(|| format!("Failed to write config file: {:?}", path))?;

    print_success(&format!("Created configuration file: {:?}", path));
    print_info("Set client.password, or pass --password / FROSTCON_PASSWORD, to log in");
    Ok(())
}

//! Raw command execution

use anyhow::{Context, Result};

use fc_core::config::ClientConfig;
use fc_protocol::Command;

use super::open_session;
use crate::output::format_words;

/// Send one command and print the words after the status
pub async fn exec_command(config: ClientConfig, words: &[String]) -> Result<()> {
    if words.is_empty() {
        anyhow::bail!("No command given");
    }

    let session = open_session(config).await?;
    let result = session
        .request(Command::new(words.to_vec()))
        .await
        .with_context(|| format!("'{}' failed", words.join(" ")));
    session.disconnect();

    println!("{}", format_words(&result?));
    Ok(())
}

//! Named operation invocation

use anyhow::{Context, Result};

use fc_core::config::ClientConfig;

use super::open_session;
use crate::output::{format_value, print_info};

/// Invoke a named operation and print its value
pub async fn call_command(config: ClientConfig, operation: &str, args: &[String]) -> Result<()> {
    let session = open_session(config).await?;

    if session.operation(operation).is_none() {
        session.disconnect();
        print_info(&format!(
            "Available operations: {}",
            session.operation_names().join(", ")
        ));
        anyhow::bail!("Unknown operation: {}", operation);
    }

    let result = session
        .invoke(operation, args.to_vec())
        .await
        .with_context(|| format!("Operation '{}' failed", operation));
    session.disconnect();

    println!("{}", format_value(&result?));
    Ok(())
}

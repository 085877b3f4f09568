//! Live notification stream

use anyhow::Result;
use tokio::sync::broadcast::error::RecvError;

use fc_client::{Notification, Session};
use fc_core::config::ClientConfig;

use crate::output::{print_error, print_info, print_warning};

/// Print notifications until Ctrl+C or until the server closes the connection
pub async fn watch_command(config: ClientConfig) -> Result<()> {
    let address = config.address.clone();
    let session = Session::with_game(config)?;

    // Subscribe before connecting so the connection notifications are seen.
    let mut notifications = session.notifications();
    if let Err(e) = session.connect().await {
        anyhow::bail!("Failed to connect to {}: {}", address, e);
    }
    print_info(&format!("Watching {} (Ctrl+C to stop)", address));

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                tracing::info!("Received Ctrl+C, disconnecting");
                session.disconnect();
                break;
            }
            received = notifications.recv() => match received {
                Ok(notification) => {
                    if !show(&notification) {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    print_warning(&format!("Skipped {} notifications", skipped));
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    Ok(())
}

/// Print one notification; returns false once the connection is gone
fn show(notification: &Notification) -> bool {
    match notification {
        // Raw events are shown through their normalized form.
        Notification::Event(_) => {}
        Notification::Error(err) => print_error(&err.to_string()),
        Notification::Closed => {
            print_warning("Connection closed");
            return false;
        }
        other => println!("{}", other),
    }
    true
}

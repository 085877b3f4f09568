//! Battlefield 4 additions

use async_trait::async_trait;
use serde_json::Value;

use fc_core::CommandError;
use fc_protocol::{tabulate, Table};

use super::{to_json, BfExtension, Extension, ExtensionError, OperationResult};
use crate::session::Session;

/// Typed access to Battlefield 4 commands
#[async_trait]
pub trait Bf4Commands {
    /// Commands the server accepts (`admin.help`)
    async fn help(&self) -> Result<Vec<String>, CommandError>;

    /// Every player, via `admin.listPlayers all`
    async fn admin_list_players(&self) -> Result<Table, CommandError>;
}

#[async_trait]
impl Bf4Commands for Session {
    async fn help(&self) -> Result<Vec<String>, CommandError> {
        self.request(["admin.help"]).await
    }

    async fn admin_list_players(&self) -> Result<Table, CommandError> {
        let words = self.request(["admin.listPlayers", "all"]).await?;
        Ok(tabulate(&words)?)
    }
}

/// Battlefield 4; loads `bf` and overrides `listPlayers`
#[derive(Debug, Clone, Copy, Default)]
pub struct Bf4Extension;

impl Extension for Bf4Extension {
    fn name(&self) -> &'static str {
        "bf4"
    }

    fn load(&self, session: &Session) -> Result<(), ExtensionError> {
        session.use_extension(&BfExtension)?;
        session.define_operation("help", help);
        session.define_operation("listPlayers", list_players);
        Ok(())
    }
}

async fn help(session: Session, _args: Vec<String>) -> OperationResult {
    Ok(Value::from(session.help().await?))
}

async fn list_players(session: Session, _args: Vec<String>) -> OperationResult {
    to_json(&session.admin_list_players().await?)
}

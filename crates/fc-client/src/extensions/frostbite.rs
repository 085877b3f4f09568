//! Commands and events common to every Frostbite server

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use fc_core::{CommandError, FcError, ProtocolViolation};
use fc_protocol::{tabulate, Message, Table};

use super::{
    normalize_event_name, to_json, Extension, ExtensionError, OperationError, OperationResult,
};
use crate::auth::HashedLogin;
use crate::notification::{NamedEvent, Notification, Topic};
use crate::session::Session;

/// Game name and build reported by `version`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerVersion {
    pub game: String,
    pub version: String,
}

/// Typed access to the core command set
#[async_trait]
pub trait CoreCommands {
    /// `version`
    async fn version(&self) -> Result<ServerVersion, CommandError>;

    /// `serverInfo`, returned as raw words since the layout differs per game
    async fn server_info(&self) -> Result<Vec<String>, CommandError>;

    /// `admin.eventsEnabled`: query, or set and then re-query
    async fn events_enabled(&self, enabled: Option<bool>) -> Result<bool, CommandError>;

    /// Player table, trying the `listPlayers all` form before plain `listPlayers`
    async fn list_players(&self) -> Result<Table, CommandError>;

    /// `logout`
    async fn logout(&self) -> Result<(), CommandError>;

    /// `quit`
    async fn quit(&self) -> Result<(), CommandError>;
}

#[async_trait]
impl CoreCommands for Session {
    async fn version(&self) -> Result<ServerVersion, CommandError> {
        let words = self.request(["version"]).await?;
        match words.as_slice() {
            [game, version, ..] => Ok(ServerVersion {
                game: game.clone(),
                version: version.clone(),
            }),
            _ => Err(CommandError::Malformed(format!(
                "version expects 2 words, got {}",
                words.len()
            ))),
        }
    }

    async fn server_info(&self) -> Result<Vec<String>, CommandError> {
        self.request(["serverInfo"]).await
    }

    async fn events_enabled(&self, enabled: Option<bool>) -> Result<bool, CommandError> {
        if let Some(enabled) = enabled {
            self.request(["admin.eventsEnabled", bool_word(enabled)])
                .await?;
        }
        let words = self.request(["admin.eventsEnabled"]).await?;
        Ok(words.first().is_some_and(|w| w == "true"))
    }

    async fn list_players(&self) -> Result<Table, CommandError> {
        let words = match self.request(["listPlayers", "all"]).await {
            Ok(words) => words,
            Err(first) => {
                tracing::debug!(error = %first, "listPlayers all refused, retrying without subset");
                // Report the first refusal if the fallback fails too
                self.request(["listPlayers"]).await.map_err(|_| first)?
            }
        };
        Ok(tabulate(&words)?)
    }

    async fn logout(&self) -> Result<(), CommandError> {
        self.request(["logout"]).await.map(drop)
    }

    async fn quit(&self) -> Result<(), CommandError> {
        self.request(["quit"]).await.map(drop)
    }
}

fn bool_word(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

/// Base extension every game family builds on
#[derive(Debug, Clone, Copy, Default)]
pub struct CoreExtension;

impl Extension for CoreExtension {
    fn name(&self) -> &'static str {
        "core"
    }

    fn load(&self, session: &Session) -> Result<(), ExtensionError> {
        if let Some(password) = &session.config().password {
            session.set_login_hook(Arc::new(HashedLogin::new(password.clone())));
        }

        session.subscribe(Topic::Event, |session, notification| {
            if let Notification::Event(message) = notification {
                republish(session, message);
            }
        });

        session.subscribe(Topic::Login, |session, _| {
            session.exec(["admin.eventsEnabled", "true"], |result| match result {
                Ok(_) => tracing::debug!("Server events enabled"),
                Err(e) => tracing::warn!(error = %e, "Could not enable server events"),
            });
        });

        session.define_operation("version", version);
        session.define_operation("serverInfo", server_info);
        session.define_operation("eventsEnabled", events_enabled);
        session.define_operation("listPlayers", list_players);
        session.define_operation("logout", logout);
        session.define_operation("quit", quit);

        Ok(())
    }
}

async fn version(session: Session, _args: Vec<String>) -> OperationResult {
    to_json(&session.version().await?)
}

async fn server_info(session: Session, _args: Vec<String>) -> OperationResult {
    Ok(Value::from(session.server_info().await?))
}

async fn events_enabled(session: Session, args: Vec<String>) -> OperationResult {
    let enabled = match args.as_slice() {
        [] => None,
        [word] => Some(parse_bool(word)?),
        _ => {
            return Err(OperationError::InvalidArguments(
                "expected at most one of true|false".into(),
            ))
        }
    };
    Ok(Value::Bool(session.events_enabled(enabled).await?))
}

async fn list_players(session: Session, _args: Vec<String>) -> OperationResult {
    to_json(&session.list_players().await?)
}

async fn logout(session: Session, _args: Vec<String>) -> OperationResult {
    session.logout().await?;
    Ok(Value::Null)
}

async fn quit(session: Session, _args: Vec<String>) -> OperationResult {
    session.quit().await?;
    Ok(Value::Null)
}

fn parse_bool(word: &str) -> Result<bool, OperationError> {
    match word {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(OperationError::InvalidArguments(format!(
            "expected true or false, got {:?}",
            other
        ))),
    }
}

/// Publish the normalized form of a raw server event
///
/// Exactly one named event is published per raw event. A registered decoder
/// supplies typed arguments; if it fails, the failure is reported and the
/// event goes out with its plain string arguments.
fn republish(session: &Session, message: &Message) {
    let Some(raw) = message.head() else {
        return;
    };
    let name = normalize_event_name(raw);
    let words = message.tail();

    let args = match session.event_decoder(raw).map(|decode| decode(words)) {
        Some(Ok(args)) => args,
        Some(Err(e)) => {
            tracing::warn!(event = raw, error = %e, "Malformed event arguments");
            session.publish(Notification::Error(Arc::new(FcError::from(
                ProtocolViolation::MalformedEvent {
                    event: raw.to_string(),
                    reason: e.to_string(),
                },
            ))));
            words.iter().cloned().map(Value::String).collect()
        }
        None => words.iter().cloned().map(Value::String).collect(),
    };

    session.publish_named(NamedEvent::new(name, args));
}

//! Notifications published by a session

use std::fmt;
use std::sync::Arc;

use fc_core::FcError;
use fc_protocol::Message;
use serde::Serialize;
use serde_json::Value;

/// A higher-level event re-published by an extension
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedEvent {
    /// Normalized event name, e.g. `player.join`
    pub name: String,
    /// Positional arguments
    pub args: Vec<Value>,
}

impl NamedEvent {
    /// Create a named event
    pub fn new(name: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// Create a named event whose arguments are plain words
    pub fn from_words(name: impl Into<String>, words: &[String]) -> Self {
        Self::new(name, words.iter().cloned().map(Value::String).collect())
    }
}

/// Everything a session publishes on its event bus
#[derive(Debug, Clone)]
pub enum Notification {
    /// TCP connection established
    Connected,
    /// Login exchange succeeded
    Login,
    /// Session accepts commands
    Ready,
    /// Connection torn down
    Closed,
    /// Non-command failure: framing, protocol, connection or login
    Error(Arc<FcError>),
    /// Raw server-originated message
    Event(Message),
    /// Raw response that matched no outstanding request
    Message(Message),
    /// Extension-published event
    Named(NamedEvent),
}

impl Notification {
    /// Name used for logging and topic matching
    pub fn name(&self) -> &str {
        match self {
            Notification::Connected => "connected",
            Notification::Login => "login",
            Notification::Ready => "ready",
            Notification::Closed => "closed",
            Notification::Error(_) => "error",
            Notification::Event(_) => "event",
            Notification::Message(_) => "message",
            Notification::Named(event) => &event.name,
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notification::Error(err) => write!(f, "error: {}", err),
            Notification::Event(msg) | Notification::Message(msg) => {
                write!(f, "{} {} {}", self.name(), msg.id, msg.words.join(" "))
            }
            Notification::Named(event) => {
                write!(f, "{}", event.name)?;
                for arg in &event.args {
                    write!(f, " {}", arg)?;
                }
                Ok(())
            }
            other => f.write_str(other.name()),
        }
    }
}

/// Selects which notifications a bus handler receives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Topic {
    /// Every notification
    All,
    Connected,
    Login,
    Ready,
    Closed,
    Error,
    Event,
    Message,
    /// Named events with exactly this name
    Named(String),
}

impl Topic {
    /// Whether `notification` belongs to this topic
    pub fn matches(&self, notification: &Notification) -> bool {
        match (self, notification) {
            (Topic::All, _) => true,
            (Topic::Connected, Notification::Connected)
            | (Topic::Login, Notification::Login)
            | (Topic::Ready, Notification::Ready)
            | (Topic::Closed, Notification::Closed)
            | (Topic::Error, Notification::Error(_))
            | (Topic::Event, Notification::Event(_))
            | (Topic::Message, Notification::Message(_)) => true,
            (Topic::Named(name), Notification::Named(event)) => *name == event.name,
            _ => false,
        }
    }
}

impl From<&str> for Topic {
    fn from(name: &str) -> Self {
        match name {
            "*" => Topic::All,
            "connected" => Topic::Connected,
            "login" => Topic::Login,
            "ready" => Topic::Ready,
            "closed" => Topic::Closed,
            "error" => Topic::Error,
            "event" => Topic::Event,
            "message" => Topic::Message,
            other => Topic::Named(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fc_protocol::SequenceId;
    use serde_json::json;

    #[test]
    fn test_topic_matching() {
        let joined = Notification::Named(NamedEvent::new("player.join", vec![]));
        assert!(Topic::from("player.join").matches(&joined));
        assert!(!Topic::from("player.leave").matches(&joined));
        assert!(Topic::All.matches(&joined));
        assert!(!Topic::Event.matches(&joined));

        let event = Notification::Event(Message::event(SequenceId::new(1), vec![]));
        assert!(Topic::from("event").matches(&event));
        assert!(!Topic::Message.matches(&event));
    }

    #[test]
    fn test_display() {
        let event = Notification::Named(NamedEvent::new(
            "player.kill",
            vec![json!("alice"), json!("bob"), json!(true)],
        ));
        assert_eq!(event.to_string(), r#"player.kill "alice" "bob" true"#);
        assert_eq!(Notification::Ready.to_string(), "ready");
    }

    #[test]
    fn test_named_event_from_words() {
        let event = NamedEvent::from_words("player.join", &["alice".into(), "g1".into()]);
        assert_eq!(event.args, vec![json!("alice"), json!("g1")]);
    }
}

//! Battlefield event decoders
//!
//! Replaces the positional string arguments of the common Battlefield
//! server events with typed values: numbers for teams, squads and rounds,
//! booleans for flags, objects for embedded tables.

use serde_json::{Map, Value};

use fc_protocol::{Row, Table};

use super::{CoreExtension, DecodeError, Extension, ExtensionError};
use crate::session::Session;

/// Shared Battlefield event handling; loads `core` first
#[derive(Debug, Clone, Copy, Default)]
pub struct BfExtension;

impl Extension for BfExtension {
    fn name(&self) -> &'static str {
        "bf"
    }

    fn load(&self, session: &Session) -> Result<(), ExtensionError> {
        session.use_extension(&CoreExtension)?;

        session.define_event_decoder("player.onJoin", player_join);
        session.define_event_decoder("player.onAuthenticated", player_authenticated);
        session.define_event_decoder("player.onLeave", player_leave);
        session.define_event_decoder("player.onSpawn", player_spawn);
        session.define_event_decoder("player.onSquadChange", player_team_squad);
        session.define_event_decoder("player.onTeamChange", player_team_squad);
        session.define_event_decoder("player.onKill", player_kill);
        session.define_event_decoder("player.onChat", player_chat);
        session.define_event_decoder("server.onLevelLoaded", level_loaded);
        session.define_event_decoder("server.onRoundOver", round_over);
        session.define_event_decoder("server.onRoundOverPlayers", round_over_players);
        session.define_event_decoder("server.onRoundOverTeamScores", round_over_team_scores);
        Ok(())
    }
}

/// Battlefield 3; identical to the shared Battlefield set
#[derive(Debug, Clone, Copy, Default)]
pub struct Bf3Extension;

impl Extension for Bf3Extension {
    fn name(&self) -> &'static str {
        "bf3"
    }

    fn load(&self, session: &Session) -> Result<(), ExtensionError> {
        session.use_extension(&BfExtension)
    }
}

type Decoded = Result<Vec<Value>, DecodeError>;

fn word(args: &[String], index: usize) -> Result<&str, DecodeError> {
    args.get(index)
        .map(String::as_str)
        .ok_or(DecodeError::MissingArgument { index })
}

fn text(args: &[String], index: usize) -> Result<Value, DecodeError> {
    word(args, index).map(|w| Value::String(w.to_string()))
}

fn integer(args: &[String], index: usize) -> Result<Value, DecodeError> {
    let w = word(args, index)?;
    w.parse::<i64>()
        .map(Value::from)
        .map_err(|_| DecodeError::InvalidNumber {
            index,
            value: w.to_string(),
        })
}

fn count(args: &[String], index: usize) -> Result<usize, DecodeError> {
    let w = word(args, index)?;
    w.parse().map_err(|_| DecodeError::InvalidNumber {
        index,
        value: w.to_string(),
    })
}

fn float(args: &[String], index: usize) -> Result<Value, DecodeError> {
    let w = word(args, index)?;
    w.parse::<f64>()
        .map(Value::from)
        .map_err(|_| DecodeError::InvalidNumber {
            index,
            value: w.to_string(),
        })
}

fn row_value(row: Row) -> Value {
    Value::Object(
        row.into_iter()
            .map(|(column, cell)| (column, Value::String(cell)))
            .collect::<Map<String, Value>>(),
    )
}

fn table_value(table: Table) -> Value {
    let mut object = Map::new();
    object.insert("columns".into(), Value::from(table.columns));
    object.insert(
        "rows".into(),
        Value::Array(table.rows.into_iter().map(row_value).collect()),
    );
    Value::Object(object)
}

/// `name guid`
fn player_join(args: &[String]) -> Decoded {
    Ok(vec![text(args, 0)?, text(args, 1)?])
}

/// `name`
fn player_authenticated(args: &[String]) -> Decoded {
    Ok(vec![text(args, 0)?])
}

/// `name <player info table>`; the table holds a single row
fn player_leave(args: &[String]) -> Decoded {
    let name = text(args, 0)?;
    let (table, _) = Table::decode(args, 1)?;
    let info = table.rows.into_iter().next().map_or(Value::Null, row_value);
    Ok(vec![name, info])
}

/// `name team`
fn player_spawn(args: &[String]) -> Decoded {
    Ok(vec![text(args, 0)?, integer(args, 1)?])
}

/// `name team squad`
fn player_team_squad(args: &[String]) -> Decoded {
    Ok(vec![text(args, 0)?, integer(args, 1)?, integer(args, 2)?])
}

/// `killer victim weapon headshot`
fn player_kill(args: &[String]) -> Decoded {
    Ok(vec![
        text(args, 0)?,
        text(args, 1)?,
        text(args, 2)?,
        Value::Bool(word(args, 3)? == "true"),
    ])
}

/// `name text <player subset...>`
fn player_chat(args: &[String]) -> Decoded {
    let subset = args.get(2..).unwrap_or_default().to_vec();
    Ok(vec![text(args, 0)?, text(args, 1)?, Value::from(subset)])
}

/// `level mode round total-rounds`
fn level_loaded(args: &[String]) -> Decoded {
    Ok(vec![
        text(args, 0)?,
        text(args, 1)?,
        integer(args, 2)?,
        integer(args, 3)?,
    ])
}

/// `winning-team`
fn round_over(args: &[String]) -> Decoded {
    Ok(vec![integer(args, 0)?])
}

/// `<player table>`
fn round_over_players(args: &[String]) -> Decoded {
    let (table, _) = Table::decode(args, 0)?;
    Ok(vec![table_value(table)])
}

/// `count score... target-score`
fn round_over_team_scores(args: &[String]) -> Decoded {
    let n = count(args, 0)?;
    let scores = (1..=n)
        .map(|index| float(args, index))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(vec![Value::Array(scores), integer(args, n + 1)?])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn words(list: &[&str]) -> Vec<String> {
        list.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_kill_headshot_flag() {
        let args = words(&["alice", "bob", "M16A4", "true"]);
        assert_eq!(
            player_kill(&args).unwrap(),
            vec![json!("alice"), json!("bob"), json!("M16A4"), json!(true)]
        );

        let args = words(&["alice", "bob", "Knife", "false"]);
        assert_eq!(player_kill(&args).unwrap()[3], json!(false));
    }

    #[test]
    fn test_spawn_uses_team_argument() {
        let args = words(&["alice", "2"]);
        assert_eq!(player_spawn(&args).unwrap(), vec![json!("alice"), json!(2)]);
    }

    #[test]
    fn test_squad_change() {
        let args = words(&["alice", "1", "4"]);
        assert_eq!(
            player_team_squad(&args).unwrap(),
            vec![json!("alice"), json!(1), json!(4)]
        );
    }

    #[test]
    fn test_chat_subset() {
        let args = words(&["alice", "gg", "team", "1"]);
        assert_eq!(
            player_chat(&args).unwrap(),
            vec![json!("alice"), json!("gg"), json!(["team", "1"])]
        );

        let args = words(&["Server", "hello"]);
        assert_eq!(player_chat(&args).unwrap()[2], json!([]));
    }

    #[test]
    fn test_leave_info_row() {
        let args = words(&["alice", "2", "name", "score", "1", "alice", "10"]);
        assert_eq!(
            player_leave(&args).unwrap(),
            vec![json!("alice"), json!({"name": "alice", "score": "10"})]
        );
    }

    #[test]
    fn test_level_loaded() {
        let args = words(&["MP_Prison", "ConquestLarge0", "1", "2"]);
        assert_eq!(
            level_loaded(&args).unwrap(),
            vec![json!("MP_Prison"), json!("ConquestLarge0"), json!(1), json!(2)]
        );
    }

    #[test]
    fn test_round_over_players_table() {
        let args = words(&["1", "name", "2", "alice", "bob"]);
        assert_eq!(
            round_over_players(&args).unwrap(),
            vec![json!({
                "columns": ["name"],
                "rows": [{"name": "alice"}, {"name": "bob"}],
            })]
        );
    }

    #[test]
    fn test_team_scores() {
        let args = words(&["2", "150.5", "75", "300"]);
        assert_eq!(
            round_over_team_scores(&args).unwrap(),
            vec![json!([150.5, 75.0]), json!(300)]
        );
    }

    #[test]
    fn test_decode_errors() {
        assert_eq!(
            round_over(&words(&["blue"])),
            Err(DecodeError::InvalidNumber {
                index: 0,
                value: "blue".into()
            })
        );
        assert_eq!(
            player_join(&words(&["alice"])),
            Err(DecodeError::MissingArgument { index: 1 })
        );
        assert!(matches!(
            round_over_team_scores(&words(&["3", "1", "2"])),
            Err(DecodeError::MissingArgument { index: 3 })
        ));
        assert!(matches!(
            player_leave(&words(&["alice", "x"])),
            Err(DecodeError::Table(_))
        ));
    }
}

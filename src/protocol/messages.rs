use serde::{Deserialize, Serialize};

// Text frames are small JSON shapes tagged with "t". Everything that
// fails to parse (unknown tag included) is silently dropped by the
// reader.

// ── Client → Server ──

#[derive(Debug, Deserialize)]
#[serde(tag = "t", rename_all = "lowercase")]
pub enum ClientMessage {
    Join {
        #[serde(default)]
        name: String,
    },
    Respawn,
}

// ── Server → Client ──

#[derive(Debug, Serialize)]
#[serde(tag = "t", rename_all = "lowercase")]
pub enum ServerMessage {
    /// Sent exactly once, immediately after the upgrade.
    Welcome { pid: i32, ws: u32, v: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_parses_with_and_without_name() {
        match serde_json::from_str(r#"{"t":"join","name":"Ann"}"#).unwrap() {
            ClientMessage::Join { name } => assert_eq!(name, "Ann"),
            other => panic!("unexpected {other:?}"),
        }
        match serde_json::from_str(r#"{"t":"join"}"#).unwrap() {
            ClientMessage::Join { name } => assert_eq!(name, ""),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn respawn_parses() {
        assert!(matches!(
            serde_json::from_str(r#"{"t":"respawn"}"#).unwrap(),
            ClientMessage::Respawn
        ));
    }

    #[test]
    fn unknown_tag_is_an_error() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"t":"teleport"}"#).is_err());
        assert!(serde_json::from_str::<ClientMessage>("not json").is_err());
    }

    #[test]
    fn welcome_wire_shape() {
        let msg = ServerMessage::Welcome {
            pid: 7,
            ws: 10000,
            v: "1.0.0".into(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["t"], "welcome");
        assert_eq!(json["pid"], 7);
        assert_eq!(json["ws"], 10000);
        assert_eq!(json["v"], "1.0.0");
    }
}

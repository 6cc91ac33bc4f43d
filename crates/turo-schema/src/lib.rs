pub mod persona;
pub mod reply;

pub use persona::{Persona, SkillMode};
pub use reply::TutorReply;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Speaker of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One prior turn of a tutoring conversation as submitted by the caller.
///
/// User turns carry plain `content`; assistant turns carry the structured
/// `reply` they were originally generated from. Both forms are accepted on
/// the wire and the engine serializes assistant replies back to JSON when
/// rebuilding model context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub reply: Option<TutorReply>,
    #[serde(default)]
    pub at: Option<DateTime<Utc>>,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Some(text.into()),
            reply: None,
            at: None,
        }
    }

    pub fn assistant(reply: TutorReply) -> Self {
        Self {
            role: Role::Assistant,
            content: None,
            reply: Some(reply),
            at: None,
        }
    }

    /// Text to feed back to the model for this turn: raw content for user
    /// turns, the JSON form of the structured reply for assistant turns.
    pub fn model_text(&self) -> String {
        match self.role {
            Role::User => self.content.clone().unwrap_or_default(),
            Role::Assistant => match &self.reply {
                Some(reply) => serde_json::to_string(reply).unwrap_or_default(),
                None => self.content.clone().unwrap_or_default(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serde_is_snake_case() {
        let json = serde_json::to_value(Role::Assistant).unwrap();
        assert_eq!(json, "assistant");
        let back: Role = serde_json::from_value(json).unwrap();
        assert_eq!(back, Role::Assistant);
    }

    #[test]
    fn user_turn_model_text_is_raw_content() {
        let turn = ChatTurn::user("kumusta");
        assert_eq!(turn.model_text(), "kumusta");
    }

    #[test]
    fn assistant_turn_model_text_is_reply_json() {
        let reply = TutorReply {
            tagalog: "Magandang umaga!".into(),
            ..TutorReply::default()
        };
        let turn = ChatTurn::assistant(reply);
        let text = turn.model_text();
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["tagalog"], "Magandang umaga!");
    }

    #[test]
    fn chat_turn_deserializes_with_missing_optionals() {
        let turn: ChatTurn =
            serde_json::from_value(serde_json::json!({"role": "user", "content": "hi"})).unwrap();
        assert_eq!(turn.role, Role::User);
        assert!(turn.reply.is_none());
        assert!(turn.at.is_none());
    }
}

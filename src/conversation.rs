use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One role-tagged message in the tutor chat. Serializes to the `{role,
/// content}` shape the analysis endpoints accept as history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

/// Append-only log of the session's exchange with the tutor. A user turn is
/// appended before its request is dispatched and the matching assistant turn
/// only after a successful response, so the log ends in a user turn exactly
/// when a request is still in flight for it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationLog {
    turns: Vec<Turn>,
}

impl ConversationLog {
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.turns.push(Turn {
            role: Role::User,
            content: content.into(),
        });
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.turns.push(Turn {
            role: Role::Assistant,
            content: content.into(),
        });
    }

    pub fn reset(&mut self) {
        self.turns.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turns_append_in_order() {
        let mut log = ConversationLog::default();
        log.push_user("what is this shape?");
        log.push_assistant("a triangle");
        assert_eq!(log.len(), 2);
        assert_eq!(log.turns()[0].role, Role::User);
        assert_eq!(log.turns()[1].role, Role::Assistant);
    }

    #[test]
    fn reset_empties_the_log() {
        let mut log = ConversationLog::default();
        log.push_user("hello");
        log.reset();
        assert!(log.is_empty());
    }

    #[test]
    fn roles_serialize_lowercase() {
        let turn = Turn {
            role: Role::Assistant,
            content: "hi".into(),
        };
        let json = serde_json::to_string(&turn).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"hi"}"#);
    }
}

//! Chat sessions and messages as the backend reports them.
//!
//! Sessions are created server-side on the first message of a new
//! conversation and identified by an integer id. The client only reads and
//! appends; nothing here is mutated after creation.

use serde::{Deserialize, Serialize};

/// A persisted conversation thread: one model, ordered messages (held server-side).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: i64,
    pub model_name: String,
    #[serde(default)]
    pub created_at: String,
}

/// A single message in a session (role + content; history rows also carry the session's model).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
            created_at: String::new(),
            model_name: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
            created_at: String::new(),
            model_name: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
            created_at: String::new(),
            model_name: None,
        }
    }

    pub fn is_user(&self) -> bool {
        self.role == "user"
    }
}

/// Short label for a session in the sessions list (model name with optional date).
pub fn session_label(session: &Session) -> String {
    match created_at_date(&session.created_at) {
        Some(date) => format!("{} ({})", session.model_name, date),
        None => session.model_name.clone(),
    }
}

/// Date portion of a backend timestamp. Accepts the SQLite `CURRENT_TIMESTAMP`
/// shape (with or without fractional seconds) and RFC 3339.
pub fn created_at_date(ts: &str) -> Option<String> {
    let ts = ts.trim();
    if ts.is_empty() {
        return None;
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(ts, format) {
            return Some(dt.date().to_string());
        }
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(ts) {
        return Some(dt.date_naive().to_string());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_constructors_set_roles() {
        assert_eq!(Message::user("hi").role, "user");
        assert_eq!(Message::assistant("hello").role, "assistant");
        assert_eq!(Message::system("ctx").role, "system");
        assert!(Message::user("hi").is_user());
        assert!(!Message::assistant("hello").is_user());
    }

    #[test]
    fn created_at_date_parses_sqlite_and_rfc3339() {
        assert_eq!(
            created_at_date("2025-03-14 09:26:53"),
            Some("2025-03-14".to_string())
        );
        assert_eq!(
            created_at_date("2025-03-14 09:26:53.123456"),
            Some("2025-03-14".to_string())
        );
        assert_eq!(
            created_at_date("2025-03-14T09:26:53+00:00"),
            Some("2025-03-14".to_string())
        );
        assert_eq!(created_at_date(""), None);
        assert_eq!(created_at_date("yesterday"), None);
    }

    #[test]
    fn session_label_includes_date_when_parseable() {
        let session = Session {
            id: 3,
            model_name: "llama3".to_string(),
            created_at: "2025-03-14 09:26:53".to_string(),
        };
        assert_eq!(session_label(&session), "llama3 (2025-03-14)");

        let undated = Session {
            id: 4,
            model_name: "gemma".to_string(),
            created_at: String::new(),
        };
        assert_eq!(session_label(&undated), "gemma");
    }

    #[test]
    fn message_deserializes_history_row() {
        let json = r#"{"role":"assistant","content":"Hi!","created_at":"2025-03-14 09:26:53","model_name":"llama3"}"#;
        let m: Message = serde_json::from_str(json).expect("parse message");
        assert_eq!(m.role, "assistant");
        assert_eq!(m.model_name.as_deref(), Some("llama3"));
    }
}

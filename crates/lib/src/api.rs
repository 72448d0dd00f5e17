//! Backend REST client (http://127.0.0.1:8000 by default).
//!
//! Wraps the four endpoints of the serving backend: model list, chat, chat
//! history, and session list. One attempt per call, no retries or caching;
//! failures propagate to the caller.

use crate::models::Model;
use crate::session::{Message, Session};
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

/// Client for the backend chat API.
#[derive(Clone)]
pub struct BackendClient {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Transport failure, no HTTP response was received.
    #[error("backend request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The backend answered with a non-2xx status.
    #[error("backend api error: {0}")]
    Api(String),
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<i64>,
}

/// Outbound message shape: only role and content cross the wire.
#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// POST /api/chat response. The backend may include more (e.g. full history);
/// only the reply message and the session id are consumed here.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatReply {
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub session_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    models: Option<Vec<Model>>,
}

impl BackendClient {
    pub fn new(base_url: Option<String>) -> Self {
        let base_url = base_url
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET /api/models, the available models (also used as the connectivity probe).
    pub async fn list_models(&self) -> Result<Vec<Model>, ApiError> {
        let url = format!("{}/api/models", self.base_url);
        let res = self.client.get(&url).send().await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(ApiError::Api(format!("{} {}", status, body)));
        }
        let data: ModelsResponse = res.json().await?;
        Ok(data.models.unwrap_or_default())
    }

    /// POST /api/chat, one non-streaming chat turn. When `session_id` is None
    /// the backend creates a session and returns its id in the reply.
    pub async fn send_chat(
        &self,
        model: &str,
        messages: &[Message],
        session_id: Option<i64>,
    ) -> Result<ChatReply, ApiError> {
        let url = format!("{}/api/chat", self.base_url);
        let body = ChatRequest {
            model,
            messages: messages
                .iter()
                .map(|m| WireMessage {
                    role: &m.role,
                    content: &m.content,
                })
                .collect(),
            stream: false,
            session_id,
        };
        let res = self.client.post(&url).json(&body).send().await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(ApiError::Api(format!("{} {}", status, body)));
        }
        let data: ChatReply = res.json().await?;
        Ok(data)
    }

    /// GET /api/chat/history, the full ordered message list for one session
    /// (or the backend's recent messages across sessions when id is None).
    pub async fn chat_history(&self, session_id: Option<i64>) -> Result<Vec<Message>, ApiError> {
        let url = match session_id {
            Some(id) => format!("{}/api/chat/history?session_id={}", self.base_url, id),
            None => format!("{}/api/chat/history", self.base_url),
        };
        let res = self.client.get(&url).send().await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(ApiError::Api(format!("{} {}", status, body)));
        }
        let data: Vec<Message> = res.json().await?;
        Ok(data)
    }

    /// GET /api/chat/sessions, all stored sessions in backend order.
    pub async fn chat_sessions(&self) -> Result<Vec<Session>, ApiError> {
        let url = format!("{}/api/chat/sessions", self.base_url);
        let res = self.client.get(&url).send().await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(ApiError::Api(format!("{} {}", status, body)));
        }
        let data: Vec<Session> = res.json().await?;
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_defaults_and_trims() {
        assert_eq!(BackendClient::new(None).base_url(), "http://127.0.0.1:8000");
        assert_eq!(
            BackendClient::new(Some("http://10.0.0.2:9000/".to_string())).base_url(),
            "http://10.0.0.2:9000"
        );
    }

    #[test]
    fn chat_request_serializes_optional_session() {
        let messages = vec![Message::user("Hello")];
        let without = ChatRequest {
            model: "llama3",
            messages: messages
                .iter()
                .map(|m| WireMessage {
                    role: &m.role,
                    content: &m.content,
                })
                .collect(),
            stream: false,
            session_id: None,
        };
        let json = serde_json::to_value(&without).expect("serialize");
        assert!(json.get("session_id").is_none());
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "Hello");
        assert_eq!(json["stream"], false);

        let with = ChatRequest {
            model: "llama3",
            messages: Vec::new(),
            stream: false,
            session_id: Some(7),
        };
        let json = serde_json::to_value(&with).expect("serialize");
        assert_eq!(json["session_id"], 7);
    }

    #[test]
    fn chat_reply_tolerates_extra_fields() {
        let json = r#"{"message":{"role":"assistant","content":"Hi!"},"session_id":7,"history":[]}"#;
        let reply: ChatReply = serde_json::from_str(json).expect("parse reply");
        assert_eq!(reply.session_id, Some(7));
        assert_eq!(reply.message.map(|m| m.content), Some("Hi!".to_string()));

        let bare: ChatReply = serde_json::from_str("{}").expect("parse empty reply");
        assert!(bare.message.is_none());
        assert!(bare.session_id.is_none());
    }
}

//! Wire protocol types for the IntelliSphere chat backend.
//!
//! Request bodies are serialized exactly as the backend expects them. Response
//! bodies are parsed into typed shapes at the boundary so that a malformed
//! payload surfaces as an error instead of a silently missing field.

mod domain;
mod session;

pub use domain::{Domain, UnknownDomain};
pub use session::{Message, SessionId};

use serde::{Deserialize, Serialize};

/// Relative routes served by the backend.
pub mod routes {
    /// Register a client-generated session id.
    pub const CREATE_SESSION: &str = "/create_new_session";
    /// Fetch the message history of a session.
    pub const SESSION_HISTORY: &str = "/get_session_history";
    /// Delete a session and its history.
    pub const DELETE_SESSION: &str = "/delete_session";
    /// Send a chat query within a session.
    pub const CHAT: &str = "/chat";
    /// Create an account.
    pub const SIGNUP: &str = "/signup";
    /// Start an authenticated backend session.
    pub const LOGIN: &str = "/login";
    /// End the authenticated backend session.
    pub const LOGOUT: &str = "/logout";
}

/// Body for [`routes::CREATE_SESSION`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    pub domain: Domain,
    pub session_id: SessionId,
}

/// Body for [`routes::SESSION_HISTORY`] and [`routes::DELETE_SESSION`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRequest {
    pub session_id: SessionId,
    pub domain: Domain,
}

/// Body for [`routes::CHAT`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub query: String,
    pub domain: Domain,
    pub session_id: SessionId,
}

/// Body for [`routes::SIGNUP`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignupRequest {
    pub firstname: String,
    pub email: String,
    pub password: String,
}

/// Body for [`routes::LOGIN`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Acknowledgement returned by create, delete, signup and login.
///
/// A payload carrying `error` is a rejection even when it also carries other
/// fields; otherwise `success` is required.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum AckResponse {
    Rejected {
        error: String,
    },
    Ack {
        success: bool,
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        session_id: Option<String>,
    },
}

impl AckResponse {
    /// Collapse into the confirmation message or the failure text.
    pub fn into_result(self) -> Result<Option<String>, String> {
        match self {
            AckResponse::Rejected { error } => Err(error),
            AckResponse::Ack {
                success: true,
                message,
                ..
            } => Ok(message),
            AckResponse::Ack { message, .. } => {
                Err(message.unwrap_or_else(|| "request was not accepted".to_string()))
            }
        }
    }
}

/// Response of [`routes::SESSION_HISTORY`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum HistoryResponse {
    Rejected {
        error: String,
    },
    History {
        #[serde(default)]
        history: Option<Vec<Message>>,
    },
}

impl HistoryResponse {
    /// Collapse into the ordered history (empty when absent) or failure text.
    pub fn into_result(self) -> Result<Vec<Message>, String> {
        match self {
            HistoryResponse::Rejected { error } => Err(error),
            HistoryResponse::History { history } => Ok(history.unwrap_or_default()),
        }
    }
}

/// Response of [`routes::CHAT`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ChatResponse {
    Rejected { error: String },
    History { history: Vec<Message> },
}

/// Response of [`routes::LOGOUT`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LogoutResponse {
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn requests_use_backend_field_names() {
        let body = ChatRequest {
            query: "hello".to_string(),
            domain: Domain::Law,
            session_id: SessionId::new("1_abc"),
        };
        assert_eq!(
            serde_json::to_value(body).expect("serialize"),
            json!({ "query": "hello", "domain": "law", "session_id": "1_abc" })
        );
    }

    #[test]
    fn error_field_takes_precedence() {
        let parsed: AckResponse =
            serde_json::from_value(json!({ "error": "Please log in to continue" }))
                .expect("parse");
        assert_eq!(
            parsed.into_result(),
            Err("Please log in to continue".to_string())
        );

        let parsed: ChatResponse =
            serde_json::from_value(json!({ "error": "x", "history": [] })).expect("parse");
        assert_eq!(
            parsed,
            ChatResponse::Rejected {
                error: "x".to_string()
            }
        );
    }

    #[test]
    fn ack_without_success_flag_is_malformed() {
        let parsed = serde_json::from_value::<AckResponse>(json!({ "ok": 1 }));
        assert!(parsed.is_err());
    }

    #[test]
    fn failed_ack_reports_backend_message() {
        let parsed: AckResponse = serde_json::from_value(
            json!({ "success": false, "message": "Email already exists!" }),
        )
        .expect("parse");
        assert_eq!(parsed.into_result(), Err("Email already exists!".to_string()));
    }

    #[test]
    fn absent_history_is_empty() {
        let parsed: HistoryResponse = serde_json::from_value(json!({})).expect("parse");
        assert_eq!(parsed.into_result(), Ok(Vec::new()));

        let parsed: HistoryResponse = serde_json::from_value(json!({
            "history": [{ "user": "q", "bot": "a" }, { "user": "only" }]
        }))
        .expect("parse");
        assert_eq!(
            parsed.into_result(),
            Ok(vec![Message::exchange("q", "a"), Message::user("only")])
        );
    }

    #[test]
    fn history_of_wrong_type_is_rejected() {
        let parsed = serde_json::from_value::<HistoryResponse>(json!({ "history": "nope" }));
        assert!(parsed.is_err());
    }
}

use async_trait::async_trait;
use intellisphere_core::{ClientError, SessionService};
use intellisphere_protocol::{Domain, Message, SessionId};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// A scripted failure, turned into a fresh `ClientError` on each use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    Service(String),
    Transport(String),
}

impl Failure {
    pub fn service(message: impl Into<String>) -> Self {
        Failure::Service(message.into())
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Failure::Transport(message.into())
    }

    fn to_error(&self) -> ClientError {
        match self {
            Failure::Service(message) => ClientError::Service(message.clone()),
            Failure::Transport(message) => ClientError::Transport(message.clone()),
        }
    }
}

/// One recorded call against the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceCall {
    Create {
        domain: Domain,
        session_id: SessionId,
    },
    FetchHistory {
        domain: Domain,
        session_id: SessionId,
    },
    Delete {
        domain: Domain,
        session_id: SessionId,
    },
    Chat {
        domain: Domain,
        session_id: SessionId,
        query: String,
    },
}

#[derive(Default)]
struct Script {
    histories: HashMap<SessionId, Vec<Message>>,
    create_failure: Option<Failure>,
    history_failure: Option<Failure>,
    delete_failure: Option<Failure>,
    chat_replies: VecDeque<Result<Vec<Message>, Failure>>,
}

/// In-process `SessionService` that records calls and answers from a script.
///
/// Unscripted chats answer with `echo: {query}` as the newest bot turn.
#[derive(Clone, Default)]
pub struct ScriptedSessionService {
    calls: Arc<Mutex<Vec<ServiceCall>>>,
    script: Arc<Mutex<Script>>,
}

impl ScriptedSessionService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_history(self, id: impl Into<SessionId>, history: Vec<Message>) -> Self {
        self.script.lock().histories.insert(id.into(), history);
        self
    }

    pub fn fail_create(self, failure: Failure) -> Self {
        self.script.lock().create_failure = Some(failure);
        self
    }

    pub fn fail_history(self, failure: Failure) -> Self {
        self.script.lock().history_failure = Some(failure);
        self
    }

    pub fn fail_delete(self, failure: Failure) -> Self {
        self.script.lock().delete_failure = Some(failure);
        self
    }

    /// Queue the answer for the next chat call.
    pub fn push_chat_reply(&self, reply: Result<Vec<Message>, Failure>) {
        self.script.lock().chat_replies.push_back(reply);
    }

    /// Stop failing creates from now on.
    pub fn allow_create(&self) {
        self.script.lock().create_failure = None;
    }

    pub fn calls(&self) -> Vec<ServiceCall> {
        self.calls.lock().clone()
    }

    /// Ids passed to successful and failed create calls, in order.
    pub fn created(&self) -> Vec<SessionId> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                ServiceCall::Create { session_id, .. } => Some(session_id.clone()),
                _ => None,
            })
            .collect()
    }

    /// Ids whose history was requested, in order.
    pub fn fetched(&self) -> Vec<SessionId> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                ServiceCall::FetchHistory { session_id, .. } => Some(session_id.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: ServiceCall) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl SessionService for ScriptedSessionService {
    async fn create_session(&self, domain: Domain, id: &SessionId) -> Result<(), ClientError> {
        self.record(ServiceCall::Create {
            domain,
            session_id: id.clone(),
        });
        match &self.script.lock().create_failure {
            Some(failure) => Err(failure.to_error()),
            None => Ok(()),
        }
    }

    async fn fetch_history(
        &self,
        domain: Domain,
        id: &SessionId,
    ) -> Result<Vec<Message>, ClientError> {
        self.record(ServiceCall::FetchHistory {
            domain,
            session_id: id.clone(),
        });
        let script = self.script.lock();
        if let Some(failure) = &script.history_failure {
            return Err(failure.to_error());
        }
        Ok(script.histories.get(id).cloned().unwrap_or_default())
    }

    async fn delete_session(&self, domain: Domain, id: &SessionId) -> Result<(), ClientError> {
        self.record(ServiceCall::Delete {
            domain,
            session_id: id.clone(),
        });
        let mut script = self.script.lock();
        if let Some(failure) = &script.delete_failure {
            return Err(failure.to_error());
        }
        script.histories.remove(id);
        Ok(())
    }

    async fn chat(
        &self,
        domain: Domain,
        id: &SessionId,
        query: &str,
    ) -> Result<Vec<Message>, ClientError> {
        self.record(ServiceCall::Chat {
            domain,
            session_id: id.clone(),
            query: query.to_string(),
        });
        let mut script = self.script.lock();
        let scripted = script.chat_replies.pop_front();
        let reply = match scripted {
            Some(reply) => reply,
            None => {
                let mut history = script.histories.get(id).cloned().unwrap_or_default();
                history.push(Message::exchange(query, format!("echo: {query}")));
                Ok(history)
            }
        };
        match reply {
            Ok(history) => {
                script.histories.insert(id.clone(), history.clone());
                Ok(history)
            }
            Err(failure) => Err(failure.to_error()),
        }
    }
}

//! Session lifecycle controller.
//!
//! Owns the current session pointer for one domain and keeps the local cache,
//! the remote service, and the transcript consistent with each other. Every
//! operation is exposed whole (`select`, `submit`) and split into a
//! synchronous start and a completion step (`begin_select`/`finish_select`,
//! `prepare_submit`/`finish_submit`), so a UI loop can run the network call on
//! a spawned task and keep drawing meanwhile.

use crate::cache::{LocalSessionCache, SessionMeta, newest};
use crate::error::ClientError;
use crate::remote::SessionService;
use crate::transcript::Transcript;
use crate::view::SessionListView;
use intellisphere_protocol::{Domain, Message, SessionId};
use log::{debug, info, warn};
use std::sync::Arc;

/// User intent, decoupled from how the UI captured it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    CreateSession,
    SelectSession(SessionId),
    DeleteSession(SessionId),
    Submit(String),
}

/// Tag for an in-flight history fetch.
///
/// Completions carrying an outdated generation are dropped, so when two
/// selects overlap only the latest one renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub session_id: SessionId,
    generation: u64,
}

/// A chat query that has been shown and is waiting for the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTurn {
    pub session_id: SessionId,
    pub query: String,
    generation: u64,
}

pub struct SessionController {
    service: Arc<dyn SessionService>,
    cache: LocalSessionCache,
    transcript: Transcript,
    current: Option<SessionId>,
    /// Bumped whenever the transcript switches to another session's content.
    generation: u64,
}

impl SessionController {
    /// Build a controller, picking up the persisted pointer for the domain.
    pub fn new(
        service: Arc<dyn SessionService>,
        cache: LocalSessionCache,
    ) -> Result<Self, ClientError> {
        let current = cache.pointer()?;
        debug!(
            "session controller ready (domain={}, pointer={})",
            cache.domain(),
            current.as_ref().map(SessionId::as_str).unwrap_or("none")
        );
        Ok(Self {
            service,
            cache,
            transcript: Transcript::new(),
            current,
            generation: 0,
        })
    }

    pub fn domain(&self) -> Domain {
        self.cache.domain()
    }

    pub fn current(&self) -> Option<&SessionId> {
        self.current.as_ref()
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn transcript_mut(&mut self) -> &mut Transcript {
        &mut self.transcript
    }

    pub fn cache(&self) -> &LocalSessionCache {
        &self.cache
    }

    /// Shared handle to the remote service, for callers running fetches.
    pub fn service(&self) -> Arc<dyn SessionService> {
        self.service.clone()
    }

    /// Current list of sessions, newest first, with the active row marked.
    pub fn sessions(&self) -> Result<SessionListView, ClientError> {
        let sessions = self.cache.load()?;
        Ok(SessionListView::derive(&sessions, self.current.as_ref()))
    }

    /// Execute a command.
    pub async fn dispatch(&mut self, command: Command) -> Result<(), ClientError> {
        match command {
            Command::CreateSession => self.create().await.map(|_| ()),
            Command::SelectSession(id) => self.select(id).await,
            Command::DeleteSession(id) => self.delete(&id).await,
            Command::Submit(query) => self.submit(&query).await,
        }
    }

    /// Register a fresh session remotely, then cache it and point at it.
    ///
    /// On failure nothing changes except one error block in the transcript.
    pub async fn create(&mut self) -> Result<SessionId, ClientError> {
        let id = SessionId::generate();
        let domain = self.domain();
        if let Err(err) = self.service.create_session(domain, &id).await {
            warn!("session create failed (domain={domain}, session_id={id}, error={err})");
            self.transcript
                .push_error(format!("Could not start a new session: {}", error_text(&err)));
            return Err(err);
        }
        if let Err(err) = self.adopt_new_session(&id) {
            self.transcript
                .push_error(format!("Could not save the new session: {err}"));
            return Err(err);
        }
        info!("session created (domain={domain}, session_id={id})");
        Ok(id)
    }

    fn adopt_new_session(&mut self, id: &SessionId) -> Result<(), ClientError> {
        self.cache.insert(id, SessionMeta::now())?;
        self.cache.set_pointer(id)?;
        self.current = Some(id.clone());
        self.generation += 1;
        self.transcript.clear();
        Ok(())
    }

    /// Point at `id` and load its history.
    pub async fn select(&mut self, id: SessionId) -> Result<(), ClientError> {
        let ticket = self.begin_select(id);
        let result = self
            .service
            .fetch_history(self.domain(), &ticket.session_id)
            .await;
        self.finish_select(ticket, result)
    }

    /// Move the pointer to `id` right away, clear the transcript and show the
    /// loading indicator. The pointer is never rolled back.
    pub fn begin_select(&mut self, id: SessionId) -> FetchTicket {
        if let Err(err) = self.cache.set_pointer(&id) {
            warn!("failed to persist session pointer (session_id={id}, error={err})");
        }
        self.current = Some(id.clone());
        self.generation += 1;
        self.transcript.clear();
        self.transcript.set_loading(true);
        debug!(
            "history fetch issued (session_id={id}, generation={})",
            self.generation
        );
        FetchTicket {
            session_id: id,
            generation: self.generation,
        }
    }

    /// Apply a history fetch result if `ticket` is still the latest.
    pub fn finish_select(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<Message>, ClientError>,
    ) -> Result<(), ClientError> {
        if ticket.generation != self.generation {
            debug!(
                "discarding stale history (session_id={}, generation={}, latest={})",
                ticket.session_id, ticket.generation, self.generation
            );
            return Ok(());
        }
        match result {
            Ok(history) => {
                debug!(
                    "history loaded (session_id={}, messages={})",
                    ticket.session_id,
                    history.len()
                );
                self.transcript.render(&history);
                Ok(())
            }
            Err(err) => {
                warn!(
                    "history fetch failed (session_id={}, error={err})",
                    ticket.session_id
                );
                self.transcript.set_loading(false);
                self.transcript
                    .push_error(format!("Could not load this session: {}", error_text(&err)));
                Err(err)
            }
        }
    }

    /// Delete `id` remotely, and locally once the backend confirms.
    ///
    /// Deleting the current session moves to the newest remaining one, or
    /// starts a new session when none remain. Once the backend confirms, the
    /// delete counts as done; a failed follow-up load only leaves its error
    /// block in the transcript.
    pub async fn delete(&mut self, id: &SessionId) -> Result<(), ClientError> {
        let domain = self.domain();
        if let Err(err) = self.service.delete_session(domain, id).await {
            warn!("session delete failed (domain={domain}, session_id={id}, error={err})");
            self.transcript
                .push_error(format!("Could not delete the session: {}", error_text(&err)));
            return Err(err);
        }
        self.cache.remove(id)?;
        info!("session deleted (domain={domain}, session_id={id})");

        if self.current.as_ref() != Some(id) {
            return Ok(());
        }
        let sessions = self.cache.load()?;
        let follow_up = match newest(&sessions).cloned() {
            Some(next) => self.select(next).await,
            None => self.create().await.map(|_| ()),
        };
        if let Err(err) = follow_up {
            warn!("no session loaded after delete (domain={domain}, session_id={id}, error={err})");
        }
        Ok(())
    }

    /// Make sure a valid session is active, creating one only when the cache
    /// is empty.
    pub async fn ensure_active(&mut self) -> Result<(), ClientError> {
        let sessions = self.cache.load()?;
        let Some(fallback) = newest(&sessions).cloned() else {
            info!("no cached sessions (domain={})", self.domain());
            return self.create().await.map(|_| ());
        };
        let target = match self.current.take() {
            Some(id) if sessions.contains_key(&id) => id,
            stale => {
                if let Some(stale) = stale {
                    debug!("session pointer is dangling (session_id={stale})");
                }
                fallback
            }
        };
        self.select(target).await
    }

    /// Make the cache and pointer agree after a chat exchange.
    pub fn persist_after_turn(&mut self) -> Result<(), ClientError> {
        let Some(id) = self.current.clone() else {
            return Ok(());
        };
        if self.cache.insert_if_missing(&id)? {
            debug!("cached session after first turn (session_id={id})");
        }
        self.cache.set_pointer(&id)?;
        Ok(())
    }

    /// Send `query` in the current session, creating one first if needed.
    pub async fn submit(&mut self, query: &str) -> Result<(), ClientError> {
        let pending = self.prepare_submit(query).await?;
        let result = self
            .service
            .chat(self.domain(), &pending.session_id, &pending.query)
            .await;
        self.finish_submit(pending, result)
    }

    /// Validate the query, ensure a session exists, and show the user block.
    pub async fn prepare_submit(&mut self, query: &str) -> Result<PendingTurn, ClientError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ClientError::Validation(vec![
                "Message is required".to_string(),
            ]));
        }
        let session_id = match self.current.clone() {
            Some(id) => id,
            None => self.create().await?,
        };
        self.transcript.push_user(query);
        self.transcript.set_loading(true);
        debug!("chat query issued (session_id={session_id})");
        Ok(PendingTurn {
            session_id,
            query: query.to_string(),
            generation: self.generation,
        })
    }

    /// Show the reply for `pending` and persist session metadata.
    ///
    /// A reply for a transcript that has since been replaced is not shown,
    /// and only the current session is written back to the cache.
    pub fn finish_submit(
        &mut self,
        pending: PendingTurn,
        result: Result<Vec<Message>, ClientError>,
    ) -> Result<(), ClientError> {
        let visible = pending.generation == self.generation;
        if visible {
            self.transcript.set_loading(false);
        } else {
            debug!(
                "reply for inactive transcript not shown (session_id={})",
                pending.session_id
            );
        }
        let outcome = result.and_then(|history| latest_reply(&history));
        match &outcome {
            Ok(reply) if visible => self.transcript.push_bot(reply.clone()),
            Err(err) if visible => self.transcript.push_error(error_text(err)),
            Ok(_) => {}
            Err(err) => warn!(
                "chat failed for inactive transcript (session_id={}, error={err})",
                pending.session_id
            ),
        }
        self.persist_after_turn()?;
        outcome.map(|_| ())
    }
}

/// Bot text of the newest turn in a chat reply.
fn latest_reply(history: &[Message]) -> Result<String, ClientError> {
    history
        .last()
        .and_then(|message| message.bot.clone())
        .ok_or_else(|| ClientError::MalformedResponse {
            endpoint: intellisphere_protocol::routes::CHAT.to_string(),
            detail: "history does not end with a bot reply".to_string(),
        })
}

/// Inline text for an error block; backend messages are shown verbatim.
pub fn error_text(err: &ClientError) -> String {
    match err {
        ClientError::Service(message) => message.clone(),
        other => other.to_string(),
    }
}

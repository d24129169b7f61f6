//! Remote session service and its HTTP implementation.

use crate::error::ClientError;
use async_trait::async_trait;
use intellisphere_config::ServerConfig;
use intellisphere_protocol::{
    AckResponse, ChatRequest, ChatResponse, CreateSessionRequest, Domain, HistoryResponse,
    Message, SessionId, SessionRequest, routes,
};
use log::{debug, info, warn};
use reqwest::StatusCode;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Backend operations on sessions, each scoped by domain.
#[async_trait]
pub trait SessionService: Send + Sync {
    /// Register a client-generated id.
    async fn create_session(&self, domain: Domain, id: &SessionId) -> Result<(), ClientError>;
    /// Ordered history; empty when the backend has none.
    async fn fetch_history(
        &self,
        domain: Domain,
        id: &SessionId,
    ) -> Result<Vec<Message>, ClientError>;
    /// Delete a session; succeeds only on explicit confirmation.
    async fn delete_session(&self, domain: Domain, id: &SessionId) -> Result<(), ClientError>;
    /// Send a query and return the updated history, newest turn last.
    async fn chat(
        &self,
        domain: Domain,
        id: &SessionId,
        query: &str,
    ) -> Result<Vec<Message>, ClientError>;
}

/// reqwest client for the chat backend.
///
/// Keeps a cookie store so the login cookie carries over to later calls.
#[derive(Clone)]
pub struct HttpBackend {
    http: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(config: &ServerConfig) -> Result<Self, ClientError> {
        let mut builder = reqwest::Client::builder().cookie_store(true);
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;
        let base_url = config.base_url.trim_end_matches('/').to_string();
        info!("http backend ready (base_url={base_url})");
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST `body` to `route` and parse the reply, whatever its status.
    ///
    /// The backend reports failures as `{error}` bodies with non-2xx codes, so
    /// the body is parsed before the status is considered.
    pub(crate) async fn post<B, R>(
        &self,
        route: &str,
        body: Option<&B>,
    ) -> Result<(StatusCode, Option<R>), ClientError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}{route}", self.base_url);
        let mut request = self.http.post(&url);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        debug!(
            "backend replied (route={route}, status={}, bytes={})",
            status.as_u16(),
            text.len()
        );
        match serde_json::from_str::<R>(&text) {
            Ok(parsed) => Ok((status, Some(parsed))),
            Err(_) if !status.is_success() => Ok((status, None)),
            Err(err) => Err(malformed(route, format!("{err}"))),
        }
    }

    async fn ack(&self, route: &str, body: &impl Serialize) -> Result<(), ClientError> {
        let (status, parsed) = self.post::<_, AckResponse>(route, Some(body)).await?;
        let parsed = parsed.ok_or_else(|| unexpected_status(route, status))?;
        parsed.into_result().map(|_| ()).map_err(ClientError::Service)
    }
}

#[async_trait]
impl SessionService for HttpBackend {
    async fn create_session(&self, domain: Domain, id: &SessionId) -> Result<(), ClientError> {
        let body = CreateSessionRequest {
            domain,
            session_id: id.clone(),
        };
        self.ack(routes::CREATE_SESSION, &body).await
    }

    async fn fetch_history(
        &self,
        domain: Domain,
        id: &SessionId,
    ) -> Result<Vec<Message>, ClientError> {
        let body = SessionRequest {
            session_id: id.clone(),
            domain,
        };
        let (status, parsed) = self
            .post::<_, HistoryResponse>(routes::SESSION_HISTORY, Some(&body))
            .await?;
        if status == StatusCode::NOT_FOUND {
            warn!("backend does not know session (domain={domain}, session_id={id})");
            return Ok(Vec::new());
        }
        let parsed = parsed.ok_or_else(|| unexpected_status(routes::SESSION_HISTORY, status))?;
        parsed.into_result().map_err(ClientError::Service)
    }

    async fn delete_session(&self, domain: Domain, id: &SessionId) -> Result<(), ClientError> {
        let body = SessionRequest {
            session_id: id.clone(),
            domain,
        };
        self.ack(routes::DELETE_SESSION, &body).await
    }

    async fn chat(
        &self,
        domain: Domain,
        id: &SessionId,
        query: &str,
    ) -> Result<Vec<Message>, ClientError> {
        let body = ChatRequest {
            query: query.to_string(),
            domain,
            session_id: id.clone(),
        };
        let (status, parsed) = self
            .post::<_, ChatResponse>(routes::CHAT, Some(&body))
            .await?;
        match parsed {
            Some(ChatResponse::History { history }) => Ok(history),
            Some(ChatResponse::Rejected { error }) => Err(ClientError::Service(error)),
            None => Err(unexpected_status(routes::CHAT, status)),
        }
    }
}

pub(crate) fn malformed(route: &str, detail: impl Into<String>) -> ClientError {
    ClientError::MalformedResponse {
        endpoint: route.to_string(),
        detail: detail.into(),
    }
}

pub(crate) fn unexpected_status(route: &str, status: StatusCode) -> ClientError {
    malformed(route, format!("unexpected body with status {}", status.as_u16()))
}

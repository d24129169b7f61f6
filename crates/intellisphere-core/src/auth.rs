//! Account forms and the login status shown in the header.

use crate::cache::USER_KEY;
use crate::error::ClientError;
use crate::remote::{HttpBackend, unexpected_status};
use crate::storage::{KeyValueStore, StorageError};
use async_trait::async_trait;
use intellisphere_protocol::{
    AckResponse, LoginRequest, LogoutResponse, SignupRequest, routes,
};
use log::{info, warn};
use std::sync::Arc;

/// Minimum password length, counted in characters.
pub const MIN_PASSWORD_CHARS: usize = 8;

/// Problems with a signup form, in display order.
pub fn signup_errors(firstname: &str, email: &str, password: &str, repeat: &str) -> Vec<String> {
    let mut errors = Vec::new();
    if firstname.is_empty() {
        errors.push("Firstname is required".to_string());
    }
    if email.is_empty() {
        errors.push("Email is required".to_string());
    }
    if password.is_empty() {
        errors.push("Password is required".to_string());
    }
    if password.chars().count() < MIN_PASSWORD_CHARS {
        errors.push("Password must have at least 8 characters".to_string());
    }
    if password != repeat {
        errors.push("Passwords do not match".to_string());
    }
    errors
}

/// Problems with a login form, in display order.
pub fn login_errors(email: &str, password: &str) -> Vec<String> {
    let mut errors = Vec::new();
    if email.is_empty() {
        errors.push("Email is required".to_string());
    }
    if password.is_empty() {
        errors.push("Password is required".to_string());
    }
    errors
}

/// Greeting for the logged-in user, if one is recorded.
pub fn login_status(store: &dyn KeyValueStore) -> Result<Option<String>, StorageError> {
    Ok(store
        .get(USER_KEY)?
        .filter(|user| !user.is_empty())
        .map(|user| format!("Welcome, {user}!")))
}

/// Backend account endpoints.
#[async_trait]
pub trait AccountService: Send + Sync {
    /// Returns the backend's confirmation message.
    async fn signup(&self, request: &SignupRequest) -> Result<Option<String>, ClientError>;
    async fn login(&self, request: &LoginRequest) -> Result<Option<String>, ClientError>;
    async fn logout(&self) -> Result<Option<String>, ClientError>;
}

#[async_trait]
impl AccountService for HttpBackend {
    async fn signup(&self, request: &SignupRequest) -> Result<Option<String>, ClientError> {
        let (status, parsed) = self
            .post::<_, AckResponse>(routes::SIGNUP, Some(request))
            .await?;
        let parsed = parsed.ok_or_else(|| unexpected_status(routes::SIGNUP, status))?;
        parsed.into_result().map_err(ClientError::Service)
    }

    async fn login(&self, request: &LoginRequest) -> Result<Option<String>, ClientError> {
        let (status, parsed) = self
            .post::<_, AckResponse>(routes::LOGIN, Some(request))
            .await?;
        let parsed = parsed.ok_or_else(|| unexpected_status(routes::LOGIN, status))?;
        parsed.into_result().map_err(ClientError::Service)
    }

    async fn logout(&self) -> Result<Option<String>, ClientError> {
        let (_, parsed) = self
            .post::<(), LogoutResponse>(routes::LOGOUT, None)
            .await?;
        Ok(parsed.and_then(|body| body.message))
    }
}

/// Form validation in front of the account endpoints, plus the recorded user.
pub struct AccountClient {
    service: Arc<dyn AccountService>,
    store: Arc<dyn KeyValueStore>,
}

impl AccountClient {
    pub fn new(service: Arc<dyn AccountService>, store: Arc<dyn KeyValueStore>) -> Self {
        Self { service, store }
    }

    /// Create an account; invalid forms never reach the backend.
    pub async fn signup(
        &self,
        firstname: &str,
        email: &str,
        password: &str,
        repeat: &str,
    ) -> Result<String, ClientError> {
        let errors = signup_errors(firstname, email, password, repeat);
        if !errors.is_empty() {
            return Err(ClientError::Validation(errors));
        }
        let request = SignupRequest {
            firstname: firstname.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        let message = self.service.signup(&request).await?;
        info!("account created (email={email})");
        Ok(message.unwrap_or_else(|| "Signup successful!".to_string()))
    }

    /// Log in and remember the email for the login status.
    pub async fn login(&self, email: &str, password: &str) -> Result<String, ClientError> {
        let errors = login_errors(email, password);
        if !errors.is_empty() {
            return Err(ClientError::Validation(errors));
        }
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let message = self.service.login(&request).await?;
        self.store.set(USER_KEY, email)?;
        info!("logged in (email={email})");
        Ok(message.unwrap_or_else(|| "Login successful!".to_string()))
    }

    /// Log out; the recorded user is forgotten once the backend answers.
    pub async fn logout(&self) -> Result<String, ClientError> {
        let message = self.service.logout().await?;
        self.store.remove(USER_KEY)?;
        if message.is_none() {
            warn!("logout reply carried no message");
        }
        Ok(message.unwrap_or_else(|| "Logged out.".to_string()))
    }

    pub fn status(&self) -> Result<Option<String>, StorageError> {
        login_status(self.store.as_ref())
    }
}

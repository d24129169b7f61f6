use crate::session::Failure;
use async_trait::async_trait;
use intellisphere_core::{AccountService, ClientError};
use intellisphere_protocol::{LoginRequest, SignupRequest};
use parking_lot::Mutex;
use std::sync::Arc;

/// One recorded account call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountCall {
    Signup(SignupRequest),
    Login(LoginRequest),
    Logout,
}

/// `AccountService` that accepts everything unless told to fail.
#[derive(Clone, Default)]
pub struct StubAccountService {
    calls: Arc<Mutex<Vec<AccountCall>>>,
    failure: Arc<Mutex<Option<Failure>>>,
}

impl StubAccountService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every call with `failure`.
    pub fn failing(failure: Failure) -> Self {
        let stub = Self::default();
        *stub.failure.lock() = Some(failure);
        stub
    }

    pub fn calls(&self) -> Vec<AccountCall> {
        self.calls.lock().clone()
    }

    fn answer(&self, call: AccountCall, message: &str) -> Result<Option<String>, ClientError> {
        self.calls.lock().push(call);
        match self.failure.lock().as_ref() {
            Some(Failure::Service(text)) => Err(ClientError::Service(text.clone())),
            Some(Failure::Transport(text)) => Err(ClientError::Transport(text.clone())),
            None => Ok(Some(message.to_string())),
        }
    }
}

#[async_trait]
impl AccountService for StubAccountService {
    async fn signup(&self, request: &SignupRequest) -> Result<Option<String>, ClientError> {
        self.answer(AccountCall::Signup(request.clone()), "Signup successful!")
    }

    async fn login(&self, request: &LoginRequest) -> Result<Option<String>, ClientError> {
        self.answer(AccountCall::Login(request.clone()), "Login successful!")
    }

    async fn logout(&self) -> Result<Option<String>, ClientError> {
        self.answer(AccountCall::Logout, "Logged out successfully!")
    }
}

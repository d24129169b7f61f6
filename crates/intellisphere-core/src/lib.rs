//! Session lifecycle core for the IntelliSphere client.
//!
//! This crate owns the local session cache, the remote session service, the
//! controller that keeps both consistent, and the transcript and session list
//! models drawn by the terminal front end.

pub mod auth;
pub mod cache;
pub mod controller;
pub mod error;
pub mod remote;
pub mod storage;
pub mod transcript;
pub mod view;

pub use auth::{AccountClient, AccountService, login_errors, login_status, signup_errors};
pub use cache::{LocalSessionCache, SessionMap, SessionMeta};
pub use controller::{Command, FetchTicket, PendingTurn, SessionController, error_text};
/// Error types shared across the client.
pub use error::ClientError;
pub use remote::{HttpBackend, SessionService};
pub use storage::{JsonFileStore, KeyValueStore, MemoryStore, StorageError};
pub use transcript::{Block, Transcript};
pub use view::{SessionListView, SessionRow};

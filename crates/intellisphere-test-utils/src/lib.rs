//! Test helpers shared across IntelliSphere crates.

pub mod account;
pub mod session;

pub use account::{AccountCall, StubAccountService};
pub use session::{Failure, ScriptedSessionService, ServiceCall};

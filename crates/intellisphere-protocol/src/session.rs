//! Session identifiers and transcript messages.

use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Alphabet for the random id suffix.
const SUFFIX_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
/// Length of the random id suffix.
const SUFFIX_LEN: usize = 6;

/// Client-generated session identifier.
///
/// Ids are minted without coordinating with the backend: the creation time in
/// epoch milliseconds joined to a short random base-36 suffix. Collisions are
/// improbable, not impossible.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Wrap an existing identifier.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Mint a fresh identifier from the wall clock and thread rng.
    pub fn generate() -> Self {
        Self::generate_at(Utc::now().timestamp_millis(), &mut rand::rng())
    }

    /// Mint an identifier for a given timestamp using the provided rng.
    pub fn generate_at<R: Rng + ?Sized>(millis: i64, rng: &mut R) -> Self {
        let suffix: String = (0..SUFFIX_LEN)
            .map(|_| {
                let idx = rng.random_range(0..SUFFIX_ALPHABET.len());
                SUFFIX_ALPHABET[idx] as char
            })
            .collect();
        Self(format!("{millis}_{suffix}"))
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form used in headers and logs.
    pub fn short(&self) -> &str {
        match self.0.split_once('_') {
            Some((_, suffix)) if !suffix.is_empty() => suffix,
            _ => &self.0,
        }
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// One exchange in a session transcript.
///
/// Either side may be missing; order in the history is the only identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot: Option<String>,
}

impl Message {
    /// Build a complete user/bot exchange.
    pub fn exchange(user: impl Into<String>, bot: impl Into<String>) -> Self {
        Self {
            user: Some(user.into()),
            bot: Some(bot.into()),
        }
    }

    /// Build a user-only message.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            user: Some(text.into()),
            bot: None,
        }
    }

    /// Build a bot-only message.
    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            user: None,
            bot: Some(text.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Message, SessionId};
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn generated_ids_carry_time_and_suffix() {
        let mut rng = StdRng::seed_from_u64(7);
        let id = SessionId::generate_at(1_700_000_000_123, &mut rng);
        let (millis, suffix) = id.as_str().split_once('_').expect("separator");
        assert_eq!(millis, "1700000000123");
        assert_eq!(suffix.len(), 6);
        assert!(
            suffix
                .chars()
                .all(|ch| ch.is_ascii_digit() || ch.is_ascii_lowercase())
        );
        assert_eq!(id.short(), suffix);
    }

    #[test]
    fn generated_ids_differ() {
        let first = SessionId::generate();
        let second = SessionId::generate();
        assert_ne!(first, second);
    }

    #[test]
    fn message_omits_missing_sides() {
        let value = serde_json::to_value(Message::user("hi")).expect("serialize");
        assert_eq!(value, serde_json::json!({ "user": "hi" }));

        let parsed: Message = serde_json::from_str(r#"{"bot":"hello"}"#).expect("parse");
        assert_eq!(parsed, Message::bot("hello"));
    }
}

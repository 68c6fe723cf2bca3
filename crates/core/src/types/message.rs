//! Chat messages and the parties to a thread.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::email::Email;
use super::id::{MessageId, RequestId};

/// A message in a request's thread. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub request_id: RequestId,
    pub sender_email: Email,
    pub content: String,
    /// Server clock at receipt.
    pub sent_at: DateTime<Utc>,
}

impl Message {
    /// Whether `email` sent this message.
    #[must_use]
    pub fn is_from(&self, email: &Email) -> bool {
        &self.sender_email == email
    }
}

/// Which side of a request the caller is on, in a chat listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    /// The caller owns the request.
    Requester,
    /// The caller has claimed the request.
    Helper,
}

/// The other party of a thread, as shown to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counterpart {
    pub name: String,
    pub email: String,
}

impl Counterpart {
    /// Display identity for a resolved account, or the `Unknown` placeholder.
    #[must_use]
    pub fn from_email(email: Option<&Email>) -> Self {
        email.map_or_else(
            || Self {
                name: "Unknown".to_owned(),
                email: String::new(),
            },
            |email| Self {
                name: email.display_name(),
                email: email.as_str().to_owned(),
            },
        )
    }
}

/// Whether message content has anything besides whitespace.
#[must_use]
pub fn is_blank(content: &str) -> bool {
    content.trim().is_empty()
}

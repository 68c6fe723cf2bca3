//! Accounts known to the directory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::email::Email;
use super::id::AccountId;

/// An account, created the first time a verified email reaches the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    /// Unique and immutable.
    pub email: Email,
    pub created_at: DateTime<Utc>,
}

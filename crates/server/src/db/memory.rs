//! In-process store for tests and local demos.
//!
//! Mirrors the `PostgreSQL` semantics the services rely on: ids are assigned
//! in increasing order, claimant writes are compare-and-set, and deleting a
//! request drops its items and thread.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, NaiveDate, Utc};

use neighbourly_core::{
    Account, AccountId, Email, HelpRequest, Message, MessageId, NewHelpRequest, RequestId,
};

use super::{AccountStore, MessageStore, Readiness, RepositoryError, RequestStore};

#[derive(Debug, Default)]
struct Tables {
    accounts: BTreeMap<AccountId, Account>,
    requests: BTreeMap<RequestId, HelpRequest>,
    messages: Vec<Message>,
    next_account: i64,
    next_request: i64,
    next_message: i64,
}

impl Tables {
    fn next_id(counter: &mut i64) -> i64 {
        *counter += 1;
        *counter
    }
}

/// A [`Store`](super::Store) held in memory. Clones share the same tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn collect_requests(&self, keep: impl Fn(&HelpRequest) -> bool) -> Vec<HelpRequest> {
        self.tables()
            .requests
            .values()
            .filter(|r| keep(r))
            .cloned()
            .collect()
    }
}

impl Readiness for MemoryStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

impl AccountStore for MemoryStore {
    async fn find_or_create_account(&self, email: &Email) -> Result<Account, RepositoryError> {
        let mut tables = self.tables();
        if let Some(account) = tables.accounts.values().find(|a| &a.email == email) {
            return Ok(account.clone());
        }

        let id = AccountId::new(Tables::next_id(&mut tables.next_account));
        let account = Account {
            id,
            email: email.clone(),
            created_at: Utc::now(),
        };
        tables.accounts.insert(id, account.clone());
        Ok(account)
    }

    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, RepositoryError> {
        Ok(self.tables().accounts.get(&id).cloned())
    }
}

impl RequestStore for MemoryStore {
    async fn insert_request(
        &self,
        owner: AccountId,
        request: &NewHelpRequest,
        created_at: DateTime<Utc>,
    ) -> Result<HelpRequest, RepositoryError> {
        let mut tables = self.tables();
        if !tables.accounts.contains_key(&owner) {
            return Err(RepositoryError::NotFound);
        }

        let id = RequestId::new(Tables::next_id(&mut tables.next_request));
        let stored = HelpRequest {
            id,
            owner_id: owner,
            message: request.message.clone(),
            location: request.location,
            address: request.address.clone(),
            pickup_time: request.pickup_time.clone(),
            pickup_date: request.pickup_date,
            items: request.items.clone(),
            claimed_by: None,
            created_at,
        };
        tables.requests.insert(id, stored.clone());
        Ok(stored)
    }

    async fn get_request(&self, id: RequestId) -> Result<Option<HelpRequest>, RepositoryError> {
        Ok(self.tables().requests.get(&id).cloned())
    }

    async fn list_open(&self, today: NaiveDate) -> Result<Vec<HelpRequest>, RepositoryError> {
        Ok(self.collect_requests(|r| r.is_available(today)))
    }

    async fn list_owned_by(&self, owner: AccountId) -> Result<Vec<HelpRequest>, RepositoryError> {
        Ok(self.collect_requests(|r| r.owner_id == owner))
    }

    async fn list_claimed_by(
        &self,
        helper: AccountId,
    ) -> Result<Vec<HelpRequest>, RepositoryError> {
        Ok(self.collect_requests(|r| r.claimed_by == Some(helper)))
    }

    async fn first_owned_by(
        &self,
        owner: AccountId,
    ) -> Result<Option<HelpRequest>, RepositoryError> {
        Ok(self
            .tables()
            .requests
            .values()
            .find(|r| r.owner_id == owner)
            .cloned())
    }

    async fn set_claimant(
        &self,
        id: RequestId,
        expected: Option<AccountId>,
        new: Option<AccountId>,
    ) -> Result<bool, RepositoryError> {
        let mut tables = self.tables();
        match tables.requests.get_mut(&id) {
            Some(request) if request.claimed_by == expected => {
                request.claimed_by = new;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_request(&self, id: RequestId) -> Result<bool, RepositoryError> {
        let mut tables = self.tables();
        let removed = tables.requests.remove(&id).is_some();
        if removed {
            tables.messages.retain(|m| m.request_id != id);
        }
        Ok(removed)
    }

    async fn delete_claimed_by(
        &self,
        id: RequestId,
        helper: AccountId,
    ) -> Result<bool, RepositoryError> {
        let mut tables = self.tables();
        if tables.requests.get(&id).and_then(|r| r.claimed_by) != Some(helper) {
            return Ok(false);
        }
        tables.requests.remove(&id);
        tables.messages.retain(|m| m.request_id != id);
        Ok(true)
    }
}

impl MessageStore for MemoryStore {
    async fn insert_message(
        &self,
        request_id: RequestId,
        sender: &Email,
        content: &str,
        sent_at: DateTime<Utc>,
    ) -> Result<Message, RepositoryError> {
        let mut tables = self.tables();
        if !tables.requests.contains_key(&request_id) {
            return Err(RepositoryError::NotFound);
        }

        let message = Message {
            id: MessageId::new(Tables::next_id(&mut tables.next_message)),
            request_id,
            sender_email: sender.clone(),
            content: content.to_owned(),
            sent_at,
        };
        tables.messages.push(message.clone());
        Ok(message)
    }

    async fn list_messages(&self, request_id: RequestId) -> Result<Vec<Message>, RepositoryError> {
        let mut thread: Vec<Message> = self
            .tables()
            .messages
            .iter()
            .filter(|m| m.request_id == request_id)
            .cloned()
            .collect();
        thread.sort_by_key(|m| (m.sent_at, m.id));
        Ok(thread)
    }

    async fn latest_message(
        &self,
        request_id: RequestId,
    ) -> Result<Option<Message>, RepositoryError> {
        Ok(self
            .tables()
            .messages
            .iter()
            .filter(|m| m.request_id == request_id)
            .max_by_key(|m| (m.sent_at, m.id))
            .cloned())
    }
}

//! Per-request chat threads.
//!
//! A thread has no entity of its own; it is the messages attached to one
//! request, readable and writable by the request's owner and claimant.

use tracing::{debug, instrument};

use neighbourly_core::lifecycle::{counterpart_of, require_chat_access};
use neighbourly_core::types::message::is_blank;
use neighbourly_core::{Account, AccountId, ChatRole, Clock, Email, HelpRequest, Message, RequestId};

use super::ServiceError;
use crate::db::Store;

/// A message as seen by one participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadMessage {
    pub message: Message,
    pub is_mine: bool,
}

/// A request's thread as seen by one participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thread {
    pub request_id: RequestId,
    pub messages: Vec<ThreadMessage>,
    /// `None` when the caller owns the request and nobody has claimed it.
    pub counterpart: Option<Counterparty>,
}

/// The other participant. `email` is `None` if their account is missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Counterparty {
    pub email: Option<Email>,
}

/// One entry of the caller's chat list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSummary {
    pub request_id: RequestId,
    pub role: ChatRole,
    pub counterpart: Counterparty,
    pub address: String,
    pub last_message: Option<ThreadMessage>,
}

/// Chat operations over a [`Store`].
pub struct ChatService<'a, S> {
    store: &'a S,
    clock: &'a dyn Clock,
}

impl<'a, S: Store> ChatService<'a, S> {
    /// Create a chat service.
    #[must_use]
    pub const fn new(store: &'a S, clock: &'a dyn Clock) -> Self {
        Self { store, clock }
    }

    /// The thread for `id`, oldest message first.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the request does not exist and `Forbidden`
    /// unless the caller is its owner or claimant.
    #[instrument(skip(self, caller), fields(caller = %caller.id))]
    pub async fn list_messages(
        &self,
        caller: &Account,
        id: RequestId,
    ) -> Result<Thread, ServiceError> {
        let request = self.load(id).await?;
        require_chat_access(&request, caller.id)?;

        let messages = self
            .store
            .list_messages(id)
            .await?
            .into_iter()
            .map(|message| seen_by(message, &caller.email))
            .collect();

        let counterpart = match counterpart_of(&request, caller.id) {
            Some(other) => Some(self.resolve(other).await?),
            None => None,
        };

        Ok(Thread {
            request_id: id,
            messages,
            counterpart,
        })
    }

    /// Append a message to the thread for `id`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for blank content, `NotFound` if the request
    /// does not exist and `Forbidden` unless the caller is a participant.
    #[instrument(skip(self, caller, content), fields(caller = %caller.id))]
    pub async fn send_message(
        &self,
        caller: &Account,
        id: RequestId,
        content: &str,
    ) -> Result<Message, ServiceError> {
        if is_blank(content) {
            return Err(ServiceError::InvalidInput("content is required".to_owned()));
        }

        let request = self.load(id).await?;
        require_chat_access(&request, caller.id)?;

        let message = self
            .store
            .insert_message(id, &caller.email, content, self.clock.now())
            .await?;
        debug!(message_id = %message.id, "Message stored");
        Ok(message)
    }

    /// Threads the caller takes part in: first the caller's own claimed
    /// requests, then the requests the caller is helping with.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if a query fails.
    #[instrument(skip(self, caller), fields(caller = %caller.id))]
    pub async fn list_my_chats(&self, caller: &Account) -> Result<Vec<ChatSummary>, ServiceError> {
        let mut chats = Vec::new();

        for request in self.store.list_owned_by(caller.id).await? {
            if let Some(helper) = request.claimed_by {
                chats.push(self.summary(caller, request, ChatRole::Requester, helper).await?);
            }
        }

        for request in self.store.list_claimed_by(caller.id).await? {
            let owner = request.owner_id;
            chats.push(self.summary(caller, request, ChatRole::Helper, owner).await?);
        }

        Ok(chats)
    }

    async fn summary(
        &self,
        caller: &Account,
        request: HelpRequest,
        role: ChatRole,
        other: AccountId,
    ) -> Result<ChatSummary, ServiceError> {
        let last_message = self
            .store
            .latest_message(request.id)
            .await?
            .map(|message| seen_by(message, &caller.email));

        Ok(ChatSummary {
            request_id: request.id,
            role,
            counterpart: self.resolve(other).await?,
            address: request.address,
            last_message,
        })
    }

    async fn resolve(&self, account: AccountId) -> Result<Counterparty, ServiceError> {
        let email = self.store.get_account(account).await?.map(|a| a.email);
        Ok(Counterparty { email })
    }

    async fn load(&self, id: RequestId) -> Result<HelpRequest, ServiceError> {
        self.store
            .get_request(id)
            .await?
            .ok_or(ServiceError::NotFound)
    }
}

fn seen_by(message: Message, viewer: &Email) -> ThreadMessage {
    let is_mine = message.is_from(viewer);
    ThreadMessage { message, is_mine }
}

//! Chat route handlers.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection, rejection::PathRejection},
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use neighbourly_core::{ChatRole, Counterpart, MessageId, RequestId};

use super::{OrderIdValue, json_body, path_id};
use crate::db::Store;
use crate::error::{AppError, Result};
use crate::middleware::RequireAccount;
use crate::services::{ChatSummary, Counterparty, Thread, ThreadMessage};
use crate::state::AppState;

/// A message as the frontend sees it.
#[derive(Debug, Serialize)]
pub struct MessageView {
    pub id: MessageId,
    pub sender_email: String,
    pub content: String,
    pub timestamp: String,
    pub is_mine: bool,
}

impl From<ThreadMessage> for MessageView {
    fn from(seen: ThreadMessage) -> Self {
        Self {
            id: seen.message.id,
            sender_email: seen.message.sender_email.into(),
            content: seen.message.content,
            timestamp: rfc3339(seen.message.sent_at),
            is_mine: seen.is_mine,
        }
    }
}

/// Response for `GET /messages/{order_id}`.
#[derive(Debug, Serialize)]
pub struct ThreadView {
    pub messages: Vec<MessageView>,
    pub other_user: Option<Counterpart>,
    pub order_id: RequestId,
}

impl From<Thread> for ThreadView {
    fn from(thread: Thread) -> Self {
        Self {
            messages: thread.messages.into_iter().map(Into::into).collect(),
            other_user: thread.counterpart.map(counterpart),
            order_id: thread.request_id,
        }
    }
}

/// Newest message in a chat list entry.
#[derive(Debug, Serialize)]
pub struct LastMessageView {
    pub content: String,
    pub timestamp: String,
    pub is_mine: bool,
}

/// One entry of `GET /my-chats`.
#[derive(Debug, Serialize)]
pub struct ChatView {
    pub order_id: RequestId,
    pub role: ChatRole,
    pub other_user: Counterpart,
    pub address: String,
    pub last_message: Option<LastMessageView>,
}

impl From<ChatSummary> for ChatView {
    fn from(chat: ChatSummary) -> Self {
        Self {
            order_id: chat.request_id,
            role: chat.role,
            other_user: counterpart(chat.counterpart),
            address: chat.address,
            last_message: chat.last_message.map(|seen| LastMessageView {
                content: seen.message.content,
                timestamp: rfc3339(seen.message.sent_at),
                is_mine: seen.is_mine,
            }),
        }
    }
}

/// Response for `GET /my-chats`.
#[derive(Debug, Serialize)]
pub struct ChatsView {
    pub chats: Vec<ChatView>,
}

/// Body of `POST /send-message`.
#[derive(Debug, Deserialize)]
pub struct SendMessageBody {
    pub order_id: Option<OrderIdValue>,
    pub content: Option<String>,
}

fn counterpart(party: Counterparty) -> Counterpart {
    Counterpart::from_email(party.email.as_ref())
}

fn rfc3339(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// The thread for one request.
///
/// # Route
///
/// `GET /messages/{order_id}`
pub async fn messages<S: Store>(
    State(state): State<AppState<S>>,
    RequireAccount(caller): RequireAccount,
    order_id: std::result::Result<Path<i64>, PathRejection>,
) -> Result<Json<ThreadView>> {
    let id = path_id(order_id)?;
    let thread = state.chat().list_messages(&caller.account, id).await?;
    Ok(Json(thread.into()))
}

/// Post to a request's thread.
///
/// # Route
///
/// `POST /send-message`
pub async fn send<S: Store>(
    State(state): State<AppState<S>>,
    RequireAccount(caller): RequireAccount,
    payload: std::result::Result<Json<SendMessageBody>, JsonRejection>,
) -> Result<Json<serde_json::Value>> {
    let body = json_body(payload)?;
    let id = body
        .order_id
        .ok_or_else(|| AppError::BadRequest("order_id is required".to_string()))?
        .to_request_id()?;
    let content = body
        .content
        .ok_or_else(|| AppError::BadRequest("content is required".to_string()))?;

    let message = state.chat().send_message(&caller.account, id, &content).await?;
    let view = MessageView::from(ThreadMessage {
        message,
        is_mine: true,
    });
    Ok(Json(serde_json::json!({ "success": true, "message": view })))
}

/// Threads the caller takes part in.
///
/// # Route
///
/// `GET /my-chats`
pub async fn my_chats<S: Store>(
    State(state): State<AppState<S>>,
    RequireAccount(caller): RequireAccount,
) -> Result<Json<ChatsView>> {
    let chats = state.chat().list_my_chats(&caller.account).await?;
    Ok(Json(ChatsView {
        chats: chats.into_iter().map(Into::into).collect(),
    }))
}

//! Chat message queries for [`PgStore`].

use chrono::{DateTime, Utc};

use neighbourly_core::{Email, Message, MessageId, RequestId};

use super::{MessageStore, PgStore, RepositoryError, stored_email};

#[derive(sqlx::FromRow)]
struct MessageRow {
    id: i64,
    request_id: i64,
    sender_email: String,
    content: String,
    sent_at: DateTime<Utc>,
}

impl TryFrom<MessageRow> for Message {
    type Error = RepositoryError;

    fn try_from(row: MessageRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: MessageId::new(row.id),
            request_id: RequestId::new(row.request_id),
            sender_email: stored_email(&row.sender_email)?,
            content: row.content,
            sent_at: row.sent_at,
        })
    }
}

impl MessageStore for PgStore {
    async fn insert_message(
        &self,
        request_id: RequestId,
        sender: &Email,
        content: &str,
        sent_at: DateTime<Utc>,
    ) -> Result<Message, RepositoryError> {
        let row = sqlx::query_as::<_, MessageRow>(
            r"
            INSERT INTO neighbourly.message (request_id, sender_email, content, sent_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, request_id, sender_email, content, sent_at
            ",
        )
        .bind(request_id.as_i64())
        .bind(sender.as_str())
        .bind(content)
        .bind(sent_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            // The request was deleted between the access check and the insert
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_foreign_key_violation()
            {
                return RepositoryError::NotFound;
            }
            RepositoryError::Database(e)
        })?;

        row.try_into()
    }

    async fn list_messages(&self, request_id: RequestId) -> Result<Vec<Message>, RepositoryError> {
        let rows = sqlx::query_as::<_, MessageRow>(
            r"
            SELECT id, request_id, sender_email, content, sent_at
            FROM neighbourly.message
            WHERE request_id = $1
            ORDER BY sent_at, id
            ",
        )
        .bind(request_id.as_i64())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Message::try_from).collect()
    }

    async fn latest_message(
        &self,
        request_id: RequestId,
    ) -> Result<Option<Message>, RepositoryError> {
        let row = sqlx::query_as::<_, MessageRow>(
            r"
            SELECT id, request_id, sender_email, content, sent_at
            FROM neighbourly.message
            WHERE request_id = $1
            ORDER BY sent_at DESC, id DESC
            LIMIT 1
            ",
        )
        .bind(request_id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Message::try_from).transpose()
    }
}

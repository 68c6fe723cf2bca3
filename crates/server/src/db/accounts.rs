//! Account queries for [`PgStore`].

use chrono::{DateTime, Utc};

use neighbourly_core::{Account, AccountId, Email};

use super::{AccountStore, PgStore, RepositoryError, stored_email};

#[derive(sqlx::FromRow)]
struct AccountRow {
    id: i64,
    email: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for Account {
    type Error = RepositoryError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: AccountId::new(row.id),
            email: stored_email(&row.email)?,
            created_at: row.created_at,
        })
    }
}

impl AccountStore for PgStore {
    async fn find_or_create_account(&self, email: &Email) -> Result<Account, RepositoryError> {
        // The no-op update makes RETURNING yield the existing row on conflict.
        let row = sqlx::query_as::<_, AccountRow>(
            r"
            INSERT INTO neighbourly.account (email)
            VALUES ($1)
            ON CONFLICT (email) DO UPDATE SET email = EXCLUDED.email
            RETURNING id, email, created_at
            ",
        )
        .bind(email.as_str())
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, RepositoryError> {
        let row = sqlx::query_as::<_, AccountRow>(
            r"
            SELECT id, email, created_at
            FROM neighbourly.account
            WHERE id = $1
            ",
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Account::try_from).transpose()
    }
}

//! Help request queries for [`PgStore`].
//!
//! Items live in their own table and are loaded with a second query keyed on
//! the request ids of the first. Both queries run in one `REPEATABLE READ`
//! transaction so they see the same snapshot.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, Postgres, QueryBuilder, Transaction};

use neighbourly_core::{
    AccountId, HelpRequest, Location, NewHelpRequest, RequestId, RequestItem,
};

use super::{PgStore, RepositoryError, RequestStore};

const REQUEST_COLUMNS: &str = "id, owner_id, message, lat, lng, address, collection_time, \
                               collection_date, claimed_by, created_at";

#[derive(sqlx::FromRow)]
struct RequestRow {
    id: i64,
    owner_id: i64,
    message: String,
    lat: Decimal,
    lng: Decimal,
    address: String,
    collection_time: String,
    collection_date: Option<NaiveDate>,
    claimed_by: Option<i64>,
    created_at: DateTime<Utc>,
}

impl RequestRow {
    fn into_request(self, items: Vec<RequestItem>) -> Result<HelpRequest, RepositoryError> {
        let location = Location::new(self.lat, self.lng).map_err(|e| {
            RepositoryError::DataCorruption(format!("request {}: {e}", self.id))
        })?;

        Ok(HelpRequest {
            id: RequestId::new(self.id),
            owner_id: AccountId::new(self.owner_id),
            message: self.message,
            location,
            address: self.address,
            pickup_time: self.collection_time,
            pickup_date: self.collection_date,
            items,
            claimed_by: self.claimed_by.map(AccountId::new),
            created_at: self.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ItemRow {
    request_id: i64,
    name: String,
    quantity: i32,
}

/// Attach items to each row, preserving row order.
async fn with_items(
    conn: &mut PgConnection,
    rows: Vec<RequestRow>,
) -> Result<Vec<HelpRequest>, RepositoryError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
    let items = sqlx::query_as::<_, ItemRow>(
        r"
        SELECT request_id, name, quantity
        FROM neighbourly.request_item
        WHERE request_id = ANY($1)
        ORDER BY request_id, position
        ",
    )
    .bind(ids.as_slice())
    .fetch_all(&mut *conn)
    .await?;

    let mut by_request: HashMap<i64, Vec<RequestItem>> = HashMap::new();
    for item in items {
        by_request.entry(item.request_id).or_default().push(RequestItem {
            name: item.name,
            quantity: item.quantity,
        });
    }

    rows.into_iter()
        .map(|row| {
            let items = by_request.remove(&row.id).unwrap_or_default();
            row.into_request(items)
        })
        .collect()
}

impl PgStore {
    /// A read-only snapshot for multi-query reads.
    async fn snapshot(&self) -> Result<Transaction<'static, Postgres>, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;
        Ok(tx)
    }

    /// Requests matching `sql` (one bound parameter), with their items.
    async fn fetch_requests<T>(
        &self,
        sql: &str,
        value: T,
    ) -> Result<Vec<HelpRequest>, RepositoryError>
    where
        T: for<'q> sqlx::Encode<'q, Postgres> + sqlx::Type<Postgres> + Send + 'static,
    {
        let mut tx = self.snapshot().await?;
        let rows = sqlx::query_as::<_, RequestRow>(sql)
            .bind(value)
            .fetch_all(&mut *tx)
            .await?;
        let requests = with_items(&mut tx, rows).await?;
        tx.commit().await?;
        Ok(requests)
    }

    /// Requests matching a filter with a single `BIGINT` parameter.
    async fn fetch_requests_by_id(
        &self,
        filter: &str,
        value: i64,
    ) -> Result<Vec<HelpRequest>, RepositoryError> {
        let sql = format!(
            "SELECT {REQUEST_COLUMNS} FROM neighbourly.help_request WHERE {filter} ORDER BY id"
        );
        self.fetch_requests(&sql, value).await
    }
}

impl RequestStore for PgStore {
    async fn insert_request(
        &self,
        owner: AccountId,
        request: &NewHelpRequest,
        created_at: DateTime<Utc>,
    ) -> Result<HelpRequest, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, RequestRow>(&format!(
            r"
            INSERT INTO neighbourly.help_request
                (owner_id, message, lat, lng, address, collection_time, collection_date, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {REQUEST_COLUMNS}
            "
        ))
        .bind(owner.as_i64())
        .bind(&request.message)
        .bind(request.location.lat)
        .bind(request.location.lng)
        .bind(&request.address)
        .bind(&request.pickup_time)
        .bind(request.pickup_date)
        .bind(created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_foreign_key_violation()
            {
                return RepositoryError::NotFound;
            }
            RepositoryError::Database(e)
        })?;

        if !request.items.is_empty() {
            let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new(
                "INSERT INTO neighbourly.request_item (request_id, position, name, quantity) ",
            );
            builder.push_values(request.items.iter().enumerate(), |mut b, (position, item)| {
                // Item lists are a handful of lines
                #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
                let position = position as i32;
                b.push_bind(row.id)
                    .push_bind(position)
                    .push_bind(&item.name)
                    .push_bind(item.quantity);
            });
            builder.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;

        row.into_request(request.items.clone())
    }

    async fn get_request(&self, id: RequestId) -> Result<Option<HelpRequest>, RepositoryError> {
        let mut requests = self.fetch_requests_by_id("id = $1", id.as_i64()).await?;
        Ok(requests.pop())
    }

    async fn list_open(&self, today: NaiveDate) -> Result<Vec<HelpRequest>, RepositoryError> {
        let sql = format!(
            r"
            SELECT {REQUEST_COLUMNS}
            FROM neighbourly.help_request
            WHERE claimed_by IS NULL
              AND (collection_date IS NULL OR collection_date >= $1)
            ORDER BY id
            "
        );
        self.fetch_requests(&sql, today).await
    }

    async fn list_owned_by(&self, owner: AccountId) -> Result<Vec<HelpRequest>, RepositoryError> {
        self.fetch_requests_by_id("owner_id = $1", owner.as_i64())
            .await
    }

    async fn list_claimed_by(
        &self,
        helper: AccountId,
    ) -> Result<Vec<HelpRequest>, RepositoryError> {
        self.fetch_requests_by_id("claimed_by = $1", helper.as_i64())
            .await
    }

    async fn first_owned_by(
        &self,
        owner: AccountId,
    ) -> Result<Option<HelpRequest>, RepositoryError> {
        let mut requests = self
            .fetch_requests_by_id(
                "id = (SELECT MIN(id) FROM neighbourly.help_request WHERE owner_id = $1)",
                owner.as_i64(),
            )
            .await?;
        Ok(requests.pop())
    }

    async fn set_claimant(
        &self,
        id: RequestId,
        expected: Option<AccountId>,
        new: Option<AccountId>,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE neighbourly.help_request
            SET claimed_by = $3
            WHERE id = $1 AND claimed_by IS NOT DISTINCT FROM $2
            ",
        )
        .bind(id.as_i64())
        .bind(expected.map(|a| a.as_i64()))
        .bind(new.map(|a| a.as_i64()))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_request(&self, id: RequestId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM neighbourly.help_request WHERE id = $1")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_claimed_by(
        &self,
        id: RequestId,
        helper: AccountId,
    ) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("DELETE FROM neighbourly.help_request WHERE id = $1 AND claimed_by = $2")
                .bind(id.as_i64())
                .bind(helper.as_i64())
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() == 1)
    }
}

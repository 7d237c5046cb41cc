use async_trait::async_trait;
use keyhole_core::{Record, Result, Store, StoreError, User};
use sqlx::{PgPool, Row};

/// Postgres implementation of the storage contract.
///
/// Soft delete is the `is_deleted` column; reads do not filter it out
/// so callers see deleted records the same way the in-memory backend
/// shows them. User identities come from a dedicated sequence, so the
/// counter survives restarts without a replay step.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

const BOOTSTRAP_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS urls (
    id BIGSERIAL PRIMARY KEY,
    original_url TEXT NOT NULL UNIQUE,
    shortened_path TEXT NOT NULL UNIQUE,
    correlation_id TEXT NOT NULL DEFAULT '',
    user_id BIGINT NOT NULL DEFAULT 0,
    is_deleted BOOLEAN NOT NULL DEFAULT FALSE
);
CREATE SEQUENCE IF NOT EXISTS user_ids START 1;
"#;

impl PgStore {
    /// Creates a store from an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates a store by opening a new pool and running the
    /// idempotent bootstrap DDL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        let store = Self::new(pool);
        store.bootstrap().await?;
        Ok(store)
    }

    async fn bootstrap(&self) -> Result<()> {
        sqlx::raw_sql(BOOTSTRAP_DDL)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(sqlx::error::DatabaseError::is_unique_violation)
}

fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StoreError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StoreError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StoreError::InvalidData(message),
        _ => StoreError::Query(message),
    }
}

fn row_to_record(row: &sqlx::postgres::PgRow) -> Result<Record> {
    Ok(Record {
        original_url: row.try_get("original_url").map_err(map_sqlx_error)?,
        shortened_path: row.try_get("shortened_path").map_err(map_sqlx_error)?,
        correlation_id: row.try_get("correlation_id").map_err(map_sqlx_error)?,
        user_id: row.try_get("user_id").map_err(map_sqlx_error)?,
        is_deleted: row.try_get("is_deleted").map_err(map_sqlx_error)?,
    })
}

#[async_trait]
impl Store for PgStore {
    async fn find_by_original_url(&self, original_url: &str) -> Result<Record> {
        let row = sqlx::query(
            r#"
            SELECT original_url, shortened_path, correlation_id, user_id, is_deleted
            FROM urls
            WHERE original_url = $1
            "#,
        )
        .bind(original_url)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let Some(row) = row else {
            return Err(StoreError::NotFound);
        };
        row_to_record(&row)
    }

    async fn find_by_shortened_path(&self, shortened_path: &str) -> Result<Record> {
        let row = sqlx::query(
            r#"
            SELECT original_url, shortened_path, correlation_id, user_id, is_deleted
            FROM urls
            WHERE shortened_path = $1
            "#,
        )
        .bind(shortened_path)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let Some(row) = row else {
            return Err(StoreError::NotFound);
        };
        row_to_record(&row)
    }

    async fn find_by_user(&self, user: User) -> Result<Vec<Record>> {
        let rows = sqlx::query(
            r#"
            SELECT original_url, shortened_path, correlation_id, user_id, is_deleted
            FROM urls
            WHERE user_id = $1
            "#,
        )
        .bind(user.id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter().map(row_to_record).collect()
    }

    async fn insert(&self, record: Record) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO urls (original_url, shortened_path, correlation_id, user_id, is_deleted)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&record.original_url)
        .bind(&record.shortened_path)
        .bind(&record.correlation_id)
        .bind(record.user_id)
        .bind(record.is_deleted)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => {
                // Fetch the conflicting row so the caller can return it.
                let existing = self.find_by_original_url(&record.original_url).await?;
                Err(StoreError::NotUnique { existing })
            }
            Err(err) => Err(map_sqlx_error(err)),
        }
    }

    async fn batch_upsert(&self, records: Vec<Record>) -> Result<()> {
        for record in records {
            sqlx::query(
                r#"
                INSERT INTO urls (original_url, shortened_path, correlation_id, user_id, is_deleted)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (original_url) DO UPDATE
                SET shortened_path = EXCLUDED.shortened_path,
                    correlation_id = EXCLUDED.correlation_id,
                    user_id = EXCLUDED.user_id,
                    is_deleted = EXCLUDED.is_deleted
                "#,
            )
            .bind(&record.original_url)
            .bind(&record.shortened_path)
            .bind(&record.correlation_id)
            .bind(record.user_id)
            .bind(record.is_deleted)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        }
        Ok(())
    }

    async fn batch_soft_delete(&self, records: Vec<Record>) -> Result<u64> {
        let mut skipped = 0;
        for record in &records {
            let result = sqlx::query(
                r#"
                UPDATE urls
                SET is_deleted = TRUE
                WHERE shortened_path = $1
                  AND user_id = $2
                "#,
            )
            .bind(&record.shortened_path)
            .bind(record.user_id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

            if result.rows_affected() == 0 {
                skipped += 1;
            }
        }
        Ok(skipped)
    }

    async fn create_user(&self) -> Result<User> {
        let row = sqlx::query("SELECT nextval('user_ids') AS id")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let id: i64 = row.try_get("id").map_err(map_sqlx_error)?;
        Ok(User::new(id))
    }
}

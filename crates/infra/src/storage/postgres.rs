//! Postgres-backed user store.
//!
//! Expected schema (managed outside this crate):
//!
//! ```sql
//! CREATE TABLE user_types (
//!     id   SERIAL PRIMARY KEY,
//!     name VARCHAR(15) NOT NULL
//! );
//!
//! CREATE TABLE users (
//!     id           SERIAL PRIMARY KEY,
//!     name         TEXT NOT NULL,
//!     email        TEXT NOT NULL,
//!     user_type_id INT NOT NULL REFERENCES user_types (id)
//! );
//! ```
//!
//! Id columns are `INT4`. Ids are decoded as `i32` and widened into
//! `UserId`/`UserTypeId`; ids outside the `INT4` range cannot name a row, so
//! lookups and deletes for them return `None` without a round trip, and an
//! insert referencing one fails as a foreign key violation.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Code | StorageError |
//! |------------|-----------------|--------------|
//! | Database (foreign key violation) | `23503` | `ForeignKeyViolation` |
//! | Database (other) | any other | `Database` |
//! | PoolClosed / PoolTimedOut / Io / Tls | N/A | `Unavailable` |
//! | ColumnDecode / Decode / ColumnNotFound | N/A | `Decode` |
//! | Other | N/A | `Database` |
//!
//! ## Transactions
//!
//! Writes open a transaction per call, commit on success, and roll back
//! explicitly before returning the failing statement's error. A transaction dropped
//! without commit is rolled back by sqlx as well.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
use tracing::{instrument, warn};

use userhub_core::{NewUser, UserId, UserRecord, UserTypeId};

use super::{StorageError, UserStore};

/// Postgres-backed store for `users` / `user_types`.
///
/// Uses the SQLx connection pool, which is thread-safe; each call checks out
/// its own connection.
#[derive(Debug, Clone)]
pub struct PostgresUserStore {
    pool: Arc<PgPool>,
}

impl PostgresUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Connect a pool for `database_url`.
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    async fn begin(&self) -> Result<Transaction<'static, Postgres>, StorageError> {
        self.pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))
    }
}

#[async_trait]
impl UserStore for PostgresUserStore {
    #[instrument(
        skip(self, user),
        fields(operation = "insert_user", user_type_id = %user.user_type_id()),
        err
    )]
    async fn insert(&self, user: NewUser) -> Result<UserRecord, StorageError> {
        let Some(user_type_id) = id_param(user.user_type_id().as_i64()) else {
            return Err(StorageError::ForeignKeyViolation(format!(
                "user_type_id {} does not reference an existing user type",
                user.user_type_id()
            )));
        };

        let mut tx = self.begin().await?;

        let id = match insert_user(&mut tx, &user, user_type_id).await {
            Ok(id) => id,
            Err(e) => {
                rollback(tx, "insert_user").await;
                return Err(e);
            }
        };

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Ok(user.into_record(id))
    }

    #[instrument(skip(self), fields(operation = "delete_user", user_id = %id), err)]
    async fn delete(&self, id: UserId) -> Result<Option<UserRecord>, StorageError> {
        let Some(id) = id_param(id.as_i64()) else {
            return Ok(None);
        };

        let mut tx = self.begin().await?;

        let deleted = match delete_user(&mut tx, id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                rollback(tx, "delete_user").await;
                return Ok(None);
            }
            Err(e) => {
                rollback(tx, "delete_user").await;
                return Err(e);
            }
        };

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Ok(Some(deleted))
    }

    #[instrument(skip(self), fields(operation = "find_user", user_id = %id), err)]
    async fn find_by_id(&self, id: UserId) -> Result<Option<UserRecord>, StorageError> {
        let Some(id) = id_param(id.as_i64()) else {
            return Ok(None);
        };

        let row = sqlx::query(
            r#"
            SELECT id, name, email, user_type_id
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_user", e))?;

        row.map(|r| decode_user(&r)).transpose()
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

async fn insert_user(
    tx: &mut Transaction<'static, Postgres>,
    user: &NewUser,
    user_type_id: IdColumn,
) -> Result<UserId, StorageError> {
    let row = sqlx::query(
        r#"
        INSERT INTO users (name, email, user_type_id)
        VALUES ($1, $2, $3)
        RETURNING id
        "#,
    )
    .bind(user.name())
    .bind(user.email())
    .bind(user_type_id)
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("insert_user", e))?;

    let id: IdColumn = row
        .try_get("id")
        .map_err(|e| map_sqlx_error("insert_user", e))?;

    Ok(UserId::from_i64(i64::from(id)))
}

async fn delete_user(
    tx: &mut Transaction<'static, Postgres>,
    id: IdColumn,
) -> Result<Option<UserRecord>, StorageError> {
    // Lock the row so the snapshot matches what gets deleted.
    let row = sqlx::query(
        r#"
        SELECT id, name, email, user_type_id
        FROM users
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(id)
    .fetch_optional(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("select_user_for_delete", e))?;

    let Some(row) = row else {
        return Ok(None);
    };
    let snapshot = decode_user(&row)?;

    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("delete_user", e))?;

    Ok(Some(snapshot))
}

async fn rollback(tx: Transaction<'static, Postgres>, operation: &str) {
    if let Err(e) = tx.rollback().await {
        warn!(operation, error = %e, "transaction rollback failed");
    }
}

/// Map SQLx errors to `StorageError`.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StorageError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23503") => StorageError::ForeignKeyViolation(msg),
                _ => StorageError::Database(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StorageError::Unavailable(format!("connection pool closed in {}", operation))
        }
        sqlx::Error::PoolTimedOut => {
            StorageError::Unavailable(format!("connection pool timed out in {}", operation))
        }
        sqlx::Error::Io(e) => StorageError::Unavailable(format!("io error in {}: {}", operation, e)),
        sqlx::Error::Tls(e) => StorageError::Unavailable(format!("tls error in {}: {}", operation, e)),
        e @ (sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::ColumnNotFound(_)) => {
            StorageError::Decode(format!("failed to decode row in {}: {}", operation, e))
        }
        other => StorageError::Database(format!("sqlx error in {}: {}", operation, other)),
    }
}

// SQLx row types

/// Rust type of the `SERIAL`/`INT` id columns.
type IdColumn = i32;

/// Narrow an id to a bind parameter; `None` when no `INT4` row can match.
fn id_param(id: i64) -> Option<IdColumn> {
    IdColumn::try_from(id).ok()
}

#[derive(Debug)]
struct UserRow {
    id: IdColumn,
    name: String,
    email: String,
    user_type_id: IdColumn,
}

impl<'r> FromRow<'r, PgRow> for UserRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(UserRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            user_type_id: row.try_get("user_type_id")?,
        })
    }
}

impl From<UserRow> for UserRecord {
    fn from(row: UserRow) -> Self {
        UserRecord {
            id: UserId::from_i64(i64::from(row.id)),
            name: row.name,
            email: row.email,
            user_type_id: UserTypeId::from_i64(i64::from(row.user_type_id)),
        }
    }
}

fn decode_user(row: &PgRow) -> Result<UserRecord, StorageError> {
    UserRow::from_row(row)
        .map(UserRecord::from)
        .map_err(|e| map_sqlx_error("decode_user", e))
}

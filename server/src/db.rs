//! PostgreSQL-backed store.
//!
//! One pool for the whole process; every query acquires a connection from it
//! for the duration of the call and releases it on drop.

use crate::store::{MemberRecord, Store, StoreError, UserRecord, ROLE_LEADER, ROLE_MEMBER, STATUS_ACTIVE};
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id BIGSERIAL PRIMARY KEY,
        username TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS team_groups (
        id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS user_groups (
        user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        group_id BIGINT NOT NULL REFERENCES team_groups(id) ON DELETE CASCADE,
        role TEXT NOT NULL,
        status TEXT NOT NULL,
        max_kills BIGINT NOT NULL DEFAULT 0,
        PRIMARY KEY (user_id, group_id)
    )",
];

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new().max_connections(10).connect(url).await?;
        Ok(Self { pool })
    }

    /// Creates the three tables if they are missing. Safe to run on every
    /// startup.
    pub async fn ensure_schema(&self) -> Result<(), sqlx::Error> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }
}

fn map_db_err(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return StoreError::Conflict;
        }
        if db.is_foreign_key_violation() {
            return StoreError::NotFound;
        }
    }
    StoreError::Database(e.to_string())
}

#[async_trait]
impl Store for PgStore {
    async fn create_user(&self, username: &str, password_hash: &str) -> Result<i64, StoreError> {
        sqlx::query_scalar("INSERT INTO users (username, password_hash) VALUES ($1, $2) RETURNING id")
            .bind(username)
            .bind(password_hash)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_err)
    }

    async fn user_by_name(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        let row = sqlx::query("SELECT id, username, password_hash FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_err)?;

        Ok(row.map(|r| UserRecord {
            id: r.get("id"),
            username: r.get("username"),
            password_hash: r.get("password_hash"),
        }))
    }

    async fn user_exists(&self, user_id: i64) -> Result<bool, StoreError> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_err)
    }

    async fn create_group(&self, name: &str, creator_id: i64) -> Result<i64, StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_db_err)?;

        let group_id: i64 =
            sqlx::query_scalar("INSERT INTO team_groups (name) VALUES ($1) RETURNING id")
                .bind(name)
                .fetch_one(&mut *tx)
                .await
                .map_err(map_db_err)?;

        sqlx::query(
            "INSERT INTO user_groups (user_id, group_id, role, status, max_kills)
             VALUES ($1, $2, $3, $4, 0)",
        )
        .bind(creator_id)
        .bind(group_id)
        .bind(ROLE_LEADER)
        .bind(STATUS_ACTIVE)
        .execute(&mut *tx)
        .await
        .map_err(map_db_err)?;

        tx.commit().await.map_err(map_db_err)?;
        Ok(group_id)
    }

    async fn group_name(&self, group_id: i64) -> Result<Option<String>, StoreError> {
        sqlx::query_scalar("SELECT name FROM team_groups WHERE id = $1")
            .bind(group_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_err)
    }

    async fn delete_group(&self, group_id: i64) -> Result<(), StoreError> {
        // Membership rows go with the group via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM team_groups WHERE id = $1")
            .bind(group_id)
            .execute(&self.pool)
            .await
            .map_err(map_db_err)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn members(&self, group_id: i64) -> Result<Vec<MemberRecord>, StoreError> {
        let rows = sqlx::query(
            "SELECT ug.user_id, u.username, ug.role, ug.status, ug.max_kills
             FROM user_groups ug
             JOIN users u ON u.id = ug.user_id
             WHERE ug.group_id = $1
             ORDER BY ug.user_id",
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(rows
            .iter()
            .map(|r| MemberRecord {
                user_id: r.get("user_id"),
                username: r.get("username"),
                role: r.get("role"),
                status: r.get("status"),
                best_kills: r.get("max_kills"),
            })
            .collect())
    }

    async fn membership(
        &self,
        group_id: i64,
        user_id: i64,
    ) -> Result<Option<MemberRecord>, StoreError> {
        let row = sqlx::query(
            "SELECT ug.user_id, u.username, ug.role, ug.status, ug.max_kills
             FROM user_groups ug
             JOIN users u ON u.id = ug.user_id
             WHERE ug.group_id = $1 AND ug.user_id = $2",
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(row.map(|r| MemberRecord {
            user_id: r.get("user_id"),
            username: r.get("username"),
            role: r.get("role"),
            status: r.get("status"),
            best_kills: r.get("max_kills"),
        }))
    }

    async fn add_member(&self, group_id: i64, user_id: i64) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO user_groups (user_id, group_id, role, status, max_kills)
             VALUES ($1, $2, $3, $4, 0)",
        )
        .bind(user_id)
        .bind(group_id)
        .bind(ROLE_MEMBER)
        .bind(STATUS_ACTIVE)
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(())
    }

    async fn remove_member(&self, group_id: i64, user_id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM user_groups WHERE group_id = $1 AND user_id = $2")
            .bind(group_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(map_db_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_best_kills(
        &self,
        group_id: i64,
        user_id: i64,
        kills: i64,
    ) -> Result<(), StoreError> {
        // GREATEST keeps the write monotonic even if two submissions race.
        let result = sqlx::query(
            "UPDATE user_groups SET max_kills = GREATEST(max_kills, $3)
             WHERE group_id = $1 AND user_id = $2",
        )
        .bind(group_id)
        .bind(user_id)
        .bind(kills)
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::info;

use super::{
    repo::{UserStore, DUPLICATE_USER},
    repo_types::{NewUser, User, UserPatch, UserRow},
};
use crate::{
    auth::password::hash_password,
    error::{AppError, AppResult},
};

const UNIQUE_VIOLATION: &str = "23505";

/// Postgres-backed store over the `users` table.
#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Insert the demo admin unless a user named `admin` already exists.
    pub async fn seed_admin(&self) -> anyhow::Result<()> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO users (username, email, password_hash, first_name, last_name, role)
            VALUES ('admin', 'admin@example.com', $1, 'Admin', 'User', 'admin')
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(hash_password("admin"))
        .execute(&self.db)
        .await
        .context("seed admin user")?
        .rows_affected();
        if inserted > 0 {
            info!("seeded admin user");
        }
        Ok(())
    }
}

fn db_error(e: sqlx::Error, what: &'static str) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
            return AppError::conflict(DUPLICATE_USER);
        }
    }
    AppError::Internal(anyhow::Error::new(e).context(what))
}

fn into_user(row: UserRow) -> AppResult<User> {
    User::try_from(row).map_err(AppError::Internal)
}

fn like_pattern(term: &str) -> String {
    let escaped = term
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(&self, new_user: NewUser) -> AppResult<User> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (username, email, password_hash, first_name, last_name, role)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, username, email, password_hash, first_name, last_name,
                      role, is_active, created_at, updated_at
            "#,
        )
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(&new_user.first_name)
        .bind(&new_user.last_name)
        .bind(new_user.role.as_str())
        .fetch_one(&self.db)
        .await
        .map_err(|e| db_error(e, "insert user"))?;
        into_user(row)
    }

    async fn get(&self, id: i64) -> AppResult<User> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, email, password_hash, first_name, last_name,
                   role, is_active, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| db_error(e, "get user"))?
        .ok_or(AppError::NotFound)?;
        into_user(row)
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, email, password_hash, first_name, last_name,
                   role, is_active, created_at, updated_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| db_error(e, "find user by username"))?
        .map(into_user)
        .transpose()
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, email, password_hash, first_name, last_name,
                   role, is_active, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| db_error(e, "find user by email"))?
        .map(into_user)
        .transpose()
    }

    async fn list(&self) -> AppResult<Vec<User>> {
        sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, email, password_hash, first_name, last_name,
                   role, is_active, created_at, updated_at
            FROM users
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.db)
        .await
        .map_err(|e| db_error(e, "list users"))?
        .into_iter()
        .map(into_user)
        .collect()
    }

    async fn search(&self, term: &str) -> AppResult<Vec<User>> {
        sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, email, password_hash, first_name, last_name,
                   role, is_active, created_at, updated_at
            FROM users
            WHERE username ILIKE $1
               OR email ILIKE $1
               OR first_name ILIKE $1
               OR last_name ILIKE $1
            ORDER BY id ASC
            "#,
        )
        .bind(like_pattern(term))
        .fetch_all(&self.db)
        .await
        .map_err(|e| db_error(e, "search users"))?
        .into_iter()
        .map(into_user)
        .collect()
    }

    async fn update(&self, id: i64, patch: UserPatch) -> AppResult<User> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            UPDATE users SET
                username   = COALESCE($2, username),
                email      = COALESCE($3, email),
                first_name = COALESCE($4, first_name),
                last_name  = COALESCE($5, last_name),
                role       = COALESCE($6, role),
                is_active  = COALESCE($7, is_active),
                updated_at = now()
            WHERE id = $1
            RETURNING id, username, email, password_hash, first_name, last_name,
                      role, is_active, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&patch.username)
        .bind(&patch.email)
        .bind(&patch.first_name)
        .bind(&patch.last_name)
        .bind(patch.role.map(|r| r.as_str()))
        .bind(patch.is_active)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| db_error(e, "update user"))?
        .ok_or(AppError::NotFound)?;
        into_user(row)
    }

    async fn toggle_active(&self, id: i64) -> AppResult<User> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            UPDATE users SET is_active = NOT is_active, updated_at = now()
            WHERE id = $1
            RETURNING id, username, email, password_hash, first_name, last_name,
                      role, is_active, created_at, updated_at
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| db_error(e, "toggle user"))?
        .ok_or(AppError::NotFound)?;
        into_user(row)
    }

    async fn delete(&self, id: i64) -> AppResult<User> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            DELETE FROM users
            WHERE id = $1
            RETURNING id, username, email, password_hash, first_name, last_name,
                      role, is_active, created_at, updated_at
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| db_error(e, "delete user"))?
        .ok_or(AppError::NotFound)?;
        into_user(row)
    }

    async fn count(&self) -> AppResult<usize> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.db)
            .await
            .map_err(|e| db_error(e, "count users"))?;
        Ok(n.max(0) as usize)
    }
}

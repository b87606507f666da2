use async_trait::async_trait;
use common::UserId;
use sqlx::{PgPool, Postgres, QueryBuilder, Row, postgres::PgRow};

use crate::{AuthError, NewUser, Result, User, UserPatch, store::CredentialStore};

/// Unique index on the normalized email.
const EMAIL_UNIQUE: &str = "users_email_normalized_key";
/// Foreign key from `transactions.user_id` to `users.id`.
const MOVEMENT_USER_FK: &str = "transactions_user_id_fkey";

const USER_COLUMNS: &str = "id, email, password, name, phone, role, avatar, created_at";

/// PostgreSQL-backed credential store.
#[derive(Clone)]
pub struct PostgresCredentialStore {
    pool: PgPool,
}

impl PostgresCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_user(row: PgRow) -> Result<User> {
        Ok(User {
            id: UserId::new(row.try_get("id")?),
            email: row.try_get("email")?,
            password_hash: row.try_get("password")?,
            name: row.try_get("name")?,
            phone: row.try_get("phone")?,
            role: row.try_get("role")?,
            avatar: row.try_get("avatar")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn is_violation(err: &sqlx::Error, constraint: &str) -> bool {
        matches!(err, sqlx::Error::Database(db_err) if db_err.constraint() == Some(constraint))
    }
}

#[async_trait]
impl CredentialStore for PostgresCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1 LIMIT 1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_user).transpose()
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_user).transpose()
    }

    async fn create(&self, user: NewUser) -> Result<User> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO users (email, password, name, phone, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.name)
        .bind(&user.phone)
        .bind(&user.role)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if Self::is_violation(&e, EMAIL_UNIQUE) {
                return AuthError::EmailTaken(user.email.clone());
            }
            AuthError::Database(e)
        })?;

        Self::row_to_user(row)
    }

    async fn update(&self, id: UserId, patch: UserPatch) -> Result<User> {
        if patch.is_empty() {
            return Err(AuthError::EmptyPatch);
        }

        let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new("UPDATE users SET ");
        let mut fields = builder.separated(", ");
        if let Some(email) = &patch.email {
            fields.push("email = ").push_bind_unseparated(email);
        }
        if let Some(hash) = &patch.password_hash {
            fields.push("password = ").push_bind_unseparated(hash);
        }
        if let Some(name) = &patch.name {
            fields.push("name = ").push_bind_unseparated(name);
        }
        if let Some(phone) = &patch.phone {
            fields.push("phone = ").push_bind_unseparated(phone);
        }
        if let Some(role) = &patch.role {
            fields.push("role = ").push_bind_unseparated(role);
        }
        if let Some(avatar) = &patch.avatar {
            fields.push("avatar = ").push_bind_unseparated(avatar);
        }
        builder.push(" WHERE id = ").push_bind(id.as_i64());
        builder.push(" RETURNING ").push(USER_COLUMNS);

        let row = builder
            .build()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                if Self::is_violation(&e, EMAIL_UNIQUE) {
                    return AuthError::EmailTaken(patch.email.clone().unwrap_or_default());
                }
                AuthError::Database(e)
            })?
            .ok_or(AuthError::UserNotFound(id))?;

        Self::row_to_user(row)
    }

    async fn delete(&self, id: UserId) -> Result<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if Self::is_violation(&e, MOVEMENT_USER_FK) {
                    return AuthError::UserInUse(id);
                }
                AuthError::Database(e)
            })?;

        if result.rows_affected() == 0 {
            return Err(AuthError::UserNotFound(id));
        }
        Ok(())
    }
}

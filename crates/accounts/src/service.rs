//! Auth service: login, token validation, and account management.

use std::future::Future;
use std::time::Duration;

use common::UserId;

use crate::{
    AuthError, Claims, CredentialStore, NewUser, ProfileUpdate, Result, TokenIssuer, User,
    UserPatch,
    password::{DUMMY_PASSWORD_HASH, spawn_hash, spawn_verify},
    user::{DEFAULT_ROLE, require},
};

/// Default deadline for one store call.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(5);

/// Input for registering an account.
#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub name: String,
    pub phone: String,
    pub role: Option<String>,
}

/// Authenticates users and manages their credentials.
pub struct AuthService<C: CredentialStore> {
    store: C,
    tokens: TokenIssuer,
    deadline: Duration,
}

impl<C: CredentialStore> AuthService<C> {
    pub fn new(store: C, tokens: TokenIssuer) -> Self {
        Self::with_deadline(store, tokens, DEFAULT_DEADLINE)
    }

    pub fn with_deadline(store: C, tokens: TokenIssuer, deadline: Duration) -> Self {
        Self {
            store,
            tokens,
            deadline,
        }
    }

    pub fn store(&self) -> &C {
        &self.store
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    /// Exchanges credentials for a bearer token.
    ///
    /// An unknown email and a wrong password fail identically, and both pay
    /// for one argon2 verification on the blocking pool.
    #[tracing::instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<String> {
        let user = self.bounded(self.store.find_by_email(email)).await?;
        let hash = user
            .as_ref()
            .map_or(DUMMY_PASSWORD_HASH, |u| u.password_hash.as_str())
            .to_string();

        let verified = spawn_verify(password.to_string(), hash).await;
        let user = match user {
            Some(user) if verified => user,
            Some(user) => {
                tracing::debug!(user_id = %user.id, "password mismatch");
                return Err(AuthError::InvalidCredentials);
            }
            None => return Err(AuthError::InvalidCredentials),
        };

        let token = self.tokens.issue(user.id)?;
        tracing::info!(user_id = %user.id, "login succeeded");
        Ok(token)
    }

    /// Validates a bearer token.
    pub fn validate(&self, token: &str) -> Result<Claims> {
        self.tokens.validate(token)
    }

    /// Creates an account with a freshly hashed password.
    #[tracing::instrument(skip(self, registration), fields(email = %registration.email))]
    pub async fn register(&self, registration: Registration) -> Result<User> {
        require(&registration.email, "email")?;
        require(&registration.password, "password")?;
        require(&registration.name, "name")?;

        let user = NewUser {
            email: registration.email.trim().to_string(),
            password_hash: spawn_hash(registration.password).await?,
            name: registration.name,
            phone: registration.phone,
            role: registration
                .role
                .filter(|r| !r.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_ROLE.to_string()),
        };

        let created = self.bounded(self.store.create(user)).await?;
        tracing::info!(user_id = %created.id, "user registered");
        Ok(created)
    }

    /// Applies a profile update. Blank strings count as "not provided".
    #[tracing::instrument(skip(self, update))]
    pub async fn update_user(&self, id: UserId, update: ProfileUpdate) -> Result<User> {
        let provided = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        let password_hash = match provided(update.password) {
            Some(password) => Some(spawn_hash(password).await?),
            None => None,
        };
        let patch = UserPatch {
            email: provided(update.email).map(|e| e.trim().to_string()),
            password_hash,
            name: provided(update.name),
            phone: provided(update.phone),
            role: provided(update.role),
            avatar: update.avatar.filter(|a| !a.is_empty()),
        };

        self.bounded(self.store.update(id, patch)).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_user(&self, id: UserId) -> Result<()> {
        self.bounded(self.store.delete(id)).await?;
        tracing::info!(user_id = %id, "user deleted");
        Ok(())
    }

    async fn bounded<T>(&self, op: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.deadline, op)
            .await
            .map_err(|_| AuthError::Timeout(self.deadline))?
    }
}

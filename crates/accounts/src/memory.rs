use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::UserId;
use tokio::sync::RwLock;

use crate::{
    AuthError, NewUser, Result, User, UserPatch, normalize_email, store::CredentialStore,
};

#[derive(Default)]
struct Accounts {
    users: BTreeMap<UserId, User>,
    next_id: i64,
}

impl Accounts {
    fn email_taken(&self, email: &str, except: Option<UserId>) -> bool {
        let wanted = normalize_email(email);
        self.users
            .values()
            .any(|u| Some(u.id) != except && normalize_email(&u.email) == wanted)
    }
}

/// In-memory credential store for testing and local runs.
#[derive(Clone, Default)]
pub struct InMemoryCredentialStore {
    accounts: Arc<RwLock<Accounts>>,
    referenced: Arc<RwLock<HashSet<UserId>>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a user as referenced by recorded movements, so deleting it
    /// fails the way a foreign key would.
    pub async fn mark_referenced(&self, id: UserId) {
        self.referenced.write().await.insert(id);
    }

    pub async fn len(&self) -> usize {
        self.accounts.read().await.users.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let accounts = self.accounts.read().await;
        Ok(accounts.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.accounts.read().await.users.get(&id).cloned())
    }

    async fn create(&self, user: NewUser) -> Result<User> {
        let mut accounts = self.accounts.write().await;
        if accounts.email_taken(&user.email, None) {
            return Err(AuthError::EmailTaken(user.email));
        }

        accounts.next_id += 1;
        let created = User {
            id: UserId::new(accounts.next_id),
            email: user.email,
            password_hash: user.password_hash,
            name: user.name,
            phone: user.phone,
            role: user.role,
            avatar: None,
            created_at: Utc::now(),
        };
        accounts.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update(&self, id: UserId, patch: UserPatch) -> Result<User> {
        if patch.is_empty() {
            return Err(AuthError::EmptyPatch);
        }

        let mut accounts = self.accounts.write().await;
        if let Some(email) = &patch.email
            && accounts.email_taken(email, Some(id))
        {
            return Err(AuthError::EmailTaken(email.clone()));
        }

        let user = accounts
            .users
            .get_mut(&id)
            .ok_or(AuthError::UserNotFound(id))?;
        patch.apply_to(user);
        Ok(user.clone())
    }

    async fn delete(&self, id: UserId) -> Result<()> {
        if self.referenced.read().await.contains(&id) {
            return Err(AuthError::UserInUse(id));
        }

        self.accounts
            .write()
            .await
            .users
            .remove(&id)
            .map(|_| ())
            .ok_or(AuthError::UserNotFound(id))
    }
}

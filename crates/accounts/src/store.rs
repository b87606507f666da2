use async_trait::async_trait;
use common::UserId;

use crate::{NewUser, Result, User, UserPatch};

/// Storage for user accounts.
///
/// Email uniqueness is enforced on the normalized form (see
/// [`normalize_email`](crate::normalize_email)); lookups by email match the
/// stored value exactly.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>>;

    /// Creates an account. Fails with `EmailTaken` on a duplicate email.
    async fn create(&self, user: NewUser) -> Result<User>;

    /// Applies a non-empty patch and returns the updated account.
    async fn update(&self, id: UserId, patch: UserPatch) -> Result<User>;

    /// Deletes an account. Fails with `UserInUse` if movements reference it.
    async fn delete(&self, id: UserId) -> Result<()>;
}

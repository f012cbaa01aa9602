use crate::domain_model::{UserId, UserIdentity};

#[derive(Debug, thiserror::Error)]
pub enum UserLookupError {
    #[error("store error: {0}")]
    Store(String),
}

/// Read access to the user store, plus the best-effort last login touch.
#[async_trait::async_trait]
pub trait UserLookup: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserIdentity>, UserLookupError>;

    async fn find_by_id(&self, user_id: UserId) -> Result<Option<UserIdentity>, UserLookupError>;

    /// PHC-formatted password hash for the account behind `email`.
    async fn find_credential_hash(&self, email: &str) -> Result<Option<String>, UserLookupError>;

    async fn touch_last_login(&self, user_id: UserId) -> Result<(), UserLookupError>;
}

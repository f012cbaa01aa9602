use crate::domain_model::{UserId, UserIdentity};
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone)]
struct StoredUser {
    identity: UserIdentity,
    password_hash: String,
    last_login: Option<DateTime<Utc>>,
}

/// User lookup over a process-local map, keyed by email.
#[derive(Debug, Default)]
pub struct InMemoryUserLookup {
    users: DashMap<String, StoredUser>,
    fail_touch: AtomicBool,
}

impl InMemoryUserLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, identity: UserIdentity, password_hash: String) {
        self.users.insert(
            identity.email.clone(),
            StoredUser {
                identity,
                password_hash,
                last_login: None,
            },
        );
    }

    pub fn remove(&self, user_id: UserId) {
        self.users.retain(|_, user| user.identity.id != user_id);
    }

    pub fn last_login(&self, user_id: UserId) -> Option<DateTime<Utc>> {
        self.users
            .iter()
            .find(|user| user.identity.id == user_id)
            .and_then(|user| user.last_login)
    }

    /// Make `touch_last_login` fail from now on.
    pub fn fail_touch(&self, fail: bool) {
        self.fail_touch.store(fail, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl UserLookup for InMemoryUserLookup {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserIdentity>, UserLookupError> {
        Ok(self.users.get(email).map(|user| user.identity.clone()))
    }

    async fn find_by_id(&self, user_id: UserId) -> Result<Option<UserIdentity>, UserLookupError> {
        Ok(self
            .users
            .iter()
            .find(|user| user.identity.id == user_id)
            .map(|user| user.identity.clone()))
    }

    async fn find_credential_hash(&self, email: &str) -> Result<Option<String>, UserLookupError> {
        Ok(self.users.get(email).map(|user| user.password_hash.clone()))
    }

    async fn touch_last_login(&self, user_id: UserId) -> Result<(), UserLookupError> {
        if self.fail_touch.load(Ordering::SeqCst) {
            return Err(UserLookupError::Store("last login update rejected".to_string()));
        }
        for mut user in self.users.iter_mut() {
            if user.identity.id == user_id {
                user.last_login = Some(Utc::now());
            }
        }
        Ok(())
    }
}

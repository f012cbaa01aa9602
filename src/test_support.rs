use crate::application_impl::{JwtEdDsaCodec, TokenLifecycleManager};
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::{ManualClock, SessionStore, StoreError, StoreOp};
use crate::infra_memory::{InMemorySessionStore, InMemoryUserLookup};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

pub(crate) const DEV_PRIVATE_PEM: &[u8] = include_bytes!("../keys/dev_ed25519_private.pem");
pub(crate) const DEV_PUBLIC_PEM: &[u8] = include_bytes!("../keys/dev_ed25519_public.pem");
pub(crate) const OTHER_PRIVATE_PEM: &[u8] = include_bytes!("../keys/other_ed25519_private.pem");

/// Compares `plain:<password>` hashes so tests skip Argon2's cost.
pub(crate) struct PlainHasher;

#[async_trait::async_trait]
impl CredentialHasher for PlainHasher {
    async fn hash_password(&self, password: &str) -> Result<String, CredentialError> {
        Ok(Harness::hash(password))
    }

    async fn verify_password(
        &self,
        password: &str,
        password_hash: &str,
    ) -> Result<bool, CredentialError> {
        Ok(password_hash == Harness::hash(password))
    }
}

/// A lifecycle manager wired to in-memory backends and a manual clock.
pub(crate) struct Harness {
    pub clock: Arc<ManualClock>,
    pub store: Arc<InMemorySessionStore>,
    pub users: Arc<InMemoryUserLookup>,
    pub manager: Arc<TokenLifecycleManager>,
}

impl Harness {
    pub fn new() -> Self {
        Self::build(false)
    }

    /// Like [`Harness::new`], but every store call yields to the scheduler
    /// first, so concurrent operations interleave at each store round trip.
    pub fn yielding() -> Self {
        Self::build(true)
    }

    fn build(yielding: bool) -> Self {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let store = Arc::new(InMemorySessionStore::new(clock.clone()));
        let session_store: Arc<dyn SessionStore> = if yielding {
            Arc::new(YieldingStore(store.clone()))
        } else {
            store.clone()
        };
        let users = Arc::new(InMemoryUserLookup::new());
        let codec = Arc::new(
            JwtEdDsaCodec::from_pem(DEV_PRIVATE_PEM, DEV_PUBLIC_PEM, clock.clone())
                .expect("dev keys load"),
        );
        let manager = Arc::new(TokenLifecycleManager::new(
            users.clone(),
            Arc::new(PlainHasher),
            codec,
            session_store,
            clock.clone(),
        ));
        Self {
            clock,
            store,
            users,
            manager,
        }
    }

    pub fn hash(password: &str) -> String {
        format!("plain:{}", password)
    }

    pub fn add_user(&self, email: &str, password: &str, role: Role) -> UserIdentity {
        let identity = UserIdentity {
            id: UserId::new(),
            email: email.to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            role,
        };
        self.users.insert(identity.clone(), Self::hash(password));
        identity
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthTokens, AuthError> {
        self.manager
            .login(LoginInput {
                email: email.to_string(),
                password: password.to_string(),
            })
            .await
    }
}

/// Session store that yields before delegating each call.
struct YieldingStore(Arc<InMemorySessionStore>);

#[async_trait::async_trait]
impl SessionStore for YieldingStore {
    async fn put_with_ttl(
        &self,
        key: &SessionKey,
        value: &str,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        tokio::task::yield_now().await;
        self.0.put_with_ttl(key, value, ttl).await
    }

    async fn put_if_absent(
        &self,
        key: &SessionKey,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        tokio::task::yield_now().await;
        self.0.put_if_absent(key, value, ttl).await
    }

    async fn delete(&self, key: &SessionKey) -> Result<(), StoreError> {
        tokio::task::yield_now().await;
        self.0.delete(key).await
    }

    async fn exists(&self, key: &SessionKey) -> Result<bool, StoreError> {
        tokio::task::yield_now().await;
        self.0.exists(key).await
    }

    async fn batch(&self, ops: Vec<StoreOp>) -> Result<(), StoreError> {
        tokio::task::yield_now().await;
        self.0.batch(ops).await
    }
}

use crate::domain_model::SessionKey;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// One write inside an atomic batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    Put {
        key: SessionKey,
        value: String,
        ttl: Duration,
    },
    Delete {
        key: SessionKey,
    },
}

#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    async fn put_with_ttl(
        &self,
        key: &SessionKey,
        value: &str,
        ttl: Duration,
    ) -> Result<(), StoreError>;

    /// Insert only when the key is absent. Returns `true` if this call inserted it.
    async fn put_if_absent(
        &self,
        key: &SessionKey,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError>;

    async fn delete(&self, key: &SessionKey) -> Result<(), StoreError>;

    async fn exists(&self, key: &SessionKey) -> Result<bool, StoreError>;

    /// Submit all ops as one round trip. On error none of them may be assumed applied.
    async fn batch(&self, ops: Vec<StoreOp>) -> Result<(), StoreError>;
}

use crate::domain_model::TokenClaims;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired or not yet valid")]
    Expired,
    #[error("malformed token: {0}")]
    Malformed(String),
    #[error("signing failed: {0}")]
    Signing(String),
}

/// Signs and verifies claim sets. Implementations hold the key pair.
#[async_trait::async_trait]
pub trait TokenCodec: Send + Sync {
    async fn issue(&self, claims: &TokenClaims) -> Result<String, CodecError>;
    async fn verify(&self, token: &str) -> Result<TokenClaims, CodecError>;
}

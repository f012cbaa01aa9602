use crate::domain_model::{AccessClaims, AuthTokens, TokenClaims, TokenType};
use crate::domain_port::{StoreError, UserLookupError};

/// Every failure the token lifecycle reports to its callers.
///
/// Token failures are deliberately undifferentiated: a caller probing a token
/// only ever learns that it is not usable.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("invalid or expired token")]
    InvalidOrExpiredToken,
    #[error("authorization header is missing")]
    AuthorizationHeaderMissing,
    #[error("forbidden")]
    Forbidden,
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("internal error: {0}")]
    InternalError(String),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(e) => AuthError::StoreUnavailable(e),
        }
    }
}

impl From<UserLookupError> for AuthError {
    fn from(err: UserLookupError) -> Self {
        match err {
            UserLookupError::Store(e) => AuthError::StoreUnavailable(e),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("invalid password hash: {0}")]
    InvalidHash(String),
    #[error("hashing failed: {0}")]
    Hashing(String),
}

#[derive(Debug, Clone)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

#[async_trait::async_trait]
pub trait CredentialHasher: Send + Sync {
    async fn hash_password(&self, password: &str) -> Result<String, CredentialError>;
    async fn verify_password(
        &self,
        password: &str,
        password_hash: &str,
    ) -> Result<bool, CredentialError>;
}

#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    async fn login(&self, request: LoginInput) -> Result<AuthTokens, AuthError>;
    async fn validate(&self, token: &str, expected: TokenType) -> Result<TokenClaims, AuthError>;
    async fn refresh(&self, refresh_token: &str) -> Result<AuthTokens, AuthError>;
    async fn logout(&self, claims: &AccessClaims) -> Result<(), AuthError>;
}

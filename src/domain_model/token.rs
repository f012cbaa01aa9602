use crate::domain_model::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Lifetime of an access token and of its live entry.
pub const ACCESS_TOKEN_TTL: Duration = Duration::from_secs(30 * 60);
/// Lifetime of a refresh token and of its live entry.
pub const REFRESH_TOKEN_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);
/// How long a retired access `jti` stays blacklisted.
pub const ACCESS_BLACKLIST_TTL: Duration = Duration::from_secs(60 * 60);
/// How long a retired refresh `jti` stays blacklisted.
pub const REFRESH_BLACKLIST_TTL: Duration = Duration::from_secs(8 * 24 * 60 * 60);

// A retired token must never outlive its blacklist entry.
const _: () = assert!(ACCESS_BLACKLIST_TTL.as_secs() >= ACCESS_TOKEN_TTL.as_secs());
const _: () = assert!(REFRESH_BLACKLIST_TTL.as_secs() >= REFRESH_TOKEN_TTL.as_secs());

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }

    pub fn lifetime(&self) -> Duration {
        match self {
            TokenType::Access => ACCESS_TOKEN_TTL,
            TokenType::Refresh => REFRESH_TOKEN_TTL,
        }
    }

    pub fn blacklist_ttl(&self) -> Duration {
        match self {
            TokenType::Access => ACCESS_BLACKLIST_TTL,
            TokenType::Refresh => REFRESH_BLACKLIST_TTL,
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `jti` of a token.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(pub uuid::Uuid);

impl TokenId {
    pub fn new() -> Self {
        TokenId(uuid::Uuid::new_v4())
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: UserId,
    /// Kept as the raw claim; the role gate decides whether it is usable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub jti: TokenId,
    pub refresh_jti: TokenId,
    pub nbf: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: UserId,
    pub jti: TokenId,
    pub access_jti: TokenId,
    pub nbf: i64,
    pub exp: i64,
}

/// Claim set of either token kind, discriminated by the `type` claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TokenClaims {
    Access(AccessClaims),
    Refresh(RefreshClaims),
}

impl TokenClaims {
    pub fn token_type(&self) -> TokenType {
        match self {
            TokenClaims::Access(_) => TokenType::Access,
            TokenClaims::Refresh(_) => TokenType::Refresh,
        }
    }

    pub fn subject(&self) -> UserId {
        match self {
            TokenClaims::Access(c) => c.sub,
            TokenClaims::Refresh(c) => c.sub,
        }
    }

    pub fn jti(&self) -> TokenId {
        match self {
            TokenClaims::Access(c) => c.jti,
            TokenClaims::Refresh(c) => c.jti,
        }
    }

    pub fn not_before(&self) -> i64 {
        match self {
            TokenClaims::Access(c) => c.nbf,
            TokenClaims::Refresh(c) => c.nbf,
        }
    }

    pub fn expires_at(&self) -> i64 {
        match self {
            TokenClaims::Access(c) => c.exp,
            TokenClaims::Refresh(c) => c.exp,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AccessToken(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RefreshToken(pub String);

#[derive(Debug, Clone, Serialize)]
pub struct AuthTokens {
    pub access_token: AccessToken,
    pub refresh_token: RefreshToken,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token_expires_at: DateTime<Utc>,
}

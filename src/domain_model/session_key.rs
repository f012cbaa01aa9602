use crate::domain_model::{TokenId, TokenType, UserId};
use std::fmt;

/// Store keys owned by the token lifecycle.
///
/// A live entry asserts that a token has not been superseded or logged out;
/// a blacklist entry asserts that a `jti` must never authenticate again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionKey {
    Live {
        token_type: TokenType,
        user_id: UserId,
        jti: TokenId,
    },
    Blacklist {
        token_type: TokenType,
        jti: TokenId,
    },
}

impl SessionKey {
    pub fn live(token_type: TokenType, user_id: UserId, jti: TokenId) -> Self {
        SessionKey::Live {
            token_type,
            user_id,
            jti,
        }
    }

    pub fn blacklist(token_type: TokenType, jti: TokenId) -> Self {
        SessionKey::Blacklist { token_type, jti }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionKey::Live {
                token_type,
                user_id,
                jti,
            } => write!(f, "{}_token:{}:{}", token_type, user_id, jti),
            SessionKey::Blacklist { token_type, jti } => {
                write!(f, "blacklisted:{}:{}", token_type, jti)
            }
        }
    }
}

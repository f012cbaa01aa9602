use crate::application_port::{AuthError, AuthService};
use crate::domain_model::{AccessClaims, Role, TokenClaims, TokenType};
use std::sync::Arc;

const BEARER_PREFIX: &str = "Bearer ";

/// Per-request authentication and role check.
pub struct AuthorizationGate {
    auth_service: Arc<dyn AuthService>,
}

impl AuthorizationGate {
    pub fn new(auth_service: Arc<dyn AuthService>) -> Self {
        Self { auth_service }
    }

    /// Resolves the `Authorization` header value into verified access claims.
    ///
    /// A missing header, a non-bearer scheme or an empty credential all count
    /// as a missing header, and are rejected before the store is consulted.
    pub async fn authorize(&self, authorization: Option<&str>) -> Result<AccessClaims, AuthError> {
        let token = authorization
            .and_then(|value| value.strip_prefix(BEARER_PREFIX))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::AuthorizationHeaderMissing)?;

        match self.auth_service.validate(token, TokenType::Access).await? {
            TokenClaims::Access(claims) => Ok(claims),
            TokenClaims::Refresh(_) => Err(AuthError::InvalidOrExpiredToken),
        }
    }

    /// Admits the claims only if their role is one of `allowed`.
    pub fn require_role(claims: &AccessClaims, allowed: &[Role]) -> Result<(), AuthError> {
        let role = claims
            .role
            .as_deref()
            .and_then(|role| role.parse::<Role>().ok())
            .ok_or(AuthError::Forbidden)?;

        if allowed.contains(&role) {
            Ok(())
        } else {
            Err(AuthError::Forbidden)
        }
    }
}

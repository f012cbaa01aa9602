use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use crate::logger::*;
use std::sync::Arc;
use tokio_util::task::TaskTracker;

const BLACKLIST_SENTINEL: &str = "1";

struct MintedPair {
    user_id: UserId,
    access_jti: TokenId,
    refresh_jti: TokenId,
    tokens: AuthTokens,
}

/// Issues, validates, rotates and revokes access/refresh token pairs.
///
/// Holds no session state of its own: every pair lives in the session store as
/// two live entries, and a retired pair leaves two blacklist entries behind.
/// Each lifecycle operation writes through exactly one store batch.
pub struct TokenLifecycleManager {
    user_lookup: Arc<dyn UserLookup>,
    credential_hasher: Arc<dyn CredentialHasher>,
    token_codec: Arc<dyn TokenCodec>,
    session_store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    background: TaskTracker,
}

impl TokenLifecycleManager {
    pub fn new(
        user_lookup: Arc<dyn UserLookup>,
        credential_hasher: Arc<dyn CredentialHasher>,
        token_codec: Arc<dyn TokenCodec>,
        session_store: Arc<dyn SessionStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            user_lookup,
            credential_hasher,
            token_codec,
            session_store,
            clock,
            background: TaskTracker::new(),
        }
    }

    /// Tracker of the fire-and-forget tasks spawned by this manager.
    pub fn background_tasks(&self) -> TaskTracker {
        self.background.clone()
    }

    async fn mint_pair(&self, identity: &UserIdentity) -> Result<MintedPair, AuthError> {
        let now = self.clock.now();
        let access_expires_at = now + TokenType::Access.lifetime();
        let refresh_expires_at = now + TokenType::Refresh.lifetime();
        let access_jti = TokenId::new();
        let refresh_jti = TokenId::new();

        let access = TokenClaims::Access(AccessClaims {
            sub: identity.id,
            role: Some(identity.role.as_str().to_string()),
            jti: access_jti,
            refresh_jti,
            nbf: now.timestamp(),
            exp: access_expires_at.timestamp(),
        });
        let refresh = TokenClaims::Refresh(RefreshClaims {
            sub: identity.id,
            jti: refresh_jti,
            access_jti,
            nbf: now.timestamp(),
            exp: refresh_expires_at.timestamp(),
        });

        let access_token = self
            .token_codec
            .issue(&access)
            .await
            .map_err(|e| AuthError::InternalError(e.to_string()))?;
        let refresh_token = self
            .token_codec
            .issue(&refresh)
            .await
            .map_err(|e| AuthError::InternalError(e.to_string()))?;

        Ok(MintedPair {
            user_id: identity.id,
            access_jti,
            refresh_jti,
            tokens: AuthTokens {
                access_token: AccessToken(access_token),
                refresh_token: RefreshToken(refresh_token),
                access_token_expires_at: access_expires_at,
                refresh_token_expires_at: refresh_expires_at,
            },
        })
    }

    fn make_live(pair: &MintedPair) -> [StoreOp; 2] {
        [
            StoreOp::Put {
                key: SessionKey::live(TokenType::Access, pair.user_id, pair.access_jti),
                value: pair.tokens.access_token.0.clone(),
                ttl: TokenType::Access.lifetime(),
            },
            StoreOp::Put {
                key: SessionKey::live(TokenType::Refresh, pair.user_id, pair.refresh_jti),
                value: pair.tokens.refresh_token.0.clone(),
                ttl: TokenType::Refresh.lifetime(),
            },
        ]
    }

    fn drop_live(user_id: UserId, access_jti: TokenId, refresh_jti: TokenId) -> [StoreOp; 2] {
        [
            StoreOp::Delete {
                key: SessionKey::live(TokenType::Access, user_id, access_jti),
            },
            StoreOp::Delete {
                key: SessionKey::live(TokenType::Refresh, user_id, refresh_jti),
            },
        ]
    }

    fn blacklist(access_jti: TokenId, refresh_jti: TokenId) -> [StoreOp; 2] {
        [
            StoreOp::Put {
                key: SessionKey::blacklist(TokenType::Access, access_jti),
                value: BLACKLIST_SENTINEL.to_string(),
                ttl: TokenType::Access.blacklist_ttl(),
            },
            StoreOp::Put {
                key: SessionKey::blacklist(TokenType::Refresh, refresh_jti),
                value: BLACKLIST_SENTINEL.to_string(),
                ttl: TokenType::Refresh.blacklist_ttl(),
            },
        ]
    }

    fn touch_last_login_in_background(&self, user_id: UserId) {
        let user_lookup = self.user_lookup.clone();
        self.background.spawn(async move {
            if let Err(e) = user_lookup.touch_last_login(user_id).await {
                warn!(%user_id, error = %e, "last login update failed");
            }
        });
    }

    async fn check_credentials(&self, email: &str, password: &str) -> Result<UserIdentity, AuthError> {
        let identity = self
            .user_lookup
            .find_by_email(email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        let password_hash = self
            .user_lookup
            .find_credential_hash(email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        match self
            .credential_hasher
            .verify_password(password, &password_hash)
            .await
        {
            Ok(true) => Ok(identity),
            Ok(false) => Err(AuthError::InvalidCredentials),
            Err(e) => {
                warn!(user_id = %identity.id, error = %e, "stored credential unusable");
                Err(AuthError::InvalidCredentials)
            }
        }
    }
}

#[async_trait::async_trait]
impl AuthService for TokenLifecycleManager {
    async fn login(&self, request: LoginInput) -> Result<AuthTokens, AuthError> {
        let LoginInput { email, password } = request;

        let identity = self.check_credentials(&email, &password).await?;
        let pair = self.mint_pair(&identity).await?;

        self.session_store
            .batch(Self::make_live(&pair).into())
            .await?;

        self.touch_last_login_in_background(identity.id);
        info!(user_id = %identity.id, access_jti = %pair.access_jti, "login");

        Ok(pair.tokens)
    }

    async fn validate(&self, token: &str, expected: TokenType) -> Result<TokenClaims, AuthError> {
        let claims = self.token_codec.verify(token).await.map_err(|e| {
            debug!(reason = %e, "token rejected by codec");
            AuthError::InvalidOrExpiredToken
        })?;
        if claims.token_type() != expected {
            debug!(expected = %expected, actual = %claims.token_type(), "token type mismatch");
            return Err(AuthError::InvalidOrExpiredToken);
        }

        let live = SessionKey::live(expected, claims.subject(), claims.jti());
        let blacklisted = SessionKey::blacklist(expected, claims.jti());
        let (is_live, is_blacklisted) = tokio::try_join!(
            self.session_store.exists(&live),
            self.session_store.exists(&blacklisted),
        )?;

        if !is_live || is_blacklisted {
            debug!(jti = %claims.jti(), is_live, is_blacklisted, "token not live");
            return Err(AuthError::InvalidOrExpiredToken);
        }
        Ok(claims)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<AuthTokens, AuthError> {
        let claims = match self.validate(refresh_token, TokenType::Refresh).await? {
            TokenClaims::Refresh(claims) => claims,
            TokenClaims::Access(_) => return Err(AuthError::InvalidOrExpiredToken),
        };

        let paired_access = SessionKey::blacklist(TokenType::Access, claims.access_jti);
        if self.session_store.exists(&paired_access).await? {
            warn!(jti = %claims.jti, "refresh of a retired pair");
            return Err(AuthError::InvalidOrExpiredToken);
        }

        let identity = self
            .user_lookup
            .find_by_id(claims.sub)
            .await?
            .ok_or(AuthError::InvalidOrExpiredToken)?;

        // Claim the rotation. Whoever inserts the blacklist entry first rotates;
        // every other presenter of the same refresh token is turned away.
        let claimed = self
            .session_store
            .put_if_absent(
                &SessionKey::blacklist(TokenType::Refresh, claims.jti),
                BLACKLIST_SENTINEL,
                TokenType::Refresh.blacklist_ttl(),
            )
            .await?;
        if !claimed {
            warn!(user_id = %claims.sub, jti = %claims.jti, "refresh token replayed");
            return Err(AuthError::InvalidOrExpiredToken);
        }

        let pair = self.mint_pair(&identity).await?;

        // Deletes first, so a store that applies a batch partially fails closed.
        let mut ops: Vec<StoreOp> = Vec::with_capacity(6);
        ops.extend(Self::drop_live(claims.sub, claims.access_jti, claims.jti));
        ops.extend(Self::make_live(&pair));
        ops.extend(Self::blacklist(claims.access_jti, claims.jti));
        self.session_store.batch(ops).await?;

        self.touch_last_login_in_background(identity.id);
        info!(
            user_id = %identity.id,
            retired_jti = %claims.jti,
            refresh_jti = %pair.refresh_jti,
            "token pair rotated"
        );

        Ok(pair.tokens)
    }

    async fn logout(&self, claims: &AccessClaims) -> Result<(), AuthError> {
        let mut ops: Vec<StoreOp> = Vec::with_capacity(4);
        ops.extend(Self::drop_live(claims.sub, claims.jti, claims.refresh_jti));
        ops.extend(Self::blacklist(claims.jti, claims.refresh_jti));
        self.session_store.batch(ops).await?;

        info!(user_id = %claims.sub, access_jti = %claims.jti, "logout");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Harness;
    use std::time::Duration;

    fn access(claims: TokenClaims) -> AccessClaims {
        match claims {
            TokenClaims::Access(c) => c,
            other => panic!("expected access claims, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn fresh_pair_validates_only_under_its_own_type() {
        let h = Harness::new();
        h.add_user("a@x.com", "pw", Role::Agent);
        let tokens = h.login("a@x.com", "pw").await.unwrap();
        let access_token = &tokens.access_token.0;
        let refresh_token = &tokens.refresh_token.0;

        assert!(h.manager.validate(access_token, TokenType::Access).await.is_ok());
        assert!(h.manager.validate(refresh_token, TokenType::Refresh).await.is_ok());
        assert!(matches!(
            h.manager.validate(access_token, TokenType::Refresh).await,
            Err(AuthError::InvalidOrExpiredToken)
        ));
        assert!(matches!(
            h.manager.validate(refresh_token, TokenType::Access).await,
            Err(AuthError::InvalidOrExpiredToken)
        ));
    }

    #[tokio::test]
    async fn pair_is_linked_and_carries_role() {
        let h = Harness::new();
        let user = h.add_user("a@x.com", "pw", Role::Administrator);
        let tokens = h.login("a@x.com", "pw").await.unwrap();

        let a = access(
            h.manager
                .validate(&tokens.access_token.0, TokenType::Access)
                .await
                .unwrap(),
        );
        let r = match h
            .manager
            .validate(&tokens.refresh_token.0, TokenType::Refresh)
            .await
            .unwrap()
        {
            TokenClaims::Refresh(c) => c,
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(a.sub, user.id);
        assert_eq!(r.sub, user.id);
        assert_eq!(a.refresh_jti, r.jti);
        assert_eq!(r.access_jti, a.jti);
        assert_ne!(a.jti, r.jti);
        assert_eq!(a.role.as_deref(), Some("administrator"));
        assert_eq!(a.exp - a.nbf, ACCESS_TOKEN_TTL.as_secs() as i64);
        assert_eq!(r.exp - r.nbf, REFRESH_TOKEN_TTL.as_secs() as i64);
    }

    #[tokio::test]
    async fn login_writes_live_entries_with_token_lifetimes() {
        let h = Harness::new();
        h.add_user("a@x.com", "pw", Role::Agent);
        let tokens = h.login("a@x.com", "pw").await.unwrap();
        let a = access(
            h.manager
                .validate(&tokens.access_token.0, TokenType::Access)
                .await
                .unwrap(),
        );

        let access_live = SessionKey::live(TokenType::Access, a.sub, a.jti);
        let refresh_live = SessionKey::live(TokenType::Refresh, a.sub, a.refresh_jti);
        assert_eq!(h.store.ttl_of(&access_live), Some(ACCESS_TOKEN_TTL));
        assert_eq!(h.store.ttl_of(&refresh_live), Some(REFRESH_TOKEN_TTL));
    }

    #[tokio::test]
    async fn login_rejects_bad_credentials_alike() {
        let h = Harness::new();
        h.add_user("a@x.com", "pw", Role::Agent);

        assert!(matches!(
            h.login("a@x.com", "wrong").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            h.login("nobody@x.com", "pw").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn tokens_die_with_their_lifetime() {
        let h = Harness::new();
        h.add_user("a@x.com", "pw", Role::Agent);
        let tokens = h.login("a@x.com", "pw").await.unwrap();

        h.clock.advance(ACCESS_TOKEN_TTL);
        assert!(matches!(
            h.manager
                .validate(&tokens.access_token.0, TokenType::Access)
                .await,
            Err(AuthError::InvalidOrExpiredToken)
        ));
        assert!(h
            .manager
            .validate(&tokens.refresh_token.0, TokenType::Refresh)
            .await
            .is_ok());

        h.clock.advance(REFRESH_TOKEN_TTL - ACCESS_TOKEN_TTL);
        assert!(matches!(
            h.manager.refresh(&tokens.refresh_token.0).await,
            Err(AuthError::InvalidOrExpiredToken)
        ));
    }

    #[tokio::test]
    async fn refresh_is_single_use() {
        let h = Harness::new();
        h.add_user("a@x.com", "pw", Role::Agent);
        let first = h.login("a@x.com", "pw").await.unwrap();
        let second = h.manager.refresh(&first.refresh_token.0).await.unwrap();

        assert_ne!(second.refresh_token, first.refresh_token);
        assert!(matches!(
            h.manager.refresh(&first.refresh_token.0).await,
            Err(AuthError::InvalidOrExpiredToken)
        ));
        assert!(matches!(
            h.manager
                .validate(&first.refresh_token.0, TokenType::Refresh)
                .await,
            Err(AuthError::InvalidOrExpiredToken)
        ));
        assert!(matches!(
            h.manager
                .validate(&first.access_token.0, TokenType::Access)
                .await,
            Err(AuthError::InvalidOrExpiredToken)
        ));
        assert!(h
            .manager
            .validate(&second.refresh_token.0, TokenType::Refresh)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn refresh_preserves_identity_and_picks_up_role_changes() {
        let h = Harness::new();
        let mut user = h.add_user("a@x.com", "pw", Role::Agent);
        let first = h.login("a@x.com", "pw").await.unwrap();

        let second = h.manager.refresh(&first.refresh_token.0).await.unwrap();
        let claims = access(
            h.manager
                .validate(&second.access_token.0, TokenType::Access)
                .await
                .unwrap(),
        );
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.role.as_deref(), Some("agent"));

        user.role = Role::Administrator;
        h.users.insert(user.clone(), Harness::hash("pw"));
        let third = h.manager.refresh(&second.refresh_token.0).await.unwrap();
        let claims = access(
            h.manager
                .validate(&third.access_token.0, TokenType::Access)
                .await
                .unwrap(),
        );
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.role.as_deref(), Some("administrator"));
    }

    #[tokio::test]
    async fn rotation_blacklists_old_pair_for_grace_windows() {
        let h = Harness::new();
        h.add_user("a@x.com", "pw", Role::Agent);
        let first = h.login("a@x.com", "pw").await.unwrap();
        let old = access(
            h.manager
                .validate(&first.access_token.0, TokenType::Access)
                .await
                .unwrap(),
        );
        h.manager.refresh(&first.refresh_token.0).await.unwrap();

        assert_eq!(
            h.store
                .ttl_of(&SessionKey::blacklist(TokenType::Access, old.jti)),
            Some(ACCESS_BLACKLIST_TTL)
        );
        assert_eq!(
            h.store
                .ttl_of(&SessionKey::blacklist(TokenType::Refresh, old.refresh_jti)),
            Some(REFRESH_BLACKLIST_TTL)
        );
        assert_eq!(
            h.store
                .ttl_of(&SessionKey::live(TokenType::Access, old.sub, old.jti)),
            None
        );
    }

    #[tokio::test]
    async fn access_token_cannot_refresh() {
        let h = Harness::new();
        h.add_user("a@x.com", "pw", Role::Agent);
        let tokens = h.login("a@x.com", "pw").await.unwrap();
        assert!(matches!(
            h.manager.refresh(&tokens.access_token.0).await,
            Err(AuthError::InvalidOrExpiredToken)
        ));
    }

    #[tokio::test]
    async fn refresh_for_removed_user_fails() {
        let h = Harness::new();
        let user = h.add_user("a@x.com", "pw", Role::Agent);
        let tokens = h.login("a@x.com", "pw").await.unwrap();
        h.users.remove(user.id);

        assert!(matches!(
            h.manager.refresh(&tokens.refresh_token.0).await,
            Err(AuthError::InvalidOrExpiredToken)
        ));
    }

    #[tokio::test]
    async fn concurrent_refresh_has_one_winner() {
        let h = Harness::yielding();
        h.add_user("a@x.com", "pw", Role::Agent);
        let tokens = h.login("a@x.com", "pw").await.unwrap();
        let token = tokens.refresh_token.0.clone();

        let (a, b, c) = tokio::join!(
            h.manager.refresh(&token),
            h.manager.refresh(&token),
            h.manager.refresh(&token),
        );
        let winners = [&a, &b, &c].iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1);
        for loser in [a, b, c].into_iter().filter(Result::is_err) {
            assert!(matches!(loser, Err(AuthError::InvalidOrExpiredToken)));
        }
    }

    #[tokio::test]
    async fn expired_live_entry_rejects_a_signature_valid_token() {
        let h = Harness::new();
        h.add_user("a@x.com", "pw", Role::Agent);
        let tokens = h.login("a@x.com", "pw").await.unwrap();
        let claims = access(
            h.manager
                .validate(&tokens.access_token.0, TokenType::Access)
                .await
                .unwrap(),
        );

        let live = SessionKey::live(TokenType::Access, claims.sub, claims.jti);
        h.store
            .put_with_ttl(&live, &tokens.access_token.0, Duration::from_secs(1))
            .await
            .unwrap();
        h.clock.advance(Duration::from_secs(2));

        assert!(h.clock.now().timestamp() < claims.exp);
        assert!(matches!(
            h.manager
                .validate(&tokens.access_token.0, TokenType::Access)
                .await,
            Err(AuthError::InvalidOrExpiredToken)
        ));
    }

    #[tokio::test]
    async fn failed_rotation_is_reported_and_fails_closed() {
        let h = Harness::new();
        h.add_user("a@x.com", "pw", Role::Agent);
        let tokens = h.login("a@x.com", "pw").await.unwrap();

        h.store.fail_batches(true);
        assert!(matches!(
            h.manager.refresh(&tokens.refresh_token.0).await,
            Err(AuthError::StoreUnavailable(_))
        ));

        h.store.fail_batches(false);
        assert!(matches!(
            h.manager.refresh(&tokens.refresh_token.0).await,
            Err(AuthError::InvalidOrExpiredToken)
        ));
    }

    #[tokio::test]
    async fn logout_is_idempotent_and_retires_both_tokens() {
        let h = Harness::new();
        h.add_user("a@x.com", "pw", Role::Agent);
        let tokens = h.login("a@x.com", "pw").await.unwrap();
        let claims = access(
            h.manager
                .validate(&tokens.access_token.0, TokenType::Access)
                .await
                .unwrap(),
        );

        h.manager.logout(&claims).await.unwrap();
        assert!(matches!(
            h.manager
                .validate(&tokens.access_token.0, TokenType::Access)
                .await,
            Err(AuthError::InvalidOrExpiredToken)
        ));
        assert!(matches!(
            h.manager.refresh(&tokens.refresh_token.0).await,
            Err(AuthError::InvalidOrExpiredToken)
        ));

        h.manager.logout(&claims).await.unwrap();
        assert!(matches!(
            h.manager
                .validate(&tokens.access_token.0, TokenType::Access)
                .await,
            Err(AuthError::InvalidOrExpiredToken)
        ));
    }

    #[tokio::test]
    async fn last_login_is_touched_in_background() {
        let h = Harness::new();
        let user = h.add_user("a@x.com", "pw", Role::Agent);
        h.login("a@x.com", "pw").await.unwrap();

        let tasks = h.manager.background_tasks();
        tasks.close();
        tokio::time::timeout(Duration::from_secs(5), tasks.wait())
            .await
            .unwrap();
        assert!(h.users.last_login(user.id).is_some());
    }

    #[tokio::test]
    async fn last_login_failure_does_not_fail_login() {
        let h = Harness::new();
        let user = h.add_user("a@x.com", "pw", Role::Agent);
        h.users.fail_touch(true);

        let tokens = h.login("a@x.com", "pw").await.unwrap();
        h.manager.refresh(&tokens.refresh_token.0).await.unwrap();

        let tasks = h.manager.background_tasks();
        tasks.close();
        tasks.wait().await;
        assert!(h.users.last_login(user.id).is_none());
    }
}

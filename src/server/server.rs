use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_model::{Role, UserId, UserIdentity};
use crate::domain_port::*;
use crate::infra_memory::*;
use crate::infra_mysql::*;
use crate::infra_redis::*;
use crate::logger::*;
use crate::settings::{self, Settings};
use anyhow::anyhow;
use sqlx::MySqlPool;
use sqlx::mysql::MySqlPoolOptions;
use std::sync::Arc;
use tokio_util::task::TaskTracker;

const DEFAULT_USER_EMAIL: &str = "admin@example.com";
const DEFAULT_USER_PASSWORD: &str = "secure";

pub struct Server {
    pub auth_service: Arc<dyn AuthService>,
    pub authorization_gate: Arc<AuthorizationGate>,
    pub user_lookup: Arc<dyn UserLookup>,
    background: TaskTracker,
    pool: Option<MySqlPool>,
}

impl Server {
    pub fn new(
        auth_service: Arc<dyn AuthService>,
        user_lookup: Arc<dyn UserLookup>,
        background: TaskTracker,
        pool: Option<MySqlPool>,
    ) -> Self {
        Self {
            authorization_gate: Arc::new(AuthorizationGate::new(auth_service.clone())),
            auth_service,
            user_lookup,
            background,
            pool,
        }
    }

    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let private_pem = std::fs::read(&settings.keys.private_key_path).map_err(|e| {
            anyhow!("reading {}: {}", settings.keys.private_key_path, e)
        })?;
        let public_pem = std::fs::read(&settings.keys.public_key_path).map_err(|e| {
            anyhow!("reading {}: {}", settings.keys.public_key_path, e)
        })?;
        let token_codec: Arc<dyn TokenCodec> = Arc::new(JwtEdDsaCodec::from_pem(
            &private_pem,
            &public_pem,
            clock.clone(),
        )?);
        let credential_hasher: Arc<dyn CredentialHasher> = Arc::new(Argon2PasswordHasher);

        let session_store: Arc<dyn SessionStore> = match settings.session.backend.as_str() {
            "memory" => Arc::new(InMemorySessionStore::new(clock.clone())),
            "redis" => {
                let dsn = settings
                    .session
                    .redis_dsn
                    .as_deref()
                    .ok_or_else(|| anyhow!("session.redis_dsn is required for the redis backend"))?;
                let redis_client = redis::Client::open(dsn)?;
                let redis_manager = redis_client.get_connection_manager().await?;
                Arc::new(RedisSessionStore::new(
                    redis_manager,
                    settings.session.prefix.clone(),
                ))
            }
            other => return Err(anyhow!("Unknown session backend: {}", other)),
        };

        let (user_lookup, pool): (Arc<dyn UserLookup>, Option<MySqlPool>) =
            match settings.user.backend.as_str() {
                "memory" => {
                    let users = InMemoryUserLookup::new();
                    seed_default_user(&users, credential_hasher.as_ref(), &settings.user).await?;
                    (Arc::new(users) as Arc<dyn UserLookup>, None)
                }
                "mysql" => {
                    let dsn = settings
                        .user
                        .mysql_dsn
                        .as_deref()
                        .ok_or_else(|| anyhow!("user.mysql_dsn is required for the mysql backend"))?;
                    let pool = MySqlPoolOptions::new()
                        .max_connections(settings.user.max_connections)
                        .connect(dsn)
                        .await?;
                    (
                        Arc::new(MySqlUserLookup::new(pool.clone())) as Arc<dyn UserLookup>,
                        Some(pool),
                    )
                }
                other => return Err(anyhow!("Unknown user backend: {}", other)),
            };

        let manager = TokenLifecycleManager::new(
            user_lookup.clone(),
            credential_hasher,
            token_codec,
            session_store,
            clock,
        );
        let background = manager.background_tasks();

        info!(
            session_backend = %settings.session.backend,
            user_backend = %settings.user.backend,
            "server started"
        );

        Ok(Self::new(Arc::new(manager), user_lookup, background, pool))
    }

    /// Waits for background work to drain, then releases the database pool.
    pub async fn shutdown(&self) {
        info!("server shutting down...");

        self.background.close();
        self.background.wait().await;
        info!("background tasks drained");

        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}

async fn seed_default_user(
    users: &InMemoryUserLookup,
    hasher: &dyn CredentialHasher,
    settings: &settings::User,
) -> anyhow::Result<()> {
    let email = match settings.default_email.as_deref() {
        Some(email) if !email.is_empty() => email.to_string(),
        _ => {
            info!("Default user email is empty, using default: {}", DEFAULT_USER_EMAIL);
            DEFAULT_USER_EMAIL.to_string()
        }
    };
    let password = match settings.default_password.as_deref() {
        Some(password) if !password.is_empty() => password.to_string(),
        _ => {
            warn!("Default user password is empty, using the built-in development password");
            DEFAULT_USER_PASSWORD.to_string()
        }
    };

    let password_hash = hasher.hash_password(&password).await?;
    users.insert(
        UserIdentity {
            id: UserId::new(),
            email,
            first_name: String::new(),
            last_name: String::new(),
            role: Role::Administrator,
        },
        password_hash,
    );
    Ok(())
}

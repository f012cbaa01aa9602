use crate::domain_model::SessionKey;
use crate::domain_port::*;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::time::Duration;

/// Session store on Redis. The connection manager is cloned per call and
/// shared freely between in-flight requests.
pub struct RedisSessionStore {
    conn: ConnectionManager,
    prefix: String,
}

impl RedisSessionStore {
    pub fn new(conn: ConnectionManager, prefix: impl Into<String>) -> Self {
        RedisSessionStore {
            conn,
            prefix: prefix.into(),
        }
    }

    fn key(&self, key: &SessionKey) -> String {
        if self.prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}:{}", self.prefix, key)
        }
    }

    // Redis expiries are whole seconds and must be positive.
    fn ttl_secs(ttl: Duration) -> u64 {
        ttl.as_secs().max(1)
    }
}

fn unavailable(err: redis::RedisError) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

#[async_trait::async_trait]
impl SessionStore for RedisSessionStore {
    async fn put_with_ttl(
        &self,
        key: &SessionKey,
        value: &str,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .set_ex(self.key(key), value, Self::ttl_secs(ttl))
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    async fn put_if_absent(
        &self,
        key: &SessionKey,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let reply: Option<String> = redis::cmd("SET")
            .arg(self.key(key))
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(Self::ttl_secs(ttl))
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;
        Ok(reply.is_some())
    }

    async fn delete(&self, key: &SessionKey) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(self.key(key)).await.map_err(unavailable)?;
        Ok(())
    }

    async fn exists(&self, key: &SessionKey) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let found: bool = conn.exists(self.key(key)).await.map_err(unavailable)?;
        Ok(found)
    }

    async fn batch(&self, ops: Vec<StoreOp>) -> Result<(), StoreError> {
        if ops.is_empty() {
            return Ok(());
        }

        let mut pipe = redis::pipe();
        pipe.atomic();
        for op in &ops {
            match op {
                StoreOp::Put { key, value, ttl } => {
                    pipe.set_ex(self.key(key), value, Self::ttl_secs(*ttl))
                        .ignore();
                }
                StoreOp::Delete { key } => {
                    pipe.del(self.key(key)).ignore();
                }
            }
        }

        let mut conn = self.conn.clone();
        let _: () = pipe.query_async(&mut conn).await.map_err(unavailable)?;
        Ok(())
    }
}

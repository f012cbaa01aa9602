use crate::domain_model::*;
use crate::domain_port::*;
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};

pub struct MySqlUserLookup {
    pool: MySqlPool,
}

impl MySqlUserLookup {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlUserLookup { pool }
    }

    fn row_to_identity(row: MySqlRow) -> Result<UserIdentity, UserLookupError> {
        let store = |e: sqlx::Error| UserLookupError::Store(e.to_string());

        let role: String = row.try_get("role").map_err(store)?;
        let role = role
            .parse::<Role>()
            .map_err(|e| UserLookupError::Store(e.to_string()))?;

        Ok(UserIdentity {
            id: row.try_get("id").map_err(store)?,
            email: row.try_get("email").map_err(store)?,
            first_name: row.try_get("first_name").map_err(store)?,
            last_name: row.try_get("last_name").map_err(store)?,
            role,
        })
    }
}

#[async_trait::async_trait]
impl UserLookup for MySqlUserLookup {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserIdentity>, UserLookupError> {
        let row_opt: Option<MySqlRow> = sqlx::query(
            r#"
SELECT id, email, first_name, last_name, role
FROM users
WHERE email = ?
"#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| UserLookupError::Store(e.to_string()))?;

        row_opt.map(Self::row_to_identity).transpose()
    }

    async fn find_by_id(&self, user_id: UserId) -> Result<Option<UserIdentity>, UserLookupError> {
        let row_opt: Option<MySqlRow> = sqlx::query(
            r#"
SELECT id, email, first_name, last_name, role
FROM users
WHERE id = ?
"#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| UserLookupError::Store(e.to_string()))?;

        row_opt.map(Self::row_to_identity).transpose()
    }

    async fn find_credential_hash(&self, email: &str) -> Result<Option<String>, UserLookupError> {
        let hash: Option<String> = sqlx::query_scalar(
            r#"
SELECT ua.password
FROM user_auth ua
JOIN users u ON u.id = ua.user_id
WHERE u.email = ?
"#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| UserLookupError::Store(e.to_string()))?;

        Ok(hash)
    }

    async fn touch_last_login(&self, user_id: UserId) -> Result<(), UserLookupError> {
        sqlx::query("UPDATE user_auth SET last_login = CURRENT_TIMESTAMP WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| UserLookupError::Store(format!("touch last login: {e}")))?;
        Ok(())
    }
}

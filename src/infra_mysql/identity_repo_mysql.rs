use super::util::is_dup_key;
use crate::application_port::AuthError;
use crate::domain_model::Subject;
use crate::domain_port::IdentityRepo;
use sqlx::{MySqlPool, Row};

pub struct MySqlIdentityRepo {
    pool: MySqlPool,
}

impl MySqlIdentityRepo {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlIdentityRepo { pool }
    }
}

#[async_trait::async_trait]
impl IdentityRepo for MySqlIdentityRepo {
    async fn create_user(
        &self,
        subject: &Subject,
        password_hash: &str,
    ) -> Result<(), AuthError> {
        let result = sqlx::query(
            r#"
INSERT INTO account (username, password_hash)
VALUES (?, ?)
"#,
        )
        .bind(subject.as_str())
        .bind(password_hash)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_dup_key(&e) => Err(AuthError::UserExists),
            Err(e) => Err(AuthError::StoreUnavailable(e.to_string())),
        }
    }

    async fn lookup_password_hash(
        &self,
        subject: &Subject,
    ) -> Result<Option<String>, AuthError> {
        let row_opt = sqlx::query(
            r#"
SELECT password_hash
FROM account
WHERE username = ?
"#,
        )
        .bind(subject.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AuthError::StoreUnavailable(e.to_string()))?;

        row_opt
            .map(|row| {
                row.try_get("password_hash")
                    .map_err(|e| AuthError::StoreUnavailable(e.to_string()))
            })
            .transpose()
    }
}

use crate::application_port::AuthError;
use crate::domain_model::{Subject, TokenKind, remaining_ttl_secs};
use crate::domain_port::RevocationStore;
use chrono::{DateTime, Utc};
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use serde::Serialize;

pub struct RedisRevocationStore {
    conn: ConnectionManager,
    prefix: String,
}

/// Allow-entry payload. Kind is redundant with the key but keeps the entry
/// self-describing when inspected on the server.
#[derive(Debug, Serialize)]
struct AllowEntry<'a> {
    sub: &'a str,
    #[serde(rename = "type")]
    kind: TokenKind,
    exp: i64,
}

fn allow_key(prefix: &str, kind: TokenKind, jti: &str) -> String {
    format!("{}:allow:{}:{}", prefix, kind.as_str(), jti)
}

fn block_key(prefix: &str, jti: &str) -> String {
    format!("{}:block:{}", prefix, jti)
}

impl RedisRevocationStore {
    pub fn new(conn: ConnectionManager, prefix: impl Into<String>) -> Self {
        RedisRevocationStore {
            conn,
            prefix: prefix.into(),
        }
    }
}

#[async_trait::async_trait]
impl RevocationStore for RedisRevocationStore {
    async fn register_allow(
        &self,
        kind: TokenKind,
        jti: &str,
        subject: &Subject,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        let entry = AllowEntry {
            sub: subject.as_str(),
            kind,
            exp: expires_at.timestamp(),
        };
        let payload = serde_json::to_string(&entry)
            .map_err(|e| AuthError::InternalError(e.to_string()))?;

        let mut conn = self.conn.clone();
        let _: () = conn
            .set_ex(
                allow_key(&self.prefix, kind, jti),
                payload,
                remaining_ttl_secs(expires_at),
            )
            .await
            .map_err(|e| AuthError::StoreUnavailable(e.to_string()))?;
        Ok(())
    }

    async fn is_allowed(&self, jti: &str) -> Result<bool, AuthError> {
        let keys = vec![
            allow_key(&self.prefix, TokenKind::Access, jti),
            allow_key(&self.prefix, TokenKind::Refresh, jti),
        ];
        let mut conn = self.conn.clone();
        let found: i64 = conn
            .exists(keys)
            .await
            .map_err(|e| AuthError::StoreUnavailable(e.to_string()))?;
        Ok(found > 0)
    }

    async fn is_blocked(&self, jti: &str) -> Result<bool, AuthError> {
        let mut conn = self.conn.clone();
        let found: i64 = conn
            .exists(block_key(&self.prefix, jti))
            .await
            .map_err(|e| AuthError::StoreUnavailable(e.to_string()))?;
        Ok(found > 0)
    }

    async fn revoke(&self, jti: &str, expires_at: DateTime<Utc>) -> Result<(), AuthError> {
        let mut conn = self.conn.clone();

        // Tombstone before allow-entry deletion; readers consult the block list
        // first, so a concurrent admit never sees the jti in neither list.
        let _: () = conn
            .set_ex(
                block_key(&self.prefix, jti),
                "1",
                remaining_ttl_secs(expires_at),
            )
            .await
            .map_err(|e| AuthError::StoreUnavailable(e.to_string()))?;

        let _: () = conn
            .del(vec![
                allow_key(&self.prefix, TokenKind::Access, jti),
                allow_key(&self.prefix, TokenKind::Refresh, jti),
            ])
            .await
            .map_err(|e| AuthError::StoreUnavailable(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_layout() {
        assert_eq!(
            allow_key("auth", TokenKind::Access, "abc"),
            "auth:allow:access:abc"
        );
        assert_eq!(
            allow_key("auth", TokenKind::Refresh, "abc"),
            "auth:allow:refresh:abc"
        );
        assert_eq!(block_key("auth", "abc"), "auth:block:abc");
    }

    #[test]
    fn allow_entry_payload_shape() {
        let entry = AllowEntry {
            sub: "alice",
            kind: TokenKind::Access,
            exp: 1_700_000_000,
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(json, r#"{"sub":"alice","type":"access","exp":1700000000}"#);
    }
}

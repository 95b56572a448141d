use crate::application_port::AuthError;
use crate::domain_model::{Subject, TokenKind, remaining_ttl_secs};
use crate::domain_port::RevocationStore;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

/// In-process revocation store for development and tests. Entries carry the
/// same per-key deadline a TTL backend would apply and are evicted lazily on
/// read, so expiry behavior matches the Redis adapter without a reaper task.
#[derive(Default)]
pub struct MemoryRevocationStore {
    allow: DashMap<String, AllowEntry>,
    block: DashMap<String, DateTime<Utc>>,
}

// Presence plus deadline is all the gate reads back; the subject metadata the
// Redis adapter persists has no consumer here.
#[derive(Debug, Clone)]
struct AllowEntry {
    deadline: DateTime<Utc>,
}

fn allow_key(kind: TokenKind, jti: &str) -> String {
    format!("{}:{}", kind.as_str(), jti)
}

fn deadline_for(expires_at: DateTime<Utc>) -> DateTime<Utc> {
    Utc::now() + Duration::seconds(remaining_ttl_secs(expires_at) as i64)
}

impl MemoryRevocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn allow_entry_live(&self, kind: TokenKind, jti: &str) -> bool {
        let key = allow_key(kind, jti);
        // Copy the deadline out so the map guard is released before a removal
        // touches the same shard.
        let deadline = match self.allow.get(&key) {
            Some(entry) => entry.deadline,
            None => return false,
        };
        if deadline > Utc::now() {
            true
        } else {
            self.allow.remove(&key);
            false
        }
    }
}

#[async_trait::async_trait]
impl RevocationStore for MemoryRevocationStore {
    async fn register_allow(
        &self,
        kind: TokenKind,
        jti: &str,
        _subject: &Subject,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        self.allow.insert(
            allow_key(kind, jti),
            AllowEntry {
                deadline: deadline_for(expires_at),
            },
        );
        Ok(())
    }

    async fn is_allowed(&self, jti: &str) -> Result<bool, AuthError> {
        Ok(self.allow_entry_live(TokenKind::Access, jti)
            || self.allow_entry_live(TokenKind::Refresh, jti))
    }

    async fn is_blocked(&self, jti: &str) -> Result<bool, AuthError> {
        let deadline = match self.block.get(jti) {
            Some(entry) => *entry,
            None => return Ok(false),
        };
        if deadline > Utc::now() {
            Ok(true)
        } else {
            self.block.remove(jti);
            Ok(false)
        }
    }

    async fn revoke(&self, jti: &str, expires_at: DateTime<Utc>) -> Result<(), AuthError> {
        // Same write order as the Redis adapter: tombstone first, then the
        // allow entries for both kinds.
        self.block.insert(jti.to_string(), deadline_for(expires_at));
        self.allow.remove(&allow_key(TokenKind::Access, jti));
        self.allow.remove(&allow_key(TokenKind::Refresh, jti));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subject() -> Subject {
        Subject::from("alice")
    }

    #[tokio::test]
    async fn register_then_allowed_under_either_kind() {
        let store = MemoryRevocationStore::new();
        let exp = Utc::now() + Duration::minutes(15);

        store
            .register_allow(TokenKind::Refresh, "jti-1", &subject(), exp)
            .await
            .unwrap();

        assert!(store.is_allowed("jti-1").await.unwrap());
        assert!(!store.is_blocked("jti-1").await.unwrap());
        assert!(!store.is_allowed("jti-2").await.unwrap());
    }

    #[tokio::test]
    async fn revoke_blocks_and_clears_allow() {
        let store = MemoryRevocationStore::new();
        let exp = Utc::now() + Duration::minutes(15);

        store
            .register_allow(TokenKind::Access, "jti-1", &subject(), exp)
            .await
            .unwrap();
        store.revoke("jti-1", exp).await.unwrap();

        assert!(store.is_blocked("jti-1").await.unwrap());
        assert!(!store.is_allowed("jti-1").await.unwrap());
    }

    #[tokio::test]
    async fn revoke_is_idempotent() {
        let store = MemoryRevocationStore::new();
        let exp = Utc::now() + Duration::minutes(15);

        store
            .register_allow(TokenKind::Access, "jti-1", &subject(), exp)
            .await
            .unwrap();
        store.revoke("jti-1", exp).await.unwrap();
        store.revoke("jti-1", exp).await.unwrap();

        assert!(store.is_blocked("jti-1").await.unwrap());
        assert!(!store.is_allowed("jti-1").await.unwrap());
    }

    #[tokio::test]
    async fn allow_entry_expires_with_the_credential() {
        let store = MemoryRevocationStore::new();
        let exp = Utc::now() + Duration::seconds(1);

        store
            .register_allow(TokenKind::Access, "jti-1", &subject(), exp)
            .await
            .unwrap();
        assert!(store.is_allowed("jti-1").await.unwrap());

        tokio::time::sleep(std::time::Duration::from_secs(2)).await;
        assert!(!store.is_allowed("jti-1").await.unwrap());
    }

    #[tokio::test]
    async fn tombstone_expires_with_the_credential() {
        let store = MemoryRevocationStore::new();
        let exp = Utc::now() + Duration::seconds(1);

        store.revoke("jti-1", exp).await.unwrap();
        assert!(store.is_blocked("jti-1").await.unwrap());

        tokio::time::sleep(std::time::Duration::from_secs(2)).await;
        assert!(!store.is_blocked("jti-1").await.unwrap());
    }

    #[tokio::test]
    async fn expired_entry_gets_at_least_one_second() {
        let store = MemoryRevocationStore::new();
        let past = Utc::now() - Duration::minutes(5);

        store.revoke("jti-1", past).await.unwrap();
        // Clamped TTL keeps the tombstone observable rather than instantly gone.
        assert!(store.is_blocked("jti-1").await.unwrap());
    }
}

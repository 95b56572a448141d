use crate::application_port::AuthError;
use crate::domain_model::{Subject, TokenKind};
use chrono::{DateTime, Utc};

/// Keyed TTL store holding the allow-list (one entry per issued credential, keyed
/// by kind + jti) and the block-list (one tombstone per revoked jti). Backends
/// only need atomic set-with-expiry, exists, and delete; no multi-key
/// transactions. Entry lifetimes are derived from the credential's own
/// `expires_at`, clamped to at least one second, so the store self-cleans once a
/// credential would be rejected by expiry anyway.
#[async_trait::async_trait]
pub trait RevocationStore: Send + Sync {
    /// Upsert the allow entry for an issued credential. Re-registering the same
    /// jti refreshes the TTL.
    async fn register_allow(
        &self,
        kind: TokenKind,
        jti: &str,
        subject: &Subject,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AuthError>;

    /// Whether an allow entry exists for `jti` under either kind.
    async fn is_allowed(&self, jti: &str) -> Result<bool, AuthError>;

    /// Whether a block tombstone exists for `jti`.
    async fn is_blocked(&self, jti: &str) -> Result<bool, AuthError>;

    /// Move `jti` from valid to blocked: write the block tombstone, then delete
    /// the allow entries for both kinds. The tombstone must be written first —
    /// readers check the block-list before trusting the allow-list, so this
    /// order leaves no window where the jti is in neither list. Idempotent.
    async fn revoke(&self, jti: &str, expires_at: DateTime<Utc>) -> Result<(), AuthError>;
}

use super::Subject;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Credential kind carried in the token's `type` claim and in allow-list keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The decoded, signature-verified view of a credential.
#[derive(Debug, Clone)]
pub struct TokenClaims {
    pub subject: Subject,
    pub jti: String,
    pub kind: TokenKind,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Remaining lifetime of a credential in whole seconds, clamped to at least 1.
/// A zero or negative TTL must never reach the store: some backends read 0 as
/// "no expiry", and an immediate delete races the write it belongs to.
pub fn remaining_ttl_secs(expires_at: DateTime<Utc>) -> u64 {
    let secs = (expires_at - Utc::now()).num_seconds();
    if secs <= 0 { 1 } else { secs as u64 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn ttl_clamps_to_one_second() {
        assert_eq!(remaining_ttl_secs(Utc::now() - Duration::hours(2)), 1);
        assert_eq!(remaining_ttl_secs(Utc::now()), 1);
    }

    #[test]
    fn ttl_tracks_remaining_lifetime() {
        let ttl = remaining_ttl_secs(Utc::now() + Duration::minutes(15));
        assert!((898..=900).contains(&ttl), "ttl was {ttl}");
    }

    #[test]
    fn kind_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&TokenKind::Access).unwrap(),
            "\"access\""
        );
        assert_eq!(
            serde_json::from_str::<TokenKind>("\"refresh\"").unwrap(),
            TokenKind::Refresh
        );
    }
}

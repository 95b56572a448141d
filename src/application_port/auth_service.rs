use crate::domain_model::{Subject, TokenClaims, TokenKind};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Failure modes of decoding an untrusted serialized credential. Every path is a
/// typed result; attacker-controlled input must never panic the codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed token")]
    Malformed,
    #[error("token expired")]
    Expired,
    #[error("bad signature")]
    BadSignature,
}

/// Why the validation gate refused a credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Deny {
    #[error("unauthenticated")]
    Unauthenticated,
    #[error("revoked")]
    Revoked,
    #[error("not registered")]
    NotRegistered,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("user already exists")]
    UserExists,
    #[error(transparent)]
    Denied(#[from] Deny),
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("internal error: {0}")]
    InternalError(String),
}

#[derive(Debug, Clone)]
pub struct SignupInput {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct LoginInput {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccessToken(pub String);

#[derive(Debug, Clone, Serialize)]
pub struct RefreshToken(pub String);

/// The credential pair handed out by `login`.
#[derive(Debug, Clone, Serialize)]
pub struct AuthTokens {
    pub access_token: AccessToken,
    pub refresh_token: RefreshToken,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token_expires_at: DateTime<Utc>,
}

/// The replacement access credential handed out by `refresh`. The refresh
/// credential itself is untouched and stays valid.
#[derive(Debug, Clone, Serialize)]
pub struct AccessGrant {
    pub access_token: AccessToken,
    pub access_token_expires_at: DateTime<Utc>,
}

/// What the validation gate vouches for once a credential is admitted. `subject`
/// is the authenticated identity; `jti` and `expires_at` are what `logout` needs
/// to revoke exactly this credential.
#[derive(Debug, Clone)]
pub struct Identity {
    pub subject: Subject,
    pub jti: String,
    pub kind: TokenKind,
    pub expires_at: DateTime<Utc>,
}

/// A freshly minted credential plus the fields the caller must register in the
/// allow-list. Minting has no side effects; registration is the caller's job.
#[derive(Debug, Clone)]
pub struct IssuedCredential {
    pub token: String,
    pub jti: String,
    pub expires_at: DateTime<Utc>,
}

#[async_trait::async_trait]
pub trait TokenCodec: Send + Sync {
    /// Mint a signed credential for `subject` with a fresh unique jti.
    async fn issue(
        &self,
        subject: &Subject,
        kind: TokenKind,
    ) -> Result<IssuedCredential, AuthError>;
    /// Verify signature and expiry of a serialized credential.
    async fn decode(&self, token: &str) -> Result<TokenClaims, DecodeError>;
}

#[async_trait::async_trait]
pub trait CredentialHasher: Send + Sync {
    async fn hash_password(&self, password: &str) -> Result<String, AuthError>;
    async fn verify_password(&self, password: &str, password_hash: &str)
    -> Result<bool, AuthError>;
}

#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    async fn signup(&self, request: SignupInput) -> Result<(), AuthError>;
    /// Mint and register an access/refresh pair. Both allow entries are written
    /// before the tokens are returned, so a decodable unexpired credential is
    /// never in flight without a registration.
    async fn login(&self, request: LoginInput) -> Result<AuthTokens, AuthError>;
    /// Mint a new access credential for the subject of an admitted refresh
    /// credential. Goes through `admit`, not a separate trust path.
    async fn refresh(&self, refresh_token: &str) -> Result<AccessGrant, AuthError>;
    /// Revoke the credential that authenticated the current request. The paired
    /// sibling credential is left to its natural expiry.
    async fn logout(&self, session: &Identity) -> Result<(), AuthError>;
    /// The validation gate: decode, then block-list, then allow-list.
    async fn admit(&self, token: &str) -> Result<Identity, AuthError>;
}

use crate::application_port::{
    AccessGrant, AccessToken, AuthError, AuthService, AuthTokens, CredentialHasher, DecodeError,
    Deny, Identity, IssuedCredential, LoginInput, RefreshToken, SignupInput, TokenCodec,
};
use crate::domain_model::{Subject, TokenClaims, TokenKind};
use crate::domain_port::{IdentityRepo, RevocationStore};
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub struct Argon2PasswordHasher;

#[async_trait::async_trait]
impl CredentialHasher for Argon2PasswordHasher {
    async fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let salt = argon2::password_hash::SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();
        let hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AuthError::InternalError(e.to_string()))?
            .to_string();
        Ok(hash)
    }

    async fn verify_password(
        &self,
        password: &str,
        password_hash: &str,
    ) -> Result<bool, AuthError> {
        let parsed = PasswordHash::new(password_hash).map_err(|e| {
            AuthError::InternalError(format!("invalid PHC hash: {}", e.to_string()))
        })?;

        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(_) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AuthError::InternalError(format!(
                "verify error: {}",
                e.to_string()
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub issuer: String,
    pub audience: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub signing_key: Vec<u8>,
}

/// Fixed-field wire claims. `type` distinguishes the two credential kinds; a
/// missing or unknown value fails deserialization and the token is malformed.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    jti: String,
    #[serde(rename = "type")]
    kind: TokenKind,
    iat: i64,
    exp: i64,
    iss: String,
    aud: String,
}

fn encode_claims(
    subject: &Subject,
    kind: TokenKind,
    jti: String,
    cfg: &JwtConfig,
) -> Result<(String, DateTime<Utc>), AuthError> {
    let iat_dt = Utc::now();
    let ttl = match kind {
        TokenKind::Access => cfg.access_ttl,
        TokenKind::Refresh => cfg.refresh_ttl,
    };
    let exp_dt = iat_dt + ttl;
    let claims = Claims {
        sub: subject.as_str().to_string(),
        jti,
        kind,
        iat: iat_dt.timestamp(),
        exp: exp_dt.timestamp(),
        iss: cfg.issuer.clone(),
        aud: cfg.audience.clone(),
    };
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(&cfg.signing_key),
    )
    .map_err(|e| AuthError::InternalError(e.to_string()))?;
    Ok((token, exp_dt))
}

fn decode_claims(token: &str, cfg: &JwtConfig) -> Result<Claims, DecodeError> {
    let mut v = Validation::new(Algorithm::HS256);
    v.validate_exp = true;
    // No leeway: a credential one second past exp is already dead.
    v.leeway = 0;
    v.set_audience(&[cfg.audience.clone()]);
    v.set_issuer(&[cfg.issuer.clone()]);
    let data = decode::<Claims>(token, &DecodingKey::from_secret(&cfg.signing_key), &v)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => DecodeError::Expired,
            ErrorKind::InvalidSignature => DecodeError::BadSignature,
            _ => DecodeError::Malformed,
        })?;
    Ok(data.claims)
}

pub struct JwtHs256Codec {
    cfg: JwtConfig,
}

impl JwtHs256Codec {
    pub fn new(cfg: JwtConfig) -> Self {
        JwtHs256Codec { cfg }
    }

    #[inline]
    fn gen_jti() -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

#[async_trait::async_trait]
impl TokenCodec for JwtHs256Codec {
    async fn issue(
        &self,
        subject: &Subject,
        kind: TokenKind,
    ) -> Result<IssuedCredential, AuthError> {
        let jti = Self::gen_jti();
        let (token, exp_dt) = encode_claims(subject, kind, jti.clone(), &self.cfg)?;
        Ok(IssuedCredential {
            token,
            jti,
            expires_at: exp_dt,
        })
    }

    async fn decode(&self, token: &str) -> Result<TokenClaims, DecodeError> {
        let claims = decode_claims(token, &self.cfg)?;
        let issued_at =
            DateTime::<Utc>::from_timestamp(claims.iat, 0).ok_or(DecodeError::Malformed)?;
        let expires_at =
            DateTime::<Utc>::from_timestamp(claims.exp, 0).ok_or(DecodeError::Malformed)?;
        Ok(TokenClaims {
            subject: Subject(claims.sub),
            jti: claims.jti,
            kind: claims.kind,
            issued_at,
            expires_at,
        })
    }
}

pub struct RealAuthService {
    identity_repo: Arc<dyn IdentityRepo>,
    credential_hasher: Arc<dyn CredentialHasher>,
    token_codec: Arc<dyn TokenCodec>,
    revocation_store: Arc<dyn RevocationStore>,
    min_username_len: usize,
    min_password_len: usize,
}

impl RealAuthService {
    pub fn new(
        identity_repo: Arc<dyn IdentityRepo>,
        credential_hasher: Arc<dyn CredentialHasher>,
        token_codec: Arc<dyn TokenCodec>,
        revocation_store: Arc<dyn RevocationStore>,
    ) -> Self {
        Self {
            identity_repo,
            credential_hasher,
            token_codec,
            revocation_store,
            min_username_len: 6,
            min_password_len: 6,
        }
    }

    fn validate_signup(&self, username: &str, password: &str) -> Result<(), AuthError> {
        if username.len() < self.min_username_len {
            return Err(AuthError::InternalError("username too short".to_string()));
        }
        if password.len() < self.min_password_len {
            return Err(AuthError::InternalError("password too short".to_string()));
        }
        Ok(())
    }

    async fn mint_and_register(
        &self,
        subject: &Subject,
        kind: TokenKind,
    ) -> Result<IssuedCredential, AuthError> {
        let minted = self.token_codec.issue(subject, kind).await?;
        self.revocation_store
            .register_allow(kind, &minted.jti, subject, minted.expires_at)
            .await?;
        Ok(minted)
    }
}

#[async_trait::async_trait]
impl AuthService for RealAuthService {
    async fn signup(&self, request: SignupInput) -> Result<(), AuthError> {
        let SignupInput { username, password } = request;

        self.validate_signup(&username, &password)?;

        let password_hash = self.credential_hasher.hash_password(&password).await?;
        self.identity_repo
            .create_user(&Subject(username), &password_hash)
            .await?;

        Ok(())
    }

    async fn login(&self, request: LoginInput) -> Result<AuthTokens, AuthError> {
        let LoginInput { username, password } = request;
        let subject = Subject(username);

        let hash = self
            .identity_repo
            .lookup_password_hash(&subject)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let ok = self
            .credential_hasher
            .verify_password(&password, &hash)
            .await?;
        if !ok {
            return Err(AuthError::InvalidCredentials);
        }

        // Both registrations complete before the pair leaves this function, so
        // a live credential is never unknown to the store.
        let access = self.mint_and_register(&subject, TokenKind::Access).await?;
        let refresh = self.mint_and_register(&subject, TokenKind::Refresh).await?;

        Ok(AuthTokens {
            access_token: AccessToken(access.token),
            refresh_token: RefreshToken(refresh.token),
            access_token_expires_at: access.expires_at,
            refresh_token_expires_at: refresh.expires_at,
        })
    }

    async fn refresh(&self, refresh_token: &str) -> Result<AccessGrant, AuthError> {
        let session = self.admit(refresh_token).await?;
        if session.kind != TokenKind::Refresh {
            return Err(Deny::Unauthenticated.into());
        }

        // The refresh credential is not rotated; it stays valid until logout or
        // natural expiry.
        let access = self
            .mint_and_register(&session.subject, TokenKind::Access)
            .await?;

        Ok(AccessGrant {
            access_token: AccessToken(access.token),
            access_token_expires_at: access.expires_at,
        })
    }

    async fn logout(&self, session: &Identity) -> Result<(), AuthError> {
        // Only the presented credential. Its sibling from the same login keeps
        // its own jti and its own lifetime.
        self.revocation_store
            .revoke(&session.jti, session.expires_at)
            .await
    }

    async fn admit(&self, token: &str) -> Result<Identity, AuthError> {
        let claims = match self.token_codec.decode(token).await {
            Ok(claims) => claims,
            Err(e) => {
                debug!("credential rejected at decode: {}", e);
                return Err(Deny::Unauthenticated.into());
            }
        };

        // Block-list first. During a revoke the tombstone lands before the
        // allow entry is deleted, so this order denies a jti that is
        // transiently in both lists.
        if self.revocation_store.is_blocked(&claims.jti).await? {
            return Err(Deny::Revoked.into());
        }
        if !self.revocation_store.is_allowed(&claims.jti).await? {
            return Err(Deny::NotRegistered.into());
        }

        Ok(Identity {
            subject: claims.subject,
            jti: claims.jti,
            kind: claims.kind,
            expires_at: claims.expires_at,
        })
    }
}

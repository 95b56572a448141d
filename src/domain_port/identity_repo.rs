use crate::application_port::AuthError;
use crate::domain_model::Subject;

/// Persisted identity collaborator. Only the two operations the session service
/// needs; schema and hashing policy live behind this boundary.
#[async_trait::async_trait]
pub trait IdentityRepo: Send + Sync {
    /// Insert a new account. `AuthError::UserExists` if the subject is taken.
    async fn create_user(&self, subject: &Subject, password_hash: &str)
    -> Result<(), AuthError>;

    /// Fetch the stored password hash, `None` for unknown subjects. The caller
    /// must collapse "unknown subject" and "wrong password" into one failure.
    async fn lookup_password_hash(&self, subject: &Subject)
    -> Result<Option<String>, AuthError>;
}

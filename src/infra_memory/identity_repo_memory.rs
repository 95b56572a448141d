use crate::application_port::AuthError;
use crate::domain_model::Subject;
use crate::domain_port::IdentityRepo;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

/// In-process identity store for development and tests.
#[derive(Default)]
pub struct MemoryIdentityRepo {
    accounts: DashMap<String, String>,
}

impl MemoryIdentityRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl IdentityRepo for MemoryIdentityRepo {
    async fn create_user(
        &self,
        subject: &Subject,
        password_hash: &str,
    ) -> Result<(), AuthError> {
        match self.accounts.entry(subject.as_str().to_string()) {
            Entry::Occupied(_) => Err(AuthError::UserExists),
            Entry::Vacant(vacant) => {
                vacant.insert(password_hash.to_string());
                Ok(())
            }
        }
    }

    async fn lookup_password_hash(
        &self,
        subject: &Subject,
    ) -> Result<Option<String>, AuthError> {
        Ok(self
            .accounts
            .get(subject.as_str())
            .map(|hash| hash.value().clone()))
    }
}

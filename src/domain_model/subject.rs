use serde::{Deserialize, Serialize};
use std::fmt;

/// The identity a credential is issued to. Opaque to this crate beyond equality;
/// in practice it is the username the subject logged in with.
#[derive(Debug, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Subject(pub String);

impl Subject {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Subject {
    fn from(s: &str) -> Self {
        Subject(s.to_string())
    }
}

impl From<String> for Subject {
    fn from(s: String) -> Self {
        Subject(s)
    }
}

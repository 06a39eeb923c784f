use murmur_common::model::auth::Credential;
use std::sync::Arc;

/// The whole identity backend: a fixed list of login pairs.
#[derive(Clone, Debug, Default)]
pub struct CredentialStore {
    credentials: Arc<[Credential]>,
}

impl CredentialStore {
    #[must_use]
    pub fn new(credentials: impl IntoIterator<Item = Credential>) -> Self {
        Self {
            credentials: credentials.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn demo() -> Self {
        Self::new([
            Credential::new("demo@example.com", "password123", "Demo User"),
            Credential::new("test@user.com", "testpass", "Test User"),
        ])
    }

    #[must_use]
    pub fn find(&self, email: &str, password: &str) -> Option<&Credential> {
        self.credentials
            .iter()
            .find(|credential| credential.matches(email, password))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Credential> {
        self.credentials.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }
}

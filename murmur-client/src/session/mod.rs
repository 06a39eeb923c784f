pub mod network;
pub mod store;

use crate::{
    credentials::CredentialStore,
    session::{
        network::{Network, NetworkError},
        store::{KeyValueStore, StoreError},
    },
};
use murmur_common::model::{
    ModelValidationError,
    auth::{Session, SessionSnapshot},
    user::User,
};
use std::{
    fmt::{Debug, Formatter},
    sync::Arc,
};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// The single store key holding the session snapshot.
pub const SESSION_KEY: &str = "auth";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Network(#[from] NetworkError),
}

#[derive(Debug, Error)]
enum SnapshotError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Snapshot is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid snapshot: {0}")]
    Data(#[from] ModelValidationError),
}

/// Owns the authentication state of the client.
///
/// Cloning yields another handle to the same session. Every change is a single replacement of
/// the watched value, so subscribers never observe a half-applied login.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    credentials: CredentialStore,
    store: Arc<dyn KeyValueStore>,
    network: Arc<dyn Network>,
    state: watch::Sender<Session>,
}

impl SessionManager {
    #[must_use]
    pub fn new(
        credentials: CredentialStore,
        store: Arc<dyn KeyValueStore>,
        network: Arc<dyn Network>,
    ) -> Self {
        let (state, _) = watch::channel(Session::anonymous());

        Self {
            inner: Arc::new(SessionInner {
                credentials,
                store,
                network,
                state,
            }),
        }
    }

    /// Loads the persisted snapshot. Anything unreadable counts as logged out.
    pub fn restore(&self) -> Session {
        let session = match self.load_snapshot() {
            Ok(Some(session)) => session,
            Ok(None) => Session::anonymous(),
            Err(err) => {
                warn!(error = %err, "Ignoring unreadable session snapshot");
                Session::anonymous()
            }
        };

        debug!(
            authenticated = session.is_authenticated(),
            "Restored session"
        );
        self.inner.state.send_replace(session.clone());
        session
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<bool, SessionError> {
        self.inner.network.round_trip().await?;

        let Some(credential) = self.inner.credentials.find(email, password) else {
            debug!(email, "Login rejected");
            return Ok(false);
        };

        let user = User::new_session_user(&credential.email, &credential.display_name);
        self.establish(user);
        Ok(true)
    }

    /// Always succeeds: there is no uniqueness check against known or previous accounts.
    pub async fn signup(
        &self,
        name: &str,
        email: &str,
        _password: &str,
    ) -> Result<bool, SessionError> {
        self.inner.network.round_trip().await?;

        debug!(email, name, "Creating account");
        self.establish(User::new_session_user(email, name));
        Ok(true)
    }

    pub fn logout(&self) {
        self.inner.state.send_replace(Session::anonymous());

        if let Err(err) = self.inner.store.remove(SESSION_KEY) {
            warn!(error = %err, "Could not erase session snapshot");
        }
        info!("Logged out");
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.inner.state.subscribe()
    }

    #[must_use]
    pub fn current(&self) -> Session {
        self.inner.state.borrow().clone()
    }

    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.inner.state.borrow().user().cloned()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().is_authenticated()
    }

    fn establish(&self, user: User) {
        info!(user_id = %user.id, email = %user.email, "Session established");

        let session = Session::authenticated(user);
        self.persist(&session);
        self.inner.state.send_replace(session);
    }

    fn persist(&self, session: &Session) {
        let result = serde_json::to_string(&SessionSnapshot::from(session))
            .map_err(SnapshotError::from)
            .and_then(|json| Ok(self.inner.store.set(SESSION_KEY, &json)?));

        if let Err(err) = result {
            warn!(error = %err, "Could not persist session snapshot");
        }
    }

    fn load_snapshot(&self) -> Result<Option<Session>, SnapshotError> {
        let Some(json) = self.inner.store.get(SESSION_KEY)? else {
            return Ok(None);
        };
        let snapshot: SessionSnapshot = serde_json::from_str(&json)?;

        let session = Session::try_from(snapshot).map_err(ModelValidationError::from)?;
        Ok(Some(session))
    }
}

impl Debug for SessionManager {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("session", &*self.inner.state.borrow())
            .field("credentials", &self.inner.credentials.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        credentials::CredentialStore,
        session::{
            SESSION_KEY, SessionError, SessionManager,
            network::{Network, NetworkError},
            store::{KeyValueStore, MemoryStore},
        },
        testing,
    };
    use async_trait::async_trait;
    use murmur_common::model::auth::Session;
    use std::sync::Arc;

    struct OfflineNetwork;

    #[async_trait]
    impl Network for OfflineNetwork {
        async fn round_trip(&self) -> Result<(), NetworkError> {
            Err(NetworkError("offline".to_owned()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn login_with_every_seeded_credential() {
        for credential in CredentialStore::demo().iter() {
            let session = testing::session();

            assert!(
                session
                    .login(&credential.email, &credential.password)
                    .await
                    .unwrap()
            );

            let user = session.user().unwrap();
            assert!(session.is_authenticated());
            assert_eq!(user.email, credential.email);
            assert_eq!(user.name, credential.display_name);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn failed_login_leaves_state_untouched() {
        let store = Arc::new(MemoryStore::default());
        let session = testing::session_with_store(store.clone());

        for (email, password) in [
            ("demo@example.com", "wrong"),
            ("nobody@example.com", "password123"),
            ("", ""),
        ] {
            assert!(!session.login(email, password).await.unwrap());
            assert_eq!(session.current(), Session::anonymous());
            assert_eq!(store.get(SESSION_KEY).unwrap(), None);
        }

        assert!(session.login("test@user.com", "testpass").await.unwrap());
        let before = session.current();
        assert!(!session.login("test@user.com", "nope").await.unwrap());
        assert_eq!(session.current(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn login_waits_for_the_round_trip() {
        let session = testing::session();
        let started = tokio::time::Instant::now();

        session
            .login("demo@example.com", "password123")
            .await
            .unwrap();

        assert!(started.elapsed() >= testing::LATENCY.unsigned_abs());
    }

    #[tokio::test(start_paused = true)]
    async fn signup_accepts_duplicates() {
        let session = testing::session();

        // Signing up with a seeded address is not rejected.
        assert!(
            session
                .signup("Someone Else", "demo@example.com", "whatever")
                .await
                .unwrap()
        );
        let first = session.user().unwrap();
        assert_eq!(first.name, "Someone Else");

        assert!(
            session
                .signup("Someone Else", "demo@example.com", "whatever")
                .await
                .unwrap()
        );
        let second = session.user().unwrap();
        assert_eq!(second.email, "demo@example.com");
        assert_ne!(first.id, second.id);
    }

    #[tokio::test(start_paused = true)]
    async fn login_survives_reload() {
        let store: Arc<MemoryStore> = Arc::new(MemoryStore::default());
        let session = testing::session_with_store(store.clone());
        session
            .login("demo@example.com", "password123")
            .await
            .unwrap();

        let reloaded = testing::session_with_store(store);
        assert_eq!(reloaded.current(), Session::anonymous());
        assert_eq!(reloaded.restore(), session.current());
        assert_eq!(reloaded.user(), session.user());
    }

    #[tokio::test(start_paused = true)]
    async fn logout_survives_reload() {
        let store: Arc<MemoryStore> = Arc::new(MemoryStore::default());
        let session = testing::session_with_store(store.clone());
        session
            .signup("Ada", "ada@example.com", "secret1")
            .await
            .unwrap();

        session.logout();

        assert!(!session.is_authenticated());
        assert_eq!(store.get(SESSION_KEY).unwrap(), None);
        assert!(!testing::session_with_store(store).restore().is_authenticated());
    }

    #[test]
    fn restore_degrades_on_bad_snapshots() {
        for snapshot in [
            "not json",
            r#"{"user":null,"isAuthenticated":true}"#,
            r#"{"isAuthenticated":"yes"}"#,
        ] {
            let store = Arc::new(MemoryStore::default());
            store.set(SESSION_KEY, snapshot).unwrap();

            let session = testing::session_with_store(store.clone());
            assert_eq!(session.restore(), Session::anonymous());
            assert_eq!(store.get(SESSION_KEY).unwrap().as_deref(), Some(snapshot));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn subscribers_see_each_change() {
        let session = testing::session();
        let mut changes = session.subscribe();

        session
            .login("demo@example.com", "password123")
            .await
            .unwrap();
        assert!(changes.has_changed().unwrap());
        assert!(changes.borrow_and_update().is_authenticated());

        session.logout();
        assert!(changes.has_changed().unwrap());
        assert!(!changes.borrow_and_update().is_authenticated());
    }

    #[tokio::test]
    async fn network_failure_is_reported_without_state_change() {
        let store = Arc::new(MemoryStore::default());
        let session = SessionManager::new(
            CredentialStore::demo(),
            store.clone(),
            Arc::new(OfflineNetwork),
        );

        let result = session.login("demo@example.com", "password123").await;
        assert!(matches!(result, Err(SessionError::Network(_))));
        assert!(!session.is_authenticated());
        assert_eq!(store.get(SESSION_KEY).unwrap(), None);

        let result = session.signup("Ada", "ada@example.com", "secret1").await;
        assert!(matches!(result, Err(SessionError::Network(_))));
        assert!(!session.is_authenticated());
    }
}

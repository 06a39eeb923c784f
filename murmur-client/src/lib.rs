pub mod composer;
pub mod config;
pub mod credentials;
pub mod dialog;
pub mod feed;
pub mod forms;
pub mod guard;
pub mod session;

#[cfg(test)]
pub(crate) mod testing {
    use crate::{
        credentials::CredentialStore,
        session::{
            SessionManager,
            network::SimulatedNetwork,
            store::{KeyValueStore, MemoryStore},
        },
    };
    use murmur_common::util::PositiveDuration;
    use std::sync::Arc;
    use time::Duration;

    pub(crate) const LATENCY: Duration = Duration::SECOND;

    pub(crate) fn session_with_store(store: Arc<dyn KeyValueStore>) -> SessionManager {
        SessionManager::new(
            CredentialStore::demo(),
            store,
            Arc::new(SimulatedNetwork::new(PositiveDuration::new_unchecked(LATENCY))),
        )
    }

    pub(crate) fn session() -> SessionManager {
        session_with_store(Arc::new(MemoryStore::default()))
    }
}

use async_trait::async_trait;
use murmur_common::util::PositiveDuration;
use thiserror::Error;
use tracing::trace;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Error)]
#[error("Network request failed: {0}")]
pub struct NetworkError(pub String);

/// Stand-in for the transport behind login and signup.
#[async_trait]
pub trait Network: Send + Sync {
    async fn round_trip(&self) -> Result<(), NetworkError>;
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub struct SimulatedNetwork {
    latency: PositiveDuration,
}

impl SimulatedNetwork {
    #[must_use]
    pub fn new(latency: PositiveDuration) -> Self {
        Self { latency }
    }
}

#[async_trait]
impl Network for SimulatedNetwork {
    async fn round_trip(&self) -> Result<(), NetworkError> {
        trace!(latency = %self.latency.get(), "Simulating network round trip");
        tokio::time::sleep(self.latency.as_std()).await;
        Ok(())
    }
}

use crate::composer::{engine::ContainerId, runtime::EngineAssets};
use murmur_common::util::PositiveDuration;
use time::Duration;

pub const DEFAULT_PLACEHOLDER: &str = "How are you feeling today?";
pub const DEFAULT_CONTAINER: &str = "post-editor";

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct ClientConfig {
    /// Simulated round trip of login and signup.
    pub network_latency: PositiveDuration,
    /// Simulated processing time of a publish.
    pub publish_delay: PositiveDuration,
    pub engine_assets: EngineAssets,
    pub placeholder: String,
    pub container: ContainerId,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            network_latency: PositiveDuration::new_unchecked(Duration::SECOND),
            publish_delay: PositiveDuration::new_unchecked(Duration::SECOND),
            engine_assets: EngineAssets::default(),
            placeholder: DEFAULT_PLACEHOLDER.to_owned(),
            container: ContainerId::new(DEFAULT_CONTAINER),
        }
    }
}

use crate::composer::{engine::EngineRuntime, memory::MemoryRuntime};
use async_trait::async_trait;
use murmur_common::util::PositiveDuration;
use std::{
    fmt::{Debug, Formatter},
    sync::Arc,
};
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, info};

pub const QUILL_SCRIPT_URL: &str = "https://cdnjs.cloudflare.com/ajax/libs/quill/1.3.7/quill.min.js";
pub const QUILL_STYLESHEET_URL: &str =
    "https://cdnjs.cloudflare.com/ajax/libs/quill/1.3.7/quill.snow.min.css";

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct EngineAssets {
    pub script_url: String,
    pub stylesheet_url: String,
}

impl Default for EngineAssets {
    fn default() -> Self {
        Self {
            script_url: QUILL_SCRIPT_URL.to_owned(),
            stylesheet_url: QUILL_STYLESHEET_URL.to_owned(),
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Error)]
pub enum EngineLoadError {
    #[error("Editor script {url} failed to load: {reason}")]
    Script { url: String, reason: String },
    #[error("Editor stylesheet {url} failed to load: {reason}")]
    Stylesheet { url: String, reason: String },
}

/// Fetches an editor runtime from its assets.
#[async_trait]
pub trait EngineLoader: Send + Sync {
    async fn load(&self, assets: &EngineAssets) -> Result<Arc<dyn EngineRuntime>, EngineLoadError>;
}

/// The page-wide editor runtime, loaded at most once.
///
/// Every composer sharing a host awaits the same load; a failed load leaves the host empty so
/// a later mount may try again.
pub struct EngineHost {
    loader: Arc<dyn EngineLoader>,
    assets: EngineAssets,
    runtime: OnceCell<Arc<dyn EngineRuntime>>,
}

impl EngineHost {
    #[must_use]
    pub fn new(loader: Arc<dyn EngineLoader>, assets: EngineAssets) -> Self {
        Self {
            loader,
            assets,
            runtime: OnceCell::new(),
        }
    }

    pub async fn runtime(&self) -> Result<Arc<dyn EngineRuntime>, EngineLoadError> {
        self.runtime
            .get_or_try_init(|| async {
                info!(script = %self.assets.script_url, "Loading editor runtime");
                let runtime = self.loader.load(&self.assets).await?;
                debug!(stylesheet = %self.assets.stylesheet_url, "Editor runtime loaded");
                Ok(runtime)
            })
            .await
            .cloned()
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.runtime.initialized()
    }

    #[must_use]
    pub fn assets(&self) -> &EngineAssets {
        &self.assets
    }
}

impl Debug for EngineHost {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHost")
            .field("assets", &self.assets)
            .field("loaded", &self.is_loaded())
            .finish_non_exhaustive()
    }
}

/// Serves the in-memory editor that ships with the client.
#[derive(Clone, Debug)]
pub struct BundledLoader {
    runtime: Arc<MemoryRuntime>,
    delay: Option<PositiveDuration>,
}

impl BundledLoader {
    #[must_use]
    pub fn new(runtime: Arc<MemoryRuntime>) -> Self {
        Self {
            runtime,
            delay: None,
        }
    }

    /// Pretends the assets take `delay` to arrive.
    #[must_use]
    pub fn with_delay(mut self, delay: PositiveDuration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl EngineLoader for BundledLoader {
    async fn load(&self, assets: &EngineAssets) -> Result<Arc<dyn EngineRuntime>, EngineLoadError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay.as_std()).await;
        }
        debug!(script = %assets.script_url, "Serving bundled editor");

        Ok(Arc::clone(&self.runtime) as Arc<dyn EngineRuntime>)
    }
}

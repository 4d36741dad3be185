//! Process-wide entry point: one catalog load shared by many sessions.

use std::sync::Arc;

use crate::catalog::{CatalogLoader, CatalogSource, LoadedCatalog};
use crate::config::{ConfigError, EngineConfig};
use crate::events::{NoopObserver, SessionObserver};
use crate::selection::Strategies;
use crate::session::{Session, SessionError};

pub struct Engine {
    loader: Arc<CatalogLoader>,
    config: EngineConfig,
    observer: Arc<dyn SessionObserver>,
    strategies: Strategies,
}

impl Engine {
    pub fn new(source: Arc<dyn CatalogSource>, config: EngineConfig) -> Result<Self, ConfigError> {
        Self::from_loader(Arc::new(CatalogLoader::new(source)), config)
    }

    /// Build on an existing loader, e.g. one shared with another engine.
    pub fn from_loader(
        loader: Arc<CatalogLoader>,
        config: EngineConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            loader,
            config,
            observer: Arc::new(NoopObserver),
            strategies: Strategies::default(),
        })
    }

    /// Observer handed to every session this engine starts.
    pub fn with_observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_strategies(mut self, strategies: Strategies) -> Self {
        self.strategies = strategies;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn loader(&self) -> &Arc<CatalogLoader> {
        &self.loader
    }

    /// Wait for the catalog, triggering the load on first use.
    pub async fn catalog(&self) -> &LoadedCatalog {
        self.loader.get().await
    }

    /// Start a session once the catalog is ready.
    pub async fn start_session(&self) -> Session {
        let loaded = self.loader.get().await;
        self.session_for(loaded)
    }

    /// Begin loading the catalog in the background. Requires a tokio
    /// runtime; see [`CatalogLoader::preload`].
    pub fn preload(&self) -> bool {
        self.loader.preload()
    }

    /// Start a session without waiting. While the catalog is loading this
    /// fails with `CatalogNotReady`, and the first such call starts the
    /// load so that polling eventually succeeds.
    pub fn try_start_session(&self) -> Result<Session, SessionError> {
        match self.loader.try_get() {
            Some(loaded) => Ok(self.session_for(loaded)),
            None => {
                self.loader.preload();
                Err(SessionError::CatalogNotReady)
            }
        }
    }

    fn session_for(&self, loaded: &LoadedCatalog) -> Session {
        Session::assemble(
            Arc::clone(&loaded.catalog),
            Arc::clone(&loaded.stats),
            self.config.clone(),
        )
        .with_observer(Arc::clone(&self.observer))
        .with_strategies(self.strategies.clone())
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("loader", &self.loader)
            .field("config", &self.config)
            .finish()
    }
}

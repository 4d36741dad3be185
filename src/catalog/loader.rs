//! Single-flight catalog loading with fallback.
//!
//! The first caller of [`CatalogLoader::get`] starts the fetch; concurrent
//! callers await the same in-flight load. Any fetch failure, or a fetch
//! that yields no usable items, resolves to the built-in default catalog.
//! The result is final for the lifetime of the loader (no refresh).
//! [`CatalogLoader::preload`] starts the same load on a tokio task for
//! callers that only poll.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::OnceCell;

use crate::stats::ItemStats;

use super::defaults::default_catalog;
use super::parse::{parse_catalog, SkippedRow};
use super::{Catalog, CatalogError, CatalogSource};

/// Where the loaded catalog came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CatalogOrigin {
    Source { description: String },
    Fallback { reason: String },
}

/// A ready catalog plus the shared usage counters for its items.
#[derive(Debug, Clone)]
pub struct LoadedCatalog {
    pub catalog: Arc<Catalog>,
    pub stats: Arc<ItemStats>,
    pub origin: CatalogOrigin,
    pub skipped: Vec<SkippedRow>,
}

impl LoadedCatalog {
    fn new(catalog: Catalog, origin: CatalogOrigin, skipped: Vec<SkippedRow>) -> Self {
        let stats = Arc::new(ItemStats::for_catalog(&catalog));
        Self {
            catalog: Arc::new(catalog),
            stats,
            origin,
            skipped,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self.origin, CatalogOrigin::Fallback { .. })
    }
}

pub struct CatalogLoader {
    source: Arc<dyn CatalogSource>,
    cell: OnceCell<LoadedCatalog>,
    fetches: AtomicUsize,
    preloading: AtomicBool,
}

impl CatalogLoader {
    pub fn new(source: Arc<dyn CatalogSource>) -> Self {
        Self {
            source,
            cell: OnceCell::new(),
            fetches: AtomicUsize::new(0),
            preloading: AtomicBool::new(false),
        }
    }

    /// Wait for the catalog, starting the load if nobody has yet.
    pub async fn get(&self) -> &LoadedCatalog {
        self.cell.get_or_init(|| self.load()).await
    }

    /// Spawn the load on the current tokio runtime unless it already ran
    /// or is running. Returns whether a task was spawned.
    ///
    /// Outside a runtime nothing happens and the load waits for [`get`].
    ///
    /// [`get`]: CatalogLoader::get
    pub fn preload(self: &Arc<Self>) -> bool {
        if self.is_ready() {
            return false;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::debug!("no tokio runtime; catalog load deferred");
            return false;
        };
        if self.preloading.swap(true, Ordering::SeqCst) {
            return false;
        }
        let loader = Arc::clone(self);
        runtime.spawn(async move {
            loader.get().await;
        });
        true
    }

    /// The catalog if it has finished loading, without waiting.
    pub fn try_get(&self) -> Option<&LoadedCatalog> {
        self.cell.get()
    }

    pub fn is_ready(&self) -> bool {
        self.cell.initialized()
    }

    /// Number of fetches issued against the source.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    async fn load(&self) -> LoadedCatalog {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let description = self.source.describe();

        match self.fetch_and_parse().await {
            Ok((catalog, skipped)) => {
                tracing::info!(
                    source = %description,
                    items = catalog.len(),
                    skipped = skipped.len(),
                    "catalog loaded"
                );
                LoadedCatalog::new(catalog, CatalogOrigin::Source { description }, skipped)
            }
            Err(err) => {
                tracing::warn!(
                    source = %description,
                    error = %err,
                    "catalog load failed; using built-in default catalog"
                );
                LoadedCatalog::new(
                    default_catalog(),
                    CatalogOrigin::Fallback {
                        reason: err.to_string(),
                    },
                    Vec::new(),
                )
            }
        }
    }

    async fn fetch_and_parse(&self) -> Result<(Catalog, Vec<SkippedRow>), CatalogError> {
        let text = self.source.fetch().await?;
        let report = parse_catalog(&text);
        if report.items.is_empty() {
            return Err(CatalogError::Empty);
        }
        Ok((Catalog::new(report.items), report.skipped))
    }
}

impl std::fmt::Debug for CatalogLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogLoader")
            .field("source", &self.source.describe())
            .field("ready", &self.is_ready())
            .finish()
    }
}

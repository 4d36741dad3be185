use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::tempdir;
use trigram_harness::catalog::defaults::default_catalog;
use trigram_harness::catalog::render_catalog;
use trigram_harness::{
    Axis, CatalogError, CatalogLoader, CatalogOrigin, CatalogSource, Engine, EngineConfig,
    FileCatalogSource, HttpCatalogSource, SessionError, StaticCatalogSource,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Two intrinsic items from the default catalog, rendered as text.
fn small_catalog_text() -> String {
    let items: Vec<_> = default_catalog()
        .items()
        .iter()
        .filter(|i| i.axis == Axis::Intrinsic)
        .take(2)
        .cloned()
        .collect();
    render_catalog(&items)
}

struct SlowCountingSource {
    text: String,
    calls: AtomicUsize,
}

#[async_trait]
impl CatalogSource for SlowCountingSource {
    async fn fetch(&self) -> Result<String, CatalogError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok(self.text.clone())
    }

    fn describe(&self) -> String {
        "slow".to_string()
    }
}

struct FailingSource;

#[async_trait]
impl CatalogSource for FailingSource {
    async fn fetch(&self) -> Result<String, CatalogError> {
        Err(CatalogError::Status(503))
    }

    fn describe(&self) -> String {
        "failing".to_string()
    }
}

#[tokio::test]
async fn static_source_loads_and_reports_skipped_rows() {
    let text = format!(
        "{}broken,intrinsic,too few fields\n",
        small_catalog_text()
    );
    let loader = CatalogLoader::new(Arc::new(StaticCatalogSource::new(text)));

    let loaded = loader.get().await;
    assert!(!loaded.is_fallback());
    assert_eq!(loaded.catalog.len(), 2);
    assert_eq!(loaded.skipped.len(), 1);
    assert!(loaded.skipped[0].reason.contains("expected 48 fields"));
    assert!(matches!(loaded.origin, CatalogOrigin::Source { .. }));
}

#[tokio::test]
async fn failed_or_empty_load_falls_back_to_default_catalog() {
    let loader = CatalogLoader::new(Arc::new(FailingSource));
    let loaded = loader.get().await;
    assert!(loaded.is_fallback());
    assert_eq!(loaded.catalog.len(), 16);
    match &loaded.origin {
        CatalogOrigin::Fallback { reason } => assert!(reason.contains("503")),
        other => panic!("unexpected origin {other:?}"),
    }

    let loader = CatalogLoader::new(Arc::new(StaticCatalogSource::new("# nothing here\n")));
    let loaded = loader.get().await;
    assert!(loaded.is_fallback());
    assert_eq!(loaded.catalog.axis_len(Axis::External), 8);
}

#[tokio::test]
async fn concurrent_callers_share_one_fetch() {
    let source = Arc::new(SlowCountingSource {
        text: small_catalog_text(),
        calls: AtomicUsize::new(0),
    });
    let loader = Arc::new(CatalogLoader::new(source.clone()));
    assert!(loader.try_get().is_none());

    let waiters = (0..8).map(|_| {
        let loader = Arc::clone(&loader);
        tokio::spawn(async move { loader.get().await.catalog.len() })
    });
    let lens = futures::future::join_all(waiters).await;

    for len in lens {
        assert_eq!(len.unwrap(), 2);
    }
    assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    assert_eq!(loader.fetch_count(), 1);
    assert!(loader.is_ready());
}

#[tokio::test]
async fn engine_reports_not_ready_until_catalog_loads() {
    let source = Arc::new(SlowCountingSource {
        text: small_catalog_text(),
        calls: AtomicUsize::new(0),
    });
    let engine = Engine::new(source, EngineConfig::default()).unwrap();

    assert!(matches!(
        engine.try_start_session(),
        Err(SessionError::CatalogNotReady)
    ));

    let session = engine.start_session().await;
    assert!(!session.is_complete());
    assert!(engine.try_start_session().is_ok());
    assert_eq!(engine.loader().fetch_count(), 1);
}

#[tokio::test]
async fn polling_try_start_session_eventually_succeeds() {
    let engine = Engine::new(Arc::new(StaticCatalogSource::new("")), EngineConfig::default())
        .unwrap();

    let mut session = None;
    for _ in 0..50 {
        match engine.try_start_session() {
            Ok(started) => {
                session = Some(started);
                break;
            }
            Err(SessionError::CatalogNotReady) => {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            Err(other) => panic!("unexpected error {other:?}"),
        }
    }

    let session = session.expect("catalog never became ready");
    assert!(!session.is_complete());
    assert_eq!(engine.loader().fetch_count(), 1);
    assert!(engine.catalog().await.is_fallback());
}

#[tokio::test]
async fn preload_starts_one_background_fetch() {
    let source = Arc::new(SlowCountingSource {
        text: small_catalog_text(),
        calls: AtomicUsize::new(0),
    });
    let loader = Arc::new(CatalogLoader::new(source.clone()));

    assert!(loader.preload());
    assert!(!loader.preload());
    assert_eq!(loader.get().await.catalog.len(), 2);
    assert!(!loader.preload());
    assert_eq!(source.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn preload_without_runtime_defers_to_get() {
    let loader = Arc::new(CatalogLoader::new(Arc::new(StaticCatalogSource::new(""))));
    assert!(!loader.preload());
    assert!(!loader.is_ready());
    assert_eq!(loader.fetch_count(), 0);
}

#[tokio::test]
async fn file_source_reads_catalog_and_missing_file_falls_back() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("items.csv");
    std::fs::write(&file, small_catalog_text()).unwrap();

    let loader = CatalogLoader::new(Arc::new(FileCatalogSource::new(&file)));
    let loaded = loader.get().await;
    assert!(!loaded.is_fallback());
    assert_eq!(loaded.catalog.len(), 2);

    let loader = CatalogLoader::new(Arc::new(FileCatalogSource::new(
        dir.path().join("missing.csv"),
    )));
    assert!(loader.get().await.is_fallback());
}

#[tokio::test]
async fn http_source_fetches_catalog() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/items.csv"))
        .respond_with(ResponseTemplate::new(200).set_body_string(small_catalog_text()))
        .expect(1)
        .mount(&server)
        .await;

    let source = HttpCatalogSource::new(format!("{}/items.csv", server.uri())).unwrap();
    let loader = CatalogLoader::new(Arc::new(source));
    let loaded = loader.get().await;
    assert!(!loaded.is_fallback());
    assert_eq!(loaded.catalog.len(), 2);
    // Second access is served from the cell.
    assert_eq!(loader.get().await.catalog.len(), 2);
}

#[tokio::test]
async fn http_error_status_falls_back() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/items.csv"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let source = HttpCatalogSource::with_timeout(
        format!("{}/items.csv", server.uri()),
        Duration::from_secs(2),
    )
    .unwrap();
    let loader = CatalogLoader::new(Arc::new(source));
    let loaded = loader.get().await;
    assert!(loaded.is_fallback());
    match &loaded.origin {
        CatalogOrigin::Fallback { reason } => assert!(reason.contains("500")),
        other => panic!("unexpected origin {other:?}"),
    }
}

use std::collections::HashSet;
use std::sync::Arc;

use trigram_harness::{
    Engine, EngineConfig, NextItem, OptionKey, OptionWeighting, RecordingObserver,
    StaticCatalogSource,
};

async fn fallback_engine(config: EngineConfig) -> Engine {
    // An empty source resolves to the built-in catalog.
    let engine = Engine::new(Arc::new(StaticCatalogSource::new("")), config).unwrap();
    assert!(engine.catalog().await.is_fallback());
    engine
}

#[tokio::test]
async fn sessions_are_independent_but_share_usage_counts() {
    let engine = fallback_engine(EngineConfig::default()).await;
    let mut first = engine.start_session().await;
    let mut second = engine.start_session().await;
    assert_ne!(first.id(), second.id());

    let a = first.next_item().into_item().unwrap();
    let b = second.next_item().into_item().unwrap();
    // Same state, same choice.
    assert_eq!(a.item_id, b.item_id);

    first.record_answer(&a.item_id, OptionKey::A).unwrap();
    assert!(second.answers().is_empty());
    assert_ne!(
        first.distribution(trigram_harness::Axis::Intrinsic),
        second.distribution(trigram_harness::Axis::Intrinsic)
    );

    let stats = &engine.catalog().await.stats;
    assert_eq!(stats.usage_count(&a.item_id), 2);
    assert_eq!(stats.pick_counts(&a.item_id), Some([1, 0, 0, 0]));
}

#[tokio::test]
async fn historical_weighting_runs_many_sessions() {
    let config = EngineConfig {
        option_weighting: OptionWeighting::Historical,
        ..EngineConfig::default()
    };
    let observer = Arc::new(RecordingObserver::new());
    let engine = fallback_engine(config).await.with_observer(observer.clone());

    let mut ids = HashSet::new();
    for round in 0..5 {
        let mut session = engine.start_session().await;
        ids.insert(session.id());
        while let NextItem::Item(view) = session.next_item() {
            let key = OptionKey::ALL[round % 4];
            session.record_answer(&view.item_id, key).unwrap();
        }
        assert!(session.result().is_ok());
    }
    assert_eq!(ids.len(), 5);

    let completed = observer
        .events()
        .iter()
        .filter(|e| e.kind() == "axis_completed")
        .count();
    assert_eq!(completed, 10);
}

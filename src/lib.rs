#![forbid(unsafe_code)]

//! # trigram-harness
//!
//! Adaptive two-axis personality classification.
//!
//! A session asks multiple-choice questions and keeps one belief
//! distribution per axis over the eight trigrams. Each answer tempers the
//! belief with the chosen option's impact coefficients. Items are chosen to
//! maximise expected information, first broadly (exploration), then to
//! separate the leading archetypes (discrimination), then to test the
//! leader (confirmation). An axis stops asking once its belief is stable
//! and concentrated, or its question budget or item pool runs out.
//!
//! ```no_run
//! use std::sync::Arc;
//! use trigram_harness::{Engine, EngineConfig, FileCatalogSource, NextItem, OptionKey};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = Engine::new(
//!     Arc::new(FileCatalogSource::new("items.csv")),
//!     EngineConfig::default(),
//! )?;
//! let mut session = engine.start_session().await;
//! while let NextItem::Item(item) = session.next_item() {
//!     session.record_answer(&item.item_id, OptionKey::A)?;
//! }
//! let result = session.result()?;
//! println!("{} / {}", result.intrinsic.archetype, result.external.archetype);
//! # Ok(())
//! # }
//! ```

pub mod archetype;
pub mod belief;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod events;
pub mod information;
pub mod selection;
pub mod session;
pub mod stage;
pub mod stats;

pub use archetype::{Archetype, Axis, Stage, ARCHETYPE_COUNT};
pub use belief::{BeliefDistribution, BeliefState, CollapseReason, UpdateOutcome};
pub use catalog::{
    Catalog, CatalogError, CatalogLoader, CatalogOrigin, CatalogSource, FileCatalogSource,
    HttpCatalogSource, Item, ItemOption, LoadedCatalog, LocalizedText, OptionKey,
    StaticCatalogSource,
};
pub use config::{
    AxisSchedule, ConfigError, EngineConfig, OptionWeighting, StageConfig, StageThresholds,
    UpdateConfig,
};
pub use engine::Engine;
pub use events::{
    EventError, EventWorker, JsonlEventSink, NoopObserver, RecordingObserver, SessionEvent,
    SessionObserver, SinkSummary, TracingObserver,
};
pub use information::Evaluator;
pub use session::{
    AnswerReceipt, AnswerRecord, AxisResult, ItemView, NextItem, OptionView, Session,
    SessionError, SessionResult,
};
pub use stage::{CompletionReason, StageController, StageMetrics, StageTransition, TransitionCause};
pub use stats::ItemStats;

//! Structured session events and the sinks that consume them.
//!
//! The engine performs no I/O of its own. It reports what it does through
//! a [`SessionObserver`]; callers decide whether that goes nowhere, to
//! `tracing`, to an in-memory log, or to a JSONL audit file.

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{mpsc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::archetype::{Archetype, Axis, Stage, ARCHETYPE_COUNT};
use crate::belief::CollapseReason;
use crate::catalog::OptionKey;
use crate::stage::{CompletionReason, TransitionCause};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    ItemSelected {
        session_id: Uuid,
        at: DateTime<Utc>,
        axis: Axis,
        stage: Stage,
        item_id: String,
        score: f64,
        information_gain: f64,
    },
    DistributionUpdated {
        session_id: Uuid,
        at: DateTime<Utc>,
        axis: Axis,
        item_id: String,
        option: OptionKey,
        weight: f64,
        probabilities: [f64; ARCHETYPE_COUNT],
        confidence: f64,
        convergence: f64,
    },
    /// The update collapsed and the axis was reset to uniform.
    DegenerateReset {
        session_id: Uuid,
        at: DateTime<Utc>,
        axis: Axis,
        item_id: String,
        reason: CollapseReason,
    },
    StageTransitioned {
        session_id: Uuid,
        at: DateTime<Utc>,
        axis: Axis,
        from: Stage,
        to: Stage,
        cause: TransitionCause,
        questions_in_stage: usize,
    },
    AxisCompleted {
        session_id: Uuid,
        at: DateTime<Utc>,
        axis: Axis,
        archetype: Archetype,
        probability: f64,
        reason: CompletionReason,
        total_questions: usize,
    },
}

impl SessionEvent {
    pub fn session_id(&self) -> Uuid {
        match self {
            SessionEvent::ItemSelected { session_id, .. }
            | SessionEvent::DistributionUpdated { session_id, .. }
            | SessionEvent::DegenerateReset { session_id, .. }
            | SessionEvent::StageTransitioned { session_id, .. }
            | SessionEvent::AxisCompleted { session_id, .. } => *session_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SessionEvent::ItemSelected { .. } => "item_selected",
            SessionEvent::DistributionUpdated { .. } => "distribution_updated",
            SessionEvent::DegenerateReset { .. } => "degenerate_reset",
            SessionEvent::StageTransitioned { .. } => "stage_transitioned",
            SessionEvent::AxisCompleted { .. } => "axis_completed",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(String),
    #[error("event channel closed")]
    Closed,
    #[error("event worker failed: {0}")]
    Join(String),
}

/// Receives session events. Errors are logged by the session and never
/// interrupt it.
pub trait SessionObserver: Send + Sync {
    fn on_event(&self, event: &SessionEvent) -> Result<(), EventError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl SessionObserver for NoopObserver {
    fn on_event(&self, _event: &SessionEvent) -> Result<(), EventError> {
        Ok(())
    }
}

/// Forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl SessionObserver for TracingObserver {
    fn on_event(&self, event: &SessionEvent) -> Result<(), EventError> {
        match event {
            SessionEvent::ItemSelected {
                session_id,
                axis,
                stage,
                item_id,
                score,
                information_gain,
                ..
            } => tracing::debug!(
                %session_id,
                %axis,
                %stage,
                item_id = %item_id,
                score,
                information_gain,
                "item selected"
            ),
            SessionEvent::DistributionUpdated {
                session_id,
                axis,
                item_id,
                option,
                weight,
                confidence,
                convergence,
                ..
            } => tracing::debug!(
                %session_id,
                %axis,
                item_id = %item_id,
                %option,
                weight,
                confidence,
                convergence,
                "distribution updated"
            ),
            SessionEvent::DegenerateReset {
                session_id,
                axis,
                item_id,
                reason,
                ..
            } => tracing::warn!(
                %session_id,
                %axis,
                item_id = %item_id,
                reason = ?reason,
                "degenerate update; axis reset to uniform"
            ),
            SessionEvent::StageTransitioned {
                session_id,
                axis,
                from,
                to,
                cause,
                questions_in_stage,
                ..
            } => tracing::info!(
                %session_id,
                %axis,
                %from,
                %to,
                cause = ?cause,
                questions_in_stage,
                "stage transition"
            ),
            SessionEvent::AxisCompleted {
                session_id,
                axis,
                archetype,
                probability,
                reason,
                total_questions,
                ..
            } => tracing::info!(
                %session_id,
                %axis,
                %archetype,
                probability,
                reason = ?reason,
                total_questions,
                "axis completed"
            ),
        }
        Ok(())
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<SessionEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SessionEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl SessionObserver for RecordingObserver {
    fn on_event(&self, event: &SessionEvent) -> Result<(), EventError> {
        let mut events = match self.events.lock() {
            Ok(events) => events,
            Err(poisoned) => poisoned.into_inner(),
        };
        events.push(event.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------
//  JSONL audit sink
// ---------------------------------------------------------------------

/// Audit log of session events, one JSON object per line.
///
/// Events are encoded on the caller's thread, so a serialization failure
/// is reported to the session that emitted it; the background thread only
/// writes bytes. The buffer is flushed whenever an axis completes and when
/// the last clone of the sink is dropped.
#[derive(Clone)]
pub struct JsonlEventSink {
    lines: mpsc::Sender<EncodedEvent>,
}

struct EncodedEvent {
    session_id: Uuid,
    checkpoint: bool,
    line: String,
}

/// What the writer saw before its channel closed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkSummary {
    pub lines: usize,
    pub sessions: usize,
}

pub struct EventWorker {
    writer: Option<std::thread::JoinHandle<Result<SinkSummary, EventError>>>,
}

impl EventWorker {
    /// Wait for every queued line to hit the file.
    pub fn join(mut self) -> Result<SinkSummary, EventError> {
        let Some(writer) = self.writer.take() else {
            return Ok(SinkSummary::default());
        };
        writer
            .join()
            .map_err(|_| EventError::Join("jsonl writer panicked".to_string()))?
    }
}

impl JsonlEventSink {
    /// Start a fresh log at `path`, truncating any previous content.
    pub fn create(path: impl AsRef<Path>) -> Result<(Self, EventWorker), EventError> {
        Self::spawn(File::create(path)?)
    }

    /// Keep an existing log and add to its end.
    pub fn append(path: impl AsRef<Path>) -> Result<(Self, EventWorker), EventError> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Self::spawn(file)
    }

    fn spawn(file: File) -> Result<(Self, EventWorker), EventError> {
        let (lines, queue) = mpsc::channel();
        let writer = std::thread::Builder::new()
            .name("session-events".to_string())
            .spawn(move || drain_events(file, queue))?;
        Ok((
            Self { lines },
            EventWorker {
                writer: Some(writer),
            },
        ))
    }
}

impl SessionObserver for JsonlEventSink {
    fn on_event(&self, event: &SessionEvent) -> Result<(), EventError> {
        let line = serde_json::to_string(event).map_err(|e| EventError::Serde(e.to_string()))?;
        let encoded = EncodedEvent {
            session_id: event.session_id(),
            checkpoint: matches!(event, SessionEvent::AxisCompleted { .. }),
            line,
        };
        self.lines.send(encoded).map_err(|_| EventError::Closed)
    }
}

fn drain_events(
    file: File,
    queue: mpsc::Receiver<EncodedEvent>,
) -> Result<SinkSummary, EventError> {
    let mut out = BufWriter::new(file);
    let mut sessions = HashSet::new();
    let mut lines = 0usize;
    for event in queue {
        out.write_all(event.line.as_bytes())?;
        out.write_all(b"\n")?;
        lines += 1;
        sessions.insert(event.session_id);
        if event.checkpoint {
            out.flush()?;
        }
    }
    out.flush()?;
    Ok(SinkSummary {
        lines,
        sessions: sessions.len(),
    })
}

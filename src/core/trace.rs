//! Trace sinks for job timelines.
//!
//! Pools emit an `Instant` event when a job is submitted and a `Begin`/`End`
//! pair around each job body. Events use the Chrome trace-event phases, so a
//! captured timeline loads directly into `chrome://tracing` or Perfetto.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::util::telemetry::current_thread_label;

/// Trace-event phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TracePhase {
    /// Start of a duration on the recording thread.
    #[serde(rename = "B")]
    Begin,
    /// End of the duration opened by the matching `Begin`.
    #[serde(rename = "E")]
    End,
    /// Point-in-time marker.
    #[serde(rename = "i")]
    Instant,
}

/// One recorded event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEvent {
    /// Event name; `Begin`/`End` pairs share it.
    pub name: String,
    /// Event category.
    #[serde(rename = "cat")]
    pub category: String,
    /// Phase.
    #[serde(rename = "ph")]
    pub phase: TracePhase,
    /// Microseconds since the Unix epoch.
    #[serde(rename = "ts")]
    pub timestamp_us: u64,
    /// Label of the recording thread.
    #[serde(rename = "tid")]
    pub thread: String,
}

/// Destination for trace events.
///
/// Recording cannot fail from the caller's point of view: a sink that loses
/// events must do so silently, never by disturbing the job being traced.
pub trait TraceSink: Send + Sync {
    /// Record an event.
    fn record(&self, event: TraceEvent);
}

/// Build an event stamped with the current time and thread.
pub fn build_trace_event(
    name: impl Into<String>,
    category: impl Into<String>,
    phase: TracePhase,
) -> TraceEvent {
    TraceEvent {
        name: name.into(),
        category: category.into(),
        phase,
        timestamp_us: now_us(),
        thread: current_thread_label(),
    }
}

fn now_us() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_micros()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// Bounded in-memory sink. Clones share the same buffer, so a test can keep
/// one clone while a pool records into another.
#[derive(Debug, Clone)]
pub struct InMemoryTraceSink {
    events: Arc<Mutex<VecDeque<TraceEvent>>>,
    max_events: usize,
}

impl InMemoryTraceSink {
    /// Create a sink that keeps the most recent `max_events` events.
    #[must_use]
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Arc::new(Mutex::new(VecDeque::with_capacity(max_events.min(4096)))),
            max_events,
        }
    }

    /// Snapshot of the stored events, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<TraceEvent> {
        self.events.lock().iter().cloned().collect()
    }

    /// Number of stored events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// `true` when nothing has been recorded (or everything was evicted).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Render the buffer in Chrome trace-event JSON format.
    ///
    /// # Errors
    ///
    /// Returns the serializer error if an event cannot be encoded.
    pub fn to_chrome_json(&self) -> serde_json::Result<String> {
        #[derive(Serialize)]
        struct ChromeTrace<'a> {
            #[serde(rename = "traceEvents")]
            trace_events: Vec<ChromeEvent<'a>>,
        }

        #[derive(Serialize)]
        struct ChromeEvent<'a> {
            #[serde(flatten)]
            event: &'a TraceEvent,
            pid: u32,
        }

        let events = self.events.lock();
        let trace = ChromeTrace {
            trace_events: events.iter().map(|event| ChromeEvent { event, pid: 0 }).collect(),
        };
        serde_json::to_string(&trace)
    }
}

impl TraceSink for InMemoryTraceSink {
    fn record(&self, event: TraceEvent) {
        if self.max_events == 0 {
            return;
        }
        let mut events = self.events.lock();
        if events.len() >= self.max_events {
            events.pop_front();
        }
        events.push_back(event);
    }
}

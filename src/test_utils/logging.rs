//! In-memory log capture for asserting on engine events in tests.

use std::collections::VecDeque;
use std::fmt::Write as _;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::Level;
use tracing::field::{Field, Visit};
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::Context;
use tracing_subscriber::prelude::*;

const MAX_ENTRIES: usize = 1000;

/// A captured event.
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub level: Level,
    pub target: String,
    pub message: String,
    pub fields: Vec<(String, String)>,
}

impl LogEntry {
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Default)]
struct LogStorage {
    entries: VecDeque<LogEntry>,
}

impl LogStorage {
    fn push(&mut self, entry: LogEntry) {
        if self.entries.len() >= MAX_ENTRIES {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }
}

struct EventVisitor<'a> {
    message: &'a mut String,
    fields: &'a mut Vec<(String, String)>,
}

impl EventVisitor<'_> {
    fn store(&mut self, field: &Field, value: String) {
        if field.name() == "message" {
            *self.message = value;
        } else {
            self.fields.push((field.name().to_string(), value));
        }
    }
}

impl Visit for EventVisitor<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.store(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.store(field, format!("{value:?}"));
    }
}

/// Layer that appends every event to a shared buffer.
struct CaptureLayer {
    storage: Arc<Mutex<LogStorage>>,
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for CaptureLayer {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let mut message = String::new();
        let mut fields = Vec::new();
        event.record(&mut EventVisitor {
            message: &mut message,
            fields: &mut fields,
        });
        self.storage.lock().push(LogEntry {
            level: *metadata.level(),
            target: metadata.target().to_string(),
            message,
            fields,
        });
    }
}

/// Active capture. Events are recorded on the current thread until dropped.
pub struct LogCapture {
    storage: Arc<Mutex<LogStorage>>,
    _guard: DefaultGuard,
}

/// Start capturing events at `directive` (an `EnvFilter` string such as
/// `"debug"` or `"dynidx=info"`) on the current thread.
#[must_use]
pub fn capture_logs(directive: &str) -> LogCapture {
    let storage = Arc::new(Mutex::new(LogStorage::default()));
    let subscriber = tracing_subscriber::registry()
        .with(EnvFilter::new(directive))
        .with(CaptureLayer {
            storage: Arc::clone(&storage),
        });
    LogCapture {
        storage,
        _guard: tracing::subscriber::set_default(subscriber),
    }
}

impl LogCapture {
    #[must_use]
    pub fn entries(&self) -> Vec<LogEntry> {
        self.storage.lock().entries.iter().cloned().collect()
    }

    #[must_use]
    pub fn contains(&self, message: &str) -> bool {
        self.storage
            .lock()
            .entries
            .iter()
            .any(|entry| entry.message.contains(message))
    }

    #[must_use]
    pub fn find(&self, level: Level, message: &str) -> Option<LogEntry> {
        self.storage
            .lock()
            .entries
            .iter()
            .find(|entry| entry.level == level && entry.message.contains(message))
            .cloned()
    }

    #[must_use]
    pub fn count_at(&self, level: Level) -> usize {
        self.storage
            .lock()
            .entries
            .iter()
            .filter(|entry| entry.level == level)
            .count()
    }

    pub fn clear(&self) {
        self.storage.lock().entries.clear();
    }

    /// Readable dump for assertion messages.
    #[must_use]
    pub fn format_for_display(&self) -> String {
        let storage = self.storage.lock();
        if storage.entries.is_empty() {
            return String::from("no logs captured");
        }
        let mut output = format!("captured {} log entries:\n", storage.entries.len());
        for entry in &storage.entries {
            let _ = writeln!(output, "[{}] {}: {}", entry.level, entry.target, entry.message);
            for (key, value) in &entry.fields {
                let _ = writeln!(output, "    {key} = {value}");
            }
        }
        output
    }
}

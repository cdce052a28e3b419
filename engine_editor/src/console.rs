//! Console - in-editor log of tracing events
//!
//! [`ConsoleLayer`] is installed on the tracing subscriber and copies every
//! event into a bounded [`ConsoleLog`] that the console panel displays.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use egui::{Color32, RichText, ScrollArea, Ui};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

/// Default number of entries the console keeps
pub const DEFAULT_CONSOLE_CAPACITY: usize = 500;

/// One captured event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleEntry {
    pub level: Level,
    pub target: String,
    pub message: String,
}

impl ConsoleEntry {
    fn color(&self) -> Color32 {
        match self.level {
            Level::ERROR => Color32::from_rgb(232, 96, 88),
            Level::WARN => Color32::from_rgb(226, 186, 82),
            Level::INFO => Color32::from_gray(210),
            _ => Color32::from_gray(140),
        }
    }
}

/// Bounded, shareable event buffer; the oldest entries are dropped first
#[derive(Debug, Clone)]
pub struct ConsoleLog {
    entries: Arc<Mutex<VecDeque<ConsoleEntry>>>,
    capacity: usize,
}

impl Default for ConsoleLog {
    fn default() -> Self {
        Self::new(DEFAULT_CONSOLE_CAPACITY)
    }
}

impl ConsoleLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<ConsoleEntry>> {
        // A panic while holding the lock cannot leave the deque half-updated
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn push(&self, entry: ConsoleEntry) {
        let mut entries = self.lock();
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Snapshot of the current entries, oldest first
    pub fn entries(&self) -> Vec<ConsoleEntry> {
        self.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Subscriber layer feeding this log
    pub fn layer(&self) -> ConsoleLayer {
        ConsoleLayer { log: self.clone() }
    }

    /// Console panel contents
    pub fn show(&self, ui: &mut Ui) {
        ui.horizontal(|ui| {
            ui.label(RichText::new("Console").strong());
            if ui.small_button("Clear").clicked() {
                self.clear();
            }
        });
        ui.separator();
        ScrollArea::vertical()
            .stick_to_bottom(true)
            .auto_shrink([false, false])
            .show(ui, |ui| {
                for entry in self.entries() {
                    ui.label(
                        RichText::new(format!("[{}] {}", entry.level, entry.message))
                            .monospace()
                            .color(entry.color()),
                    );
                }
            });
    }
}

/// Tracing layer that records events into a [`ConsoleLog`]
pub struct ConsoleLayer {
    log: ConsoleLog,
}

impl<S: Subscriber> Layer<S> for ConsoleLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        self.log.push(ConsoleEntry {
            level: *event.metadata().level(),
            target: event.metadata().target().to_string(),
            message: visitor.finish(),
        });
    }
}

/// Collects the `message` field followed by `key=value` pairs
#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: Vec<String>,
}

impl MessageVisitor {
    fn finish(self) -> String {
        if self.fields.is_empty() {
            self.message
        } else {
            format!("{} {}", self.message, self.fields.join(" "))
        }
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push(format!("{}={}", field.name(), value));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.fields.push(format!("{}={:?}", field.name(), value));
        }
    }
}

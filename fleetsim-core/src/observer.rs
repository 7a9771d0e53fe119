//! Observers of simulation events.
//!
//! Observers see the events each tick produced, wrapped in an `Arc` so
//! every observer shares one copy. They cannot reach back into the
//! simulation, so registering one never changes the outcome of a run.
//!
//! ```ignore
//! let mut registry = ObserverRegistry::new();
//! registry.register(Box::new(EventLogObserver::file("events.jsonl")?));
//!
//! // After each tick:
//! registry.notify(&TickEvents::new(tick, now, sink.drain()));
//! ```

use crate::events::GameEvent;
use crate::state::SimHours;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Events produced by one tick.
#[derive(Debug, Clone)]
pub struct TickEvents {
    /// Monotonic tick counter.
    pub tick: u64,
    pub at: SimHours,
    pub events: Arc<[GameEvent]>,
}

impl TickEvents {
    pub fn new(tick: u64, at: SimHours, events: Vec<GameEvent>) -> Self {
        Self {
            tick,
            at,
            events: events.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ObserverError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Clone, Debug)]
pub struct ObserverConfig {
    /// Notify every N ticks (1 = every tick).
    pub frequency: u32,
    /// Skip ticks that produced no events.
    pub skip_empty: bool,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            frequency: 1,
            skip_empty: true,
        }
    }
}

/// Errors returned from `on_events` are logged and never stop the simulation.
pub trait SimObserver: Send + Sync {
    fn on_events(&self, batch: &TickEvents) -> Result<(), ObserverError>;

    fn name(&self) -> &str;

    fn config(&self) -> ObserverConfig {
        ObserverConfig::default()
    }

    /// Called when the registry is dropped.
    fn on_shutdown(&self) {}
}

pub struct ObserverRegistry {
    observers: Vec<Box<dyn SimObserver>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self { observers: vec![] }
    }

    pub fn register(&mut self, observer: Box<dyn SimObserver>) {
        log::info!("Registered observer: {}", observer.name());
        self.observers.push(observer);
    }

    pub fn notify(&self, batch: &TickEvents) {
        for observer in &self.observers {
            let config = observer.config();
            if config.skip_empty && batch.events.is_empty() {
                continue;
            }
            if !batch.tick.is_multiple_of(config.frequency.max(1) as u64) {
                continue;
            }
            if let Err(e) = observer.on_events(batch) {
                log::warn!("Observer '{}' error: {}", observer.name(), e);
            }
        }
    }

    pub fn shutdown(&self) {
        for observer in &self.observers {
            observer.on_shutdown();
        }
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl Default for ObserverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ObserverRegistry {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Writes every event as one JSON line.
///
/// ```ignore
/// let observer = EventLogObserver::stdout();
/// let observer = EventLogObserver::file("events.jsonl")?;
/// let observer = EventLogObserver::new(Box::new(socket)).only(&["bankruptcy"]);
/// ```
pub struct EventLogObserver {
    writer: Mutex<Box<dyn Write + Send>>,
    /// Event kinds to keep. Empty keeps everything.
    kinds: Vec<&'static str>,
}

impl EventLogObserver {
    pub fn stdout() -> Self {
        Self::new(Box::new(BufWriter::new(std::io::stdout())))
    }

    pub fn file(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = std::fs::File::create(path)?;
        Ok(Self::new(Box::new(BufWriter::new(file))))
    }

    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(writer),
            kinds: Vec::new(),
        }
    }

    /// Keep only the named event kinds (the serialized `type` tags).
    pub fn only(mut self, kinds: &[&'static str]) -> Self {
        self.kinds = kinds.to_vec();
        self
    }

    fn wants(&self, event: &GameEvent) -> bool {
        self.kinds.is_empty() || self.kinds.contains(&event.kind())
    }
}

impl SimObserver for EventLogObserver {
    fn on_events(&self, batch: &TickEvents) -> Result<(), ObserverError> {
        let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        for event in batch.events.iter().filter(|e| self.wants(e)) {
            serde_json::to_writer(&mut *writer, event)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        "EventLogObserver"
    }

    fn on_shutdown(&self) {
        let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        if let Err(e) = writer.flush() {
            log::warn!("Failed to flush event log: {}", e);
        }
    }
}

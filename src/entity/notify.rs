use crate::core::Value;
use std::sync::Mutex;

/// One observed attribute change, emitted after a successful save.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub entity_type: String,
    pub attribute: String,
    pub value: Value,
}

/// Downstream consumer of change events. Delivery is best-effort.
pub trait ChangeNotifier: Send + Sync {
    fn emit(&self, event: &ChangeEvent);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl ChangeNotifier for NoopNotifier {
    fn emit(&self, _event: &ChangeEvent) {}
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<ChangeEvent>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ChangeEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

impl ChangeNotifier for RecordingNotifier {
    fn emit(&self, event: &ChangeEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event.clone()),
            Err(_) => log::warn!("dropping change event for {}.{}", event.entity_type, event.attribute),
        }
    }
}

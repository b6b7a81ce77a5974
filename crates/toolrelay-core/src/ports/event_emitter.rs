//! Event emitter trait for broadcasting supervisor and dispatch activity.
//!
//! Implementations handle transport details (channels, logs, UI bridges).

use crate::events::AppEvent;

/// Trait for emitting application events.
///
/// `emit` must not block; implementations buffer or drop.
pub trait AppEventEmitter: Send + Sync {
    fn emit(&self, event: AppEvent);

    /// Clone this emitter into a boxed trait object.
    fn clone_box(&self) -> Box<dyn AppEventEmitter>;
}

/// Discards all events. For tests and CLI contexts without listeners.
#[derive(Debug, Clone, Default)]
pub struct NoopEmitter;

impl NoopEmitter {
    pub const fn new() -> Self {
        Self
    }
}

impl AppEventEmitter for NoopEmitter {
    fn emit(&self, _event: AppEvent) {}

    fn clone_box(&self) -> Box<dyn AppEventEmitter> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_noop_emitter() {
        let emitter = NoopEmitter::new();
        emitter.emit(AppEvent::server_started("github", "GitHub"));
    }

    #[test]
    fn test_arc_emitter() {
        let emitter: Arc<dyn AppEventEmitter> = Arc::new(NoopEmitter::new());
        emitter.emit(AppEvent::tool_called("github::search_issues", false));
        let _boxed: Box<dyn AppEventEmitter> = emitter.clone_box();
    }
}

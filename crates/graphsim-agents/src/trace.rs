//! Sampled trace scopes.
//!
//! A [`TraceScope`] is opened around one traced region: it emits `enter`
//! when created, one `action` event per executed action, and `exit` when
//! dropped. Scopes are plain values passed down explicitly; there is no
//! ambient tracing state.

use serde::Serialize;

use crate::action::Action;

/// Identifies one traced region execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceKey {
    /// Agent name.
    pub agent: String,
    /// Session key of the region.
    pub region: String,
    /// 1-based iteration number.
    pub iteration: u64,
}

/// Receiver of trace scope events.
pub trait TraceSink: Send + Sync {
    /// A traced region started.
    fn enter(&self, key: &TraceKey);

    /// An action is about to run inside a traced region.
    fn action(&self, key: &TraceKey, action: &Action);

    /// A traced region finished.
    fn exit(&self, key: &TraceKey);
}

/// Emits sampled scopes as `tracing` debug events.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTraceSink;

impl TraceSink for LogTraceSink {
    fn enter(&self, key: &TraceKey) {
        tracing::debug!(
            target: "graphsim::trace",
            agent = %key.agent,
            region = %key.region,
            iteration = key.iteration,
            "enter"
        );
    }

    fn action(&self, key: &TraceKey, action: &Action) {
        let params = serde_json::to_string(action).unwrap_or_default();
        tracing::debug!(
            target: "graphsim::trace",
            agent = %key.agent,
            region = %key.region,
            iteration = key.iteration,
            action = action.name(),
            params = %params,
            "action"
        );
    }

    fn exit(&self, key: &TraceKey) {
        tracing::debug!(
            target: "graphsim::trace",
            agent = %key.agent,
            region = %key.region,
            iteration = key.iteration,
            "exit"
        );
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTraceSink;

impl TraceSink for NoopTraceSink {
    fn enter(&self, _key: &TraceKey) {}

    fn action(&self, _key: &TraceKey, _action: &Action) {}

    fn exit(&self, _key: &TraceKey) {}
}

/// An open trace scope. Emits `exit` on drop.
pub struct TraceScope<'s> {
    sink: &'s dyn TraceSink,
    key: TraceKey,
}

impl<'s> TraceScope<'s> {
    /// Open a scope, emitting `enter`.
    pub fn enter(sink: &'s dyn TraceSink, key: TraceKey) -> Self {
        sink.enter(&key);
        Self { sink, key }
    }

    /// Record one action.
    pub fn record(&self, action: &Action) {
        self.sink.action(&self.key, action);
    }

    /// The key this scope reports under.
    pub const fn key(&self) -> &TraceKey {
        &self.key
    }
}

impl Drop for TraceScope<'_> {
    fn drop(&mut self) {
        self.sink.exit(&self.key);
    }
}

impl std::fmt::Debug for TraceScope<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TraceScope").field("key", &self.key).finish_non_exhaustive()
    }
}

// crates/substrate-events/src/bus.rs
// ============================================================================
// Module: Event Bus
// Description: In-process synchronous typed publish/subscribe event bus.
// Purpose: Let the orchestrator, dispatcher, and supervisor emit lifecycle
// events without coupling to the CLI's NDJSON stream or any other consumer.
// Dependencies: substrate-core, tracing
// ============================================================================

//! ## Overview
//! `EventBus` is a single in-process broadcaster, not a network transport.
//! Handlers run synchronously, in registration order, on the emitting
//! thread — a handler that blocks blocks emission. Subscribing to an
//! unrecognized event name is accepted silently, per the tolerant-consumer
//! stance the rest of Substrate takes toward unknown identifiers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use crate::payload::Event;
use crate::payload::EventPayload;
use substrate_core::Timestamp;

// ============================================================================
// SECTION: Subscription Handle
// ============================================================================

/// Opaque handle returned by [`EventBus::on`], usable with [`EventBus::off`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

// ============================================================================
// SECTION: Event Bus
// ============================================================================

type Handler = Box<dyn Fn(&Event) + Send + Sync>;

/// Synchronous in-process event bus keyed by event name.
///
/// # Invariants
/// - Handlers for a given name fire in the order they were registered.
/// - `emit` never panics due to handler registration state: an event with
///   no subscribers is a no-op besides the `tracing::debug!` line.
pub struct EventBus {
    handlers: Mutex<HashMap<&'static str, Vec<(u64, Handler)>>>,
    next_id: AtomicU64,
}

impl EventBus {
    /// Creates an empty event bus.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Registers `handler` for events named `name`, returning a handle for
    /// later removal via [`EventBus::off`].
    ///
    /// # Panics
    ///
    /// Panics if the internal handler registry mutex is poisoned, which
    /// only happens if a prior handler invocation itself panicked.
    pub fn on<F>(&self, name: &'static str, handler: F) -> SubscriptionId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut guard = self.handlers.lock().expect("event bus mutex poisoned");
        guard.entry(name).or_default().push((id, Box::new(handler)));
        SubscriptionId(id)
    }

    /// Removes a previously registered subscription. No-op if the
    /// subscription was already removed or never existed.
    ///
    /// # Panics
    ///
    /// Panics if the internal handler registry mutex is poisoned.
    pub fn off(&self, name: &str, id: SubscriptionId) {
        let mut guard = self.handlers.lock().expect("event bus mutex poisoned");
        if let Some(handlers) = guard.get_mut(name) {
            handlers.retain(|(handler_id, _)| *handler_id != id.0);
        }
    }

    /// Emits `payload` at the current wall-clock time, invoking every
    /// registered handler for its name in registration order.
    ///
    /// # Panics
    ///
    /// Panics if the internal handler registry mutex is poisoned.
    pub fn emit(&self, payload: EventPayload) {
        self.emit_at(Timestamp::now(), payload);
    }

    /// Emits `payload` at an explicit timestamp. Exists so callers with
    /// their own clock source (tests, replay tooling) never rely on this
    /// bus reading the wall clock.
    ///
    /// # Panics
    ///
    /// Panics if the internal handler registry mutex is poisoned.
    pub fn emit_at(&self, ts: Timestamp, payload: EventPayload) {
        let name = payload.name();
        let event = Event::new(ts, payload);
        tracing::debug!(event = name, "emitting event");
        let guard = self.handlers.lock().expect("event bus mutex poisoned");
        if let Some(handlers) = guard.get(name) {
            for (_, handler) in handlers {
                handler(&event);
            }
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only panic-based assertions are permitted."
)]
mod tests {
    use super::*;
    use crate::payload::PIPELINE_START;
    use crate::payload::STORY_DONE;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;
    use substrate_core::RunId;
    use substrate_core::StoryKey;

    #[test]
    fn handlers_fire_in_registration_order() {
        let bus = EventBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let order_a = Arc::clone(&order);
        bus.on(PIPELINE_START, move |_event| {
            order_a.lock().unwrap().push("a");
        });
        let order_b = Arc::clone(&order);
        bus.on(PIPELINE_START, move |_event| {
            order_b.lock().unwrap().push("b");
        });

        bus.emit(EventPayload::PipelineStart {
            run_id: RunId::from_raw(1).unwrap(),
            concept: "concept".to_string(),
        });

        assert_eq!(*order.lock().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn off_removes_only_the_targeted_subscription() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));

        let count_a = Arc::clone(&count);
        let sub_a = bus.on(STORY_DONE, move |_event| {
            count_a.fetch_add(1, Ordering::Relaxed);
        });
        let count_b = Arc::clone(&count);
        bus.on(STORY_DONE, move |_event| {
            count_b.fetch_add(10, Ordering::Relaxed);
        });

        bus.off(STORY_DONE, sub_a);
        bus.emit(EventPayload::StoryDone {
            run_id: RunId::from_raw(1).unwrap(),
            story_key: StoryKey::new("10-1"),
        });

        assert_eq!(count.load(Ordering::Relaxed), 10);
    }

    #[test]
    fn unknown_event_name_subscription_is_silently_accepted() {
        let bus = EventBus::new();
        let _sub = bus.on("totally:unknown", |_event| {});
        bus.off("totally:unknown", SubscriptionId(9999));
    }

    #[test]
    fn emit_with_no_subscribers_is_a_no_op() {
        let bus = EventBus::new();
        bus.emit(EventPayload::PipelineHeartbeat {
            run_id: RunId::from_raw(1).unwrap(),
        });
    }
}

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::Error;
use crate::record::ServiceRecord;

/// An event emitted by the discovery engine.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// A scan started.
    Start,
    /// The current scan stopped.
    Stop,
    /// Something went wrong. Delivered as an event so a running scan can
    /// report transport failures after the initiating call has returned.
    Error(Error),
    /// A new service instance was announced.
    Found(ServiceRecord),
    /// A service instance said goodbye. Carries the instance label.
    Remove(String),
    /// A service instance became fully resolved (host, port and at least
    /// one address known).
    Resolved(ServiceRecord),
    /// The service table changed. Emitted at most once per incoming packet,
    /// after the per-record events.
    Update,
    /// A local registration is now being announced.
    Published(ServiceRecord),
    /// A local registration was withdrawn.
    Unpublished(ServiceRecord),
}

/// The channel an [`Event`] is delivered on.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    Start,
    Stop,
    Error,
    Found,
    Remove,
    Resolved,
    Update,
    Published,
    Unpublished,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Start => EventKind::Start,
            Event::Stop => EventKind::Stop,
            Event::Error(_) => EventKind::Error,
            Event::Found(_) => EventKind::Found,
            Event::Remove(_) => EventKind::Remove,
            Event::Resolved(_) => EventKind::Resolved,
            Event::Update => EventKind::Update,
            Event::Published(_) => EventKind::Published,
            Event::Unpublished(_) => EventKind::Unpublished,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Start => write!(f, "start"),
            Event::Stop => write!(f, "stop"),
            Event::Error(e) => write!(f, "error: {e}"),
            Event::Found(r) => write!(f, "found: {r}"),
            Event::Remove(name) => write!(f, "remove: {name}"),
            Event::Resolved(r) => write!(f, "resolved: {r}"),
            Event::Update => write!(f, "update"),
            Event::Published(r) => write!(f, "published: {r}"),
            Event::Unpublished(r) => write!(f, "unpublished: {r}"),
        }
    }
}

type Callback = dyn Fn(&Event) + Send + Sync;

/// Handle returned by [`EventBus::subscribe`], used to unsubscribe.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Subscription {
    kind: EventKind,
    id: u64,
}

#[derive(Default)]
struct BusInner {
    next_id: u64,
    channels: HashMap<EventKind, Vec<(u64, Arc<Callback>)>>,
}

/// Dispatches events to per-kind subscriber callbacks.
///
/// Callbacks run on the emitting thread, outside the bus lock, so a
/// callback may subscribe or unsubscribe without deadlocking.
#[derive(Default)]
pub(crate) struct EventBus {
    inner: Mutex<BusInner>,
}

impl EventBus {
    pub(crate) fn new() -> Self {
        EventBus::default()
    }

    pub(crate) fn subscribe<F>(&self, kind: EventKind, callback: F) -> Subscription
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let mut inner = self.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        inner
            .channels
            .entry(kind)
            .or_default()
            .push((id, Arc::new(callback)));
        Subscription { kind, id }
    }

    // Unsubscribing twice, or with a handle from another bus, is a no-op.
    pub(crate) fn unsubscribe(&self, subscription: Subscription) {
        let mut inner = self.lock();
        if let Some(subscribers) = inner.channels.get_mut(&subscription.kind) {
            subscribers.retain(|(id, _)| *id != subscription.id);
        }
    }

    pub(crate) fn emit(&self, event: &Event) {
        let subscribers: Vec<Arc<Callback>> = {
            let inner = self.lock();
            match inner.channels.get(&event.kind()) {
                Some(subscribers) => subscribers.iter().map(|(_, cb)| Arc::clone(cb)).collect(),
                None => return,
            }
        };
        for callback in subscribers {
            callback(event);
        }
    }

    pub(crate) fn has_subscribers(&self, kind: EventKind) -> bool {
        self.subscriber_count(kind) > 0
    }

    pub(crate) fn subscriber_count(&self, kind: EventKind) -> usize {
        self.lock()
            .channels
            .get(&kind)
            .map(|subscribers| subscribers.len())
            .unwrap_or(0)
    }

    fn lock(&self) -> MutexGuard<'_, BusInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn test_subscribe_emit_unsubscribe() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let hits2 = Arc::clone(&hits);
        let sub = bus.subscribe(EventKind::Start, move |_| {
            hits2.fetch_add(1, Ordering::SeqCst);
        });
        assert!(bus.has_subscribers(EventKind::Start));

        bus.emit(&Event::Start);
        bus.emit(&Event::Stop);
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        bus.unsubscribe(sub);
        bus.emit(&Event::Start);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(!bus.has_subscribers(EventKind::Start));

        // Double unsubscribe is harmless.
        bus.unsubscribe(sub);
    }

    #[test]
    fn test_multiple_subscribers_same_kind() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let hits = Arc::clone(&hits);
            bus.subscribe(EventKind::Update, move |_| {
                hits.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(bus.subscriber_count(EventKind::Update), 3);

        bus.emit(&Event::Update);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_callback_may_resubscribe() {
        let bus = Arc::new(EventBus::new());
        let hits = Arc::new(AtomicUsize::new(0));

        let bus2 = Arc::clone(&bus);
        let hits2 = Arc::clone(&hits);
        bus.subscribe(EventKind::Stop, move |_| {
            let hits3 = Arc::clone(&hits2);
            bus2.subscribe(EventKind::Stop, move |_| {
                hits3.fetch_add(1, Ordering::SeqCst);
            });
        });

        // Must not deadlock; the new subscriber sees only later events.
        bus.emit(&Event::Stop);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        bus.emit(&Event::Stop);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_event_kinds() {
        assert_eq!(Event::Start.kind(), EventKind::Start);
        assert_eq!(Event::Remove("x".to_owned()).kind(), EventKind::Remove);
        assert_eq!(
            Event::Error(crate::error::Error::ErrEngineClosed).kind(),
            EventKind::Error
        );
    }
}

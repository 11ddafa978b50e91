#![forbid(unsafe_code)]

//! Navigation focus delivery.
//!
//! The navigation host owns a [`FocusBus`] and emits on every (re)activation
//! of the list screen, including the first mount. The screen subscribes
//! once and holds the returned [`FocusSubscription`]; dropping it
//! unsubscribes, so nothing reaches a torn-down screen.
//!
//! ```ignore
//! let bus = FocusBus::new();
//! let sender = program.sender();
//! let subscription = bus.subscribe(move || {
//!     sender.send(Msg::Focus);
//! });
//! bus.emit_focus();
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

type Handler = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct BusInner {
    next_id: u64,
    handlers: Vec<(u64, Handler)>,
}

/// Broadcasts focus events to subscribed screens.
#[derive(Clone, Default)]
pub struct FocusBus {
    inner: Arc<Mutex<BusInner>>,
}

impl std::fmt::Debug for FocusBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FocusBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

fn lock(inner: &Mutex<BusInner>) -> MutexGuard<'_, BusInner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

impl FocusBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for focus events.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe(&self, handler: impl Fn() + Send + Sync + 'static) -> FocusSubscription {
        let mut inner = lock(&self.inner);
        let id = inner.next_id;
        inner.next_id += 1;
        inner.handlers.push((id, Arc::new(handler)));
        tracing::debug!(subscription = id, "focus subscription added");
        FocusSubscription {
            id,
            bus: Arc::downgrade(&self.inner),
        }
    }

    /// Deliver one focus event. Returns how many handlers ran.
    ///
    /// Handlers run outside the bus lock, so they may subscribe or drop
    /// subscriptions themselves.
    pub fn emit_focus(&self) -> usize {
        let handlers: Vec<Handler> = lock(&self.inner)
            .handlers
            .iter()
            .map(|(_, h)| Arc::clone(h))
            .collect();
        for handler in &handlers {
            handler();
        }
        tracing::trace!(delivered = handlers.len(), "focus emitted");
        handlers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.inner).handlers.len()
    }
}

/// Live focus subscription. Unsubscribes on drop.
#[derive(Debug)]
pub struct FocusSubscription {
    id: u64,
    bus: Weak<Mutex<BusInner>>,
}

impl FocusSubscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Unsubscribe now.
    pub fn cancel(self) {}
}

impl Drop for FocusSubscription {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            lock(&bus).handlers.retain(|(id, _)| *id != self.id);
            tracing::debug!(subscription = self.id, "focus subscription removed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, impl Fn() + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        (count, move || {
            c.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn every_emit_reaches_subscriber() {
        let bus = FocusBus::new();
        let (count, handler) = counter();
        let _sub = bus.subscribe(handler);
        bus.emit_focus();
        bus.emit_focus();
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn drop_unsubscribes() {
        let bus = FocusBus::new();
        let (count, handler) = counter();
        let sub = bus.subscribe(handler);
        assert_eq!(bus.subscriber_count(), 1);
        drop(sub);
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(bus.emit_focus(), 0);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn cancel_is_drop() {
        let bus = FocusBus::new();
        let (_, handler) = counter();
        bus.subscribe(handler).cancel();
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn subscription_outliving_bus_is_harmless() {
        let (_, handler) = counter();
        let sub = {
            let bus = FocusBus::new();
            bus.subscribe(handler)
        };
        drop(sub);
    }

    #[test]
    fn independent_subscribers() {
        let bus = FocusBus::new();
        let (a, ha) = counter();
        let (b, hb) = counter();
        let sub_a = bus.subscribe(ha);
        let _sub_b = bus.subscribe(hb);
        bus.emit_focus();
        drop(sub_a);
        bus.emit_focus();
        assert_eq!(a.load(Ordering::SeqCst), 1);
        assert_eq!(b.load(Ordering::SeqCst), 2);
    }
}

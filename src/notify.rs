use std::sync::Mutex;

use tracing::debug;

/// Broadcast after every successful mutation of persisted data. Carries the
/// affected storage key so a receiver watching several keys can skip
/// unrelated ones; receivers are expected to re-read the full mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreChanged {
    pub key: String,
}

type Subscriber = Box<dyn Fn(&StoreChanged) + Send>;

/// Process-wide observer registry keeping independent readers (sidebar
/// aggregation, trend views) consistent with the writer. Delivery is
/// synchronous and in subscription order; there is no unsubscribe because
/// subscribers live as long as the process.
#[derive(Default)]
pub struct ChangeBus {
    subscribers: Mutex<Vec<Subscriber>>,
}

impl ChangeBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, subscriber: impl Fn(&StoreChanged) + Send + 'static) {
        self.subscribers
            .lock()
            .expect("Change bus subscribers should never be poisoned")
            .push(Box::new(subscriber));
    }

    pub fn publish(&self, event: &StoreChanged) {
        let subscribers = self
            .subscribers
            .lock()
            .expect("Change bus subscribers should never be poisoned");
        debug!(
            "Publishing change of {} to {} subscribers",
            event.key,
            subscribers.len()
        );
        for subscriber in subscribers.iter() {
            subscriber(event);
        }
    }
}

//! Build listeners scoped to the thread that attached them.
//!
//! A connection thread attaches a listener for the duration of one command.
//! Events fired on that thread reach only its own listeners, so concurrent
//! commands never see each other's output.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, ThreadId};

use buildwire_protocol::BuildEvent;

/// Receives build events.
pub trait BuildListener: Send + Sync {
    /// Called once per event, in firing order.
    fn on_event(&self, event: &BuildEvent);
}

impl<T> BuildListener for Arc<T>
where
    T: BuildListener + ?Sized,
{
    fn on_event(&self, event: &BuildEvent) {
        (**self).on_event(event);
    }
}

/// Listener that keeps every event it receives.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<BuildEvent>>,
}

impl EventLog {
    /// Removes and returns the captured events.
    pub fn take(&self) -> Vec<BuildEvent> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl BuildListener for EventLog {
    fn on_event(&self, event: &BuildEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}

struct Registration {
    id: u64,
    thread: ThreadId,
    listener: Arc<dyn BuildListener>,
}

#[derive(Default)]
pub(crate) struct ListenerRegistry {
    next_id: AtomicU64,
    registrations: Mutex<Vec<Registration>>,
}

impl ListenerRegistry {
    pub(crate) fn attach(&self, listener: Arc<dyn BuildListener>) -> ListenerGuard<'_> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock().push(Registration {
            id,
            thread: thread::current().id(),
            listener,
        });
        ListenerGuard { registry: self, id }
    }

    /// Delivers `event` to the listeners attached by the calling thread.
    pub(crate) fn fire(&self, event: &BuildEvent) {
        let current = thread::current().id();
        let listeners: Vec<Arc<dyn BuildListener>> = self
            .lock()
            .iter()
            .filter(|registration| registration.thread == current)
            .map(|registration| Arc::clone(&registration.listener))
            .collect();
        for listener in listeners {
            listener.on_event(event);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    fn detach(&self, id: u64) {
        self.lock().retain(|registration| registration.id != id);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Registration>> {
        self.registrations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Detaches its listener when dropped, including during unwinding.
#[must_use = "the listener is detached as soon as the guard is dropped"]
pub struct ListenerGuard<'a> {
    registry: &'a ListenerRegistry,
    id: u64,
}

impl Drop for ListenerGuard<'_> {
    fn drop(&mut self) {
        self.registry.detach(self.id);
    }
}

//! Test helpers for the transport module.

use std::net::TcpStream;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};
use std::thread;
use std::time::{Duration, Instant};

use super::{ConnectionHandler, ConnectionId};

/// Counts connections and optionally holds each one open for a while.
pub(crate) struct CountingHandler {
    count: Arc<AtomicUsize>,
    hold: Duration,
    names: Mutex<Vec<String>>,
}

impl CountingHandler {
    pub(crate) fn new() -> (Arc<AtomicUsize>, Arc<Self>) {
        Self::holding(Duration::ZERO)
    }

    pub(crate) fn holding(hold: Duration) -> (Arc<AtomicUsize>, Arc<Self>) {
        let count = Arc::new(AtomicUsize::new(0));
        let handler = Arc::new(Self {
            count: Arc::clone(&count),
            hold,
            names: Mutex::new(Vec::new()),
        });
        (count, handler)
    }

    pub(crate) fn thread_names(&self) -> Vec<String> {
        self.names.lock().expect("names mutex poisoned").clone()
    }
}

impl ConnectionHandler for CountingHandler {
    fn handle(&self, _stream: TcpStream, _id: ConnectionId) {
        if let Some(name) = thread::current().name() {
            self.names
                .lock()
                .expect("names mutex poisoned")
                .push(name.to_owned());
        }
        self.count.fetch_add(1, Ordering::SeqCst);
        thread::sleep(self.hold);
    }
}

pub(crate) fn wait_for_count(count: &AtomicUsize, expected: usize) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if count.load(Ordering::SeqCst) >= expected {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    false
}

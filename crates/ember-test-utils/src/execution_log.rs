//! Shared append-only log for cross-thread assertions.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Cloneable handle to a shared, append-only list of entries.
///
/// Jobs push into it from worker threads; the test thread waits for the
/// expected number of entries and then inspects them in order.
///
/// ```rust
/// use ember_test_utils::ExecutionLog;
/// use std::time::Duration;
///
/// let log = ExecutionLog::new();
/// let writer = log.clone();
/// std::thread::spawn(move || writer.push("J1"));
///
/// assert!(log.wait_for_len(1, Duration::from_secs(5)));
/// assert_eq!(log.entries(), vec!["J1"]);
/// ```
pub struct ExecutionLog<T> {
    inner: Arc<Inner<T>>,
}

struct Inner<T> {
    entries: Mutex<Vec<T>>,
    grown: Condvar,
}

impl<T> Clone for ExecutionLog<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Default for ExecutionLog<T> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: Mutex::new(Vec::new()),
                grown: Condvar::new(),
            }),
        }
    }
}

impl<T> ExecutionLog<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: T) {
        self.inner.entries.lock().push(entry);
        self.inner.grown.notify_all();
    }

    pub fn len(&self) -> usize {
        self.inner.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Block until at least `len` entries were pushed. Returns `false` on
    /// timeout.
    pub fn wait_for_len(&self, len: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut entries = self.inner.entries.lock();
        while entries.len() < len {
            if self
                .inner
                .grown
                .wait_until(&mut entries, deadline)
                .timed_out()
            {
                return entries.len() >= len;
            }
        }
        true
    }
}

impl<T: Clone> ExecutionLog<T> {
    /// Snapshot of the entries, in push order.
    pub fn entries(&self) -> Vec<T> {
        self.inner.entries.lock().clone()
    }
}

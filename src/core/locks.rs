//! Per-student serialization of tap processing.
//!
//! The duplicate and sequence checks read the latest tap and then write a new
//! one; two scans of the same student must never interleave between those
//! steps. Scans of different students proceed in parallel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Default)]
pub struct StudentLocks {
    inflight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl StudentLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, student_id: &str) -> Arc<Mutex<()>> {
        let mut inflight = self
            .inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            inflight
                .entry(student_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }

    /// Run `func` while holding the student's lock.
    pub fn with_student<T>(&self, student_id: &str, func: impl FnOnce() -> T) -> T {
        let lock = self.lock_for(student_id);
        let out = {
            // A panic in another scan must not wedge the student forever.
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            func()
        };
        self.release(student_id, &lock);
        out
    }

    /// Drop the map entry once no other scan holds or waits on it.
    fn release(&self, student_id: &str, lock: &Arc<Mutex<()>>) {
        let mut inflight = self
            .inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // the map and our own handle
        if Arc::strong_count(lock) == 2 {
            inflight.remove(student_id);
        }
    }

    /// Students with a scan in progress or queued.
    pub fn tracked(&self) -> usize {
        self.inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

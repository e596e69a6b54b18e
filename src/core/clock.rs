use crate::utils::date;
use chrono::{Duration, NaiveDateTime};
use std::cell::Cell;

/// Source of local wall-clock time for the engine.
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

impl<T: Clock + ?Sized> Clock for &T {
    fn now(&self) -> NaiveDateTime {
        (**self).now()
    }
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        date::now()
    }
}

/// Manually driven clock, used for replays (`scan --at`) and tests.
pub struct FixedClock {
    at: Cell<NaiveDateTime>,
}

impl FixedClock {
    pub fn new(at: NaiveDateTime) -> Self {
        Self { at: Cell::new(at) }
    }

    pub fn set(&self, at: NaiveDateTime) {
        self.at.set(at);
    }

    pub fn advance(&self, by: Duration) {
        self.at.set(self.at.get() + by);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.at.get()
    }
}

//! Tap processing and clinic workflow engine.

pub mod calendar;
pub mod clinic;
pub mod clock;
pub mod directory;
pub mod identity;
pub mod locks;
pub mod notify;
pub mod rules;
pub mod tap;

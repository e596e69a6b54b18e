pub mod attendance;
pub mod calendar;
pub mod clinic;
pub mod direction;
pub mod notification;
pub mod rule;
pub mod student;
pub mod tap;

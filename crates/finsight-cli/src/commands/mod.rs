pub mod schedule;
pub mod watch;

//! Small browser helpers shared by services and components.

pub mod debounce;
pub mod download;
pub mod timer;

pub use debounce::{Debounced, debounce};
pub use timer::{BrowserScheduler, Scheduler};

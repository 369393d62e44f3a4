//! Small adapters with no external dependencies.

mod system_clock;

pub use system_clock::SystemClock;

//! # Helpdesk Testing
//!
//! Testing utilities for the help desk crates.
//!
//! This crate provides:
//! - Clocks that never move on their own (`FixedClock`, `ManualClock`)
//! - A sink that remembers every domain event (`RecordingSink`)
//! - A notifier that remembers every message and can be told to fail
//!   (`RecordingNotifier`)
//!
//! ## Example
//!
//! ```
//! use helpdesk_testing::{test_clock, ManualClock, RecordingSink};
//! use helpdesk_core::environment::Clock;
//! use helpdesk_core::event::EventSink;
//!
//! let clock = ManualClock::new(test_clock().now());
//! clock.advance(chrono::Duration::hours(2));
//!
//! let sink = RecordingSink::new();
//! sink.record("ticket created");
//! assert_eq!(sink.len(), 1);
//! ```

pub mod mocks;
pub mod recorders;

// Re-export commonly used items
pub use mocks::{FixedClock, ManualClock, test_clock};
pub use recorders::{RecordingNotifier, RecordingSink};

/// Install a compact `tracing` subscriber for tests.
///
/// Safe to call from every test: only the first call installs it.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("warn")
        .try_init();
}

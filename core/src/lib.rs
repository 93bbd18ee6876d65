//! # Helpdesk Core
//!
//! Ports shared by the help desk crates.
//!
//! The ticket engine keeps its business rules pure and pushes everything that
//! touches the outside world behind small traits defined here:
//!
//! - **Clock**: where "now" comes from (system clock in production, fixed or
//!   manual clocks in tests)
//! - **`EventSink`**: where domain events go after a mutating operation
//!   (audit log, tracing, fan-out to several sinks)
//! - **Notifier**: how a rendered notification reaches a recipient
//!
//! ## Architecture Principles
//!
//! - Functional core, imperative shell
//! - Explicit side effects (no hidden hooks on persistence)
//! - Dependency injection through `Arc<dyn Trait>`
//!
//! ## Example
//!
//! ```
//! use helpdesk_core::environment::{Clock, SystemClock};
//! use helpdesk_core::event::{EventSink, NullSink};
//!
//! let clock = SystemClock;
//! let _now = clock.now();
//!
//! let sink = NullSink;
//! sink.record("anything");
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};

pub mod environment;
pub mod event;
pub mod notify;

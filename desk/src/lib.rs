//! Warranty Help Desk - ticket lifecycle and workload engine
//!
//! Customers file warranty claims and complaints; staff move them through a
//! role-keyed state machine until they are resolved, closed or rejected.
//!
//! - **Warranty validation**: coverage window per category plus required
//!   documents (invoice number, serial number, invoice copy)
//! - **State machine**: transitions allowed per actor role, superadmin bypass
//! - **Workload balancing**: least-loaded agent/technician with capacity limits
//! - **Save invariants**: closing stamps, frozen response/resolution hours,
//!   warranty refresh when its inputs change
//! - **Reporting**: general, per-agent, workload and customer metrics
//!
//! # Architecture
//!
//! ```text
//!   caller ──▶ HelpDesk (service) ──▶ TicketStore (optimistic versions)
//!                 │    │
//!                 │    └──▶ pure rules: policy, lifecycle, warranty,
//!                 │                     balancer, reporting
//!                 │
//!                 ├──▶ EventSink<TicketEvent> ──▶ AuditLog, extra sinks
//!                 └──▶ NotificationService ──▶ Notifier
//! ```
//!
//! Every mutating operation loads a snapshot, runs the pure rules, writes
//! through [`TicketStore`](store::TicketStore) and then emits
//! [`TicketEvent`](events::TicketEvent)s. Notifications never fail an
//! operation.
//!
//! # Example
//!
//! ```
//! use helpdesk::{Config, DeskEnvironment, HelpDesk};
//! use helpdesk_core::environment::SystemClock;
//! use helpdesk_core::notify::LogNotifier;
//! use std::sync::Arc;
//!
//! let rt = tokio::runtime::Runtime::new().unwrap();
//! rt.block_on(async {
//!     let env = DeskEnvironment::in_memory(Arc::new(SystemClock), Arc::new(LogNotifier));
//!     let desk = HelpDesk::new(env, Config::default());
//!     assert_eq!(desk.seed_default_categories().await.unwrap(), 3);
//!     assert_eq!(desk.seed_default_categories().await.unwrap(), 0);
//! });
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod attachment;
pub mod audit;
pub mod balancer;
pub mod config;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod notifications;
pub mod policy;
pub mod reporting;
pub mod service;
pub mod store;
pub mod telemetry;
pub mod ticket;
pub mod types;
pub mod user;
pub mod warranty;

pub use config::Config;
pub use error::DeskError;
pub use service::{DeskEnvironment, HelpDesk};
pub use types::*;

//! # evhub - In-process named-channel event registry
//!
//! evhub keeps a table of event names to subscription sets and invokes the
//! registered callbacks synchronously when an event is dispatched.
//!
//! ## Core Concepts
//!
//! - **Callback**: a handler with a stable identity used for deduplication and removal
//! - **id**: a per-event slot; registering again under the same id replaces its callback
//! - **group**: a shared entry; registering again under the same group adds a callback
//! - **observe tags**: opt-in filtering for [`EventRegistry::trigger_filtered`]
//!
//! ## Usage
//!
//! ```rust,ignore
//! use evhub::{Callback, EventRegistry, Registration, Selector, Trigger};
//!
//! let events = EventRegistry::<Order>::new();
//!
//! let audit = Callback::new(|order: &Order| audit_log(order));
//! events.register(Registration::new("order", audit.clone()).with_group("audit"));
//! events.register(
//!     Registration::new("order", Callback::new(|o: &Order| refresh_row(o)))
//!         .with_id("row-42")
//!         .with_observe([42]),
//! );
//!
//! events.dispatch("order", &order)?;
//! events.trigger_filtered(Trigger::new("order", &order).with_observe([order.id]))?;
//!
//! events.unregister(Selector::event("order").callback(&audit));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod registry;
pub mod tag;

// Re-export primary types at crate root for convenience
pub use config::{RegistryConfig, RemovalPolicy};
pub use error::{CallbackError, EventError, EventResult, ValidationError};
pub use registry::{
    Callback, CallbackId, DispatchOutcome, EntrySnapshot, EventRegistry, EventStream, Registration,
    RegistrationBuilder, Selector, SubscriptionSnapshot, Trigger, Unregistered,
};
pub use tag::ObserveTag;

//! Named-channel event registry.
//!
//! Callers subscribe callbacks to an event name, optionally under an `id`
//! (one active callback per slot, replaced on re-registration), a `group`
//! (callbacks accumulate in one shared entry) and `observe` tags (filtered
//! delivery). Everything is synchronous and in-process.

/// Callback handles and identity.
pub mod callback;
/// Registry handle and dispatch passes.
pub mod dispatcher;
/// Registration, selector and trigger requests.
pub mod registration;
/// Snapshots and operation summaries.
pub mod snapshot;
/// Channel subscriptions.
pub mod stream;

mod state;

pub use callback::{Callback, CallbackId};
pub use dispatcher::EventRegistry;
pub use registration::{Registration, RegistrationBuilder, Selector, Trigger};
pub use snapshot::{DispatchOutcome, EntrySnapshot, SubscriptionSnapshot, Unregistered};
pub use stream::EventStream;

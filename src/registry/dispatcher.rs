//! The event registry and its dispatch passes.
//!
//! Registration state lives behind a single mutex. Dispatch copies the
//! selected callbacks out under the lock and invokes them after releasing it,
//! so callbacks may re-enter the registry freely. A pass only ever sees the
//! subscriptions present when it started.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::config::RegistryConfig;
use crate::error::{EventError, EventResult};
use crate::tag::ObserveTag;

use super::callback::Callback;
use super::registration::{Registration, Selector, Trigger};
use super::snapshot::{DispatchOutcome, SubscriptionSnapshot, Unregistered};
use super::state::{RegisterAction, RegistryState, Selection};

/// Named-channel event registry.
///
/// Cloning yields another handle to the same registry. Independent registries
/// are created with [`EventRegistry::new`].
///
/// The payload type defaults to `serde_json::Value`; use `Option<T>` for
/// events that may carry no data.
pub struct EventRegistry<T = serde_json::Value> {
    state: Arc<Mutex<RegistryState<T>>>,
    cfg: RegistryConfig,
}

impl<T> EventRegistry<T> {
    /// Create an empty registry with the default config.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create an empty registry.
    #[must_use]
    pub fn with_config(cfg: RegistryConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(RegistryState::default())),
            cfg,
        }
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn config(&self) -> &RegistryConfig {
        &self.cfg
    }

    /// Handle that does not keep the registry alive.
    #[must_use]
    pub(crate) fn downgrade(&self) -> WeakRegistry<T> {
        WeakRegistry {
            state: Arc::downgrade(&self.state),
            cfg: self.cfg.clone(),
        }
    }

    // No user code runs under this lock, so a poisoned guard still holds a
    // consistent table.
    fn lock(&self) -> MutexGuard<'_, RegistryState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run a mutation, then drop the callbacks it removed once unlocked.
    fn mutate<R>(&self, f: impl FnOnce(&mut RegistryState<T>) -> R) -> R {
        let (result, released) = {
            let mut state = self.lock();
            let result = f(&mut *state);
            (result, state.take_released())
        };
        drop(released);
        result
    }

    /// Subscribe a callback. Returns the event's subscription set afterwards.
    pub fn register(&self, registration: Registration<T>) -> SubscriptionSnapshot {
        let event = registration.event_name.clone();
        let id = registration.id.clone();
        let group = registration.group.clone();
        let callback_id = registration.callback.id();

        let (action, snapshot) = self.mutate(|state| state.register(registration));

        match action {
            RegisterAction::Duplicate => tracing::trace!(
                event = %event,
                callback = %callback_id,
                "callback already registered"
            ),
            _ => tracing::debug!(
                event = %event,
                id = ?id,
                group = ?group,
                callback = %callback_id,
                action = ?action,
                entries = snapshot.entries.len(),
                "registered callback"
            ),
        }

        snapshot
    }

    /// Remove subscriptions. Never fails; unknown events are ignored.
    pub fn unregister(&self, selector: Selector) -> Unregistered {
        let target = match &selector {
            Selector::All => None,
            Selector::Event { event_name, .. } => Some(event_name.clone()),
        };

        let policy = self.cfg.removal_policy;
        let removed = self.mutate(|state| state.unregister(selector, policy));

        if !removed.is_noop() {
            tracing::debug!(
                event = ?target,
                events_removed = removed.events_removed,
                entries_removed = removed.entries_removed,
                callbacks_removed = removed.callbacks_removed,
                "unregistered"
            );
        }

        removed
    }

    /// Remove every event and entry.
    pub fn clear(&self) -> Unregistered {
        self.unregister(Selector::All)
    }

    /// Invoke every callback of `event_name` with `data`.
    ///
    /// Order is entry insertion order, then callback insertion order within an
    /// entry. An unknown event invokes nothing.
    ///
    /// # Errors
    ///
    /// The first callback that fails ends the pass with
    /// `EventError::CallbackFailed`; later callbacks are not invoked.
    pub fn dispatch(&self, event_name: &str, data: &T) -> EventResult<DispatchOutcome> {
        let selection = self.lock().select(event_name, &HashSet::new());
        self.run(event_name, selection, data)
    }

    /// Invoke the callbacks of `trigger.event_name` whose observe tags overlap
    /// `trigger.observe`.
    ///
    /// Entries without tags are always invoked. Without requested tags this is
    /// the same as [`EventRegistry::dispatch`].
    ///
    /// # Errors
    ///
    /// Same failure policy as [`EventRegistry::dispatch`].
    pub fn trigger_filtered(&self, trigger: Trigger<'_, T>) -> EventResult<DispatchOutcome> {
        let Trigger {
            event_name,
            data,
            observe,
        } = trigger;
        let wanted: HashSet<ObserveTag> = observe.into_iter().collect();

        let selection = self.lock().select(event_name, &wanted);
        self.run(event_name, selection, data)
    }

    fn run(&self, event_name: &str, selection: Option<Selection<T>>, data: &T) -> EventResult<DispatchOutcome> {
        let Some(selection) = selection else {
            tracing::trace!(event = %event_name, "dispatch to unknown event");
            return Ok(DispatchOutcome::default());
        };

        let mut outcome = DispatchOutcome {
            event_found: true,
            entries_matched: selection.entries_matched,
            callbacks_invoked: 0,
        };

        for callback in &selection.callbacks {
            outcome.callbacks_invoked += 1;
            if let Err(source) = callback.call(data) {
                tracing::warn!(
                    event = %event_name,
                    callback = %callback.id(),
                    error = %source,
                    skipped = selection.callbacks.len() - outcome.callbacks_invoked,
                    "callback failed; aborting dispatch"
                );
                return Err(EventError::CallbackFailed {
                    event_name: event_name.to_string(),
                    callback_id: callback.id(),
                    source,
                });
            }
        }

        tracing::trace!(
            event = %event_name,
            entries = outcome.entries_matched,
            invoked = outcome.callbacks_invoked,
            "dispatched"
        );

        Ok(outcome)
    }

    /// True if `event_name` has a subscription set.
    #[must_use]
    pub fn contains(&self, event_name: &str) -> bool {
        self.lock().contains(event_name)
    }

    /// Number of registered event names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered event names, in order of first registration.
    #[must_use]
    pub fn event_names(&self) -> Vec<String> {
        self.lock().event_names()
    }

    /// Current subscription set of `event_name`.
    #[must_use]
    pub fn subscriptions(&self, event_name: &str) -> Option<SubscriptionSnapshot> {
        self.lock().snapshot(event_name)
    }
}

impl<T: 'static> EventRegistry<T> {
    /// Shorthand for registering a plain closure without id, group or tags.
    ///
    /// Returns the created callback so it can be unregistered later.
    pub fn on<F>(&self, event_name: impl Into<String>, f: F) -> Callback<T>
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let callback = Callback::new(f);
        self.register(Registration::new(event_name, callback.clone()));
        callback
    }
}

impl<T> Default for EventRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for EventRegistry<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            cfg: self.cfg.clone(),
        }
    }
}

/// Non-owning registry handle held by streams.
pub(crate) struct WeakRegistry<T> {
    state: Weak<Mutex<RegistryState<T>>>,
    cfg: RegistryConfig,
}

impl<T> WeakRegistry<T> {
    /// `None` once every [`EventRegistry`] handle is gone.
    pub(crate) fn upgrade(&self) -> Option<EventRegistry<T>> {
        self.state.upgrade().map(|state| EventRegistry {
            state,
            cfg: self.cfg.clone(),
        })
    }
}

impl<T> fmt::Debug for WeakRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakRegistry")
            .field("alive", &(self.state.strong_count() > 0))
            .finish_non_exhaustive()
    }
}

impl<T> fmt::Debug for EventRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventRegistry")
            .field("cfg", &self.cfg)
            .field("events", &self.event_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RemovalPolicy;
    use crate::error::CallbackError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, Callback<u32>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let hits2 = Arc::clone(&hits);
        let cb = Callback::new(move |_: &u32| {
            hits2.fetch_add(1, Ordering::SeqCst);
        });
        (hits, cb)
    }

    #[test]
    fn dispatch_unknown_event_is_noop() {
        let reg = EventRegistry::<u32>::new();
        let outcome = reg.dispatch("nothing", &1).unwrap();
        assert_eq!(outcome, DispatchOutcome::default());
        assert!(!outcome.event_found);
    }

    #[test]
    fn dispatch_reports_counts() {
        let reg = EventRegistry::<u32>::new();
        let (hits, cb) = counter();
        reg.register(Registration::new("e", cb).with_group("g"));
        let (_, cb2) = counter();
        reg.register(Registration::new("e", cb2).with_group("g"));

        let outcome = reg.dispatch("e", &0).unwrap();
        assert_eq!(
            outcome,
            DispatchOutcome {
                event_found: true,
                entries_matched: 1,
                callbacks_invoked: 2,
            }
        );
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failing_callback_stops_the_pass() {
        let reg = EventRegistry::<u32>::new();
        let (before, cb_before) = counter();
        let (after, cb_after) = counter();
        let failing = Callback::fallible(|_: &u32| Err(CallbackError::new("broken")));

        reg.register(Registration::new("e", cb_before));
        reg.register(Registration::new("e", failing.clone()));
        reg.register(Registration::new("e", cb_after));

        let err = reg.dispatch("e", &0).unwrap_err();
        match err {
            EventError::CallbackFailed {
                event_name,
                callback_id,
                source,
            } => {
                assert_eq!(event_name, "e");
                assert_eq!(callback_id, failing.id());
                assert_eq!(source.message(), "broken");
            }
            other => panic!("expected callback failure, got {other:?}"),
        }
        assert_eq!(before.load(Ordering::SeqCst), 1);
        assert_eq!(after.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn clones_share_state_and_new_registries_do_not() {
        let a = EventRegistry::<u32>::new();
        let b = a.clone();
        let c = EventRegistry::<u32>::new();
        a.on("e", |_| {});
        assert!(b.contains("e"));
        assert!(!c.contains("e"));
    }

    #[test]
    fn retain_config_keeps_event_names() {
        let reg = EventRegistry::<u32>::with_config(
            RegistryConfig::default().with_removal_policy(RemovalPolicy::Retain),
        );
        let cb = reg.on("e", |_| {});
        reg.unregister(Selector::event("e").callback(&cb));
        assert!(reg.contains("e"));
        assert_eq!(reg.dispatch("e", &1).unwrap().callbacks_invoked, 0);

        reg.clear();
        assert!(reg.is_empty());
    }

    #[test]
    fn on_returns_handle_for_removal() {
        let reg = EventRegistry::<u32>::new();
        let cb = reg.on("e", |_| {});
        assert_eq!(reg.len(), 1);
        let removed = reg.unregister(Selector::event("e").callback(&cb));
        assert_eq!(removed.callbacks_removed, 1);
        assert!(reg.is_empty());
    }
}

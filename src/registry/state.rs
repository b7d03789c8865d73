//! The event table and its resolution rules.
//!
//! Everything here is plain data behind the registry lock. No user code runs
//! while this state is borrowed: dispatch copies the selected callbacks out
//! first (see [`Selection`]).

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::config::RemovalPolicy;
use crate::tag::ObserveTag;

use super::callback::{Callback, CallbackId};
use super::registration::{Registration, Selector};
use super::snapshot::{EntrySnapshot, SubscriptionSnapshot, Unregistered};

/// How a registration was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RegisterAction {
    /// A new entry was appended.
    Added,
    /// An existing id entry had its callbacks replaced.
    Replaced,
    /// The callback joined an existing group entry.
    Accumulated,
    /// The callback was already present; nothing changed except possibly `observe`.
    Duplicate,
}

struct CallbackEntry<T> {
    callbacks: Vec<Callback<T>>,
    id: Option<String>,
    group: Option<String>,
    observe: Option<Vec<ObserveTag>>,
    registered_at: DateTime<Utc>,
}

impl<T> CallbackEntry<T> {
    fn new(
        callback: Callback<T>,
        id: Option<String>,
        group: Option<String>,
        observe: Option<Vec<ObserveTag>>,
    ) -> Self {
        Self {
            callbacks: vec![callback],
            id,
            group,
            observe,
            registered_at: Utc::now(),
        }
    }

    fn contains(&self, id: CallbackId) -> bool {
        self.callbacks.iter().any(|c| c.id() == id)
    }

    /// Untagged entries accept every trigger; tagged ones need an overlap.
    fn accepts(&self, wanted: &HashSet<ObserveTag>) -> bool {
        match &self.observe {
            Some(tags) if !tags.is_empty() => tags.iter().any(|t| wanted.contains(t)),
            _ => true,
        }
    }

    fn snapshot(&self) -> EntrySnapshot {
        EntrySnapshot {
            id: self.id.clone(),
            group: self.group.clone(),
            observe: self.observe.clone(),
            callback_ids: self.callbacks.iter().map(Callback::id).collect(),
            registered_at: self.registered_at,
        }
    }
}

struct SubscriptionSet<T> {
    /// Creation order of the event name, for listing.
    seq: u64,
    entries: Vec<CallbackEntry<T>>,
}

impl<T> SubscriptionSet<T> {
    const fn new(seq: u64) -> Self {
        Self {
            seq,
            entries: Vec::new(),
        }
    }

    fn upsert(
        &mut self,
        callback: Callback<T>,
        id: Option<String>,
        group: Option<String>,
        observe: Option<Vec<ObserveTag>>,
        released: &mut Vec<Callback<T>>,
    ) -> RegisterAction {
        if let Some(id_key) = id.as_deref() {
            if let Some(entry) = self.entries.iter_mut().find(|e| e.id.as_deref() == Some(id_key)) {
                released.append(&mut entry.callbacks);
                entry.callbacks.push(callback);
                if observe.is_some() {
                    entry.observe = observe;
                }
                return RegisterAction::Replaced;
            }
        } else if let Some(group_key) = group.as_deref() {
            if let Some(entry) = self.entries.iter_mut().find(|e| e.group.as_deref() == Some(group_key)) {
                let action = if entry.contains(callback.id()) {
                    RegisterAction::Duplicate
                } else {
                    entry.callbacks.push(callback);
                    RegisterAction::Accumulated
                };
                if observe.is_some() {
                    entry.observe = observe;
                }
                return action;
            }
        } else if self.entries.iter().any(|e| e.contains(callback.id())) {
            return RegisterAction::Duplicate;
        }

        self.entries.push(CallbackEntry::new(callback, id, group, observe));
        RegisterAction::Added
    }

    fn remove_entries<P>(&mut self, pred: P, released: &mut Vec<Callback<T>>) -> Unregistered
    where
        P: FnMut(&CallbackEntry<T>) -> bool,
    {
        let (gone, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.entries).into_iter().partition(pred);
        self.entries = kept;

        let mut removed = Unregistered::default();
        for entry in gone {
            removed.entries_removed += 1;
            removed.callbacks_removed += entry.callbacks.len();
            released.extend(entry.callbacks);
        }
        removed
    }

    fn remove_callback(&mut self, id: CallbackId, released: &mut Vec<Callback<T>>) -> Unregistered {
        let mut removed = Unregistered::default();
        for entry in &mut self.entries {
            let (gone, kept): (Vec<_>, Vec<_>) =
                std::mem::take(&mut entry.callbacks).into_iter().partition(|c| c.id() == id);
            entry.callbacks = kept;
            removed.callbacks_removed += gone.len();
            released.extend(gone);
        }
        removed
    }

    fn snapshot(&self, event_name: &str) -> SubscriptionSnapshot {
        SubscriptionSnapshot {
            event_name: event_name.to_string(),
            entries: self.entries.iter().map(CallbackEntry::snapshot).collect(),
        }
    }
}

/// Callbacks chosen for one dispatch pass, copied out of the table.
pub(crate) struct Selection<T> {
    pub entries_matched: usize,
    pub callbacks: Vec<Callback<T>>,
}

/// `event name -> subscription set`.
pub(crate) struct RegistryState<T> {
    events: HashMap<String, SubscriptionSet<T>>,
    next_seq: u64,
    /// Callbacks removed by the last mutation. Dropping a callback can run
    /// arbitrary `Drop` code, so callers release these after unlocking.
    released: Vec<Callback<T>>,
}

impl<T> Default for RegistryState<T> {
    fn default() -> Self {
        Self {
            events: HashMap::new(),
            next_seq: 0,
            released: Vec::new(),
        }
    }
}

impl<T> RegistryState<T> {
    pub(crate) fn register(&mut self, reg: Registration<T>) -> (RegisterAction, SubscriptionSnapshot) {
        let Registration {
            event_name,
            callback,
            id,
            group,
            observe,
        } = reg;

        // A fresh set resolves every registration to a single new entry.
        let set = match self.events.entry(event_name.clone()) {
            Entry::Occupied(o) => o.into_mut(),
            Entry::Vacant(v) => {
                self.next_seq += 1;
                v.insert(SubscriptionSet::new(self.next_seq))
            }
        };

        let action = set.upsert(callback, id, group, observe, &mut self.released);
        (action, set.snapshot(&event_name))
    }

    pub(crate) fn unregister(&mut self, selector: Selector, policy: RemovalPolicy) -> Unregistered {
        let (event_name, callback, group, id) = match selector {
            Selector::All => return self.clear(),
            Selector::Event {
                event_name,
                callback,
                group,
                id,
            } => (event_name, callback, group, id),
        };

        let Some(set) = self.events.get_mut(&event_name) else {
            return Unregistered::default();
        };

        let released = &mut self.released;
        let mut removed = if let Some(cb) = callback {
            set.remove_callback(cb, released)
        } else if let Some(group) = group {
            set.remove_entries(|e| e.group.as_deref() == Some(group.as_str()), released)
        } else if let Some(id) = id {
            set.remove_entries(|e| e.id.as_deref() == Some(id.as_str()), released)
        } else {
            set.remove_entries(|_| true, released)
        };

        if policy == RemovalPolicy::Prune {
            removed += set.remove_entries(|e| e.callbacks.is_empty(), released);
            if set.entries.is_empty() {
                self.events.remove(&event_name);
                removed.events_removed = 1;
            }
        }

        removed
    }

    pub(crate) fn clear(&mut self) -> Unregistered {
        let mut removed = Unregistered {
            events_removed: self.events.len(),
            ..Unregistered::default()
        };
        for (_, set) in self.events.drain() {
            removed.entries_removed += set.entries.len();
            for entry in set.entries {
                removed.callbacks_removed += entry.callbacks.len();
                self.released.extend(entry.callbacks);
            }
        }
        removed
    }

    /// Hand over callbacks removed since the last call.
    pub(crate) fn take_released(&mut self) -> Vec<Callback<T>> {
        std::mem::take(&mut self.released)
    }

    /// Copy out the callbacks a pass over `event_name` should invoke.
    ///
    /// An empty `wanted` set selects every entry.
    pub(crate) fn select(&self, event_name: &str, wanted: &HashSet<ObserveTag>) -> Option<Selection<T>> {
        let set = self.events.get(event_name)?;

        let mut selection = Selection {
            entries_matched: 0,
            callbacks: Vec::new(),
        };
        for entry in &set.entries {
            if !wanted.is_empty() && !entry.accepts(wanted) {
                continue;
            }
            selection.entries_matched += 1;
            selection.callbacks.extend(entry.callbacks.iter().cloned());
        }

        Some(selection)
    }

    pub(crate) fn snapshot(&self, event_name: &str) -> Option<SubscriptionSnapshot> {
        self.events.get(event_name).map(|set| set.snapshot(event_name))
    }

    pub(crate) fn contains(&self, event_name: &str) -> bool {
        self.events.contains_key(event_name)
    }

    pub(crate) fn len(&self) -> usize {
        self.events.len()
    }

    /// Event names in the order they were first registered.
    pub(crate) fn event_names(&self) -> Vec<String> {
        let mut names: Vec<(u64, &String)> = self.events.iter().map(|(name, set)| (set.seq, name)).collect();
        names.sort_unstable_by_key(|(seq, _)| *seq);
        names.into_iter().map(|(_, name)| name.clone()).collect()
    }
}

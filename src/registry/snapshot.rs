//! Read-only views and operation summaries.
//!
//! These types are serializable so diagnostics can render registry state as JSON.

use std::ops::AddAssign;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tag::ObserveTag;

use super::callback::CallbackId;

/// One callback entry as seen at snapshot time.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntrySnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observe: Option<Vec<ObserveTag>>,
    pub callback_ids: Vec<CallbackId>,
    pub registered_at: DateTime<Utc>,
}

/// The subscription set of one event, in dispatch order.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionSnapshot {
    pub event_name: String,
    pub entries: Vec<EntrySnapshot>,
}

impl SubscriptionSnapshot {
    /// Total callbacks across all entries.
    #[must_use]
    pub fn callback_count(&self) -> usize {
        self.entries.iter().map(|e| e.callback_ids.len()).sum()
    }

    /// The entry registered under `id`, if any.
    #[must_use]
    pub fn entry_by_id(&self, id: &str) -> Option<&EntrySnapshot> {
        self.entries.iter().find(|e| e.id.as_deref() == Some(id))
    }

    /// The entry for `group`, if any.
    #[must_use]
    pub fn entry_by_group(&self, group: &str) -> Option<&EntrySnapshot> {
        self.entries.iter().find(|e| e.group.as_deref() == Some(group))
    }
}

/// What an `unregister` call removed.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Unregistered {
    pub events_removed: usize,
    pub entries_removed: usize,
    pub callbacks_removed: usize,
}

impl Unregistered {
    /// True if nothing was removed.
    #[must_use]
    pub const fn is_noop(&self) -> bool {
        self.events_removed == 0 && self.entries_removed == 0 && self.callbacks_removed == 0
    }
}

impl AddAssign for Unregistered {
    fn add_assign(&mut self, rhs: Self) {
        self.events_removed += rhs.events_removed;
        self.entries_removed += rhs.entries_removed;
        self.callbacks_removed += rhs.callbacks_removed;
    }
}

/// Result of one dispatch or filtered trigger pass.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DispatchOutcome {
    /// False when the event name was not registered.
    pub event_found: bool,
    /// Entries selected by the filter.
    pub entries_matched: usize,
    pub callbacks_invoked: usize,
}

//! Request types for registering, removing and triggering callbacks.

use std::fmt;

use crate::error::ValidationError;
use crate::tag::ObserveTag;

use super::callback::{Callback, CallbackId};

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn collect_tags<I, V>(tags: I) -> Vec<ObserveTag>
where
    I: IntoIterator<Item = V>,
    V: Into<ObserveTag>,
{
    tags.into_iter().map(Into::into).collect()
}

/// A request to subscribe a callback to an event.
///
/// `id` gives the entry a unique slot within the event: registering again
/// under the same id replaces its callbacks. `group` shares one entry between
/// many callbacks. Without either, the callback is deduplicated by identity.
///
/// Empty `id`/`group` strings are treated as absent.
pub struct Registration<T> {
    pub(crate) event_name: String,
    pub(crate) callback: Callback<T>,
    pub(crate) id: Option<String>,
    pub(crate) group: Option<String>,
    pub(crate) observe: Option<Vec<ObserveTag>>,
}

impl<T> Registration<T> {
    /// Subscribe `callback` to `event_name` without id, group or tags.
    pub fn new(event_name: impl Into<String>, callback: Callback<T>) -> Self {
        Self {
            event_name: event_name.into(),
            callback,
            id: None,
            group: None,
            observe: None,
        }
    }

    /// Validating builder.
    #[must_use]
    pub fn builder() -> RegistrationBuilder<T> {
        RegistrationBuilder::default()
    }

    /// Register into the slot `id`.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = non_empty(id.into());
        self
    }

    /// Register into the shared entry `group`.
    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = non_empty(group.into());
        self
    }

    /// Only receive filtered triggers requesting one of these tags.
    ///
    /// An empty tag list counts as supplied: it overwrites earlier tags and
    /// leaves the entry receiving every trigger.
    #[must_use]
    pub fn with_observe<I, V>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<ObserveTag>,
    {
        self.observe = Some(collect_tags(tags));
        self
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn callback(&self) -> &Callback<T> {
        &self.callback
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn observe(&self) -> Option<&[ObserveTag]> {
        self.observe.as_deref()
    }
}

impl<T> fmt::Debug for Registration<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("event_name", &self.event_name)
            .field("callback", &self.callback)
            .field("id", &self.id)
            .field("group", &self.group)
            .field("observe", &self.observe)
            .finish()
    }
}

/// Builder for [`Registration`].
///
/// # Example
/// ```rust,ignore
/// let reg = Registration::builder()
///     .event_name("order")
///     .callback(Callback::new(|order: &Order| audit(order)))
///     .group("audit")
///     .build()?;
/// ```
pub struct RegistrationBuilder<T> {
    event_name: Option<String>,
    callback: Option<Callback<T>>,
    id: Option<String>,
    group: Option<String>,
    observe: Option<Vec<ObserveTag>>,
}

impl<T> Default for RegistrationBuilder<T> {
    fn default() -> Self {
        Self {
            event_name: None,
            callback: None,
            id: None,
            group: None,
            observe: None,
        }
    }
}

impl<T> RegistrationBuilder<T> {
    /// Set the event to subscribe to (required).
    #[must_use]
    pub fn event_name(mut self, name: impl Into<String>) -> Self {
        self.event_name = Some(name.into());
        self
    }

    /// Set the handler (required).
    #[must_use]
    pub fn callback(mut self, callback: Callback<T>) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Set the slot id (optional).
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = non_empty(id.into());
        self
    }

    /// Set the group (optional).
    #[must_use]
    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = non_empty(group.into());
        self
    }

    /// Set observe tags (optional).
    #[must_use]
    pub fn observe<I, V>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<ObserveTag>,
    {
        self.observe = Some(collect_tags(tags));
        self
    }

    /// Build the registration.
    ///
    /// Returns `ValidationError::MissingField` if the event name or callback is not set.
    /// Returns `ValidationError::EmptyEventName` if the event name is blank.
    pub fn build(self) -> Result<Registration<T>, ValidationError> {
        let event_name = self.event_name.ok_or_else(|| ValidationError::MissingField {
            field: "event_name".to_string(),
        })?;

        if event_name.trim().is_empty() {
            return Err(ValidationError::EmptyEventName);
        }

        let callback = self.callback.ok_or_else(|| ValidationError::MissingField {
            field: "callback".to_string(),
        })?;

        Ok(Registration {
            event_name,
            callback,
            id: self.id,
            group: self.group,
            observe: self.observe,
        })
    }
}

/// Which subscriptions `unregister` removes.
///
/// For a single event the fields are checked in order `callback`, `group`,
/// `id`; the first one present decides. With none present the whole event is
/// cleared.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selector {
    /// Every event, every entry.
    #[default]
    All,
    /// Subscriptions of one event.
    Event {
        #[allow(missing_docs)]
        event_name: String,
        /// Remove this callback from every entry.
        callback: Option<CallbackId>,
        /// Remove entries in this group.
        group: Option<String>,
        /// Remove the entry with this id.
        id: Option<String>,
    },
}

impl Selector {
    /// Select everything.
    #[must_use]
    pub const fn all() -> Self {
        Self::All
    }

    /// Select one event. An empty name selects everything.
    pub fn event(event_name: impl Into<String>) -> Self {
        match non_empty(event_name.into()) {
            Some(event_name) => Self::Event {
                event_name,
                callback: None,
                group: None,
                id: None,
            },
            None => Self::All,
        }
    }

    /// Narrow to one callback. No effect on [`Selector::All`].
    #[must_use]
    pub fn callback<T>(self, cb: &Callback<T>) -> Self {
        self.callback_id(cb.id())
    }

    /// Narrow to one callback by identity. No effect on [`Selector::All`].
    #[must_use]
    pub fn callback_id(mut self, cb: CallbackId) -> Self {
        if let Self::Event { callback, .. } = &mut self {
            *callback = Some(cb);
        }
        self
    }

    /// Narrow to one group. No effect on [`Selector::All`].
    #[must_use]
    pub fn group(mut self, name: impl Into<String>) -> Self {
        if let Self::Event { group, .. } = &mut self {
            *group = non_empty(name.into());
        }
        self
    }

    /// Narrow to one id. No effect on [`Selector::All`].
    #[must_use]
    pub fn id(mut self, value: impl Into<String>) -> Self {
        if let Self::Event { id, .. } = &mut self {
            *id = non_empty(value.into());
        }
        self
    }
}

/// A filtered trigger request.
#[derive(Debug)]
pub struct Trigger<'a, T> {
    /// Event to trigger.
    pub event_name: &'a str,
    /// Payload passed to every invoked callback.
    pub data: &'a T,
    /// Requested tags. Empty means "everyone".
    pub observe: Vec<ObserveTag>,
}

impl<'a, T> Trigger<'a, T> {
    /// Trigger without a tag filter.
    pub const fn new(event_name: &'a str, data: &'a T) -> Self {
        Self {
            event_name,
            data,
            observe: Vec::new(),
        }
    }

    /// Restrict delivery to entries observing one of `tags` (and untagged entries).
    #[must_use]
    pub fn with_observe<I, V>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<ObserveTag>,
    {
        self.observe = collect_tags(tags);
        self
    }
}

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, TryRecvError, TrySendError};

use crate::error::{EventError, EventResult};
use crate::tag::ObserveTag;

use super::callback::{Callback, CallbackId};
use super::dispatcher::{EventRegistry, WeakRegistry};
use super::registration::{Registration, Selector};

/// A channel subscription to one event.
///
/// Payloads are cloned into a bounded buffer during dispatch. Dispatch never
/// blocks on a slow reader: payloads that do not fit are dropped and counted.
///
/// Dropping this stream unregisters it. The stream does not keep its registry
/// alive, so it may be moved into a callback on that same registry; once the
/// registry is gone, `recv` reports [`EventError::Disconnected`] after the
/// buffer drains.
#[derive(Debug)]
pub struct EventStream<T> {
    event_name: String,
    callback_id: CallbackId,
    rx: Receiver<T>,
    registry: WeakRegistry<T>,
    dropped: Arc<AtomicU64>,
    unregistered: AtomicBool,
}

impl<T> EventStream<T> {
    #[allow(missing_docs)]
    #[must_use]
    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    /// Identity of the callback feeding this stream.
    #[must_use]
    pub const fn callback_id(&self) -> CallbackId {
        self.callback_id
    }

    /// Payloads lost because the buffer was full or the stream was already
    /// closed when a pass delivered.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Remove the subscription. Idempotent.
    ///
    /// Payloads already buffered can still be received afterwards.
    pub fn unsubscribe(&self) {
        if self.unregistered.swap(true, Ordering::AcqRel) {
            return;
        }

        if let Some(registry) = self.registry.upgrade() {
            registry.unregister(Selector::event(self.event_name.as_str()).callback_id(self.callback_id));
        }
    }

    /// Receive the next payload (blocking).
    ///
    /// Blocks forever if nothing is dispatched; prefer [`EventStream::recv_timeout`]
    /// unless another thread feeds the event.
    pub fn recv(&self) -> EventResult<T> {
        self.rx.recv().map_err(|_| EventError::Disconnected {
            path: self.event_name.clone(),
        })
    }

    /// Receive the next payload with a timeout.
    pub fn recv_timeout(&self, timeout: Duration) -> EventResult<T> {
        self.rx.recv_timeout(timeout).map_err(|err| match err {
            RecvTimeoutError::Timeout => EventError::Timeout {
                duration_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            },
            RecvTimeoutError::Disconnected => EventError::Disconnected {
                path: self.event_name.clone(),
            },
        })
    }

    /// Take a buffered payload, if any.
    pub fn try_recv(&self) -> EventResult<Option<T>> {
        match self.rx.try_recv() {
            Ok(v) => Ok(Some(v)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(EventError::Disconnected {
                path: self.event_name.clone(),
            }),
        }
    }

    /// Drain everything currently buffered.
    pub fn drain(&self) -> Vec<T> {
        self.rx.try_iter().collect()
    }
}

impl<T> Drop for EventStream<T> {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl<T: Clone + Send + 'static> EventRegistry<T> {
    /// Subscribe a bounded channel to `event_name`.
    ///
    /// Buffer size comes from `RegistryConfig::stream_capacity`.
    pub fn subscribe_channel(&self, event_name: impl Into<String>) -> EventStream<T> {
        self.open_stream(event_name.into(), None)
    }

    /// Like [`EventRegistry::subscribe_channel`], but the entry observes `tags`
    /// for filtered triggers.
    pub fn subscribe_channel_observing<I, V>(&self, event_name: impl Into<String>, tags: I) -> EventStream<T>
    where
        I: IntoIterator<Item = V>,
        V: Into<ObserveTag>,
    {
        self.open_stream(event_name.into(), Some(tags.into_iter().map(Into::into).collect()))
    }

    fn open_stream(&self, event_name: String, observe: Option<Vec<ObserveTag>>) -> EventStream<T> {
        let (tx, rx) = bounded::<T>(self.config().stream_capacity.max(1));
        let dropped = Arc::new(AtomicU64::new(0));

        let cb_dropped = Arc::clone(&dropped);
        let cb_event = event_name.clone();
        let callback = Callback::new(move |data: &T| match tx.try_send(data.clone()) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                let total = cb_dropped.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::warn!(event = %cb_event, dropped = total, "stream buffer full; payload dropped");
            }
            Err(TrySendError::Disconnected(_)) => {
                let total = cb_dropped.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::debug!(event = %cb_event, dropped = total, "stream receiver gone; payload dropped");
            }
        });

        let callback_id = callback.id();
        let mut registration = Registration::new(event_name.clone(), callback);
        registration.observe = observe;
        self.register(registration);

        EventStream {
            event_name,
            callback_id,
            rx,
            registry: self.downgrade(),
            dropped,
            unregistered: AtomicBool::new(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RegistryConfig;

    #[test]
    fn stream_receives_dispatched_payloads() {
        let reg = EventRegistry::<String>::new();
        let stream = reg.subscribe_channel("greet");
        reg.dispatch("greet", &"hello".to_string()).unwrap();
        assert_eq!(stream.try_recv().unwrap().as_deref(), Some("hello"));
        assert_eq!(stream.try_recv().unwrap(), None);
    }

    #[test]
    fn full_buffer_drops_and_counts() {
        let reg = EventRegistry::<u32>::with_config(RegistryConfig::default().with_stream_capacity(2));
        let stream = reg.subscribe_channel("e");
        for i in 0..5 {
            reg.dispatch("e", &i).unwrap();
        }
        assert_eq!(stream.drain(), vec![0, 1]);
        assert_eq!(stream.dropped(), 3);
    }

    #[test]
    fn recv_timeout_reports_timeout() {
        let reg = EventRegistry::<u32>::new();
        let stream = reg.subscribe_channel("e");
        let err = stream.recv_timeout(Duration::from_millis(5)).unwrap_err();
        assert!(matches!(err, EventError::Timeout { duration_ms: 5 }));
    }

    #[test]
    fn drop_unregisters() {
        let reg = EventRegistry::<u32>::new();
        {
            let _stream = reg.subscribe_channel("e");
            assert!(reg.contains("e"));
        }
        assert!(!reg.contains("e"));
    }

    #[test]
    fn stream_owned_by_its_own_registry_does_not_leak() {
        let reg = EventRegistry::<u32>::new();
        let marker = Arc::new(());
        let stream = reg.subscribe_channel("feed");

        let held = std::sync::Mutex::new((stream, Arc::clone(&marker)));
        reg.register(Registration::new(
            "e",
            Callback::new(move |_: &u32| {
                let _ = held.lock().unwrap().0.drain();
            }),
        ));
        assert!(reg.contains("feed"));
        assert_eq!(Arc::strong_count(&marker), 2);

        drop(reg);
        assert_eq!(Arc::strong_count(&marker), 1);
    }

    #[test]
    fn stream_outliving_its_registry_disconnects() {
        let reg = EventRegistry::<u32>::new();
        let stream = reg.subscribe_channel("e");
        reg.dispatch("e", &1).unwrap();
        drop(reg);

        assert_eq!(stream.try_recv().unwrap(), Some(1));
        assert!(stream.recv().unwrap_err().is_disconnected());
        stream.unsubscribe();
    }

    #[test]
    fn delivery_to_a_stream_dropped_mid_pass_is_not_an_error() {
        let reg = EventRegistry::<u32>::new();
        let slot = Arc::new(std::sync::Mutex::new(None::<EventStream<u32>>));

        let taker = Arc::clone(&slot);
        reg.register(Registration::new(
            "e",
            Callback::new(move |_: &u32| {
                drop(taker.lock().unwrap().take());
            }),
        ));
        *slot.lock().unwrap() = Some(reg.subscribe_channel("e"));

        // The pass still holds the stream's forwarder after its receiver is gone.
        let outcome = reg.dispatch("e", &1).unwrap();
        assert_eq!(outcome.callbacks_invoked, 2);
        assert_eq!(reg.subscriptions("e").unwrap().entries.len(), 1);
    }

    #[test]
    fn unsubscribe_disconnects_after_buffer_drains() {
        let reg = EventRegistry::<u32>::new();
        let stream = reg.subscribe_channel("e");
        reg.dispatch("e", &7).unwrap();
        stream.unsubscribe();
        stream.unsubscribe();
        assert!(!reg.contains("e"));
        assert_eq!(stream.try_recv().unwrap(), Some(7));
        assert!(stream.try_recv().unwrap_err().is_disconnected());
    }
}

//! Synthesis events and the listener dispatch channel
//!
//! Events are delivered strictly in the causal order they occur during a
//! pass: everything attributable to text before an index marker arrives
//! before that marker's `IndexReached`, which arrives before events for the
//! text after it. Delivery is serialized per engine instance in both the
//! blocking and the background case.

use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// One synthesis event delivered to a listener
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthesisEvent {
    /// An index marker was reached; the id is echoed back unmodified
    IndexReached(i32),
    /// A block of raw samples was produced
    AudioBlock(Vec<i16>),
    /// The pass drained the whole queue
    Completed,
    /// The pass ended abnormally; terminal, engine is now stopped
    Failed(FailureReason),
}

/// Why a pass failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// Explicit stop() or a listener's consumed signal
    Cancelled,
    /// Opaque failure from the synthesis backend
    Backend(String),
    /// Listener code panicked inside a handler
    ListenerFault(String),
}

/// Receives synthesis events
///
/// Every handler has a default no-op body, so an implementation may pick
/// any subset. Returning `false` from [`on_index_reached`] tells the engine
/// to stop the pass at that point; it is the only listener-side
/// cancellation mechanism. The return value of [`on_audio_block`] is a
/// consumed signal kept for symmetry and currently ignored.
///
/// [`on_index_reached`]: SynthesisListener::on_index_reached
/// [`on_audio_block`]: SynthesisListener::on_audio_block
pub trait SynthesisListener: Send {
    fn on_index_reached(&mut self, id: i32) -> bool {
        let _ = id;
        true
    }

    fn on_audio_block(&mut self, samples: &[i16]) -> bool {
        let _ = samples;
        true
    }

    fn on_completed(&mut self) {}

    fn on_failed(&mut self, reason: &FailureReason) {
        let _ = reason;
    }
}

/// What the dispatch loop should do after delivering an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Dispatch {
    Continue,
    /// The listener declined an index marker; cancel the pass
    Cancel,
}

pub(crate) type ListenerSlot = Mutex<Option<Box<dyn SynthesisListener>>>;

/// Serialized delivery of events into the registered listener
///
/// The slot mutex is what guarantees no two events for a pass are delivered
/// concurrently. A panic inside a handler is caught here and surfaced as a
/// fault instead of unwinding out of the pass.
pub(crate) struct EventChannel<'a> {
    slot: &'a ListenerSlot,
}

impl<'a> EventChannel<'a> {
    pub(crate) fn new(slot: &'a ListenerSlot) -> Self {
        Self { slot }
    }

    pub(crate) fn dispatch(&self, event: SynthesisEvent) -> Result<Dispatch, FailureReason> {
        let mut guard = self.slot.lock();
        let Some(listener) = guard.as_mut() else {
            // No listener registered; events are dropped on the floor
            return Ok(Dispatch::Continue);
        };

        let outcome = catch_unwind(AssertUnwindSafe(|| match event {
            SynthesisEvent::IndexReached(id) => {
                if listener.on_index_reached(id) {
                    Dispatch::Continue
                } else {
                    Dispatch::Cancel
                }
            }
            SynthesisEvent::AudioBlock(samples) => {
                let _ = listener.on_audio_block(&samples);
                Dispatch::Continue
            }
            SynthesisEvent::Completed => {
                listener.on_completed();
                Dispatch::Continue
            }
            SynthesisEvent::Failed(ref reason) => {
                listener.on_failed(reason);
                Dispatch::Continue
            }
        }));

        match outcome {
            Ok(dispatch) => Ok(dispatch),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::warn!("listener panicked while handling an event: {message}");
                Err(FailureReason::ListenerFault(message))
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        indexes: Vec<i32>,
        blocks: usize,
        completed: bool,
    }

    impl SynthesisListener for Recorder {
        fn on_index_reached(&mut self, id: i32) -> bool {
            self.indexes.push(id);
            id != 99 // 99 triggers the consumed signal
        }

        fn on_audio_block(&mut self, _samples: &[i16]) -> bool {
            self.blocks += 1;
            true
        }

        fn on_completed(&mut self) {
            self.completed = true;
        }
    }

    struct Panicker;

    impl SynthesisListener for Panicker {
        fn on_index_reached(&mut self, _id: i32) -> bool {
            panic!("listener blew up");
        }
    }

    #[test]
    fn dispatch_without_listener_is_a_no_op() {
        let slot: ListenerSlot = Mutex::new(None);
        let channel = EventChannel::new(&slot);
        assert_eq!(
            channel.dispatch(SynthesisEvent::IndexReached(1)),
            Ok(Dispatch::Continue)
        );
    }

    #[test]
    fn index_consumed_signal_maps_to_cancel() {
        let slot: ListenerSlot = Mutex::new(Some(Box::new(Recorder::default())));
        let channel = EventChannel::new(&slot);
        assert_eq!(
            channel.dispatch(SynthesisEvent::IndexReached(5)),
            Ok(Dispatch::Continue)
        );
        assert_eq!(
            channel.dispatch(SynthesisEvent::IndexReached(99)),
            Ok(Dispatch::Cancel)
        );
    }

    #[test]
    fn listener_panic_becomes_fault_not_unwind() {
        let slot: ListenerSlot = Mutex::new(Some(Box::new(Panicker)));
        let channel = EventChannel::new(&slot);
        let err = channel
            .dispatch(SynthesisEvent::IndexReached(1))
            .unwrap_err();
        assert_eq!(err, FailureReason::ListenerFault("listener blew up".into()));
    }

    #[test]
    fn partial_listener_defaults_are_no_ops() {
        struct IndexOnly;
        impl SynthesisListener for IndexOnly {
            fn on_index_reached(&mut self, _id: i32) -> bool {
                true
            }
        }

        let slot: ListenerSlot = Mutex::new(Some(Box::new(IndexOnly)));
        let channel = EventChannel::new(&slot);
        assert_eq!(
            channel.dispatch(SynthesisEvent::AudioBlock(vec![1, 2, 3])),
            Ok(Dispatch::Continue)
        );
        assert_eq!(
            channel.dispatch(SynthesisEvent::Completed),
            Ok(Dispatch::Continue)
        );
        assert_eq!(
            channel.dispatch(SynthesisEvent::Failed(FailureReason::Cancelled)),
            Ok(Dispatch::Continue)
        );
    }
}

//! Synthesis engine: lifecycle state machine and pass driver
//!
//! One engine drives at most one synthesis pass at a time. `synth_sync`
//! runs the pass on the caller's thread and blocks until it ends;
//! `synth_async` hands the same pass loop to an engine-owned thread. The
//! state machine, not locking in application code, is what enforces the
//! single-pass rule.

use crate::backend::{AudioSink, SinkFlow, SpanRequest, SynthesisBackend};
use crate::buffer::OutputBuffer;
use crate::error::{EngineError, EngineResult};
use crate::event::{Dispatch, EventChannel, FailureReason, ListenerSlot, SynthesisEvent, SynthesisListener};
use crate::queue::{TextQueue, TextQueueItem};
use crate::types::{EngineFlags, InputType, SynthMode, RUNTIME_VERSION};
use crate::voice::Voice;
use crossbeam_channel::{Receiver, Sender};
use parking_lot::{Condvar, Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Lifecycle state of a [`SynthesisEngine`]; the single source of truth
/// gating which operations are legal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Nothing queued, no pass running
    Idle,
    /// Work is queued, no pass running yet
    Buffering,
    /// A pass is draining the queue
    Synthesizing,
    /// A pass is suspended; held audio is not lost
    Paused,
    /// A pass was stopped or faulted; reset() required before reuse
    Stopped,
}

/// Answer from a mid-pass cancellation/pause checkpoint
enum PassGate {
    Run,
    Cancelled,
}

/// Shared lifecycle control: the state cell, its observation feed, the
/// pause condvar, and the cancel flag stop() raises mid-pass
struct Control {
    state: Mutex<EngineState>,
    resumed: Condvar,
    cancel: AtomicBool,
    state_tx: Sender<EngineState>,
    state_rx: Receiver<EngineState>,
}

impl Control {
    fn new() -> Self {
        let (state_tx, state_rx) = crossbeam_channel::unbounded();
        Self {
            state: Mutex::new(EngineState::Idle),
            resumed: Condvar::new(),
            cancel: AtomicBool::new(false),
            state_tx,
            state_rx,
        }
    }

    /// Commit a transition under an already-held state lock and publish it
    fn transition(&self, state: &mut EngineState, new: EngineState) {
        if *state == new {
            return;
        }
        tracing::info!("engine state {:?} -> {:?}", *state, new);
        *state = new;
        let _ = self.state_tx.send(new);
    }

    /// Called between events by the pass driver: observes a pending stop
    /// request and parks while the engine is paused. Held audio is simply
    /// retained by whoever produced it until this returns `Run`.
    fn checkpoint(&self) -> PassGate {
        if self.cancel.load(Ordering::SeqCst) {
            return PassGate::Cancelled;
        }
        let mut state = self.state.lock();
        while *state == EngineState::Paused {
            self.resumed.wait(&mut state);
            if self.cancel.load(Ordering::SeqCst) {
                return PassGate::Cancelled;
            }
        }
        PassGate::Run
    }
}

struct Shared {
    control: Control,
    queue: Mutex<TextQueue>,
    listener: ListenerSlot,
    backend: Mutex<Box<dyn SynthesisBackend>>,
    active_voice: RwLock<Voice>,
    flags: RwLock<EngineFlags>,
    last_index: Mutex<Option<i32>>,
}

impl Shared {
    fn dispatch(&self, event: SynthesisEvent) -> Result<Dispatch, FailureReason> {
        EventChannel::new(&self.listener).dispatch(event)
    }

    fn span_request(&self) -> SpanRequest {
        let voice = self.active_voice.read();
        SpanRequest {
            voice_id: voice.id(),
            values: voice.snapshot(),
            flags: *self.flags.read(),
        }
    }

    /// Drain/dispatch loop for one synthesis pass. Runs on the caller's
    /// thread for `synth_sync` and on the engine's worker thread for
    /// `synth_async`; entered only after `begin_pass` committed the
    /// Buffering -> Synthesizing transition.
    fn run_pass(&self) -> EngineResult<()> {
        loop {
            if let PassGate::Cancelled = self.control.checkpoint() {
                return self.fail_pass(FailureReason::Cancelled);
            }

            let item = self.queue.lock().drain_next();
            let Some(item) = item else {
                break;
            };

            match item {
                TextQueueItem::Index(id) => {
                    *self.last_index.lock() = Some(id);
                    match self.dispatch(SynthesisEvent::IndexReached(id)) {
                        Ok(Dispatch::Continue) => {}
                        Ok(Dispatch::Cancel) => {
                            tracing::debug!("listener declined index {id}, cancelling pass");
                            return self.fail_pass(FailureReason::Cancelled);
                        }
                        Err(fault) => return self.fail_pass(fault),
                    }
                }
                TextQueueItem::Text(text) => {
                    let request = self.span_request();
                    let mut sink = PassSink {
                        shared: self,
                        failure: None,
                    };
                    let rendered = self
                        .backend
                        .lock()
                        .synthesize(&text, &request, &mut sink);
                    if let Some(failure) = sink.failure {
                        return self.fail_pass(failure);
                    }
                    if let Err(err) = rendered {
                        return self.fail_pass(FailureReason::Backend(err.to_string()));
                    }
                }
            }
        }

        // Queue drained; one last look at the cancel flag so a stop that
        // raced the final span still wins.
        if let PassGate::Cancelled = self.control.checkpoint() {
            return self.fail_pass(FailureReason::Cancelled);
        }

        if let Err(fault) = self.dispatch(SynthesisEvent::Completed) {
            return self.fail_pass(fault);
        }

        let mut state = self.control.state.lock();
        self.control.transition(&mut state, EngineState::Idle);
        tracing::debug!("synthesis pass completed");
        Ok(())
    }

    /// Terminal failure path: deliver `Failed` exactly once, discard the
    /// remaining queue, and park the engine in `Stopped`
    fn fail_pass(&self, reason: FailureReason) -> EngineResult<()> {
        tracing::warn!(?reason, "synthesis pass failed");
        if let Err(fault) = self.dispatch(SynthesisEvent::Failed(reason.clone())) {
            // A listener that faults while being told about a failure gets
            // logged, not a second Failed event.
            tracing::warn!(?fault, "listener faulted while handling Failed");
        }
        self.queue.lock().clear();
        let mut state = self.control.state.lock();
        self.control.transition(&mut state, EngineState::Stopped);
        drop(state);
        Err(reason.into())
    }
}

/// Sink handed to the backend for one span: forwards each block as an
/// `AudioBlock` event and folds the stop/pause checkpoint into the
/// backend's flow control
struct PassSink<'a> {
    shared: &'a Shared,
    failure: Option<FailureReason>,
}

impl AudioSink for PassSink<'_> {
    fn push(&mut self, samples: Vec<i16>) -> SinkFlow {
        if self.failure.is_some() {
            return SinkFlow::Stop;
        }
        if let PassGate::Cancelled = self.shared.control.checkpoint() {
            self.failure = Some(FailureReason::Cancelled);
            return SinkFlow::Stop;
        }
        if samples.is_empty() {
            return SinkFlow::Continue;
        }
        match self.shared.dispatch(SynthesisEvent::AudioBlock(samples)) {
            Ok(_) => SinkFlow::Continue,
            Err(fault) => {
                self.failure = Some(fault);
                SinkFlow::Stop
            }
        }
    }
}

/// Synthesis-control engine over an opaque backend
///
/// All methods take `&self`; share the engine across threads with an `Arc`
/// when `stop()` or `pause()` must be reachable while `synth_sync` blocks.
pub struct SynthesisEngine {
    shared: Arc<Shared>,
    voices: Vec<Voice>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SynthesisEngine {
    /// Build an engine over a backend. The backend's first declared voice
    /// becomes the active one.
    pub fn new(backend: Box<dyn SynthesisBackend>) -> EngineResult<Self> {
        let templates = backend.voices();
        if templates.is_empty() {
            return Err(EngineError::BackendFailure(format!(
                "backend '{}' declares no voices",
                backend.name()
            )));
        }
        let voices: Vec<Voice> = templates.iter().map(Voice::from_template).collect();
        let active = voices[0].clone();
        tracing::debug!(
            backend = backend.name(),
            voices = voices.len(),
            "engine created"
        );
        Ok(Self {
            shared: Arc::new(Shared {
                control: Control::new(),
                queue: Mutex::new(TextQueue::new()),
                listener: Mutex::new(None),
                backend: Mutex::new(backend),
                active_voice: RwLock::new(active),
                flags: RwLock::new(EngineFlags::default()),
                last_index: Mutex::new(None),
            }),
            voices,
            worker: Mutex::new(None),
        })
    }

    /// Runtime version string
    pub fn version() -> &'static str {
        RUNTIME_VERSION
    }

    pub fn backend_name(&self) -> String {
        self.shared.backend.lock().name().to_string()
    }

    pub fn state(&self) -> EngineState {
        *self.shared.control.state.lock()
    }

    /// Whether a pass is in progress (paused counts)
    pub fn speaking(&self) -> bool {
        matches!(
            self.state(),
            EngineState::Synthesizing | EngineState::Paused
        )
    }

    /// Feed of committed state transitions
    pub fn subscribe(&self) -> Receiver<EngineState> {
        self.shared.control.state_rx.clone()
    }

    /// Id of the most recently reached index marker, if any
    pub fn last_index(&self) -> Option<i32> {
        *self.shared.last_index.lock()
    }

    /// Number of queued items not yet drained
    pub fn pending_items(&self) -> usize {
        self.shared.queue.lock().len()
    }

    /// Queue a text span for the next pass. Empty spans are accepted and
    /// ignored.
    pub fn add_text(&self, text: &str) -> EngineResult<()> {
        let mut state = self.shared.control.state.lock();
        match *state {
            EngineState::Stopped => Err(EngineError::EngineStopped),
            EngineState::Synthesizing | EngineState::Paused => Err(EngineError::EngineBusy),
            EngineState::Idle | EngineState::Buffering => {
                let mut queue = self.shared.queue.lock();
                queue.enqueue_text(text);
                if !queue.is_empty() {
                    self.shared.control.transition(&mut state, EngineState::Buffering);
                }
                Ok(())
            }
        }
    }

    /// Queue an index marker; its id is echoed back in `IndexReached`
    pub fn insert_index(&self, id: i32) -> EngineResult<()> {
        let mut state = self.shared.control.state.lock();
        match *state {
            EngineState::Stopped => Err(EngineError::EngineStopped),
            EngineState::Synthesizing | EngineState::Paused => Err(EngineError::EngineBusy),
            EngineState::Idle | EngineState::Buffering => {
                self.shared.queue.lock().enqueue_index(id);
                self.shared.control.transition(&mut state, EngineState::Buffering);
                Ok(())
            }
        }
    }

    /// Discard everything queued without starting a pass
    pub fn clear_input(&self) -> EngineResult<()> {
        let mut state = self.shared.control.state.lock();
        match *state {
            EngineState::Stopped => Err(EngineError::EngineStopped),
            EngineState::Synthesizing | EngineState::Paused => Err(EngineError::EngineBusy),
            EngineState::Idle | EngineState::Buffering => {
                self.shared.queue.lock().clear();
                self.shared.control.transition(&mut state, EngineState::Idle);
                Ok(())
            }
        }
    }

    /// Register the listener events are delivered to, replacing any
    /// previous one
    pub fn set_listener(&self, listener: Box<dyn SynthesisListener>) -> EngineResult<()> {
        let state = self.shared.control.state.lock();
        match *state {
            EngineState::Stopped => Err(EngineError::EngineStopped),
            EngineState::Synthesizing | EngineState::Paused => Err(EngineError::EngineBusy),
            EngineState::Idle | EngineState::Buffering => {
                *self.shared.listener.lock() = Some(listener);
                Ok(())
            }
        }
    }

    /// Install an [`OutputBuffer`] as the listener and hand back a shared
    /// handle to its storage
    pub fn set_output_buffer(&self, capacity_hint: usize) -> EngineResult<OutputBuffer> {
        let buffer = OutputBuffer::new(capacity_hint);
        self.set_listener(Box::new(buffer.clone()))?;
        Ok(buffer)
    }

    /// Number of predefined voices the backend declared
    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    /// Fetch a predefined voice. Indices are 1-based, matching the
    /// backend's declared order.
    pub fn get_voice(&self, index: usize) -> EngineResult<Voice> {
        index
            .checked_sub(1)
            .and_then(|i| self.voices.get(i))
            .cloned()
            .ok_or(EngineError::VoiceNotFound(index))
    }

    /// Handle to the currently active voice
    pub fn active_voice(&self) -> Voice {
        self.shared.active_voice.read().clone()
    }

    /// Make `voice` the active one. The previous voice stays valid and can
    /// be reactivated later. Refused mid-pass: the backend's behavior for
    /// mid-utterance voice swaps is undefined, so it is an error here
    /// rather than a silent deferral.
    pub fn set_active_voice(&self, voice: &Voice) -> EngineResult<()> {
        let state = self.shared.control.state.lock();
        match *state {
            EngineState::Stopped => Err(EngineError::EngineStopped),
            EngineState::Synthesizing | EngineState::Paused => Err(EngineError::EngineBusy),
            EngineState::Idle | EngineState::Buffering => {
                *self.shared.active_voice.write() = voice.clone();
                Ok(())
            }
        }
    }

    pub fn real_world_units(&self) -> bool {
        self.shared.flags.read().real_world_units
    }

    pub fn set_real_world_units(&self, value: bool) -> EngineResult<()> {
        self.mutate_flags(|flags| flags.real_world_units = value)
    }

    pub fn synth_mode(&self) -> SynthMode {
        self.shared.flags.read().synth_mode
    }

    pub fn set_synth_mode(&self, mode: SynthMode) -> EngineResult<()> {
        self.mutate_flags(|flags| flags.synth_mode = mode)
    }

    pub fn input_type(&self) -> InputType {
        self.shared.flags.read().input_type
    }

    pub fn set_input_type(&self, input_type: InputType) -> EngineResult<()> {
        self.mutate_flags(|flags| flags.input_type = input_type)
    }

    fn mutate_flags(&self, apply: impl FnOnce(&mut EngineFlags)) -> EngineResult<()> {
        let state = self.shared.control.state.lock();
        if *state == EngineState::Stopped {
            return Err(EngineError::EngineStopped);
        }
        drop(state);
        apply(&mut self.shared.flags.write());
        Ok(())
    }

    /// Commit Buffering -> Synthesizing, refusing when the queue is empty
    /// or another pass is active
    fn begin_pass(&self) -> EngineResult<()> {
        let mut state = self.shared.control.state.lock();
        match *state {
            EngineState::Stopped => Err(EngineError::EngineStopped),
            EngineState::Synthesizing | EngineState::Paused => Err(EngineError::EngineBusy),
            EngineState::Idle | EngineState::Buffering => {
                if self.shared.queue.lock().is_empty() {
                    return Err(EngineError::EmptyQueue);
                }
                self.shared.control.cancel.store(false, Ordering::SeqCst);
                *self.shared.last_index.lock() = None;
                self.shared.control.transition(&mut state, EngineState::Synthesizing);
                Ok(())
            }
        }
    }

    /// Run a pass on the calling thread, blocking until the engine reaches
    /// `Idle` (success) or `Stopped` (failure/cancel). Every event is
    /// delivered on this thread, in causal order, before this returns.
    pub fn synth_sync(&self) -> EngineResult<()> {
        self.begin_pass()?;
        tracing::debug!("starting synchronous synthesis pass");
        self.shared.run_pass()
    }

    /// Start a pass on an engine-owned thread and return immediately.
    /// Failures surface only through the `Failed` event, never here.
    pub fn synth_async(&self) -> EngineResult<()> {
        self.begin_pass()?;
        tracing::debug!("starting background synthesis pass");
        let shared = Arc::clone(&self.shared);
        let handle = std::thread::spawn(move || {
            if let Err(err) = shared.run_pass() {
                tracing::debug!("background pass ended: {err}");
            }
        });
        // A finished handle from an earlier pass is dropped here; the
        // state machine guarantees that thread has already transitioned
        // the engine out of Synthesizing.
        *self.worker.lock() = Some(handle);
        Ok(())
    }

    /// Suspend the in-progress pass; legal only while `Synthesizing`
    pub fn pause(&self) -> EngineResult<()> {
        let mut state = self.shared.control.state.lock();
        match *state {
            EngineState::Synthesizing => {
                self.shared.control.transition(&mut state, EngineState::Paused);
                Ok(())
            }
            EngineState::Stopped => Err(EngineError::EngineStopped),
            _ => Err(EngineError::EngineBusy),
        }
    }

    /// Resume a paused pass
    pub fn resume(&self) -> EngineResult<()> {
        let mut state = self.shared.control.state.lock();
        match *state {
            EngineState::Paused => {
                self.shared.control.transition(&mut state, EngineState::Synthesizing);
                self.shared.control.resumed.notify_all();
                Ok(())
            }
            EngineState::Stopped => Err(EngineError::EngineStopped),
            _ => Err(EngineError::EngineBusy),
        }
    }

    /// Stop the engine. With a pass in progress this raises the cancel
    /// flag and returns; the pass thread delivers `Failed(Cancelled)`,
    /// discards the queue, and parks the engine in `Stopped`. With no pass
    /// in progress the engine goes to `Stopped` directly. Safe to call
    /// concurrently with a blocked `synth_sync`.
    pub fn stop(&self) -> EngineResult<()> {
        let mut state = self.shared.control.state.lock();
        match *state {
            EngineState::Stopped => Err(EngineError::EngineStopped),
            EngineState::Idle | EngineState::Buffering => {
                self.shared.queue.lock().clear();
                self.shared.control.transition(&mut state, EngineState::Stopped);
                Ok(())
            }
            EngineState::Synthesizing | EngineState::Paused => {
                tracing::debug!("stop requested during active pass");
                self.shared.control.cancel.store(true, Ordering::SeqCst);
                self.shared.control.resumed.notify_all();
                Ok(())
            }
        }
    }

    /// Return a stopped (or idle) engine to `Idle`, clearing the queue and
    /// any pending cancel request. Refused while a pass is active.
    pub fn reset(&self) -> EngineResult<()> {
        {
            let mut state = self.shared.control.state.lock();
            match *state {
                EngineState::Synthesizing | EngineState::Paused => {
                    return Err(EngineError::EngineBusy)
                }
                EngineState::Idle | EngineState::Buffering | EngineState::Stopped => {
                    self.shared.queue.lock().clear();
                    self.shared.control.cancel.store(false, Ordering::SeqCst);
                    *self.shared.last_index.lock() = None;
                    self.shared.control.transition(&mut state, EngineState::Idle);
                }
            }
        }
        // Reap the worker from a finished background pass, if any
        if let Some(handle) = self.worker.lock().take() {
            let _ = handle.join();
        }
        Ok(())
    }
}

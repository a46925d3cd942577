//! Synthesis-control runtime for text-to-speech backends
//!
//! This crate provides everything between caller code and an opaque
//! synthesis backend: the text/index work queue, the engine lifecycle
//! state machine, ordered position-correlated event delivery to a
//! listener, mutable voice parameters with backend-declared ranges, and a
//! reference in-memory listener.
//!
//! The backend itself (the DSP that turns text into PCM) stays behind the
//! narrow [`SynthesisBackend`] contract; see the `vocalis-tone` crate for
//! a deterministic reference implementation.

pub mod backend;
pub mod buffer;
pub mod engine;
pub mod error;
pub mod event;
pub mod queue;
pub mod types;
pub mod voice;

pub use backend::{AudioSink, BackendError, SinkFlow, SpanRequest, SynthesisBackend};
pub use buffer::OutputBuffer;
pub use engine::{EngineState, SynthesisEngine};
pub use error::{EngineError, EngineResult};
pub use event::{FailureReason, SynthesisEvent, SynthesisListener};
pub use queue::{TextQueue, TextQueueItem};
pub use types::{EngineFlags, InputType, SynthMode, RUNTIME_VERSION};
pub use voice::{
    ParamRange, ParameterField, ParameterRanges, ParameterValues, Voice, VoiceGender,
    VoiceIdentity, VoiceTemplate,
};

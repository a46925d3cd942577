//! Narrow call contract between the engine and a synthesis backend
//!
//! A backend declares its predefined voice table (identities, parameter
//! ranges, defaults) and renders one text span at a time, streaming raw
//! sample blocks into an [`AudioSink`]. The sink's return value is the
//! early-termination path: once it answers [`SinkFlow::Stop`] the backend
//! must stop producing and return.

use crate::types::EngineFlags;
use crate::voice::{ParameterValues, VoiceTemplate};
use thiserror::Error;

/// Backend error types
#[derive(Error, Debug)]
pub enum BackendError {
    /// Rendering failed partway through a span
    #[error("synthesis failed: {0}")]
    Synthesis(String),

    /// The backend cannot service requests at all
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// Flow-control answer from an [`AudioSink::push`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkFlow {
    Continue,
    /// Stop producing audio for this span and return
    Stop,
}

/// Receives sample blocks as the backend produces them
pub trait AudioSink {
    fn push(&mut self, samples: Vec<i16>) -> SinkFlow;
}

/// Everything a backend needs to render one span: the voice values as they
/// were when the span was drained, plus the engine-wide flags
#[derive(Debug, Clone, Copy)]
pub struct SpanRequest {
    pub voice_id: u32,
    pub values: ParameterValues,
    pub flags: EngineFlags,
}

/// Opaque native synthesis capability
///
/// Implementations must declare at least one voice. `synthesize` is called
/// from whichever thread drives the synthesis pass and may block; it must
/// honor [`SinkFlow::Stop`] promptly so `stop()` can cancel a pass.
pub trait SynthesisBackend: Send {
    /// Backend name/identifier
    fn name(&self) -> &str;

    /// Predefined voice table. Index order here is the order
    /// `SynthesisEngine::get_voice` exposes.
    fn voices(&self) -> Vec<VoiceTemplate>;

    /// Render one text span into the sink
    fn synthesize(
        &mut self,
        text: &str,
        request: &SpanRequest,
        sink: &mut dyn AudioSink,
    ) -> Result<(), BackendError>;
}

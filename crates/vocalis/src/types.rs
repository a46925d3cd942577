//! Engine-wide flags and runtime constants

use serde::{Deserialize, Serialize};

/// Runtime version string exposed to callers
pub const RUNTIME_VERSION: &str = env!("CARGO_PKG_VERSION");

/// How synthesis is triggered for queued text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SynthMode {
    /// Synthesize sentence by sentence as the backend segments the input
    #[default]
    Sentence,
    /// Synthesize only on an explicit trigger
    Manual,
}

/// How queued text is interpreted by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InputType {
    /// Plain text
    #[default]
    Plain,
    /// Text with inline annotation directives
    Annotated,
}

/// Engine-wide flags, snapshotted per text span and handed to the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EngineFlags {
    /// Interpret parameter values in real-world units (e.g. words per
    /// minute) rather than backend-native steps
    pub real_world_units: bool,
    pub synth_mode: SynthMode,
    pub input_type: InputType,
}

//! Voice identity and mutable synthesis parameters
//!
//! A [`Voice`] is a cheaply cloneable handle over shared parameter state.
//! Identity fields are fixed when the voice is obtained from the engine;
//! the numeric fields are range-checked against the table the backend
//! declared for that voice. Out-of-range writes are rejected all-or-nothing
//! and never disturb the stored value.

use crate::error::{EngineError, EngineResult};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// The mutable numeric fields of a voice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParameterField {
    Speed,
    Pitch,
    Volume,
    Breathiness,
    HeadSize,
    Roughness,
}

impl fmt::Display for ParameterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParameterField::Speed => "speed",
            ParameterField::Pitch => "pitch",
            ParameterField::Volume => "volume",
            ParameterField::Breathiness => "breathiness",
            ParameterField::HeadSize => "head size",
            ParameterField::Roughness => "roughness",
        };
        f.write_str(name)
    }
}

/// Inclusive valid range for one parameter field, declared by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamRange {
    pub min: i32,
    pub max: i32,
}

impl ParamRange {
    pub fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: i32) -> bool {
        value >= self.min && value <= self.max
    }
}

impl fmt::Display for ParamRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.min, self.max)
    }
}

/// Voice gender categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoiceGender {
    Male,
    Female,
    Neutral,
    Unknown,
}

/// Immutable identity of a voice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceIdentity {
    /// Backend-assigned voice id
    pub id: u32,
    /// Human-readable voice name
    pub name: String,
    /// Language code (e.g. "en-US")
    pub language: String,
    pub gender: VoiceGender,
}

/// Current values of every mutable field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterValues {
    pub speed: i32,
    pub pitch: i32,
    pub volume: i32,
    pub breathiness: i32,
    pub head_size: i32,
    pub roughness: i32,
}

impl ParameterValues {
    pub fn get(&self, field: ParameterField) -> i32 {
        match field {
            ParameterField::Speed => self.speed,
            ParameterField::Pitch => self.pitch,
            ParameterField::Volume => self.volume,
            ParameterField::Breathiness => self.breathiness,
            ParameterField::HeadSize => self.head_size,
            ParameterField::Roughness => self.roughness,
        }
    }

    fn slot_mut(&mut self, field: ParameterField) -> &mut i32 {
        match field {
            ParameterField::Speed => &mut self.speed,
            ParameterField::Pitch => &mut self.pitch,
            ParameterField::Volume => &mut self.volume,
            ParameterField::Breathiness => &mut self.breathiness,
            ParameterField::HeadSize => &mut self.head_size,
            ParameterField::Roughness => &mut self.roughness,
        }
    }
}

/// Valid range per mutable field, declared by the backend per voice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterRanges {
    pub speed: ParamRange,
    pub pitch: ParamRange,
    pub volume: ParamRange,
    pub breathiness: ParamRange,
    pub head_size: ParamRange,
    pub roughness: ParamRange,
}

impl ParameterRanges {
    pub fn range(&self, field: ParameterField) -> ParamRange {
        match field {
            ParameterField::Speed => self.speed,
            ParameterField::Pitch => self.pitch,
            ParameterField::Volume => self.volume,
            ParameterField::Breathiness => self.breathiness,
            ParameterField::HeadSize => self.head_size,
            ParameterField::Roughness => self.roughness,
        }
    }
}

/// A predefined voice as declared by a backend: identity, valid ranges,
/// and default parameter values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceTemplate {
    pub identity: VoiceIdentity,
    pub ranges: ParameterRanges,
    pub defaults: ParameterValues,
}

#[derive(Debug)]
struct VoiceInner {
    identity: VoiceIdentity,
    ranges: ParameterRanges,
    values: RwLock<ParameterValues>,
}

/// Handle to one voice's shared state
///
/// Clones refer to the same underlying voice. Reads never fail; writes are
/// serialized per voice and validated against the declared range.
#[derive(Debug, Clone)]
pub struct Voice {
    inner: Arc<VoiceInner>,
}

impl Voice {
    pub(crate) fn from_template(template: &VoiceTemplate) -> Self {
        Self {
            inner: Arc::new(VoiceInner {
                identity: template.identity.clone(),
                ranges: template.ranges,
                values: RwLock::new(template.defaults),
            }),
        }
    }

    pub fn identity(&self) -> &VoiceIdentity {
        &self.inner.identity
    }

    pub fn id(&self) -> u32 {
        self.inner.identity.id
    }

    pub fn name(&self) -> &str {
        &self.inner.identity.name
    }

    pub fn language(&self) -> &str {
        &self.inner.identity.language
    }

    pub fn gender(&self) -> VoiceGender {
        self.inner.identity.gender
    }

    pub fn ranges(&self) -> &ParameterRanges {
        &self.inner.ranges
    }

    /// Read one field. Never fails.
    pub fn get(&self, field: ParameterField) -> i32 {
        self.inner.values.read().get(field)
    }

    /// Write one field, validating against the backend-declared range.
    /// On rejection the stored value is left untouched.
    pub fn set(&self, field: ParameterField, value: i32) -> EngineResult<()> {
        let range = self.inner.ranges.range(field);
        if !range.contains(value) {
            return Err(EngineError::InvalidParameterValue {
                field,
                value,
                range,
            });
        }
        *self.inner.values.write().slot_mut(field) = value;
        Ok(())
    }

    pub fn speed(&self) -> i32 {
        self.get(ParameterField::Speed)
    }

    pub fn set_speed(&self, value: i32) -> EngineResult<()> {
        self.set(ParameterField::Speed, value)
    }

    pub fn pitch(&self) -> i32 {
        self.get(ParameterField::Pitch)
    }

    pub fn set_pitch(&self, value: i32) -> EngineResult<()> {
        self.set(ParameterField::Pitch, value)
    }

    pub fn volume(&self) -> i32 {
        self.get(ParameterField::Volume)
    }

    pub fn set_volume(&self, value: i32) -> EngineResult<()> {
        self.set(ParameterField::Volume, value)
    }

    pub fn breathiness(&self) -> i32 {
        self.get(ParameterField::Breathiness)
    }

    pub fn set_breathiness(&self, value: i32) -> EngineResult<()> {
        self.set(ParameterField::Breathiness, value)
    }

    pub fn head_size(&self) -> i32 {
        self.get(ParameterField::HeadSize)
    }

    pub fn set_head_size(&self, value: i32) -> EngineResult<()> {
        self.set(ParameterField::HeadSize, value)
    }

    pub fn roughness(&self) -> i32 {
        self.get(ParameterField::Roughness)
    }

    pub fn set_roughness(&self, value: i32) -> EngineResult<()> {
        self.set(ParameterField::Roughness, value)
    }

    /// Copy of the current values, taken when a text span is drained so
    /// later mutations cannot alter in-flight audio.
    pub(crate) fn snapshot(&self) -> ParameterValues {
        *self.inner.values.read()
    }

    /// Whether two handles refer to the same underlying voice
    pub fn same_voice(&self, other: &Voice) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

//! Deterministic tone backend for the vocalis runtime
//!
//! Renders each text span as a fixed-shape pulse tone whose length, pitch,
//! and amplitude derive from the span and the voice parameters. The output
//! is not speech; it exists so the synthesis-control runtime has a concrete,
//! fully deterministic backend to drive in integration tests and demos.

use tracing::debug;
use vocalis::{
    AudioSink, BackendError, ParamRange, ParameterRanges, ParameterValues, SinkFlow, SpanRequest,
    SynthesisBackend, VoiceGender, VoiceIdentity, VoiceTemplate,
};

mod tests;

/// Output sample rate, matching the classic 11.025 kHz TTS runtimes
pub const SAMPLE_RATE: u32 = 11_025;

/// Samples per block pushed into the sink
const BLOCK_LEN: usize = 1_024;

pub struct ToneBackend {
    sample_rate: u32,
    block_len: usize,
}

impl Default for ToneBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ToneBackend {
    pub fn new() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            block_len: BLOCK_LEN,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn voice(id: u32, name: &str, gender: VoiceGender, pitch: i32, head_size: i32) -> VoiceTemplate {
        VoiceTemplate {
            identity: VoiceIdentity {
                id,
                name: name.into(),
                language: "en-US".into(),
                gender,
            },
            ranges: ParameterRanges {
                speed: ParamRange::new(0, 250),
                pitch: ParamRange::new(0, 100),
                volume: ParamRange::new(0, 100),
                breathiness: ParamRange::new(0, 100),
                head_size: ParamRange::new(0, 100),
                roughness: ParamRange::new(0, 100),
            },
            defaults: ParameterValues {
                speed: 50,
                pitch,
                volume: 92,
                breathiness: 0,
                head_size,
                roughness: 0,
            },
        }
    }

    /// How many samples one non-whitespace character occupies at the given
    /// speed setting. Speed 50 is roughly ten characters per second.
    fn samples_per_char(&self, speed: i32) -> usize {
        let speed = speed.max(1) as usize;
        ((self.sample_rate as usize * 50) / (speed * 10)).max(1)
    }

    /// Pulse frequency in Hz; higher pitch raises it, a bigger head lowers it
    fn frequency(values: &ParameterValues) -> usize {
        (60 + values.pitch as usize * 4).saturating_sub(values.head_size as usize).max(40)
    }
}

impl SynthesisBackend for ToneBackend {
    fn name(&self) -> &str {
        "tone"
    }

    fn voices(&self) -> Vec<VoiceTemplate> {
        vec![
            Self::voice(1, "Reed", VoiceGender::Male, 65, 50),
            Self::voice(2, "Shelley", VoiceGender::Female, 81, 44),
            Self::voice(3, "Sandy", VoiceGender::Neutral, 93, 36),
        ]
    }

    fn synthesize(
        &mut self,
        text: &str,
        request: &SpanRequest,
        sink: &mut dyn AudioSink,
    ) -> Result<(), BackendError> {
        let chars = text.chars().filter(|c| !c.is_whitespace()).count();
        if chars == 0 {
            return Ok(());
        }
        let values = &request.values;
        let total = chars * self.samples_per_char(values.speed);
        let period = (self.sample_rate as usize / Self::frequency(values)).max(2);
        let amplitude = (values.volume * 300).min(30_000) as i16;
        // Roughness skews the pulse duty cycle away from a clean square
        let duty = (period / 2).saturating_sub(period * values.roughness as usize / 400);
        let breathiness = values.breathiness as i32;
        // Deterministic noise source so identical requests render identically
        let mut noise_state: u32 = 0x9E37_79B9 ^ (request.voice_id.wrapping_mul(chars as u32));

        debug!(
            voice = request.voice_id,
            chars,
            total,
            "rendering span as tone"
        );

        let mut emitted = 0usize;
        while emitted < total {
            let len = self.block_len.min(total - emitted);
            let mut block = Vec::with_capacity(len);
            for i in 0..len {
                let phase = (emitted + i) % period;
                let pulse = if phase < duty { amplitude } else { -amplitude };
                // xorshift32
                noise_state ^= noise_state << 13;
                noise_state ^= noise_state >> 17;
                noise_state ^= noise_state << 5;
                let noise = ((noise_state & 0xFFFF) as i32 - 0x8000) * breathiness / 100;
                let sample = (pulse as i32 * (100 - breathiness) / 100 + noise / 2)
                    .clamp(i16::MIN as i32, i16::MAX as i32) as i16;
                block.push(sample);
            }
            emitted += len;
            if sink.push(block) == SinkFlow::Stop {
                debug!("sink requested early termination");
                return Ok(());
            }
        }
        Ok(())
    }
}

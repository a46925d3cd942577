//! Tests for the tone backend

#[cfg(test)]
mod tests {
    use crate::{ToneBackend, SAMPLE_RATE};
    use vocalis::{
        AudioSink, EngineFlags, SinkFlow, SpanRequest, SynthesisBackend, VoiceGender,
    };

    struct Collector {
        samples: Vec<i16>,
        blocks: usize,
        stop_after_blocks: Option<usize>,
    }

    impl Collector {
        fn new() -> Self {
            Self {
                samples: Vec::new(),
                blocks: 0,
                stop_after_blocks: None,
            }
        }
    }

    impl AudioSink for Collector {
        fn push(&mut self, samples: Vec<i16>) -> SinkFlow {
            self.samples.extend_from_slice(&samples);
            self.blocks += 1;
            match self.stop_after_blocks {
                Some(limit) if self.blocks >= limit => SinkFlow::Stop,
                _ => SinkFlow::Continue,
            }
        }
    }

    fn request(backend: &ToneBackend) -> SpanRequest {
        let voice = &backend.voices()[0];
        SpanRequest {
            voice_id: voice.identity.id,
            values: voice.defaults,
            flags: EngineFlags::default(),
        }
    }

    #[test]
    fn declares_three_predefined_voices() {
        let backend = ToneBackend::new();
        let voices = backend.voices();
        assert_eq!(backend.name(), "tone");
        assert_eq!(voices.len(), 3);
        assert_eq!(voices[0].identity.name, "Reed");
        assert!(matches!(voices[1].identity.gender, VoiceGender::Female));
        // Every voice carries the full range table the engine validates against
        for voice in &voices {
            assert_eq!(voice.ranges.speed.max, 250);
            assert!(voice.ranges.pitch.contains(voice.defaults.pitch));
        }
    }

    #[test]
    fn whitespace_only_span_renders_nothing() {
        let mut backend = ToneBackend::new();
        let req = request(&backend);
        let mut sink = Collector::new();
        backend.synthesize("   \t\n", &req, &mut sink).unwrap();
        assert!(sink.samples.is_empty());
        assert_eq!(sink.blocks, 0);
    }

    #[test]
    fn identical_requests_render_identically() {
        let mut backend = ToneBackend::new();
        let req = request(&backend);
        let mut first = Collector::new();
        let mut second = Collector::new();
        backend.synthesize("hello there", &req, &mut first).unwrap();
        backend.synthesize("hello there", &req, &mut second).unwrap();
        assert!(!first.samples.is_empty());
        assert_eq!(first.samples, second.samples);
    }

    #[test]
    fn higher_speed_renders_fewer_samples() {
        let mut backend = ToneBackend::new();
        let mut req = request(&backend);
        let mut normal = Collector::new();
        backend.synthesize("abcdef", &req, &mut normal).unwrap();

        req.values.speed = 200;
        let mut fast = Collector::new();
        backend.synthesize("abcdef", &req, &mut fast).unwrap();

        assert!(fast.samples.len() < normal.samples.len());
        // Speed 50 at 11.025 kHz: about a tenth of a second per character
        assert_eq!(normal.samples.len(), 6 * (SAMPLE_RATE as usize * 50 / 500));
    }

    #[test]
    fn volume_zero_is_silence_without_breathiness() {
        let mut backend = ToneBackend::new();
        let mut req = request(&backend);
        req.values.volume = 0;
        req.values.breathiness = 0;
        let mut sink = Collector::new();
        backend.synthesize("quiet", &req, &mut sink).unwrap();
        assert!(!sink.samples.is_empty());
        assert!(sink.samples.iter().all(|&s| s == 0));
    }

    #[test]
    fn sink_stop_terminates_the_span_early() {
        let mut backend = ToneBackend::new();
        let req = request(&backend);
        let mut sink = Collector::new();
        sink.stop_after_blocks = Some(1);
        backend
            .synthesize("a long enough span to need several blocks", &req, &mut sink)
            .unwrap();
        assert_eq!(sink.blocks, 1);
    }
}

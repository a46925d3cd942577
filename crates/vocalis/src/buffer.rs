//! Reference listener accumulating audio and index events in memory

use crate::event::SynthesisListener;
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug)]
struct BufferInner {
    samples: Vec<i16>,
    events: Vec<i32>,
}

/// Listener that appends every audio block's samples to one growing
/// sequence and every reached index id to a second, preserving delivery
/// order
///
/// Clones share the same storage, so a caller can keep a handle while the
/// engine owns another. Appends never block the delivering thread beyond
/// the mutex itself; there is no backpressure. A caller that needs bounded
/// memory should cancel via the index consumed signal instead.
#[derive(Debug, Clone)]
pub struct OutputBuffer {
    inner: Arc<Mutex<BufferInner>>,
}

impl OutputBuffer {
    /// `capacity_hint` pre-sizes the sample storage
    pub fn new(capacity_hint: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(BufferInner {
                samples: Vec::with_capacity(capacity_hint),
                events: Vec::new(),
            })),
        }
    }

    /// Snapshot of all samples delivered so far
    pub fn samples(&self) -> Vec<i16> {
        self.inner.lock().samples.clone()
    }

    /// Snapshot of all index ids delivered so far, in delivery order
    pub fn events(&self) -> Vec<i32> {
        self.inner.lock().events.clone()
    }

    pub fn is_empty(&self) -> bool {
        let inner = self.inner.lock();
        inner.samples.is_empty() && inner.events.is_empty()
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.samples.clear();
        inner.events.clear();
    }
}

impl SynthesisListener for OutputBuffer {
    fn on_index_reached(&mut self, id: i32) -> bool {
        self.inner.lock().events.push(id);
        true
    }

    fn on_audio_block(&mut self, samples: &[i16]) -> bool {
        self.inner.lock().samples.extend_from_slice(samples);
        true
    }
}

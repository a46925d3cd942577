//! Text/index work queue drained by a synthesis pass

use std::collections::VecDeque;

/// One queued work item: a text span to synthesize or an index marker
/// interleaved with the text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextQueueItem {
    Text(String),
    Index(i32),
}

/// Strict FIFO queue of pending work items
///
/// Index ids are opaque correlation tokens chosen by the caller; the queue
/// never validates, deduplicates, or reorders them. A drained item is never
/// re-delivered.
#[derive(Debug, Default)]
pub struct TextQueue {
    items: VecDeque<TextQueueItem>,
}

impl TextQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a text span. An empty span is a no-op so caller loops need not
    /// special-case it.
    pub fn enqueue_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.items.push_back(TextQueueItem::Text(text.to_string()));
    }

    /// Queue an index marker. Any integer is accepted, duplicates and
    /// non-monotonic values included.
    pub fn enqueue_index(&mut self, id: i32) {
        self.items.push_back(TextQueueItem::Index(id));
    }

    /// Remove and return the oldest item, or `None` when empty
    pub fn drain_next(&mut self) -> Option<TextQueueItem> {
        self.items.pop_front()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

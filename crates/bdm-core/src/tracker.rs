//! Completion tracker: which batch items have a durably recorded terminal outcome.
//!
//! One bit per item (LSB of word 0 = item 0), stored in atomic words so worker
//! tasks can set bits concurrently without a lock.

use std::sync::atomic::{AtomicU64, Ordering};

const WORD_BITS: usize = 64;

#[derive(Debug)]
pub struct CompletionTracker {
    len: usize,
    words: Box<[AtomicU64]>,
}

impl CompletionTracker {
    /// Tracker for `len` items, all incomplete.
    pub fn new(len: usize) -> Self {
        let words = (0..len.div_ceil(WORD_BITS))
            .map(|_| AtomicU64::new(0))
            .collect();
        Self { len, words }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Mark item `index` complete. Idempotent. Out-of-range indices are ignored.
    pub fn mark_complete(&self, index: usize) {
        if index >= self.len {
            return;
        }
        let (word, bit) = (index / WORD_BITS, index % WORD_BITS);
        self.words[word].fetch_or(1u64 << bit, Ordering::Release);
    }

    /// True if item `index` has been marked complete.
    pub fn is_complete(&self, index: usize) -> bool {
        if index >= self.len {
            return false;
        }
        let (word, bit) = (index / WORD_BITS, index % WORD_BITS);
        self.words[word].load(Ordering::Acquire) & (1u64 << bit) != 0
    }

    pub fn completed_count(&self) -> usize {
        self.words
            .iter()
            .map(|w| w.load(Ordering::Acquire).count_ones() as usize)
            .sum()
    }

    pub fn all_complete(&self) -> bool {
        self.completed_count() == self.len
    }

    /// Indices not yet complete, ascending.
    pub fn incomplete(&self) -> Vec<usize> {
        (0..self.len).filter(|&i| !self.is_complete(i)).collect()
    }
}

use crate::ce::CollationElements;
use crate::pce::{CollationPce, ProcessedCe};
use crate::search::ElementComparison;

/// Slots beyond the pattern length.
pub const CE_BUFFER_EXTRA: usize = 32;

// Target ignorables a wildcard comparison may skip per pattern character.
const MAX_IGNORABLES_PER_JAMO_L: usize = 8;
const MAX_IGNORABLES_PER_OTHER: usize = 3;

fn might_be_jamo_l(c: char) -> bool {
    matches!(c, '\u{1100}'..='\u{115e}' | '\u{3131}'..='\u{314e}' | '\u{3165}'..='\u{3186}')
}

/// A ring of processed collation elements indexed by their position in the
/// element stream.
///
/// Indexes in `[first_index, limit_index)` are cached. Only `limit_index`
/// may be fetched next; it evicts the oldest entry once the ring holds
/// `capacity - 1` entries.
#[derive(Clone, Debug)]
pub struct CeBuffer<I> {
    entries: Vec<ProcessedCe>,
    first: usize,
    limit: usize,
    pce: CollationPce<I>,
}

impl<I: CollationElements> CeBuffer<I> {
    /// Creates a buffer with `capacity` slots.
    ///
    /// # Panics
    ///
    /// Panics if `capacity < 2`.
    pub fn new(pce: CollationPce<I>, capacity: usize) -> Self {
        assert!(capacity >= 2, "capacity must be at least 2");
        Self {
            entries: vec![ProcessedCe::default(); capacity],
            first: 0,
            limit: 0,
            pce,
        }
    }

    /// Creates a buffer sized for matching a pattern of `pattern_ces`
    /// elements, with extra room when the comparison may skip target elements.
    pub fn for_pattern(
        pce: CollationPce<I>,
        pattern: &str,
        pattern_ces: usize,
        comparison: ElementComparison,
    ) -> Self {
        let mut capacity = pattern_ces + CE_BUFFER_EXTRA;
        if comparison != ElementComparison::Standard {
            capacity += pattern
                .chars()
                .map(|c| {
                    if might_be_jamo_l(c) {
                        MAX_IGNORABLES_PER_JAMO_L
                    } else {
                        MAX_IGNORABLES_PER_OTHER
                    }
                })
                .sum::<usize>();
        }
        Self::new(pce, capacity)
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Oldest cached index.
    pub fn first_index(&self) -> usize {
        self.first
    }

    /// Next index to be fetched.
    pub fn limit_index(&self) -> usize {
        self.limit
    }

    /// The processed-element source.
    pub fn pce(&self) -> &CollationPce<I> {
        &self.pce
    }

    /// The element at `index`, reading forward.
    ///
    /// Returns `None` if `index` was evicted or is beyond `limit_index`.
    pub fn get(&mut self, index: usize) -> Option<ProcessedCe> {
        self.fetch(index, false)
    }

    /// The element at `index`, reading backward from the stream position.
    ///
    /// Returns `None` if `index` was evicted or is beyond `limit_index`.
    pub fn get_previous(&mut self, index: usize) -> Option<ProcessedCe> {
        self.fetch(index, true)
    }

    /// Enlarges the ring to `capacity` slots, keeping every cached entry.
    ///
    /// Does nothing if the ring is already that large.
    pub fn grow(&mut self, capacity: usize) {
        let old = self.entries.len();
        if capacity <= old {
            return;
        }
        let mut entries = vec![ProcessedCe::default(); capacity];
        for index in self.first..self.limit {
            entries[index % capacity] = self.entries[index % old];
        }
        self.entries = entries;
    }

    fn fetch(&mut self, index: usize, backward: bool) -> Option<ProcessedCe> {
        let slot = index % self.entries.len();
        if index >= self.first && index < self.limit {
            return Some(self.entries[slot]);
        }
        if index != self.limit {
            return None;
        }
        self.limit += 1;
        if self.limit - self.first >= self.entries.len() {
            self.first += 1;
        }
        let cei = if backward {
            self.pce.previous_processed()
        } else {
            self.pce.next_processed()
        };
        self.entries[slot] = cei;
        Some(cei)
    }
}

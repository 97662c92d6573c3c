use crate::ce::{self, CollationElements};
use crate::config::{CollationSettings, Strength};

/// Processed element marking the end (or start) of the text.
pub const PROCESSED_NULLORDER: u64 = u64::MAX;

const IGNORABLE: u64 = 0;
const INITIAL_STACK_CAPACITY: usize = 16;
const STACK_GROW: usize = 8;

/// A raw collation element with the source range that produced it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RawCe {
    /// The element.
    pub ce: u32,
    /// Start byte offset.
    pub low: usize,
    /// End byte offset.
    pub high: usize,
}

/// A processed collation element with the source range that produced it.
///
/// The element packs `primary << 48 | secondary << 32 | tertiary << 16 |
/// quaternary`. Elements after the first of an expansion have `low == high`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProcessedCe {
    /// The element, or [`PROCESSED_NULLORDER`].
    pub ce: u64,
    /// Start byte offset.
    pub low: usize,
    /// End byte offset.
    pub high: usize,
}

impl ProcessedCe {
    fn end(offset: usize) -> Self {
        Self {
            ce: PROCESSED_NULLORDER,
            low: offset,
            high: offset,
        }
    }

    /// Returns true if this marks the end of the text.
    #[inline]
    pub fn is_end(&self) -> bool {
        self.ce == PROCESSED_NULLORDER
    }
}

/// A LIFO stack of elements that starts with room for 16 and grows by 8.
#[derive(Clone, Debug)]
pub struct CeStack<T> {
    entries: Vec<T>,
}

/// Raw elements gathered while reading backward.
pub type RceBuffer = CeStack<RawCe>;
/// Processed elements waiting to be returned backward.
pub type PceBuffer = CeStack<ProcessedCe>;

impl<T> Default for CeStack<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> CeStack<T> {
    /// Creates an empty stack.
    pub fn new() -> Self {
        Self {
            entries: Vec::with_capacity(INITIAL_STACK_CAPACITY),
        }
    }

    /// Pushes an entry.
    pub fn put(&mut self, entry: T) {
        if self.entries.len() == self.entries.capacity() {
            self.entries.reserve_exact(STACK_GROW);
        }
        self.entries.push(entry);
    }

    /// Pops the most recent entry.
    pub fn get(&mut self) -> Option<T> {
        self.entries.pop()
    }

    /// Returns true if the stack is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Removes every entry.
    pub fn reset(&mut self) {
        self.entries.clear();
    }
}

/// Turns raw collation elements into processed ones under a strength and
/// variable-weighting setting, in either direction.
///
/// With shifting on, an element whose 32-bit value is below `variable_top`
/// keeps only its primary, moved to the quaternary level, and secondary-only
/// elements that follow it become ignorable. Ignorable processed elements
/// are skipped.
#[derive(Clone, Debug)]
pub struct CollationPce<I> {
    elements: I,
    settings: CollationSettings,
    is_shifted: bool,
    pce_buffer: PceBuffer,
    rce_buffer: RceBuffer,
}

impl<I: CollationElements> CollationPce<I> {
    /// Wraps an element stream.
    pub fn new(elements: I, settings: CollationSettings) -> Self {
        Self {
            elements,
            settings,
            is_shifted: false,
            pce_buffer: PceBuffer::new(),
            rce_buffer: RceBuffer::new(),
        }
    }

    /// The settings.
    pub fn settings(&self) -> &CollationSettings {
        &self.settings
    }

    /// The underlying stream.
    pub fn elements(&self) -> &I {
        &self.elements
    }

    /// Returns true if the last processed element was shifted.
    pub fn is_shifted(&self) -> bool {
        self.is_shifted
    }

    /// Moves the stream to `offset` and clears all buffered state.
    pub fn set_offset(&mut self, offset: usize) {
        self.elements.set_offset(offset);
        self.is_shifted = false;
        self.pce_buffer.reset();
        self.rce_buffer.reset();
    }

    /// Processes one raw element. Returns 0 for an element that is ignorable
    /// at the configured strength.
    pub fn process_ce(&mut self, ce: u32) -> u64 {
        if ce == 0 {
            return IGNORABLE;
        }
        let strength = self.settings.strength;
        let mut primary = u64::from(ce::primary(ce));
        let mut secondary = 0;
        let mut tertiary = 0;
        let mut quaternary = 0;
        if strength >= Strength::Secondary {
            secondary = u64::from(ce::secondary(ce));
        }
        if strength >= Strength::Tertiary {
            tertiary = u64::from(ce::tertiary(ce));
        }

        let variable = self.settings.alternate_shifted && self.settings.variable_top > ce && primary != 0;
        if variable || (self.is_shifted && primary == 0) {
            if primary == 0 {
                return IGNORABLE;
            }
            if strength >= Strength::Quaternary {
                quaternary = primary;
            }
            primary = 0;
            secondary = 0;
            tertiary = 0;
            self.is_shifted = true;
        } else {
            if strength >= Strength::Quaternary {
                quaternary = 0xffff;
            }
            self.is_shifted = false;
        }
        (primary << 48) | (secondary << 32) | (tertiary << 16) | quaternary
    }

    /// The next non-ignorable processed element, with `low` the offset before
    /// its raw element and `high` the offset after.
    pub fn next_processed(&mut self) -> ProcessedCe {
        self.pce_buffer.reset();
        loop {
            let low = self.elements.offset();
            let Some(raw) = self.elements.next() else {
                return ProcessedCe::end(low);
            };
            let high = self.elements.offset();
            let ce = self.process_ce(raw);
            if ce != IGNORABLE {
                return ProcessedCe { ce, low, high };
            }
        }
    }

    /// The previous non-ignorable processed element.
    ///
    /// Raw elements are gathered backward up to one with a primary weight that
    /// does not continue another, then processed in text order so shifting
    /// sees them the way a forward pass would.
    pub fn previous_processed(&mut self) -> ProcessedCe {
        while self.pce_buffer.is_empty() {
            let mut exhausted = false;
            loop {
                let high = self.elements.offset();
                let Some(ce) = self.elements.previous() else {
                    exhausted = true;
                    break;
                };
                let low = self.elements.offset();
                self.rce_buffer.put(RawCe { ce, low, high });
                if ce::primary(ce) != 0 && !ce::is_continuation(ce) {
                    break;
                }
            }
            if exhausted && self.rce_buffer.is_empty() {
                break;
            }
            while let Some(raw) = self.rce_buffer.get() {
                let ce = self.process_ce(raw.ce);
                if ce != IGNORABLE {
                    self.pce_buffer.put(ProcessedCe {
                        ce,
                        low: raw.low,
                        high: raw.high,
                    });
                }
            }
        }
        self.pce_buffer
            .get()
            .unwrap_or_else(|| ProcessedCe::end(self.elements.offset()))
    }
}

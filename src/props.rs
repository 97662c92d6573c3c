use std::cell::Cell;
use std::cmp::Ordering;

use crate::cptrie::{CodePointTrie, CodePointTrieBuilder};

/// Pseudo code point whose row holds the trie's initial value.
pub const INITIAL_VALUE_CP: u32 = 0x11_0000;
/// Pseudo code point whose row holds the trie's error value.
pub const ERROR_VALUE_CP: u32 = 0x11_0001;
/// Largest code point (real or pseudo) that can be set.
pub const MAX_CP: u32 = 0x11_0001;
/// First pseudo code point.
pub const FIRST_SPECIAL_CP: u32 = 0x11_0000;
/// Passed to [`CompactHandler::handle`] once all special rows have been reported,
/// before the first real range.
pub const START_REAL_VALUES_CP: u32 = 0x20_0000;

const INITIAL_ROWS: usize = 1 << 12;
const MEDIUM_ROWS: usize = 1 << 16;
const MAX_ROWS: usize = MAX_CP as usize + 1;

/// Errors from building property vectors.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PropsError {
    /// Splitting a range would exceed the maximum number of rows.
    #[error("too many rows: limit is {max}")]
    TooManyRows {
        /// The row limit.
        max: usize,
    },
    /// A compaction handler rejected a range.
    #[error("compaction handler failed: {0}")]
    Handler(String),
}

/// Receives the results of [`PropsVectors::compact`].
///
/// `row_index` is the offset of the range's vector within
/// [`CompactedVectors::values`], a multiple of the number of value columns.
pub trait CompactHandler {
    /// Called with `start == end` for each pseudo code point row, then once with
    /// [`START_REAL_VALUES_CP`] and the total value count, then for every real
    /// range. Real ranges arrive grouped by their sorted vectors, so ranges
    /// sharing a vector are adjacent and code points need not ascend.
    fn handle(&mut self, start: u32, end: u32, row_index: u32, row: &[u32]) -> Result<(), PropsError>;
}

impl<F> CompactHandler for F
where
    F: FnMut(u32, u32, u32, &[u32]) -> Result<(), PropsError>,
{
    fn handle(&mut self, start: u32, end: u32, row_index: u32, row: &[u32]) -> Result<(), PropsError> {
        self(start, end, row_index, row)
    }
}

/// Per-code-point property vectors, stored as sorted ranges.
///
/// Each row is `[start, limit, v0, .., vN-1]` with `limit` exclusive. Rows
/// cover `0..=MAX_CP` without gaps or overlaps; the last two rows are the
/// pseudo code points [`INITIAL_VALUE_CP`] and [`ERROR_VALUE_CP`].
///
/// Mutation ends with [`compact`](Self::compact), which consumes the builder.
#[derive(Clone, Debug)]
pub struct PropsVectors {
    v: Vec<u32>,
    columns: usize,
    max_rows: usize,
    rows: usize,
    prev_row: Cell<usize>,
}

impl PropsVectors {
    /// Creates vectors with `value_columns` zeroed columns per code point.
    ///
    /// # Panics
    ///
    /// Panics if `value_columns` is zero.
    pub fn new(value_columns: usize) -> Self {
        assert!(value_columns > 0, "value_columns must be positive");
        let columns = value_columns + 2;
        let mut v = vec![0u32; INITIAL_ROWS * columns];
        let rows = 2 + (MAX_CP - FIRST_SPECIAL_CP) as usize;
        v[1] = FIRST_SPECIAL_CP;
        for cp in FIRST_SPECIAL_CP..=MAX_CP {
            let row = (cp - FIRST_SPECIAL_CP) as usize + 1;
            v[row * columns] = cp;
            v[row * columns + 1] = cp + 1;
        }
        Self {
            v,
            columns,
            max_rows: INITIAL_ROWS,
            rows,
            prev_row: Cell::new(0),
        }
    }

    /// Number of value columns.
    #[inline]
    pub fn value_columns(&self) -> usize {
        self.columns - 2
    }

    /// Number of rows, including the pseudo code point rows.
    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Returns the values of row `i`.
    pub fn row(&self, i: usize) -> &[u32] {
        &self.v[i * self.columns + 2..(i + 1) * self.columns]
    }

    /// Returns the first code point of row `i`.
    pub fn row_start(&self, i: usize) -> u32 {
        self.v[i * self.columns]
    }

    /// Returns the last code point of row `i`.
    pub fn row_end(&self, i: usize) -> u32 {
        self.v[i * self.columns + 1] - 1
    }

    #[inline]
    fn start_of(&self, row: usize) -> u32 {
        self.v[row * self.columns]
    }

    #[inline]
    fn limit_of(&self, row: usize) -> u32 {
        self.v[row * self.columns + 1]
    }

    /// Sets `column` to `value` for code points `start..=end`, touching only
    /// the bits in `mask`.
    ///
    /// Rows are split only where the masked value actually changes.
    ///
    /// # Errors
    ///
    /// Returns [`PropsError::TooManyRows`] if a split would exceed the row limit.
    ///
    /// # Panics
    ///
    /// Panics if `start > end`, `end > MAX_CP` or `column` is out of range.
    pub fn set_value(&mut self, start: u32, end: u32, column: usize, value: u32, mask: u32) -> Result<(), PropsError> {
        assert!(start <= end && end <= MAX_CP, "invalid range {start:#x}..={end:#x}");
        assert!(column < self.value_columns(), "column {column} out of range");
        let limit = end + 1;
        let column = column + 2;
        let value = value & mask;
        let cols = self.columns;

        let mut first = self.find_row(start);
        let mut last = first;
        // Ranges tend to be short, so walk a few rows before searching.
        if limit > self.limit_of(last) {
            last += 1;
            if limit > self.limit_of(last) {
                if limit - self.limit_of(last) < 10 {
                    loop {
                        last += 1;
                        if limit <= self.limit_of(last) {
                            break;
                        }
                    }
                } else {
                    last = self.find_row(limit - 1);
                }
            }
        }

        let split_first = start != self.start_of(first) && value != (self.v[first * cols + column] & mask);
        let split_last = limit != self.limit_of(last) && value != (self.v[last * cols + column] & mask);

        if split_first || split_last {
            let expand = split_first as usize + split_last as usize;
            if self.rows + expand > self.max_rows {
                self.grow(self.rows + expand)?;
            }
            let tail = (last + 1) * cols..self.rows * cols;
            self.v.copy_within(tail, (last + 1 + expand) * cols);
            self.rows += expand;

            if split_first {
                self.v.copy_within(first * cols..(last + 1) * cols, (first + 1) * cols);
                last += 1;
                self.v[first * cols + 1] = start;
                self.v[(first + 1) * cols] = start;
                first += 1;
            }
            if split_last {
                self.v.copy_within(last * cols..(last + 1) * cols, (last + 1) * cols);
                self.v[last * cols + 1] = limit;
                self.v[(last + 1) * cols] = limit;
            }
        }

        self.prev_row.set(last);
        for row in first..=last {
            let cell = &mut self.v[row * cols + column];
            *cell = (*cell & !mask) | value;
        }
        Ok(())
    }

    fn grow(&mut self, needed: usize) -> Result<(), PropsError> {
        let new_max = if self.max_rows < MEDIUM_ROWS {
            MEDIUM_ROWS
        } else if self.max_rows < MAX_ROWS {
            MAX_ROWS
        } else {
            return Err(PropsError::TooManyRows { max: MAX_ROWS });
        };
        debug_assert!(needed <= new_max);
        tracing::debug!(from = self.max_rows, to = new_max, "growing property vector rows");
        self.v.resize(new_max * self.columns, 0);
        self.max_rows = new_max;
        Ok(())
    }

    /// Returns the value of `column` for code point `c`, or 0 for an invalid
    /// code point or column.
    pub fn value(&self, c: u32, column: usize) -> u32 {
        if c > MAX_CP || column >= self.value_columns() {
            return 0;
        }
        let row = self.find_row(c);
        self.v[row * self.columns + 2 + column]
    }

    /// Finds the row containing `c`, trying the last row found and its
    /// successor before a binary search.
    fn find_row(&self, c: u32) -> usize {
        let prev = self.prev_row.get();
        if prev < self.rows {
            if c >= self.start_of(prev) {
                if c < self.limit_of(prev) {
                    return prev;
                }
                if prev + 1 < self.rows && c < self.limit_of(prev + 1) {
                    self.prev_row.set(prev + 1);
                    return prev + 1;
                }
            }
        }

        let mut start = 0;
        let mut limit = self.rows;
        while start + 1 < limit {
            let mid = (start + limit) / 2;
            if c < self.start_of(mid) {
                limit = mid;
            } else if c < self.limit_of(mid) {
                self.prev_row.set(mid);
                return mid;
            } else {
                start = mid;
            }
        }
        self.prev_row.set(start);
        start
    }

    /// Orders rows by their vectors first, then by start and limit.
    fn compare_rows(&self, a: usize, b: usize) -> Ordering {
        let row_a = &self.v[a * self.columns..(a + 1) * self.columns];
        let row_b = &self.v[b * self.columns..(b + 1) * self.columns];
        row_a[2..]
            .cmp(&row_b[2..])
            .then_with(|| row_a[..2].cmp(&row_b[..2]))
    }

    /// Sorts and deduplicates the vectors, reporting every range to `handler`.
    ///
    /// Consumes the builder: values can no longer be set once compacted.
    /// The handler sees, in order:
    /// 1. each pseudo code point row, with `start == end`;
    /// 2. [`START_REAL_VALUES_CP`] with the total length of the value table;
    /// 3. each real range `start..=end` with the offset of its vector.
    pub fn compact(self, handler: &mut impl CompactHandler) -> Result<CompactedVectors, PropsError> {
        let cols = self.columns;
        let value_columns = self.value_columns();

        let mut order: Vec<usize> = (0..self.rows).collect();
        order.sort_by(|&a, &b| self.compare_rows(a, b));
        let rows: Vec<&[u32]> = order
            .iter()
            .map(|&r| &self.v[r * cols..(r + 1) * cols])
            .collect();

        // First pass: offsets of the special rows and the table length.
        let mut count: Option<usize> = None;
        for (i, row) in rows.iter().enumerate() {
            if i == 0 || row[2..] != rows[i - 1][2..] {
                count = Some(count.map_or(0, |c| c + value_columns));
            }
            let start = row[0];
            if start >= FIRST_SPECIAL_CP {
                handler.handle(start, start, offset_u32(count), &row[2..])?;
            }
        }
        let total = count.map_or(0, |c| c + value_columns);
        let last = rows.last().map_or(&[][..], |row| &row[2..]);
        handler.handle(START_REAL_VALUES_CP, START_REAL_VALUES_CP, total as u32, last)?;

        // Second pass: build the deduplicated table and report real ranges.
        let mut values: Vec<u32> = Vec::with_capacity(total);
        for row in &rows {
            let vector = &row[2..];
            if values.len() < value_columns || values[values.len() - value_columns..] != *vector {
                values.extend_from_slice(vector);
            }
            let offset = values.len() - value_columns;
            let start = row[0];
            if start < FIRST_SPECIAL_CP {
                handler.handle(start, row[1] - 1, offset as u32, &values[offset..])?;
            }
        }
        debug_assert_eq!(values.len(), total);

        tracing::debug!(
            rows = self.rows,
            unique = total / value_columns,
            "compacted property vectors"
        );
        Ok(CompactedVectors {
            values,
            value_columns,
        })
    }

    /// Compacts into a [`CodePointTrie`] mapping each code point to the offset
    /// of its vector.
    pub fn compact_to_trie(self) -> Result<(CodePointTrie, CompactedVectors), PropsError> {
        let mut handler = TrieCompactHandler::default();
        let vectors = self.compact(&mut handler)?;
        Ok((handler.finish()?, vectors))
    }
}

fn offset_u32(count: Option<usize>) -> u32 {
    count.unwrap_or(0) as u32
}

/// The deduplicated vector table produced by [`PropsVectors::compact`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompactedVectors {
    values: Vec<u32>,
    value_columns: usize,
}

impl CompactedVectors {
    /// All vectors, back to back.
    pub fn values(&self) -> &[u32] {
        &self.values
    }

    /// Number of values per vector.
    pub fn value_columns(&self) -> usize {
        self.value_columns
    }

    /// Number of distinct vectors.
    pub fn len(&self) -> usize {
        self.values.len() / self.value_columns
    }

    /// Returns true if the table holds no vectors.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the vector at `row_index`, an offset passed to the handler.
    pub fn vector(&self, row_index: u32) -> Option<&[u32]> {
        let start = row_index as usize;
        self.values.get(start..start + self.value_columns)
    }
}

/// A [`CompactHandler`] that records each range's vector offset in a
/// [`CodePointTrie`].
///
/// The pseudo code point rows supply the trie's initial and error values.
#[derive(Debug, Default)]
pub struct TrieCompactHandler {
    initial_value: u32,
    error_value: u32,
    builder: Option<CodePointTrieBuilder>,
}

impl TrieCompactHandler {
    /// Builds the trie.
    ///
    /// # Errors
    ///
    /// Returns [`PropsError::Handler`] if compaction never reached the real ranges.
    pub fn finish(self) -> Result<CodePointTrie, PropsError> {
        self.builder
            .map(CodePointTrieBuilder::build)
            .ok_or_else(|| PropsError::Handler("no real values were reported".into()))
    }
}

impl CompactHandler for TrieCompactHandler {
    fn handle(&mut self, start: u32, end: u32, row_index: u32, _row: &[u32]) -> Result<(), PropsError> {
        match start {
            INITIAL_VALUE_CP => self.initial_value = row_index,
            ERROR_VALUE_CP => self.error_value = row_index,
            START_REAL_VALUES_CP => {
                self.builder = Some(CodePointTrieBuilder::new(self.initial_value, self.error_value));
            }
            _ => {
                let builder = self
                    .builder
                    .as_mut()
                    .ok_or_else(|| PropsError::Handler(format!("range {start:#x} before real values")))?;
                if row_index != self.initial_value {
                    builder.set_range(start, end, row_index);
                }
            }
        }
        Ok(())
    }
}

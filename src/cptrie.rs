use rustc_hash::FxHashMap;

const SHIFT: u32 = 5;
const BLOCK_LEN: usize = 1 << SHIFT;
const BLOCK_MASK: u32 = BLOCK_LEN as u32 - 1;
const MAX_CODE_POINT: u32 = 0x10_ffff;
const INDEX_LEN: usize = (MAX_CODE_POINT as usize + 1) >> SHIFT;

/// An immutable map from code points to `u32` values.
///
/// Lookup is two array reads: `index[cp >> 5]` gives the start of a 32-entry
/// block in `data`. Identical blocks are stored once.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodePointTrie {
    index: Vec<u32>,
    data: Vec<u32>,
    initial_value: u32,
    error_value: u32,
}

impl CodePointTrie {
    /// Returns the value for `cp`, or the error value above U+10FFFF.
    #[inline]
    pub fn get(&self, cp: u32) -> u32 {
        if cp > MAX_CODE_POINT {
            return self.error_value;
        }
        let block = self.index[(cp >> SHIFT) as usize] as usize;
        self.data[block + (cp & BLOCK_MASK) as usize]
    }

    /// The value of code points that were never set.
    pub fn initial_value(&self) -> u32 {
        self.initial_value
    }

    /// The value returned for out-of-range code points.
    pub fn error_value(&self) -> u32 {
        self.error_value
    }

    /// Number of distinct data blocks.
    pub fn data_blocks(&self) -> usize {
        self.data.len() / BLOCK_LEN
    }

    /// Iterates over maximal ranges of code points sharing a value.
    pub fn ranges(&self) -> Ranges<'_> {
        Ranges {
            trie: self,
            next: Some(0),
        }
    }
}

/// Iterator returned by [`CodePointTrie::ranges`].
#[derive(Clone, Debug)]
pub struct Ranges<'a> {
    trie: &'a CodePointTrie,
    next: Option<u32>,
}

impl Iterator for Ranges<'_> {
    /// `(start, end, value)` with `end` inclusive.
    type Item = (u32, u32, u32);

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.next?;
        let value = self.trie.get(start);
        let mut end = start;
        while end < MAX_CODE_POINT && self.trie.get(end + 1) == value {
            end += 1;
        }
        self.next = (end < MAX_CODE_POINT).then_some(end + 1);
        Some((start, end, value))
    }
}

#[derive(Clone, Debug)]
enum Block {
    Uniform(u32),
    Mixed(Box<[u32; BLOCK_LEN]>),
}

impl Block {
    fn values(&self) -> [u32; BLOCK_LEN] {
        match self {
            Block::Uniform(v) => [*v; BLOCK_LEN],
            Block::Mixed(values) => **values,
        }
    }
}

/// Mutable builder for a [`CodePointTrie`].
#[derive(Clone, Debug)]
pub struct CodePointTrieBuilder {
    blocks: Vec<Block>,
    initial_value: u32,
    error_value: u32,
}

impl CodePointTrieBuilder {
    /// Creates a builder mapping every code point to `initial_value`.
    pub fn new(initial_value: u32, error_value: u32) -> Self {
        Self {
            blocks: vec![Block::Uniform(initial_value); INDEX_LEN],
            initial_value,
            error_value,
        }
    }

    /// Returns the current value for `cp`.
    pub fn get(&self, cp: u32) -> u32 {
        if cp > MAX_CODE_POINT {
            return self.error_value;
        }
        match &self.blocks[(cp >> SHIFT) as usize] {
            Block::Uniform(v) => *v,
            Block::Mixed(values) => values[(cp & BLOCK_MASK) as usize],
        }
    }

    /// Sets the value for one code point.
    ///
    /// # Panics
    ///
    /// Panics if `cp` is above U+10FFFF.
    pub fn set(&mut self, cp: u32, value: u32) -> &mut Self {
        self.set_range(cp, cp, value)
    }

    /// Sets the value for `start..=end`.
    ///
    /// # Panics
    ///
    /// Panics if `start > end` or `end` is above U+10FFFF.
    pub fn set_range(&mut self, start: u32, end: u32, value: u32) -> &mut Self {
        assert!(start <= end && end <= MAX_CODE_POINT, "invalid range {start:#x}..={end:#x}");
        for b in (start >> SHIFT)..=(end >> SHIFT) {
            let block_start = b << SHIFT;
            let block_end = block_start + BLOCK_MASK;
            let block = &mut self.blocks[b as usize];
            if start <= block_start && block_end <= end {
                *block = Block::Uniform(value);
            } else {
                let from = (start.max(block_start) - block_start) as usize;
                let to = (end.min(block_end) - block_start) as usize;
                let mut values = block.values();
                values[from..=to].fill(value);
                *block = Block::Mixed(Box::new(values));
            }
        }
        self
    }

    /// Freezes the builder, storing each distinct block once.
    pub fn build(self) -> CodePointTrie {
        let mut index = Vec::with_capacity(INDEX_LEN);
        let mut data: Vec<u32> = Vec::new();
        let mut seen: FxHashMap<[u32; BLOCK_LEN], u32> = FxHashMap::default();
        for block in &self.blocks {
            let values = block.values();
            let offset = *seen.entry(values).or_insert_with(|| {
                let offset = data.len() as u32;
                data.extend_from_slice(&values);
                offset
            });
            index.push(offset);
        }
        tracing::debug!(
            data_blocks = data.len() / BLOCK_LEN,
            "built code point trie"
        );
        CodePointTrie {
            index,
            data,
            initial_value: self.initial_value,
            error_value: self.error_value,
        }
    }
}

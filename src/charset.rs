/// A set of code points stored as sorted, disjoint, inclusive ranges.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CharSet {
    ranges: Vec<(u32, u32)>,
}

// Script ranges used by the built-in profiles.
const HAN: &[(u32, u32)] = &[
    (0x2e80, 0x2e99),
    (0x2e9b, 0x2ef3),
    (0x2f00, 0x2fd5),
    (0x3005, 0x3005),
    (0x3007, 0x3007),
    (0x3021, 0x3029),
    (0x3038, 0x303b),
    (0x3400, 0x4dbf),
    (0x4e00, 0x9fff),
    (0xf900, 0xfa6d),
    (0xfa70, 0xfad9),
    (0x2_0000, 0x2_a6df),
    (0x2_a700, 0x2_ebe0),
    (0x2_f800, 0x2_fa1d),
    (0x3_0000, 0x3_23af),
];

const HIRAGANA: &[(u32, u32)] = &[
    (0x3041, 0x3096),
    (0x309d, 0x309f),
    (0x1_b001, 0x1_b11f),
    (0x1_b150, 0x1_b152),
    (0x1_f200, 0x1_f200),
];

const KATAKANA: &[(u32, u32)] = &[
    (0x30a1, 0x30fa),
    (0x30fd, 0x30ff),
    (0x31f0, 0x31ff),
    (0x32d0, 0x32fe),
    (0x3300, 0x3357),
    (0xff66, 0xff6f),
    (0xff71, 0xff9d),
    (0x1_b000, 0x1_b000),
    (0x1_b164, 0x1_b167),
];

impl CharSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self { ranges: Vec::new() }
    }

    /// Creates a set from inclusive ranges in any order.
    pub fn from_ranges(ranges: &[(u32, u32)]) -> Self {
        let mut set = Self::new();
        for &(start, end) in ranges {
            set.add_range(start, end);
        }
        set
    }

    /// Ideographs of the Han script.
    pub fn han() -> Self {
        Self::from_ranges(HAN)
    }

    /// The Hiragana script.
    pub fn hiragana() -> Self {
        Self::from_ranges(HIRAGANA)
    }

    /// The Katakana script.
    pub fn katakana() -> Self {
        Self::from_ranges(KATAKANA)
    }

    /// Adds `start..=end`, merging with overlapping or adjacent ranges.
    pub fn add_range(&mut self, start: u32, end: u32) -> &mut Self {
        debug_assert!(start <= end);
        let lo = self.ranges.partition_point(|&(_, e)| e.saturating_add(1) < start);
        let hi = self.ranges.partition_point(|&(s, _)| s <= end.saturating_add(1));
        let (mut start, mut end) = (start, end);
        if lo < hi {
            start = start.min(self.ranges[lo].0);
            end = end.max(self.ranges[hi - 1].1);
        }
        self.ranges.splice(lo..hi, [(start, end)]);
        self
    }

    /// Adds one character.
    pub fn add(&mut self, c: char) -> &mut Self {
        self.add_range(c as u32, c as u32)
    }

    /// Adds every character of `other`.
    pub fn add_all(&mut self, other: &CharSet) -> &mut Self {
        for &(start, end) in &other.ranges {
            self.add_range(start, end);
        }
        self
    }

    /// Returns true if `c` is in the set.
    #[inline]
    pub fn contains(&self, c: char) -> bool {
        let c = c as u32;
        let i = self.ranges.partition_point(|&(_, end)| end < c);
        i < self.ranges.len() && self.ranges[i].0 <= c
    }

    /// The ranges of the set, sorted and disjoint.
    pub fn ranges(&self) -> &[(u32, u32)] {
        &self.ranges
    }

    /// Returns true if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

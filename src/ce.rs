use rustc_hash::FxHashMap;
use unicode_normalization::char::decompose_canonical;

/// Secondary and tertiary weight shared by most elements.
pub const COMMON_WEIGHT: u8 = 0x05;

const UPPER_TERTIARY: u8 = 0x08;
const TERTIARY_MASK: u32 = 0x3f;
const CONTINUATION_MASK: u32 = 0xc0;
const IMPLICIT_BASE: u32 = 0xe000;

/// Primary weight of a raw collation element.
#[inline]
pub fn primary(ce: u32) -> u32 {
    ce >> 16
}

/// Secondary weight of a raw collation element.
#[inline]
pub fn secondary(ce: u32) -> u32 {
    (ce >> 8) & 0xff
}

/// Tertiary weight of a raw collation element, without the continuation bits.
#[inline]
pub fn tertiary(ce: u32) -> u32 {
    ce & TERTIARY_MASK
}

/// Returns true if `ce` continues the element before it.
#[inline]
pub fn is_continuation(ce: u32) -> bool {
    ce & CONTINUATION_MASK == CONTINUATION_MASK
}

/// Packs weights into a raw collation element.
#[inline]
pub fn make_ce(primary: u16, secondary: u8, tertiary: u8) -> u32 {
    debug_assert!(u32::from(tertiary) <= TERTIARY_MASK);
    (u32::from(primary) << 16) | (u32::from(secondary) << 8) | u32::from(tertiary)
}

/// A bidirectional stream of raw collation elements over a text.
///
/// `offset` is a byte offset into `text`. Reading forward, it is the end of
/// the last character consumed; elements after the first of an expansion do
/// not move it. Reading backward, it is the start of the last character
/// consumed.
pub trait CollationElements {
    /// The next element, or `None` at the end of the text.
    fn next(&mut self) -> Option<u32>;
    /// The previous element, or `None` at the start of the text.
    fn previous(&mut self) -> Option<u32>;
    /// Current position.
    fn offset(&self) -> usize;
    /// Moves to `offset`, discarding any partly read expansion.
    fn set_offset(&mut self, offset: usize);
    /// The text being iterated.
    fn text(&self) -> &str;
}

/// A mapping from characters to raw collation elements.
///
/// Characters without an entry are decomposed canonically and each part
/// looked up; parts still unmapped get two-element implicit weights ordered
/// by code point.
#[derive(Clone, Debug, Default)]
pub struct CollationTable {
    map: FxHashMap<char, Vec<u32>>,
}

impl CollationTable {
    /// Creates an empty table, which orders everything by code point.
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps `c` to `ces`. An expansion has several elements; `[0]` makes
    /// `c` completely ignorable.
    pub fn insert(&mut self, c: char, ces: &[u32]) -> &mut Self {
        self.map.insert(c, ces.to_vec());
        self
    }

    /// The elements stored for `c`.
    pub fn get(&self, c: char) -> Option<&[u32]> {
        self.map.get(&c).map(Vec::as_slice)
    }

    /// Number of mapped characters.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns true if no character is mapped.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Implicit weights for an unmapped character: a lead element with a
    /// primary above all table weights and a continuation carrying the low
    /// bits of the code point.
    pub fn implicit_ces(c: char) -> [u32; 2] {
        let cp = c as u32;
        let lead = IMPLICIT_BASE + (cp >> 15);
        let trail = (cp & 0x7fff) | 0x8000;
        [
            (lead << 16) | (u32::from(COMMON_WEIGHT) << 8) | u32::from(COMMON_WEIGHT),
            (trail << 16) | CONTINUATION_MASK,
        ]
    }

    /// A small table for Latin text: variable spaces and punctuation, digits,
    /// letters with case as a tertiary difference, combining marks as
    /// secondary-only elements, a few ligature expansions and ignorable
    /// format characters.
    pub fn latin() -> Self {
        let mut table = Self::new();
        table.insert(' ', &[make_ce(0x0209, COMMON_WEIGHT, COMMON_WEIGHT)]);
        for (i, c) in "_-,;:!?.'\"()[]{}@*/\\&#%`^+<=>|~$".chars().enumerate() {
            table.insert(c, &[make_ce(0x0210 + i as u16, COMMON_WEIGHT, COMMON_WEIGHT)]);
        }
        for (i, c) in ('0'..='9').enumerate() {
            table.insert(c, &[make_ce(0x1000 + i as u16, COMMON_WEIGHT, COMMON_WEIGHT)]);
        }
        for (i, (lower, upper)) in ('a'..='z').zip('A'..='Z').enumerate() {
            let p = 0x2000 + 0x10 * i as u16;
            table.insert(lower, &[make_ce(p, COMMON_WEIGHT, COMMON_WEIGHT)]);
            table.insert(upper, &[make_ce(p, COMMON_WEIGHT, UPPER_TERTIARY)]);
        }
        for cp in 0x300u32..=0x36f {
            if let Some(c) = char::from_u32(cp) {
                table.insert(c, &[make_ce(0, 0x20 + (cp - 0x300) as u8, COMMON_WEIGHT)]);
            }
        }
        for (c, parts) in [('æ', "ae"), ('Æ', "AE"), ('œ', "oe"), ('Œ', "OE"), ('ß', "ss")] {
            let ces: Vec<u32> = parts
                .chars()
                .filter_map(|p| table.get(p).and_then(|ces| ces.first().copied()))
                .collect();
            table.insert(c, &ces);
        }
        for c in ['\u{ad}', '\u{200b}', '\u{200c}', '\u{200d}', '\u{feff}'] {
            table.insert(c, &[0]);
        }
        table
    }

    /// Appends the elements of `c` to `out`.
    pub fn append_ces(&self, c: char, out: &mut Vec<u32>) {
        if let Some(ces) = self.get(c) {
            out.extend_from_slice(ces);
            return;
        }
        decompose_canonical(c, |part| match self.get(part) {
            Some(ces) => out.extend_from_slice(ces),
            None => out.extend_from_slice(&Self::implicit_ces(part)),
        });
    }
}

/// Iterates the collation elements of a text through a [`CollationTable`].
#[derive(Clone, Debug)]
pub struct TableCollationIterator<'a> {
    table: &'a CollationTable,
    text: &'a str,
    offset: usize,
    // elements of the current character, in the order they are popped
    pending: Vec<u32>,
    forward: bool,
}

impl<'a> TableCollationIterator<'a> {
    /// Starts at the beginning of `text`.
    pub fn new(table: &'a CollationTable, text: &'a str) -> Self {
        Self {
            table,
            text,
            offset: 0,
            pending: Vec::new(),
            forward: true,
        }
    }
}

impl CollationElements for TableCollationIterator<'_> {
    fn next(&mut self) -> Option<u32> {
        if !self.forward {
            self.pending.clear();
            self.forward = true;
        }
        loop {
            if let Some(ce) = self.pending.pop() {
                return Some(ce);
            }
            let c = self.text[self.offset..].chars().next()?;
            self.offset += c.len_utf8();
            self.table.append_ces(c, &mut self.pending);
            self.pending.reverse();
        }
    }

    fn previous(&mut self) -> Option<u32> {
        if self.forward {
            self.pending.clear();
            self.forward = false;
        }
        loop {
            if let Some(ce) = self.pending.pop() {
                return Some(ce);
            }
            let c = self.text[..self.offset].chars().next_back()?;
            self.offset -= c.len_utf8();
            self.table.append_ces(c, &mut self.pending);
        }
    }

    #[inline]
    fn offset(&self) -> usize {
        self.offset
    }

    /// # Panics
    ///
    /// Panics if `offset` is not a character boundary of the text.
    fn set_offset(&mut self, offset: usize) {
        assert!(
            self.text.is_char_boundary(offset),
            "offset {offset} is not a character boundary"
        );
        self.offset = offset;
        self.pending.clear();
    }

    fn text(&self) -> &str {
        self.text
    }
}

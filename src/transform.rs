use crate::TrieError;

pub(crate) const TRANSFORM_NONE: u32 = 0;
pub(crate) const TRANSFORM_TYPE_OFFSET: u32 = 0x0100_0000;
pub(crate) const TRANSFORM_TYPE_MASK: u32 = 0x7f00_0000;
pub(crate) const TRANSFORM_OFFSET_MASK: u32 = 0x001f_ffff;

const ZWJ: char = '\u{200D}';
const ZWNJ: char = '\u{200C}';
/// Largest byte an offset-mapped code point may use; 0xfe and 0xff are
/// reserved for the joiners.
const MAX_OFFSET_BYTE: u32 = 0xfd;

/// Maps code points onto the units of a dictionary trie.
///
/// Byte dictionaries cover a single script block: each code point is stored
/// as its distance from a base offset, with the two joiners mapped to the
/// reserved bytes `0xff` and `0xfe`. Chars dictionaries store UTF-16 units
/// and need no transform.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnitTransform {
    /// Code units are UTF-16.
    None,
    /// Code points are stored as `c - offset`, one byte each.
    Offset(u32),
}

impl UnitTransform {
    /// Decodes a transform from its stored form.
    ///
    /// # Errors
    ///
    /// Returns [`TrieError::UnsupportedTransform`] for unknown transform types.
    pub fn from_raw(raw: u32) -> Result<Self, TrieError> {
        match raw & TRANSFORM_TYPE_MASK {
            TRANSFORM_NONE if raw == TRANSFORM_NONE => Ok(UnitTransform::None),
            TRANSFORM_TYPE_OFFSET => Ok(UnitTransform::Offset(raw & TRANSFORM_OFFSET_MASK)),
            _ => Err(TrieError::UnsupportedTransform(raw)),
        }
    }

    /// Returns the stored form of this transform.
    pub fn to_raw(self) -> u32 {
        match self {
            UnitTransform::None => TRANSFORM_NONE,
            UnitTransform::Offset(offset) => TRANSFORM_TYPE_OFFSET | (offset & TRANSFORM_OFFSET_MASK),
        }
    }

    /// Chooses the offset transform for `words`: the smallest code point
    /// used, other than the joiners.
    ///
    /// Returns `None` if the words span more code points than one byte can hold.
    pub fn offset_for<'w>(words: impl IntoIterator<Item = &'w str>) -> Option<Self> {
        let mut min = u32::MAX;
        let mut max = 0;
        for c in words.into_iter().flat_map(str::chars) {
            if c == ZWJ || c == ZWNJ {
                continue;
            }
            min = min.min(c as u32);
            max = max.max(c as u32);
        }
        if min == u32::MAX {
            return Some(UnitTransform::Offset(0));
        }
        (max - min <= MAX_OFFSET_BYTE).then_some(UnitTransform::Offset(min))
    }

    /// Maps one code point to its byte, or `None` if it cannot occur in the trie.
    #[inline]
    pub fn to_byte(self, c: char) -> Option<u8> {
        match (self, c) {
            (UnitTransform::Offset(_), ZWJ) => Some(0xff),
            (UnitTransform::Offset(_), ZWNJ) => Some(0xfe),
            (UnitTransform::Offset(offset), c) => (c as u32)
                .checked_sub(offset)
                .filter(|&delta| delta <= MAX_OFFSET_BYTE)
                .map(|delta| delta as u8),
            (UnitTransform::None, _) => None,
        }
    }

    /// Maps a whole word to bytes.
    ///
    /// # Errors
    ///
    /// Returns [`TrieError::UnmappableCharacter`] for the first character
    /// outside the transform's range.
    pub fn encode_key(self, word: &str) -> Result<Vec<u8>, TrieError> {
        word.chars()
            .map(|c| self.to_byte(c).ok_or(TrieError::UnmappableCharacter(c)))
            .collect()
    }
}

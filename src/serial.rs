use crate::dict::{BytesDictionaryMatcher, CharsDictionaryMatcher, Dictionary};
use crate::transform::UnitTransform;
use crate::TrieError;

const MAGIC: &[u8; 4] = b"LXDC";
const VERSION: u8 = 1;

// Slots of the index table that follows the 8-byte preamble. Offsets are
// byte offsets from the start of the index table.
const IX_STRING_TRIE_OFFSET: usize = 0;
const IX_RESERVED1_OFFSET: usize = 1;
const IX_RESERVED2_OFFSET: usize = 2;
const IX_TOTAL_SIZE: usize = 3;
const IX_TRIE_TYPE: usize = 4;
const IX_TRANSFORM: usize = 5;
const IX_COUNT: usize = 8;

const TRIE_TYPE_BYTES: u32 = 0;
const TRIE_TYPE_UCHARS: u32 = 1;
const TRIE_TYPE_MASK: u32 = 7;
const TRIE_HAS_VALUES: u32 = 8;

/// Preamble (magic, version, 3 reserved bytes) plus the index table.
pub(crate) const HEADER_SIZE: usize = 8 + IX_COUNT * 4;

impl Dictionary {
    /// Serializes the dictionary.
    ///
    /// Layout:
    /// - `[0..4]`: magic `"LXDC"`
    /// - `[4]`: version (1)
    /// - `[5..8]`: reserved
    /// - `[8..40]`: eight little-endian `i32` indexes
    /// - trie units, little-endian for chars tries
    pub fn to_bytes(&self) -> Vec<u8> {
        let (trie_type, transform, trie): (u32, UnitTransform, Vec<u8>) = match self {
            Dictionary::Bytes(d) => (TRIE_TYPE_BYTES, d.transform(), d.units().to_vec()),
            Dictionary::Chars(d) => (
                TRIE_TYPE_UCHARS,
                UnitTransform::None,
                d.units().iter().flat_map(|u| u.to_le_bytes()).collect(),
            ),
        };
        let trie_offset = IX_COUNT * 4;
        let trie_end = trie_offset + trie.len();

        let mut indexes = [0u32; IX_COUNT];
        indexes[IX_STRING_TRIE_OFFSET] = trie_offset as u32;
        indexes[IX_RESERVED1_OFFSET] = trie_end as u32;
        indexes[IX_RESERVED2_OFFSET] = trie_end as u32;
        indexes[IX_TOTAL_SIZE] = trie_end as u32;
        indexes[IX_TRIE_TYPE] = trie_type | TRIE_HAS_VALUES;
        indexes[IX_TRANSFORM] = transform.to_raw();

        let mut buf = Vec::with_capacity(8 + trie_end);
        buf.extend_from_slice(MAGIC);
        buf.extend_from_slice(&[VERSION, 0, 0, 0]);
        for index in indexes {
            buf.extend_from_slice(&index.to_le_bytes());
        }
        buf.extend_from_slice(&trie);
        buf
    }

    /// Deserializes a dictionary, copying the trie units.
    ///
    /// # Errors
    ///
    /// Returns [`TrieError::InvalidMagic`] if the magic bytes don't match.
    /// Returns [`TrieError::InvalidVersion`] for any version other than 1.
    /// Returns [`TrieError::TruncatedData`] if the indexes point past the buffer.
    /// Returns [`TrieError::UnknownTrieType`] or [`TrieError::UnsupportedTransform`]
    /// if the header describes a trie this crate cannot read.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TrieError> {
        if bytes.len() < HEADER_SIZE {
            return Err(TrieError::TruncatedData);
        }
        if &bytes[0..4] != MAGIC {
            return Err(TrieError::InvalidMagic);
        }
        if bytes[4] != VERSION {
            return Err(TrieError::InvalidVersion);
        }

        let table = &bytes[8..];
        let index = |i: usize| read_u32_le(table, i * 4).ok_or(TrieError::TruncatedData);
        let trie_offset = index(IX_STRING_TRIE_OFFSET)? as usize;
        let trie_end = index(IX_RESERVED1_OFFSET)? as usize;
        let total_size = index(IX_TOTAL_SIZE)? as usize;
        let trie_type = index(IX_TRIE_TYPE)?;
        let transform = index(IX_TRANSFORM)?;

        if trie_offset < IX_COUNT * 4 || trie_end < trie_offset || total_size < trie_end {
            return Err(TrieError::TruncatedData);
        }
        let trie = table
            .get(trie_offset..trie_end)
            .ok_or(TrieError::TruncatedData)?;

        let dictionary = match trie_type & TRIE_TYPE_MASK {
            TRIE_TYPE_BYTES => match UnitTransform::from_raw(transform)? {
                UnitTransform::None => return Err(TrieError::UnsupportedTransform(transform)),
                t => Dictionary::Bytes(BytesDictionaryMatcher::new(trie.to_vec(), t)),
            },
            TRIE_TYPE_UCHARS => {
                if !trie.len().is_multiple_of(2) {
                    return Err(TrieError::TruncatedData);
                }
                let units = trie
                    .chunks_exact(2)
                    .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                    .collect();
                Dictionary::Chars(CharsDictionaryMatcher::new(units))
            }
            other => return Err(TrieError::UnknownTrieType(other)),
        };
        tracing::debug!(
            trie_type = trie_type & TRIE_TYPE_MASK,
            trie_bytes = trie.len(),
            "loaded dictionary"
        );
        Ok(dictionary)
    }
}

fn read_u32_le(bytes: &[u8], offset: usize) -> Option<u32> {
    let raw = bytes.get(offset..offset + 4)?;
    Some(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DictionaryMatcher, WordMatch};

    fn chars_dictionary() -> Dictionary {
        CharsDictionaryMatcher::from_words([("東京", 20), ("京都", 10)])
            .unwrap()
            .into()
    }

    #[test]
    fn chars_round_trip() {
        let dict = chars_dictionary();
        let bytes = dict.to_bytes();
        assert_eq!(&bytes[0..4], b"LXDC");
        let loaded = Dictionary::from_bytes(&bytes).unwrap();
        assert_eq!(loaded, dict);

        let mut out = Vec::new();
        let text: Vec<char> = "京都".chars().collect();
        loaded.matches(&text, 20, 20, &mut out).unwrap();
        assert_eq!(out, [WordMatch { len: 2, value: 10 }]);
    }

    #[test]
    fn bytes_round_trip() {
        let dict: Dictionary = BytesDictionaryMatcher::from_words(
            [("\u{0e01}\u{0e32}", 5)],
            UnitTransform::Offset(0x0e00),
        )
        .unwrap()
        .into();
        let loaded = Dictionary::from_bytes(&dict.to_bytes()).unwrap();
        assert_eq!(loaded, dict);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = chars_dictionary().to_bytes();
        bytes[0] = b'X';
        assert_eq!(Dictionary::from_bytes(&bytes), Err(TrieError::InvalidMagic));
    }

    #[test]
    fn rejects_bad_version() {
        let mut bytes = chars_dictionary().to_bytes();
        bytes[4] = 9;
        assert_eq!(Dictionary::from_bytes(&bytes), Err(TrieError::InvalidVersion));
    }

    #[test]
    fn rejects_truncated_data() {
        let bytes = chars_dictionary().to_bytes();
        assert_eq!(
            Dictionary::from_bytes(&bytes[..HEADER_SIZE - 1]),
            Err(TrieError::TruncatedData)
        );
        assert_eq!(
            Dictionary::from_bytes(&bytes[..bytes.len() - 1]),
            Err(TrieError::TruncatedData)
        );
    }

    #[test]
    fn rejects_unknown_trie_type() {
        let mut bytes = chars_dictionary().to_bytes();
        let at = 8 + IX_TRIE_TYPE * 4;
        bytes[at] = 5;
        assert_eq!(Dictionary::from_bytes(&bytes), Err(TrieError::UnknownTrieType(5)));
    }

    #[test]
    fn rejects_byte_trie_without_transform() {
        let mut bytes = chars_dictionary().to_bytes();
        let at = 8 + IX_TRIE_TYPE * 4;
        bytes[at] = (TRIE_TYPE_BYTES | TRIE_HAS_VALUES) as u8;
        assert_eq!(
            Dictionary::from_bytes(&bytes),
            Err(TrieError::UnsupportedTransform(0))
        );
    }
}

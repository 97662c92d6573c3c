use crate::transform::UnitTransform;
use crate::{ByteTrie, ByteTrieBuilder, CharsTrie, CharsTrieBuilder, TrieError};

/// A dictionary word found at the start of the text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WordMatch {
    /// Length of the word in code points.
    pub len: usize,
    /// The value stored with the word, typically a cost.
    pub value: i32,
}

/// Looks up dictionary words that are prefixes of a text.
pub trait DictionaryMatcher {
    /// Appends to `out` every dictionary word that starts at `text[0]`,
    /// shortest first, at most `max_length` code points long, stopping after
    /// `limit` matches.
    ///
    /// Returns the number of code points examined.
    fn matches(
        &self,
        text: &[char],
        max_length: usize,
        limit: usize,
        out: &mut Vec<WordMatch>,
    ) -> Result<usize, TrieError>;
}

/// Collects values while stepping a trie cursor one code point at a time.
///
/// `step` consumes one code point and reports whether the path continues.
fn collect_matches<F>(
    text: &[char],
    max_length: usize,
    limit: usize,
    out: &mut Vec<WordMatch>,
    mut step: F,
) -> Result<usize, TrieError>
where
    F: FnMut(char) -> Result<Option<(Option<i32>, bool)>, TrieError>,
{
    let mut examined = 0;
    let mut found = 0;
    for &c in text.iter().take(max_length) {
        examined += 1;
        // (value at this length, whether longer words may follow)
        let Some((value, has_next)) = step(c)? else {
            break;
        };
        if let Some(value) = value {
            if found < limit {
                out.push(WordMatch {
                    len: examined,
                    value,
                });
                found += 1;
            }
        }
        if !has_next {
            break;
        }
    }
    Ok(examined)
}

/// A dictionary stored as a byte trie over offset-mapped code points.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BytesDictionaryMatcher {
    units: Vec<u8>,
    transform: UnitTransform,
}

impl BytesDictionaryMatcher {
    /// Wraps serialized trie bytes with the transform used to build them.
    pub fn new(units: Vec<u8>, transform: UnitTransform) -> Self {
        Self { units, transform }
    }

    /// Builds a dictionary from words and their values.
    ///
    /// # Errors
    ///
    /// Returns [`TrieError::UnmappableCharacter`] if a word does not fit the
    /// transform, and the builder's errors for empty or duplicate input.
    pub fn from_words<'w>(
        words: impl IntoIterator<Item = (&'w str, i32)>,
        transform: UnitTransform,
    ) -> Result<Self, TrieError> {
        let mut builder = ByteTrieBuilder::new();
        for (word, value) in words {
            builder.add(&transform.encode_key(word)?, value);
        }
        Ok(Self::new(builder.build()?, transform))
    }

    /// Returns the serialized trie.
    pub fn units(&self) -> &[u8] {
        &self.units
    }

    /// Returns the code point transform.
    pub fn transform(&self) -> UnitTransform {
        self.transform
    }
}

impl DictionaryMatcher for BytesDictionaryMatcher {
    fn matches(
        &self,
        text: &[char],
        max_length: usize,
        limit: usize,
        out: &mut Vec<WordMatch>,
    ) -> Result<usize, TrieError> {
        let mut trie = ByteTrie::new(&self.units);
        collect_matches(text, max_length, limit, out, |c| {
            let Some(byte) = self.transform.to_byte(c) else {
                return Ok(None);
            };
            if !trie.next(byte)? {
                return Ok(None);
            }
            let value = trie.has_value()?.then(|| trie.value());
            Ok(Some((value, trie.has_next()?)))
        })
    }
}

/// A dictionary stored as a trie over UTF-16 code units.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CharsDictionaryMatcher {
    units: Vec<u16>,
}

impl CharsDictionaryMatcher {
    /// Wraps serialized trie units.
    pub fn new(units: Vec<u16>) -> Self {
        Self { units }
    }

    /// Builds a dictionary from words and their values.
    pub fn from_words<'w>(words: impl IntoIterator<Item = (&'w str, i32)>) -> Result<Self, TrieError> {
        let mut builder = CharsTrieBuilder::new();
        for (word, value) in words {
            builder.add_str(word, value);
        }
        Ok(Self::new(builder.build()?))
    }

    /// Returns the serialized trie.
    pub fn units(&self) -> &[u16] {
        &self.units
    }
}

impl DictionaryMatcher for CharsDictionaryMatcher {
    fn matches(
        &self,
        text: &[char],
        max_length: usize,
        limit: usize,
        out: &mut Vec<WordMatch>,
    ) -> Result<usize, TrieError> {
        let mut trie = CharsTrie::new(&self.units);
        collect_matches(text, max_length, limit, out, |c| {
            if !trie.next_code_point(c)? {
                return Ok(None);
            }
            let value = trie.has_value()?.then(|| trie.value());
            Ok(Some((value, trie.has_next()?)))
        })
    }
}

/// A loaded dictionary of either trie flavor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Dictionary {
    /// Byte trie with an offset transform.
    Bytes(BytesDictionaryMatcher),
    /// UTF-16 unit trie.
    Chars(CharsDictionaryMatcher),
}

impl DictionaryMatcher for Dictionary {
    #[inline]
    fn matches(
        &self,
        text: &[char],
        max_length: usize,
        limit: usize,
        out: &mut Vec<WordMatch>,
    ) -> Result<usize, TrieError> {
        match self {
            Dictionary::Bytes(d) => d.matches(text, max_length, limit, out),
            Dictionary::Chars(d) => d.matches(text, max_length, limit, out),
        }
    }
}

impl From<BytesDictionaryMatcher> for Dictionary {
    fn from(d: BytesDictionaryMatcher) -> Self {
        Dictionary::Bytes(d)
    }
}

impl From<CharsDictionaryMatcher> for Dictionary {
    fn from(d: CharsDictionaryMatcher) -> Self {
        Dictionary::Chars(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    fn matches(dict: &impl DictionaryMatcher, text: &str, max: usize, limit: usize) -> (usize, Vec<WordMatch>) {
        let mut out = Vec::new();
        let examined = dict.matches(&chars(text), max, limit, &mut out).unwrap();
        (examined, out)
    }

    fn wm(len: usize, value: i32) -> WordMatch {
        WordMatch { len, value }
    }

    #[test]
    fn chars_prefix_matches() {
        let dict = CharsDictionaryMatcher::from_words([("東", 50), ("東京", 20), ("東京都", 30), ("京都", 10)]).unwrap();
        let (examined, out) = matches(&dict, "東京都庁", 20, 20);
        assert_eq!(out, [wm(1, 50), wm(2, 20), wm(3, 30)]);
        // "東京都" is final, so "庁" is never examined
        assert_eq!(examined, 3);
        let (examined, out) = matches(&dict, "京", 20, 20);
        assert!(out.is_empty());
        assert_eq!(examined, 1);
    }

    #[test]
    fn final_value_stops_early() {
        let dict = CharsDictionaryMatcher::from_words([("ab", 1)]).unwrap();
        let (examined, out) = matches(&dict, "abcd", 20, 20);
        assert_eq!(out, [wm(2, 1)]);
        assert_eq!(examined, 2);
    }

    #[test]
    fn max_length_and_limit() {
        let dict = CharsDictionaryMatcher::from_words([("a", 1), ("ab", 2), ("abc", 3)]).unwrap();
        let (examined, out) = matches(&dict, "abc", 2, 20);
        assert_eq!(out, [wm(1, 1), wm(2, 2)]);
        assert_eq!(examined, 2);
        let (_, out) = matches(&dict, "abc", 20, 1);
        assert_eq!(out, [wm(1, 1)]);
    }

    #[test]
    fn supplementary_characters_count_once() {
        let dict = CharsDictionaryMatcher::from_words([("𠮷野", 7)]).unwrap();
        let (_, out) = matches(&dict, "𠮷野家", 20, 20);
        assert_eq!(out, [wm(2, 7)]);
    }

    #[test]
    fn bytes_dictionary() {
        let words = [("\u{0e01}\u{0e32}", 5), ("\u{0e01}\u{0e32}\u{0e23}", 9)];
        let transform = UnitTransform::offset_for(words.iter().map(|w| w.0)).unwrap();
        let dict = BytesDictionaryMatcher::from_words(words, transform).unwrap();
        let (_, out) = matches(&dict, "\u{0e01}\u{0e32}\u{0e23}\u{0e01}", 20, 20);
        assert_eq!(out, [wm(2, 5), wm(3, 9)]);
        // outside the transform's range
        let (examined, out) = matches(&dict, "x", 20, 20);
        assert!(out.is_empty());
        assert_eq!(examined, 1);
    }

    #[test]
    fn bytes_dictionary_rejects_unmappable_words() {
        let result = BytesDictionaryMatcher::from_words([("a\u{3042}", 1)], UnitTransform::Offset(0x3040));
        assert_eq!(result, Err(TrieError::UnmappableCharacter('a')));
    }

    #[test]
    fn enum_dispatch() {
        let dict: Dictionary = CharsDictionaryMatcher::from_words([("x", 3)]).unwrap().into();
        let (_, out) = matches(&dict, "xy", 20, 20);
        assert_eq!(out, [wm(1, 3)]);
    }
}

use unicode_normalization::char::canonical_combining_class;
use unicode_normalization::{is_nfkc, is_nfkc_quick, IsNormalized, UnicodeNormalization};

/// Text as a code point array, with each index mapped back to a byte offset
/// in the source string.
///
/// `offset(i)` is the source offset of the boundary before `chars[i]`, and
/// `offset(len)` is the source length. When normalization turns a source
/// segment into several characters, boundaries inside that expansion map to
/// the segment start.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NormalizedText {
    chars: Vec<char>,
    offsets: Vec<usize>,
}

impl NormalizedText {
    /// Takes the text as is.
    pub fn identity(text: &str) -> Self {
        let mut chars = Vec::with_capacity(text.len());
        let mut offsets = Vec::with_capacity(text.len() + 1);
        for (i, c) in text.char_indices() {
            chars.push(c);
            offsets.push(i);
        }
        offsets.push(text.len());
        Self { chars, offsets }
    }

    /// Applies NFKC, unless the text is already normalized.
    ///
    /// The text is normalized in segments that start at characters with a
    /// normalization boundary before them, so every boundary between segments
    /// maps to an exact source offset.
    pub fn nfkc(text: &str) -> Self {
        if is_nfkc(text) {
            return Self::identity(text);
        }
        let mut chars = Vec::with_capacity(text.len());
        let mut offsets = vec![0];
        let mut segment_start = 0;
        for (i, c) in text.char_indices().skip(1) {
            if has_boundary_before(c) {
                push_segment(&text[segment_start..i], segment_start, &mut chars, &mut offsets);
                segment_start = i;
            }
        }
        if segment_start < text.len() {
            push_segment(&text[segment_start..], segment_start, &mut chars, &mut offsets);
        }
        Self { chars, offsets }
    }

    /// The code points.
    #[inline]
    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    /// Source byte offset of the boundary before `chars[index]`.
    ///
    /// # Panics
    ///
    /// Panics if `index > len()`.
    #[inline]
    pub fn offset(&self, index: usize) -> usize {
        self.offsets[index]
    }

    /// Number of code points.
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    /// Returns true if there are no code points.
    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }
}

fn push_segment(segment: &str, start: usize, chars: &mut Vec<char>, offsets: &mut Vec<usize>) {
    let end = start + segment.len();
    let before = chars.len();
    chars.extend(segment.nfkc());
    let added = chars.len() - before;
    offsets.extend(std::iter::repeat_n(start, added.saturating_sub(1)));
    if added > 0 {
        offsets.push(end);
    }
}

/// True if nothing before `c` can combine or reorder with it.
fn has_boundary_before(c: char) -> bool {
    match std::iter::once(c).nfkd().next() {
        Some(first) => {
            canonical_combining_class(first) == 0
                && !matches!(
                    is_nfkc_quick(std::iter::once(first)),
                    IsNormalized::Maybe
                )
        }
        None => true,
    }
}

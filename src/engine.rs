use std::ops::Range;

use unicode_segmentation::UnicodeSegmentation;

use crate::charset::CharSet;
use crate::config::SegmenterConfig;
use crate::dict::{Dictionary, DictionaryMatcher, WordMatch};
use crate::normalize::NormalizedText;
use crate::TrieError;

const UNREACHABLE: i64 = i64::MAX;

/// Kinds of text boundaries a break engine may be asked for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BreakKind {
    /// Grapheme cluster boundaries.
    Character,
    /// Word boundaries.
    Word,
    /// Line break opportunities.
    Line,
    /// Sentence boundaries.
    Sentence,
    /// Title-casing boundaries.
    Title,
}

/// Script-specific adjustment applied at each reachable position after the
/// dictionary candidates, with `(chars, position, config, lattice)`.
pub type Relaxation = fn(&[char], usize, &SegmenterConfig, &mut Lattice);

/// Everything that distinguishes one dictionary-segmented script from another.
#[derive(Clone, Debug)]
pub struct ScriptProfile {
    /// Name used in log events.
    pub name: &'static str,
    /// Characters the engine segments.
    pub word_set: CharSet,
    /// Break kinds the engine serves.
    pub kinds: Vec<BreakKind>,
    /// Optional extra candidate words.
    pub relaxation: Option<Relaxation>,
}

impl ScriptProfile {
    /// A word-breaking profile with no relaxation.
    pub fn new(name: &'static str, word_set: CharSet) -> Self {
        Self {
            name,
            word_set,
            kinds: vec![BreakKind::Word],
            relaxation: None,
        }
    }

    /// Replaces the supported break kinds.
    pub fn with_kinds(mut self, kinds: &[BreakKind]) -> Self {
        self.kinds = kinds.to_vec();
        self
    }

    /// Sets the relaxation function.
    pub fn with_relaxation(mut self, relaxation: Relaxation) -> Self {
        self.relaxation = Some(relaxation);
        self
    }

    /// Chinese and Japanese: Han, Hiragana and Katakana, with Katakana runs
    /// as candidate words.
    pub fn chinese_japanese() -> Self {
        let mut word_set = CharSet::han();
        word_set
            .add_all(&CharSet::hiragana())
            .add_all(&CharSet::katakana())
            .add('\u{ff9e}')
            .add('\u{ff9f}')
            .add('\u{ff70}')
            .add('\u{30fc}');
        Self::new("chinese_japanese", word_set).with_relaxation(relax_katakana_run)
    }
}

/// Returns true for the Katakana letters, marks and halfwidth forms that make
/// up a Katakana run.
#[inline]
pub fn is_katakana(c: char) -> bool {
    matches!(c, '\u{30a1}'..='\u{30fe}' | '\u{ff66}'..='\u{ff9f}') && c != '\u{30fb}'
}

/// Offers a Katakana run starting at `i` as one word, priced by its length.
pub fn relax_katakana_run(chars: &[char], i: usize, config: &SegmenterConfig, lattice: &mut Lattice) {
    if !is_katakana(chars[i]) || (i > 0 && is_katakana(chars[i - 1])) {
        return;
    }
    let limit = config.max_katakana_group_length;
    let mut j = i + 1;
    while j < chars.len() && j - i < limit && is_katakana(chars[j]) {
        j += 1;
    }
    if j - i < limit {
        lattice.relax(i, j, config.katakana_cost(j - i));
    }
}

/// Minimum cumulative cost to reach each position of a text, and the position
/// it was reached from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Lattice {
    best: Vec<i64>,
    prev: Vec<Option<usize>>,
}

impl Lattice {
    /// A lattice over `len` characters where only position 0 is reachable.
    pub fn new(len: usize) -> Self {
        let mut best = vec![UNREACHABLE; len + 1];
        best[0] = 0;
        Self {
            best,
            prev: vec![None; len + 1],
        }
    }

    /// Number of characters.
    pub fn len(&self) -> usize {
        self.best.len() - 1
    }

    /// Returns true if the lattice covers no characters.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Best cost to reach position `i`, or `None` if it is unreachable.
    #[inline]
    pub fn cost(&self, i: usize) -> Option<i64> {
        let cost = self.best[i];
        (cost != UNREACHABLE).then_some(cost)
    }

    /// Position that `i` is best reached from.
    #[inline]
    pub fn prev(&self, i: usize) -> Option<usize> {
        self.prev[i]
    }

    /// Offers a word from `from` to `to`. Returns true if it improved `to`.
    #[inline]
    pub fn relax(&mut self, from: usize, to: usize, cost: i64) -> bool {
        let Some(base) = self.cost(from) else {
            return false;
        };
        let candidate = base.saturating_add(cost);
        if candidate < self.best[to] {
            self.best[to] = candidate;
            self.prev[to] = Some(from);
            true
        } else {
            false
        }
    }

    /// Word end positions along the best path, ascending and ending at `len()`.
    ///
    /// If the end is unreachable the whole text is one word.
    pub fn boundaries(&self) -> Vec<usize> {
        let n = self.len();
        if n == 0 {
            return Vec::new();
        }
        if self.cost(n).is_none() {
            return vec![n];
        }
        let mut out = Vec::new();
        let mut i = n;
        while i > 0 {
            out.push(i);
            match self.prev[i] {
                Some(p) => i = p,
                None => break,
            }
        }
        out.reverse();
        out
    }
}

/// Splits runs of dictionary characters into words by minimum total cost.
///
/// Costs are dictionary values, typically negative log frequencies, so the
/// cheapest path is the most likely segmentation.
#[derive(Clone, Debug)]
pub struct DictionaryBreakEngine<D = Dictionary> {
    profile: ScriptProfile,
    dictionary: D,
    config: SegmenterConfig,
}

impl<D: DictionaryMatcher> DictionaryBreakEngine<D> {
    /// Creates an engine.
    pub fn new(profile: ScriptProfile, dictionary: D, config: SegmenterConfig) -> Self {
        tracing::debug!(profile = profile.name, "created dictionary break engine");
        Self {
            profile,
            dictionary,
            config,
        }
    }

    /// Creates a Chinese/Japanese engine with the default configuration.
    pub fn chinese_japanese(dictionary: D) -> Self {
        Self::new(
            ScriptProfile::chinese_japanese(),
            dictionary,
            SegmenterConfig::default(),
        )
    }

    /// The script profile.
    pub fn profile(&self) -> &ScriptProfile {
        &self.profile
    }

    /// The configuration.
    pub fn config(&self) -> &SegmenterConfig {
        &self.config
    }

    /// Returns true if this engine serves `kind` and segments `c`.
    pub fn handles(&self, c: char, kind: BreakKind) -> bool {
        self.profile.kinds.contains(&kind) && self.profile.word_set.contains(c)
    }

    /// Runs the cost sweep over `chars`.
    ///
    /// At each reachable position every dictionary word up to
    /// `max_word_length` is a candidate. A single character costing
    /// `fallback_cost` is added when no one-character word exists there, so
    /// the end is always reachable.
    pub fn find_boundaries(&self, chars: &[char]) -> Result<Lattice, TrieError> {
        let n = chars.len();
        let mut lattice = Lattice::new(n);
        let mut words: Vec<WordMatch> = Vec::new();
        for i in 0..n {
            if lattice.cost(i).is_none() {
                continue;
            }
            let max = self.config.max_word_length.min(n - i);
            words.clear();
            self.dictionary.matches(&chars[i..], max, max, &mut words)?;
            for word in &words {
                lattice.relax(i, i + word.len, i64::from(word.value));
            }
            if words.first().is_none_or(|w| w.len != 1) {
                lattice.relax(i, i + 1, self.config.fallback_cost);
            }
            if let Some(relax) = self.profile.relaxation {
                relax(chars, i, &self.config, &mut lattice);
            }
        }
        Ok(lattice)
    }

    /// Word end offsets of `text`, ascending and ending at `text.len()`.
    ///
    /// Offsets are byte offsets into `text` even when it was normalized.
    pub fn segment(&self, text: &str) -> Result<Vec<usize>, TrieError> {
        let normalized = self.normalize(text);
        let lattice = self.find_boundaries(normalized.chars())?;
        let mut ends: Vec<usize> = lattice
            .boundaries()
            .into_iter()
            .map(|b| normalized.offset(b))
            .filter(|&end| end > 0)
            .collect();
        ends.dedup();
        Ok(ends)
    }

    /// Pushes the word boundaries strictly inside `range` onto `found`, in
    /// ascending order, and returns how many were pushed.
    ///
    /// Positions already on `found` are not pushed again.
    ///
    /// # Panics
    ///
    /// Panics if `range` is not on character boundaries of `text`.
    pub fn divide_up_dictionary_range(
        &self,
        text: &str,
        range: Range<usize>,
        found: &mut Vec<usize>,
    ) -> Result<usize, TrieError> {
        if range.start >= range.end {
            return Ok(0);
        }
        let normalized = self.normalize(&text[range.clone()]);
        let lattice = self.find_boundaries(normalized.chars())?;
        if lattice.cost(lattice.len()).is_none() {
            tracing::debug!(
                start = range.start,
                end = range.end,
                "no segmentation path; keeping range whole"
            );
        }
        let boundaries = lattice.boundaries();
        tracing::trace!(
            profile = self.profile.name,
            start = range.start,
            end = range.end,
            chars = normalized.len(),
            words = boundaries.len(),
            "divided dictionary range"
        );

        let mut pushed = 0;
        for b in boundaries {
            let pos = range.start + normalized.offset(b);
            if pos == range.start || pos == range.end || already_found(found, pos) {
                continue;
            }
            found.push(pos);
            pushed += 1;
        }
        Ok(pushed)
    }

    /// The run of word-set characters around `cursor`, within `range`.
    ///
    /// Forward, the run starts at `cursor` and extends toward `range.end`.
    /// In reverse, it ends after the character at `cursor` and extends back
    /// toward `range.start`. The run is empty if the character at `cursor`
    /// is not in the word set.
    ///
    /// # Panics
    ///
    /// Panics if `cursor` is outside `range`, or `range` is outside `text`.
    pub fn dictionary_span(
        &self,
        text: &str,
        cursor: usize,
        range: Range<usize>,
        reverse: bool,
    ) -> Range<usize> {
        assert!(
            range.start <= cursor && cursor <= range.end && range.end <= text.len(),
            "cursor {cursor} outside {range:?}"
        );
        let set = &self.profile.word_set;
        if reverse {
            let Some(c) = text[cursor..].chars().next() else {
                return cursor..cursor;
            };
            let end = cursor + c.len_utf8();
            if !set.contains(c) {
                return end..end;
            }
            let mut start = cursor;
            for (i, c) in text[range.start..cursor].char_indices().rev() {
                if !set.contains(c) {
                    break;
                }
                start = range.start + i;
            }
            start..end
        } else {
            let mut end = cursor;
            for (i, c) in text[cursor..range.end].char_indices() {
                if !set.contains(c) {
                    break;
                }
                end = cursor + i + c.len_utf8();
            }
            cursor..end
        }
    }

    /// Finds the dictionary run at `cursor` and divides it, pushing the
    /// boundaries onto `found`. Returns 0 if this engine does not serve `kind`.
    pub fn find_breaks(
        &self,
        text: &str,
        cursor: usize,
        range: Range<usize>,
        reverse: bool,
        kind: BreakKind,
        found: &mut Vec<usize>,
    ) -> Result<usize, TrieError> {
        if !self.profile.kinds.contains(&kind) {
            return Ok(0);
        }
        let span = self.dictionary_span(text, cursor, range, reverse);
        self.divide_up_dictionary_range(text, span, found)
    }

    /// All word boundaries of `text`, including 0 and `text.len()`.
    ///
    /// Runs of word-set characters are divided with the dictionary; other
    /// text is split at default Unicode word boundaries.
    pub fn word_boundaries(&self, text: &str) -> Result<Vec<usize>, TrieError> {
        let mut found = vec![0];
        let mut pos = 0;
        while let Some(c) = text[pos..].chars().next() {
            let end = if self.handles(c, BreakKind::Word) {
                let span = self.dictionary_span(text, pos, pos..text.len(), false);
                self.divide_up_dictionary_range(text, span.clone(), &mut found)?;
                span.end
            } else {
                let end = text[pos..]
                    .char_indices()
                    .find(|&(_, c)| self.handles(c, BreakKind::Word))
                    .map_or(text.len(), |(i, _)| pos + i);
                found.extend(
                    text[pos..end]
                        .split_word_bound_indices()
                        .skip(1)
                        .map(|(i, _)| pos + i),
                );
                end
            };
            found.push(end);
            pos = end;
        }
        Ok(found)
    }

    fn normalize(&self, text: &str) -> NormalizedText {
        if self.config.normalize {
            NormalizedText::nfkc(text)
        } else {
            NormalizedText::identity(text)
        }
    }
}

fn already_found(found: &[usize], pos: usize) -> bool {
    found.contains(&pos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dict::CharsDictionaryMatcher;
    use proptest::prelude::*;
    use std::collections::BTreeMap;
    use tracing_test::traced_test;

    fn latin_engine(words: &[(&str, i32)]) -> DictionaryBreakEngine<CharsDictionaryMatcher> {
        let dictionary = CharsDictionaryMatcher::from_words(words.iter().copied()).unwrap();
        let profile = ScriptProfile::new("latin", CharSet::from_ranges(&[(0x61, 0x7a)]));
        DictionaryBreakEngine::new(profile, dictionary, SegmenterConfig::default())
    }

    fn cj_engine(words: &[(&str, i32)]) -> DictionaryBreakEngine {
        let dictionary = CharsDictionaryMatcher::from_words(words.iter().copied()).unwrap();
        DictionaryBreakEngine::chinese_japanese(dictionary.into())
    }

    // === lattice ===

    #[test]
    fn lattice_relaxation() {
        let mut lattice = Lattice::new(3);
        assert_eq!(lattice.cost(0), Some(0));
        assert_eq!(lattice.cost(1), None);
        assert!(!lattice.relax(1, 2, 5));
        assert!(lattice.relax(0, 2, 5));
        assert!(!lattice.relax(0, 2, 5));
        assert!(lattice.relax(2, 3, 1));
        assert_eq!(lattice.cost(3), Some(6));
        assert_eq!(lattice.prev(3), Some(2));
        assert_eq!(lattice.boundaries(), [2, 3]);
    }

    #[test]
    fn unreachable_end_is_one_word() {
        let lattice = Lattice::new(4);
        assert_eq!(lattice.boundaries(), [4]);
        assert!(Lattice::new(0).boundaries().is_empty());
    }

    // === segmentation ===

    #[test]
    fn the_cat_sat() {
        let engine = latin_engine(&[("the", 10), ("cat", 10), ("sat", 10)]);
        assert_eq!(engine.segment("thecatsat").unwrap(), [3, 6, 9]);
        let chars: Vec<char> = "thecatsat".chars().collect();
        assert_eq!(engine.find_boundaries(&chars).unwrap().cost(9), Some(30));
    }

    #[test]
    fn fallback_for_unknown_characters() {
        let engine = latin_engine(&[("ab", 10)]);
        assert_eq!(engine.segment("xaby").unwrap(), [1, 3, 4]);
        let chars: Vec<char> = "xaby".chars().collect();
        assert_eq!(engine.find_boundaries(&chars).unwrap().cost(4), Some(255 + 10 + 255));
    }

    #[test]
    fn single_character_word_replaces_fallback() {
        let engine = latin_engine(&[("a", 400)]);
        let chars: Vec<char> = "a".chars().collect();
        assert_eq!(engine.find_boundaries(&chars).unwrap().cost(1), Some(400));
    }

    #[test]
    fn max_word_length_limits_candidates() {
        let dictionary = CharsDictionaryMatcher::from_words([("abc", 1)]).unwrap();
        let profile = ScriptProfile::new("latin", CharSet::from_ranges(&[(0x61, 0x7a)]));
        let config = SegmenterConfig::default().with_max_word_length(2);
        let engine = DictionaryBreakEngine::new(profile, dictionary, config);
        assert_eq!(engine.segment("abc").unwrap(), [1, 2, 3]);
    }

    #[test]
    fn empty_text() {
        let engine = latin_engine(&[("a", 1)]);
        assert!(engine.segment("").unwrap().is_empty());
        assert_eq!(engine.word_boundaries("").unwrap(), [0]);
    }

    // === katakana ===

    #[test]
    fn katakana_run_is_one_word() {
        let engine = cj_engine(&[("東京", 10)]);
        assert_eq!(engine.segment("アイスクリーム").unwrap(), [21]);
    }

    #[test]
    fn short_katakana_run_prefers_single_characters() {
        // 984 for a run of two costs more than two fallbacks
        let engine = cj_engine(&[("東京", 10)]);
        assert_eq!(engine.segment("アイ").unwrap(), [3, 6]);
    }

    #[test]
    fn katakana_cost_propagates_forward() {
        let engine = cj_engine(&[("東京", 10)]);
        let chars: Vec<char> = "アイス東京".chars().collect();
        let lattice = engine.find_boundaries(&chars).unwrap();
        assert_eq!(lattice.cost(3), Some(240));
        assert_eq!(lattice.cost(5), Some(250));
        assert_eq!(lattice.boundaries(), [3, 5]);
    }

    #[test]
    fn katakana_classification() {
        assert!(is_katakana('ア'));
        assert!(is_katakana('ー'));
        assert!(is_katakana('ｱ'));
        assert!(is_katakana('\u{ff9e}'));
        assert!(!is_katakana('・'));
        assert!(!is_katakana('あ'));
    }

    // === normalization ===

    #[test]
    fn offsets_refer_to_the_source_text() {
        let engine = cj_engine(&[("ガギ", 10)]);
        assert_eq!(engine.segment("ｶﾞｷﾞ").unwrap(), [12]);
    }

    #[test]
    fn expansion_boundaries_collapse() {
        let engine = cj_engine(&[("株式", 10), ("会社", 10)]);
        assert_eq!(engine.segment("㍿").unwrap(), [3]);
    }

    #[test]
    fn normalization_can_be_disabled() {
        let engine = latin_engine(&[("the", 10)]);
        assert_eq!(engine.segment("ｔｈｅ").unwrap(), [9]);

        let dictionary = CharsDictionaryMatcher::from_words([("the", 10)]).unwrap();
        let profile = ScriptProfile::new("latin", CharSet::from_ranges(&[(0x61, 0x7a)]));
        let config = SegmenterConfig::default().with_normalize(false);
        let engine = DictionaryBreakEngine::new(profile, dictionary, config);
        assert_eq!(engine.segment("ｔｈｅ").unwrap(), [3, 6, 9]);
    }

    // === ranges ===

    #[test]
    fn divide_up_range() {
        let engine = latin_engine(&[("the", 10), ("cat", 10), ("sat", 10)]);
        let mut found = Vec::new();
        assert_eq!(engine.divide_up_dictionary_range("thecatsat", 0..9, &mut found).unwrap(), 2);
        assert_eq!(found, [3, 6]);

        let mut found = vec![0];
        let text = "xxthecatsat";
        assert_eq!(engine.divide_up_dictionary_range(text, 2..11, &mut found).unwrap(), 2);
        assert_eq!(found, [0, 5, 8]);
    }

    #[test]
    fn divide_up_skips_known_breaks() {
        let engine = latin_engine(&[("the", 10), ("cat", 10), ("sat", 10)]);
        let mut found = vec![3];
        assert_eq!(engine.divide_up_dictionary_range("thecatsat", 0..9, &mut found).unwrap(), 1);
        assert_eq!(found, [3, 6]);
    }

    #[test]
    fn divide_up_checks_the_whole_stack() {
        let engine = latin_engine(&[("the", 10), ("cat", 10), ("sat", 10)]);
        let mut found = vec![5, 0];
        assert_eq!(engine.divide_up_dictionary_range("xxthecatsat", 2..11, &mut found).unwrap(), 1);
        assert_eq!(found, [5, 0, 8]);
    }

    #[test]
    fn empty_range_finds_nothing() {
        let engine = latin_engine(&[("a", 1)]);
        let mut found = Vec::new();
        assert_eq!(engine.divide_up_dictionary_range("abc", 2..2, &mut found).unwrap(), 0);
        assert!(found.is_empty());
    }

    #[test]
    fn dictionary_span_directions() {
        let engine = cj_engine(&[("東京", 10), ("都庁", 10)]);
        let text = "abc東京都庁def";
        assert_eq!(engine.dictionary_span(text, 3, 0..text.len(), false), 3..15);
        assert_eq!(engine.dictionary_span(text, 12, 0..text.len(), true), 3..15);
        assert_eq!(engine.dictionary_span(text, 6, 0..text.len(), true), 3..9);
        assert_eq!(engine.dictionary_span(text, 1, 0..text.len(), false), 1..1);
        assert_eq!(engine.dictionary_span(text, 1, 0..text.len(), true), 2..2);
    }

    #[test]
    fn find_breaks_forward_and_reverse() {
        let engine = cj_engine(&[("東京", 10), ("都庁", 10)]);
        let text = "abc東京都庁def";
        let mut found = Vec::new();
        assert_eq!(engine.find_breaks(text, 3, 0..text.len(), false, BreakKind::Word, &mut found).unwrap(), 1);
        assert_eq!(found, [9]);

        let mut found = Vec::new();
        assert_eq!(engine.find_breaks(text, 12, 0..text.len(), true, BreakKind::Word, &mut found).unwrap(), 1);
        assert_eq!(found, [9]);

        let mut found = Vec::new();
        assert_eq!(engine.find_breaks(text, 3, 0..text.len(), false, BreakKind::Line, &mut found).unwrap(), 0);
        assert!(found.is_empty());
    }

    #[test]
    fn handles_kind_and_set() {
        let engine = cj_engine(&[("東京", 10)]);
        assert!(engine.handles('東', BreakKind::Word));
        assert!(engine.handles('ー', BreakKind::Word));
        assert!(!engine.handles('東', BreakKind::Sentence));
        assert!(!engine.handles('a', BreakKind::Word));
    }

    #[test]
    fn word_boundaries_mixed_text() {
        let engine = cj_engine(&[("東京", 10), ("都庁", 10)]);
        assert_eq!(engine.word_boundaries("abc東京都庁def").unwrap(), [0, 3, 9, 15, 18]);
        assert_eq!(engine.word_boundaries("hi there").unwrap(), [0, 2, 3, 8]);
    }

    // === logging ===

    #[traced_test]
    #[test]
    fn engine_construction_is_logged() {
        let _engine = cj_engine(&[("東京", 10)]);
        assert!(logs_contain("created dictionary break engine"));
    }

    // === cost optimality ===

    /// Cheapest split of `text` where every piece is a dictionary word or a
    /// single character not in the dictionary.
    fn brute_force_cost(text: &[char], words: &BTreeMap<String, i32>) -> i64 {
        let n = text.len();
        let mut best = i64::MAX;
        for mask in 0u32..(1 << (n - 1)) {
            let mut cost = 0i64;
            let mut start = 0;
            for end in 1..=n {
                if end < n && mask & (1 << (end - 1)) == 0 {
                    continue;
                }
                let piece: String = text[start..end].iter().collect();
                match words.get(&piece) {
                    Some(&v) => cost += i64::from(v),
                    None if end - start == 1 => cost += 255,
                    None => {
                        cost = i64::MAX;
                        break;
                    }
                }
                start = end;
            }
            best = best.min(cost);
        }
        best
    }

    proptest! {
        #[test]
        fn segmentation_is_cost_optimal(
            words in proptest::collection::btree_map("[ab]{1,3}", 1i32..300, 1..6),
            text in "[ab]{1,8}",
        ) {
            let list: Vec<(&str, i32)> = words.iter().map(|(w, &v)| (w.as_str(), v)).collect();
            let engine = latin_engine(&list);
            let chars: Vec<char> = text.chars().collect();
            let lattice = engine.find_boundaries(&chars).unwrap();
            let expected = brute_force_cost(&chars, &words);
            prop_assert_eq!(lattice.cost(chars.len()), Some(expected));

            let mut path_cost = 0i64;
            let mut start = 0;
            for end in lattice.boundaries() {
                let piece: String = chars[start..end].iter().collect();
                path_cost += words.get(&piece).map_or(255, |&v| i64::from(v));
                start = end;
            }
            prop_assert_eq!(path_cost, expected);
        }
    }
}

use std::ops::Range;

use unicode_normalization::UnicodeNormalization;
use unicode_segmentation::UnicodeSegmentation;

use crate::ce::{CollationElements, CollationTable, TableCollationIterator};
use crate::ce_buffer::CeBuffer;
use crate::config::{CollationSettings, Strength};
use crate::pce::{CollationPce, ProcessedCe, PROCESSED_NULLORDER};

const LEVEL2_BASE: u32 = 0x0000_0005;
const LEVEL3_BASE: u32 = 0x0005_0000;

/// How target and pattern elements are compared.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ElementComparison {
    /// Elements must be equal.
    #[default]
    Standard,
    /// A common secondary or tertiary weight in the pattern matches any
    /// weight in the target.
    PatternBaseWeightIsWildcard,
    /// A common weight on either side matches any weight, and pattern
    /// elements without a primary may be skipped.
    AnyBaseWeightIsWildcard,
}

/// Outcome of comparing one target element with one pattern element.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CeMatch {
    /// The elements differ.
    NoMatch,
    /// The elements match.
    Match,
    /// Skip the target element and retry the same pattern element.
    SkipTarget,
    /// Skip the pattern element and retry the same target element.
    SkipPattern,
}

/// Compares processed elements under `comparison`.
pub fn compare_ce64s(target: u64, pattern: u64, comparison: ElementComparison) -> CeMatch {
    if target == pattern {
        return CeMatch::Match;
    }
    if comparison == ElementComparison::Standard {
        return CeMatch::NoMatch;
    }
    let any = comparison == ElementComparison::AnyBaseWeightIsWildcard;
    let target_high = (target >> 32) as u32;
    let pattern_high = (pattern >> 32) as u32;

    let target_l1 = target_high & 0xffff_0000;
    let pattern_l1 = pattern_high & 0xffff_0000;
    if target_l1 != pattern_l1 {
        if target_l1 == 0 {
            return CeMatch::SkipTarget;
        }
        if pattern_l1 == 0 && any {
            return CeMatch::SkipPattern;
        }
        return CeMatch::NoMatch;
    }

    let target_l2 = target_high & 0x0000_ffff;
    let pattern_l2 = pattern_high & 0x0000_ffff;
    if target_l2 != pattern_l2 {
        if target_l2 == 0 {
            return CeMatch::SkipTarget;
        }
        if pattern_l2 == 0 && any {
            return CeMatch::SkipPattern;
        }
        return if pattern_l2 == LEVEL2_BASE || (any && target_l2 == LEVEL2_BASE) {
            CeMatch::Match
        } else {
            CeMatch::NoMatch
        };
    }

    let target_l3 = (target as u32) & 0xffff_0000;
    let pattern_l3 = (pattern as u32) & 0xffff_0000;
    if target_l3 != pattern_l3 {
        return if pattern_l3 == LEVEL3_BASE || (any && target_l3 == LEVEL3_BASE) {
            CeMatch::Match
        } else {
            CeMatch::NoMatch
        };
    }
    CeMatch::Match
}

/// Grapheme cluster boundaries of a text.
#[derive(Clone, Debug)]
struct Boundaries {
    offsets: Vec<usize>,
}

impl Boundaries {
    fn new(text: &str) -> Self {
        let mut offsets: Vec<usize> = text.grapheme_indices(true).map(|(i, _)| i).collect();
        offsets.push(text.len());
        Self { offsets }
    }

    fn is_boundary(&self, offset: usize) -> bool {
        self.offsets.binary_search(&offset).is_ok()
    }

    /// First boundary after `offset`, or the text end.
    fn next_after(&self, offset: usize) -> usize {
        let i = self.offsets.partition_point(|&b| b <= offset);
        self.offsets
            .get(i)
            .or(self.offsets.last())
            .copied()
            .unwrap_or(offset)
    }
}

/// Collation-aware substring search.
///
/// Matches are found by comparing processed collation elements, then
/// mapped back to text offsets. A match must start and end on grapheme
/// cluster boundaries, must not start inside an expansion and must not end
/// before the combining marks of its last character.
#[derive(Clone, Debug)]
pub struct StringSearch<'t> {
    table: &'t CollationTable,
    settings: CollationSettings,
    comparison: ElementComparison,
    pattern: String,
    pattern_ces: Vec<u64>,
}

impl<'t> StringSearch<'t> {
    /// Prepares a search for `pattern`.
    pub fn new(
        table: &'t CollationTable,
        settings: CollationSettings,
        pattern: &str,
        comparison: ElementComparison,
    ) -> Self {
        let mut pce = CollationPce::new(TableCollationIterator::new(table, pattern), settings);
        let mut pattern_ces = Vec::new();
        loop {
            let cei = pce.next_processed();
            if cei.is_end() {
                break;
            }
            pattern_ces.push(cei.ce);
        }
        tracing::debug!(
            pattern_ces = pattern_ces.len(),
            ?comparison,
            strength = ?settings.strength,
            "prepared string search"
        );
        Self {
            table,
            settings,
            comparison,
            pattern: pattern.to_owned(),
            pattern_ces,
        }
    }

    /// The pattern text.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The processed elements of the pattern.
    pub fn pattern_ces(&self) -> &[u64] {
        &self.pattern_ces
    }

    /// The collation settings.
    pub fn settings(&self) -> &CollationSettings {
        &self.settings
    }

    /// The element comparison.
    pub fn comparison(&self) -> ElementComparison {
        self.comparison
    }

    /// First match in `target` at or after byte offset `start`.
    ///
    /// Returns `None` if there is none, or if the pattern has no
    /// non-ignorable elements.
    ///
    /// # Panics
    ///
    /// Panics if `start` is not a character boundary of `target`.
    pub fn find(&self, target: &str, start: usize) -> Option<Range<usize>> {
        self.find_with(target, start, &Boundaries::new(target))
    }

    /// Iterates over non-overlapping matches in `target`.
    pub fn matches<'s>(&'s self, target: &'s str) -> Matches<'s, 't> {
        Matches {
            search: self,
            target,
            boundaries: Boundaries::new(target),
            next: Some(0),
        }
    }

    /// All non-overlapping matches in `target`.
    pub fn find_all(&self, target: &str) -> Vec<Range<usize>> {
        self.matches(target).collect()
    }

    fn find_with(&self, target: &str, start: usize, boundaries: &Boundaries) -> Option<Range<usize>> {
        if self.pattern_ces.is_empty() {
            return None;
        }
        let mut elements = TableCollationIterator::new(self.table, target);
        elements.set_offset(start);
        let pce = CollationPce::new(elements, self.settings);
        let mut buffer = CeBuffer::for_pattern(pce, &self.pattern, self.pattern_ces.len(), self.comparison);
        let last_pattern_ce = *self.pattern_ces.last()?;

        let mut target_ix = 0;
        loop {
            let first = element_at(&mut buffer, target_ix, target_ix);
            let mut found = true;
            let mut pattern_ix = 0;
            let mut target_pos = target_ix;
            let mut last_target_ce = first.ce;
            while pattern_ix < self.pattern_ces.len() {
                let target_cei = element_at(&mut buffer, target_ix, target_pos);
                last_target_ce = target_cei.ce;
                match compare_ce64s(target_cei.ce, self.pattern_ces[pattern_ix], self.comparison) {
                    CeMatch::NoMatch => {
                        found = false;
                        break;
                    }
                    CeMatch::Match => {
                        pattern_ix += 1;
                        target_pos += 1;
                    }
                    CeMatch::SkipTarget => target_pos += 1,
                    CeMatch::SkipPattern => pattern_ix += 1,
                }
            }
            if !found || target_pos == target_ix {
                if last_target_ce == PROCESSED_NULLORDER || first.is_end() {
                    return None;
                }
                target_ix += 1;
                continue;
            }

            // The match is complete in element space; map it to text offsets.
            let last = element_at(&mut buffer, target_ix, target_pos - 1);
            let match_start = first.low;
            let min_limit = last.low;
            let mut max_limit;
            if self.comparison == ElementComparison::Standard {
                let next = element_at(&mut buffer, target_ix, target_pos);
                max_limit = next.low;
                if next.low == next.high && !next.is_end() {
                    found = false;
                }
            } else {
                loop {
                    let next = element_at(&mut buffer, target_ix, target_pos);
                    max_limit = next.low;
                    if next.is_end() {
                        break;
                    }
                    if (next.ce >> 32) & 0xffff_0000 == 0 {
                        // Primary-less elements belong to the last matched character.
                        let outcome = compare_ce64s(next.ce, last_pattern_ce, self.comparison);
                        if matches!(outcome, CeMatch::NoMatch | CeMatch::SkipPattern) {
                            found = false;
                            break;
                        }
                    } else if next.low == next.high {
                        found = false;
                        break;
                    } else {
                        break;
                    }
                    target_pos += 1;
                }
            }

            if !boundaries.is_boundary(match_start) || match_start == first.high {
                found = false;
            }

            let mut match_limit = max_limit;
            if min_limit < max_limit {
                if min_limit == last.high && boundaries.is_boundary(min_limit) {
                    match_limit = min_limit;
                } else {
                    let next_boundary = boundaries.next_after(min_limit);
                    if next_boundary >= last.high {
                        match_limit = next_boundary;
                    }
                }
            }
            if match_limit > max_limit || !boundaries.is_boundary(match_limit) {
                found = false;
            }
            if found && self.settings.strength == Strength::Identical {
                found = target
                    .get(match_start..match_limit)
                    .is_some_and(|matched| matched.nfd().eq(self.pattern.nfd()));
            }

            if found {
                tracing::trace!(start = match_start, end = match_limit, "found match");
                return Some(match_start..match_limit);
            }
            target_ix += 1;
        }
    }
}

/// Fetches element `index` of the stream, growing the ring first so that
/// every element from `anchor` on stays cached.
///
/// # Panics
///
/// Panics if `index` is neither cached nor the next element to read.
fn element_at<I: CollationElements>(buffer: &mut CeBuffer<I>, anchor: usize, index: usize) -> ProcessedCe {
    debug_assert!(anchor <= index + 1);
    let needed = index + 2 - anchor;
    if needed > buffer.capacity() {
        buffer.grow(needed.max(buffer.capacity() * 2));
    }
    buffer
        .get(index)
        .unwrap_or_else(|| panic!("element {index} read out of sequence"))
}

/// Iterator returned by [`StringSearch::matches`].
#[derive(Clone, Debug)]
pub struct Matches<'s, 't> {
    search: &'s StringSearch<'t>,
    target: &'s str,
    boundaries: Boundaries,
    next: Option<usize>,
}

impl Iterator for Matches<'_, '_> {
    type Item = Range<usize>;

    fn next(&mut self) -> Option<Range<usize>> {
        let start = self.next?;
        let Some(found) = self.search.find_with(self.target, start, &self.boundaries) else {
            self.next = None;
            return None;
        };
        self.next = if found.end > start {
            Some(found.end)
        } else {
            let after = self.boundaries.next_after(start);
            (after > start).then_some(after)
        };
        Some(found)
    }
}

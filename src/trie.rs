use crate::node::{Node, MIN_LINEAR_MATCH, VALUE_IS_FINAL};
use crate::{TrieError, TrieUnit};

/// A cursor over a serialized string trie.
///
/// The trie maps unit sequences to `i32` values. Traversal is incremental:
/// feed one unit at a time with [`next`](Self::next) and ask
/// [`has_value`](Self::has_value) whether the sequence consumed so far is a key.
///
/// The cursor borrows the serialized units and never mutates them. Every
/// read is bounds-checked; malformed data yields [`TrieError::CorruptNode`].
#[derive(Clone, Debug)]
pub struct StringTrie<'a, U: TrieUnit> {
    units: &'a [U],
    root: usize,
    state: TrieState,
    mark: TrieState,
}

/// Byte-serialized string trie.
pub type ByteTrie<'a> = StringTrie<'a, u8>;

/// UTF-16 unit serialized string trie.
pub type CharsTrie<'a> = StringTrie<'a, u16>;

/// Traversal state, saved and restored by mark/reset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct TrieState {
    /// Position of the next unit to read, `None` once stopped.
    pos: Option<usize>,
    /// Units of the current linear-match node still to be matched.
    pending: usize,
    value: i32,
    have_value: bool,
}

impl TrieState {
    fn at(pos: usize) -> Self {
        Self {
            pos: Some(pos),
            pending: 0,
            value: 0,
            have_value: false,
        }
    }
}

impl<'a, U: TrieUnit> StringTrie<'a, U> {
    /// Creates a cursor at the root, which is the first unit of `units`.
    pub fn new(units: &'a [U]) -> Self {
        Self::with_root(units, 0)
    }

    /// Creates a cursor whose root node starts at `root` within `units`.
    pub fn with_root(units: &'a [U], root: usize) -> Self {
        Self {
            units,
            root,
            state: TrieState::at(root),
            mark: TrieState::at(root),
        }
    }

    /// Returns the cursor to the root and clears the mark.
    pub fn reset(&mut self) -> &mut Self {
        self.state = TrieState::at(self.root);
        self.mark = self.state;
        self
    }

    /// Saves the current traversal state.
    pub fn mark(&mut self) -> &mut Self {
        self.mark = self.state;
        self
    }

    /// Restores the state saved by [`mark`](Self::mark), or the root if none was saved.
    pub fn reset_to_mark(&mut self) -> &mut Self {
        self.state = self.mark;
        self
    }

    /// Stops the traversal; [`next`](Self::next) returns false until reset.
    pub fn stop(&mut self) {
        self.state.pos = None;
    }

    /// Returns true if the traversal has stopped.
    pub fn is_stopped(&self) -> bool {
        self.state.pos.is_none()
    }

    /// Returns the value found by the last successful [`has_value`](Self::has_value)
    /// or [`has_unique_value`](Self::has_unique_value) call.
    #[inline]
    pub fn value(&self) -> i32 {
        self.state.value
    }

    /// Resets to the root, traverses `key` and returns its value, if any.
    pub fn get(&mut self, key: &[U]) -> Result<Option<i32>, TrieError> {
        self.reset();
        if !self.next_units(key)? {
            return Ok(None);
        }
        Ok(self.has_value()?.then_some(self.state.value))
    }

    /// Consumes each unit of `units` in turn.
    ///
    /// Returns false as soon as one of them does not continue a key.
    pub fn next_units(&mut self, units: &[U]) -> Result<bool, TrieError> {
        for &unit in units {
            if !self.next(unit)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Consumes one unit.
    ///
    /// Returns true if the units consumed so far are a prefix of some key.
    /// On a mismatch the cursor stops.
    pub fn next(&mut self, unit: U) -> Result<bool, TrieError> {
        let Some(mut pos) = self.state.pos else {
            return Ok(false);
        };
        self.state.have_value = false;
        let input: u32 = unit.into();
        if self.state.pending > 0 {
            if input == self.unit(pos)? {
                self.state.pending -= 1;
                self.state.pos = Some(pos + 1);
                return Ok(true);
            }
            self.stop();
            return Ok(false);
        }
        let mut lead = self.unit(pos)?;
        if let Node::Value { is_final } = Node::decode::<U>(lead) {
            if is_final {
                self.stop();
                return Ok(false);
            }
            pos += self.value_length(pos, lead)?;
            lead = self.unit(pos)?;
            if lead >= U::MIN_VALUE_LEAD {
                return Err(TrieError::CorruptNode { offset: pos });
            }
        }
        pos += 1;
        match Node::decode::<U>(lead) {
            Node::LinearMatch { len } => {
                if input == self.unit(pos)? {
                    self.state.pending = len - 1;
                    self.state.pos = Some(pos + 1);
                    Ok(true)
                } else {
                    self.stop();
                    Ok(false)
                }
            }
            node => self.branch_next(node, pos, input),
        }
    }

    fn branch_next(&mut self, mut node: Node, mut pos: usize, input: u32) -> Result<bool, TrieError> {
        while let Node::ThreeWayBranch { jump_width } = node {
            let cmp = self.unit(pos)?;
            pos += 1;
            if input < cmp {
                let delta = self.read_fixed_int(pos, jump_width)?;
                pos = self.jump(pos + jump_width, delta)?;
            } else {
                pos += jump_width;
                if input == cmp {
                    return self.follow_entry(pos);
                }
                let lead = self.value_lead(pos)?;
                pos += self.value_length(pos, lead)?;
            }
            let lead = self.unit(pos)?;
            if lead >= MIN_LINEAR_MATCH {
                return Err(TrieError::CorruptNode { offset: pos });
            }
            node = Node::decode::<U>(lead);
            pos += 1;
        }
        let Node::ListBranch { len } = node else {
            return Err(TrieError::CorruptNode { offset: pos });
        };
        let mut remaining = len - 1;
        loop {
            let cmp = self.unit(pos)?;
            pos += 1;
            if input == cmp {
                if remaining > 0 {
                    return self.follow_entry(pos);
                }
                self.state.pos = Some(pos);
                return Ok(true);
            }
            if input < cmp || remaining == 0 {
                self.stop();
                return Ok(false);
            }
            remaining -= 1;
            let lead = self.value_lead(pos)?;
            pos += self.value_length(pos, lead)?;
        }
    }

    /// Moves onto the target of the branch entry at `pos`.
    ///
    /// A final value stays under the cursor for `has_value`; otherwise the
    /// entry is a jump delta to the child node.
    fn follow_entry(&mut self, pos: usize) -> Result<bool, TrieError> {
        let lead = self.value_lead(pos)?;
        if lead & VALUE_IS_FINAL != 0 {
            self.state.pos = Some(pos);
        } else {
            let (delta, next) = self.read_value(pos, lead)?;
            self.state.pos = Some(self.jump(next, delta)?);
        }
        Ok(true)
    }

    /// Returns true if the units consumed so far form a key; its value is then
    /// available from [`value`](Self::value).
    ///
    /// Calling it again without an intervening [`next`](Self::next) returns
    /// the same answer.
    pub fn has_value(&mut self) -> Result<bool, TrieError> {
        if self.state.have_value {
            return Ok(true);
        }
        let Some(pos) = self.state.pos else {
            return Ok(false);
        };
        if self.state.pending > 0 {
            return Ok(false);
        }
        let lead = self.unit(pos)?;
        if lead < U::MIN_VALUE_LEAD {
            return Ok(false);
        }
        let (value, next) = self.read_value(pos, lead)?;
        self.state.value = value;
        self.state.have_value = true;
        self.state.pos = if lead & VALUE_IS_FINAL != 0 {
            None
        } else {
            Some(next)
        };
        Ok(true)
    }

    /// Returns true if some unit could continue the units consumed so far.
    pub fn has_next(&self) -> Result<bool, TrieError> {
        let Some(pos) = self.state.pos else {
            return Ok(false);
        };
        if self.state.pending > 0 {
            return Ok(true);
        }
        let lead = self.unit(pos)?;
        Ok(lead < U::MIN_VALUE_LEAD || lead & VALUE_IS_FINAL == 0)
    }

    /// Returns true if every key that starts with the units consumed so far
    /// maps to the same value, which is then available from [`value`](Self::value).
    ///
    /// Does not move the cursor. Returns false if no key is reachable, which
    /// includes a stopped cursor even after [`has_value`](Self::has_value)
    /// read a final value.
    pub fn has_unique_value(&mut self) -> Result<bool, TrieError> {
        let Some(pos) = self.state.pos else {
            return Ok(false);
        };
        let mut unique = self.state.have_value.then_some(self.state.value);
        let found = self.find_unique_value(pos + self.state.pending, &mut unique)?;
        match unique {
            Some(value) if found => {
                self.state.value = value;
                self.state.have_value = true;
            }
            _ => self.state.have_value = false,
        }
        Ok(self.state.have_value)
    }

    fn find_unique_value(&self, mut pos: usize, unique: &mut Option<i32>) -> Result<bool, TrieError> {
        loop {
            let mut lead = self.unit(pos)?;
            if lead >= U::MIN_VALUE_LEAD {
                let (value, next) = self.read_value(pos, lead)?;
                if !merge_unique(unique, value) {
                    return Ok(false);
                }
                if lead & VALUE_IS_FINAL != 0 {
                    return Ok(true);
                }
                pos = next;
                lead = self.unit(pos)?;
                if lead >= U::MIN_VALUE_LEAD {
                    return Err(TrieError::CorruptNode { offset: pos });
                }
            }
            pos += 1;
            let mut node = Node::decode::<U>(lead);
            if let Node::LinearMatch { len } = node {
                pos += len;
                continue;
            }
            while let Node::ThreeWayBranch { jump_width } = node {
                pos += 1;
                let delta = self.read_fixed_int(pos, jump_width)?;
                pos += jump_width;
                let less = self.jump(pos, delta)?;
                if !self.find_unique_value(less, unique)? {
                    return Ok(false);
                }
                let Some(next) = self.unique_from_entry(pos, unique)? else {
                    return Ok(false);
                };
                pos = next;
                let lead = self.unit(pos)?;
                if lead >= MIN_LINEAR_MATCH {
                    return Err(TrieError::CorruptNode { offset: pos });
                }
                node = Node::decode::<U>(lead);
                pos += 1;
            }
            let Node::ListBranch { len } = node else {
                return Err(TrieError::CorruptNode { offset: pos });
            };
            for _ in 1..len {
                pos += 1;
                let Some(next) = self.unique_from_entry(pos, unique)? else {
                    return Ok(false);
                };
                pos = next;
            }
            // The last key of a list continues inline.
            pos += 1;
        }
    }

    /// Checks the branch entry at `pos` and returns the position after it,
    /// or `None` if it leads to a second distinct value.
    fn unique_from_entry(&self, pos: usize, unique: &mut Option<i32>) -> Result<Option<usize>, TrieError> {
        let lead = self.value_lead(pos)?;
        let (value, next) = self.read_value(pos, lead)?;
        let ok = if lead & VALUE_IS_FINAL != 0 {
            merge_unique(unique, value)
        } else {
            self.find_unique_value(self.jump(next, value)?, unique)?
        };
        Ok(ok.then_some(next))
    }

    #[inline]
    fn unit(&self, pos: usize) -> Result<u32, TrieError> {
        self.units
            .get(pos)
            .map(|&u| u.into())
            .ok_or(TrieError::CorruptNode { offset: pos })
    }

    fn value_lead(&self, pos: usize) -> Result<u32, TrieError> {
        let lead = self.unit(pos)?;
        if lead < U::MIN_VALUE_LEAD {
            return Err(TrieError::CorruptNode { offset: pos });
        }
        Ok(lead)
    }

    fn value_length(&self, pos: usize, lead: u32) -> Result<usize, TrieError> {
        match U::value_length(lead) {
            0 => Err(TrieError::CorruptNode { offset: pos }),
            len => Ok(len),
        }
    }

    /// Reads the compact integer at `pos`; returns it with the position after it.
    fn read_value(&self, pos: usize, lead: u32) -> Result<(i32, usize), TrieError> {
        let len = self.value_length(pos, lead)?;
        let tail = self
            .units
            .get(pos + 1..pos + len)
            .ok_or(TrieError::CorruptNode { offset: pos })?;
        Ok((U::decode_value(lead, tail), pos + len))
    }

    /// Reads a big-endian integer of `width` units.
    fn read_fixed_int(&self, pos: usize, width: usize) -> Result<u64, TrieError> {
        let units = self
            .units
            .get(pos..pos + width)
            .ok_or(TrieError::CorruptNode { offset: pos })?;
        Ok(units
            .iter()
            .fold(0u64, |acc, &u| (acc << U::BITS) | u64::from(u.into())))
    }

    fn jump(&self, pos: usize, delta: impl TryInto<usize>) -> Result<usize, TrieError> {
        delta
            .try_into()
            .ok()
            .and_then(|delta| pos.checked_add(delta))
            .filter(|&target| target < self.units.len())
            .ok_or(TrieError::CorruptNode { offset: pos })
    }
}

fn merge_unique(unique: &mut Option<i32>, value: i32) -> bool {
    match *unique {
        Some(existing) => existing == value,
        None => {
            *unique = Some(value);
            true
        }
    }
}

impl CharsTrie<'_> {
    /// Consumes the UTF-16 units of `c`.
    pub fn next_code_point(&mut self, c: char) -> Result<bool, TrieError> {
        let mut buf = [0u16; 2];
        self.next_units(c.encode_utf16(&mut buf))
    }

    /// Resets to the root, traverses the UTF-16 form of `key` and returns its value.
    pub fn get_str(&mut self, key: &str) -> Result<Option<i32>, TrieError> {
        let units: Vec<u16> = key.encode_utf16().collect();
        self.get(&units)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ByteTrieBuilder, CharsTrieBuilder};
    use proptest::prelude::*;

    // cat=1, car=2, dog=99, written out by hand.
    const CAT_CAR_DOG: [u8; 16] = [
        0x04, b'c', 0x2c, b'd', 0x0d, b'o', b'g', 0xa3, 0x63, 0x0c, b'a', 0x04, b'r', 0x25, b't',
        0x23,
    ];

    fn byte_trie(entries: &[(&str, i32)]) -> Vec<u8> {
        let mut builder = ByteTrieBuilder::new();
        for &(key, value) in entries {
            builder.add(key.as_bytes(), value);
        }
        builder.build().unwrap()
    }

    // === hand-written data ===

    #[test]
    fn hand_written_lookup() {
        let mut trie = ByteTrie::new(&CAT_CAR_DOG);
        assert_eq!(trie.get(b"car").unwrap(), Some(2));
        assert_eq!(trie.get(b"cat").unwrap(), Some(1));
        assert_eq!(trie.get(b"dog").unwrap(), Some(99));
        assert_eq!(trie.get(b"ca").unwrap(), None);
        assert_eq!(trie.get(b"do").unwrap(), None);
        assert_eq!(trie.get(b"cart").unwrap(), None);
    }

    #[test]
    fn builder_matches_hand_written_layout() {
        let built = byte_trie(&[("cat", 1), ("car", 2), ("dog", 99)]);
        assert_eq!(built, CAT_CAR_DOG);
    }

    #[test]
    fn step_by_step() {
        let mut trie = ByteTrie::new(&CAT_CAR_DOG);
        assert!(trie.next(b'c').unwrap());
        assert!(trie.next(b'a').unwrap());
        assert!(!trie.has_value().unwrap());
        assert!(trie.has_next().unwrap());
        assert!(trie.next(b'r').unwrap());
        assert!(trie.has_value().unwrap());
        assert_eq!(trie.value(), 2);
        // idempotent
        assert!(trie.has_value().unwrap());
        assert_eq!(trie.value(), 2);
        assert!(!trie.has_next().unwrap());
    }

    #[test]
    fn mismatch_stops() {
        let mut trie = ByteTrie::new(&CAT_CAR_DOG);
        assert!(trie.next(b'c').unwrap());
        assert!(!trie.next(b'o').unwrap());
        assert!(trie.is_stopped());
        assert!(!trie.next(b'w').unwrap());
        assert!(!trie.has_value().unwrap());
        trie.reset();
        assert!(trie.next(b'd').unwrap());
    }

    #[test]
    fn mismatch_inside_linear_match() {
        let mut trie = ByteTrie::new(&CAT_CAR_DOG);
        assert!(trie.next_units(b"do").unwrap());
        assert!(!trie.next(b'e').unwrap());
    }

    #[test]
    fn truncated_data_is_an_error() {
        let mut trie = ByteTrie::new(&CAT_CAR_DOG[..8]);
        assert_eq!(
            trie.get(b"dog"),
            Err(TrieError::CorruptNode { offset: 7 })
        );
        let mut trie = ByteTrie::new(&CAT_CAR_DOG[..5]);
        assert!(matches!(trie.get(b"car"), Err(TrieError::CorruptNode { .. })));
    }

    #[test]
    fn empty_data_is_an_error() {
        let mut trie = ByteTrie::new(&[]);
        assert_eq!(trie.next(b'a'), Err(TrieError::CorruptNode { offset: 0 }));
    }

    // === mark / reset ===

    #[test]
    fn mark_and_reset_to_mark() {
        let mut trie = ByteTrie::new(&CAT_CAR_DOG);
        trie.next_units(b"ca").unwrap();
        trie.mark();
        assert!(trie.next(b't').unwrap());
        assert!(trie.has_value().unwrap());
        assert_eq!(trie.value(), 1);
        trie.reset_to_mark();
        assert!(trie.next(b'r').unwrap());
        assert!(trie.has_value().unwrap());
        assert_eq!(trie.value(), 2);
        trie.reset();
        trie.reset_to_mark();
        assert!(trie.next(b'd').unwrap());
    }

    // === values along the path ===

    #[test]
    fn intermediate_values() {
        let data = byte_trie(&[("a", 1), ("ab", 2), ("abc", 3), ("b", 4)]);
        let mut trie = ByteTrie::new(&data);
        assert!(trie.next(b'a').unwrap());
        assert!(trie.has_value().unwrap());
        assert_eq!(trie.value(), 1);
        assert!(trie.has_next().unwrap());
        assert!(trie.next(b'b').unwrap());
        assert!(trie.has_value().unwrap());
        assert_eq!(trie.value(), 2);
        assert!(trie.next(b'c').unwrap());
        assert!(trie.has_value().unwrap());
        assert_eq!(trie.value(), 3);
        assert!(!trie.next(b'd').unwrap());
    }

    #[test]
    fn next_without_has_value_skips_intermediate_value() {
        let data = byte_trie(&[("a", 1), ("ab", 2)]);
        let mut trie = ByteTrie::new(&data);
        assert!(trie.next_units(b"ab").unwrap());
        assert!(trie.has_value().unwrap());
        assert_eq!(trie.value(), 2);
    }

    #[test]
    fn large_values() {
        let entries = [("x", 0x41), ("y", 0x1b00), ("z", 0x12_0000), ("w", -5)];
        let data = byte_trie(&entries);
        let mut trie = ByteTrie::new(&data);
        for (key, value) in entries {
            assert_eq!(trie.get(key.as_bytes()).unwrap(), Some(value), "{key}");
        }
    }

    #[test]
    fn three_way_branches() {
        let keys: Vec<String> = (0u8..40).map(|i| format!("k{}", (b'0' + i) as char)).collect();
        let entries: Vec<(&str, i32)> = keys
            .iter()
            .enumerate()
            .map(|(i, k)| (k.as_str(), i as i32 * 1000))
            .collect();
        let data = byte_trie(&entries);
        let mut trie = ByteTrie::new(&data);
        for &(key, value) in &entries {
            assert_eq!(trie.get(key.as_bytes()).unwrap(), Some(value), "{key}");
        }
        assert_eq!(trie.get(b"k").unwrap(), None);
        assert_eq!(trie.get(b"k/").unwrap(), None);
    }

    // === unique values ===

    #[test]
    fn unique_value() {
        let data = byte_trie(&[("cat", 7), ("cats", 7), ("car", 2)]);
        let mut trie = ByteTrie::new(&data);
        trie.next_units(b"cat").unwrap();
        assert!(trie.has_unique_value().unwrap());
        assert_eq!(trie.value(), 7);
        trie.reset();
        trie.next_units(b"ca").unwrap();
        assert!(!trie.has_unique_value().unwrap());
        assert!(!trie.has_value().unwrap());
        trie.reset();
        assert!(!trie.has_unique_value().unwrap());
    }

    #[test]
    fn stopped_cursor_has_no_unique_value() {
        let data = byte_trie(&[("cat", 7), ("car", 2)]);
        let mut trie = ByteTrie::new(&data);
        trie.next_units(b"cat").unwrap();
        assert!(trie.has_value().unwrap());
        assert!(!trie.has_unique_value().unwrap());
        assert!(trie.has_value().unwrap());
        assert_eq!(trie.value(), 7);
    }

    #[test]
    fn unique_value_through_branches() {
        let keys: Vec<String> = (0u8..12).map(|i| format!("p{}", (b'a' + i) as char)).collect();
        let mut builder = ByteTrieBuilder::new();
        for key in &keys {
            builder.add(key.as_bytes(), 5);
        }
        let data = builder.build().unwrap();
        let mut trie = ByteTrie::new(&data);
        assert!(trie.has_unique_value().unwrap());
        assert_eq!(trie.value(), 5);
    }

    // === chars trie ===

    #[test]
    fn chars_trie_lookup() {
        let mut builder = CharsTrieBuilder::new();
        builder.add_str("日本", 10);
        builder.add_str("日本語", 20);
        builder.add_str("𠮷野家", 30);
        let data = builder.build().unwrap();
        let mut trie = CharsTrie::new(&data);
        assert_eq!(trie.get_str("日本").unwrap(), Some(10));
        assert_eq!(trie.get_str("日本語").unwrap(), Some(20));
        assert_eq!(trie.get_str("𠮷野家").unwrap(), Some(30));
        assert_eq!(trie.get_str("日").unwrap(), None);

        trie.reset();
        assert!(trie.next_code_point('𠮷').unwrap());
        assert!(trie.next_code_point('野').unwrap());
        assert!(trie.next_code_point('家').unwrap());
        assert!(trie.has_value().unwrap());
        assert_eq!(trie.value(), 30);
    }

    #[test]
    fn chars_trie_long_linear_match() {
        let long: String = std::iter::repeat('あ').take(120).collect();
        let mut builder = CharsTrieBuilder::new();
        builder.add_str(&long, 0x3fff_0000);
        builder.add_str("い", 1);
        let data = builder.build().unwrap();
        let mut trie = CharsTrie::new(&data);
        assert_eq!(trie.get_str(&long).unwrap(), Some(0x3fff_0000));
        assert_eq!(trie.get_str(&long[..long.len() - 3]).unwrap(), None);
    }

    // === property tests ===

    proptest! {
        #[test]
        fn byte_round_trip(map in proptest::collection::btree_map(
            proptest::collection::vec(any::<u8>(), 0..12),
            any::<i32>(),
            1..60,
        )) {
            let mut builder = ByteTrieBuilder::new();
            for (key, &value) in &map {
                builder.add(key, value);
            }
            let data = builder.build().unwrap();
            let mut trie = ByteTrie::new(&data);
            for (key, &value) in &map {
                prop_assert_eq!(trie.get(key).unwrap(), Some(value));
            }
        }

        #[test]
        fn byte_absent_keys(
            map in proptest::collection::btree_map(
                proptest::collection::vec(0u8..4, 1..6),
                0i32..1000,
                1..30,
            ),
            probe in proptest::collection::vec(0u8..4, 0..7),
        ) {
            let mut builder = ByteTrieBuilder::new();
            for (key, &value) in &map {
                builder.add(key, value);
            }
            let data = builder.build().unwrap();
            let mut trie = ByteTrie::new(&data);
            prop_assert_eq!(trie.get(&probe).unwrap(), map.get(&probe).copied());
        }

        #[test]
        fn chars_round_trip(map in proptest::collection::btree_map(
            proptest::collection::vec(any::<u16>(), 1..80),
            any::<i32>(),
            1..40,
        )) {
            let mut builder = CharsTrieBuilder::new();
            for (key, &value) in &map {
                builder.add(key, value);
            }
            let data = builder.build().unwrap();
            let mut trie = CharsTrie::new(&data);
            for (key, &value) in &map {
                prop_assert_eq!(trie.get(key).unwrap(), Some(value));
            }
        }
    }
}

use crate::node::{Node, MAX_LIST_BRANCH_LENGTH};
use crate::{TrieError, TrieUnit};

/// Serializes `(key, value)` pairs into the unit format read by [`StringTrie`](crate::StringTrie).
///
/// Keys may be added in any order; [`build`](Self::build) sorts them.
///
/// Each subtree is written as one contiguous block, so all jumps point
/// forward and a child block can be appended without patching offsets.
#[derive(Clone, Debug, Default)]
pub struct StringTrieBuilder<U: TrieUnit> {
    entries: Vec<(Vec<U>, i32)>,
}

/// Builder for byte-serialized tries.
pub type ByteTrieBuilder = StringTrieBuilder<u8>;

/// Builder for UTF-16 unit serialized tries.
pub type CharsTrieBuilder = StringTrieBuilder<u16>;

impl<U: TrieUnit> StringTrieBuilder<U> {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Adds a key with its value.
    pub fn add(&mut self, key: &[U], value: i32) -> &mut Self {
        self.entries.push((key.to_vec(), value));
        self
    }

    /// Returns the number of entries added so far.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no entries have been added.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sorts the entries and writes the serialized trie.
    ///
    /// # Errors
    ///
    /// Returns [`TrieError::EmptyBuilder`] if no entries were added and
    /// [`TrieError::DuplicateKey`] if a key was added twice.
    pub fn build(&mut self) -> Result<Vec<U>, TrieError> {
        if self.entries.is_empty() {
            return Err(TrieError::EmptyBuilder);
        }
        self.entries.sort_by(|a, b| a.0.cmp(&b.0));
        if self.entries.windows(2).any(|w| w[0].0 == w[1].0) {
            return Err(TrieError::DuplicateKey);
        }
        let units = write_subtree(&self.entries, 0);
        tracing::debug!(
            keys = self.entries.len(),
            units = units.len(),
            "built string trie"
        );
        Ok(units)
    }
}

impl CharsTrieBuilder {
    /// Adds the UTF-16 form of `key` with its value.
    pub fn add_str(&mut self, key: &str, value: i32) -> &mut Self {
        let units: Vec<u16> = key.encode_utf16().collect();
        self.add(&units, value)
    }
}

/// Writes the subtree for `entries`, which are sorted, unique and share
/// their first `depth` units.
fn write_subtree<U: TrieUnit>(entries: &[(Vec<U>, i32)], depth: usize) -> Vec<U> {
    let mut out = Vec::new();
    let rest = match entries {
        [(key, value)] if key.len() == depth => {
            U::encode_value(*value, true, &mut out);
            return out;
        }
        [(key, value), rest @ ..] if key.len() == depth => {
            U::encode_value(*value, false, &mut out);
            rest
        }
        _ => entries,
    };

    // Sorted order puts the shortest key first, so the common prefix of the
    // first and last keys is shared by all of them.
    let (first, last) = (&rest[0].0, &rest[rest.len() - 1].0);
    let common = first[depth..]
        .iter()
        .zip(&last[depth..])
        .take_while(|(a, b)| a == b)
        .count();
    if common > 0 {
        let len = common.min(U::MAX_LINEAR_MATCH_LENGTH as usize);
        out.push(lead::<U>(Node::LinearMatch { len }));
        out.extend_from_slice(&first[depth..depth + len]);
        out.extend(write_subtree(rest, depth + len));
        return out;
    }

    let mut children: Vec<(U, &[(Vec<U>, i32)])> = Vec::new();
    let mut start = 0;
    for i in 1..=rest.len() {
        if i == rest.len() || rest[i].0[depth] != rest[start].0[depth] {
            children.push((rest[start].0[depth], &rest[start..i]));
            start = i;
        }
    }
    out.extend(write_branch(&children, depth + 1));
    out
}

/// A branch edge: either a final value stored in the branch itself, or a
/// child subtree reached through a jump.
enum Edge<U> {
    Final(i32),
    Jump(Vec<U>),
}

impl<U: TrieUnit> Edge<U> {
    fn new(entries: &[(Vec<U>, i32)], depth: usize) -> Self {
        match entries {
            [(key, value)] if key.len() == depth => Edge::Final(*value),
            _ => Edge::Jump(write_subtree(entries, depth)),
        }
    }

    /// Encodes the branch entry; `gap` is the number of units between the
    /// entry and the start of the child block.
    fn entry(&self, gap: usize) -> Vec<U> {
        let mut out = Vec::new();
        match self {
            Edge::Final(value) => U::encode_value(*value, true, &mut out),
            Edge::Jump(_) => U::encode_value(gap as i32, false, &mut out),
        }
        out
    }

    fn block_len(&self) -> usize {
        match self {
            Edge::Final(_) => 0,
            Edge::Jump(block) => block.len(),
        }
    }
}

fn write_branch<U: TrieUnit>(children: &[(U, &[(Vec<U>, i32)])], depth: usize) -> Vec<U> {
    debug_assert!(children.len() >= 2);
    if children.len() > MAX_LIST_BRANCH_LENGTH {
        write_three_way_branch(children, depth)
    } else {
        write_list_branch(children, depth)
    }
}

/// `[lead][k0][e0]..[k(n-2)][e(n-2)][k(n-1)][subtree(n-1)][block0]..[block(n-2)]`
fn write_list_branch<U: TrieUnit>(children: &[(U, &[(Vec<U>, i32)])], depth: usize) -> Vec<U> {
    let n = children.len();
    let edges: Vec<Edge<U>> = children[..n - 1]
        .iter()
        .map(|(_, entries)| Edge::new(entries, depth))
        .collect();
    let last = write_subtree(children[n - 1].1, depth);

    // Entries are encoded back to front: each jump spans the entries after it.
    let mut entries: Vec<Vec<U>> = vec![Vec::new(); n - 1];
    let mut after = 1 + last.len();
    let mut blocks_before: usize = edges.iter().map(Edge::block_len).sum();
    for i in (0..n - 1).rev() {
        blocks_before -= edges[i].block_len();
        entries[i] = edges[i].entry(after + blocks_before);
        after += 1 + entries[i].len();
    }

    let mut out = vec![lead::<U>(Node::ListBranch { len: n })];
    for (i, entry) in entries.into_iter().enumerate() {
        out.push(children[i].0);
        out.extend(entry);
    }
    out.push(children[n - 1].0);
    out.extend(last);
    for edge in edges {
        if let Edge::Jump(block) = edge {
            out.extend(block);
        }
    }
    out
}

/// `[lead][key][less jump][equal entry][greater branch][less branch][equal block]`
fn write_three_way_branch<U: TrieUnit>(children: &[(U, &[(Vec<U>, i32)])], depth: usize) -> Vec<U> {
    let mid = children.len() / 2;
    let less = write_branch(&children[..mid], depth);
    let greater = write_branch(&children[mid + 1..], depth);
    let (key, entries) = children[mid];
    let equal = Edge::new(entries, depth);
    let equal_entry = equal.entry(greater.len() + less.len());

    let delta = equal_entry.len() + greater.len();
    let width = fixed_int_width::<U>(delta);
    let mut out = vec![lead::<U>(Node::ThreeWayBranch { jump_width: width }), key];
    for i in (0..width).rev() {
        out.push(U::truncate((delta >> (i as u32 * U::BITS)) as u32));
    }
    out.extend(equal_entry);
    out.extend(greater);
    out.extend(less);
    if let Edge::Jump(block) = equal {
        out.extend(block);
    }
    out
}

fn fixed_int_width<U: TrieUnit>(value: usize) -> usize {
    let mut width = 1;
    while width < U::MAX_FIXED_INT_UNITS && (value >> (width as u32 * U::BITS)) != 0 {
        width += 1;
    }
    width
}

#[inline]
fn lead<U: TrieUnit>(node: Node) -> U {
    U::truncate(node.lead::<U>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ByteTrie;

    #[test]
    fn empty_builder_fails() {
        assert_eq!(ByteTrieBuilder::new().build(), Err(TrieError::EmptyBuilder));
    }

    #[test]
    fn duplicate_key_fails() {
        let mut builder = ByteTrieBuilder::new();
        builder.add(b"a", 1).add(b"a", 2);
        assert_eq!(builder.build(), Err(TrieError::DuplicateKey));
    }

    #[test]
    fn single_key() {
        let mut builder = ByteTrieBuilder::new();
        builder.add(b"ab", 3);
        let data = builder.build().unwrap();
        // linear match "ab", then final value 3
        assert_eq!(data, [0x0d, b'a', b'b', 0x27]);
    }

    #[test]
    fn empty_key_is_root_value() {
        let mut builder = ByteTrieBuilder::new();
        builder.add(b"", 9).add(b"x", 1);
        let data = builder.build().unwrap();
        assert_eq!(data, [0x32, 0x0c, b'x', 0x23]);
        let mut trie = ByteTrie::new(&data);
        assert_eq!(trie.get(b"").unwrap(), Some(9));
        assert_eq!(trie.get(b"x").unwrap(), Some(1));
    }

    #[test]
    fn list_branch_layout() {
        let mut builder = ByteTrieBuilder::new();
        builder.add(b"a", 1).add(b"bx", 2).add(b"c", 3);
        let data = builder.build().unwrap();
        // 'a' final 1, 'b' jumps over 'c' and its value to the "x" block
        assert_eq!(
            data,
            [0x05, b'a', 0x23, b'b', 0x24, b'c', 0x27, 0x0c, b'x', 0x25]
        );
    }

    #[test]
    fn long_keys_split_linear_matches() {
        let key = [b'z'; 45];
        let mut builder = ByteTrieBuilder::new();
        builder.add(&key, 1);
        let data = builder.build().unwrap();
        assert_eq!(data[0], 0x1f);
        assert_eq!(data[21], 0x1f);
        assert_eq!(data[42], 0x10);
        assert_eq!(ByteTrie::new(&data).get(&key).unwrap(), Some(1));
    }

    #[test]
    fn fixed_int_widths() {
        assert_eq!(fixed_int_width::<u8>(0xff), 1);
        assert_eq!(fixed_int_width::<u8>(0x100), 2);
        assert_eq!(fixed_int_width::<u8>(0x1_0000), 3);
        assert_eq!(fixed_int_width::<u8>(0x100_0000), 4);
        assert_eq!(fixed_int_width::<u16>(0xffff), 1);
        assert_eq!(fixed_int_width::<u16>(0x1_0000), 2);
    }

    #[test]
    fn wide_three_way_jumps() {
        // Long tails make the less-than jump exceed one byte.
        let mut builder = ByteTrieBuilder::new();
        let keys: Vec<Vec<u8>> = (0u8..20)
            .map(|i| {
                let mut key = vec![b'a' + i];
                key.extend((0..40).map(|j| b'a' + ((i + j) % 26)));
                key
            })
            .collect();
        for (i, key) in keys.iter().enumerate() {
            builder.add(key, i as i32);
        }
        let data = builder.build().unwrap();
        assert!(data[0] < 0x04);
        let mut trie = ByteTrie::new(&data);
        for (i, key) in keys.iter().enumerate() {
            assert_eq!(trie.get(key).unwrap(), Some(i as i32));
        }
    }
}

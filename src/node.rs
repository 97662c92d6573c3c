use crate::TrieUnit;

/// Leads below this value are three-way branch nodes.
pub(crate) const MIN_LIST_BRANCH: u32 = 0x04;
/// Maximum number of keys in a list branch.
pub(crate) const MAX_LIST_BRANCH_LENGTH: usize = 9;
/// Leads from this value up to the first value lead are linear-match nodes.
pub(crate) const MIN_LINEAR_MATCH: u32 = 0x0c;
/// Bit 0 of a value lead.
pub(crate) const VALUE_IS_FINAL: u32 = 1;

/// A node kind, decoded from the lead unit of a serialized string trie node.
///
/// The lead ranges are:
/// - `0 .. 4`: three-way branch, `lead + 1` units of less-than jump
/// - `4 .. 12`: list branch of `lead - 2` keys
/// - `12 .. MIN_VALUE_LEAD`: linear match of `lead - 11` units
/// - `MIN_VALUE_LEAD ..`: value node, bit 0 set when final
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Node {
    /// Compares against one unit and continues down the less, equal or greater edge.
    ThreeWayBranch {
        /// Width in units of the fixed-size less-than jump.
        jump_width: usize,
    },
    /// Up to [`MAX_LIST_BRANCH_LENGTH`] sorted keys, each with a value or jump.
    ListBranch {
        /// Number of keys in the list.
        len: usize,
    },
    /// A run of units that must all match.
    LinearMatch {
        /// Number of units in the run.
        len: usize,
    },
    /// A compact integer value.
    Value {
        /// True if no unit can follow the value.
        is_final: bool,
    },
}

impl Node {
    /// Classifies a lead unit for unit type `U`.
    #[inline]
    pub fn decode<U: TrieUnit>(lead: u32) -> Node {
        if lead >= U::MIN_VALUE_LEAD {
            Node::Value {
                is_final: lead & VALUE_IS_FINAL != 0,
            }
        } else if lead >= MIN_LINEAR_MATCH {
            Node::LinearMatch {
                len: (lead - MIN_LINEAR_MATCH) as usize + 1,
            }
        } else if lead >= MIN_LIST_BRANCH {
            Node::ListBranch {
                len: (lead - MIN_LIST_BRANCH) as usize + 2,
            }
        } else {
            Node::ThreeWayBranch {
                jump_width: lead as usize + 1,
            }
        }
    }

    /// Returns the lead unit encoding this node.
    #[inline]
    pub fn lead<U: TrieUnit>(self) -> u32 {
        match self {
            Node::ThreeWayBranch { jump_width } => {
                debug_assert!((1..=MIN_LIST_BRANCH as usize).contains(&jump_width));
                jump_width as u32 - 1
            }
            Node::ListBranch { len } => {
                debug_assert!((2..=MAX_LIST_BRANCH_LENGTH).contains(&len));
                MIN_LIST_BRANCH + len as u32 - 2
            }
            Node::LinearMatch { len } => {
                debug_assert!(len >= 1 && len as u32 <= U::MAX_LINEAR_MATCH_LENGTH);
                MIN_LINEAR_MATCH + len as u32 - 1
            }
            Node::Value { .. } => {
                debug_assert!(false, "value leads carry their payload");
                U::MIN_VALUE_LEAD
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_lead_ranges() {
        assert_eq!(Node::decode::<u8>(0x00), Node::ThreeWayBranch { jump_width: 1 });
        assert_eq!(Node::decode::<u8>(0x03), Node::ThreeWayBranch { jump_width: 4 });
        assert_eq!(Node::decode::<u8>(0x04), Node::ListBranch { len: 2 });
        assert_eq!(Node::decode::<u8>(0x0b), Node::ListBranch { len: 9 });
        assert_eq!(Node::decode::<u8>(0x0c), Node::LinearMatch { len: 1 });
        assert_eq!(Node::decode::<u8>(0x1f), Node::LinearMatch { len: 20 });
        assert_eq!(Node::decode::<u8>(0x20), Node::Value { is_final: false });
        assert_eq!(Node::decode::<u8>(0x25), Node::Value { is_final: true });
    }

    #[test]
    fn chars_lead_ranges() {
        assert_eq!(Node::decode::<u16>(0x1f), Node::LinearMatch { len: 20 });
        assert_eq!(Node::decode::<u16>(0x3f), Node::LinearMatch { len: 52 });
        assert_eq!(Node::decode::<u16>(0x40), Node::Value { is_final: false });
        assert_eq!(Node::decode::<u16>(0xffff), Node::Value { is_final: true });
    }

    #[test]
    fn lead_round_trip() {
        for lead in 0..0x20u32 {
            assert_eq!(Node::decode::<u8>(lead).lead::<u8>(), lead);
        }
        for lead in 0..0x40u32 {
            assert_eq!(Node::decode::<u16>(lead).lead::<u16>(), lead);
        }
    }
}

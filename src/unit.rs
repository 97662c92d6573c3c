use std::fmt;

use crate::node::MIN_LINEAR_MATCH;

mod private {
    pub trait Sealed {}
    impl Sealed for u8 {}
    impl Sealed for u16 {}
}

/// A code unit type for use in serialized string tries.
///
/// Units must be copyable, orderable, and convertible to `u32`.
/// The associated constants describe where the node lead ranges
/// and compact integer encodings fall for this unit width.
pub trait TrieUnit: Copy + Ord + Into<u32> + fmt::Debug + private::Sealed {
    /// Number of bits per unit.
    const BITS: u32;
    /// Maximum number of units in a single linear-match node.
    const MAX_LINEAR_MATCH_LENGTH: u32;
    /// Smallest lead unit of a value node.
    const MIN_VALUE_LEAD: u32 = MIN_LINEAR_MATCH + Self::MAX_LINEAR_MATCH_LENGTH;
    /// Maximum width of a branch's fixed-size less-than jump.
    const MAX_FIXED_INT_UNITS: usize;

    /// Converts the low bits of `v` to a unit.
    fn truncate(v: u32) -> Self;

    /// Total length in units (lead included) of the compact integer
    /// introduced by `lead`, or 0 if `lead` is not a value lead.
    fn value_length(lead: u32) -> usize;

    /// Decodes a compact integer from its lead and the units following it.
    ///
    /// `tail` must hold exactly `value_length(lead) - 1` units.
    fn decode_value(lead: u32, tail: &[Self]) -> i32;

    /// Appends the compact encoding of `value`, setting the final flag if requested.
    fn encode_value(value: i32, is_final: bool, out: &mut Vec<Self>);
}

// Byte trie compact integers, in terms of the lead byte shifted right by one.
const MIN_ONE_BYTE_LEAD: u32 = 0x10;
const MAX_ONE_BYTE_VALUE: u32 = 0x40;
const MIN_TWO_BYTE_LEAD: u32 = MIN_ONE_BYTE_LEAD + MAX_ONE_BYTE_VALUE + 1; // 0x51
const MAX_TWO_BYTE_VALUE: u32 = 0x1aff;
const MIN_THREE_BYTE_LEAD: u32 = MIN_TWO_BYTE_LEAD + (MAX_TWO_BYTE_VALUE >> 8) + 1; // 0x6c
const FOUR_BYTE_LEAD: u32 = 0x7e;
const MAX_THREE_BYTE_VALUE: u32 = ((FOUR_BYTE_LEAD - MIN_THREE_BYTE_LEAD) << 16) - 1; // 0x11ffff
const FIVE_BYTE_LEAD: u32 = 0x7f;

/// Byte length of a compact integer, indexed by `lead >> 1`.
const BYTES_PER_LEAD: [u8; 128] = {
    let mut table = [0u8; 128];
    let mut i = MIN_ONE_BYTE_LEAD as usize;
    while i < 128 {
        table[i] = if i < MIN_TWO_BYTE_LEAD as usize {
            1
        } else if i < MIN_THREE_BYTE_LEAD as usize {
            2
        } else if i < FOUR_BYTE_LEAD as usize {
            3
        } else if i == FOUR_BYTE_LEAD as usize {
            4
        } else {
            5
        };
        i += 1;
    }
    table
};

impl TrieUnit for u8 {
    const BITS: u32 = 8;
    const MAX_LINEAR_MATCH_LENGTH: u32 = 0x14;
    const MAX_FIXED_INT_UNITS: usize = 4;

    #[inline]
    fn truncate(v: u32) -> Self {
        v as u8
    }

    #[inline]
    fn value_length(lead: u32) -> usize {
        BYTES_PER_LEAD[((lead >> 1) & 0x7f) as usize] as usize
    }

    fn decode_value(lead: u32, tail: &[u8]) -> i32 {
        let lead = lead >> 1;
        let t = |i: usize| tail[i] as u32;
        let value = match tail.len() {
            0 => lead - MIN_ONE_BYTE_LEAD,
            1 => ((lead - MIN_TWO_BYTE_LEAD) << 8) | t(0),
            2 => ((lead - MIN_THREE_BYTE_LEAD) << 16) | (t(0) << 8) | t(1),
            3 => (t(0) << 16) | (t(1) << 8) | t(2),
            _ => (t(0) << 24) | (t(1) << 16) | (t(2) << 8) | t(3),
        };
        value as i32
    }

    fn encode_value(value: i32, is_final: bool, out: &mut Vec<u8>) {
        let v = value as u32;
        let flag = is_final as u32;
        let lead = |shifted: u32| ((shifted << 1) | flag) as u8;
        if v <= MAX_ONE_BYTE_VALUE {
            out.push(lead(MIN_ONE_BYTE_LEAD + v));
        } else if v <= MAX_TWO_BYTE_VALUE {
            out.extend([lead(MIN_TWO_BYTE_LEAD + (v >> 8)), v as u8]);
        } else if v <= MAX_THREE_BYTE_VALUE {
            out.extend([
                lead(MIN_THREE_BYTE_LEAD + (v >> 16)),
                (v >> 8) as u8,
                v as u8,
            ]);
        } else if v <= 0xff_ffff {
            out.extend([lead(FOUR_BYTE_LEAD), (v >> 16) as u8, (v >> 8) as u8, v as u8]);
        } else {
            out.push(lead(FIVE_BYTE_LEAD));
            out.extend(v.to_be_bytes());
        }
    }
}

// Chars trie compact integers, in terms of the lead unit shifted right by one.
const MIN_TWO_UNIT_VALUE_LEAD: u32 = 0x4000;
const THREE_UNIT_VALUE_LEAD: u32 = 0x7fff;
const MAX_ONE_UNIT_VALUE: u32 = MIN_TWO_UNIT_VALUE_LEAD - 0x20 - 1; // 0x3fdf
const MAX_TWO_UNIT_VALUE: u32 = ((THREE_UNIT_VALUE_LEAD - MIN_TWO_UNIT_VALUE_LEAD) << 16) - 1; // 0x3ffeffff

impl TrieUnit for u16 {
    const BITS: u32 = 16;
    const MAX_LINEAR_MATCH_LENGTH: u32 = 0x34;
    const MAX_FIXED_INT_UNITS: usize = 2;

    #[inline]
    fn truncate(v: u32) -> Self {
        v as u16
    }

    #[inline]
    fn value_length(lead: u32) -> usize {
        let lead = lead >> 1;
        if lead < 0x20 {
            0
        } else if lead < MIN_TWO_UNIT_VALUE_LEAD {
            1
        } else if lead < THREE_UNIT_VALUE_LEAD {
            2
        } else {
            3
        }
    }

    fn decode_value(lead: u32, tail: &[u16]) -> i32 {
        let lead = lead >> 1;
        let value = match tail {
            [] => lead - 0x20,
            [low] => ((lead - MIN_TWO_UNIT_VALUE_LEAD) << 16) | *low as u32,
            [high, low, ..] => ((*high as u32) << 16) | *low as u32,
        };
        value as i32
    }

    fn encode_value(value: i32, is_final: bool, out: &mut Vec<u16>) {
        let v = value as u32;
        let flag = is_final as u32;
        let lead = |shifted: u32| ((shifted << 1) | flag) as u16;
        if v <= MAX_ONE_UNIT_VALUE {
            out.push(lead(0x20 + v));
        } else if v <= MAX_TWO_UNIT_VALUE {
            out.extend([lead(MIN_TWO_UNIT_VALUE_LEAD + (v >> 16)), v as u16]);
        } else {
            out.extend([lead(THREE_UNIT_VALUE_LEAD), (v >> 16) as u16, v as u16]);
        }
    }
}

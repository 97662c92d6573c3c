//! Compact string tries and the Unicode services built on them.
//!
//! The crate provides:
//!
//! - [`ByteTrie`] and [`CharsTrie`], readers for serialized string tries,
//!   with [`ByteTrieBuilder`] and [`CharsTrieBuilder`] to produce them.
//! - [`PropsVectors`], which stores per-code-point property vectors as
//!   ranges and compacts them into a [`CodePointTrie`].
//! - [`DictionaryBreakEngine`], which divides runs of dictionary-script
//!   text (Chinese, Japanese) into words by minimum total cost.
//! - [`CollationPce`], [`CeBuffer`] and [`StringSearch`], which turn raw
//!   collation elements into strength-masked 64-bit elements with source
//!   offsets and use them for collation-aware substring search.
//!
//! # Quick start
//!
//! ```
//! use lexicol::{ByteTrie, ByteTrieBuilder};
//!
//! let units = ByteTrieBuilder::new()
//!     .add(b"cat", 1)
//!     .add(b"car", 2)
//!     .add(b"dog", 3)
//!     .build()
//!     .unwrap();
//! let mut trie = ByteTrie::new(&units);
//! assert_eq!(trie.get(b"car"), Ok(Some(2)));
//! assert_eq!(trie.get(b"ca"), Ok(None));
//! ```
//!
//! Dictionary segmentation:
//!
//! ```
//! use lexicol::{CharsDictionaryMatcher, DictionaryBreakEngine};
//!
//! let dict = CharsDictionaryMatcher::from_words([
//!     ("東京", 10),
//!     ("京都", 10),
//!     ("東", 50),
//!     ("京", 50),
//!     ("都", 10),
//! ])
//! .unwrap();
//! let engine = DictionaryBreakEngine::chinese_japanese(dict);
//! assert_eq!(engine.segment("東京都").unwrap(), vec![6, 9]);
//! ```

#![warn(missing_docs)]

mod build;
mod ce;
mod ce_buffer;
mod charset;
mod config;
mod cptrie;
mod dict;
mod engine;
mod node;
mod normalize;
mod pce;
mod props;
mod search;
mod serial;
mod transform;
mod trie;
mod unit;

pub use build::{ByteTrieBuilder, CharsTrieBuilder, StringTrieBuilder};
pub use ce::{
    is_continuation, make_ce, primary, secondary, tertiary, CollationElements, CollationTable,
    TableCollationIterator, COMMON_WEIGHT,
};
pub use ce_buffer::{CeBuffer, CE_BUFFER_EXTRA};
pub use charset::CharSet;
pub use config::{CollationSettings, SegmenterConfig, Strength};
pub use cptrie::{CodePointTrie, CodePointTrieBuilder, Ranges};
pub use dict::{BytesDictionaryMatcher, CharsDictionaryMatcher, Dictionary, DictionaryMatcher, WordMatch};
pub use engine::{
    is_katakana, relax_katakana_run, BreakKind, DictionaryBreakEngine, Lattice, Relaxation,
    ScriptProfile,
};
pub use normalize::NormalizedText;
pub use pce::{
    CeStack, CollationPce, PceBuffer, ProcessedCe, RawCe, RceBuffer, PROCESSED_NULLORDER,
};
pub use props::{
    CompactHandler, CompactedVectors, PropsError, PropsVectors, TrieCompactHandler,
    ERROR_VALUE_CP, FIRST_SPECIAL_CP, INITIAL_VALUE_CP, MAX_CP, START_REAL_VALUES_CP,
};
pub use search::{compare_ce64s, CeMatch, ElementComparison, Matches, StringSearch};
pub use transform::UnitTransform;
pub use trie::{ByteTrie, CharsTrie, StringTrie};
pub use unit::TrieUnit;

/// Errors that can occur during trie and dictionary operations.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TrieError {
    /// The binary data has an invalid magic number.
    #[error("invalid magic number")]
    InvalidMagic,
    /// The binary data has an unsupported version.
    #[error("unsupported version")]
    InvalidVersion,
    /// The binary data is truncated or corrupted.
    #[error("truncated or corrupted data")]
    TruncatedData,
    /// A trie node could not be decoded.
    #[error("corrupt node at offset {offset}")]
    CorruptNode {
        /// Unit offset of the offending node.
        offset: usize,
    },
    /// The builder was given the same key twice.
    #[error("duplicate key")]
    DuplicateKey,
    /// The builder was asked to build an empty trie.
    #[error("no entries to build")]
    EmptyBuilder,
    /// The dictionary header names an unknown trie type.
    #[error("unknown trie type {0}")]
    UnknownTrieType(u32),
    /// The dictionary header names an unsupported unit transform.
    #[error("unsupported transform {0:#x}")]
    UnsupportedTransform(u32),
    /// A character has no byte under the dictionary's transform.
    #[error("character {0:?} cannot be mapped to a trie unit")]
    UnmappableCharacter(char),
}

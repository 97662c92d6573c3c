/// Tuning for the dictionary break engine.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SegmenterConfig {
    /// Longest dictionary word looked up, in code points.
    pub max_word_length: usize,
    /// Cost of a single character that is not a dictionary word.
    pub fallback_cost: i64,
    /// Cost of a Katakana run, indexed by its length.
    pub katakana_costs: Vec<i64>,
    /// Cost of a Katakana run longer than the table.
    pub katakana_overflow_cost: i64,
    /// Runs this long or longer are not treated as words.
    pub max_katakana_group_length: usize,
    /// NFKC-normalize text before segmenting it.
    pub normalize: bool,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            max_word_length: 20,
            fallback_cost: 255,
            katakana_costs: vec![8192, 984, 408, 240, 204, 252, 300, 372, 480],
            katakana_overflow_cost: 8192,
            max_katakana_group_length: 20,
            normalize: true,
        }
    }
}

impl SegmenterConfig {
    /// Sets the longest word looked up.
    pub fn with_max_word_length(mut self, len: usize) -> Self {
        self.max_word_length = len;
        self
    }

    /// Sets the single-character fallback cost.
    pub fn with_fallback_cost(mut self, cost: i64) -> Self {
        self.fallback_cost = cost;
        self
    }

    /// Replaces the Katakana cost table.
    pub fn with_katakana_costs(mut self, costs: Vec<i64>) -> Self {
        self.katakana_costs = costs;
        self
    }

    /// Sets the Katakana run length limit.
    pub fn with_max_katakana_group_length(mut self, len: usize) -> Self {
        self.max_katakana_group_length = len;
        self
    }

    /// Turns normalization on or off.
    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    /// Cost of treating a Katakana run of `len` code points as one word.
    #[inline]
    pub fn katakana_cost(&self, len: usize) -> i64 {
        self.katakana_costs
            .get(len)
            .copied()
            .unwrap_or(self.katakana_overflow_cost)
    }
}

/// Comparison strength: the deepest level of collation weight that is compared.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Strength {
    /// Base letters only.
    Primary,
    /// Base letters and accents.
    Secondary,
    /// Base letters, accents and case.
    #[default]
    Tertiary,
    /// Adds the shifted weight of variable characters.
    Quaternary,
    /// Adds a code point comparison of the NFD forms.
    Identical,
}

/// Collation options that affect processed collation elements.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CollationSettings {
    /// Comparison strength.
    pub strength: Strength,
    /// Treat variable collation elements as ignorable below quaternary strength.
    pub alternate_shifted: bool,
    /// Largest primary weight, as a 32-bit CE with zero lower bits, that counts
    /// as variable.
    pub variable_top: u32,
}

impl Default for CollationSettings {
    fn default() -> Self {
        Self {
            strength: Strength::Tertiary,
            alternate_shifted: false,
            variable_top: 0x0500_0000,
        }
    }
}

impl CollationSettings {
    /// Sets the strength.
    pub fn with_strength(mut self, strength: Strength) -> Self {
        self.strength = strength;
        self
    }

    /// Turns shifted handling of variable elements on or off.
    pub fn with_alternate_shifted(mut self, shifted: bool) -> Self {
        self.alternate_shifted = shifted;
        self
    }

    /// Sets the variable top.
    pub fn with_variable_top(mut self, variable_top: u32) -> Self {
        self.variable_top = variable_top;
        self
    }
}

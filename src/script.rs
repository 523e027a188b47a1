/*!
 * Script classification.
 *
 * Decides whether a text fragment contains Persian/Arabic script. A single
 * qualifying code point is enough to classify the whole fragment as
 * target-script; mixed Latin/Persian text is therefore always RTL.
 */

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Result of classifying one fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassificationResult {
    /// Contains at least one Persian/Arabic code point
    TargetScript,
    /// Everything else, including empty and whitespace-only text
    OtherScript,
}

impl ClassificationResult {
    pub fn is_target(self) -> bool {
        matches!(self, Self::TargetScript)
    }
}

/// Unicode ranges that count as target script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScriptRangeSet {
    /// The Arabic block only (U+0600..U+06FF)
    Core,
    /// Arabic, Arabic Supplement, Arabic Extended-A and both Presentation Forms blocks
    #[default]
    Extended,
}

const CORE_RANGES: &[(u32, u32)] = &[(0x0600, 0x06FF)];

const EXTENDED_RANGES: &[(u32, u32)] = &[
    (0x0600, 0x06FF),
    (0x0750, 0x077F),
    (0x08A0, 0x08FF),
    (0xFB50, 0xFDFF),
    (0xFE70, 0xFEFF),
];

impl ScriptRangeSet {
    /// Inclusive code point ranges of this set
    pub fn ranges(self) -> &'static [(u32, u32)] {
        match self {
            Self::Core => CORE_RANGES,
            Self::Extended => EXTENDED_RANGES,
        }
    }

    fn pattern(self) -> String {
        let class: String = self
            .ranges()
            .iter()
            .map(|(start, end)| format!("\\x{{{:04X}}}-\\x{{{:04X}}}", start, end))
            .collect();
        format!("[{}]", class)
    }
}

static CORE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&ScriptRangeSet::Core.pattern()).expect("Invalid core script regex")
});

static EXTENDED_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&ScriptRangeSet::Extended.pattern()).expect("Invalid extended script regex")
});

/// Classifier bound to one range set
#[derive(Debug, Clone, Copy)]
pub struct ScriptClassifier {
    ranges: ScriptRangeSet,
}

impl Default for ScriptClassifier {
    fn default() -> Self {
        Self::new(ScriptRangeSet::default())
    }
}

impl ScriptClassifier {
    pub fn new(ranges: ScriptRangeSet) -> Self {
        Self { ranges }
    }

    pub fn ranges(&self) -> ScriptRangeSet {
        self.ranges
    }

    /// Classify a fragment
    pub fn classify(&self, text: &str) -> ClassificationResult {
        let regex: &Regex = match self.ranges {
            ScriptRangeSet::Core => &CORE_REGEX,
            ScriptRangeSet::Extended => &EXTENDED_REGEX,
        };
        if regex.is_match(text) {
            ClassificationResult::TargetScript
        } else {
            ClassificationResult::OtherScript
        }
    }

    /// Convenience wrapper for `classify(..).is_target()`
    pub fn is_target(&self, text: &str) -> bool {
        self.classify(text).is_target()
    }
}

/// Classify with the default (extended) range set
pub fn classify(text: &str) -> ClassificationResult {
    ScriptClassifier::default().classify(text)
}

//! Skill state classification.
//!
//! [`classify`] maps a `(level, frequency, criticality)` triple onto a
//! [`SkillState`] using a single ordered rule list: the first rule that
//! applies wins, and a skill that matches none is `Competent`.
//!
//! The combined weight (`criticality weight × frequency weight`) never selects
//! a state. It only orders skills that share one, e.g. gap lists.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::assessment::{Criticality, Frequency, Level};

/// Derived state of one skill for one collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillState {
    /// Level 0 and never used: nobody has assessed this skill yet.
    Unevaluated,
    /// Critical skill used at least weekly with level below 3.
    CriticalGap,
    /// Critical skill used monthly or quarterly with level below 3.
    ImprovementArea,
    /// Critical skill used at least weekly with level 4 or more.
    KeyStrength,
    /// Level 4 or more on a relevant skill that is rarely or never used.
    UnderutilizedTalent,
    Competent,
    Developing,
    Strength,
    Basic,
}

impl SkillState {
    pub const ALL: [SkillState; 9] = [
        SkillState::Unevaluated,
        SkillState::CriticalGap,
        SkillState::ImprovementArea,
        SkillState::KeyStrength,
        SkillState::UnderutilizedTalent,
        SkillState::Competent,
        SkillState::Developing,
        SkillState::Strength,
        SkillState::Basic,
    ];

    /// Human-readable label.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Unevaluated => "Unevaluated",
            Self::CriticalGap => "Critical Gap",
            Self::ImprovementArea => "Improvement Area",
            Self::KeyStrength => "Key Strength",
            Self::UnderutilizedTalent => "Underutilized Talent",
            Self::Competent => "Competent",
            Self::Developing => "Developing",
            Self::Strength => "Strength",
            Self::Basic => "Basic",
        }
    }

    /// Attention priority; higher means more urgent.
    #[must_use]
    pub fn priority_weight(&self) -> u8 {
        match self {
            Self::Unevaluated => 0,
            Self::CriticalGap => 10,
            Self::ImprovementArea => 8,
            Self::KeyStrength => 2,
            Self::UnderutilizedTalent => 6,
            Self::Competent => 4,
            Self::Developing => 5,
            Self::Strength => 3,
            Self::Basic => 1,
        }
    }

    /// Critical Gap or Improvement Area.
    #[must_use]
    pub fn is_gap(&self) -> bool {
        matches!(self, Self::CriticalGap | Self::ImprovementArea)
    }

    /// Strength or Key Strength.
    #[must_use]
    pub fn is_strength(&self) -> bool {
        matches!(self, Self::Strength | Self::KeyStrength)
    }
}

impl fmt::Display for SkillState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of classifying one skill.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub state: SkillState,
    pub priority_weight: u8,
    pub combined_weight: f64,
}

impl ClassificationResult {
    #[must_use]
    pub fn label(&self) -> &'static str {
        self.state.label()
    }
}

struct Rule {
    state: SkillState,
    applies: fn(f64, Frequency, Criticality) -> bool,
}

/// Ordered rule list, first match wins.
const RULES: [Rule; 9] = [
    Rule {
        state: SkillState::Unevaluated,
        applies: |level, frequency, _| level <= Level::MIN && frequency == Frequency::Never,
    },
    Rule {
        state: SkillState::CriticalGap,
        applies: |level, frequency, criticality| {
            criticality == Criticality::Critical && frequency.is_frequent() && level < 3.0
        },
    },
    Rule {
        state: SkillState::ImprovementArea,
        applies: |level, frequency, criticality| {
            criticality == Criticality::Critical
                && matches!(frequency, Frequency::Monthly | Frequency::Quarterly)
                && level < 3.0
        },
    },
    Rule {
        state: SkillState::KeyStrength,
        applies: |level, frequency, criticality| {
            criticality == Criticality::Critical && frequency.is_frequent() && level >= 4.0
        },
    },
    Rule {
        state: SkillState::UnderutilizedTalent,
        applies: |level, frequency, criticality| {
            level >= 4.0
                && matches!(frequency, Frequency::Never | Frequency::Quarterly)
                && criticality != Criticality::NotApplicable
        },
    },
    Rule {
        state: SkillState::Competent,
        applies: |level, _, criticality| {
            matches!(criticality, Criticality::Critical | Criticality::Important)
                && (3.0..4.0).contains(&level)
        },
    },
    Rule {
        state: SkillState::Developing,
        applies: |level, _, criticality| {
            matches!(criticality, Criticality::Important | Criticality::Desirable)
                && (2.0..3.0).contains(&level)
        },
    },
    Rule {
        state: SkillState::Strength,
        applies: |level, _, criticality| {
            matches!(criticality, Criticality::Critical | Criticality::Important) && level >= 4.0
        },
    },
    Rule {
        state: SkillState::Basic,
        applies: |level, _, criticality| {
            level < 3.0
                && matches!(
                    criticality,
                    Criticality::Desirable | Criticality::NotApplicable
                )
        },
    },
];

/// Criticality weight × frequency weight.
#[must_use]
pub fn combined_weight(frequency: Frequency, criticality: Criticality) -> f64 {
    criticality.weight() * frequency.weight()
}

/// Classify one skill. Total: every input yields exactly one state.
#[must_use]
pub fn classify(level: Level, frequency: Frequency, criticality: Criticality) -> ClassificationResult {
    let value = level.value();
    let state = RULES
        .iter()
        .find(|rule| (rule.applies)(value, frequency, criticality))
        .map_or(SkillState::Competent, |rule| rule.state);

    ClassificationResult {
        state,
        priority_weight: state.priority_weight(),
        combined_weight: combined_weight(frequency, criticality),
    }
}

/// Classify from raw, untyped codes.
///
/// Unknown codes fall back to `Important` / `Never` and a non-finite level to
/// `0`, so this never fails.
#[must_use]
pub fn classify_codes(level: f64, frequency: &str, criticality: &str) -> ClassificationResult {
    classify(
        Level::new(level),
        Frequency::parse_lossy(frequency),
        Criticality::parse_lossy(criticality),
    )
}

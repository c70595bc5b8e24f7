//! Assessment and evaluation session types.
//!
//! An [`EvaluationSession`] is one timestamped batch of [`SkillAssessment`]s
//! for a single collaborator. Sessions are the events of the system: every
//! derived view (snapshots, periods, metrics) is computed from them.
//!
//! Raw codes coming from external data are parsed leniently. Unknown
//! criticality or frequency codes fall back to the neutral
//! [`Criticality::Important`] / [`Frequency::Never`], non-numeric levels become
//! `0`, and unparseable timestamps are kept as `None` so that downstream
//! derivations can skip them.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};

use crate::types::{CollaboratorId, SessionId, SkillId};

// ==================== Level ====================

/// Measured proficiency on a 0–5 scale in half steps.
///
/// Construction is total: non-finite input becomes `0` and everything else is
/// clamped into range.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(from = "RawLevel", into = "f64")]
pub struct Level(f64);

impl Level {
    /// Lowest possible level (not evaluated / no proficiency).
    pub const MIN: f64 = 0.0;
    /// Highest possible level.
    pub const MAX: f64 = 5.0;

    #[must_use]
    pub fn new(raw: f64) -> Self {
        if raw.is_finite() {
            Self(raw.clamp(Self::MIN, Self::MAX))
        } else {
            Self(Self::MIN)
        }
    }

    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }

    /// A level above zero counts as an actual evaluation.
    #[must_use]
    pub fn is_evaluated(self) -> bool {
        self.0 > Self::MIN
    }

    /// Every level on the half-step scale, lowest first.
    #[must_use]
    pub fn scale() -> Vec<Level> {
        (0..=10).map(|step| Level(f64::from(step) / 2.0)).collect()
    }
}

impl From<f64> for Level {
    fn from(raw: f64) -> Self {
        Self::new(raw)
    }
}

impl From<Level> for f64 {
    fn from(level: Level) -> Self {
        level.0
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}", self.0)
    }
}

/// Wire form of a level: a number, or text that may or may not hold one.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawLevel {
    Number(f64),
    Text(String),
    Other(IgnoredAny),
}

impl From<RawLevel> for Level {
    fn from(raw: RawLevel) -> Self {
        match raw {
            RawLevel::Number(value) => Level::new(value),
            RawLevel::Text(text) => Level::new(text.trim().parse().unwrap_or(Level::MIN)),
            RawLevel::Other(_) => Level::default(),
        }
    }
}

// ==================== Criticality ====================

/// How essential a skill is for a role.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(from = "String", into = "&'static str")]
pub enum Criticality {
    Critical,
    #[default]
    Important,
    Desirable,
    NotApplicable,
}

impl Criticality {
    pub const ALL: [Criticality; 4] = [
        Criticality::Critical,
        Criticality::Important,
        Criticality::Desirable,
        Criticality::NotApplicable,
    ];

    /// Convert to the canonical string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Important => "important",
            Self::Desirable => "desirable",
            Self::NotApplicable => "not_applicable",
        }
    }

    /// Single-letter code used by evaluation forms.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Critical => "C",
            Self::Important => "I",
            Self::Desirable => "D",
            Self::NotApplicable => "N",
        }
    }

    /// Parse from a letter code or a name, case-insensitively.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "c" | "critical" => Some(Self::Critical),
            "i" | "important" => Some(Self::Important),
            "d" | "desirable" => Some(Self::Desirable),
            "n" | "n/a" | "na" | "not_applicable" | "not applicable" => {
                Some(Self::NotApplicable)
            }
            _ => None,
        }
    }

    /// Parse, falling back to [`Criticality::Important`] for unknown codes.
    #[must_use]
    pub fn parse_lossy(s: &str) -> Self {
        Self::parse(s).unwrap_or_default()
    }

    /// Weight used to rank skills by business impact.
    #[must_use]
    pub fn weight(&self) -> f64 {
        match self {
            Self::Critical => 3.0,
            Self::Important => 2.0,
            Self::Desirable => 1.0,
            Self::NotApplicable => 0.0,
        }
    }
}

impl From<String> for Criticality {
    fn from(code: String) -> Self {
        Self::parse_lossy(&code)
    }
}

impl From<Criticality> for &'static str {
    fn from(criticality: Criticality) -> Self {
        criticality.as_str()
    }
}

impl fmt::Display for Criticality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Critical => "Critical",
            Self::Important => "Important",
            Self::Desirable => "Desirable",
            Self::NotApplicable => "N/A",
        };
        f.write_str(label)
    }
}

// ==================== Frequency ====================

/// How often a skill is used in day-to-day work.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(from = "String", into = "&'static str")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    #[default]
    Never,
}

impl Frequency {
    pub const ALL: [Frequency; 5] = [
        Frequency::Daily,
        Frequency::Weekly,
        Frequency::Monthly,
        Frequency::Quarterly,
        Frequency::Never,
    ];

    /// Convert to the canonical string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Never => "never",
        }
    }

    /// Single-letter code used by evaluation forms.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Daily => "D",
            Self::Weekly => "S",
            Self::Monthly => "M",
            Self::Quarterly => "T",
            Self::Never => "N",
        }
    }

    /// Parse from a letter code or a name, case-insensitively.
    ///
    /// Both `S` and `W` are accepted for weekly, `T` and `Q` for quarterly.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "d" | "daily" => Some(Self::Daily),
            "s" | "w" | "weekly" => Some(Self::Weekly),
            "m" | "monthly" => Some(Self::Monthly),
            "t" | "q" | "quarterly" => Some(Self::Quarterly),
            "n" | "never" => Some(Self::Never),
            _ => None,
        }
    }

    /// Parse, falling back to [`Frequency::Never`] for unknown codes.
    #[must_use]
    pub fn parse_lossy(s: &str) -> Self {
        Self::parse(s).unwrap_or_default()
    }

    /// Weight used to rank skills by business impact.
    #[must_use]
    pub fn weight(&self) -> f64 {
        match self {
            Self::Daily => 3.0,
            Self::Weekly => 2.0,
            Self::Monthly => 1.5,
            Self::Quarterly => 1.0,
            Self::Never => 0.0,
        }
    }

    /// Used at least weekly.
    #[must_use]
    pub fn is_frequent(&self) -> bool {
        matches!(self, Self::Daily | Self::Weekly)
    }
}

impl From<String> for Frequency {
    fn from(code: String) -> Self {
        Self::parse_lossy(&code)
    }
}

impl From<Frequency> for &'static str {
    fn from(frequency: Frequency) -> Self {
        frequency.as_str()
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Daily => "Daily",
            Self::Weekly => "Weekly",
            Self::Monthly => "Monthly",
            Self::Quarterly => "Quarterly",
            Self::Never => "Never",
        };
        f.write_str(label)
    }
}

// ==================== Assessment ====================

/// One rating of one skill inside an evaluation session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkillAssessment {
    pub skill_id: SkillId,

    #[serde(default)]
    pub level: Level,

    #[serde(default)]
    pub criticality: Criticality,

    #[serde(default)]
    pub frequency: Frequency,
}

impl SkillAssessment {
    #[must_use]
    pub fn new(
        skill_id: SkillId,
        level: impl Into<Level>,
        criticality: Criticality,
        frequency: Frequency,
    ) -> Self {
        Self {
            skill_id,
            level: level.into(),
            criticality,
            frequency,
        }
    }
}

/// A timestamped batch of assessments for one collaborator.
///
/// Sessions are immutable once appended to the log. They are ordered by
/// `evaluated_at`, ties broken by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationSession {
    pub id: SessionId,

    pub collaborator_id: CollaboratorId,

    /// When the evaluation happened. `None` when the recorded value was not a
    /// usable instant; such sessions never contribute to derived state.
    #[serde(default, deserialize_with = "deserialize_instant")]
    pub evaluated_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluated_by: Option<String>,

    #[serde(default)]
    pub assessments: Vec<SkillAssessment>,
}

impl EvaluationSession {
    #[must_use]
    pub fn new(
        id: SessionId,
        collaborator_id: CollaboratorId,
        evaluated_at: DateTime<Utc>,
        assessments: Vec<SkillAssessment>,
    ) -> Self {
        Self {
            id,
            collaborator_id,
            evaluated_at: Some(evaluated_at),
            evaluated_by: None,
            assessments,
        }
    }

    #[must_use]
    pub fn with_evaluator(mut self, evaluator: impl Into<String>) -> Self {
        self.evaluated_by = Some(evaluator.into());
        self
    }

    /// Key giving the total order of the log.
    #[must_use]
    pub fn order_key(&self) -> (Option<DateTime<Utc>>, SessionId) {
        (self.evaluated_at, self.id)
    }

    /// Mean level of the evaluated (level > 0) assessments, or `0`.
    #[must_use]
    pub fn average_level(&self) -> f64 {
        crate::mean(
            self.assessments
                .iter()
                .filter(|a| a.level.is_evaluated())
                .map(|a| a.level.value()),
        )
    }
}

// ==================== Instants ====================

/// Parse an instant from RFC 3339, a naive `YYYY-MM-DDTHH:MM:SS`, or a plain
/// `YYYY-MM-DD` date (taken as midnight UTC).
#[must_use]
pub fn parse_instant(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawInstant {
    Text(String),
    Millis(i64),
    Other(IgnoredAny),
}

pub(crate) fn deserialize_instant<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawInstant>::deserialize(deserializer)?;
    Ok(match raw {
        Some(RawInstant::Text(text)) => parse_instant(&text),
        Some(RawInstant::Millis(ms)) => DateTime::from_timestamp_millis(ms),
        Some(RawInstant::Other(_)) | None => None,
    })
}

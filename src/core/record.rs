//! Purpose: Feedback record model and explicit score coercion.
//! Exports: `FeedbackRecord`, `FeedbackTable`, `Score`, `Submission`, `MinScore`.
//! Role: Value types shared by the store client, filter, export, and analytics.
//! Invariants: Records are immutable value objects; tables are never mutated after fetch.
//! Invariants: Score coercion never fails; bad input becomes `Score::Unparseable`.
use super::error::{Error, ErrorKind};
use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

pub const SCORE_MIN: u8 = 1;
pub const SCORE_MAX: u8 = 5;

/// One row as returned by the record store. Extra store columns are ignored.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct FeedbackRecord {
    #[serde(default, deserialize_with = "lenient_text")]
    pub participant_name: Option<String>,
    /// Raw store value; may be a number, numeric text, junk, or null.
    #[serde(default)]
    pub satisfaction_score: Value,
    #[serde(default, deserialize_with = "lenient_text")]
    pub comments: Option<String>,
}

impl FeedbackRecord {
    pub fn new(
        participant_name: Option<&str>,
        satisfaction_score: Value,
        comments: Option<&str>,
    ) -> Self {
        Self {
            participant_name: participant_name.map(str::to_string),
            satisfaction_score,
            comments: comments.map(str::to_string),
        }
    }

    pub fn score(&self) -> Score {
        Score::parse(&self.satisfaction_score)
    }

    /// Name with missing treated as the empty string.
    pub fn name_text(&self) -> &str {
        self.participant_name.as_deref().unwrap_or_default()
    }

    /// Comments with missing treated as the empty string.
    pub fn comments_text(&self) -> &str {
        self.comments.as_deref().unwrap_or_default()
    }
}

/// Ordered rows from a single fetch.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeedbackTable {
    records: Vec<FeedbackRecord>,
}

impl FeedbackTable {
    pub fn new(records: Vec<FeedbackRecord>) -> Self {
        Self { records }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[FeedbackRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FeedbackRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<FeedbackRecord> for FeedbackTable {
    fn from_iter<I: IntoIterator<Item = FeedbackRecord>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a FeedbackTable {
    type Item = &'a FeedbackRecord;
    type IntoIter = std::slice::Iter<'a, FeedbackRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Result of coercing a raw score value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Score {
    Numeric(f64),
    Unparseable,
}

impl Score {
    pub fn parse(raw: &Value) -> Self {
        let value = match raw {
            Value::Number(number) => number.as_f64(),
            Value::String(text) => text.trim().parse::<f64>().ok(),
            _ => None,
        };
        match value {
            Some(value) if value.is_finite() => Score::Numeric(value),
            _ => Score::Unparseable,
        }
    }

    pub fn value(self) -> Option<f64> {
        match self {
            Score::Numeric(value) => Some(value),
            Score::Unparseable => None,
        }
    }

    /// Threshold comparisons treat unparseable scores as zero.
    pub fn or_zero(self) -> f64 {
        self.value().unwrap_or(0.0)
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Score::Numeric(value) => f.write_str(&format_score(*value)),
            Score::Unparseable => Ok(()),
        }
    }
}

impl Serialize for Score {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Score::Numeric(value) if is_integral(*value) => serializer.serialize_i64(*value as i64),
            Score::Numeric(value) => serializer.serialize_f64(*value),
            Score::Unparseable => serializer.serialize_none(),
        }
    }
}

/// Integral scores print without a fractional part (`5`, not `5.0`).
pub fn format_score(value: f64) -> String {
    if is_integral(value) {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

fn is_integral(value: f64) -> bool {
    value.fract() == 0.0 && value.abs() < 1e15
}

/// A validated new feedback entry, ready to be created in the store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Submission {
    participant_name: String,
    satisfaction_score: u8,
    comments: String,
}

impl Submission {
    pub fn new(
        participant_name: impl Into<String>,
        satisfaction_score: i64,
        comments: impl Into<String>,
    ) -> Result<Self, Error> {
        let score = check_score_range(satisfaction_score, "satisfaction score")?;
        Ok(Self {
            participant_name: participant_name.into(),
            satisfaction_score: score,
            comments: comments.into(),
        })
    }

    pub fn participant_name(&self) -> &str {
        &self.participant_name
    }

    pub fn satisfaction_score(&self) -> u8 {
        self.satisfaction_score
    }

    pub fn comments(&self) -> &str {
        &self.comments
    }
}

/// Inclusive lower bound for the threshold filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MinScore(u8);

impl MinScore {
    pub fn new(value: i64) -> Result<Self, Error> {
        check_score_range(value, "minimum score").map(Self)
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for MinScore {
    fn default() -> Self {
        Self(SCORE_MIN)
    }
}

fn check_score_range(value: i64, label: &str) -> Result<u8, Error> {
    if (i64::from(SCORE_MIN)..=i64::from(SCORE_MAX)).contains(&value) {
        Ok(value as u8)
    } else {
        Err(Error::new(ErrorKind::Usage)
            .with_message(format!(
                "{label} must be between {SCORE_MIN} and {SCORE_MAX} (got {value})"
            ))
            .with_hint("Use 1 for poor through 5 for excellent."))
    }
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => Some(text),
        Some(other) => Some(other.to_string()),
    })
}

//! Purpose: Aggregate statistics over an unfiltered feedback table.
//! Exports: `mean_score`, `score_histogram`, `sample_comments`, `summarize`, and result types.
//! Role: Backs the analytics view (metric, distribution chart, comment preview).
//! Invariants: Unparseable scores are excluded from the mean and the histogram.
//! Invariants: An empty table yields `Analytics::NoData`, never a computed aggregate.
use super::record::{FeedbackTable, SCORE_MAX, Score};
use serde::Serialize;

pub const DEFAULT_SAMPLE_SIZE: usize = 5;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ScoreBin {
    pub score: Score,
    pub count: usize,
}

/// Count per distinct numeric score, ascending by score.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ScoreHistogram {
    bins: Vec<ScoreBin>,
}

impl ScoreHistogram {
    pub fn bins(&self) -> &[ScoreBin] {
        &self.bins
    }

    pub fn count_for(&self, score: f64) -> usize {
        self.bins
            .iter()
            .find(|bin| bin.score == Score::Numeric(score))
            .map_or(0, |bin| bin.count)
    }

    pub fn total(&self) -> usize {
        self.bins.iter().map(|bin| bin.count).sum()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CommentSample {
    pub participant_name: String,
    pub satisfaction_score: Score,
    pub comments: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnalyticsSummary {
    pub record_count: usize,
    pub mean_score: Option<f64>,
    pub histogram: ScoreHistogram,
    pub samples: Vec<CommentSample>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Analytics {
    NoData,
    Summary(AnalyticsSummary),
}

pub fn mean_score(table: &FeedbackTable) -> Option<f64> {
    let (sum, count) = table
        .iter()
        .filter_map(|record| record.score().value())
        .fold((0.0, 0usize), |(sum, count), score| (sum + score, count + 1));
    (count > 0).then(|| sum / count as f64)
}

pub fn score_histogram(table: &FeedbackTable) -> ScoreHistogram {
    let mut scores: Vec<f64> = table
        .iter()
        .filter_map(|record| record.score().value())
        .collect();
    scores.sort_by(f64::total_cmp);

    let mut bins: Vec<ScoreBin> = Vec::new();
    for score in scores {
        match bins.last_mut() {
            Some(bin) if bin.score == Score::Numeric(score) => bin.count += 1,
            _ => bins.push(ScoreBin {
                score: Score::Numeric(score),
                count: 1,
            }),
        }
    }
    ScoreHistogram { bins }
}

/// First `limit` records, in table order, whose comment is present.
pub fn sample_comments(table: &FeedbackTable, limit: usize) -> Vec<CommentSample> {
    table
        .iter()
        .filter_map(|record| {
            let comments = record.comments.as_ref()?;
            Some(CommentSample {
                participant_name: record.name_text().to_string(),
                satisfaction_score: record.score(),
                comments: comments.clone(),
            })
        })
        .take(limit)
        .collect()
}

/// Metric text for the analytics view, e.g. `4.20 / 5`.
pub fn format_mean(mean: f64) -> String {
    format!("{mean:.2} / {SCORE_MAX}")
}

pub fn summarize(table: &FeedbackTable, sample_size: usize) -> Analytics {
    if table.is_empty() {
        return Analytics::NoData;
    }
    Analytics::Summary(AnalyticsSummary {
        record_count: table.len(),
        mean_score: mean_score(table),
        histogram: score_histogram(table),
        samples: sample_comments(table, sample_size),
    })
}

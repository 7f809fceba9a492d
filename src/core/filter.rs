//! Purpose: Narrow a fetched table by score threshold and keyword.
//! Exports: `FilterParams`, `DisplayTable`, `DisplayRow`, `filter_table`, `DISPLAY_COLUMNS`.
//! Role: Pure transform between the store client and table display/export.
//! Invariants: Output order matches input order; the source table is never mutated.
//! Invariants: Unparseable scores compare as 0 against the threshold.
use super::record::{FeedbackRecord, FeedbackTable, MinScore, Score};
use serde::Serialize;

pub const DISPLAY_COLUMNS: [&str; 3] = ["Participant Name", "Satisfaction Score", "Comments"];

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterParams {
    pub min_score: MinScore,
    pub keyword: Option<String>,
}

impl FilterParams {
    pub fn new(min_score: MinScore, keyword: Option<String>) -> Self {
        Self { min_score, keyword }
    }

    /// Lower-cased keyword, or `None` when it is blank after trimming.
    fn active_keyword(&self) -> Option<String> {
        self.keyword
            .as_deref()
            .filter(|keyword| !keyword.trim().is_empty())
            .map(str::to_lowercase)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DisplayRow {
    pub participant_name: String,
    pub satisfaction_score: Score,
    pub comments: String,
}

impl DisplayRow {
    fn from_record(record: &FeedbackRecord) -> Self {
        Self {
            participant_name: record.name_text().to_string(),
            satisfaction_score: record.score(),
            comments: record.comments_text().to_string(),
        }
    }

    /// Cells in `DISPLAY_COLUMNS` order.
    pub fn cells(&self) -> [String; 3] {
        [
            self.participant_name.clone(),
            self.satisfaction_score.to_string(),
            self.comments.clone(),
        ]
    }
}

/// Filtered rows carrying only the three display columns.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct DisplayTable {
    rows: Vec<DisplayRow>,
}

impl DisplayTable {
    pub fn new(rows: Vec<DisplayRow>) -> Self {
        Self { rows }
    }

    pub fn columns(&self) -> [&'static str; 3] {
        DISPLAY_COLUMNS
    }

    pub fn rows(&self) -> &[DisplayRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

pub fn filter_table(table: &FeedbackTable, params: &FilterParams) -> DisplayTable {
    let threshold = f64::from(params.min_score.get());
    let keyword = params.active_keyword();
    let rows = table
        .iter()
        .filter(|record| record.score().or_zero() >= threshold)
        .filter(|record| match &keyword {
            Some(keyword) => matches_keyword(record, keyword),
            None => true,
        })
        .map(DisplayRow::from_record)
        .collect();
    DisplayTable::new(rows)
}

fn matches_keyword(record: &FeedbackRecord, keyword_lower: &str) -> bool {
    record.name_text().to_lowercase().contains(keyword_lower)
        || record.comments_text().to_lowercase().contains(keyword_lower)
}

#[cfg(test)]
mod tests {
    use super::{FilterParams, filter_table};
    use crate::core::record::{FeedbackRecord, FeedbackTable, MinScore, Score};
    use serde_json::{Value, json};

    fn record(name: Option<&str>, score: Value, comments: Option<&str>) -> FeedbackRecord {
        FeedbackRecord::new(name, score, comments)
    }

    fn sample_table() -> FeedbackTable {
        FeedbackTable::new(vec![
            record(Some("Ada Lovelace"), json!(5), Some("Loved the labs")),
            record(Some("Grace Hopper"), json!("2"), Some("Too fast")),
            record(Some("Alan"), json!("bad"), Some("labs were fine")),
            record(None, json!(4), None),
            record(Some("Linus"), json!(3), Some("LABS ran long")),
        ])
    }

    fn params(min: i64, keyword: Option<&str>) -> FilterParams {
        FilterParams::new(
            MinScore::new(min).expect("min"),
            keyword.map(str::to_string),
        )
    }

    #[test]
    fn every_row_meets_threshold() {
        let table = sample_table();
        for min in 1..=5 {
            let filtered = filter_table(&table, &params(min, None));
            for row in filtered.rows() {
                let score = row.satisfaction_score.value().expect("numeric");
                assert!(score >= min as f64, "min {min} kept {score}");
            }
        }
    }

    #[test]
    fn unparseable_scores_never_pass_threshold() {
        let filtered = filter_table(&sample_table(), &params(1, None));
        assert_eq!(filtered.len(), 4);
        assert!(
            filtered
                .rows()
                .iter()
                .all(|row| row.satisfaction_score != Score::Unparseable)
        );
    }

    #[test]
    fn keyword_matches_name_or_comments_case_insensitively() {
        let filtered = filter_table(&sample_table(), &params(1, Some("LaBs")));
        let names: Vec<_> = filtered
            .rows()
            .iter()
            .map(|row| row.participant_name.as_str())
            .collect();
        assert_eq!(names, vec!["Ada Lovelace", "Linus"]);

        let filtered = filter_table(&sample_table(), &params(1, Some("grace")));
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered.rows()[0].comments, "Too fast");
    }

    #[test]
    fn blank_keyword_is_threshold_only() {
        let table = sample_table();
        let baseline = filter_table(&table, &params(3, None));
        assert_eq!(filter_table(&table, &params(3, Some(""))), baseline);
        assert_eq!(filter_table(&table, &params(3, Some("   "))), baseline);
    }

    #[test]
    fn keyword_is_matched_untrimmed() {
        // " labs" is inside "Loved the labs" but not at the start of "LABS ran long".
        let filtered = filter_table(&sample_table(), &params(1, Some(" labs")));
        let names: Vec<_> = filtered
            .rows()
            .iter()
            .map(|row| row.participant_name.as_str())
            .collect();
        assert_eq!(names, vec!["Ada Lovelace"]);

        let trimmed = filter_table(&sample_table(), &params(1, Some("labs")));
        assert_eq!(trimmed.len(), 2);
    }

    #[test]
    fn missing_text_fields_are_empty_not_errors() {
        let filtered = filter_table(&sample_table(), &params(4, None));
        assert_eq!(filtered.len(), 2);
        let anonymous = &filtered.rows()[1];
        assert_eq!(anonymous.participant_name, "");
        assert_eq!(anonymous.comments, "");
        assert_eq!(anonymous.cells(), ["".to_string(), "4".to_string(), "".to_string()]);
    }

    #[test]
    fn order_is_preserved() {
        let filtered = filter_table(&sample_table(), &params(3, None));
        let scores: Vec<_> = filtered
            .rows()
            .iter()
            .map(|row| row.satisfaction_score.to_string())
            .collect();
        assert_eq!(scores, vec!["5", "4", "3"]);
    }
}

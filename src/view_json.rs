//! Purpose: Shared JSON shapes for records, analytics, and submit results.
//! Exports: `records_json`, `analytics_json`, `submit_json`.
//! Role: Keeps CLI stdout and HTTP response bodies identical for the same view.
//! Invariants: Field names are additive-only once published.
use kirkpatrick::api::{Analytics, RecordsView, SubmitOutcome, format_mean};

const NO_RECORDS_MESSAGE: &str = "No records available yet.";
use serde_json::{Map, Value, json};

pub(crate) fn records_json(view: &RecordsView) -> Value {
    let table = &view.table;
    let mut map = Map::new();
    map.insert("columns".to_string(), json!(table.columns()));
    map.insert("count".to_string(), json!(table.len()));
    map.insert("rows".to_string(), json!(table.rows()));
    if view.is_store_empty() {
        map.insert("message".to_string(), json!(NO_RECORDS_MESSAGE));
    }
    if let Some(notice) = &view.notice {
        map.insert("notice".to_string(), json!(notice));
    }
    Value::Object(map)
}

pub(crate) fn analytics_json(analytics: &Analytics, notice: Option<&str>) -> Value {
    let mut value = match analytics {
        Analytics::NoData => json!({
            "no_data": true,
            "message": "No data available yet.",
        }),
        Analytics::Summary(summary) => json!({
            "no_data": false,
            "record_count": summary.record_count,
            "mean_score": summary.mean_score,
            "mean_display": summary.mean_score.map(format_mean),
            "histogram": summary.histogram,
            "samples": summary.samples,
        }),
    };
    if let (Some(notice), Some(map)) = (notice, value.as_object_mut()) {
        map.insert("notice".to_string(), json!(notice));
    }
    value
}

pub(crate) fn submit_json(outcome: &SubmitOutcome) -> Value {
    let response = outcome.response_text();
    let response = serde_json::from_str::<Value>(&response).unwrap_or(Value::String(response));
    json!({
        "ok": outcome.is_success(),
        "status": outcome.status(),
        "message": outcome.message(),
        "response": response,
    })
}

#[cfg(test)]
mod tests {
    use super::{analytics_json, records_json, submit_json};
    use kirkpatrick::api::{
        Analytics, DisplayRow, DisplayTable, FeedbackRecord, FeedbackTable, RecordsView, Score,
        SubmitOutcome, summarize,
    };
    use serde_json::json;

    #[test]
    fn records_json_lists_display_columns() {
        let table = DisplayTable::new(vec![DisplayRow {
            participant_name: "Ada".to_string(),
            satisfaction_score: Score::Numeric(5.0),
            comments: String::new(),
        }]);
        let view = RecordsView {
            table,
            fetched: 3,
            notice: None,
        };
        let value = records_json(&view);
        assert_eq!(
            value["columns"],
            json!(["Participant Name", "Satisfaction Score", "Comments"])
        );
        assert_eq!(value["count"], 1);
        assert_eq!(value["rows"][0]["satisfaction_score"], 5);
        assert!(value.get("notice").is_none());
        assert!(value.get("message").is_none());
    }

    #[test]
    fn records_json_reports_empty_store() {
        let view = RecordsView {
            table: DisplayTable::default(),
            fetched: 0,
            notice: None,
        };
        let value = records_json(&view);
        assert_eq!(value["count"], 0);
        assert_eq!(value["message"], "No records available yet.");

        let filtered_out = RecordsView {
            table: DisplayTable::default(),
            fetched: 2,
            notice: None,
        };
        assert!(records_json(&filtered_out).get("message").is_none());
    }

    #[test]
    fn analytics_json_flags_no_data() {
        let value = analytics_json(&Analytics::NoData, Some("Failed to load records: down"));
        assert_eq!(value["no_data"], true);
        assert_eq!(value["notice"], "Failed to load records: down");
    }

    #[test]
    fn analytics_json_formats_mean() {
        let table = FeedbackTable::new(vec![
            FeedbackRecord::new(Some("a"), json!(4), Some("fine")),
            FeedbackRecord::new(Some("b"), json!(5), None),
        ]);
        let value = analytics_json(&summarize(&table, 5), None);
        assert_eq!(value["mean_display"], "4.50 / 5");
        assert_eq!(value["histogram"], json!([{"score": 4, "count": 1}, {"score": 5, "count": 1}]));
        assert_eq!(value["samples"][0]["comments"], "fine");
    }

    #[test]
    fn submit_json_parses_store_response() {
        let outcome = SubmitOutcome::Accepted {
            status: 200,
            body: "{\"Id\":3}".to_string(),
        };
        let value = submit_json(&outcome);
        assert_eq!(value["ok"], true);
        assert_eq!(value["response"]["Id"], 3);
    }
}

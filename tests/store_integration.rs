// Library-level tests for the record store client against an in-process mock store.
mod common;

use common::{MockStore, TABLE_ID, TEST_TOKEN, VIEW_ID, pick_port, sample_records};
use kirkpatrick::api::{
    Analytics, Dashboard, ErrorKind, ExportFormat, FilterParams, MinScore, RecordStoreClient,
    Score, StoreConfig, Submission, SubmitOutcome,
};
use serde_json::json;
use std::time::Duration;

fn client_for(base_url: &str, token: &str) -> RecordStoreClient {
    let config = StoreConfig::new(token)
        .and_then(|config| config.with_base_url(base_url))
        .and_then(|config| config.with_table_id(TABLE_ID))
        .and_then(|config| config.with_view_id(VIEW_ID))
        .expect("config");
    RecordStoreClient::new(config)
        .expect("client")
        .with_timeout(Duration::from_secs(5))
}

#[test]
fn submit_creates_record_with_expected_payload() {
    let store = MockStore::start(Vec::new());
    let client = client_for(&store.base_url, TEST_TOKEN);
    let submission = Submission::new("Ada", 5, "Loved the labs").expect("submission");

    let outcome = client.submit(&submission);
    assert!(outcome.is_success(), "{outcome:?}");
    assert_eq!(outcome.status(), Some(200));
    assert_eq!(outcome.message(), "Feedback submitted successfully.");

    let created = store.created();
    assert_eq!(
        created,
        vec![json!({
            "participant_name": "Ada",
            "satisfaction_score": 5,
            "comments": "Loved the labs",
        })]
    );
}

#[test]
fn submit_rejection_is_an_outcome_not_an_error() {
    let store = MockStore::failing(500, "store exploded");
    let client = client_for(&store.base_url, TEST_TOKEN);
    let submission = Submission::new("Ada", 3, "").expect("submission");

    let outcome = client.submit(&submission);
    match &outcome {
        SubmitOutcome::Rejected { status, body } => {
            assert_eq!(*status, 500);
            assert_eq!(body, "store exploded");
        }
        other => panic!("expected rejection, got {other:?}"),
    }
    assert_eq!(outcome.message(), "Submission failed.\n\nResponse: store exploded");
}

#[test]
fn bad_token_is_rejected_with_unauthorized() {
    let store = MockStore::start(Vec::new());
    let client = client_for(&store.base_url, "wrong-token");
    let submission = Submission::new("Ada", 4, "ok").expect("submission");

    let err = client.submit(&submission).into_result().expect_err("401");
    assert_eq!(err.kind(), ErrorKind::Remote);
    assert_eq!(err.status(), Some(401));
    assert!(store.created().is_empty());
}

#[test]
fn submit_transport_failure_is_reported() {
    let base_url = format!("http://127.0.0.1:{}", pick_port());
    let client = client_for(&base_url, TEST_TOKEN);
    let submission = Submission::new("Ada", 4, "ok").expect("submission");

    let outcome = client.submit(&submission);
    assert!(matches!(outcome, SubmitOutcome::Failed { .. }));
    assert_eq!(outcome.status(), None);
    assert!(outcome.message().starts_with("Submission failed."));
}

#[test]
fn list_all_feeds_filter_and_analytics() {
    let store = MockStore::start(sample_records());
    let client = client_for(&store.base_url, TEST_TOKEN);

    let listing = client.list_all();
    assert!(!listing.is_degraded());
    assert_eq!(listing.table.len(), 5);
    assert_eq!(listing.table.records()[1].score(), Score::Numeric(2.0));
    assert_eq!(listing.table.records()[2].score(), Score::Unparseable);

    let dashboard = Dashboard::new(client);
    let view = dashboard.records(&FilterParams::new(
        MinScore::new(4).expect("min"),
        Some("labs".to_string()),
    ));
    assert_eq!(view.notice, None);
    let names: Vec<&str> = view
        .table
        .rows()
        .iter()
        .map(|row| row.participant_name.as_str())
        .collect();
    assert_eq!(names, vec!["Ada Lovelace", "Linus"]);

    let all = dashboard.records(&FilterParams::default());
    assert_eq!(all.table.len(), 4, "unparseable score never passes the threshold");

    match dashboard.analytics(2).analytics {
        Analytics::Summary(summary) => {
            assert_eq!(summary.record_count, 5);
            assert_eq!(summary.mean_score, Some(3.5));
            assert_eq!(summary.histogram.total(), 4);
            assert_eq!(summary.histogram.count_for(5.0), 1);
            assert_eq!(summary.samples.len(), 2);
            assert_eq!(summary.samples[1].participant_name, "Grace Hopper");
        }
        Analytics::NoData => panic!("expected summary"),
    }
}

#[test]
fn list_failure_degrades_to_empty_table_with_notice() {
    let store = MockStore::failing(503, "store exploded");
    let dashboard = Dashboard::new(client_for(&store.base_url, TEST_TOKEN));

    let listing = dashboard.client().list_all();
    assert!(listing.is_degraded());
    assert!(listing.table.is_empty());
    assert_eq!(
        listing.notice().as_deref(),
        Some("Failed to load records: store exploded")
    );

    let view = dashboard.analytics(5);
    assert_eq!(view.analytics, Analytics::NoData);
    assert!(view.notice.is_some());

    let artifact = dashboard
        .export(&FilterParams::default(), ExportFormat::Csv)
        .expect("export");
    assert_eq!(artifact.row_count, 0);
    assert_eq!(
        String::from_utf8(artifact.bytes).expect("utf8"),
        "Participant Name,Satisfaction Score,Comments\n"
    );
}

//! Purpose: Public Rust API boundary for the feedback dashboard.
//! Exports: Store client, configuration, request handlers, and the core pipeline types.
//! Role: Additive-only surface used by the CLI, the HTTP server, and integration tests.
//! Invariants: Network I/O happens only through `RecordStoreClient`.

mod config;
mod dashboard;
mod remote;

pub use crate::core::analytics::{
    Analytics, AnalyticsSummary, CommentSample, DEFAULT_SAMPLE_SIZE, ScoreBin, ScoreHistogram,
    format_mean, mean_score, sample_comments, score_histogram, summarize,
};
#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::export::{ExportFormat, to_delimited_text, to_spreadsheet};
pub use crate::core::filter::{DISPLAY_COLUMNS, DisplayRow, DisplayTable, FilterParams, filter_table};
pub use crate::core::record::{FeedbackRecord, FeedbackTable, MinScore, Score, Submission};
pub use config::{
    BASE_URL_ENV, DEFAULT_BASE_URL, DEFAULT_TABLE_ID, DEFAULT_VIEW_ID, StoreConfig, TABLE_ID_ENV,
    TOKEN_ENV, VIEW_ID_ENV,
};
pub use dashboard::{AnalyticsView, Dashboard, ExportArtifact, RecordsView};
pub use remote::{Listing, RecordStoreClient, SubmitOutcome};

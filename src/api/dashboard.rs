//! Purpose: Request handlers composing fetch + filter/export/analytics for any front end.
//! Exports: `Dashboard`, `RecordsView`, `ExportArtifact`, `AnalyticsView`.
//! Role: The seam the CLI and HTTP server call; holds no presentation logic.
//! Invariants: Every call re-fetches; nothing is cached between views.
//! Invariants: Fetch failures degrade to empty results with a notice; they never error.
#![allow(clippy::result_large_err)]

use super::remote::{RecordStoreClient, SubmitOutcome};
use crate::core::analytics::{Analytics, summarize};
use crate::core::error::Error;
use crate::core::export::ExportFormat;
use crate::core::filter::{DisplayTable, FilterParams, filter_table};
use crate::core::record::Submission;

#[derive(Clone)]
pub struct Dashboard {
    client: RecordStoreClient,
}

#[derive(Debug)]
pub struct RecordsView {
    pub table: DisplayTable,
    /// Records fetched before filtering.
    pub fetched: usize,
    pub notice: Option<String>,
}

impl RecordsView {
    /// True when the store returned no records at all (filters not involved).
    pub fn is_store_empty(&self) -> bool {
        self.fetched == 0
    }
}

#[derive(Debug)]
pub struct ExportArtifact {
    pub format: ExportFormat,
    pub bytes: Vec<u8>,
    pub row_count: usize,
    pub notice: Option<String>,
}

impl ExportArtifact {
    pub fn file_name(&self) -> &'static str {
        self.format.file_name()
    }

    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }
}

#[derive(Debug)]
pub struct AnalyticsView {
    pub analytics: Analytics,
    pub notice: Option<String>,
}

impl Dashboard {
    pub fn new(client: RecordStoreClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &RecordStoreClient {
        &self.client
    }

    pub fn submit(&self, submission: &Submission) -> SubmitOutcome {
        self.client.submit(submission)
    }

    pub fn records(&self, params: &FilterParams) -> RecordsView {
        let listing = self.client.list_all();
        RecordsView {
            table: filter_table(&listing.table, params),
            fetched: listing.table.len(),
            notice: listing.notice(),
        }
    }

    /// Encoding can still fail; fetch failures only add a notice.
    pub fn export(
        &self,
        params: &FilterParams,
        format: ExportFormat,
    ) -> Result<ExportArtifact, Error> {
        let view = self.records(params);
        let bytes = format.encode(&view.table)?;
        Ok(ExportArtifact {
            format,
            bytes,
            row_count: view.table.len(),
            notice: view.notice,
        })
    }

    pub fn analytics(&self, sample_size: usize) -> AnalyticsView {
        let listing = self.client.list_all();
        AnalyticsView {
            analytics: summarize(&listing.table, sample_size),
            notice: listing.notice(),
        }
    }
}

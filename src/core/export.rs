//! Purpose: Serialize a filtered table to CSV and XLSX download artifacts.
//! Exports: `ExportFormat`, `to_delimited_text`, `to_spreadsheet`.
//! Role: Pure encoders used by the CLI `export` command and the server downloads.
//! Invariants: Output depends only on the table content and column order.
//! Invariants: No index column; the header row is `DISPLAY_COLUMNS`.
use super::error::{Error, ErrorKind};
use super::filter::{DISPLAY_COLUMNS, DisplayTable};
use super::record::Score;
use rust_xlsxwriter::{DocProperties, ExcelDateTime, Format, Workbook, XlsxError};

const SHEET_NAME: &str = "Feedback";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExportFormat {
    Csv,
    Xlsx,
}

impl ExportFormat {
    /// Stable lower-case name used in JSON output.
    pub fn label(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            ExportFormat::Csv => "feedback_records.csv",
            ExportFormat::Xlsx => "feedback_records.xlsx",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv",
            ExportFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }

    pub fn encode(self, table: &DisplayTable) -> Result<Vec<u8>, Error> {
        match self {
            ExportFormat::Csv => to_delimited_text(table),
            ExportFormat::Xlsx => to_spreadsheet(table),
        }
    }
}

pub fn to_delimited_text(table: &DisplayTable) -> Result<Vec<u8>, Error> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(DISPLAY_COLUMNS).map_err(csv_error)?;
    for row in table.rows() {
        writer.write_record(row.cells()).map_err(csv_error)?;
    }
    writer.into_inner().map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("failed to flush csv export")
            .with_source(err.into_error())
    })
}

pub fn to_spreadsheet(table: &DisplayTable) -> Result<Vec<u8>, Error> {
    build_workbook(table).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("failed to encode xlsx export")
            .with_source(err)
    })
}

fn build_workbook(table: &DisplayTable) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    // Pinned so identical tables produce identical bytes.
    let created = ExcelDateTime::from_ymd(2000, 1, 1)?;
    workbook.set_properties(&DocProperties::new().set_creation_datetime(&created));

    let header = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;
    for (col, title) in DISPLAY_COLUMNS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *title, &header)?;
    }
    for (index, row) in table.rows().iter().enumerate() {
        let line = index as u32 + 1;
        if !row.participant_name.is_empty() {
            sheet.write_string(line, 0, &row.participant_name)?;
        }
        if let Score::Numeric(score) = row.satisfaction_score {
            sheet.write_number(line, 1, score)?;
        }
        if !row.comments.is_empty() {
            sheet.write_string(line, 2, &row.comments)?;
        }
    }
    workbook.save_to_buffer()
}

fn csv_error(err: csv::Error) -> Error {
    Error::new(ErrorKind::Internal)
        .with_message("failed to encode csv export")
        .with_source(err)
}

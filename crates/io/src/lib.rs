// File I/O: the spreadsheet row and the dump text

pub mod csv;
pub mod xlsx;

use std::path::{Path, PathBuf};

use bookcheck_recon::SheetRow;
use thiserror::Error;

/// Why the spreadsheet row (or the dump file) could not be loaded.
#[derive(Debug, Error)]
pub enum SheetError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("unsupported file type '{0}' (expected xlsx, xlsm, xlsb, xls, ods, csv or tsv)")]
    UnsupportedExtension(String),

    #[error("failed to open workbook: {0}")]
    Workbook(String),

    #[error("workbook contains no sheets")]
    NoSheets,

    #[error("worksheet '{name}' not found (available: {available})")]
    WorksheetNotFound { name: String, available: String },

    #[error("sheet has no header row")]
    NoHeader,

    #[error("sheet has a header row but no data row")]
    NoDataRow,

    #[error("CSV parse error: {0}")]
    Csv(String),
}

impl SheetError {
    /// True when the file itself could not be read, as opposed to parsed.
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. })
    }
}

/// Load the header row and the first data row of a spreadsheet.
///
/// Workbooks go through calamine; `.csv` and `.tsv` through the CSV reader.
/// `worksheet` selects a sheet by name and is ignored for CSV input.
pub fn load_row(path: &Path, worksheet: Option<&str>) -> Result<SheetRow, SheetError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => xlsx::load_row(path, worksheet),
        "csv" => {
            if worksheet.is_some() {
                log::warn!("--worksheet is ignored for CSV input");
            }
            csv::load_row(path)
        }
        "tsv" | "tab" => csv::load_row_with_delimiter(path, b'\t'),
        _ => Err(SheetError::UnsupportedExtension(ext)),
    }
}

/// Read a dump file as text, decoding Windows-1252 when it is not UTF-8.
pub fn read_dump(path: &Path) -> Result<String, SheetError> {
    csv::read_file_as_utf8(path)
}

/// Column headers and one row of cells, paired up into a [`SheetRow`].
///
/// Blank headers are skipped. Missing trailing cells stay absent, which the
/// reconciler reads as empty.
pub(crate) fn pair_row(
    headers: &[String],
    cells: impl IntoIterator<Item = bookcheck_recon::CellValue>,
) -> SheetRow {
    let mut row = SheetRow::new();
    for (header, cell) in headers.iter().zip(cells) {
        if header.trim().is_empty() {
            continue;
        }
        row.insert(header, cell);
    }
    row
}

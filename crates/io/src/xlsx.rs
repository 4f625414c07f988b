// Excel/ODS import (xlsx, xlsm, xlsb, xls, ods)

use std::path::Path;

use bookcheck_recon::{CellValue, SheetRow};
use calamine::{open_workbook_auto, Data, Reader, Sheets};

use crate::{pair_row, SheetError};

/// Load the header row and first data row of a workbook sheet.
///
/// The first sheet is used unless `worksheet` names another one. Fully blank
/// rows between the header and the data are skipped.
pub fn load_row(path: &Path, worksheet: Option<&str>) -> Result<SheetRow, SheetError> {
    if !path.exists() {
        return Err(SheetError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
        });
    }

    let mut workbook: Sheets<_> =
        open_workbook_auto(path).map_err(|e| SheetError::Workbook(e.to_string()))?;

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    let sheet_name = match worksheet {
        Some(name) => sheet_names
            .iter()
            .find(|s| s.as_str() == name)
            .cloned()
            .ok_or_else(|| SheetError::WorksheetNotFound {
                name: name.to_string(),
                available: sheet_names.join(", "),
            })?,
        None => sheet_names.first().cloned().ok_or(SheetError::NoSheets)?,
    };
    log::debug!("reading sheet '{sheet_name}' of {}", path.display());

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| SheetError::Workbook(format!("failed to read sheet '{sheet_name}': {e}")))?;

    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .ok_or(SheetError::NoHeader)?
        .iter()
        .map(|cell| match cell_value(cell) {
            CellValue::Empty => String::new(),
            other => other.to_string(),
        })
        .collect();

    let data = rows
        .find(|row| row.iter().any(|c| !cell_value(c).is_empty()))
        .ok_or(SheetError::NoDataRow)?;

    Ok(pair_row(&headers, data.iter().map(cell_value)))
}

fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) if s.is_empty() => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(n) => CellValue::Number(*n),
        Data::Int(n) => CellValue::Number(*n as f64),
        Data::Bool(b) => CellValue::text(if *b { "TRUE" } else { "FALSE" }),
        Data::Error(e) => CellValue::Text(format!("#{:?}", e)),
        // Serial number in the 1900 date system
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) => CellValue::Text(s.clone()),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook as XlsxWorkbook;
    use std::path::PathBuf;

    const HEADERS: [&str; 6] = [
        "Formatted ISBN",
        "Book Title",
        "Edition No.",
        "Reference style (Numbered/Harvard/Vancouver Numbered/AMA/APA/Vancouver Name/Year)",
        "Journal cover image*\n(Attached/NA)",
        "New PM Internal/External",
    ];

    fn write_ticket(dir: &Path, second_sheet: bool) -> PathBuf {
        let path = dir.join("ticket.xlsx");
        let mut workbook = XlsxWorkbook::new();

        let sheet = workbook.add_worksheet();
        sheet.set_name("Ticket").unwrap();
        for (col, header) in HEADERS.iter().enumerate() {
            sheet.write_string(0, col as u16, *header).unwrap();
        }
        sheet.write_number(1, 0, 9780323987654.0).unwrap();
        sheet.write_string(1, 1, "Modern Review").unwrap();
        sheet.write_number(1, 2, 2.0).unwrap();
        sheet.write_string(1, 3, "APA").unwrap();
        sheet.write_string(1, 4, "NA").unwrap();
        sheet.write_string(1, 5, "Jane Doe").unwrap();
        sheet.write_string(2, 0, "second row is ignored").unwrap();

        if second_sheet {
            let other = workbook.add_worksheet();
            other.set_name("Revised").unwrap();
            other.write_string(0, 0, "Book Title").unwrap();
            other.write_boolean(0, 1, true).unwrap();
            other.write_string(2, 0, "Revised Title").unwrap();
            other.write_boolean(2, 1, false).unwrap();
        }

        workbook.save(&path).unwrap();
        path
    }

    #[test]
    fn test_first_sheet_first_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_ticket(dir.path(), false);

        let row = load_row(&path, None).unwrap();
        assert_eq!(row.len(), 6);
        assert_eq!(row.cell("Formatted ISBN"), CellValue::Number(9780323987654.0));
        assert_eq!(row.cell("Edition No."), CellValue::Number(2.0));
        assert_eq!(row.cell("Reference style"), CellValue::text("APA"));
        assert_eq!(
            row.cell("Journal cover image* (Attached/NA)"),
            CellValue::text("NA")
        );
    }

    #[test]
    fn test_named_worksheet_skips_blank_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_ticket(dir.path(), true);

        let row = load_row(&path, Some("Revised")).unwrap();
        assert_eq!(row.cell("Book Title"), CellValue::text("Revised Title"));
        assert_eq!(row.cell("TRUE"), CellValue::text("FALSE"));
    }

    #[test]
    fn test_unknown_worksheet_lists_available() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_ticket(dir.path(), true);

        match load_row(&path, Some("Missing")) {
            Err(SheetError::WorksheetNotFound { name, available }) => {
                assert_eq!(name, "Missing");
                assert_eq!(available, "Ticket, Revised");
            }
            other => panic!("expected WorksheetNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_header_without_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.xlsx");
        let mut workbook = XlsxWorkbook::new();
        workbook
            .add_worksheet()
            .write_string(0, 0, "Formatted ISBN")
            .unwrap();
        workbook.save(&path).unwrap();

        assert!(matches!(load_row(&path, None), Err(SheetError::NoDataRow)));
    }

    #[test]
    fn test_missing_and_corrupt_files() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_row(&dir.path().join("absent.xlsx"), None)
            .unwrap_err()
            .is_io());

        let bogus = dir.path().join("bogus.xlsx");
        std::fs::write(&bogus, b"not a zip archive").unwrap();
        assert!(matches!(
            load_row(&bogus, None),
            Err(SheetError::Workbook(_))
        ));
    }

    #[test]
    fn test_cell_value_mapping() {
        assert_eq!(cell_value(&Data::Int(3)), CellValue::Number(3.0));
        assert_eq!(cell_value(&Data::String(String::new())), CellValue::Empty);
        assert_eq!(cell_value(&Data::Bool(true)), CellValue::text("TRUE"));
        assert_eq!(
            cell_value(&Data::DateTimeIso("2024-01-31".into())),
            CellValue::text("2024-01-31")
        );
    }
}

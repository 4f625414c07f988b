//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! | Code | Meaning                                                  |
//! |------|----------------------------------------------------------|
//! | 0    | Success, every field `same` or `info`                    |
//! | 1    | At least one field `mismatch` or `error`                 |
//! | 2    | Usage error (bad arguments, unknown worksheet)           |
//! | 3    | I/O error (cannot read input, cannot write output)       |
//! | 4    | No matching record in the dump                           |
//! | 5    | Spreadsheet could not be parsed                          |
//! | 6    | Config invalid, or no cipher secret configured           |
//! | 7    | Manual decryption failed                                 |

use bookcheck_io::SheetError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// Reconciliation found mismatching or undecryptable fields.
/// Like `diff(1)`, exit 1 means "sources differ."
pub const EXIT_MISMATCH: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// Input file unreadable or output file unwritable.
pub const EXIT_IO: u8 = 3;

/// Dump does not contain the record (missing insert, malformed rows).
pub const EXIT_NO_RECORD: u8 = 4;

/// Spreadsheet opened but not usable (no sheets, no data row, bad CSV).
pub const EXIT_SHEET_PARSE: u8 = 5;

/// Config file unreadable as TOML or failing validation.
pub const EXIT_INVALID_CONFIG: u8 = 6;

/// `decrypt` could not recover plaintext.
pub const EXIT_DECRYPT: u8 = 7;

/// Map a spreadsheet loading error to its exit code.
pub fn sheet_exit_code(err: &SheetError) -> u8 {
    match err {
        SheetError::Io { .. } => EXIT_IO,
        SheetError::UnsupportedExtension(_) | SheetError::WorksheetNotFound { .. } => EXIT_USAGE,
        SheetError::Workbook(_)
        | SheetError::NoSheets
        | SheetError::NoHeader
        | SheetError::NoDataRow
        | SheetError::Csv(_) => EXIT_SHEET_PARSE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct() {
        let codes = [
            EXIT_SUCCESS,
            EXIT_MISMATCH,
            EXIT_USAGE,
            EXIT_IO,
            EXIT_NO_RECORD,
            EXIT_SHEET_PARSE,
            EXIT_INVALID_CONFIG,
            EXIT_DECRYPT,
        ];
        let mut sorted = codes.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), codes.len());
    }

    #[test]
    fn test_sheet_error_mapping() {
        assert_eq!(sheet_exit_code(&SheetError::NoDataRow), EXIT_SHEET_PARSE);
        assert_eq!(
            sheet_exit_code(&SheetError::UnsupportedExtension("pdf".into())),
            EXIT_USAGE
        );
        let io = SheetError::Io {
            path: "ticket.xlsx".into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert_eq!(sheet_exit_code(&io), EXIT_IO);
    }
}

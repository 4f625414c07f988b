// CSV/TSV import

use std::io::Read;
use std::path::Path;

use bookcheck_recon::{CellValue, SheetRow};

use crate::{pair_row, SheetError};

pub fn load_row(path: &Path) -> Result<SheetRow, SheetError> {
    let content = read_file_as_utf8(path)?;
    let delimiter = sniff_delimiter(&content);
    row_from_string(&content, delimiter)
}

pub fn load_row_with_delimiter(path: &Path, delimiter: u8) -> Result<SheetRow, SheetError> {
    let content = read_file_as_utf8(path)?;
    row_from_string(&content, delimiter)
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content.lines().take(10).collect();

    if sample_lines.is_empty() {
        return b',';
    }

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        if counts.first().copied().unwrap_or(0) <= 1 {
            continue;
        }

        // more consistent lines and more columns both point at the real delimiter
        let target = counts[0];
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Read file and convert to UTF-8 if needed (handles Windows-1252, Latin-1, etc.)
pub fn read_file_as_utf8(path: &Path) -> Result<String, SheetError> {
    let io_err = |source| SheetError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut file = std::fs::File::open(path).map_err(io_err)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(io_err)?;

    let text = match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            log::debug!("{} is not UTF-8; decoding as Windows-1252", path.display());
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            decoded.into_owned()
        }
    };

    // Excel writes a BOM on "CSV UTF-8" exports
    Ok(match text.strip_prefix('\u{FEFF}') {
        Some(rest) => rest.to_string(),
        None => text,
    })
}

fn row_from_string(content: &str, delimiter: u8) -> Result<SheetRow, SheetError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut records = reader.records();

    let headers: Vec<String> = match records.next() {
        Some(result) => {
            let record = result.map_err(|e| SheetError::Csv(e.to_string()))?;
            record.iter().map(str::to_string).collect()
        }
        None => return Err(SheetError::NoHeader),
    };

    for result in records {
        let record = result.map_err(|e| SheetError::Csv(e.to_string()))?;
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        let cells = record.iter().map(|field| {
            if field.is_empty() {
                CellValue::Empty
            } else {
                CellValue::text(field)
            }
        });
        return Ok(pair_row(&headers, cells));
    }

    Err(SheetError::NoDataRow)
}

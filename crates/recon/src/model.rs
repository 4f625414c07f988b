use std::collections::BTreeMap;

use serde::Serialize;

// ---------------------------------------------------------------------------
// Spreadsheet input
// ---------------------------------------------------------------------------

/// A single cell as loaded from the configuration spreadsheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
}

impl CellValue {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.is_empty(),
            Self::Number(_) => false,
        }
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Text(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

/// The one spreadsheet row taking part in a reconciliation.
///
/// Column names are normalized on insert: trimmed, and every run of CR/LF
/// replaced by a single space.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SheetRow {
    cells: BTreeMap<String, CellValue>,
}

impl SheetRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: &str, value: CellValue) {
        self.cells.insert(normalize_column(column), value);
    }

    pub fn with(mut self, column: &str, value: CellValue) -> Self {
        self.insert(column, value);
        self
    }

    /// Look a column up by exact name, then by prefix.
    ///
    /// Header cells like `Reference style (Numbered/Harvard/...)` carry
    /// free-form hints after the name, so `get("Reference style")` finds them.
    pub fn get(&self, column: &str) -> Option<&CellValue> {
        if let Some(v) = self.cells.get(column) {
            return Some(v);
        }
        self.cells
            .iter()
            .find(|(name, _)| name.starts_with(column))
            .map(|(_, v)| v)
    }

    /// Cell value for a column, `Empty` when the column is absent.
    pub fn cell(&self, column: &str) -> CellValue {
        self.get(column).cloned().unwrap_or(CellValue::Empty)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Trim a header and fold embedded line breaks into single spaces.
pub fn normalize_column(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_break = false;
    for ch in name.trim().chars() {
        if ch == '\r' || ch == '\n' {
            if !in_break {
                out.push(' ');
                in_break = true;
            }
        } else {
            out.push(ch);
            in_break = false;
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Dump record
// ---------------------------------------------------------------------------

/// Field values recovered from the dump for one journal.
///
/// `identifier` and `title` come from the journals table and are always
/// present; the rest come from the attributes table and may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DumpRecord {
    pub identifier: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edition_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub csl_style_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_manager_name: Option<String>,
}

impl DumpRecord {
    /// Stored cover path, if one is present and non-blank.
    pub fn cover_path(&self) -> Option<&str> {
        self.cover_image_path
            .as_deref()
            .filter(|p| !p.trim().is_empty())
    }

    /// Set an attribute by its dump key. Returns false for keys we don't track.
    pub fn set_attribute(&mut self, key: &str, value: String) -> bool {
        let slot = match key {
            "editionNumber" => &mut self.edition_number,
            "cslStylePath" => &mut self.csl_style_path,
            "coverImagePath" => &mut self.cover_image_path,
            "projectManagerName" => &mut self.project_manager_name,
            _ => return false,
        };
        *slot = Some(value);
        true
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Same,
    Mismatch,
    Info,
    Error,
}

impl std::fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Same => write!(f, "same"),
            Self::Mismatch => write!(f, "mismatch"),
            Self::Info => write!(f, "info"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Verdict for one reconciled field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonOutcome {
    /// Spreadsheet column label.
    pub field: String,
    /// Spreadsheet value as displayed.
    pub source: String,
    /// Stored dump value.
    pub target: String,
    pub status: OutcomeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Informational message for `info` outcomes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Value the stored field was expected to hold, when it differs from `source`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signed_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decrypted: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub needs_manual_decryption: bool,
}

impl ComparisonOutcome {
    pub fn new(
        field: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
        status: OutcomeStatus,
    ) -> Self {
        Self {
            field: field.into(),
            source: source.into(),
            target: target.into(),
            status,
            error: None,
            note: None,
            expected: None,
            signed_url: None,
            decrypted: None,
            needs_manual_decryption: false,
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn with_expected(mut self, expected: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    Fail,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconSummary {
    pub total_fields: usize,
    pub same: usize,
    pub mismatch: usize,
    pub info: usize,
    pub error: usize,
    pub verdict: Verdict,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub identifier: String,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconReport {
    pub meta: ReconMeta,
    pub summary: ReconSummary,
    pub outcomes: Vec<ComparisonOutcome>,
}

//! The declared comparison fields and their fixed lookup tables.

use serde::Serialize;

/// Root that every stored style-sheet path starts with.
pub const CSL_ROOT: &str = "csl/";

/// Reference style label (as typed in the spreadsheet) → style-sheet file.
pub const REFERENCE_STYLES: &[(&str, &str)] = &[
    ("APA 7th", "elsevier-apa-7th-edition.csl"),
    ("Harvard", "elsevier-harvard.csl"),
    ("Vancouver Numbered", "elsevier-vancouver-numbered.csl"),
    ("Numbered", "elsevier-with-titles.csl"),
    ("AMA", "ama.csl"),
    ("Embellished_Vancouver", "elsevier-vancouver-embellish.csl"),
    ("Vancouver_nameAndYear", "elsevier-vancouver-author-date.csl"),
    ("APA", "apa.csl"),
    ("Saunders_nameAndYear", "saunders-author.csl"),
    ("Saunders_numbered", "saunders-number.csl"),
    ("ACS", "acs.csl"),
    ("ACS_nameAndYear", "acs-author-date.csl"),
];

/// Expected stored path for a style label, `None` when the label is unknown.
pub fn style_path(label: &str) -> Option<String> {
    REFERENCE_STYLES
        .iter()
        .find(|(name, _)| *name == label)
        .map(|(_, file)| format!("{CSL_ROOT}{file}"))
}

/// One reconciled field. Variants are listed in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldRule {
    Identifier,
    Title,
    EditionNumber,
    ReferenceStyle,
    CoverImage,
    ProjectManager,
}

impl FieldRule {
    pub const ALL: [FieldRule; 6] = [
        Self::Identifier,
        Self::Title,
        Self::EditionNumber,
        Self::ReferenceStyle,
        Self::CoverImage,
        Self::ProjectManager,
    ];

    /// Spreadsheet column (or column prefix) the rule reads. Doubles as the
    /// outcome label.
    pub fn column(&self) -> &'static str {
        match self {
            Self::Identifier => "Formatted ISBN",
            Self::Title => "Book Title",
            Self::EditionNumber => "Edition No.",
            Self::ReferenceStyle => "Reference style",
            Self::CoverImage => "Journal cover image",
            Self::ProjectManager => "New PM Internal/External",
        }
    }

    /// Dump field the rule compares against.
    pub fn dump_field(&self) -> &'static str {
        match self {
            Self::Identifier => "identifier",
            Self::Title => "expansion",
            Self::EditionNumber => "editionNumber",
            Self::ReferenceStyle => "cslStylePath",
            Self::CoverImage => "coverImagePath",
            Self::ProjectManager => "projectManagerName",
        }
    }
}

impl std::fmt::Display for FieldRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.column())
    }
}

use std::time::Duration;

use log::{debug, warn};

use crate::cipher::FieldCipher;
use crate::error::DecryptionError;
use crate::evidence::compute_summary;
use crate::model::{
    CellValue, ComparisonOutcome, DumpRecord, OutcomeStatus, ReconMeta, ReconReport, SheetRow,
};
use crate::normalize::{escape_for_storage, normalize, normalize_str, NA};
use crate::rules::{style_path, FieldRule};
use crate::signer::{UrlSigner, DEFAULT_URL_EXPIRY};

/// Spreadsheet value that marks a cover image as supplied.
const ATTACHED: &str = "ATTACHED";

/// Compares one spreadsheet row against one dump record.
///
/// Holds borrowed, read-only collaborators: the field cipher and the URL
/// signer. Nothing is mutated during a run. Without a cipher, encrypted
/// fields come back as errors flagged for manual decryption.
pub struct Reconciler<'a> {
    cipher: Option<&'a FieldCipher>,
    signer: &'a dyn UrlSigner,
    url_expiry: Duration,
}

impl<'a> Reconciler<'a> {
    pub fn new(cipher: &'a FieldCipher, signer: &'a dyn UrlSigner) -> Self {
        Self {
            cipher: Some(cipher),
            signer,
            url_expiry: DEFAULT_URL_EXPIRY,
        }
    }

    pub fn without_cipher(signer: &'a dyn UrlSigner) -> Self {
        Self {
            cipher: None,
            signer,
            url_expiry: DEFAULT_URL_EXPIRY,
        }
    }

    pub fn with_url_expiry(mut self, expiry: Duration) -> Self {
        self.url_expiry = expiry;
        self
    }

    /// One outcome per declared field, in [`FieldRule::ALL`] order.
    pub fn reconcile(&self, row: &SheetRow, record: &DumpRecord) -> Vec<ComparisonOutcome> {
        FieldRule::ALL
            .iter()
            .filter_map(|rule| self.compare(*rule, row, record))
            .collect()
    }

    /// Reconcile and wrap the outcomes with run metadata and a summary.
    pub fn report(&self, row: &SheetRow, record: &DumpRecord) -> ReconReport {
        let outcomes = self.reconcile(row, record);
        let summary = compute_summary(&outcomes);
        ReconReport {
            meta: ReconMeta {
                identifier: normalize(&row.cell(FieldRule::Identifier.column())),
                engine_version: env!("CARGO_PKG_VERSION").to_string(),
                run_at: chrono::Utc::now().to_rfc3339(),
            },
            summary,
            outcomes,
        }
    }

    /// Evaluate a single rule. `None` when the rule does not apply: the
    /// project manager is only checked when the ticket marks the cover as
    /// attached and a cover is stored.
    pub fn compare(
        &self,
        rule: FieldRule,
        row: &SheetRow,
        record: &DumpRecord,
    ) -> Option<ComparisonOutcome> {
        let source = row.cell(rule.column());
        let outcome = match rule {
            FieldRule::Identifier => compare_identifier(&source, &record.identifier),
            FieldRule::Title => compare_title(&source, &record.title),
            FieldRule::EditionNumber => {
                compare_edition(&source, record.edition_number.as_deref().unwrap_or(""))
            }
            FieldRule::ReferenceStyle => {
                compare_reference_style(&source, record.csl_style_path.as_deref().unwrap_or(""))
            }
            FieldRule::CoverImage => self.compare_cover_image(&source, record),
            FieldRule::ProjectManager => {
                let cover = normalize(&row.cell(FieldRule::CoverImage.column()));
                if !cover.eq_ignore_ascii_case(ATTACHED) {
                    return None;
                }
                record.cover_path()?;
                self.compare_project_manager(&source, record.project_manager_name.as_deref())
            }
        };
        debug!("{rule}: {}", outcome.status);
        Some(outcome)
    }

    fn compare_cover_image(&self, source: &CellValue, record: &DumpRecord) -> ComparisonOutcome {
        let field = FieldRule::CoverImage.column();
        let src = normalize(source);
        let stored = record.cover_path();
        let target = stored.unwrap_or("");

        if src == NA {
            return ComparisonOutcome::new(field, src, target, OutcomeStatus::Info)
                .with_note("cover image not attached");
        }

        if !src.eq_ignore_ascii_case(ATTACHED) {
            return ComparisonOutcome::new(field, src, target, OutcomeStatus::Mismatch)
                .with_error("cover image not attached in source ticket");
        }

        let mut outcome = ComparisonOutcome::new(field, src, target, OutcomeStatus::Same);
        if let Some(path) = stored {
            match self.signer.presign_get(path, self.url_expiry) {
                Ok(url) => outcome.signed_url = Some(url),
                Err(e) => warn!("cannot sign cover image URL for '{path}': {e}"),
            }
        }
        outcome
    }

    fn compare_project_manager(
        &self,
        source: &CellValue,
        stored: Option<&str>,
    ) -> ComparisonOutcome {
        let field = FieldRule::ProjectManager.column();
        let src = normalize(source);
        let token = stored.unwrap_or("");

        let decrypted = match (self.cipher, stored) {
            (None, _) => Err(DecryptionError::MissingKey),
            (Some(cipher), Some(token)) => cipher.decrypt(token),
            (Some(_), None) => Err(DecryptionError::Empty),
        };

        match decrypted {
            Ok(plain) => {
                let status = if normalize_str(&plain) == src {
                    OutcomeStatus::Same
                } else {
                    OutcomeStatus::Mismatch
                };
                let mut outcome = ComparisonOutcome::new(field, &src, token, status);
                if status == OutcomeStatus::Mismatch {
                    outcome = outcome.with_error(format!(
                        "decrypted project manager '{plain}' does not match '{src}'"
                    ));
                }
                outcome.decrypted = Some(plain);
                outcome
            }
            Err(e) => {
                warn!("project manager field could not be decrypted: {e}");
                let mut outcome = ComparisonOutcome::new(field, src, token, OutcomeStatus::Error)
                    .with_error(format!("decryption failed: {e}"));
                outcome.needs_manual_decryption = true;
                outcome
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Field rules that need no collaborators
// ---------------------------------------------------------------------------

fn compare_identifier(source: &CellValue, stored: &str) -> ComparisonOutcome {
    let rule = FieldRule::Identifier;
    let src = normalize(source);
    let tgt = normalize_str(stored);

    if src != tgt {
        let msg = format!(
            "{} '{src}' does not match stored {} '{tgt}'",
            rule.column(),
            rule.dump_field()
        );
        return ComparisonOutcome::new(rule.column(), src, stored, OutcomeStatus::Mismatch)
            .with_error(msg);
    }

    if stored.trim() != stored {
        return ComparisonOutcome::new(rule.column(), src, stored, OutcomeStatus::Mismatch)
            .with_error(format!(
                "stored {} has leading or trailing whitespace: {stored:?}",
                rule.dump_field()
            ));
    }

    ComparisonOutcome::new(rule.column(), src, stored, OutcomeStatus::Same)
}

fn compare_title(source: &CellValue, stored: &str) -> ComparisonOutcome {
    let field = FieldRule::Title.column();
    let src = normalize(source);
    let expected = escape_for_storage(&src);

    if expected == stored {
        return ComparisonOutcome::new(field, src, stored, OutcomeStatus::Same);
    }
    ComparisonOutcome::new(field, src, stored, OutcomeStatus::Mismatch)
        .with_error(format!("expected stored title '{expected}'"))
        .with_expected(expected)
}

fn compare_edition(source: &CellValue, stored: &str) -> ComparisonOutcome {
    let field = FieldRule::EditionNumber.column();
    let src = normalize(source);
    let tgt = normalize_str(stored);

    if src == tgt {
        ComparisonOutcome::new(field, src, stored, OutcomeStatus::Same)
    } else {
        let msg = format!("edition '{src}' does not match stored '{tgt}'");
        ComparisonOutcome::new(field, src, stored, OutcomeStatus::Mismatch).with_error(msg)
    }
}

fn compare_reference_style(source: &CellValue, stored: &str) -> ComparisonOutcome {
    let field = FieldRule::ReferenceStyle.column();
    let label = normalize(source);
    let tgt = normalize_str(stored);

    let Some(expected) = style_path(&label) else {
        return ComparisonOutcome::new(field, &label, stored, OutcomeStatus::Mismatch)
            .with_error(format!("unknown reference style '{label}'"))
            .with_expected("");
    };

    if normalize_str(&expected) == tgt {
        ComparisonOutcome::new(field, label, stored, OutcomeStatus::Same)
    } else {
        ComparisonOutcome::new(field, label, stored, OutcomeStatus::Mismatch)
            .with_error(format!("expected style path '{expected}'"))
            .with_expected(expected)
    }
}

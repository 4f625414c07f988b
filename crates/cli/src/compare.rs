//! `bookcheck compare`, `extract` and `validate`.

use std::path::{Path, PathBuf};

use bookcheck_config::{SecretSource, Settings};
use bookcheck_recon::model::Verdict;
use bookcheck_recon::normalize::normalize;
use bookcheck_recon::rules::FieldRule;
use bookcheck_recon::{
    extract_record, ExtractionError, FieldCipher, NoSigner, ReconReport, Reconciler, UrlSigner,
};

use crate::exit_codes::{sheet_exit_code, EXIT_IO, EXIT_MISMATCH, EXIT_NO_RECORD};
use crate::presign::S3Presigner;
use crate::{load_settings, CliError};

fn err(code: u8, msg: impl Into<String>) -> CliError {
    CliError { code, message: msg.into(), hint: None }
}

fn no_record(message: String, e: &ExtractionError) -> CliError {
    log::debug!("extraction failed: {}", e.reason());
    let hint = match e {
        ExtractionError::MarkerNotFound { .. } => {
            Some("table names can be changed under [dump] in the settings file".to_string())
        }
        ExtractionError::MalformedRow { .. } | ExtractionError::FieldCountMismatch { .. } => {
            Some("the dump may be truncated; re-export it".to_string())
        }
    };
    CliError { code: EXIT_NO_RECORD, message, hint }
}

fn read_dump(path: &Path) -> Result<String, CliError> {
    bookcheck_io::read_dump(path).map_err(|e| err(EXIT_IO, e.to_string()))
}

/// Signer for cover image URLs, or `NoSigner` when storage is not configured.
fn signer(settings: &Settings) -> Box<dyn UrlSigner> {
    match S3Presigner::from_settings(&settings.storage) {
        Ok(signer) => Box::new(signer),
        Err(e) => {
            log::info!("cover image URLs disabled: {e}");
            Box::new(NoSigner)
        }
    }
}

pub fn cmd_compare(
    sheet: PathBuf,
    dump: PathBuf,
    worksheet: Option<String>,
    config: Option<PathBuf>,
    json_output: bool,
    output_file: Option<PathBuf>,
    quiet: bool,
) -> Result<(), CliError> {
    let settings = load_settings(config.as_deref())?;
    let cipher = settings.secret_key().map(FieldCipher::from_secret);
    if cipher.is_none() {
        log::warn!("no cipher secret configured; encrypted fields need manual decryption");
    }

    let row = bookcheck_io::load_row(&sheet, worksheet.as_deref()).map_err(|e| {
        let code = sheet_exit_code(&e);
        let hint = match &e {
            bookcheck_io::SheetError::NoDataRow => {
                Some("the first row after the header must hold the ticket values".to_string())
            }
            bookcheck_io::SheetError::WorksheetNotFound { .. } => {
                Some("worksheet names are case-sensitive".to_string())
            }
            _ => None,
        };
        CliError { code, message: format!("{}: {e}", sheet.display()), hint }
    })?;
    log::debug!("sheet columns: {}", row.columns().collect::<Vec<_>>().join(" | "));

    let dump_text = read_dump(&dump)?;
    let identifier = normalize(&row.cell(FieldRule::Identifier.column()));
    let record = extract_record(&dump_text, &identifier, &settings.dump).map_err(|e| {
        no_record(format!("no matching record for '{identifier}': {e}"), &e)
    })?;

    let signer = signer(&settings);
    let reconciler = match &cipher {
        Some(cipher) => Reconciler::new(cipher, signer.as_ref()),
        None => Reconciler::without_cipher(signer.as_ref()),
    };
    let report = reconciler
        .with_url_expiry(settings.storage.url_expiry())
        .report(&row, &record);

    let json_str = serde_json::to_string_pretty(&report)
        .map_err(|e| err(EXIT_IO, format!("JSON serialization error: {e}")))?;

    if let Some(ref path) = output_file {
        std::fs::write(path, &json_str)
            .map_err(|e| err(EXIT_IO, format!("cannot write output: {e}")))?;
        if !quiet {
            eprintln!("wrote {}", path.display());
        }
    }

    if json_output {
        println!("{json_str}");
    }

    if !quiet {
        print_report(&report);
    }

    let s = &report.summary;
    if s.verdict == Verdict::Fail {
        return Err(err(
            EXIT_MISMATCH,
            format!("{} mismatched, {} failed field(s)", s.mismatch, s.error),
        ));
    }
    Ok(())
}

/// Human summary to stderr.
fn print_report(report: &ReconReport) {
    let width = report
        .outcomes
        .iter()
        .map(|o| o.field.len())
        .max()
        .unwrap_or(0);

    for o in &report.outcomes {
        eprintln!(
            "{:<8} {:<width$}  {} | {}",
            o.status.to_string().to_uppercase(),
            o.field,
            o.source,
            o.target,
        );
        if let Some(ref e) = o.error {
            eprintln!("{:<8} {:<width$}  {e}", "", "");
        }
        if let Some(ref note) = o.note {
            eprintln!("{:<8} {:<width$}  {note}", "", "");
        }
        if let Some(ref url) = o.signed_url {
            eprintln!("{:<8} {:<width$}  {url}", "", "");
        }
        if o.needs_manual_decryption {
            eprintln!("{:<8} {:<width$}  run `bookcheck decrypt <TOKEN>` to inspect", "", "");
        }
    }

    let s = &report.summary;
    eprintln!(
        "{}: {} fields, {} same, {} mismatch, {} info, {} error",
        report.meta.identifier, s.total_fields, s.same, s.mismatch, s.info, s.error,
    );
}

pub fn cmd_extract(
    dump: PathBuf,
    identifier: Option<String>,
    config: Option<PathBuf>,
) -> Result<(), CliError> {
    let settings = load_settings(config.as_deref())?;
    let dump_text = read_dump(&dump)?;
    let identifier = identifier.unwrap_or_default();

    let record = extract_record(&dump_text, &identifier, &settings.dump)
        .map_err(|e| no_record(format!("no matching record: {e}"), &e))?;

    let json_str = serde_json::to_string_pretty(&record)
        .map_err(|e| err(EXIT_IO, format!("JSON serialization error: {e}")))?;
    println!("{json_str}");
    Ok(())
}

pub fn cmd_validate(config: Option<PathBuf>) -> Result<(), CliError> {
    let path = config.clone().unwrap_or_else(Settings::config_path);
    let settings = load_settings(config.as_deref())?;

    let storage = &settings.storage;
    eprintln!("config:     {}", path.display());
    eprintln!("secret:     {}", settings.crypto.source.as_str());
    eprintln!(
        "storage:    {}",
        match (&storage.bucket, storage.is_configured()) {
            (Some(bucket), true) => format!("{bucket} ({})", storage.region),
            (Some(bucket), false) => format!("{bucket} (no credentials; cover URLs disabled)"),
            (None, _) => "not configured (cover URLs disabled)".to_string(),
        }
    );
    eprintln!("url expiry: {}s", storage.url_expiry_secs);
    eprintln!(
        "dump:       {} / {}",
        settings.dump.journals_table, settings.dump.attributes_table
    );

    if settings.crypto.source == SecretSource::None {
        log::warn!("no cipher secret configured; encrypt and decrypt will refuse to run");
    }
    eprintln!("ok");
    Ok(())
}

// bookcheck CLI - reconcile a ticket spreadsheet against a content database dump

mod compare;
mod exit_codes;
mod keys;
mod presign;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use bookcheck_config::{ConfigError, Settings};
use bookcheck_recon::FieldCipher;
use clap::{Parser, Subcommand};

use exit_codes::{EXIT_INVALID_CONFIG, EXIT_IO, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "bookcheck")]
#[command(about = "Check a ticket spreadsheet against the record stored in a database dump")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Settings file (default: <config dir>/bookcheck/config.toml)
    #[arg(long, global = true, env = "BOOKCHECK_CONFIG")]
    config: Option<PathBuf>,

    /// Log debug detail to stderr (RUST_LOG is honoured otherwise)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare the ticket row field by field with the dump record
    #[command(after_help = "\
Examples:
  bookcheck compare ticket.xlsx journal.sql
  bookcheck compare ticket.xlsx journal.sql --worksheet 'Book details'
  bookcheck compare ticket.csv journal.sql --json
  bookcheck compare ticket.xlsx journal.sql --output report.json --quiet

Exit codes:
  0  Every field same (or informational)
  1  At least one field mismatched or could not be decrypted
  3  Input unreadable
  4  No matching record in the dump
  5  Spreadsheet could not be parsed
  6  Invalid config")]
    Compare {
        /// Ticket spreadsheet (.xlsx, .xls, .xlsb, .ods, .csv, .tsv)
        sheet: PathBuf,

        /// SQL dump holding the stored record
        dump: PathBuf,

        /// Worksheet to read (default: first)
        #[arg(long)]
        worksheet: Option<String>,

        /// Output JSON report to stdout
        #[arg(long)]
        json: bool,

        /// Write JSON report to file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Suppress the human summary on stderr
        #[arg(long, short = 'q')]
        quiet: bool,
    },

    /// Print the record extracted from a dump as JSON
    #[command(after_help = "\
Examples:
  bookcheck extract journal.sql
  bookcheck extract journal.sql --identifier 9780323987654")]
    Extract {
        /// SQL dump
        dump: PathBuf,

        /// Expected identifier; a different stored one is logged
        #[arg(long)]
        identifier: Option<String>,
    },

    /// Decrypt a stored field value
    #[command(after_help = "\
Examples:
  bookcheck decrypt gAAAAABq1QTV...
  BOOKCHECK_SECRET_KEY=... bookcheck decrypt gAAAAABq1QTV...")]
    Decrypt {
        /// Token as found in the dump
        token: String,
    },

    /// Encrypt a value the way stored fields are encrypted
    #[command(after_help = "\
Examples:
  bookcheck encrypt 'Jane Doe'")]
    Encrypt {
        /// Plaintext
        text: String,
    },

    /// Print a new random cipher key
    Keygen,

    /// Load and validate settings without running
    #[command(after_help = "\
Examples:
  bookcheck validate
  bookcheck validate --config ./bookcheck.toml")]
    Validate,
}

fn long_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nbuild:   debug",
            "\ntarget:  ", env!("TARGET"),
        )
    } else {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nbuild:   release",
            "\ntarget:  ", env!("TARGET"),
        )
    }
}

fn init_logging(verbose: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.format_timestamp(None).init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = cli.config;
    let result = match cli.command {
        Commands::Compare {
            sheet,
            dump,
            worksheet,
            json,
            output,
            quiet,
        } => compare::cmd_compare(sheet, dump, worksheet, config, json, output, quiet),
        Commands::Extract { dump, identifier } => compare::cmd_extract(dump, identifier, config),
        Commands::Decrypt { token } => keys::cmd_decrypt(token, config),
        Commands::Encrypt { text } => keys::cmd_encrypt(text, config),
        Commands::Keygen => keys::cmd_keygen(),
        Commands::Validate => compare::cmd_validate(config),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self { code: EXIT_INVALID_CONFIG, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match &err {
            // an explicit --config that does not exist is a usage problem
            ConfigError::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound => {
                CliError::args(err.to_string())
                    .with_hint("check the --config path or BOOKCHECK_CONFIG")
            }
            ConfigError::Io { .. } => CliError { code: EXIT_IO, message: err.to_string(), hint: None },
            ConfigError::Parse { .. } | ConfigError::Invalid(_) => CliError::config(err.to_string())
                .with_hint("run `bookcheck validate` to check the settings file"),
        }
    }
}

pub fn load_settings(path: Option<&Path>) -> Result<Settings, CliError> {
    Ok(Settings::load(path)?)
}

/// Build the field cipher from the configured secret.
pub fn load_cipher(settings: &Settings) -> Result<FieldCipher, CliError> {
    match settings.secret_key() {
        Some(secret) => Ok(FieldCipher::from_secret(secret)),
        None => Err(CliError::config("no cipher secret configured").with_hint(format!(
            "set BOOKCHECK_SECRET_KEY or [crypto] secret_key in {}",
            Settings::config_path().display()
        ))),
    }
}

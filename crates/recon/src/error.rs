use thiserror::Error;

/// Why a record could not be pulled out of a dump.
///
/// Callers treat every variant the same way ("no matching record"); the
/// variant only decides the message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    /// No `INSERT INTO` statement for the table, or no `VALUES` after it.
    #[error("no insert statement found for table `{table}`")]
    MarkerNotFound { table: String },

    /// The tuple list could not be tokenized.
    #[error("table `{table}`: malformed row: {reason}")]
    MalformedRow { table: String, reason: String },

    /// A tuple is shorter than the positions being read from it.
    #[error("table `{table}`, row {row}: expected at least {expected} field(s), found {found}")]
    FieldCountMismatch {
        table: String,
        row: usize,
        expected: usize,
        found: usize,
    },
}

impl ExtractionError {
    /// Short machine-readable reason.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::MarkerNotFound { .. } => "marker_not_found",
            Self::MalformedRow { .. } => "malformed_row",
            Self::FieldCountMismatch { .. } => "field_count_mismatch",
        }
    }
}

/// Failure to turn a stored token back into plaintext.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecryptionError {
    #[error("no encrypted value to decrypt")]
    Empty,
    #[error("no cipher secret configured")]
    MissingKey,
    #[error("token is not valid base64: {0}")]
    Encoding(String),
    #[error("token is truncated ({0} bytes)")]
    Truncated(usize),
    #[error("unsupported token version 0x{0:02x}")]
    UnsupportedVersion(u8),
    #[error("token signature does not match key")]
    Signature,
    #[error("ciphertext padding is invalid")]
    Padding,
    #[error("plaintext is not valid UTF-8")]
    NotUtf8,
}

/// Failure to produce a signed retrieval URL.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignError {
    #[error("object storage credentials are not configured")]
    MissingCredentials,
    #[error("object storage bucket is not configured")]
    MissingBucket,
    #[error("invalid object storage endpoint: {0}")]
    InvalidEndpoint(String),
}

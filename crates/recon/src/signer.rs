use std::time::Duration;

use crate::error::SignError;

/// Default lifetime of a signed cover-image URL.
pub const DEFAULT_URL_EXPIRY: Duration = Duration::from_secs(3600);

/// Produces time-limited retrieval URLs for stored objects.
pub trait UrlSigner {
    fn presign_get(&self, key: &str, expires_in: Duration) -> Result<String, SignError>;
}

/// Signer used when object storage is not configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSigner;

impl UrlSigner for NoSigner {
    fn presign_get(&self, _key: &str, _expires_in: Duration) -> Result<String, SignError> {
        Err(SignError::MissingCredentials)
    }
}

impl<S: UrlSigner + ?Sized> UrlSigner for &S {
    fn presign_get(&self, key: &str, expires_in: Duration) -> Result<String, SignError> {
        (**self).presign_get(key, expires_in)
    }
}

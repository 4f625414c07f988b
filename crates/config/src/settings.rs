// Application settings
// Loaded from ~/.config/bookcheck/config.toml, then overridden from the environment

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use bookcheck_recon::DumpLayout;
use serde::Deserialize;

use crate::ConfigError;

pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_URL_EXPIRY_SECS: u64 = 3600;
/// Longest lifetime a SigV4 presigned URL may have (7 days).
pub const MAX_URL_EXPIRY_SECS: u64 = 604_800;

/// Where the cipher secret came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SecretSource {
    /// `[crypto] secret_key` in the config file
    File,
    /// `BOOKCHECK_SECRET_KEY`
    Environment,
    /// No secret configured
    #[default]
    None,
}

impl SecretSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecretSource::File => "config file",
            SecretSource::Environment => "environment",
            SecretSource::None => "none",
        }
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct CryptoSettings {
    /// Fernet key or passphrase the field cipher is built from
    pub secret_key: Option<String>,

    #[serde(skip)]
    pub source: SecretSource,
}

impl std::fmt::Debug for CryptoSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryptoSettings")
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<redacted>"))
            .field("source", &self.source)
            .finish()
    }
}

/// Object storage holding cover images.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub bucket: Option<String>,
    pub region: String,
    /// Custom endpoint (`https://minio.internal:9000`); AWS when unset
    pub endpoint: Option<String>,
    /// Address the bucket in the path instead of the host name
    pub path_style: bool,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
    pub url_expiry_secs: u64,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            bucket: None,
            region: DEFAULT_REGION.to_string(),
            endpoint: None,
            path_style: false,
            access_key_id: None,
            secret_access_key: None,
            session_token: None,
            url_expiry_secs: DEFAULT_URL_EXPIRY_SECS,
        }
    }
}

impl std::fmt::Debug for StorageSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("StorageSettings")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("path_style", &self.path_style)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &redact(&self.secret_access_key))
            .field("session_token", &redact(&self.session_token))
            .field("url_expiry_secs", &self.url_expiry_secs)
            .finish()
    }
}

impl StorageSettings {
    /// Bucket plus a full access key pair.
    pub fn is_configured(&self) -> bool {
        self.bucket.is_some() && self.access_key_id.is_some() && self.secret_access_key.is_some()
    }

    pub fn url_expiry(&self) -> Duration {
        Duration::from_secs(self.url_expiry_secs)
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub crypto: CryptoSettings,
    pub storage: StorageSettings,
    pub dump: DumpLayout,
}

impl Settings {
    /// Get the default settings file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("bookcheck")
            .join("config.toml")
    }

    pub fn from_toml(input: &str) -> Result<Self, String> {
        let mut settings: Self = toml::from_str(input).map_err(|e| e.to_string())?;
        if settings.crypto.secret_key.is_some() {
            settings.crypto.source = SecretSource::File;
        }
        Ok(settings)
    }

    /// Load settings, apply environment overrides, and validate.
    ///
    /// An explicit `path` must exist. Without one, the default path is used
    /// and a missing file means defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (Self::config_path(), false),
        };

        let mut settings = if !explicit && !path.exists() {
            log::debug!("no config at {}; using defaults", path.display());
            Self::default()
        } else {
            let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
                path: path.clone(),
                source,
            })?;
            log::debug!("loaded config from {}", path.display());
            Self::from_toml(&contents).map_err(|message| ConfigError::Parse {
                path: path.clone(),
                message,
            })?
        };

        settings.apply_overrides(|name| std::env::var(name).ok());
        settings.validate().map_err(ConfigError::Invalid)?;
        Ok(settings)
    }

    /// Overlay values from `lookup` (the process environment in [`load`](Self::load)).
    /// Empty values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(secret) = get("BOOKCHECK_SECRET_KEY") {
            self.crypto.secret_key = Some(secret);
            self.crypto.source = SecretSource::Environment;
        }
        if let Some(bucket) = get("BOOKCHECK_BUCKET") {
            self.storage.bucket = Some(bucket);
        }
        if let Some(region) = get("AWS_REGION") {
            self.storage.region = region;
        }
        if let Some(key) = get("AWS_ACCESS_KEY_ID") {
            self.storage.access_key_id = Some(key);
        }
        if let Some(secret) = get("AWS_SECRET_ACCESS_KEY") {
            self.storage.secret_access_key = Some(secret);
        }
        if let Some(token) = get("AWS_SESSION_TOKEN") {
            self.storage.session_token = Some(token);
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        self.dump.validate()?;

        if self.storage.region.trim().is_empty() {
            return Err("storage.region must not be empty".into());
        }
        if self.storage.url_expiry_secs == 0 || self.storage.url_expiry_secs > MAX_URL_EXPIRY_SECS {
            return Err(format!(
                "storage.url_expiry_secs must be between 1 and {MAX_URL_EXPIRY_SECS}, got {}",
                self.storage.url_expiry_secs
            ));
        }
        if let Some(endpoint) = &self.storage.endpoint {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(format!(
                    "storage.endpoint must start with http:// or https://, got '{endpoint}'"
                ));
            }
        }
        match (&self.storage.access_key_id, &self.storage.secret_access_key) {
            (Some(_), None) => {
                return Err("storage.access_key_id is set but secret_access_key is missing".into())
            }
            (None, Some(_)) => {
                return Err("storage.secret_access_key is set but access_key_id is missing".into())
            }
            _ => {}
        }
        if matches!(&self.crypto.secret_key, Some(s) if s.trim().is_empty()) {
            return Err("crypto.secret_key must not be blank".into());
        }
        Ok(())
    }

    /// Configured cipher secret, if any.
    pub fn secret_key(&self) -> Option<&str> {
        self.crypto.secret_key.as_deref()
    }
}

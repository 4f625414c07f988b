//! S3 presigned GET URLs (AWS Signature Version 4, query-string form).
//!
//! Works against AWS and S3-compatible stores (MinIO, Ceph) through a custom
//! endpoint. Virtual-hosted addressing is the default; `path_style` puts the
//! bucket in the path instead.

use std::time::Duration;

use bookcheck_config::StorageSettings;
use bookcheck_recon::{SignError, UrlSigner};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use url::Url;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";
const SERVICE: &str = "s3";

pub struct S3Presigner {
    bucket: String,
    region: String,
    endpoint: Option<Url>,
    path_style: bool,
    access_key_id: String,
    secret_access_key: String,
    session_token: Option<String>,
}

impl S3Presigner {
    pub fn from_settings(storage: &StorageSettings) -> Result<Self, SignError> {
        let bucket = storage.bucket.clone().ok_or(SignError::MissingBucket)?;
        let (Some(access_key_id), Some(secret_access_key)) =
            (&storage.access_key_id, &storage.secret_access_key)
        else {
            return Err(SignError::MissingCredentials);
        };

        let endpoint = storage
            .endpoint
            .as_deref()
            .map(|e| Url::parse(e).map_err(|err| SignError::InvalidEndpoint(format!("{e}: {err}"))))
            .transpose()?;
        if let Some(url) = &endpoint {
            if url.host_str().is_none() {
                return Err(SignError::InvalidEndpoint(url.to_string()));
            }
        }

        Ok(Self {
            bucket,
            region: storage.region.clone(),
            endpoint,
            path_style: storage.path_style,
            access_key_id: access_key_id.clone(),
            secret_access_key: secret_access_key.clone(),
            session_token: storage.session_token.clone(),
        })
    }

    /// Scheme, host (with port) and canonical path for `key`.
    fn location(&self, key: &str) -> (String, String, String) {
        let key_path = encode_path(key.trim_start_matches('/'));

        let (scheme, base_host) = match &self.endpoint {
            Some(url) => {
                let host = url.host_str().unwrap_or_default();
                let host = match url.port() {
                    Some(port) => format!("{host}:{port}"),
                    None => host.to_string(),
                };
                (url.scheme().to_string(), host)
            }
            None if self.region == "us-east-1" => ("https".to_string(), "s3.amazonaws.com".to_string()),
            None => ("https".to_string(), format!("s3.{}.amazonaws.com", self.region)),
        };

        if self.path_style {
            let path = format!("/{}/{}", encode_segment(&self.bucket), key_path);
            (scheme, base_host, path)
        } else {
            let host = format!("{}.{}", self.bucket, base_host);
            (scheme, host, format!("/{key_path}"))
        }
    }

    pub fn presign_at(
        &self,
        key: &str,
        expires_in: Duration,
        now: DateTime<Utc>,
    ) -> Result<String, SignError> {
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date = now.format("%Y%m%d").to_string();
        let scope = format!("{date}/{}/{SERVICE}/aws4_request", self.region);
        let (scheme, host, path) = self.location(key);

        let mut params: Vec<(&str, String)> = vec![
            ("X-Amz-Algorithm", ALGORITHM.to_string()),
            ("X-Amz-Credential", format!("{}/{scope}", self.access_key_id)),
            ("X-Amz-Date", amz_date.clone()),
            ("X-Amz-Expires", expires_in.as_secs().to_string()),
            ("X-Amz-SignedHeaders", "host".to_string()),
        ];
        if let Some(token) = &self.session_token {
            params.push(("X-Amz-Security-Token", token.clone()));
        }
        params.sort_by(|a, b| a.0.cmp(b.0));

        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", encode_segment(k), encode_segment(v)))
            .collect::<Vec<_>>()
            .join("&");

        let canonical_request =
            format!("GET\n{path}\n{query}\nhost:{host}\n\nhost\nUNSIGNED-PAYLOAD");
        let string_to_sign = format!(
            "{ALGORITHM}\n{amz_date}\n{scope}\n{}",
            hex::encode(Sha256::digest(canonical_request.as_bytes()))
        );

        let signing_key = [self.region.as_str(), SERVICE, "aws4_request"].iter().fold(
            hmac_sha256(format!("AWS4{}", self.secret_access_key).as_bytes(), &date),
            |key, part| hmac_sha256(&key, part),
        );
        let signature = hex::encode(hmac_sha256(&signing_key, &string_to_sign));

        log::debug!("presigned {scheme}://{host}{path} for {}s", expires_in.as_secs());
        Ok(format!(
            "{scheme}://{host}{path}?{query}&X-Amz-Signature={signature}"
        ))
    }
}

impl UrlSigner for S3Presigner {
    fn presign_get(&self, key: &str, expires_in: Duration) -> Result<String, SignError> {
        self.presign_at(key, expires_in, Utc::now())
    }
}

fn hmac_sha256(key: &[u8], data: &str) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(data.as_bytes());
    mac.finalize().into_bytes().to_vec()
}

/// RFC 3986 percent-encoding of everything outside the unreserved set.
fn encode_segment(s: &str) -> String {
    let mut encoded = String::with_capacity(s.len() * 2);
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                encoded.push(byte as char);
            }
            _ => {
                encoded.push_str(&format!("%{:02X}", byte));
            }
        }
    }
    encoded
}

/// Object keys keep their `/` separators.
fn encode_path(key: &str) -> String {
    key.split('/').map(encode_segment).collect::<Vec<_>>().join("/")
}

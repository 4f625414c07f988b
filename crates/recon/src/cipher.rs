//! Symmetric cipher for encrypted dump fields.
//!
//! Tokens use the Fernet layout:
//!
//! ```text
//! 0x80 | timestamp (u64 BE) | IV (16) | AES-128-CBC ciphertext | HMAC-SHA256 (32)
//! ```
//!
//! encoded as URL-safe base64. The 32-byte key splits into a signing half and
//! an encryption half. A `FieldCipher` is built once from the configured
//! secret and only ever borrowed afterwards.

use aes::Aes128;
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::error::DecryptionError;

type HmacSha256 = Hmac<Sha256>;
type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;

const VERSION: u8 = 0x80;
const HEADER_LEN: usize = 1 + 8 + 16;
const MAC_LEN: usize = 32;
const BLOCK_LEN: usize = 16;

#[derive(Clone)]
pub struct FieldCipher {
    signing_key: [u8; 16],
    encryption_key: [u8; 16],
}

impl std::fmt::Debug for FieldCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldCipher").finish_non_exhaustive()
    }
}

impl FieldCipher {
    /// Build from a configured secret.
    ///
    /// A URL-safe base64 string decoding to exactly 32 bytes is used as the
    /// key directly. Any other secret is hashed with SHA-256 to get the key.
    pub fn from_secret(secret: &str) -> Self {
        let secret = secret.trim();
        let key = URL_SAFE
            .decode(secret)
            .ok()
            .and_then(|bytes| <[u8; 32]>::try_from(bytes).ok())
            .unwrap_or_else(|| {
                let mut key = [0u8; 32];
                key.copy_from_slice(&Sha256::digest(secret.as_bytes()));
                key
            });
        Self::from_key(key)
    }

    pub fn from_key(key: [u8; 32]) -> Self {
        let mut signing_key = [0u8; 16];
        let mut encryption_key = [0u8; 16];
        signing_key.copy_from_slice(&key[..16]);
        encryption_key.copy_from_slice(&key[16..]);
        Self {
            signing_key,
            encryption_key,
        }
    }

    /// A fresh random key in the encoded form [`from_secret`](Self::from_secret) accepts.
    pub fn generate_key() -> String {
        let key: [u8; 32] = rand::random();
        URL_SAFE.encode(key)
    }

    pub fn encrypt(&self, plaintext: &str) -> String {
        let iv: [u8; 16] = rand::random();
        let timestamp = chrono::Utc::now().timestamp().max(0) as u64;
        self.encrypt_with(plaintext.as_bytes(), timestamp, iv)
    }

    fn encrypt_with(&self, plaintext: &[u8], timestamp: u64, iv: [u8; 16]) -> String {
        let ciphertext = Aes128CbcEnc::new(&self.encryption_key.into(), &iv.into())
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext);

        let mut token = Vec::with_capacity(HEADER_LEN + ciphertext.len() + MAC_LEN);
        token.push(VERSION);
        token.extend_from_slice(&timestamp.to_be_bytes());
        token.extend_from_slice(&iv);
        token.extend_from_slice(&ciphertext);

        let tag = self.mac(&token).finalize().into_bytes();
        token.extend_from_slice(&tag);
        URL_SAFE.encode(token)
    }

    pub fn decrypt(&self, token: &str) -> Result<String, DecryptionError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(DecryptionError::Empty);
        }

        let data = URL_SAFE
            .decode(token)
            .map_err(|e| DecryptionError::Encoding(e.to_string()))?;
        if data.len() < HEADER_LEN + BLOCK_LEN + MAC_LEN {
            return Err(DecryptionError::Truncated(data.len()));
        }
        if data[0] != VERSION {
            return Err(DecryptionError::UnsupportedVersion(data[0]));
        }

        let (signed, tag) = data.split_at(data.len() - MAC_LEN);
        self.mac(signed)
            .verify_slice(tag)
            .map_err(|_| DecryptionError::Signature)?;

        let iv = &signed[9..HEADER_LEN];
        let ciphertext = &signed[HEADER_LEN..];
        if ciphertext.len() % BLOCK_LEN != 0 {
            return Err(DecryptionError::Padding);
        }

        let plaintext = Aes128CbcDec::new_from_slices(&self.encryption_key, iv)
            .map_err(|_| DecryptionError::Truncated(data.len()))?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| DecryptionError::Padding)?;

        String::from_utf8(plaintext).map_err(|_| DecryptionError::NotUtf8)
    }

    fn mac(&self, data: &[u8]) -> HmacSha256 {
        let mut mac = HmacSha256::new_from_slice(&self.signing_key)
            .expect("HMAC accepts keys of any length");
        mac.update(data);
        mac
    }
}

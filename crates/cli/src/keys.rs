//! `bookcheck encrypt`, `decrypt` and `keygen`: direct access to the field cipher.

use std::path::PathBuf;

use bookcheck_recon::FieldCipher;

use crate::exit_codes::EXIT_DECRYPT;
use crate::{load_cipher, load_settings, CliError};

pub fn cmd_encrypt(text: String, config: Option<PathBuf>) -> Result<(), CliError> {
    let settings = load_settings(config.as_deref())?;
    let cipher = load_cipher(&settings)?;
    println!("{}", cipher.encrypt(&text));
    Ok(())
}

pub fn cmd_decrypt(token: String, config: Option<PathBuf>) -> Result<(), CliError> {
    let settings = load_settings(config.as_deref())?;
    let cipher = load_cipher(&settings)?;

    match cipher.decrypt(&token) {
        Ok(plaintext) => {
            println!("{plaintext}");
            Ok(())
        }
        Err(e) => Err(CliError {
            code: EXIT_DECRYPT,
            message: format!("decryption failed: {e}"),
            hint: Some(format!(
                "secret taken from {}; check it matches the one the value was stored with",
                settings.crypto.source.as_str()
            )),
        }),
    }
}

pub fn cmd_keygen() -> Result<(), CliError> {
    println!("{}", FieldCipher::generate_key());
    Ok(())
}

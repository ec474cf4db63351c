//! Key files shared by several commands.
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use bop_crypto::{AesKey, SigningKey};

/// Read a hex-encoded AES-128 or AES-256 key; surrounding whitespace is
/// ignored.
pub fn load_aes_key(path: &Path) -> Result<AesKey> {
    let text = fs::read_to_string(path).with_context(|| format!("cannot read AES key {}", path.display()))?;
    AesKey::from_hex(&text).with_context(|| format!("invalid AES key in {}", path.display()))
}

pub fn load_signing_key(path: &Path) -> Result<SigningKey> {
    let pem = fs::read_to_string(path).with_context(|| format!("cannot read signing key {}", path.display()))?;
    SigningKey::from_pkcs8_pem(&pem).with_context(|| format!("invalid signing key in {}", path.display()))
}

pub fn load_optional_aes_key(path: Option<&Path>) -> Result<Option<AesKey>> {
    path.map(load_aes_key).transpose()
}

/// Implementation of `bop keygen`.
use std::fs;

use anyhow::{Context, Result};
use bop_crypto::{CryptoProvider, RustCryptoProvider, SigningKey};
use bop_types::AuthenticationKind;
use zeroize::Zeroizing;

use crate::{KeyKind, KeygenArgs};

/// Run the `bop keygen` command.
///
/// # Errors
///
/// Returns an error if key generation or the write fails.
pub fn run(args: &KeygenArgs) -> Result<()> {
    let text = match args.kind {
        KeyKind::Aes128 => aes_hex(16),
        KeyKind::Aes256 => aes_hex(32),
        KeyKind::Ecdsa256 => signing_pem(AuthenticationKind::Ecdsa256)?,
        KeyKind::Ecdsa384 => signing_pem(AuthenticationKind::Ecdsa384)?,
    };
    fs::write(&args.output, text.as_bytes())
        .with_context(|| format!("cannot write {}", args.output.display()))?;
    println!("Wrote key to {}", args.output.display());
    Ok(())
}

fn aes_hex(len: usize) -> Zeroizing<String> {
    let mut key = Zeroizing::new(vec![0u8; len]);
    RustCryptoProvider.random_bytes(&mut key);
    let mut text = Zeroizing::new(hex::encode(key.as_slice()));
    text.push('\n');
    text
}

fn signing_pem(scheme: AuthenticationKind) -> Result<Zeroizing<String>> {
    let key = SigningKey::generate(scheme)?;
    Ok(key.to_pkcs8_pem()?)
}

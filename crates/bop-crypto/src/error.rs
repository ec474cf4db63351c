use bop_types::AuthenticationKind;

/// Errors from key handling and the crypto provider.
///
/// ```text
/// ┌────────────────────────────────────────────────────────┐
/// │ CryptoError (this crate)                               │
/// │   ├── InvalidKeyLength for AES keys not 16/32 bytes    │
/// │   ├── UnsupportedScheme for schemes without a provider │
/// │   ├── InvalidPublicKey / InvalidSignatureEncoding      │
/// │   ├── Pem for PKCS#8 parse and write failures          │
/// │   └── Hex(FromHexError) for hex key files              │
/// └────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("AES key must be 16 or 32 bytes, got {actual}")]
    InvalidKeyLength { actual: usize },

    #[error("{scheme} signatures are not supported by this provider")]
    UnsupportedScheme { scheme: AuthenticationKind },

    #[error("invalid {scheme} public key")]
    InvalidPublicKey { scheme: AuthenticationKind },

    #[error("{scheme} signature must be {expected} bytes, got {actual}")]
    InvalidSignatureEncoding {
        scheme: AuthenticationKind,
        expected: usize,
        actual: usize,
    },

    #[error("PKCS#8 key error: {0}")]
    Pem(String),

    #[error(transparent)]
    Hex(#[from] hex::FromHexError),
}

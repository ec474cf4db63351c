use bop_types::{AuthenticationKind, EncryptionKind};
use p256::pkcs8::{DecodePrivateKey, EncodePrivateKey, LineEnding};
use zeroize::Zeroizing;

use crate::error::CryptoError;

/// AES key for payload and challenge encryption. Wiped on drop.
#[derive(Clone)]
pub struct AesKey(Zeroizing<Vec<u8>>);

impl std::fmt::Debug for AesKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AesKey({} bytes)", self.0.len())
    }
}

impl AesKey {
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKeyLength`] unless `bytes` is 16 or 32
    /// bytes long.
    pub fn new(bytes: &[u8]) -> Result<Self, CryptoError> {
        if EncryptionKind::for_key_len(bytes.len()).is_none() {
            return Err(CryptoError::InvalidKeyLength {
                actual: bytes.len(),
            });
        }
        Ok(Self(Zeroizing::new(bytes.to_vec())))
    }

    /// Parse a hex string, ignoring surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Fails on invalid hex or a bad key length.
    pub fn from_hex(text: &str) -> Result<Self, CryptoError> {
        let bytes = Zeroizing::new(hex::decode(text.trim())?);
        Self::new(&bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The header selector for this key.
    pub fn encryption_kind(&self) -> EncryptionKind {
        EncryptionKind::for_key_len(self.len()).unwrap_or(EncryptionKind::None)
    }
}

/// Private key for header signing.
///
/// The wrapped RustCrypto keys zeroize themselves on drop.
#[derive(Clone)]
pub enum SigningKey {
    Ecdsa256(p256::ecdsa::SigningKey),
    Ecdsa384(p384::ecdsa::SigningKey),
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SigningKey({})", self.scheme())
    }
}

impl SigningKey {
    /// Generate a fresh key.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::UnsupportedScheme`] for schemes other than
    /// ECDSA P-256 and P-384.
    pub fn generate(scheme: AuthenticationKind) -> Result<Self, CryptoError> {
        let mut rng = rand::rngs::OsRng;
        match scheme {
            AuthenticationKind::Ecdsa256 => Ok(Self::Ecdsa256(p256::ecdsa::SigningKey::random(&mut rng))),
            AuthenticationKind::Ecdsa384 => Ok(Self::Ecdsa384(p384::ecdsa::SigningKey::random(&mut rng))),
            other => Err(CryptoError::UnsupportedScheme { scheme: other }),
        }
    }

    /// Load a PKCS#8 PEM private key, trying P-256 then P-384.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Pem`] if the document holds neither curve.
    pub fn from_pkcs8_pem(pem: &str) -> Result<Self, CryptoError> {
        if let Ok(key) = p256::ecdsa::SigningKey::from_pkcs8_pem(pem) {
            return Ok(Self::Ecdsa256(key));
        }
        p384::ecdsa::SigningKey::from_pkcs8_pem(pem)
            .map(Self::Ecdsa384)
            .map_err(|e| CryptoError::Pem(e.to_string()))
    }

    /// Serialise as PKCS#8 PEM.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Pem`] if encoding fails.
    pub fn to_pkcs8_pem(&self) -> Result<Zeroizing<String>, CryptoError> {
        let pem = match self {
            Self::Ecdsa256(key) => key.to_pkcs8_pem(LineEnding::LF),
            Self::Ecdsa384(key) => key.to_pkcs8_pem(LineEnding::LF),
        };
        pem.map_err(|e| CryptoError::Pem(e.to_string()))
    }

    pub fn scheme(&self) -> AuthenticationKind {
        match self {
            Self::Ecdsa256(_) => AuthenticationKind::Ecdsa256,
            Self::Ecdsa384(_) => AuthenticationKind::Ecdsa384,
        }
    }

    /// Uncompressed public point without the SEC1 tag: `x ‖ y`.
    pub fn public_key_bytes(&self) -> Vec<u8> {
        match self {
            Self::Ecdsa256(key) => key.verifying_key().to_encoded_point(false).as_bytes()[1..].to_vec(),
            Self::Ecdsa384(key) => key.verifying_key().to_encoded_point(false).as_bytes()[1..].to_vec(),
        }
    }
}

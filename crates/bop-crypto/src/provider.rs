use aes::{Aes128, Aes256};
use bop_types::{AuthenticationKind, IntegrityKind};
use ctr::cipher::{KeyIvInit, StreamCipher};
use p256::ecdsa::signature::{Signer, Verifier};
use rand::RngCore;
use sha2::{Digest, Sha256, Sha384, Sha512};

use crate::error::CryptoError;
use crate::keys::{AesKey, SigningKey};

type Aes128Ctr = ctr::Ctr128BE<Aes128>;
type Aes256Ctr = ctr::Ctr128BE<Aes256>;

/// The cryptographic operations the BOP format needs.
///
/// Held as `Arc<dyn CryptoProvider>` by the builder and analyzer. IV
/// bookkeeping stays with the caller: [`ctr`](Self::ctr) applies the
/// keystream starting at exactly the counter block it is given.
pub trait CryptoProvider: Send + Sync {
    /// Digest of `data` with the selected algorithm.
    fn hash(&self, kind: IntegrityKind, data: &[u8]) -> Vec<u8>;

    /// AES-CTR in place. Encryption and decryption are the same call.
    fn ctr(&self, key: &AesKey, iv: &[u8; 16], data: &mut [u8]) -> Result<(), CryptoError>;

    /// Raw fixed-width signature over `message`.
    fn sign(&self, key: &SigningKey, message: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Check `signature` over `message` against a raw public key.
    ///
    /// `Ok(false)` means a well-formed signature that does not verify.
    fn verify(
        &self,
        scheme: AuthenticationKind,
        public_key: &[u8],
        message: &[u8],
        signature: &[u8],
    ) -> Result<bool, CryptoError>;

    fn random_bytes(&self, out: &mut [u8]);
}

/// [`CryptoProvider`] on SHA-2, AES-CTR and ECDSA P-256/P-384.
///
/// RSA, Brainpool and SM2 are reported as
/// [`CryptoError::UnsupportedScheme`].
#[derive(Clone, Copy, Debug, Default)]
pub struct RustCryptoProvider;

impl CryptoProvider for RustCryptoProvider {
    fn hash(&self, kind: IntegrityKind, data: &[u8]) -> Vec<u8> {
        match kind {
            IntegrityKind::Sha256 => Sha256::digest(data).to_vec(),
            IntegrityKind::Sha384 => Sha384::digest(data).to_vec(),
            IntegrityKind::Sha512 => Sha512::digest(data).to_vec(),
        }
    }

    fn ctr(&self, key: &AesKey, iv: &[u8; 16], data: &mut [u8]) -> Result<(), CryptoError> {
        let invalid = |_| CryptoError::InvalidKeyLength { actual: key.len() };
        match key.len() {
            16 => Aes128Ctr::new_from_slices(key.as_bytes(), iv)
                .map_err(invalid)?
                .apply_keystream(data),
            32 => Aes256Ctr::new_from_slices(key.as_bytes(), iv)
                .map_err(invalid)?
                .apply_keystream(data),
            actual => return Err(CryptoError::InvalidKeyLength { actual }),
        }
        Ok(())
    }

    fn sign(&self, key: &SigningKey, message: &[u8]) -> Result<Vec<u8>, CryptoError> {
        Ok(match key {
            SigningKey::Ecdsa256(key) => {
                let signature: p256::ecdsa::Signature = key.sign(message);
                signature.to_bytes().to_vec()
            }
            SigningKey::Ecdsa384(key) => {
                let signature: p384::ecdsa::Signature = key.sign(message);
                signature.to_bytes().to_vec()
            }
        })
    }

    fn verify(
        &self,
        scheme: AuthenticationKind,
        public_key: &[u8],
        message: &[u8],
        signature: &[u8],
    ) -> Result<bool, CryptoError> {
        let (Some(key_len), Some(sig_len)) = (scheme.public_key_len(), scheme.signature_len()) else {
            return Err(CryptoError::UnsupportedScheme { scheme });
        };
        if signature.len() != sig_len {
            return Err(CryptoError::InvalidSignatureEncoding {
                scheme,
                expected: sig_len,
                actual: signature.len(),
            });
        }
        if public_key.len() != key_len {
            return Err(CryptoError::InvalidPublicKey { scheme });
        }
        let mut sec1 = Vec::with_capacity(key_len + 1);
        sec1.push(0x04);
        sec1.extend_from_slice(public_key);

        match scheme {
            AuthenticationKind::Ecdsa256 => {
                let key = p256::ecdsa::VerifyingKey::from_sec1_bytes(&sec1)
                    .map_err(|_| CryptoError::InvalidPublicKey { scheme })?;
                let Ok(signature) = p256::ecdsa::Signature::from_slice(signature) else {
                    return Ok(false);
                };
                Ok(key.verify(message, &signature).is_ok())
            }
            AuthenticationKind::Ecdsa384 => {
                let key = p384::ecdsa::VerifyingKey::from_sec1_bytes(&sec1)
                    .map_err(|_| CryptoError::InvalidPublicKey { scheme })?;
                let Ok(signature) = p384::ecdsa::Signature::from_slice(signature) else {
                    return Ok(false);
                };
                Ok(key.verify(message, &signature).is_ok())
            }
            other => Err(CryptoError::UnsupportedScheme { scheme: other }),
        }
    }

    fn random_bytes(&self, out: &mut [u8]) {
        rand::rngs::OsRng.fill_bytes(out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iv::advance_counter;

    fn unhex(s: &str) -> Vec<u8> {
        hex::decode(s).unwrap()
    }

    #[test]
    fn sha256_abc() {
        let digest = RustCryptoProvider.hash(IntegrityKind::Sha256, b"abc");
        assert_eq!(
            hex::encode(digest),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn digest_lengths_follow_selector() {
        for &kind in IntegrityKind::ALL {
            assert_eq!(RustCryptoProvider.hash(kind, b"").len(), kind.digest_len());
        }
    }

    #[test]
    fn aes128_ctr_known_answer() {
        // NIST SP 800-38A, F.5.1.
        let key = AesKey::new(&unhex("2b7e151628aed2a6abf7158809cf4f3c")).unwrap();
        let mut iv = [0u8; 16];
        iv.copy_from_slice(&unhex("f0f1f2f3f4f5f6f7f8f9fafbfcfdfeff"));
        let mut data = unhex("6bc1bee22e409f96e93d7e117393172aae2d8a571e03ac9c9eb76fac45af8e51");
        RustCryptoProvider.ctr(&key, &iv, &mut data).unwrap();
        assert_eq!(
            hex::encode(&data),
            "874d6191b620e3261bef6864990db6ce9806f66b7970fdff8617187bb9fffdff"
        );

        // Decrypting the second block alone needs the advanced counter.
        let mut second = data[16..].to_vec();
        RustCryptoProvider
            .ctr(&key, &advance_counter(&iv, 1), &mut second)
            .unwrap();
        assert_eq!(hex::encode(second), "ae2d8a571e03ac9c9eb76fac45af8e51");
    }

    #[test]
    fn aes256_ctr_is_an_involution() {
        let key = AesKey::new(&[0x11; 32]).unwrap();
        let iv = [0x22; 16];
        let original = b"sixty-four bytes of challenge data, more or less, for the test!!".to_vec();
        let mut data = original.clone();
        RustCryptoProvider.ctr(&key, &iv, &mut data).unwrap();
        assert_ne!(data, original);
        RustCryptoProvider.ctr(&key, &iv, &mut data).unwrap();
        assert_eq!(data, original);
    }

    #[test]
    fn sign_then_verify() {
        for scheme in [AuthenticationKind::Ecdsa256, AuthenticationKind::Ecdsa384] {
            let key = SigningKey::generate(scheme).unwrap();
            let public = key.public_key_bytes();
            let signature = RustCryptoProvider.sign(&key, b"header bytes").unwrap();
            assert_eq!(Some(signature.len()), scheme.signature_len());
            assert!(RustCryptoProvider.verify(scheme, &public, b"header bytes", &signature).unwrap());
            assert!(!RustCryptoProvider.verify(scheme, &public, b"header bytez", &signature).unwrap());
        }
    }

    #[test]
    fn reject_unsupported_and_malformed() {
        let result = RustCryptoProvider.verify(AuthenticationKind::Rsa2048, &[0; 260], b"m", &[0; 256]);
        assert!(matches!(result, Err(CryptoError::UnsupportedScheme { .. })));

        let result = RustCryptoProvider.verify(AuthenticationKind::Ecdsa256, &[0; 64], b"m", &[0; 10]);
        assert!(matches!(result, Err(CryptoError::InvalidSignatureEncoding { expected: 64, .. })));

        let result = RustCryptoProvider.verify(AuthenticationKind::Ecdsa256, &[0; 64], b"m", &[1; 64]);
        assert!(matches!(result, Err(CryptoError::InvalidPublicKey { .. })));
    }

    #[test]
    fn random_bytes_fill() {
        let mut a = [0u8; 60];
        let mut b = [0u8; 60];
        RustCryptoProvider.random_bytes(&mut a);
        RustCryptoProvider.random_bytes(&mut b);
        assert_ne!(a, b);
    }
}

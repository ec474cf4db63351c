#![warn(clippy::pedantic)]

//! Cryptographic capability used by the BOP builder and analyzer.
//!
//! The core crates only talk to [`CryptoProvider`]. [`RustCryptoProvider`]
//! is the default implementation on top of the RustCrypto crates.

pub mod error;
pub mod iv;
pub mod keys;
pub mod provider;

pub use error::CryptoError;
pub use iv::{advance_counter, increment_iv};
pub use keys::{AesKey, SigningKey};
pub use provider::{CryptoProvider, RustCryptoProvider};

/// AES block size; CTR counters advance once per block.
pub const AES_BLOCK_LEN: usize = 16;

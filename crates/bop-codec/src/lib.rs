#![warn(clippy::pedantic)]

//! The `CFG_CMP` byte-run codec.
//!
//! ```text
//! ┌──────────────┬──────────┬──────────────────┬───────────────────┬────────┐
//! │ "CFG_CMP"    │ version  │ original size    │ token size        │ tokens │
//! │ 7 bytes      │ 1 byte=0 │ varint           │ varint            │ ...    │
//! └──────────────┴──────────┴──────────────────┴───────────────────┴────────┘
//! ```
//!
//! [`compress`] and [`decompress`] work on whole buffers.
//! [`ResumableDecompressor`] decodes the same format from arbitrarily
//! sized input and output chunks, and [`StreamingDecompressor`] drives it
//! from an async reader.

pub mod compress;
pub mod decompress;
pub mod engine;
pub mod error;
pub mod pattern;
pub mod stream;
pub mod token;

pub use compress::{compress, compress_with};
pub use decompress::{StreamHeader, decompress};
pub use engine::{Progress, ResumableDecompressor, Status};
pub use error::CodecError;
pub use pattern::{Flag, Pattern};
pub use stream::StreamingDecompressor;
pub use token::Token;

/// Magic plus version byte that opens every compressed stream.
pub const MAGIC: [u8; 8] = *b"CFG_CMP\0";

/// The only stream version understood.
pub const VERSION: u8 = 0;

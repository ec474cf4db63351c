#![warn(clippy::pedantic)]

pub mod block;
pub mod checksum;
pub mod error;
pub mod layout;
pub mod obscure;
pub mod varint;

pub use block::{BLOCK_SIZE, Block, BlockKind};
pub use error::WireError;

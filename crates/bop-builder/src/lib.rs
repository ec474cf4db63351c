#![warn(clippy::pedantic)]

//! Assembles BOP images from [`Action`](bop_types::Action)s.
//!
//! [`PackageBuilder`] owns every block of a package until the final bytes
//! are emitted. The hash-chain placement rule and the end-size patch are
//! public so the analyzer can replay them.

pub mod action_writer;
pub mod builder;
pub mod config;
pub mod error;
pub mod hash_chain;
pub mod multi;

pub use builder::PackageBuilder;
pub use config::BopConfig;
pub use error::BuildError;
pub use hash_chain::needs_hash_block;
pub use multi::{patch_end_size, patch_end_sizes};

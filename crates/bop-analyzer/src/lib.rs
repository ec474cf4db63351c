#![warn(clippy::pedantic)]

//! Reads `.cfgbit` streams back and checks everything the builder wrote.
//!
//! [`PackageAnalyzer::parse`] splits a stream into BOPs. The full
//! [`PackageAnalyzer::analyze`] pass replays the hash chain, checks the
//! signature and challenge, then decrypts and decompresses each payload.
//! Results land in a [`PackageReport`].

mod action_reader;
pub mod analyzer;
pub mod error;
mod integrity;
pub mod options;
mod payload;
pub mod report;

pub use analyzer::PackageAnalyzer;
pub use error::AnalyzeError;
pub use options::AnalyzerOptions;
pub use report::{BopReport, DecodedAction, Finding, HeaderSummary, PackageReport, StatusFlags};

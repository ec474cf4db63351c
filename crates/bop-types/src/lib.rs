#![warn(clippy::pedantic)]

pub mod action;
pub mod class;
pub mod diagnostics;
pub mod enums;
pub mod error;
pub mod fields;
pub mod identifier;

pub use action::{Action, ActionFlags, CommandId, FieldValue};
pub use class::ErrorClass;
pub use diagnostics::{Diagnostics, MemoryDiagnostics, NullDiagnostics, Severity, TracingDiagnostics};
pub use enums::{
  AuthenticationKind, ChecksumKind, CompressionKind, EncryptionKind, IntegrityKind,
};
pub use error::TypeError;
pub use fields::{FieldKind, FieldReading, HEADER_FIELDS, HeaderField, HeaderVisitor, visit_header};
pub use identifier::BopIdentifier;

//! Readers for the tagged Qucs text formats.
//!
//! Both document kinds share the same layout: a `<Qucs KIND MAJOR.MINOR.PATCH>`
//! header line followed by `<Name>` ... `</Name>` sections whose bodies are
//! `<...>` lines.

pub mod document;
pub mod fields;
pub mod library;
pub mod schematic;
pub mod section;
pub mod version;

mod error;

pub use document::{Document, DocumentKind, Header};
pub use error::{FormatError, LineError};
pub use library::{Library, LibraryComponent, LibrarySection};
pub use schematic::{ComponentRecord, PortRecord, PropertyValue, Schematic, WireRecord};
pub use section::{Section, TagLine};
pub use version::{VersionError, VersionTriplet, FORMAT_VERSION};

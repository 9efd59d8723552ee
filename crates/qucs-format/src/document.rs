//! Document header check and line access shared by schematic and library files.

use std::fmt;

use crate::section::{self, Section};
use crate::version::VersionTriplet;
use crate::FormatError;

/// The two kinds of tagged documents this crate understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    Schematic,
    Library,
}

impl DocumentKind {
    /// Literal every header line of this kind starts with.
    pub fn header_prefix(self) -> &'static str {
        match self {
            DocumentKind::Schematic => "<Qucs Schematic ",
            DocumentKind::Library => "<Qucs Library ",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentKind::Schematic => write!(f, "schematic"),
            DocumentKind::Library => write!(f, "library"),
        }
    }
}

/// Parsed header line of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub kind: DocumentKind,
    pub version: VersionTriplet,
    /// Text after the version, e.g. a library's quoted display name.
    pub trailer: Option<String>,
    /// Zero-based index of the header line.
    pub line: usize,
}

impl Header {
    /// Check the first non-blank line of `lines` against `kind` and `running`.
    ///
    /// A wrong prefix is [`FormatError::FormatMismatch`]; a well-formed header
    /// that declares a version newer than `running` is
    /// [`FormatError::VersionTooNew`].
    pub fn parse(
        lines: &[&str],
        kind: DocumentKind,
        running: &VersionTriplet,
    ) -> Result<Self, FormatError> {
        let mismatch = || FormatError::FormatMismatch { expected: kind };

        let (index, line) = lines
            .iter()
            .enumerate()
            .map(|(i, l)| (i, l.trim()))
            .find(|(_, l)| !l.is_empty())
            .ok_or_else(mismatch)?;

        let rest = line
            .strip_prefix(kind.header_prefix())
            .and_then(|rest| rest.strip_suffix('>'))
            .ok_or_else(mismatch)?;

        let rest = rest.trim();
        let (version_text, trailer) = match rest.split_once(char::is_whitespace) {
            Some((version, trailer)) => (version, Some(trailer.trim().to_string())),
            None => (rest, None),
        };

        let version = VersionTriplet::parse(version_text)?;
        if !version.is_readable_by(running) {
            return Err(FormatError::VersionTooNew {
                declared: version,
                running: *running,
            });
        }

        Ok(Header {
            kind,
            version,
            trailer: trailer.filter(|t| !t.is_empty()),
            line: index,
        })
    }
}

/// A whole document held in memory, split into lines, with a verified header.
#[derive(Debug, Clone)]
pub struct Document<'a> {
    header: Header,
    lines: Vec<&'a str>,
}

impl<'a> Document<'a> {
    pub fn parse(
        text: &'a str,
        kind: DocumentKind,
        running: &VersionTriplet,
    ) -> Result<Self, FormatError> {
        log::trace!("Reading {kind} document from {} bytes of input", text.len());
        let lines: Vec<&str> = text.lines().collect();
        let header = Header::parse(&lines, kind, running)?;
        Ok(Document { header, lines })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Lines following the header line.
    pub fn body(&self) -> &[&'a str] {
        &self.lines[self.header.line + 1..]
    }

    /// Line number (zero-based) of the first body line.
    pub fn body_offset(&self) -> usize {
        self.header.line + 1
    }

    /// Find the first `<name>` ... `</name>` section of the body.
    pub fn section(&self, name: &str) -> Result<Section, FormatError> {
        self.optional_section(name)?
            .ok_or_else(|| FormatError::SectionNotFound {
                name: name.to_string(),
            })
    }

    pub fn optional_section(&self, name: &str) -> Result<Option<Section>, FormatError> {
        section::find_section(self.body(), self.body_offset(), name)
    }
}

//! `<Name>` ... `</Name>` sections and the `<...>` lines inside them.

use crate::error::LineError;
use crate::FormatError;

/// A named, delimited fragment of a document.
///
/// Lines are kept verbatim (untrimmed); `start_line` is the zero-based line
/// number of the first body line in the originating document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    name: String,
    lines: Vec<String>,
    start_line: usize,
}

/// The interior of one `<...>` line, with its position in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagLine {
    /// Zero-based line number in the originating document.
    pub line: usize,
    /// Text between the outer `<` and `>`.
    pub content: String,
}

impl Section {
    pub fn new(name: impl Into<String>, lines: Vec<String>, start_line: usize) -> Self {
        Self {
            name: name.into(),
            lines,
            start_line,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn start_line(&self) -> usize {
        self.start_line
    }

    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(|l| l.trim().is_empty())
    }

    /// Section payload as text: lines joined by `\n`, leading blanks of the
    /// first line removed.
    pub fn text(&self) -> String {
        let mut text = self.lines.join("\n");
        let leading = text.len() - text.trim_start_matches(' ').len();
        text.drain(..leading);
        text
    }

    /// Split the section into `<...>` lines.
    ///
    /// Blank lines are skipped. Every other line, once trimmed, must start
    /// with `<` and end with `>`; the first offending line fails the whole
    /// section.
    pub fn tag_lines(&self) -> Result<Vec<TagLine>, FormatError> {
        let mut tags = Vec::with_capacity(self.lines.len());
        for (offset, raw) in self.lines.iter().enumerate() {
            let line = self.start_line + offset;
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                continue;
            }
            tags.push(TagLine {
                line,
                content: unwrap_tag(trimmed)
                    .map_err(|reason| FormatError::malformed_line(line, trimmed, reason))?
                    .to_string(),
            });
        }
        Ok(tags)
    }
}

/// Strip the outer `<` and `>` of a trimmed line.
pub fn unwrap_tag(line: &str) -> Result<&str, LineError> {
    let inner = line.strip_prefix('<').ok_or(LineError::MissingOpen)?;
    inner.strip_suffix('>').ok_or(LineError::MissingClose)
}

/// Find the first `<name>` marker in `lines` and collect everything up to the
/// matching `</name>`.
///
/// Markers are compared after trimming. `offset` is the document line number
/// of `lines[0]`. Returns `Ok(None)` when no opening marker exists and
/// [`FormatError::UnterminatedSection`] when the closing marker is missing.
pub fn find_section(
    lines: &[&str],
    offset: usize,
    name: &str,
) -> Result<Option<Section>, FormatError> {
    let open = format!("<{name}>");
    let Some(start) = lines.iter().position(|l| l.trim() == open) else {
        return Ok(None);
    };
    collect_until_close(lines, start + 1, offset, name).map(Some)
}

/// Collect the body of a section whose opening marker precedes `lines[from]`.
pub(crate) fn collect_until_close(
    lines: &[&str],
    from: usize,
    offset: usize,
    name: &str,
) -> Result<Section, FormatError> {
    let close = format!("</{name}>");
    let len = lines[from..]
        .iter()
        .position(|l| l.trim() == close)
        .ok_or_else(|| FormatError::UnterminatedSection {
            name: name.to_string(),
        })?;

    let body = lines[from..from + len]
        .iter()
        .map(|l| l.to_string())
        .collect();
    log::trace!("Section <{name}> spans {len} lines from line {}", offset + from);
    Ok(Section::new(name, body, offset + from))
}

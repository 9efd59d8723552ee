//! Qucs component library files.
//!
//! ```text
//! <Qucs Library 0.0.19 "Diodes">
//! <DefaultSymbol>
//!   ...
//! </DefaultSymbol>
//! <Component 1N4148>
//!   <Description>
//!     ...
//!   </Description>
//!   <ModelIncludes "diode.inc" "extra.inc">
//!   <Model>
//!     ...
//!   </Model>
//!   <Symbol>
//!     ...
//!   </Symbol>
//! </Component>
//! ```

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::document::{Document, DocumentKind, Header};
use crate::error::LineError;
use crate::section::{collect_until_close, Section};
use crate::version::VersionTriplet;
use crate::FormatError;

const DEFAULT_SYMBOL: &str = "DefaultSymbol";
const INCLUDES_SUFFIX: &str = "Includes";

static QUOTED: Lazy<Regex> = Lazy::new(|| Regex::new(r#""([^"]*)""#).unwrap());

/// A parsed library file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Library {
    header: Header,
    default_symbol: Option<Section>,
    components: Vec<LibraryComponent>,
}

/// One `<Component NAME>` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryComponent {
    name: String,
    sections: Vec<Section>,
    /// Keyed by section name: `ModelIncludes` is stored under `Model`.
    includes: BTreeMap<String, Vec<String>>,
}

/// A section looked up for one component, with its include references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibrarySection {
    pub component: String,
    pub section: Section,
    pub includes: Vec<String>,
    /// True when the library-wide default symbol stood in for a missing one.
    pub from_default: bool,
}

impl LibrarySection {
    pub fn text(&self) -> String {
        self.section.text()
    }
}

impl Library {
    pub fn parse(text: &str, running: &VersionTriplet) -> Result<Self, FormatError> {
        let doc = Document::parse(text, DocumentKind::Library, running)?;
        let body = doc.body();
        let offset = doc.body_offset();

        let mut default_symbol = None;
        let mut components: Vec<LibraryComponent> = Vec::new();

        let mut i = 0;
        while i < body.len() {
            let line = body[i].trim();
            if line == format!("<{DEFAULT_SYMBOL}>") {
                let section = collect_until_close(body, i + 1, offset, DEFAULT_SYMBOL)?;
                i += section.lines().len() + 2;
                if default_symbol.is_none() {
                    default_symbol = Some(section);
                }
                continue;
            }

            if let Some(name) = component_name(line) {
                let (component, consumed) = parse_component(body, i, offset, name)?;
                i += consumed;
                if components.iter().any(|c| c.name == component.name) {
                    log::warn!(
                        "Duplicate component '{}' at line {}, keeping the first definition",
                        component.name,
                        offset + i
                    );
                } else {
                    components.push(component);
                }
                continue;
            }

            i += 1;
        }

        log::trace!("Parsed library with {} components", components.len());
        Ok(Library {
            header: doc.header().clone(),
            default_symbol,
            components,
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn default_symbol(&self) -> Option<&Section> {
        self.default_symbol.as_ref()
    }

    pub fn components(&self) -> &[LibraryComponent] {
        &self.components
    }

    pub fn component_names(&self) -> Vec<&str> {
        self.components.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn component(&self, name: &str) -> Result<&LibraryComponent, FormatError> {
        self.components
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| FormatError::ComponentNotFound {
                name: name.to_string(),
            })
    }

    /// Look up section `name` of `component`.
    ///
    /// A component without its own `Symbol` section gets the library's
    /// `DefaultSymbol` when there is one.
    pub fn section(&self, component: &str, name: &str) -> Result<LibrarySection, FormatError> {
        let comp = self.component(component)?;
        let includes = comp.includes(name).to_vec();

        if let Some(section) = comp.section(name) {
            return Ok(LibrarySection {
                component: comp.name.clone(),
                section: section.clone(),
                includes,
                from_default: false,
            });
        }

        match (&self.default_symbol, name) {
            (Some(default), "Symbol") => Ok(LibrarySection {
                component: comp.name.clone(),
                section: default.clone(),
                includes,
                from_default: true,
            }),
            _ => Err(FormatError::SectionNotFound {
                name: name.to_string(),
            }),
        }
    }
}

impl LibraryComponent {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name() == name)
    }

    pub fn includes(&self, section: &str) -> &[String] {
        self.includes.get(section).map(Vec::as_slice).unwrap_or(&[])
    }
}

fn component_name(line: &str) -> Option<&str> {
    line.strip_prefix("<Component ")?
        .strip_suffix('>')
        .map(str::trim)
        .filter(|name| !name.is_empty())
}

fn is_component_close(line: &str, name: &str) -> bool {
    line == "</Component>"
        || line
            .strip_prefix("</Component ")
            .and_then(|rest| rest.strip_suffix('>'))
            .is_some_and(|rest| rest.trim() == name)
}

/// Parse a component block starting at `body[start]`; returns the component
/// and the number of lines consumed, closing marker included.
fn parse_component(
    body: &[&str],
    start: usize,
    offset: usize,
    name: &str,
) -> Result<(LibraryComponent, usize), FormatError> {
    let mut component = LibraryComponent {
        name: name.to_string(),
        sections: Vec::new(),
        includes: BTreeMap::new(),
    };

    let mut i = start + 1;
    loop {
        let Some(raw) = body.get(i) else {
            return Err(FormatError::UnterminatedSection {
                name: format!("Component {name}"),
            });
        };
        let line = raw.trim();

        if is_component_close(line, name) {
            return Ok((component, i - start + 1));
        }

        if let Some((section, includes)) = parse_includes(line, offset + i)? {
            component
                .includes
                .entry(section.to_string())
                .or_default()
                .extend(includes);
            i += 1;
            continue;
        }

        if let Some(section_name) = section_open(line) {
            // a section never reaches past the end of its component
            let end = component_end(body, i + 1, name);
            let section = collect_until_close(&body[..end], i + 1, offset, section_name)?;
            i += section.lines().len() + 2;
            component.sections.push(section);
            continue;
        }

        i += 1;
    }
}

/// Index of the first line at or after `from` that closes component `name`
/// or opens another component; `body.len()` when there is none.
fn component_end(body: &[&str], from: usize, name: &str) -> usize {
    body[from..]
        .iter()
        .map(|l| l.trim())
        .position(|l| is_component_close(l, name) || component_name(l).is_some())
        .map_or(body.len(), |p| from + p)
}

/// `<Name>` with a bare identifier and no fields.
fn section_open(line: &str) -> Option<&str> {
    let name = line.strip_prefix('<')?.strip_suffix('>')?;
    (!name.is_empty()
        && !name.starts_with('/')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'))
    .then_some(name)
}

/// `<ModelIncludes "a" "b">` → `("Model", ["a", "b"])`.
fn parse_includes(line: &str, line_no: usize) -> Result<Option<(&str, Vec<String>)>, FormatError> {
    let Some(inner) = line.strip_prefix('<').and_then(|l| l.strip_suffix('>')) else {
        return Ok(None);
    };
    let (tag, payload) = inner.split_once(char::is_whitespace).unwrap_or((inner, ""));
    let Some(section) = tag.strip_suffix(INCLUDES_SUFFIX) else {
        return Ok(None);
    };

    let payload = payload.trim();
    if !payload.starts_with('"') || !payload.ends_with('"') || payload.len() < 2 {
        return Err(FormatError::malformed_line(
            line_no,
            line,
            LineError::Grammar("include list must be a quoted, space separated list".into()),
        ));
    }

    let includes = QUOTED
        .captures_iter(payload)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    Ok(Some((section, includes)))
}

use serde::Serialize;

use crate::geometry::{BoundingBox, Shape};

/// Reference prefix used when a symbol does not declare one.
pub const DEFAULT_PREFIX: &str = "SUB";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Port {
    /// 1-based, as declared by `.PortSym` or assigned by the default symbol.
    pub number: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub x: i32,
    pub y: i32,
    /// Pin direction in degrees, as stored.
    pub angle: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParamDescriptor {
    pub name: String,
    pub value: String,
    pub visible: bool,
    pub description: String,
}

impl ParamDescriptor {
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        visible: bool,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            visible,
            description: description.into(),
        }
    }
}

/// Where the geometry of a symbol came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolOrigin {
    /// Parsed from a `Symbol` section.
    Stored,
    /// Generated from the port count.
    Default,
    /// Fixed rectangle for library components without geometry.
    Placeholder,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Symbol {
    pub type_name: String,
    pub prefix: String,
    pub ports: Vec<Port>,
    pub params: Vec<ParamDescriptor>,
    pub shapes: Vec<Shape>,
    pub bounds: BoundingBox,
    /// Label anchor.
    pub tx: i32,
    pub ty: i32,
    pub origin: SymbolOrigin,
}

impl Symbol {
    pub fn port_count(&self) -> usize {
        self.ports.len()
    }

    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    pub fn port(&self, number: u32) -> Option<&Port> {
        self.ports.iter().find(|p| p.number == number)
    }

    pub fn param(&self, name: &str) -> Option<&ParamDescriptor> {
        self.params.iter().find(|p| p.name == name)
    }
}

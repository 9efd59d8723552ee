//! Placed component instances and their parameter lists.

use std::collections::HashMap;
use std::sync::Arc;

use qucs_format::schematic::{GROUND_TYPE, PORT_TYPE};
use qucs_format::ComponentRecord;
use qucs_symbol::ParamDescriptor;

use crate::error::ResolveError;
use crate::locator::base_name;
use crate::prototype::{CommonParams, Prototype};

pub const FILE_PARAM: &str = "File";
pub const LIB_PARAM: &str = "Lib";
pub const COMP_PARAM: &str = "Comp";
pub const PORT_TYPE_PARAM: &str = "porttype";

/// Record types of primitives with a single pin at their origin.
const SINGLE_PIN_TYPES: &[&str] = &[GROUND_TYPE, PORT_TYPE];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstanceKind {
    /// Built-in device; no prototype.
    Primitive,
    /// `Sub` record backed by a schematic file.
    Subcircuit,
    /// `Lib` record backed by a library component.
    LibComp,
}

/// Maps record type strings to instance kinds.
#[derive(Debug, Clone)]
pub struct KindRegistry {
    kinds: HashMap<String, InstanceKind>,
}

impl Default for KindRegistry {
    fn default() -> Self {
        let mut registry = Self {
            kinds: HashMap::new(),
        };
        registry.register("Sub", InstanceKind::Subcircuit);
        registry.register("Lib", InstanceKind::LibComp);
        registry
    }
}

impl KindRegistry {
    pub fn register(&mut self, record_type: impl Into<String>, kind: InstanceKind) {
        self.kinds.insert(record_type.into(), kind);
    }

    /// Kind for `record_type`; unregistered types are primitives.
    pub fn kind_of(&self, record_type: &str) -> InstanceKind {
        self.kinds
            .get(record_type)
            .copied()
            .unwrap_or(InstanceKind::Primitive)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub value: String,
    pub visible: bool,
}

impl Param {
    pub fn new(name: impl Into<String>, value: impl Into<String>, visible: bool) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            visible,
        }
    }
}

/// Parameters of an instance, in index order: its own declared parameters,
/// the parameters inherited from its symbol, the source parameter, and for
/// ports-configurable subcircuits the port type.
///
/// Primitives have no source parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamList {
    local: Vec<Param>,
    inherited: Vec<Param>,
    source: Option<Param>,
    port_type: Option<Param>,
}

impl ParamList {
    pub fn new(source: Param) -> Self {
        Self {
            local: Vec::new(),
            inherited: Vec::new(),
            source: Some(source),
            port_type: None,
        }
    }

    pub fn without_source() -> Self {
        Self {
            local: Vec::new(),
            inherited: Vec::new(),
            source: None,
            port_type: None,
        }
    }

    pub fn with_local(mut self, local: Vec<Param>) -> Self {
        self.local = local;
        self
    }

    pub fn len(&self) -> usize {
        self.local.len()
            + self.inherited.len()
            + usize::from(self.source.is_some())
            + usize::from(self.port_type.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn local(&self) -> &[Param] {
        &self.local
    }

    pub fn inherited(&self) -> &[Param] {
        &self.inherited
    }

    pub fn source(&self) -> Option<&Param> {
        self.source.as_ref()
    }

    pub fn source_index(&self) -> usize {
        self.local.len() + self.inherited.len()
    }

    pub fn port_type(&self) -> Option<&Param> {
        self.port_type.as_ref()
    }

    pub fn get(&self, index: usize) -> Option<&Param> {
        let local = self.local.len();
        let inherited = self.inherited.len();
        match index {
            i if i < local => self.local.get(i),
            i if i < local + inherited => self.inherited.get(i - local),
            _ => self.tail().nth(index - local - inherited),
        }
    }

    fn tail(&self) -> impl Iterator<Item = &Param> {
        self.source.iter().chain(&self.port_type)
    }

    fn get_mut(&mut self, index: usize) -> Option<&mut Param> {
        let local = self.local.len();
        let inherited = self.inherited.len();
        match index {
            i if i < local => self.local.get_mut(i),
            i if i < local + inherited => self.inherited.get_mut(i - local),
            _ => self
                .source
                .iter_mut()
                .chain(&mut self.port_type)
                .nth(index - local - inherited),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Param> {
        self.local
            .iter()
            .chain(&self.inherited)
            .chain(self.tail())
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.iter().position(|p| p.name == name)
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        self.iter().find(|p| p.name == name).map(|p| p.value.as_str())
    }

    /// Set parameter `name`; returns its index, or `None` if there is no
    /// such parameter.
    pub fn set(&mut self, name: &str, value: impl Into<String>) -> Option<usize> {
        let index = self.position(name)?;
        if let Some(param) = self.get_mut(index) {
            param.value = value.into();
        }
        Some(index)
    }

    pub fn set_port_type(&mut self, value: Option<String>) {
        self.port_type = value.map(|v| Param::new(PORT_TYPE_PARAM, v, false));
    }

    /// Replace the inherited parameters by `descriptors`.
    ///
    /// Values already present are kept: first by name, then, for values read
    /// from a record before the names were known, by position.
    pub fn inherit(&mut self, descriptors: &[ParamDescriptor]) {
        let previous = std::mem::take(&mut self.inherited);
        self.inherited = descriptors
            .iter()
            .enumerate()
            .map(|(i, d)| {
                let kept = previous
                    .iter()
                    .find(|p| p.name == d.name)
                    .or_else(|| previous.get(i).filter(|p| p.name.is_empty()));
                match kept {
                    Some(p) => Param::new(&d.name, &p.value, p.visible),
                    None => Param::new(&d.name, &d.value, d.visible),
                }
            })
            .collect();

        let unnamed = previous.iter().filter(|p| p.name.is_empty()).count();
        if unnamed > descriptors.len() {
            log::debug!(
                "Dropping {} property values without a matching symbol parameter",
                unnamed - descriptors.len()
            );
        }
    }

    /// Positional values from a record, named once a symbol is attached.
    fn set_pending(&mut self, values: Vec<Param>) {
        self.inherited = values;
    }
}

/// What an instance resolved to.
#[derive(Debug, Clone)]
pub enum Definition {
    Primitive,
    Resolved(Arc<Prototype>),
    /// Resolution failed; the instance keeps the error and has no ports.
    Unresolved(ResolveError),
}

/// Position and orientation of an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Placement {
    pub x: i32,
    pub y: i32,
    pub mirror_x: bool,
    /// Quarter turns.
    pub rotation: u8,
}

impl Placement {
    /// Map a symbol-local point to schematic coordinates: mirror, then
    /// rotate, then offset.
    pub fn transform(&self, px: i32, py: i32) -> (i32, i32) {
        let (mut x, mut y) = (px, py);
        if self.mirror_x {
            y = y.saturating_neg();
        }
        for _ in 0..self.rotation % 4 {
            (x, y) = (y, x.saturating_neg());
        }
        (self.x.saturating_add(x), self.y.saturating_add(y))
    }
}

#[derive(Debug, Clone)]
pub struct ComponentInstance {
    name: String,
    record_type: String,
    kind: InstanceKind,
    type_name: String,
    params: ParamList,
    connections: Vec<Option<String>>,
    definition: Definition,
    common: Option<Arc<CommonParams>>,
    placement: Placement,
}

impl ComponentInstance {
    fn new(name: impl Into<String>, record_type: &str, kind: InstanceKind, params: ParamList) -> Self {
        let mut instance = Self {
            name: name.into(),
            record_type: record_type.to_string(),
            kind,
            type_name: String::new(),
            params,
            connections: Vec::new(),
            definition: Definition::Primitive,
            common: None,
            placement: Placement::default(),
        };
        instance.type_name = instance.derive_type_name();
        if SINGLE_PIN_TYPES.contains(&record_type) {
            instance.connections = vec![None];
        }
        instance
    }

    pub fn subcircuit(name: impl Into<String>, file: impl Into<String>) -> Self {
        Self::new(
            name,
            "Sub",
            InstanceKind::Subcircuit,
            ParamList::new(Param::new(FILE_PARAM, file, false)),
        )
    }

    pub fn library(name: impl Into<String>, library: impl Into<String>, component: impl Into<String>) -> Self {
        let params = ParamList::new(Param::new(LIB_PARAM, library, true))
            .with_local(vec![Param::new(COMP_PARAM, component, true)]);
        Self::new(name, "Lib", InstanceKind::LibComp, params)
    }

    /// A built-in device; its property values are kept positionally.
    pub fn primitive(name: impl Into<String>, record_type: &str, values: Vec<Param>) -> Self {
        let params = ParamList::without_source().with_local(values);
        Self::new(name, record_type, InstanceKind::Primitive, params)
    }

    /// Build an unresolved instance from a `Components` record.
    pub fn from_record(record: &ComponentRecord, kinds: &KindRegistry) -> Self {
        let value = |i: usize| record.property(i).unwrap_or_default().to_string();
        let rest = |from: usize| -> Vec<Param> {
            record
                .properties
                .iter()
                .skip(from)
                .map(|p| Param::new("", &p.value, p.visible))
                .collect()
        };

        let mut instance = match kinds.kind_of(&record.type_name) {
            InstanceKind::Subcircuit => {
                let mut inst = Self::subcircuit(&record.name, value(0));
                inst.params.set_pending(rest(1));
                inst
            }
            InstanceKind::LibComp => {
                let mut inst = Self::library(&record.name, value(0), value(1));
                inst.params.set_pending(rest(2));
                inst
            }
            InstanceKind::Primitive => {
                let values = record
                    .properties
                    .iter()
                    .enumerate()
                    .map(|(i, p)| Param::new(format!("P{}", i + 1), &p.value, p.visible))
                    .collect();
                Self::primitive(&record.name, &record.type_name, values)
            }
        };
        instance.record_type = record.type_name.clone();
        instance.placement = Placement {
            x: record.x,
            y: record.y,
            mirror_x: record.mirror_x,
            rotation: record.rotation,
        };
        instance
    }

    pub fn with_placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    /// Give a subcircuit the extra `porttype` parameter.
    pub fn with_port_type(mut self, port_type: impl Into<String>) -> Self {
        self.params.set_port_type(Some(port_type.into()));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn record_type(&self) -> &str {
        &self.record_type
    }

    pub fn kind(&self) -> InstanceKind {
        self.kind
    }

    /// `Sub:<stem>`, `Lib:<library>:<component>`, or the record type of a
    /// primitive.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn params(&self) -> &ParamList {
        &self.params
    }

    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    pub fn definition(&self) -> &Definition {
        &self.definition
    }

    pub fn prototype(&self) -> Option<&Arc<Prototype>> {
        match &self.definition {
            Definition::Resolved(prototype) => Some(prototype),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ResolveError> {
        match &self.definition {
            Definition::Unresolved(e) => Some(e),
            _ => None,
        }
    }

    pub fn common(&self) -> Option<&CommonParams> {
        self.common.as_deref()
    }

    pub fn placement(&self) -> Placement {
        self.placement
    }

    pub fn connections(&self) -> &[Option<String>] {
        &self.connections
    }

    pub fn port_count(&self) -> usize {
        self.connections.len()
    }

    /// Wire port `index` (0-based) to `node`; `false` if there is no such port.
    pub fn connect(&mut self, index: usize, node: impl Into<String>) -> bool {
        match self.connections.get_mut(index) {
            Some(slot) => {
                *slot = Some(node.into());
                true
            }
            None => false,
        }
    }

    pub(crate) fn set_connections(&mut self, connections: Vec<Option<String>>) {
        debug_assert_eq!(connections.len(), self.connections.len());
        self.connections = connections;
    }

    /// Port positions in schematic coordinates, in port order.
    pub fn port_positions(&self) -> Vec<(i32, i32)> {
        match &self.definition {
            Definition::Resolved(prototype) => prototype
                .symbol()
                .ports
                .iter()
                .map(|p| self.placement.transform(p.x, p.y))
                .collect(),
            Definition::Primitive if !self.connections.is_empty() => {
                vec![(self.placement.x, self.placement.y)]
            }
            _ => Vec::new(),
        }
    }

    pub fn is_ground(&self) -> bool {
        self.record_type == GROUND_TYPE
    }

    /// Set parameter `name` without resolving anything. Returns whether the
    /// value identifies a different prototype now.
    pub(crate) fn set_param(&mut self, name: &str, value: &str) -> Option<bool> {
        self.params.set(name, value)?;
        let type_name = self.derive_type_name();
        let changed = type_name != self.type_name;
        self.type_name = type_name;
        Some(changed)
    }

    /// The `File` or `Lib` value.
    pub fn source_value(&self) -> &str {
        self.params.source().map(|p| p.value.as_str()).unwrap_or_default()
    }

    fn derive_type_name(&self) -> String {
        match self.kind {
            InstanceKind::Subcircuit => format!("Sub:{}", base_name(self.source_value())),
            InstanceKind::LibComp => format!(
                "Lib:{}:{}",
                base_name(self.source_value()),
                self.params.value(COMP_PARAM).unwrap_or_default()
            ),
            InstanceKind::Primitive => self.record_type.clone(),
        }
    }

    /// Attach the outcome of resolving this instance's type.
    ///
    /// On success the instance links to the prototype's shared parameter
    /// set, inherits its parameter descriptors and gets one connection slot
    /// per symbol port.
    pub(crate) fn attach(&mut self, resolved: Result<Arc<Prototype>, ResolveError>) {
        match resolved {
            Ok(prototype) => {
                let copy = prototype.detached_copy();
                debug_assert!(copy.shares_common(&prototype));
                self.common = Some(copy.common_handle().clone());
                drop(copy);

                self.params.inherit(prototype.common().params());
                self.connections = vec![None; prototype.port_count()];
                self.definition = Definition::Resolved(prototype);
            }
            Err(e) => {
                self.common = None;
                self.connections.clear();
                self.definition = Definition::Unresolved(e);
            }
        }
    }
}

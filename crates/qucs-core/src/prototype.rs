use std::path::{Path, PathBuf};
use std::sync::Arc;

use qucs_format::WireRecord;
use qucs_symbol::{ParamDescriptor, Symbol};

use crate::instance::ComponentInstance;

/// Parameter descriptors shared by a prototype and every instance attached
/// to it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommonParams {
    params: Vec<ParamDescriptor>,
}

impl CommonParams {
    pub fn new(params: Vec<ParamDescriptor>) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &[ParamDescriptor] {
        &self.params
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

/// A model section of a library component, with its include files resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSection {
    /// `Model`, `VHDLModel` or `VerilogModel`.
    pub name: String,
    pub text: String,
    pub includes: Vec<PathBuf>,
}

#[derive(Debug, Clone)]
pub enum PrototypeBody {
    /// Expanded contents of a subcircuit schematic.
    Subcircuit {
        instances: Vec<ComponentInstance>,
        wires: Vec<WireRecord>,
    },
    /// A component taken from a library file.
    Library {
        library: String,
        component: String,
        models: Vec<ModelSection>,
    },
}

/// The shared definition behind every instance of one component type.
#[derive(Debug, Clone)]
pub struct Prototype {
    type_name: String,
    source: PathBuf,
    symbol: Symbol,
    common: Arc<CommonParams>,
    body: PrototypeBody,
}

impl Prototype {
    pub fn new(
        type_name: impl Into<String>,
        source: PathBuf,
        symbol: Symbol,
        body: PrototypeBody,
    ) -> Self {
        let common = Arc::new(CommonParams::new(symbol.params.clone()));
        Self {
            type_name: type_name.into(),
            source,
            symbol,
            common,
            body,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The file this prototype was built from.
    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn body(&self) -> &PrototypeBody {
        &self.body
    }

    pub fn common(&self) -> &CommonParams {
        &self.common
    }

    pub(crate) fn common_handle(&self) -> &Arc<CommonParams> {
        &self.common
    }

    pub fn port_count(&self) -> usize {
        self.symbol.port_count()
    }

    /// Nested instances of a subcircuit; empty for library components.
    pub fn instances(&self) -> &[ComponentInstance] {
        match &self.body {
            PrototypeBody::Subcircuit { instances, .. } => instances,
            PrototypeBody::Library { .. } => &[],
        }
    }

    pub fn model(&self, section: &str) -> Option<&ModelSection> {
        match &self.body {
            PrototypeBody::Library { models, .. } => models.iter().find(|m| m.name == section),
            PrototypeBody::Subcircuit { .. } => None,
        }
    }

    pub fn is_library(&self) -> bool {
        matches!(self.body, PrototypeBody::Library { .. })
    }

    /// A structurally independent copy that still shares the parameter set
    /// of `self`.
    pub fn detached_copy(&self) -> Prototype {
        self.clone()
    }

    pub fn shares_common(&self, other: &Prototype) -> bool {
        Arc::ptr_eq(&self.common, &other.common)
    }
}

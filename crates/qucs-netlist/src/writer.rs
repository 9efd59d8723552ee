use std::collections::HashSet;
use std::io::Write;
use std::iter;
use std::path::PathBuf;
use std::sync::Arc;

use itertools::Itertools;
use qucs_core::locator::base_name;
use qucs_core::{
    ComponentInstance, Definition, FileProvider, InstanceKind, Prototype, SchematicDocument,
    Session,
};

use crate::dialect::Dialect;
use crate::error::EmitError;
use crate::naming::{proper_file_name, proper_name, verilog_param};

/// Identifier of the subcircuit `instance` instantiates; `None` for
/// primitives.
pub fn netlist_type(instance: &ComponentInstance) -> Option<String> {
    let source = proper_file_name(instance.source_value());
    match instance.kind() {
        InstanceKind::Subcircuit => Some(proper_name(source)),
        InstanceKind::LibComp => {
            let component = instance
                .params()
                .value(qucs_core::instance::COMP_PARAM)
                .unwrap_or_default();
            Some(proper_name(&format!("{}_{component}", base_name(source))))
        }
        InstanceKind::Primitive => None,
    }
}

/// The instance line of `instance` in `dialect`, without a line break.
pub fn emit(instance: &ComponentInstance, dialect: Dialect) -> Result<String, EmitError> {
    let prototype = match instance.definition() {
        Definition::Resolved(prototype) => prototype,
        Definition::Unresolved(source) => {
            return Err(EmitError::Unresolved {
                instance: instance.name().to_string(),
                source: source.clone(),
            });
        }
        Definition::Primitive => {
            return Err(EmitError::Primitive {
                instance: instance.name().to_string(),
                record_type: instance.record_type().to_string(),
            });
        }
    };

    let nodes = instance
        .connections()
        .iter()
        .enumerate()
        .map(|(i, node)| {
            node.as_deref().ok_or_else(|| EmitError::UnconnectedPort {
                instance: instance.name().to_string(),
                port: i + 1,
            })
        })
        .collect::<Result<Vec<&str>, _>>()?;

    let type_name = netlist_type(instance).unwrap_or_default();
    let name = instance.name();
    let params = instance.params().inherited();
    // library components carry their parameters in the model
    let generic = !prototype.is_library() && !params.is_empty();

    let line = match dialect {
        Dialect::Qucs => iter::once(format!("Sub:{name}"))
            .chain(nodes.iter().map(|n| n.to_string()))
            .chain(iter::once(format!("Type=\"{type_name}\"")))
            .chain(params.iter().map(|p| format!("{}=\"{}\"", p.name, p.value)))
            .join(" "),
        Dialect::Vhdl => {
            let generic = if generic {
                format!(" generic map ({})", params.iter().map(|p| &p.value).join(", "))
            } else {
                String::new()
            };
            format!(
                "  {name}: entity Sub_{type_name}{generic} port map ({});",
                nodes.join(", ")
            )
        }
        Dialect::Verilog => {
            let generic = if generic {
                format!(" #({})", params.iter().map(|p| verilog_param(&p.value)).join(", "))
            } else {
                String::new()
            };
            format!("  Sub_{type_name}{generic} {name} ({});", nodes.join(", "))
        }
    };
    Ok(line)
}

/// Writes the netlist of one generation pass.
///
/// Library models, and the include files they need, are written ahead of
/// the instance lines; that covers library components nested in
/// subcircuits at any depth. Each include file is written once per pass however
/// many models name it, and each model once per prototype.
pub struct NetlistWriter {
    provider: Arc<dyn FileProvider>,
    dialect: Dialect,
    includes: HashSet<PathBuf>,
    models: HashSet<String>,
}

impl NetlistWriter {
    pub fn new(provider: Arc<dyn FileProvider>, dialect: Dialect) -> Self {
        Self {
            provider,
            dialect,
            includes: HashSet::new(),
            models: HashSet::new(),
        }
    }

    pub fn for_session(session: &Session, dialect: Dialect) -> Self {
        Self::new(session.file_provider().clone(), dialect)
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Include files written so far.
    pub fn include_count(&self) -> usize {
        self.includes.len()
    }

    pub fn write_document(
        &mut self,
        doc: &SchematicDocument,
        out: &mut impl Write,
    ) -> Result<(), EmitError> {
        writeln!(
            out,
            "{} Qucs {}  {}",
            self.dialect.comment_prefix(),
            doc.schematic.header().version,
            doc.path.display()
        )?;
        self.write_instances(&doc.instances, out)
    }

    /// Emit every non-primitive instance. Nothing is written for the
    /// instances when one of them cannot be emitted.
    pub fn write_instances(
        &mut self,
        instances: &[ComponentInstance],
        out: &mut impl Write,
    ) -> Result<(), EmitError> {
        let mut lines = Vec::new();
        for instance in instances {
            if instance.kind() == InstanceKind::Primitive {
                log::trace!("Skipping primitive {}", instance.name());
                continue;
            }
            lines.push(emit(instance, self.dialect)?);
        }

        let mut libraries = Vec::new();
        library_prototypes(instances, &mut HashSet::new(), &mut libraries);
        for prototype in libraries {
            self.write_model(prototype, out)?;
        }

        for line in lines {
            writeln!(out, "{line}")?;
        }
        Ok(())
    }

    /// Nothing is recorded as written until it is, so a failed pass leaves
    /// the writer able to try again.
    fn write_model(&mut self, prototype: &Prototype, out: &mut impl Write) -> Result<(), EmitError> {
        if self.models.contains(prototype.type_name()) {
            return Ok(());
        }

        let section = self.dialect.model_section();
        let model = prototype
            .model(section)
            .ok_or_else(|| EmitError::MissingModel {
                type_name: prototype.type_name().to_string(),
                section: section.to_string(),
            })?;

        for include in &model.includes {
            let key = self
                .provider
                .canonicalize(include)
                .unwrap_or_else(|_| include.clone());
            if self.includes.contains(&key) {
                log::debug!("{} already included", key.display());
                continue;
            }
            let text = self
                .provider
                .read_file(&key)
                .map_err(|source| EmitError::Include {
                    path: include.clone(),
                    source,
                })?;
            out.write_all(text.as_bytes())?;
            if !text.ends_with('\n') {
                writeln!(out)?;
            }
            self.includes.insert(key);
        }

        writeln!(out, "{}", model.text)?;
        self.models.insert(prototype.type_name().to_string());
        Ok(())
    }
}

/// Library prototypes used by `instances` or by any subcircuit below them,
/// in order of first use.
fn library_prototypes<'a>(
    instances: &'a [ComponentInstance],
    seen: &mut HashSet<&'a str>,
    found: &mut Vec<&'a Prototype>,
) {
    for prototype in instances
        .iter()
        .filter_map(ComponentInstance::prototype)
        .map(Arc::as_ref)
    {
        if !seen.insert(prototype.type_name()) {
            continue;
        }
        if prototype.is_library() {
            found.push(prototype);
        } else {
            library_prototypes(prototype.instances(), seen, found);
        }
    }
}

impl std::fmt::Debug for NetlistWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetlistWriter")
            .field("dialect", &self.dialect)
            .field("includes", &self.includes)
            .field("models", &self.models)
            .finish()
    }
}

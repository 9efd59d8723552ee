//! One editing session: resolution of component references to prototypes.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;

use once_cell::sync::OnceCell;
use qucs_format::{
    ComponentRecord, FormatError, Library, LibrarySection, Schematic, Section, VersionTriplet,
};
use qucs_symbol::{Symbol, SymbolBuilder, SymbolError};

use crate::config::SessionConfig;
use crate::connect::derive_connections;
use crate::error::ResolveError;
use crate::instance::{ComponentInstance, InstanceKind, KindRegistry, COMP_PARAM};
use crate::locator::{base_name, spawn_scan, FileLocator, SchematicIndex};
use crate::prototype::{ModelSection, Prototype, PrototypeBody};
use crate::registry::{PrototypeRegistry, ResolveContext};
use crate::{DefaultFileProvider, FileProvider};

/// Extension of library files.
pub const LIBRARY_EXTENSION: &str = "lib";

/// Library sections kept in a library prototype for netlisting.
pub const MODEL_SECTIONS: [&str; 3] = ["Model", "VHDLModel", "VerilogModel"];

const SYMBOL_SECTION: &str = "Symbol";

type LibrarySlot = Arc<OnceCell<Arc<Library>>>;

/// A loaded top-level schematic with its instances resolved and wired.
#[derive(Debug, Clone)]
pub struct SchematicDocument {
    pub path: PathBuf,
    pub schematic: Schematic,
    pub instances: Vec<ComponentInstance>,
}

impl SchematicDocument {
    pub fn instance(&self, name: &str) -> Option<&ComponentInstance> {
        self.instances.iter().find(|i| i.name() == name)
    }

    /// Instances whose prototype could not be resolved.
    pub fn unresolved(&self) -> impl Iterator<Item = &ComponentInstance> {
        self.instances.iter().filter(|i| i.error().is_some())
    }
}

/// Owns the schematic index, the prototype registry and the library cache
/// for one editing session. Everything is dropped with the session.
pub struct Session {
    config: SessionConfig,
    provider: Arc<dyn FileProvider>,
    locator: FileLocator,
    registry: PrototypeRegistry,
    kinds: KindRegistry,
    libraries: Mutex<HashMap<PathBuf, LibrarySlot>>,
    /// Start-up scan of the project directories, until someone waits for it.
    index_scan: Mutex<Option<JoinHandle<usize>>>,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self::with_file_provider(config, Arc::new(DefaultFileProvider::new()))
    }

    /// A session over `provider`. Scanning the configured project
    /// directories into the name index starts right away, in the background.
    pub fn with_file_provider(config: SessionConfig, provider: Arc<dyn FileProvider>) -> Self {
        let index = Arc::new(SchematicIndex::new());
        let index_scan = (!config.project_dirs.is_empty())
            .then(|| spawn_scan(index.clone(), config.project_dirs.clone()));
        Self {
            locator: FileLocator::new(provider.clone(), index),
            config,
            provider,
            registry: PrototypeRegistry::new(),
            kinds: KindRegistry::default(),
            libraries: Mutex::new(HashMap::new()),
            index_scan: Mutex::new(index_scan),
        }
    }

    /// Replace the record type to kind mapping.
    pub fn with_kinds(mut self, kinds: KindRegistry) -> Self {
        self.kinds = kinds;
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn running_version(&self) -> VersionTriplet {
        self.config.running_version()
    }

    pub fn file_provider(&self) -> &Arc<dyn FileProvider> {
        &self.provider
    }

    pub fn index(&self) -> &Arc<SchematicIndex> {
        self.locator.index()
    }

    pub fn registry(&self) -> &PrototypeRegistry {
        &self.registry
    }

    pub fn kinds(&self) -> &KindRegistry {
        &self.kinds
    }

    pub fn locator(&self) -> &FileLocator {
        &self.locator
    }

    /// Wait for the start-up scan of the project directories. Returns the
    /// number of schematics it indexed; 0 when it already finished or there
    /// was nothing to scan.
    pub fn wait_for_index(&self) -> usize {
        let pending = self
            .index_scan
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match pending.map(JoinHandle::join) {
            Some(Ok(added)) => added,
            Some(Err(_)) => {
                log::warn!("Project directory scan panicked; the name index may be incomplete");
                0
            }
            None => 0,
        }
    }

    /// Resolve a schematic reference. The first lookup waits for the
    /// start-up scan so indexed names are visible to it.
    pub fn locate(&self, reference: &str, owner: Option<&Path>) -> Result<PathBuf, ResolveError> {
        self.wait_for_index();
        self.locator.resolve(reference, owner)
    }

    /// Prototype of the subcircuit stored in the file `reference` names.
    ///
    /// The prototype is registered as `Sub:<stem>`; later requests for the
    /// same type get the same handle without touching the file again.
    pub fn resolve_subcircuit(
        &self,
        reference: &str,
        owner: Option<&Path>,
    ) -> Result<Arc<Prototype>, ResolveError> {
        self.resolve_subcircuit_in(reference, owner, &mut ResolveContext::new())
    }

    fn resolve_subcircuit_in(
        &self,
        reference: &str,
        owner: Option<&Path>,
        ctx: &mut ResolveContext,
    ) -> Result<Arc<Prototype>, ResolveError> {
        let type_name = format!("Sub:{}", base_name(reference));
        if let Some(prototype) = self.registry.get(&type_name) {
            return Ok(prototype);
        }

        // Checked before the registry slot is touched: re-entering a slot
        // that is still being filled would block forever.
        ctx.push(&type_name)?;
        let result = self.registry.get_or_try_build(&type_name, || {
            let path = self.locate(reference, owner)?;
            self.build_subcircuit(&type_name, &path, ctx)
        });
        ctx.pop();
        result
    }

    fn build_subcircuit(
        &self,
        type_name: &str,
        path: &Path,
        ctx: &mut ResolveContext,
    ) -> Result<Prototype, ResolveError> {
        log::debug!("Building {type_name} from {}", path.display());
        let schematic = self.read_schematic(path)?;

        let builder = SymbolBuilder::subcircuit(type_name, schematic.ports());
        let symbol = load_symbol(&builder, schematic.symbol(), path)?;

        let mut instances = schematic
            .components()
            .iter()
            .map(|record| self.instantiate_in(record, Some(path), ctx))
            .collect::<Result<Vec<_>, _>>()?;
        derive_connections(schematic.wires(), &mut instances);

        Ok(Prototype::new(
            type_name,
            path.to_path_buf(),
            symbol,
            PrototypeBody::Subcircuit {
                instances,
                wires: schematic.wires().to_vec(),
            },
        ))
    }

    fn read_schematic(&self, path: &Path) -> Result<Schematic, ResolveError> {
        let text = self
            .provider
            .read_file(path)
            .map_err(|e| ResolveError::read(path.to_path_buf(), e))?;
        Schematic::parse(&text, &self.running_version()).map_err(|e| ResolveError::format(path, e))
    }

    /// Path of the library `reference`: `<dir>/<reference>.lib` for the
    /// first configured directory holding it. Absolute references are used
    /// as they are.
    pub fn library_path(&self, reference: &str) -> Result<PathBuf, ResolveError> {
        if reference.is_empty() {
            return Err(ResolveError::NotFound {
                reference: String::new(),
            });
        }

        let file = Path::new(reference);
        let file = if file
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case(LIBRARY_EXTENSION))
        {
            file.to_path_buf()
        } else {
            PathBuf::from(format!("{reference}.{LIBRARY_EXTENSION}"))
        };
        if file.is_absolute() {
            return Ok(file);
        }

        self.config
            .library_dirs
            .iter()
            .map(|dir| dir.join(&file))
            .find(|candidate| self.provider.is_file(candidate))
            .ok_or_else(|| {
                log::debug!(
                    "Library '{reference}' not in any of {} library directories",
                    self.config.library_dirs.len()
                );
                ResolveError::NotFound {
                    reference: reference.to_string(),
                }
            })
    }

    /// Parse the library at `path`, once per canonical path.
    pub fn load_library(&self, path: &Path) -> Result<Arc<Library>, ResolveError> {
        let canonical = self
            .provider
            .canonicalize(path)
            .map_err(|e| ResolveError::read(path.to_path_buf(), e))?;

        let slot = self
            .libraries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(canonical.clone())
            .or_default()
            .clone();

        slot.get_or_try_init(|| {
            log::debug!("Loading library {}", canonical.display());
            let text = self
                .provider
                .read_file(&canonical)
                .map_err(|e| ResolveError::read(canonical.clone(), e))?;
            Library::parse(&text, &self.running_version())
                .map(Arc::new)
                .map_err(|e| ResolveError::format(&canonical, e))
        })
        .cloned()
    }

    pub fn library(&self, reference: &str) -> Result<Arc<Library>, ResolveError> {
        let path = self.library_path(reference)?;
        self.load_library(&path)
    }

    /// Section `section` of `component` in library `library`.
    pub fn library_section(
        &self,
        library: &str,
        component: &str,
        section: &str,
    ) -> Result<LibrarySection, ResolveError> {
        let path = self.library_path(library)?;
        self.load_library(&path)?
            .section(component, section)
            .map_err(|e| ResolveError::format(path, e))
    }

    /// Prototype of `component` from library `library`, registered as
    /// `Lib:<library>:<component>`.
    pub fn resolve_library_component(
        &self,
        library: &str,
        component: &str,
    ) -> Result<Arc<Prototype>, ResolveError> {
        let type_name = format!("Lib:{}:{component}", base_name(library));
        self.registry.get_or_try_build(&type_name, || {
            self.build_library_component(&type_name, library, component)
        })
    }

    fn build_library_component(
        &self,
        type_name: &str,
        library: &str,
        component: &str,
    ) -> Result<Prototype, ResolveError> {
        let path = self.library_path(library)?;
        let lib = self.load_library(&path)?;
        log::debug!("Building {type_name} from {}", path.display());

        let builder = SymbolBuilder::library(type_name);
        let symbol = match lib.section(component, SYMBOL_SECTION) {
            Ok(section) => load_symbol(&builder, Some(&section.section), &path)?,
            Err(FormatError::SectionNotFound { .. }) => builder.fallback(),
            Err(e) => return Err(ResolveError::format(&path, e)),
        };

        // includes live in a directory named after the library
        let include_dir = path.with_extension("");
        let models = MODEL_SECTIONS
            .iter()
            .filter_map(|name| lib.section(component, name).ok())
            .map(|section| ModelSection {
                name: section.section.name().to_string(),
                text: section.text(),
                includes: section
                    .includes
                    .iter()
                    .map(|file| include_dir.join(file))
                    .collect(),
            })
            .collect();

        Ok(Prototype::new(
            type_name,
            path,
            symbol,
            PrototypeBody::Library {
                library: base_name(library).to_string(),
                component: component.to_string(),
                models,
            },
        ))
    }

    /// Build an instance from `record` and resolve its prototype. A failed
    /// resolution is kept on the instance.
    pub fn instantiate(&self, record: &ComponentRecord, owner: Option<&Path>) -> ComponentInstance {
        let mut instance = ComponentInstance::from_record(record, &self.kinds);
        self.resolve_instance(&mut instance, owner);
        instance
    }

    fn instantiate_in(
        &self,
        record: &ComponentRecord,
        owner: Option<&Path>,
        ctx: &mut ResolveContext,
    ) -> Result<ComponentInstance, ResolveError> {
        let mut instance = ComponentInstance::from_record(record, &self.kinds);
        self.resolve_instance_in(&mut instance, owner, ctx)?;
        Ok(instance)
    }

    /// (Re)resolve the prototype of `instance` from its current parameters.
    pub fn resolve_instance(&self, instance: &mut ComponentInstance, owner: Option<&Path>) {
        // at the top level a cycle is just another failed resolution
        let _ = self.resolve_instance_in(instance, owner, &mut ResolveContext::new());
    }

    /// Only a cyclic definition below a prototype under construction is
    /// returned; every other failure is recorded on the instance.
    fn resolve_instance_in(
        &self,
        instance: &mut ComponentInstance,
        owner: Option<&Path>,
        ctx: &mut ResolveContext,
    ) -> Result<(), ResolveError> {
        let source = instance.source_value().to_string();
        let resolved = match instance.kind() {
            InstanceKind::Primitive => return Ok(()),
            InstanceKind::Subcircuit => self.resolve_subcircuit_in(&source, owner, ctx),
            InstanceKind::LibComp => {
                let component = instance
                    .params()
                    .value(COMP_PARAM)
                    .unwrap_or_default()
                    .to_string();
                self.resolve_library_component(&source, &component)
            }
        };

        match resolved {
            Err(e @ ResolveError::CyclicDefinition { .. }) if ctx.depth() > 0 => Err(e),
            Err(e) => {
                log::warn!("{}: {e}", instance.name());
                instance.attach(Err(e));
                Ok(())
            }
            Ok(prototype) => {
                instance.attach(Ok(prototype));
                Ok(())
            }
        }
    }

    /// Set parameter `name` of `instance`. When the new value names a
    /// different prototype the instance is resolved again.
    ///
    /// Returns `false` if the instance has no such parameter.
    pub fn set_parameter(
        &self,
        instance: &mut ComponentInstance,
        name: &str,
        value: &str,
        owner: Option<&Path>,
    ) -> bool {
        match instance.set_param(name, value) {
            None => {
                log::debug!("{} has no parameter '{name}'", instance.name());
                false
            }
            Some(true) => {
                log::debug!("{} now refers to {}", instance.name(), instance.type_name());
                self.resolve_instance(instance, owner);
                true
            }
            Some(false) => true,
        }
    }

    /// Load the schematic at `path` as a document: every instance resolved,
    /// ports wired from the document's wires.
    pub fn load_schematic(&self, path: &Path) -> Result<SchematicDocument, ResolveError> {
        let path = self
            .provider
            .canonicalize(path)
            .map_err(|e| ResolveError::read(path.to_path_buf(), e))?;
        let schematic = self.read_schematic(&path)?;

        let mut instances: Vec<ComponentInstance> = schematic
            .components()
            .iter()
            .map(|record| self.instantiate(record, Some(&path)))
            .collect();
        derive_connections(schematic.wires(), &mut instances);

        log::debug!(
            "Loaded {}: {} instances, {} prototypes registered",
            path.display(),
            instances.len(),
            self.registry.len()
        );
        Ok(SchematicDocument {
            path,
            schematic,
            instances,
        })
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("locator", &self.locator)
            .finish()
    }
}

/// A stored symbol when `section` holds a usable one, the builder's
/// fallback otherwise. A malformed line is an error, never a fallback.
fn load_symbol(
    builder: &SymbolBuilder,
    section: Option<&Section>,
    path: &Path,
) -> Result<Symbol, ResolveError> {
    let Some(section) = section else {
        return Ok(builder.fallback());
    };
    match builder.load(section) {
        Ok(symbol) => Ok(symbol),
        Err(SymbolError::Format(e)) => Err(ResolveError::format(path, e)),
        Err(e) => {
            log::debug!("{}: {e}, using the generated symbol", path.display());
            Ok(builder.fallback())
        }
    }
}

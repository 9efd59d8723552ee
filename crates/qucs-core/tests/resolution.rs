use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use qucs_core::{
    ErrorKind, FileProvider, FileProviderError, InMemoryFileProvider, ResolveError, Session,
    SessionConfig,
};
use qucs_symbol::SymbolOrigin;

/// Counts reads per path on top of an in-memory file set.
struct CountingProvider {
    inner: InMemoryFileProvider,
    reads: Mutex<HashMap<PathBuf, usize>>,
}

impl CountingProvider {
    fn new(files: &[(&str, &str)]) -> Self {
        Self {
            inner: InMemoryFileProvider::new(
                files
                    .iter()
                    .map(|(p, c)| (p.to_string(), c.to_string()))
                    .collect(),
            ),
            reads: Mutex::new(HashMap::new()),
        }
    }

    fn reads(&self, path: &str) -> usize {
        self.reads
            .lock()
            .unwrap()
            .get(Path::new(path))
            .copied()
            .unwrap_or(0)
    }
}

impl FileProvider for CountingProvider {
    fn read_file(&self, path: &Path) -> Result<String, FileProviderError> {
        *self.reads.lock().unwrap().entry(path.to_path_buf()).or_default() += 1;
        self.inner.read_file(path)
    }

    fn exists(&self, path: &Path) -> bool {
        self.inner.exists(path)
    }

    fn is_directory(&self, path: &Path) -> bool {
        self.inner.is_directory(path)
    }

    fn list_directory(&self, path: &Path) -> Result<Vec<PathBuf>, FileProviderError> {
        self.inner.list_directory(path)
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf, FileProviderError> {
        self.inner.canonicalize(path)
    }
}

const AMP: &str = r#"<Qucs Schematic 0.0.19>
<Symbol>
  <Line -20 -20 40 0 #000080 2 1>
  <Line 20 -20 0 40 #000080 2 1>
  <.PortSym -30 0 1 0>
  <.PortSym 30 0 2 180>
  <.ID -20 24 AMP "1=G=10=gain=">
</Symbol>
<Components>
  <Port P_in 1 100 100 -23 12 0 0 "1" 1 "analog" 0>
  <Port P_out 1 300 100 4 12 1 2 "2" 1 "analog" 0>
  <R R1 1 200 100 15 -26 0 1 "50 Ohm" 1>
</Components>
<Wires>
</Wires>
"#;

const TOP: &str = r#"<Qucs Schematic 0.0.19>
<Components>
  <Sub SUB1 1 200 100 0 0 0 0 "amp.sch" 0 "20" 1>
  <Sub SUB2 1 400 100 0 0 0 0 "amp.sch" 0>
  <GND * 1 430 200 0 0 0 0>
</Components>
<Wires>
  <230 100 370 100 "mid" 0 0 0 "">
  <430 100 430 200 "" 0 0 0 "">
  <100 100 170 100 "in" 0 0 0 "">
</Wires>
"#;

const DIODES: &str = r#"<Qucs Library 0.0.19 "Diodes">
<Component 1N4148>
  <Description>
  fast switching diode
  </Description>
  <ModelIncludes "1n4148.inc">
  <Model>
<_Diode D1 1 0 0 0 0 0 0 "2.22n" 1>
  </Model>
  <VerilogModel>
diode_1n4148 D1 (A, C);
  </VerilogModel>
  <Symbol>
    <Line -15 0 30 0 #000080 2 1>
    <.PortSym -30 0 1 0>
    <.PortSym 30 0 2 180>
  </Symbol>
</Component>
<Component 1N4001>
  <Model>
<_Diode D1 1 0 0 0 0 0 0 "14.1n" 1>
  </Model>
</Component>
"#;

fn config() -> SessionConfig {
    SessionConfig {
        library_dirs: vec![PathBuf::from("/lib")],
        ..SessionConfig::default()
    }
}

fn session(files: &[(&str, &str)]) -> (Session, Arc<CountingProvider>) {
    let provider = Arc::new(CountingProvider::new(files));
    let session = Session::with_file_provider(config(), provider.clone());
    (session, provider)
}

#[test]
fn instances_of_one_type_share_a_prototype() {
    let (session, provider) = session(&[("/proj/top.sch", TOP), ("/proj/amp.sch", AMP)]);

    let doc = session.load_schematic(Path::new("/proj/top.sch")).unwrap();
    let sub1 = doc.instance("SUB1").unwrap();
    let sub2 = doc.instance("SUB2").unwrap();

    let p1 = sub1.prototype().unwrap();
    let p2 = sub2.prototype().unwrap();
    assert!(Arc::ptr_eq(p1, p2));
    assert_eq!(p1.type_name(), "Sub:amp");
    assert_eq!(provider.reads("/proj/amp.sch"), 1);

    // a later request reuses the registered prototype
    let again = session.resolve_subcircuit("amp.sch", Some(Path::new("/proj/top.sch"))).unwrap();
    assert!(Arc::ptr_eq(p1, &again));
    assert_eq!(provider.reads("/proj/amp.sch"), 1);
    assert_eq!(session.registry().type_names(), ["Sub:amp"]);
}

#[test]
fn instance_parameters_and_wiring() {
    let (session, _) = session(&[("/proj/top.sch", TOP), ("/proj/amp.sch", AMP)]);
    let doc = session.load_schematic(Path::new("/proj/top.sch")).unwrap();

    let sub1 = doc.instance("SUB1").unwrap();
    assert_eq!(sub1.params().value("G"), Some("20"));
    assert_eq!(sub1.params().value("File"), Some("amp.sch"));
    // inherited G plus the File parameter
    assert_eq!(sub1.param_count(), 2);
    assert_eq!(
        sub1.connections(),
        [Some("in".to_string()), Some("mid".to_string())]
    );

    let sub2 = doc.instance("SUB2").unwrap();
    assert_eq!(sub2.params().value("G"), Some("10"));
    assert_eq!(
        sub2.connections(),
        [Some("mid".to_string()), Some("gnd".to_string())]
    );

    let prototype = sub1.prototype().unwrap();
    assert_eq!(prototype.symbol().origin, SymbolOrigin::Stored);
    assert_eq!(prototype.symbol().prefix, "AMP");
    let names: Vec<_> = prototype
        .symbol()
        .ports
        .iter()
        .map(|p| p.name.as_deref())
        .collect();
    assert_eq!(names, [Some("P_in"), Some("P_out")]);
    assert_eq!(prototype.instances().len(), 3);
}

#[test]
fn co_located_subcircuit_wins_over_index() {
    let other = AMP.replace("\"1=G=10=gain=\"", "\"1=K=1=other=\"");
    let (session, _) = session(&[
        ("/proj/top.sch", TOP),
        ("/proj/amp.sch", AMP),
        ("/elsewhere/amp.sch", other.as_str()),
    ]);
    session
        .index()
        .insert("amp", PathBuf::from("/elsewhere/amp.sch"));

    let prototype = session
        .resolve_subcircuit("amp.sch", Some(Path::new("/proj/top.sch")))
        .unwrap();
    assert_eq!(prototype.source(), Path::new("/proj/amp.sch"));
    assert!(prototype.symbol().param("G").is_some());
}

#[test]
fn mutual_reference_is_rejected() {
    let a = r#"<Qucs Schematic 0.0.19>
<Components>
  <Sub S1 1 0 0 0 0 0 0 "b.sch" 0>
</Components>
"#;
    let b = r#"<Qucs Schematic 0.0.19>
<Components>
  <Sub S1 1 0 0 0 0 0 0 "a.sch" 0>
</Components>
"#;
    let top = r#"<Qucs Schematic 0.0.19>
<Components>
  <Sub X1 1 0 0 0 0 0 0 "a.sch" 0>
</Components>
"#;
    let (session, _) = session(&[("/p/a.sch", a), ("/p/b.sch", b), ("/p/top.sch", top)]);

    let err = session.resolve_subcircuit("/p/a.sch", None).unwrap_err();
    assert_eq!(
        err,
        ResolveError::CyclicDefinition {
            type_name: "Sub:a".into(),
            chain: vec!["Sub:a".into(), "Sub:b".into(), "Sub:a".into()],
        }
    );
    assert!(session.registry().is_empty());

    // inside a document the cycle only marks the instance
    let doc = session.load_schematic(Path::new("/p/top.sch")).unwrap();
    let x1 = doc.instance("X1").unwrap();
    assert_eq!(x1.error().map(ResolveError::kind), Some(ErrorKind::CyclicDefinition));
    assert_eq!(x1.port_count(), 0);
}

#[test]
fn self_reference_is_rejected() {
    let selfish = r#"<Qucs Schematic 0.0.19>
<Components>
  <Sub S1 1 0 0 0 0 0 0 "loop.sch" 0>
</Components>
"#;
    let (session, _) = session(&[("/p/loop.sch", selfish)]);
    let err = session.resolve_subcircuit("/p/loop.sch", None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CyclicDefinition);
}

#[test]
fn nested_failure_leaves_instance_unresolved() {
    let outer = r#"<Qucs Schematic 0.0.19>
<Components>
  <Sub S1 1 0 0 0 0 0 0 "gone.sch" 0>
  <Lib D1 1 100 0 0 0 0 0 "Diodes" 1 "1N9999" 1>
</Components>
"#;
    let (session, _) = session(&[("/p/outer.sch", outer), ("/lib/Diodes.lib", DIODES)]);

    let prototype = session.resolve_subcircuit("/p/outer.sch", None).unwrap();
    let nested = prototype.instances();
    assert_eq!(nested[0].error().map(ResolveError::kind), Some(ErrorKind::NotFound));
    assert_eq!(
        nested[1].error().map(ResolveError::kind),
        Some(ErrorKind::ComponentNotFound)
    );
    // the subcircuit itself has no ports, so it falls back to an empty box
    assert_eq!(prototype.port_count(), 0);
    assert_eq!(session.registry().type_names(), ["Sub:outer"]);
}

#[test]
fn failed_build_can_be_retried() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("amp.sch");
    std::fs::write(
        &path,
        "<Qucs Schematic 0.0.19>\n<Components>\n  <R R1 1 x 0 0 0 0 0>\n</Components>\n",
    )
    .unwrap();

    let session = Session::new(config());
    let reference = path.to_string_lossy().into_owned();
    let err = session.resolve_subcircuit(&reference, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedLine);
    assert!(session.registry().is_empty());

    std::fs::write(&path, AMP).unwrap();
    let prototype = session.resolve_subcircuit(&reference, None).unwrap();
    assert_eq!(prototype.port_count(), 2);
}

#[test]
fn project_dirs_are_indexed_at_session_start() {
    let dir = tempfile::tempdir().unwrap();
    let prj = dir.path().join("prj");
    std::fs::create_dir_all(prj.join("nested")).unwrap();
    std::fs::write(prj.join("nested/filter.sch"), AMP).unwrap();
    std::fs::write(prj.join("top.sch"), TOP.replace("amp.sch", "filter.sch")).unwrap();

    let session = Session::new(SessionConfig {
        project_dirs: vec![prj.clone()],
        ..config()
    });
    let doc = session.load_schematic(&prj.join("top.sch")).unwrap();
    let sub1 = doc.instance("SUB1").unwrap();
    assert!(sub1.error().is_none(), "{:?}", sub1.error());
    let prototype = sub1.prototype().unwrap();
    assert_eq!(prototype.type_name(), "Sub:filter");
    assert!(prototype.source().ends_with("nested/filter.sch"));
    assert_eq!(session.index().len(), 2);

    // without the project directory nothing points at nested/
    let session = Session::new(config());
    let doc = session.load_schematic(&prj.join("top.sch")).unwrap();
    let err = doc.instance("SUB1").unwrap().error().unwrap();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(session.index().is_empty());
}

#[test]
fn newer_subcircuit_is_rejected() {
    let (session, _) = session(&[("/p/new.sch", "<Qucs Schematic 9.0.0>\n")]);
    let err = session.resolve_subcircuit("/p/new.sch", None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::VersionTooNew);
}

#[test]
fn library_is_read_once_for_many_components() {
    let (session, provider) = session(&[("/lib/Diodes.lib", DIODES)]);

    let fast = session.resolve_library_component("Diodes", "1N4148").unwrap();
    let again = session.resolve_library_component("Diodes", "1N4148").unwrap();
    let rectifier = session.resolve_library_component("Diodes", "1N4001").unwrap();
    assert!(Arc::ptr_eq(&fast, &again));
    assert_eq!(provider.reads("/lib/Diodes.lib"), 1);

    assert_eq!(fast.type_name(), "Lib:Diodes:1N4148");
    assert_eq!(fast.symbol().origin, SymbolOrigin::Stored);
    assert_eq!(fast.port_count(), 2);

    let model = fast.model("Model").unwrap();
    assert_eq!(model.text, "<_Diode D1 1 0 0 0 0 0 0 \"2.22n\" 1>");
    assert_eq!(model.includes, vec![PathBuf::from("/lib/Diodes/1n4148.inc")]);
    assert!(fast.model("VerilogModel").unwrap().includes.is_empty());
    assert!(fast.model("VHDLModel").is_none());

    // no symbol of its own and no library default
    assert_eq!(rectifier.symbol().origin, SymbolOrigin::Placeholder);
}

#[test]
fn library_lookup_failures_are_typed() {
    let (session, _) = session(&[("/lib/Diodes.lib", DIODES)]);
    let missing = session.resolve_library_component("Diodes", "1N9999").unwrap_err();
    assert_eq!(missing.kind(), ErrorKind::ComponentNotFound);

    let no_lib = session.resolve_library_component("Opamps", "LM358").unwrap_err();
    assert_eq!(no_lib.kind(), ErrorKind::NotFound);

    let section = session.library_section("Diodes", "1N4001", "Symbol").unwrap_err();
    assert_eq!(section.kind(), ErrorKind::SectionNotFound);
    assert_eq!(
        session
            .library_section("Diodes", "1N4148", "Description")
            .unwrap()
            .text(),
        "fast switching diode"
    );
}

#[test]
fn changing_the_file_parameter_resolves_again() {
    let filter = AMP.replace("AMP", "FLT");
    let (session, _) = session(&[
        ("/proj/top.sch", TOP),
        ("/proj/amp.sch", AMP),
        ("/proj/filter.sch", filter.as_str()),
    ]);
    let owner = Path::new("/proj/top.sch");
    let mut doc = session.load_schematic(owner).unwrap();
    let sub = &mut doc.instances[0];

    assert!(session.set_parameter(sub, "File", "filter.sch", Some(owner)));
    assert_eq!(sub.type_name(), "Sub:filter");
    assert_eq!(sub.prototype().unwrap().symbol().prefix, "FLT");
    // the override survives the switch because both declare G
    assert_eq!(sub.params().value("G"), Some("20"));

    assert!(!session.set_parameter(sub, "Nope", "1", Some(owner)));
}

use qucs_format::{FORMAT_VERSION, Schematic};
use qucs_symbol::{default_symbol, SymbolBuilder, SymbolOrigin};

const OPAMP: &str = r#"<Qucs Schematic 0.0.19>
<Symbol>
  <Line -30 -40 0 80 #000080 2 1>
  <Line -30 -40 70 40 #000080 2 1>
  <Line -30 40 70 -40 #000080 2 1>
  <Text -22 -16 10 #000000 0 "+">
  <.PortSym -40 -20 1 0>
  <.PortSym -40 20 2 0>
  <.PortSym 50 0 3 180>
  <.ID -20 44 OP "1=G=1e5=open loop gain=">
</Symbol>
<Components>
  <Port inp 1 100 100 -23 12 0 0 "1" 1 "analog" 0>
  <Port inn 1 100 200 -23 12 0 0 "2" 1 "analog" 0>
  <Port out 1 400 150 4 12 1 2 "3" 1 "analog" 0>
</Components>
"#;

#[test]
fn stored_symbol_from_schematic() {
    let schematic = Schematic::parse(OPAMP, &FORMAT_VERSION).unwrap();
    let builder = SymbolBuilder::subcircuit("Sub:opamp", schematic.ports());
    let symbol = builder.build(schematic.symbol());

    assert_eq!(symbol.origin, SymbolOrigin::Stored);
    assert_eq!(symbol.shapes.len(), 4);
    assert_eq!(symbol.prefix, "OP");
    assert_eq!(symbol.param_count(), 1);
    assert_eq!(symbol.param("G").map(|p| p.value.as_str()), Some("1e5"));

    let names: Vec<_> = symbol
        .ports
        .iter()
        .map(|p| p.name.as_deref().unwrap_or("?"))
        .collect();
    assert_eq!(names, ["inp", "inn", "out"]);
    assert!(symbol.bounds.is_valid());
}

#[test]
fn default_symbol_ports_snapshot() {
    let symbol = default_symbol("Sub:one", 1);
    insta::assert_json_snapshot!(symbol.ports, @r#"
    [
      {
        "number": 1,
        "x": -30,
        "y": 0,
        "angle": 0
      }
    ]
    "#);
}

#[test]
fn symbol_serialises_origin_and_shapes() {
    let symbol = SymbolBuilder::library("Lib:Diodes:X").build(None);
    let json = serde_json::to_value(&symbol).unwrap();
    assert_eq!(json["origin"], "placeholder");
    assert_eq!(json["shapes"][0]["kind"], "line");
    assert_eq!(json["shapes"][0]["pen"]["color"], "#000080");
}

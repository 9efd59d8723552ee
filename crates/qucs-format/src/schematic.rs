//! Qucs schematic files: header, stored symbol and the component/wire records.

use crate::document::{Document, DocumentKind, Header};
use crate::error::LineError;
use crate::fields::{split_fields, Field};
use crate::section::{Section, TagLine};
use crate::version::VersionTriplet;
use crate::FormatError;

/// Record type of an external port of a subcircuit.
pub const PORT_TYPE: &str = "Port";
/// Record type of a ground symbol.
pub const GROUND_TYPE: &str = "GND";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyValue {
    pub value: String,
    pub visible: bool,
}

/// One line of the `Components` section:
/// `<Type Name active x y tx ty mirrorX rotate "value" display ...>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentRecord {
    pub line: usize,
    pub type_name: String,
    pub name: String,
    pub active: i32,
    pub x: i32,
    pub y: i32,
    pub tx: i32,
    pub ty: i32,
    pub mirror_x: bool,
    /// Quarter turns, 0..=3.
    pub rotation: u8,
    pub properties: Vec<PropertyValue>,
}

impl ComponentRecord {
    pub fn property(&self, index: usize) -> Option<&str> {
        self.properties.get(index).map(|p| p.value.as_str())
    }

    pub fn is_port(&self) -> bool {
        self.type_name == PORT_TYPE
    }

    pub fn is_ground(&self) -> bool {
        self.type_name == GROUND_TYPE
    }
}

/// One line of the `Wires` section: `<x1 y1 x2 y2 "label" lx ly delta "">`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireRecord {
    pub line: usize,
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
    pub label: Option<String>,
}

/// External port of a subcircuit, from a `Port` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortRecord {
    /// 1-based port number, the `Num` property.
    pub number: u32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schematic {
    header: Header,
    symbol: Option<Section>,
    properties: Vec<(String, String)>,
    components: Vec<ComponentRecord>,
    wires: Vec<WireRecord>,
}

impl Schematic {
    pub fn parse(text: &str, running: &VersionTriplet) -> Result<Self, FormatError> {
        let doc = Document::parse(text, DocumentKind::Schematic, running)?;

        let symbol = doc.optional_section("Symbol")?;

        let properties = match doc.optional_section("Properties")? {
            Some(section) => section
                .tag_lines()?
                .into_iter()
                .map(|tag| match tag.content.split_once('=') {
                    Some((key, value)) => (key.to_string(), value.to_string()),
                    None => (tag.content, String::new()),
                })
                .collect(),
            None => Vec::new(),
        };

        let components = match doc.optional_section("Components")? {
            Some(section) => section
                .tag_lines()?
                .iter()
                .map(parse_component)
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };

        let wires = match doc.optional_section("Wires")? {
            Some(section) => section
                .tag_lines()?
                .iter()
                .map(parse_wire)
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };

        log::trace!(
            "Parsed schematic: {} components, {} wires, stored symbol: {}",
            components.len(),
            wires.len(),
            symbol.is_some()
        );

        Ok(Schematic {
            header: doc.header().clone(),
            symbol,
            properties,
            components,
            wires,
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// The stored `Symbol` section, if any.
    pub fn symbol(&self) -> Option<&Section> {
        self.symbol.as_ref()
    }

    pub fn properties(&self) -> &[(String, String)] {
        &self.properties
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn components(&self) -> &[ComponentRecord] {
        &self.components
    }

    pub fn wires(&self) -> &[WireRecord] {
        &self.wires
    }

    /// External ports, sorted by port number.
    ///
    /// A port whose `Num` property is missing or not a positive integer is
    /// numbered after the ones before it in document order.
    pub fn ports(&self) -> Vec<PortRecord> {
        let mut ports: Vec<PortRecord> = Vec::new();
        for record in self.components.iter().filter(|c| c.is_port()) {
            let number = record
                .property(0)
                .and_then(|n| n.trim().parse::<u32>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(ports.len() as u32 + 1);
            ports.push(PortRecord {
                number,
                name: record.name.clone(),
            });
        }
        ports.sort_by_key(|p| p.number);
        ports
    }
}

fn parse_component(tag: &TagLine) -> Result<ComponentRecord, FormatError> {
    split_fields(&tag.content)
        .and_then(|fields| component_from_fields(tag.line, &fields))
        .map_err(|reason| FormatError::malformed_line(tag.line, &tag.content, reason))
}

fn parse_wire(tag: &TagLine) -> Result<WireRecord, FormatError> {
    split_fields(&tag.content)
        .and_then(|fields| wire_from_fields(tag.line, &fields))
        .map_err(|reason| FormatError::malformed_line(tag.line, &tag.content, reason))
}

fn field<'f, 'a>(
    fields: &'f [Field<'a>],
    index: usize,
    name: &'static str,
) -> Result<&'f Field<'a>, LineError> {
    fields.get(index).ok_or(LineError::MissingField(name))
}

fn int_field(fields: &[Field<'_>], index: usize, name: &'static str) -> Result<i32, LineError> {
    field(fields, index, name)?.int(name)
}

fn component_from_fields(line: usize, fields: &[Field<'_>]) -> Result<ComponentRecord, LineError> {
    let type_name = field(fields, 0, "type")?.text.to_string();
    let name = field(fields, 1, "name")?.text.to_string();
    let active = int_field(fields, 2, "active")?;
    let x = int_field(fields, 3, "x")?;
    let y = int_field(fields, 4, "y")?;
    let tx = int_field(fields, 5, "tx")?;
    let ty = int_field(fields, 6, "ty")?;
    let mirror_x = int_field(fields, 7, "mirrorX")? != 0;
    let rotation = int_field(fields, 8, "rotate")?;
    if !(0..=3).contains(&rotation) {
        return Err(LineError::Grammar(format!(
            "rotation must be 0..3, got {rotation}"
        )));
    }

    // "value" display pairs; the display flag may be left out
    let mut properties: Vec<PropertyValue> = Vec::new();
    for field in &fields[9..] {
        if field.quoted {
            properties.push(PropertyValue {
                value: field.text.to_string(),
                visible: false,
            });
        } else if let Some(last) = properties.last_mut() {
            last.visible = field.int("display")? != 0;
        } else {
            return Err(LineError::Grammar(format!(
                "unexpected field '{}' before the first property value",
                field.text
            )));
        }
    }

    Ok(ComponentRecord {
        line,
        type_name,
        name,
        active,
        x,
        y,
        tx,
        ty,
        mirror_x,
        rotation: rotation as u8,
        properties,
    })
}

fn wire_from_fields(line: usize, fields: &[Field<'_>]) -> Result<WireRecord, LineError> {
    Ok(WireRecord {
        line,
        x1: int_field(fields, 0, "x1")?,
        y1: int_field(fields, 1, "y1")?,
        x2: int_field(fields, 2, "x2")?,
        y2: int_field(fields, 3, "y2")?,
        label: fields
            .get(4)
            .filter(|f| f.quoted && !f.text.is_empty())
            .map(|f| f.text.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running() -> VersionTriplet {
        VersionTriplet::new(1, 0, 0)
    }

    const DIVIDER: &str = r#"<Qucs Schematic 0.0.19>
<Properties>
  <View=0,0,800,800,1,0,0>
  <OpenDisplay=1>
</Properties>
<Symbol>
  <Line -20 -10 40 0 #000080 2 1>
  <.PortSym -30 0 1 0>
  <.PortSym 30 0 2 180>
</Symbol>
<Components>
  <Port P_in 1 100 100 -23 12 0 0 "1" 1 "analog" 0>
  <Port P_out 1 300 100 4 12 1 2 "2" 1 "analog" 0>
  <R R1 1 200 100 15 -26 0 1 "50 Ohm" 1 "26.85" 0 "european" 0>
  <GND * 1 200 200 0 0 0 0>
</Components>
<Wires>
  <100 100 170 100 "in" 120 70 0 "">
  <230 100 300 100 "" 0 0 0 "">
</Wires>
<Diagrams>
</Diagrams>
<Paintings>
</Paintings>
"#;

    #[test]
    fn test_parse_records() {
        let sch = Schematic::parse(DIVIDER, &running()).unwrap();
        assert_eq!(sch.property("OpenDisplay"), Some("1"));
        assert_eq!(sch.components().len(), 4);
        assert_eq!(sch.wires().len(), 2);
        assert!(sch.symbol().is_some());

        let r1 = &sch.components()[2];
        assert_eq!(r1.type_name, "R");
        assert_eq!(r1.name, "R1");
        assert_eq!((r1.x, r1.y, r1.rotation), (200, 100, 1));
        assert_eq!(r1.property(0), Some("50 Ohm"));
        assert!(r1.properties[0].visible);
        assert!(!r1.properties[1].visible);

        let out = &sch.components()[1];
        assert!(out.mirror_x);
        assert_eq!(out.rotation, 2);

        assert!(sch.components()[3].is_ground());
        assert_eq!(sch.wires()[0].label.as_deref(), Some("in"));
        assert_eq!(sch.wires()[1].label, None);
    }

    #[test]
    fn test_ports_sorted_by_number() {
        let text = "<Qucs Schematic 0.0.19>\n<Components>\n\
                    <Port B 1 0 0 0 0 0 0 \"2\" 1>\n\
                    <Port A 1 0 60 0 0 0 0 \"1\" 1>\n\
                    </Components>\n";
        let sch = Schematic::parse(text, &running()).unwrap();
        assert_eq!(
            sch.ports(),
            vec![
                PortRecord {
                    number: 1,
                    name: "A".into()
                },
                PortRecord {
                    number: 2,
                    name: "B".into()
                },
            ]
        );
    }

    #[test]
    fn test_no_symbol_section() {
        let sch = Schematic::parse("<Qucs Schematic 0.0.19>\n", &running()).unwrap();
        assert!(sch.symbol().is_none());
        assert!(sch.components().is_empty());
    }

    #[test]
    fn test_malformed_component_record() {
        let text = "<Qucs Schematic 0.0.19>\n<Components>\n<R R1 1 x 100 0 0 0 0>\n</Components>\n";
        assert_eq!(
            Schematic::parse(text, &running()),
            Err(FormatError::MalformedLine {
                line: 2,
                content: "R R1 1 x 100 0 0 0 0".to_string(),
                reason: LineError::NotAnInteger {
                    field: "x",
                    value: "x".to_string()
                },
            })
        );
    }

    #[test]
    fn test_truncated_wire_record() {
        let text = "<Qucs Schematic 0.0.19>\n<Wires>\n<0 0 10>\n</Wires>\n";
        assert!(matches!(
            Schematic::parse(text, &running()),
            Err(FormatError::MalformedLine {
                reason: LineError::MissingField("y2"),
                ..
            })
        ));
    }

    #[test]
    fn test_unterminated_components() {
        let text = "<Qucs Schematic 0.0.19>\n<Components>\n<R R1 1 0 0 0 0 0 0>\n";
        assert_eq!(
            Schematic::parse(text, &running()),
            Err(FormatError::UnterminatedSection {
                name: "Components".to_string()
            })
        );
    }
}

//! Line analyzer for the inside of `Symbol` sections.

use std::collections::BTreeMap;

use qucs_format::fields::{decode_escapes, split_fields, Field};
use qucs_format::LineError;

use crate::geometry::{offset, BoundsBuilder, Brush, Color, Pen, Shape};
use crate::symbol::{ParamDescriptor, Port, DEFAULT_PREFIX};

/// Accumulates the geometry of one symbol section, line by line.
#[derive(Debug, Default)]
pub struct SymbolAnalyzer {
    pub(crate) shapes: Vec<Shape>,
    /// Keyed by declared port number; numbers may leave gaps.
    pub(crate) ports: BTreeMap<u32, Port>,
    pub(crate) params: Vec<ParamDescriptor>,
    pub(crate) prefix: Option<String>,
    pub(crate) label: Option<(i32, i32)>,
    pub(crate) bounds: BoundsBuilder,
    pub(crate) elements: usize,
}

impl SymbolAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of drawable elements seen so far.
    pub fn elements(&self) -> usize {
        self.elements
    }

    pub fn prefix(&self) -> &str {
        self.prefix.as_deref().unwrap_or(DEFAULT_PREFIX)
    }

    /// Analyse the interior of one `<...>` line and return how many drawable
    /// elements it produced.
    pub fn analyse(&mut self, content: &str) -> Result<usize, LineError> {
        let fields = split_fields(content)?;
        let Some(head) = fields.first() else {
            return Err(LineError::MissingField("element"));
        };
        let args = &fields[1..];

        let produced = match head.text {
            ".PortSym" => {
                self.port_sym(args)?;
                0
            }
            ".ID" => {
                self.id(args)?;
                0
            }
            "Line" => {
                let (x, y) = (int(args, 0, "x")?, int(args, 1, "y")?);
                let (dx, dy) = (int(args, 2, "dx")?, int(args, 3, "dy")?);
                self.push(Shape::Line {
                    x1: x,
                    y1: y,
                    x2: offset(x, dx, "dx")?,
                    y2: offset(y, dy, "dy")?,
                    pen: pen(args, 4)?,
                })?
            }
            "Arc" | "EArc" => self.push(Shape::Arc {
                x: int(args, 0, "x")?,
                y: int(args, 1, "y")?,
                w: int(args, 2, "w")?,
                h: int(args, 3, "h")?,
                start: int(args, 4, "start")?,
                span: int(args, 5, "span")?,
                pen: pen(args, 6)?,
                elliptic: head.text == "EArc",
            })?,
            "Rectangle" => {
                let (x, y, w, h) = rect(args)?;
                self.push(Shape::Rectangle {
                    x,
                    y,
                    w,
                    h,
                    pen: pen(args, 4)?,
                    brush: brush(args, 7)?,
                })?
            }
            "Ellipse" => {
                let (x, y, w, h) = rect(args)?;
                self.push(Shape::Ellipse {
                    x,
                    y,
                    w,
                    h,
                    pen: pen(args, 4)?,
                    brush: brush(args, 7)?,
                })?
            }
            "Text" => {
                let text = args.get(5).ok_or(LineError::MissingField("text"))?;
                if !text.quoted || text.text.is_empty() {
                    return Err(LineError::Grammar("text element without text".into()));
                }
                self.push(Shape::Text {
                    x: int(args, 0, "x")?,
                    y: int(args, 1, "y")?,
                    size: int(args, 2, "size")?,
                    color: color(args, 3)?,
                    angle: int(args, 4, "angle")?,
                    text: decode_escapes(text.text),
                })?
            }
            other => {
                log::trace!("Ignoring unknown symbol element '{other}'");
                0
            }
        };

        Ok(produced)
    }

    fn push(&mut self, shape: Shape) -> Result<usize, LineError> {
        shape.extend(&mut self.bounds)?;
        self.shapes.push(shape);
        self.elements += 1;
        Ok(1)
    }

    fn port_sym(&mut self, args: &[Field<'_>]) -> Result<(), LineError> {
        let x = int(args, 0, "x")?;
        let y = int(args, 1, "y")?;
        let number = int(args, 2, "number")?;
        let angle = match args.get(3) {
            Some(field) => field.int("angle")?,
            None => 0,
        };
        if number < 1 {
            return Err(LineError::Grammar(format!(
                "port number must be at least 1, got {number}"
            )));
        }

        let number = number as u32;
        if self.ports.contains_key(&number) {
            return Err(LineError::Grammar(format!("port {number} declared twice")));
        }
        self.ports.insert(
            number,
            Port {
                number,
                name: None,
                x,
                y,
                angle,
            },
        );
        self.bounds.point(x, y);
        Ok(())
    }

    fn id(&mut self, args: &[Field<'_>]) -> Result<(), LineError> {
        self.label = Some((int(args, 0, "x")?, int(args, 1, "y")?));
        if let Some(prefix) = args.get(2).filter(|f| !f.quoted) {
            self.prefix = Some(prefix.text.to_string());
        }
        for field in args.iter().skip(2).filter(|f| f.quoted) {
            self.params.push(param_descriptor(field.text)?);
        }
        Ok(())
    }
}

/// `"1=Name=Value=Description="`: visibility flag, then `=`-separated parts.
fn param_descriptor(text: &str) -> Result<ParamDescriptor, LineError> {
    let mut parts = text.splitn(4, '=');
    let visible = match parts.next() {
        Some("1") => true,
        Some("0") => false,
        _ => {
            return Err(LineError::Grammar(format!(
                "parameter '{text}' lacks a visibility flag"
            )));
        }
    };
    let name = parts
        .next()
        .filter(|n| !n.is_empty())
        .ok_or(LineError::MissingField("parameter name"))?;
    let value = parts.next().unwrap_or_default();
    let description = parts.next().unwrap_or_default();
    Ok(ParamDescriptor::new(
        name,
        value,
        visible,
        description.strip_suffix('=').unwrap_or(description),
    ))
}

fn int(args: &[Field<'_>], index: usize, name: &'static str) -> Result<i32, LineError> {
    args.get(index).ok_or(LineError::MissingField(name))?.int(name)
}

fn color(args: &[Field<'_>], index: usize) -> Result<Color, LineError> {
    let field = args.get(index).ok_or(LineError::MissingField("color"))?;
    Color::parse(field.text)
}

fn rect(args: &[Field<'_>]) -> Result<(i32, i32, i32, i32), LineError> {
    Ok((
        int(args, 0, "x")?,
        int(args, 1, "y")?,
        int(args, 2, "w")?,
        int(args, 3, "h")?,
    ))
}

fn pen(args: &[Field<'_>], at: usize) -> Result<Pen, LineError> {
    Ok(Pen {
        color: color(args, at)?,
        width: int(args, at + 1, "width")?,
        style: int(args, at + 2, "style")?,
    })
}

fn brush(args: &[Field<'_>], at: usize) -> Result<Brush, LineError> {
    Ok(Brush {
        color: color(args, at)?,
        style: int(args, at + 1, "fill style")?,
        filled: int(args, at + 2, "filled")? != 0,
    })
}

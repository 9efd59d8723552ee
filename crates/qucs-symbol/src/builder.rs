use qucs_format::schematic::PortRecord;
use qucs_format::{FormatError, Section};

use crate::analyse::SymbolAnalyzer;
use crate::geometry::{BoundingBox, Shape};
use crate::symbol::{Port, Symbol, SymbolOrigin, DEFAULT_PREFIX};

/// Margin added around the extent of stored geometry.
pub const BOUNDS_MARGIN: i32 = 4;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SymbolError {
    #[error("no symbol section")]
    Missing,
    #[error("symbol section has no drawable elements")]
    Empty,
    #[error(transparent)]
    Format(#[from] FormatError),
}

/// What to draw when no usable stored symbol exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fallback {
    /// Generated box with this many ports.
    Default { ports: usize },
    /// Fixed rectangle.
    Placeholder,
}

/// Builds the symbol of one component type.
#[derive(Debug, Clone)]
pub struct SymbolBuilder {
    type_name: String,
    port_names: Vec<PortRecord>,
    fallback: Fallback,
}

impl SymbolBuilder {
    /// Builder for a subcircuit whose schematic declares `ports`.
    pub fn subcircuit(type_name: impl Into<String>, ports: Vec<PortRecord>) -> Self {
        let fallback = Fallback::Default { ports: ports.len() };
        Self {
            type_name: type_name.into(),
            port_names: ports,
            fallback,
        }
    }

    /// Builder for a library component; falls back to the placeholder.
    pub fn library(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            port_names: Vec::new(),
            fallback: Fallback::Placeholder,
        }
    }

    /// Load the symbol stored in `section`.
    ///
    /// Any malformed line fails the whole section; ports whose numbers were
    /// skipped are dropped, the remaining ones keep their declared numbers.
    pub fn load(&self, section: &Section) -> Result<Symbol, SymbolError> {
        let mut analyzer = SymbolAnalyzer::new();
        for tag in section.tag_lines()? {
            analyzer
                .analyse(&tag.content)
                .map_err(|reason| FormatError::MalformedLine {
                    line: tag.line,
                    content: tag.content.clone(),
                    reason,
                })?;
        }

        if analyzer.elements() == 0 {
            return Err(SymbolError::Empty);
        }

        let bounds = analyzer.bounds.finish(BOUNDS_MARGIN);
        let (tx, ty) = analyzer
            .label
            .unwrap_or((bounds.x1.saturating_add(4), bounds.y2.saturating_add(4)));

        // numbers up to the highest one are expected; the gaps are pruned
        let declared = analyzer.ports.keys().next_back().map_or(0, |&n| n as usize);
        let ports: Vec<Port> = analyzer
            .ports
            .into_values()
            .map(|mut port| {
                port.name = self.port_name(port.number);
                port
            })
            .collect();
        if ports.len() < declared {
            log::debug!(
                "{}: pruned {} unavailable ports",
                self.type_name,
                declared - ports.len()
            );
        }

        log::trace!(
            "{}: loaded {} elements, {} ports",
            self.type_name,
            analyzer.elements,
            ports.len()
        );

        Ok(Symbol {
            type_name: self.type_name.clone(),
            prefix: analyzer
                .prefix
                .unwrap_or_else(|| DEFAULT_PREFIX.to_string()),
            ports,
            params: analyzer.params,
            shapes: analyzer.shapes,
            bounds,
            tx,
            ty,
            origin: SymbolOrigin::Stored,
        })
    }

    /// Load `section` when there is one, otherwise (or when loading fails)
    /// produce the fallback symbol.
    pub fn build(&self, section: Option<&Section>) -> Symbol {
        let loaded = match section {
            Some(section) => self.load(section),
            None => Err(SymbolError::Missing),
        };
        match loaded {
            Ok(symbol) => symbol,
            Err(e) => {
                log::debug!("{}: using fallback symbol ({e})", self.type_name);
                self.fallback()
            }
        }
    }

    pub fn fallback(&self) -> Symbol {
        let mut symbol = match self.fallback {
            Fallback::Default { ports } => default_symbol(&self.type_name, ports),
            Fallback::Placeholder => library_placeholder(&self.type_name),
        };
        for port in &mut symbol.ports {
            port.name = self.port_name(port.number);
        }
        symbol
    }

    fn port_name(&self, number: u32) -> Option<String> {
        self.port_names
            .iter()
            .find(|p| p.number == number)
            .map(|p| p.name.clone())
    }
}

/// Generated symbol for a subcircuit with `ports` ports.
///
/// A box of half height `h = 30 * ((n - 1) / 2) + 15`; ports alternate left
/// then right, 60 units apart, starting at `y = 15 - h`.
pub fn default_symbol(type_name: &str, ports: usize) -> Symbol {
    let n = ports as i32;
    // integer division truncates towards zero, so n = 0 gives h = 15
    let h = 30 * ((n - 1) / 2) + 15;

    let mut shapes = vec![
        Shape::line(-15, -h, 15, -h),
        Shape::line(15, -h, 15, h),
        Shape::line(-15, h, 15, h),
        Shape::line(-15, -h, -15, h),
        Shape::text(-10, -6, "sub"),
    ];
    let mut symbol_ports = Vec::with_capacity(ports);

    let mut i = 0;
    let mut y = 15 - h;
    while i < n {
        i += 1;
        shapes.push(Shape::line(-30, y, -15, y));
        symbol_ports.push(generated_port(i, -30, y, 0));
        shapes.push(Shape::text(-25, y - 14, i.to_string()));

        if i == n {
            break;
        }
        i += 1;
        shapes.push(Shape::line(15, y, 30, y));
        symbol_ports.push(generated_port(i, 30, y, 180));
        shapes.push(Shape::text(19, y - 14, i.to_string()));
        y += 60;
    }

    let bounds = BoundingBox {
        x1: -30,
        y1: -h - 2,
        x2: 30,
        y2: h + 2,
    };
    Symbol {
        type_name: type_name.to_string(),
        prefix: DEFAULT_PREFIX.to_string(),
        ports: symbol_ports,
        params: Vec::new(),
        shapes,
        tx: bounds.x1 + 4,
        ty: bounds.y2 + 4,
        bounds,
        origin: SymbolOrigin::Default,
    }
}

/// A 30x30 rectangle for library components without any stored symbol.
pub fn library_placeholder(type_name: &str) -> Symbol {
    let bounds = BoundingBox {
        x1: -18,
        y1: -18,
        x2: 18,
        y2: 18,
    };
    Symbol {
        type_name: type_name.to_string(),
        prefix: DEFAULT_PREFIX.to_string(),
        ports: Vec::new(),
        params: Vec::new(),
        shapes: vec![
            Shape::line(-15, -15, 15, -15),
            Shape::line(15, -15, 15, 15),
            Shape::line(-15, 15, 15, 15),
            Shape::line(-15, -15, -15, 15),
        ],
        tx: bounds.x1 + 4,
        ty: bounds.y2 + 4,
        bounds,
        origin: SymbolOrigin::Placeholder,
    }
}

fn generated_port(number: i32, x: i32, y: i32, angle: i32) -> Port {
    Port {
        number: number as u32,
        name: None,
        x,
        y,
        angle,
    }
}

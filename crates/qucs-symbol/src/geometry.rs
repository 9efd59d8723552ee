use std::fmt;

use qucs_format::LineError;
use serde::{Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const DARK_BLUE: Color = Color::rgb(0, 0, 0x80);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rrggbb` or one of the named colours the editor writes.
    pub fn parse(text: &str) -> Result<Self, LineError> {
        let invalid = || LineError::InvalidColor(text.to_string());

        if let Some(hex) = text.strip_prefix('#') {
            if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(invalid());
            }
            let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
            return Ok(Color::rgb(channel(0)?, channel(2)?, channel(4)?));
        }

        let color = match text.to_ascii_lowercase().as_str() {
            "black" => Color::BLACK,
            "white" => Color::rgb(0xff, 0xff, 0xff),
            "red" => Color::rgb(0xff, 0, 0),
            "green" => Color::rgb(0, 0xff, 0),
            "blue" => Color::rgb(0, 0, 0xff),
            "darkblue" => Color::DARK_BLUE,
            "darkred" => Color::rgb(0x80, 0, 0),
            "darkgreen" => Color::rgb(0, 0x80, 0),
            "gray" | "grey" => Color::rgb(0xa0, 0xa0, 0xa4),
            "darkgray" | "darkgrey" => Color::rgb(0x80, 0x80, 0x80),
            _ => return Err(invalid()),
        };
        Ok(color)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pen {
    pub color: Color,
    pub width: i32,
    pub style: i32,
}

impl Pen {
    /// Solid dark blue, width 2: the pen of every generated symbol.
    pub const SYMBOL: Pen = Pen {
        color: Color::DARK_BLUE,
        width: 2,
        style: 1,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Brush {
    pub color: Color,
    pub style: i32,
    pub filled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Shape {
    Line {
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        pen: Pen,
    },
    Arc {
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        /// Start angle and span in 1/16 degree.
        start: i32,
        span: i32,
        pen: Pen,
        elliptic: bool,
    },
    Rectangle {
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        pen: Pen,
        brush: Brush,
    },
    Ellipse {
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        pen: Pen,
        brush: Brush,
    },
    Text {
        x: i32,
        y: i32,
        size: i32,
        color: Color,
        angle: i32,
        text: String,
    },
}

impl Shape {
    pub fn line(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Shape::Line {
            x1,
            y1,
            x2,
            y2,
            pen: Pen::SYMBOL,
        }
    }

    pub fn text(x: i32, y: i32, text: impl Into<String>) -> Self {
        Shape::Text {
            x,
            y,
            size: 10,
            color: Color::BLACK,
            angle: 0,
            text: text.into(),
        }
    }

    /// Feed the extent of this shape into `bounds`. Fails when the far
    /// corner does not fit the coordinate range.
    pub fn extend(&self, bounds: &mut BoundsBuilder) -> Result<(), LineError> {
        match self {
            Shape::Line { x1, y1, x2, y2, .. } => {
                bounds.point(*x1, *y1);
                bounds.point(*x2, *y2);
            }
            Shape::Arc { x, y, w, h, .. }
            | Shape::Rectangle { x, y, w, h, .. }
            | Shape::Ellipse { x, y, w, h, .. } => {
                bounds.point(*x, *y);
                bounds.point(offset(*x, *w, "w")?, offset(*y, *h, "h")?);
            }
            Shape::Text {
                x, y, size, text, ..
            } => {
                let (w, h) = text_extent(text, *size).ok_or(LineError::OutOfRange("size"))?;
                bounds.point(*x, *y);
                bounds.point(offset(*x, w, "size")?, offset(*y, h, "size")?);
            }
        }
        Ok(())
    }
}

/// `from + by`, or an error naming `field` when it overflows.
pub fn offset(from: i32, by: i32, field: &'static str) -> Result<i32, LineError> {
    from.checked_add(by).ok_or(LineError::OutOfRange(field))
}

/// Glyph box of `text` at font `size`: `0.6 * size` per character of the
/// longest line, `size` per line, rounded up. `None` when it does not fit
/// in an `i32`.
pub fn text_extent(text: &str, size: i32) -> Option<(i32, i32)> {
    let longest = text.lines().map(|l| l.chars().count()).max().unwrap_or(0) as i64;
    let lines = text.lines().count().max(1) as i64;
    let size = i64::from(size);
    let w = (6 * size * longest + 9) / 10;
    Some((i32::try_from(w).ok()?, i32::try_from(size * lines).ok()?))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BoundingBox {
    pub fn is_valid(&self) -> bool {
        self.x1 < self.x2 && self.y1 < self.y2
    }

    pub fn width(&self) -> i32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> i32 {
        self.y2 - self.y1
    }
}

/// Running min/max over the points of a symbol.
#[derive(Debug, Clone, Default)]
pub struct BoundsBuilder {
    extent: Option<BoundingBox>,
}

impl BoundsBuilder {
    pub fn point(&mut self, x: i32, y: i32) {
        let b = self.extent.get_or_insert(BoundingBox {
            x1: x,
            y1: y,
            x2: x,
            y2: y,
        });
        b.x1 = b.x1.min(x);
        b.y1 = b.y1.min(y);
        b.x2 = b.x2.max(x);
        b.y2 = b.y2.max(y);
    }

    pub fn is_empty(&self) -> bool {
        self.extent.is_none()
    }

    /// Enlarge the collected extent by `margin` on every side. Without any
    /// point the box is centred on the origin, so it is never degenerate
    /// for a positive margin.
    pub fn finish(&self, margin: i32) -> BoundingBox {
        let b = self.extent.unwrap_or(BoundingBox {
            x1: 0,
            y1: 0,
            x2: 0,
            y2: 0,
        });
        BoundingBox {
            x1: b.x1.saturating_sub(margin),
            y1: b.y1.saturating_sub(margin),
            x2: b.x2.saturating_add(margin),
            y2: b.y2.saturating_add(margin),
        }
    }
}

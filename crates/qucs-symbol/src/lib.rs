//! Symbols of Qucs components.
//!
//! A symbol is either loaded from a stored `Symbol` section, generated from
//! a port count, or a fixed placeholder for library components.

pub mod analyse;
pub mod builder;
pub mod geometry;
pub mod symbol;

pub use builder::{
    default_symbol, library_placeholder, Fallback, SymbolBuilder, SymbolError, BOUNDS_MARGIN,
};
pub use geometry::{BoundingBox, Brush, Color, Pen, Shape};
pub use symbol::{DEFAULT_PREFIX, ParamDescriptor, Port, Symbol, SymbolOrigin};

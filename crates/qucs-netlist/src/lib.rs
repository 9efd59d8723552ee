//! Netlist text for resolved Qucs instances, in the flat Qucs, VHDL and
//! Verilog dialects.

pub mod dialect;
pub mod naming;
pub mod writer;

mod error;

pub use dialect::{Dialect, UnknownDialect};
pub use error::EmitError;
pub use naming::{proper_name, verilog_param};
pub use writer::{emit, netlist_type, NetlistWriter};

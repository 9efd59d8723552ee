use std::fmt;
use std::str::FromStr;

/// Target text format of a netlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Dialect {
    /// Flat Qucs netlist.
    #[default]
    Qucs,
    Vhdl,
    Verilog,
}

impl Dialect {
    pub const ALL: [Dialect; 3] = [Dialect::Qucs, Dialect::Vhdl, Dialect::Verilog];

    /// Library section holding a component's model in this dialect.
    pub fn model_section(self) -> &'static str {
        match self {
            Dialect::Qucs => "Model",
            Dialect::Vhdl => "VHDLModel",
            Dialect::Verilog => "VerilogModel",
        }
    }

    pub fn comment_prefix(self) -> &'static str {
        match self {
            Dialect::Qucs => "#",
            Dialect::Vhdl => "--",
            Dialect::Verilog => "//",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Dialect::Qucs => "qucs",
            Dialect::Vhdl => "vhdl",
            Dialect::Verilog => "verilog",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown netlist dialect '{0}', expected qucs, vhdl or verilog")]
pub struct UnknownDialect(pub String);

impl FromStr for Dialect {
    type Err = UnknownDialect;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Dialect::ALL
            .into_iter()
            .find(|d| d.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownDialect(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!("qucs".parse(), Ok(Dialect::Qucs));
        assert_eq!("VHDL".parse(), Ok(Dialect::Vhdl));
        assert_eq!(" verilog ".parse(), Ok(Dialect::Verilog));
        assert_eq!(
            "spice".parse::<Dialect>(),
            Err(UnknownDialect("spice".to_string()))
        );
    }

    #[test]
    fn test_model_sections() {
        let sections: Vec<_> = Dialect::ALL.iter().map(|d| d.model_section()).collect();
        assert_eq!(sections, qucs_core::session::MODEL_SECTIONS);
    }
}

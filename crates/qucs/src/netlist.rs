use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use qucs_core::Session;
use qucs_netlist::{Dialect, NetlistWriter};

#[derive(Args, Debug)]
pub struct NetlistArgs {
    /// Top-level schematic
    #[arg(value_name = "SCHEMATIC", value_hint = clap::ValueHint::FilePath)]
    pub path: PathBuf,

    /// qucs, vhdl or verilog; defaults to the configured dialect
    #[arg(long)]
    pub dialect: Option<Dialect>,

    /// Write the netlist to a file instead of stdout
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub output: Option<PathBuf>,
}

pub fn execute(args: NetlistArgs, session: &Session) -> Result<()> {
    let dialect = match args.dialect {
        Some(dialect) => dialect,
        None => session.config().netlist.dialect.parse()?,
    };

    let doc = session
        .load_schematic(&args.path)
        .with_context(|| format!("failed to load {}", args.path.display()))?;
    for instance in doc.unresolved() {
        if let Some(e) = instance.error() {
            crate::warn(format!("{}: {e}", instance.name()));
        }
    }

    // Generate into memory so a failed pass leaves no partial file behind
    let mut buf: Vec<u8> = Vec::new();
    NetlistWriter::for_session(session, dialect)
        .write_document(&doc, &mut buf)
        .with_context(|| format!("{dialect} netlist generation failed for {}", args.path.display()))?;

    match &args.output {
        Some(output) => {
            let file = File::create(output)
                .with_context(|| format!("failed to create {}", output.display()))?;
            let mut out = BufWriter::new(file);
            out.write_all(&buf)?;
            out.flush()?;
        }
        None => std::io::stdout().write_all(&buf)?,
    }
    Ok(())
}

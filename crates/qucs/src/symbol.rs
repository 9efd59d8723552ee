use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use qucs_core::Session;

#[derive(Args, Debug)]
pub struct SymbolArgs {
    /// Subcircuit schematic
    #[arg(value_name = "SCHEMATIC", value_hint = clap::ValueHint::FilePath, required_unless_present = "lib")]
    pub path: Option<PathBuf>,

    /// Library name, searched in the configured library directories
    #[arg(long, requires = "component", conflicts_with = "path")]
    pub lib: Option<String>,

    /// Component of the library given with --lib
    #[arg(long, requires = "lib")]
    pub component: Option<String>,
}

pub fn execute(args: SymbolArgs, session: &Session) -> Result<()> {
    let prototype = match (&args.lib, &args.component, &args.path) {
        (Some(lib), Some(component), _) => session
            .resolve_library_component(lib, component)
            .with_context(|| format!("failed to resolve {component} from library {lib}"))?,
        (_, _, Some(path)) => session
            .resolve_subcircuit(&path.to_string_lossy(), None)
            .with_context(|| format!("failed to resolve {}", path.display()))?,
        _ => anyhow::bail!("expected a schematic or --lib and --component"),
    };

    let json = serde_json::to_string_pretty(prototype.symbol())?;
    println!("{json}");
    Ok(())
}

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use env_logger::Env;
use qucs_core::{DefaultFileProvider, Session, SessionConfig};

mod index;
mod netlist;
mod section;
mod symbol;

/// Looked up in the working directory when `--config` is not given.
const CONFIG_FILE: &str = "qucs.toml";

#[derive(Parser)]
#[command(name = "qucs")]
#[command(about = "Resolve Qucs subcircuits and library components", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short = 'd', long = "debug", global = true, hide = true)]
    debug: bool,

    /// Session configuration file
    #[arg(long, global = true, value_name = "FILE", value_hint = clap::ValueHint::FilePath)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the symbol of a subcircuit or library component as JSON
    #[command(alias = "s")]
    Symbol(symbol::SymbolArgs),

    /// Print one section of a library component
    Section(section::SectionArgs),

    /// Write the netlist of a schematic
    #[command(alias = "n")]
    Netlist(netlist::NetlistArgs),

    /// Scan directories for schematics and list the name index
    Index(index::IndexArgs),
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{} {e}", "Error:".red());
        for cause in e.chain().skip(1) {
            eprintln!("  {cause}");
        }
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let env = if cli.debug {
        Env::default().default_filter_or("debug")
    } else {
        Env::default().default_filter_or("error")
    };
    env_logger::Builder::from_env(env).init();

    let session = Session::new(load_config(cli.config.as_deref())?);

    match cli.command {
        Commands::Symbol(args) => symbol::execute(args, &session),
        Commands::Section(args) => section::execute(args, &session),
        Commands::Netlist(args) => netlist::execute(args, &session),
        Commands::Index(args) => index::execute(args, &session),
    }
}

fn load_config(path: Option<&Path>) -> Result<SessionConfig> {
    let provider = DefaultFileProvider::new();
    let config = match path {
        Some(path) => SessionConfig::from_file(&provider, path)?,
        None if Path::new(CONFIG_FILE).is_file() => {
            SessionConfig::from_file(&provider, Path::new(CONFIG_FILE))?
        }
        None => SessionConfig::default(),
    };
    let config = config.with_env();
    log::debug!("Library directories: {:?}", config.library_dirs);
    Ok(config)
}

/// Print resolution failures recorded on instances; they do not stop a
/// command.
pub(crate) fn warn(message: impl std::fmt::Display) {
    eprintln!("{} {message}", "Warning:".yellow());
}

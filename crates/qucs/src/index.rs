use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use qucs_core::config::expand_home;
use qucs_core::locator::spawn_scan;
use qucs_core::Session;

#[derive(Args, Debug)]
pub struct IndexArgs {
    /// Directories to scan in addition to the configured project directories
    #[arg(value_name = "DIR", value_hint = clap::ValueHint::DirPath)]
    pub dirs: Vec<PathBuf>,
}

pub fn execute(args: IndexArgs, session: &Session) -> Result<()> {
    if args.dirs.is_empty() && session.config().project_dirs.is_empty() {
        anyhow::bail!("no directories to scan; pass some or set project_dirs in qucs.toml");
    }

    // the configured project directories are scanned by the session itself
    let mut added = session.wait_for_index();
    let extra: Vec<PathBuf> = args.dirs.iter().map(|d| expand_home(d)).collect();
    if !extra.is_empty() {
        added += spawn_scan(session.index().clone(), extra)
            .join()
            .map_err(|_| anyhow::anyhow!("schematic scan panicked"))?;
    }
    log::debug!("Indexed {added} schematics");

    for (name, path) in session.index().entries() {
        println!("{name}\t{}", path.display());
    }
    Ok(())
}

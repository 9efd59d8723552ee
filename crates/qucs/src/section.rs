use anyhow::{Context, Result};
use clap::Args;
use qucs_core::Session;

#[derive(Args, Debug)]
pub struct SectionArgs {
    /// Library name or path
    pub lib: String,

    /// Component name
    pub component: String,

    /// Section name, e.g. Model, VHDLModel, Symbol
    pub section: String,
}

pub fn execute(args: SectionArgs, session: &Session) -> Result<()> {
    let section = session
        .library_section(&args.lib, &args.component, &args.section)
        .with_context(|| {
            format!(
                "failed to read section {} of {} in {}",
                args.section, args.component, args.lib
            )
        })?;

    if section.from_default {
        log::debug!("{} has no {} of its own", args.component, args.section);
    }
    for include in &section.includes {
        log::debug!("includes {include}");
    }
    println!("{}", section.text());
    Ok(())
}

//! `locus config`

use anyhow::{Context, Result};
use locus_core::LocusConfig;

pub fn show_config(config: &LocusConfig) -> Result<()> {
    let rendered = toml::to_string_pretty(config).context("rendering config")?;
    println!("{rendered}");
    Ok(())
}

//! Config command: write the default file if missing and show the result.

use anyhow::{Context, Result};
use oapp_core::config::OAppConfig;

pub fn cmd_config() -> Result<()> {
    let path = OAppConfig::write_default_if_missing()?;
    let config = OAppConfig::load()?;
    let text = toml::to_string_pretty(&config).context("failed to render config")?;

    println!("# {}", path.display());
    println!("{}", text);
    Ok(())
}

//! CLI command modules.

pub mod command;
pub mod config;
pub mod options;
pub mod peers;

use anyhow::{Context, Result};

/// Decode hex with an optional `0x` prefix.
pub fn parse_hex(text: &str) -> Result<Vec<u8>> {
    let trimmed = text.strip_prefix("0x").unwrap_or(text);
    hex::decode(trimmed).with_context(|| format!("invalid hex: {}", text))
}

pub fn parse_num<T: std::str::FromStr>(text: &str, what: &str) -> Result<T> {
    text.parse()
        .ok()
        .with_context(|| format!("{} must be a number, got {:?}", what, text))
}

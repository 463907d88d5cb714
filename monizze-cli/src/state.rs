use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// `$MONIZZE_HOME`, or `~/.monizze`.
pub fn monizze_home() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os("MONIZZE_HOME").filter(|d| !d.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".monizze"))
}

pub fn ensure_monizze_home() -> Result<PathBuf> {
    let dir = monizze_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

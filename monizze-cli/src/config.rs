use anyhow::{Context, Result};
use monizze_fetch::{DEFAULT_BASE_URL, DEFAULT_HISTORY_PATH, DEFAULT_MAX_PAGES, FetchConfig, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::state::ensure_monizze_home;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub api: ApiSection,
    pub retry: RetrySection,
    pub export: ExportSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSection {
    pub base_url: String,
    pub history_path: String,
    /// 0 lets the server pick
    pub page_size: u32,
    /// Ceiling on pages per run; a history that does not end by then is an error
    pub max_pages: usize,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySection {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSection {
    pub output: PathBuf,
    pub quote_all: bool,
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            history_path: DEFAULT_HISTORY_PATH.to_string(),
            page_size: 50,
            max_pages: DEFAULT_MAX_PAGES,
            timeout_secs: 30,
        }
    }
}

impl Default for RetrySection {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            base_delay_ms: policy.base_delay.as_millis() as u64,
            max_delay_ms: policy.max_delay.as_millis() as u64,
        }
    }
}

impl Default for ExportSection {
    fn default() -> Self {
        Self {
            output: PathBuf::from("monizze.csv"),
            quote_all: false,
        }
    }
}

impl Config {
    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            base_url: self.api.base_url.clone(),
            history_path: self.api.history_path.clone(),
            page_size: self.api.page_size,
            timeout: Duration::from_secs(self.api.timeout_secs.max(1)),
            retry: RetryPolicy {
                max_attempts: self.retry.max_attempts.max(1),
                base_delay: Duration::from_millis(self.retry.base_delay_ms),
                max_delay: Duration::from_millis(self.retry.max_delay_ms),
            },
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_monizze_home()?.join("config.toml"))
}

pub fn load_config_from(p: &Path) -> Result<Config> {
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(p).with_context(|| format!("read {}", p.display()))?;
    toml::from_str(&s).with_context(|| format!("parse {}", p.display()))
}

pub fn load_config() -> Result<Config> {
    load_config_from(&config_path()?)
}

pub fn save_config(cfg: &Config) -> Result<()> {
    let p = config_path()?;
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config(&Config::default())?;
    println!("Wrote {}", p.display());
    Ok(())
}

pub fn show_config() -> Result<()> {
    let cfg = load_config()?;
    print!("{}", toml::to_string_pretty(&cfg).context("serialize config")?);
    Ok(())
}

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use limbu_core::{default_catalog, EntryDefaults, MonthKey};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::llm::Provider;
use crate::state::Paths;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub stall: StallSection,
    pub defaults: EntryDefaults,
    pub store: StoreSection,
    pub llm: LlmSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StallSection {
    pub name: String,
    pub currency: String,
    /// IANA zone deciding "today" and the default dashboard month
    pub timezone: String,
    pub snacks: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    /// Records blob; defaults to ~/.limbu/limbu_stall_records.json
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    pub provider: Provider,
    pub model: String,
    /// Provider default when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    pub temperature: f32,
}

impl Default for StallSection {
    fn default() -> Self {
        Self {
            name: "LimbuTrack".to_string(),
            currency: "₹".to_string(),
            timezone: "Asia/Kolkata".to_string(),
            snacks: default_catalog(),
        }
    }
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: Provider::Gemini,
            model: "gemini-2.5-flash".to_string(),
            base_url: None,
            temperature: 0.4,
        }
    }
}

impl LlmSection {
    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.provider.default_base_url())
    }
}

impl Config {
    pub fn timezone(&self) -> Result<Tz> {
        self.stall
            .timezone
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid timezone in config: {}", self.stall.timezone))
    }

    /// Today's date at the stall.
    pub fn today(&self) -> Result<NaiveDate> {
        Ok(Utc::now().with_timezone(&self.timezone()?).date_naive())
    }

    pub fn current_month(&self) -> Result<MonthKey> {
        Ok(MonthKey::of(self.today()?))
    }

    pub fn catalog(&self) -> Vec<String> {
        if self.stall.snacks.is_empty() {
            default_catalog()
        } else {
            self.stall.snacks.clone()
        }
    }

    pub fn store_path(&self, paths: &Paths) -> PathBuf {
        match &self.store.path {
            Some(p) => expand_tilde(p),
            None => paths.default_store_path(),
        }
    }
}

fn expand_tilde(p: &str) -> PathBuf {
    if let Some(rest) = p.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(p)
}

pub fn load_config(paths: &Paths) -> Result<Config> {
    let p = paths.config_path();
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    toml::from_str(&s).with_context(|| format!("parse {}", p.display()))
}

pub fn save_config(paths: &Paths, cfg: &Config) -> Result<()> {
    paths.ensure_home()?;
    let p = paths.config_path();
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config(paths: &Paths) -> Result<()> {
    let p = paths.config_path();
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config(paths, &Config::default())?;
    println!("Wrote {}", p.display());
    Ok(())
}

pub fn show_config(paths: &Paths) -> Result<()> {
    let cfg = load_config(paths)?;
    println!("# {}", paths.config_path().display());
    println!("# records: {}\n", cfg.store_path(paths).display());
    print!("{}", toml::to_string_pretty(&cfg).context("serialize config")?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_fills_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            [stall]
            currency = "Rs."

            [defaults]
            lemonade_rate = 25.0
            lemon_price = 6.0
            ice_price = 20.0
            sugar_price = 45.0
            snack_sell_price = 10.0
            snack_buy_price = 5.0

            [llm]
            provider = "openai"
            model = "gpt-4o-mini"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.stall.currency, "Rs.");
        assert_eq!(cfg.stall.timezone, "Asia/Kolkata");
        assert_eq!(cfg.catalog().len(), 4);
        assert_eq!(cfg.defaults.lemonade_rate, 25.0);
        assert_eq!(cfg.llm.provider, Provider::Openai);
        assert_eq!(cfg.llm.base_url(), "https://api.openai.com");
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::resolve(Some(dir.path().to_path_buf())).unwrap();
        let mut cfg = Config::default();
        cfg.stall.snacks = vec!["Samosa".to_string()];
        save_config(&paths, &cfg).unwrap();

        let loaded = load_config(&paths).unwrap();
        assert_eq!(loaded.catalog(), vec!["Samosa".to_string()]);
        assert_eq!(loaded.store_path(&paths), paths.default_store_path());
    }

    #[test]
    fn test_bad_timezone_is_an_error() {
        let mut cfg = Config::default();
        cfg.stall.timezone = "Mars/Olympus".to_string();
        assert!(cfg.today().is_err());
    }
}

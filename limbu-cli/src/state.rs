use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Locations of everything limbu keeps on disk.
#[derive(Debug, Clone)]
pub struct Paths {
    home: PathBuf,
}

impl Paths {
    /// `--home` if given, else `~/.limbu`.
    pub fn resolve(home_override: Option<PathBuf>) -> Result<Self> {
        let home = match home_override {
            Some(h) => h,
            None => {
                let home = std::env::var("HOME").context("HOME is not set")?;
                PathBuf::from(home).join(".limbu")
            }
        };
        Ok(Self { home })
    }

    pub fn ensure_home(&self) -> Result<&Path> {
        fs::create_dir_all(&self.home).with_context(|| format!("create {}", self.home.display()))?;
        Ok(&self.home)
    }

    pub fn config_path(&self) -> PathBuf {
        self.home.join("config.toml")
    }

    pub fn auth_path(&self) -> PathBuf {
        self.home.join("auth.json")
    }

    pub fn log_path(&self) -> PathBuf {
        self.home.join("limbu.log")
    }

    /// Default blob location when the config does not name one
    pub fn default_store_path(&self) -> PathBuf {
        self.home.join(limbu_ledger::STORE_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_home() {
        let p = Paths::resolve(Some(PathBuf::from("/tmp/limbu-test"))).unwrap();
        assert_eq!(p.config_path(), PathBuf::from("/tmp/limbu-test/config.toml"));
        assert_eq!(
            p.default_store_path(),
            PathBuf::from("/tmp/limbu-test/limbu_stall_records.json")
        );
    }
}

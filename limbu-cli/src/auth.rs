use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use tracing::warn;

use crate::llm::Provider;
use crate::state::Paths;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthState {
    pub gemini_api_key: Option<String>,
    pub openai_api_key: Option<String>,
}

impl AuthState {
    /// Environment first, then the saved key.
    pub fn api_key(&self, provider: Provider) -> Option<String> {
        let (env_var, saved) = match provider {
            Provider::Gemini => ("GEMINI_API_KEY", &self.gemini_api_key),
            Provider::Openai => ("OPENAI_API_KEY", &self.openai_api_key),
        };
        std::env::var(env_var)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| saved.clone())
    }
}

pub fn load_auth(paths: &Paths) -> Result<AuthState> {
    let p = paths.auth_path();
    if !p.exists() {
        return Ok(AuthState::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    serde_json::from_str(&s).with_context(|| format!("parse {}", p.display()))
}

/// Unreadable credentials degrade to "no key" so insights fall back to their
/// service-error message instead of aborting the command.
pub fn load_auth_or_default(paths: &Paths) -> AuthState {
    load_auth(paths).unwrap_or_else(|e| {
        warn!(error = %e, "ignoring saved credentials");
        AuthState::default()
    })
}

pub fn save_auth(paths: &Paths, auth: &AuthState) -> Result<()> {
    paths.ensure_home()?;
    let p = paths.auth_path();
    let s = serde_json::to_string_pretty(auth)?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

fn prompt_secret(label: &str) -> Result<String> {
    print!("{}: ", label);
    io::stdout().flush().ok();
    let mut s = String::new();
    io::stdin().read_line(&mut s)?;
    Ok(s.trim().to_string())
}

pub fn paste_api_key(paths: &Paths, provider: Provider) -> Result<()> {
    let mut auth = load_auth_or_default(paths);
    let key = prompt_secret(&format!("Paste {provider} API key"))?;
    if key.is_empty() {
        bail!("no key entered");
    }
    match provider {
        Provider::Gemini => auth.gemini_api_key = Some(key),
        Provider::Openai => {
            if !key.starts_with("sk-") {
                bail!("key didn't look like an OpenAI API key (expected prefix sk-)");
            }
            auth.openai_api_key = Some(key);
        }
    }
    save_auth(paths, &auth)?;
    println!("Saved {provider} API key to {}", paths.auth_path().display());
    Ok(())
}

//! Credential supplier: where the bearer token comes from.
//!
//! Order: `--token`, then `MONIZZE_TOKEN`, then the token stored in
//! `~/.monizze/auth.json` by `monizze auth paste-token`.

use anyhow::{Context, Result, bail};
use monizze_core::BearerToken;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::state::ensure_monizze_home;

pub const TOKEN_ENV: &str = "MONIZZE_TOKEN";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthState {
    pub bearer_token: Option<String>,
    pub saved_at_utc: Option<String>,
}

fn auth_path() -> Result<PathBuf> {
    Ok(ensure_monizze_home()?.join("auth.json"))
}

pub fn load_auth_from(p: &Path) -> Result<AuthState> {
    if !p.exists() {
        return Ok(AuthState::default());
    }
    let s = fs::read_to_string(p).with_context(|| format!("read {}", p.display()))?;
    serde_json::from_str(&s).with_context(|| format!("parse {}", p.display()))
}

pub fn save_auth_to(p: &Path, auth: &AuthState) -> Result<()> {
    let s = serde_json::to_string_pretty(auth)?;
    fs::write(p, s).with_context(|| format!("write {}", p.display()))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(p, fs::Permissions::from_mode(0o600))
            .with_context(|| format!("chmod {}", p.display()))?;
    }
    Ok(())
}

pub fn load_auth() -> Result<AuthState> {
    load_auth_from(&auth_path()?)
}

fn prompt_secret(label: &str) -> Result<String> {
    print!("{}: ", label);
    io::stdout().flush().ok();
    let mut s = String::new();
    io::stdin().read_line(&mut s)?;
    Ok(s.trim().to_string())
}

/// First non-empty candidate wins.
pub fn pick_token(
    flag: Option<String>,
    env: Option<String>,
    stored: Option<String>,
) -> Option<BearerToken> {
    [flag, env, stored]
        .into_iter()
        .flatten()
        .map(BearerToken::new)
        .find(|t| !t.is_empty())
}

pub fn resolve_token(flag: Option<String>) -> Result<BearerToken> {
    let env = std::env::var(TOKEN_ENV).ok();
    let stored = load_auth()?.bearer_token;
    match pick_token(flag, env, stored) {
        Some(token) => Ok(token),
        None => bail!(
            "no bearer token available.\n\
Log in to my.monizze.be, copy the token, then either:\n  \
monizze auth paste-token\n  \
or set {TOKEN_ENV}, or pass --token"
        ),
    }
}

pub fn paste_token() -> Result<()> {
    let token = prompt_secret("Paste Monizze bearer token")?;
    if BearerToken::new(token.as_str()).is_empty() {
        bail!("empty token; nothing saved");
    }
    let p = auth_path()?;
    let auth = AuthState {
        bearer_token: Some(token),
        saved_at_utc: Some(chrono::Utc::now().to_rfc3339()),
    };
    save_auth_to(&p, &auth)?;
    println!("Saved bearer token to {}", p.display());
    Ok(())
}

pub fn clear_token() -> Result<()> {
    let p = auth_path()?;
    if p.exists() {
        fs::remove_file(&p).with_context(|| format!("remove {}", p.display()))?;
        println!("Removed {}", p.display());
    } else {
        println!("No stored token");
    }
    Ok(())
}

pub fn status() -> Result<()> {
    let stored = load_auth()?;
    if std::env::var(TOKEN_ENV).is_ok_and(|v| !v.trim().is_empty()) {
        println!("{TOKEN_ENV} is set and takes precedence over the stored token");
    }
    match (stored.bearer_token, stored.saved_at_utc) {
        (Some(_), Some(at)) => println!("Stored token saved at {at}"),
        (Some(_), None) => println!("Stored token present"),
        (None, _) => println!("No stored token (run: monizze auth paste-token)"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pick_token_precedence() {
        let t = pick_token(Some("flag".into()), Some("env".into()), Some("stored".into()));
        assert_eq!(t.unwrap().expose(), "flag");

        let t = pick_token(Some("  ".into()), Some("env".into()), Some("stored".into()));
        assert_eq!(t.unwrap().expose(), "env");

        let t = pick_token(None, None, Some("stored\n".into()));
        assert_eq!(t.unwrap().expose(), "stored");

        assert!(pick_token(None, Some(String::new()), None).is_none());
    }

    #[test]
    fn test_auth_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("auth.json");
        assert!(load_auth_from(&p).unwrap().bearer_token.is_none());

        save_auth_to(
            &p,
            &AuthState {
                bearer_token: Some("abc".into()),
                saved_at_utc: None,
            },
        )
        .unwrap();
        assert_eq!(load_auth_from(&p).unwrap().bearer_token.as_deref(), Some("abc"));
    }
}

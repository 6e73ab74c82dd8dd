// Runtime configuration, read from the environment with CLI overrides
// applied on top by `cli`.

use std::path::PathBuf;

use anyhow::{bail, Result};

pub const DEFAULT_BASE_URL: &str = "https://www.seedr.cc";
const TOKEN_FILE_NAME: &str = ".seedr_token.json";

#[derive(Debug, Clone)]
pub struct Config {
    /// Scheme and host of the Seedr service, without a trailing slash.
    pub base_url: String,
    pub token_file: PathBuf,
}

impl Config {
    /// Build the configuration from `SEEDR_BASE_URL` and `SEEDR_TOKEN_FILE`,
    /// falling back to the public service and `~/.seedr_token.json`.
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("SEEDR_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
        let token_file = match std::env::var_os("SEEDR_TOKEN_FILE") {
            Some(path) => PathBuf::from(path),
            None => default_token_file(),
        };
        Self::new(base_url, token_file)
    }

    pub fn new(base_url: impl Into<String>, token_file: PathBuf) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            bail!("invalid base url '{base_url}', expected http:// or https://");
        }
        Ok(Config { base_url, token_file })
    }
}

fn default_token_file() -> PathBuf {
    let dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    dir.join(TOKEN_FILE_NAME)
}

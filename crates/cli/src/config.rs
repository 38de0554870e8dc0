//! CLI configuration file and cookie file loading.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use serde::Deserialize;

/// Browser identity sent when neither the flag nor the config file names one.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Cookie file looked up in the working directory by default.
pub const DEFAULT_COOKIE_FILE: &str = "cookie.txt";

/// Contents of `config.toml`. Every key is optional.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub user_agent: Option<String>,
    pub cookie_file: Option<PathBuf>,
    pub base_path: Option<PathBuf>,
    pub save_file_format: Option<String>,
    pub gateway_authorization: Option<String>,
    pub extra_header_tag: Option<String>,
    pub template: Option<PathBuf>,
    pub timeout: Option<u64>,
    pub site_origin: Option<String>,
}

impl FileConfig {
    pub fn parse(text: &str) -> anyhow::Result<Self> {
        toml::from_str(text).context("Invalid config file")
    }

    /// Loads the config at `explicit`, or the per-user default location.
    ///
    /// An explicit path must exist; a missing default file yields defaults.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match default_config_path() {
                Some(path) if path.is_file() => path,
                _ => return Ok(Self::default()),
            },
        };

        tracing::debug!(path = %path.display(), "loading config");
        let text = fs::read_to_string(&path).with_context(|| format!("Failed to read config: {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("In {}", path.display()))
    }
}

/// `<config dir>/qnasnap/config.toml`, when the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("qnasnap").join("config.toml"))
}

#[derive(Debug, Deserialize)]
struct ExportedCookie {
    name: String,
    value: String,
}

/// Turns cookie file text into a `k=v; k=v` header value.
///
/// Browser exports (a JSON array of `name`/`value` objects) are joined;
/// anything else is taken as a raw header string.
pub fn cookie_header_from_text(text: &str) -> String {
    match serde_json::from_str::<Vec<ExportedCookie>>(text) {
        Ok(cookies) => cookies
            .iter()
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; "),
        Err(_) => text.trim().to_string(),
    }
}

pub fn load_cookie_file(path: &Path) -> anyhow::Result<String> {
    if !path.exists() {
        bail!("Cookie file {} does not exist", path.display());
    }
    if path.is_dir() {
        bail!("Cookie path {} is a directory", path.display());
    }

    let text = fs::read_to_string(path).with_context(|| format!("Failed to read cookie file: {}", path.display()))?;
    let header = cookie_header_from_text(&text);
    if header.is_empty() {
        bail!("Cookie file {} is empty", path.display());
    }
    Ok(header)
}

//! Client configuration: config dir, origin URLs, timeouts and where state lives.
//!
//! Origin URLs resolve in order: process environment, `config.json`, then the
//! value baked in at build time.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::network::Origins;
use crate::storage::{JsonFileStorage, KeyringStorage, MemoryStorage, Storage};
use crate::timeout::DEFAULT_TIMEOUT_MS;

pub const LOCAL_URL_ENV: &str = "CARDSTUDY_LOCAL_URL";
pub const PROD_URL_ENV: &str = "CARDSTUDY_PROD_URL";
pub const CONFIG_DIR_ENV: &str = "CARDSTUDY_CONFIG_DIR";

const BUILD_LOCAL_URL: &str = match option_env!("CARDSTUDY_LOCAL_URL") {
    Some(url) => url,
    None => "http://127.0.0.1:5000",
};
const BUILD_PROD_URL: &str = match option_env!("CARDSTUDY_PROD_URL") {
    Some(url) => url,
    None => "https://ai-card-generate-backend.onrender.com",
};

const CONFIG_FILENAME: &str = "config.json";
const TOKENS_FILENAME: &str = "tokens.json";
const SESSION_FILENAME: &str = "session.json";
const DEFAULT_HEALTH_PATH: &str = "/health";
const SERVICE_NAME: &str = "CardStudy";

fn expand_tilde(path: &str) -> PathBuf {
    let s = path.trim();
    if s.starts_with('~') {
        let rest = s.trim_start_matches('~').trim_start_matches('/');
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(s)
}

fn env_nonempty(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn isolated() -> bool {
    env_nonempty(CONFIG_DIR_ENV).is_some()
}

pub fn config_dir() -> PathBuf {
    if let Some(dir) = env_nonempty(CONFIG_DIR_ENV) {
        return expand_tilde(&dir);
    }
    #[cfg(windows)]
    {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("CardStudy")
    }
    #[cfg(not(windows))]
    {
        if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
            PathBuf::from(xdg).join("cardstudy")
        } else {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config")
                .join("cardstudy")
        }
    }
}

/// Per-login scratch directory, cleared by the OS when the user session ends.
///
/// `None` when no such directory exists or the config dir is overridden; the
/// sticky base then lives in process memory only.
fn session_dir(isolated: bool, runtime_dir: Option<PathBuf>) -> Option<PathBuf> {
    if isolated {
        return None;
    }
    runtime_dir.map(|dir| dir.join("cardstudy"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenStore {
    #[default]
    Keyring,
    File,
}

#[derive(Default, Clone, Serialize, Deserialize)]
struct ConfigFile {
    local_url: Option<String>,
    prod_url: Option<String>,
    timeout_ms: Option<u64>,
    health_path: Option<String>,
    token_store: Option<TokenStore>,
}

fn read_config_file(dir: &std::path::Path) -> ConfigFile {
    let path = dir.join(CONFIG_FILENAME);
    if !path.exists() {
        return ConfigFile::default();
    }
    match std::fs::read_to_string(&path) {
        Ok(s) => serde_json::from_str(&s).unwrap_or_else(|e| {
            log::warn!("Ignoring malformed {}: {}", path.display(), e);
            ConfigFile::default()
        }),
        Err(_) => ConfigFile::default(),
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub local_url: String,
    pub prod_url: String,
    pub timeout_ms: u64,
    pub health_path: String,
    pub token_store: TokenStore,
    pub config_dir: PathBuf,
    pub session_dir: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            local_url: BUILD_LOCAL_URL.to_string(),
            prod_url: BUILD_PROD_URL.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            health_path: DEFAULT_HEALTH_PATH.to_string(),
            token_store: TokenStore::Keyring,
            config_dir: PathBuf::from("."),
            session_dir: None,
        }
    }
}

impl ClientConfig {
    /// Environment + `config.json` + build-time defaults. Never fails.
    pub fn load() -> Self {
        let dir = config_dir();
        let file = read_config_file(&dir);
        let token_store = if isolated() {
            TokenStore::File
        } else {
            file.token_store.unwrap_or_default()
        };
        ClientConfig {
            local_url: env_nonempty(LOCAL_URL_ENV)
                .or(file.local_url)
                .unwrap_or_else(|| BUILD_LOCAL_URL.to_string()),
            prod_url: env_nonempty(PROD_URL_ENV)
                .or(file.prod_url)
                .unwrap_or_else(|| BUILD_PROD_URL.to_string()),
            timeout_ms: file.timeout_ms.filter(|ms| *ms > 0).unwrap_or(DEFAULT_TIMEOUT_MS),
            health_path: file
                .health_path
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_HEALTH_PATH.to_string()),
            token_store,
            config_dir: dir,
            session_dir: session_dir(isolated(), dirs::runtime_dir()),
        }
    }

    pub fn origins(&self) -> Origins {
        Origins::new(&self.local_url, &self.prod_url)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Where the sticky base lives: a session file when a session dir is known,
    /// otherwise process memory.
    pub fn session_storage(&self) -> Arc<dyn Storage> {
        match &self.session_dir {
            Some(dir) => Arc::new(JsonFileStorage::new(dir.join(SESSION_FILENAME))),
            None => Arc::new(MemoryStorage::new()),
        }
    }

    pub fn token_storage(&self) -> Arc<dyn Storage> {
        match self.token_store {
            TokenStore::Keyring => Arc::new(KeyringStorage::new(SERVICE_NAME)),
            TokenStore::File => Arc::new(JsonFileStorage::new(self.config_dir.join(TOKENS_FILENAME))),
        }
    }

    /// Persists the URL/timeout part of this config to `config.json`.
    pub fn save(&self) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(&self.config_dir)?;
        let path = self.config_dir.join(CONFIG_FILENAME);
        let file = ConfigFile {
            local_url: Some(self.local_url.clone()),
            prod_url: Some(self.prod_url.clone()),
            timeout_ms: Some(self.timeout_ms),
            health_path: Some(self.health_path.clone()),
            token_store: Some(self.token_store),
        };
        let text = serde_json::to_string_pretty(&file).unwrap_or_else(|_| "{}".to_string());
        std::fs::write(&path, text)?;
        Ok(path)
    }
}

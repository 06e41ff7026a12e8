use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

/// Environment variable naming an optional YAML config file.
pub const CONFIG_ENV: &str = "WINDOWCAST_CONFIG";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub static_files: StaticFilesConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    /// How long in-flight connections may keep running after shutdown.
    pub shutdown_grace_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StaticFilesConfig {
    pub root: PathBuf,
    /// Served for requests naming the root path.
    pub index: String,
    /// Window capacity of the streaming pipeline, in bytes.
    pub chunk_size: usize,
    pub request_buffer_size: usize,
    /// Pause between windows. Debugging aid only.
    pub window_delay_ms: u64,
    pub allow_traversal: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            shutdown_grace_ms: 5000,
        }
    }
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            index: "index.html".to_string(),
            chunk_size: 1024,
            request_buffer_size: 1024,
            window_delay_ms: 0,
            allow_traversal: false,
        }
    }
}

impl ServerConfig {
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

impl StaticFilesConfig {
    pub fn window_delay(&self) -> Option<Duration> {
        (self.window_delay_ms > 0).then(|| Duration::from_millis(self.window_delay_ms))
    }
}

impl Config {
    /// Loads the config file named by `WINDOWCAST_CONFIG` (or defaults),
    /// then applies the `LISTEN` and `ROOT` overrides.
    pub fn load() -> anyhow::Result<Self> {
        let mut cfg = match std::env::var(CONFIG_ENV) {
            Ok(path) => {
                let text = std::fs::read_to_string(&path)
                    .with_context(|| format!("reading config file {}", path))?;
                Self::from_yaml_str(&text)
                    .with_context(|| format!("parsing config file {}", path))?
            }
            Err(_) => Self::default(),
        };

        if let Ok(listen_addr) = std::env::var("LISTEN") {
            cfg.server.listen_addr = listen_addr;
        }
        if let Ok(root) = std::env::var("ROOT") {
            cfg.static_files.root = PathBuf::from(root);
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_yaml_str(text: &str) -> anyhow::Result<Self> {
        let cfg: Config = serde_yaml::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.static_files.chunk_size == 0 {
            anyhow::bail!("static_files.chunk_size must be greater than zero");
        }
        if self.static_files.request_buffer_size == 0 {
            anyhow::bail!("static_files.request_buffer_size must be greater than zero");
        }
        Ok(())
    }
}

use std::{env, fmt, fs, path, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to read config {0}: {1}")]
    ReadFailed(path::PathBuf, #[source] std::io::Error),
    #[error("Failed to write config {0}: {1}")]
    WriteFailed(path::PathBuf, #[source] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseFailed(#[from] toml::de::Error),
    #[error("Failed to encode config: {0}")]
    EncodeFailed(#[from] toml::ser::Error),
    #[error("Neither XDG_CONFIG_HOME nor HOME is set")]
    ConfigPathUnavailable,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: Storage,
    pub monitoring: Monitoring,
    pub logging: Logging,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Storage {
    /// Location of the sites document
    pub path: path::PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Monitoring {
    /// Quiet window before changes are written to disk
    pub debounce_ms: u64,
    /// Longest a change stays unsaved while further changes keep arriving
    pub max_save_delay_ms: u64,
    /// Request timeout; the HTTP client default applies when unset
    pub timeout_seconds: Option<u64>,
    pub user_agent: String,
    pub scheduler_tick_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Logging {
    pub level: String,
}

/// Used to ensure we are actually reading a toml file
fn normalize_toml_path(path: &path::Path) -> path::PathBuf {
    let mut path = path.to_path_buf();
    if path.extension().map(|ext| ext != "toml").unwrap_or(true) {
        path.set_extension("toml");
    }
    path
}

/// Get default config path ($XDG_CONFIG_HOME/openping/config.toml or
/// $HOME/.config/...)
fn default_config_path() -> Result<path::PathBuf, Error> {
    let path = if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
        path::PathBuf::from(config_home)
    } else if let Some(home_dir) = env::home_dir() {
        home_dir.join(".config")
    } else {
        return Err(Error::ConfigPathUnavailable);
    };

    Ok(path.join("openping/config.toml"))
}

/// Default sites document ($XDG_DATA_HOME/openping/sites.json or
/// $HOME/.local/share/...), falling back to the working directory
fn default_data_path() -> path::PathBuf {
    let base = if let Ok(data_home) = env::var("XDG_DATA_HOME") {
        path::PathBuf::from(data_home)
    } else if let Some(home_dir) = env::home_dir() {
        home_dir.join(".local/share")
    } else {
        return path::PathBuf::from("sites.json");
    };

    base.join("openping/sites.json")
}

impl Default for Storage {
    fn default() -> Self {
        Self { path: default_data_path() }
    }
}

impl Default for Monitoring {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            max_save_delay_ms: 5000,
            timeout_seconds: None,
            user_agent: concat!("openping/", env!("CARGO_PKG_VERSION")).into(),
            scheduler_tick_ms: 1000,
        }
    }
}

impl Default for Logging {
    fn default() -> Self {
        Self { level: "info".into() }
    }
}

impl Monitoring {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn max_save_delay(&self) -> Duration {
        Duration::from_millis(self.max_save_delay_ms)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_seconds.map(Duration::from_secs)
    }

    /// Never zero, `tokio::time::interval` rejects that
    pub fn scheduler_tick(&self) -> Duration {
        Duration::from_millis(self.scheduler_tick_ms.max(1))
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let write_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str, value: &dyn fmt::Display| {
                writeln!(f, "  {:indent$}{}: {}", "", label, value, indent = level * 2)
            }
        };
        let write_title_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str| {
                writeln!(f, "{:indent$}{}", "", label, indent = level * 2)
            }
        };

        let write_title_1 = write_title_indented(1);
        let write_1 = write_indented(1);

        let timeout = match self.monitoring.timeout_seconds {
            Some(seconds) => format!("{seconds}s"),
            None => "client default".into(),
        };

        writeln!(f, "Current Internal Configuration State:")?;
        write_title_1(f, "Storage")?;
        write_1(f, "Sites Document", &self.storage.path.display())?;
        write_title_1(f, "Monitoring")?;
        write_1(f, "Debounce", &format!("{}ms", self.monitoring.debounce_ms))?;
        write_1(f, "Max Save Delay", &format!("{}ms", self.monitoring.max_save_delay_ms))?;
        write_1(f, "Timeout", &timeout)?;
        write_1(f, "User Agent", &self.monitoring.user_agent)?;
        write_1(f, "Scheduler Tick", &format!("{}ms", self.monitoring.scheduler_tick_ms))?;
        write_title_1(f, "Logging")?;
        write_1(f, "Level", &self.logging.level)?;

        Ok(())
    }
}

impl Config {
    /// Generate Config structure from file
    ///
    /// Creates a default config in ~/.config/openping/config.toml
    ///  or the specified path, with the name config.toml if one does not exist
    ///
    /// ```ignore
    /// let cfg = config::Config::from_config(None::<&path::Path>)?;
    /// println!("{}", cfg);
    /// ```
    pub fn from_config(optional_path: Option<impl AsRef<path::Path>>) -> Result<Self, Error> {
        let config_path: path::PathBuf = if let Some(path) = optional_path {
            normalize_toml_path(path.as_ref())
        } else {
            default_config_path()?
        };

        if config_path.exists() {
            let raw_string = fs::read_to_string(&config_path)
                .map_err(|err| Error::ReadFailed(config_path.clone(), err))?;
            Ok(toml::from_str(raw_string.as_str())?)
        } else {
            let config = Self::default();
            config.write_config(&config_path)?;
            Ok(config)
        }
    }

    /// Serialize and write a config to a file
    pub fn write_config(&self, path: &path::Path) -> Result<(), Error> {
        let config_str: String = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| Error::WriteFailed(path.into(), err))?;
        }

        fs::write(path, config_str).map_err(|err| Error::WriteFailed(path.into(), err))
    }
}

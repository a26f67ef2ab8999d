//! Configuration types for workshop-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// SteamCMD invocation settings
///
/// Groups settings for the external fetch tool.
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SteamCmdConfig {
    /// Path to the steamcmd executable (auto-detected if None)
    #[serde(default)]
    pub binary: Option<PathBuf>,

    /// Whether to search PATH for steamcmd if no explicit path is set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,

    /// Steam application the workshop items belong to (default: 107410, Arma 3)
    #[serde(default = "default_app_id")]
    pub app_id: u32,

    /// Abort the batch if steamcmd prints nothing for this long (None = wait forever)
    #[serde(default, with = "optional_duration_serde")]
    pub read_timeout: Option<Duration>,

    /// Forward every steamcmd output line to the log (default: true)
    #[serde(default = "default_true")]
    pub echo_output: bool,
}

impl Default for SteamCmdConfig {
    fn default() -> Self {
        Self {
            binary: None,
            search_path: true,
            app_id: default_app_id(),
            read_timeout: None,
            echo_output: true,
        }
    }
}

/// Filesystem layout
///
/// Staging is keyed by workshop id, installs are keyed by sanitized mod name.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Steam installation root used by steamcmd (default: "~/Steam")
    #[serde(default = "default_steam_root")]
    pub steam_root: PathBuf,

    /// Arma 3 dedicated server directory (default: "~/Steam/steamapps/common/Arma 3 Server")
    #[serde(default = "default_server_dir")]
    pub server_dir: PathBuf,

    /// Server executable name, relative to `server_dir` (default: "arma3server")
    #[serde(default = "default_server_binary")]
    pub server_binary: String,

    /// Where the retry manifest is written (default: "./failed_downloads.json")
    #[serde(default = "default_manifest_path")]
    pub manifest_path: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            steam_root: default_steam_root(),
            server_dir: default_server_dir(),
            server_binary: default_server_binary(),
            manifest_path: default_manifest_path(),
        }
    }
}

impl PathsConfig {
    /// Directory where steamcmd stages workshop items of `app_id`
    pub fn workshop_dir(&self, app_id: u32) -> PathBuf {
        self.steam_root
            .join("steamapps")
            .join("workshop")
            .join("content")
            .join(app_id.to_string())
    }

    /// Directory holding the installed `@name` mod folders
    pub fn mods_dir(&self) -> PathBuf {
        self.server_dir.join("mods")
    }

    /// Directory holding the server parameter files
    pub fn configs_dir(&self) -> PathBuf {
        self.server_dir.join("configs")
    }
}

/// Output line patterns used to classify steamcmd output
///
/// SteamCMD has changed its failure wording between versions, so every
/// recognized line is a regular expression rather than a fixed string.
/// Authentication patterns must capture a `reason` group, item patterns an
/// `id` group.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PatternConfig {
    /// Login failure lines, capturing `reason`
    #[serde(default = "default_auth_failure_patterns")]
    pub auth_failure: Vec<String>,

    /// Per-item failure lines, capturing `id`
    #[serde(default = "default_item_failure_patterns")]
    pub item_failure: Vec<String>,

    /// Per-item success line, capturing `id` (logged only)
    #[serde(default = "default_item_success_pattern")]
    pub item_success: Option<String>,

    /// Substring marking an error line; unmatched lines containing it are reported
    #[serde(default = "default_error_marker")]
    pub error_marker: String,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            auth_failure: default_auth_failure_patterns(),
            item_failure: default_item_failure_patterns(),
            item_success: default_item_success_pattern(),
            error_marker: default_error_marker(),
        }
    }
}

/// How staged files reach the install directory
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallStrategy {
    /// Copy, keeping the staged files for later re-installs (default)
    #[default]
    Copy,
    /// Move, consuming the staged files
    Move,
}

/// Local installation settings
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct InstallConfig {
    /// Copy or move staged files
    #[serde(default)]
    pub strategy: InstallStrategy,
}

/// Main configuration for workshop-dl
///
/// Every field has a default, so an empty JSON object is a valid config file.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// External fetch tool settings
    #[serde(default)]
    pub steamcmd: SteamCmdConfig,

    /// Filesystem layout
    #[serde(default)]
    pub paths: PathsConfig,

    /// Output classification patterns
    #[serde(default)]
    pub patterns: PatternConfig,

    /// Local installation settings
    #[serde(default)]
    pub install: InstallConfig,
}

impl Config {
    /// Load a config from a JSON file and validate it
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("failed to read {}: {}", path.display(), e),
            key: None,
        })?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, otherwise the default config file if it exists,
    /// otherwise the built-in defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }

        match Self::default_path() {
            Some(default) if default.is_file() => {
                tracing::debug!(path = ?default, "loading default config file");
                Self::load(&default)
            }
            _ => Ok(Self::default()),
        }
    }

    /// Platform config location, e.g. `~/.config/workshop-dl/config.json` on Linux
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "workshop-dl")
            .map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Check settings that serde cannot check on its own
    pub fn validate(&self) -> Result<()> {
        if self.patterns.error_marker.is_empty() {
            return Err(Error::config(
                "error marker must not be empty",
                "patterns.error_marker",
            ));
        }
        if self.paths.server_binary.is_empty() {
            return Err(Error::config(
                "server binary must not be empty",
                "paths.server_binary",
            ));
        }
        crate::steamcmd::OutputClassifier::new(&self.patterns).map(|_| ())
    }

    /// Staging directory of this config's app
    pub fn workshop_dir(&self) -> PathBuf {
        self.paths.workshop_dir(self.steamcmd.app_id)
    }
}

fn home_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

fn default_steam_root() -> PathBuf {
    home_dir().join("Steam")
}

fn default_server_dir() -> PathBuf {
    default_steam_root()
        .join("steamapps")
        .join("common")
        .join("Arma 3 Server")
}

fn default_server_binary() -> String {
    "arma3server".to_string()
}

fn default_manifest_path() -> PathBuf {
    PathBuf::from("./failed_downloads.json")
}

fn default_true() -> bool {
    true
}

fn default_app_id() -> u32 {
    107410
}

fn default_auth_failure_patterns() -> Vec<String> {
    vec![
        r"Logging in user .*FAILED \((?P<reason>[^)]+)\)".to_string(),
        r"FAILED login with result code (?P<reason>[A-Za-z][A-Za-z ]*)".to_string(),
    ]
}

fn default_item_failure_patterns() -> Vec<String> {
    vec![
        r"ERROR! Download item (?P<id>\d+) failed".to_string(),
        r"ERROR! Timeout downloading item (?P<id>\d+)".to_string(),
        r"ERROR! Failed to download item (?P<id>\d+)".to_string(),
    ]
}

fn default_item_success_pattern() -> Option<String> {
    Some(r"Success\. Downloaded item (?P<id>\d+)".to_string())
}

fn default_error_marker() -> String {
    "ERROR!".to_string()
}

// Optional Duration serialization helper (whole seconds)
mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}

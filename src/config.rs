//! Application configuration: TOML file loading, CLI overrides, and defaults.
//!
//! Resolution order (first found wins, values merge/override):
//! 1. CLI flags (`--config`, `--show-hidden`, `--status-file`, etc.)
//! 2. `$FENN_CONFIG` environment variable (path to config file)
//! 3. Project-local `.fenn.toml` in the current working directory
//! 4. Global `~/.config/fenn/config.toml`
//! 5. Built-in defaults

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::fs::DEFAULT_IGNORE_PATTERNS;
use crate::status::sidecar::DEFAULT_SIDECAR_SUFFIX;

// ── Section configs ──────────────────────────────────────────────────────────

/// General application settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct GeneralConfig {
    /// Show dot-prefixed names in the browser.
    pub show_hidden: Option<bool>,
    /// Enable mouse support.
    pub mouse: Option<bool>,
}

/// Tree construction and display settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TreeConfig {
    /// Directory names never descended into.
    pub ignore: Option<Vec<String>>,
    /// Directories always listed first.
    pub dirs_first: Option<bool>,
    /// Extension of tracking sidecar files (without the dot).
    pub sidecar_suffix: Option<String>,
}

/// Selection persistence settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SelectionConfig {
    /// JSON file holding the selection. Defaults to one file per root under
    /// the user data directory.
    pub store_path: Option<PathBuf>,
}

/// Status feed settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct StatusConfig {
    /// Location of the root beneath the primary feed's base directory.
    pub primary_prefix: Option<String>,
    /// Location of the root beneath the tracked feed's base directory.
    pub secondary_prefix: Option<String>,
    /// File holding `git status --porcelain` output.
    pub porcelain_file: Option<PathBuf>,
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directive, e.g. `info` or `fenn=debug`.
    pub level: Option<String>,
    /// Directory for the browser's log file.
    pub directory: Option<PathBuf>,
}

/// Color settings for a single theme palette.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ThemeColorsConfig {
    pub tree_fg: Option<String>,
    pub tree_selected_bg: Option<String>,
    pub tree_dir_fg: Option<String>,
    pub tree_hidden_fg: Option<String>,
    pub status_bg: Option<String>,
    pub status_fg: Option<String>,
    pub border_fg: Option<String>,
}

/// Theme configuration section.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ThemeConfig {
    /// Color scheme: "dark", "light", "custom".
    pub scheme: Option<String>,
    /// Custom color overrides.
    pub custom: Option<ThemeColorsConfig>,
}

// ── Top-level config ─────────────────────────────────────────────────────────

/// Top-level application configuration.
///
/// All fields are optional so that partial configs from different sources
/// can be merged together (CLI overrides file, file overrides defaults).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub tree: TreeConfig,
    pub selection: SelectionConfig,
    pub status: StatusConfig,
    pub log: LogConfig,
    pub theme: ThemeConfig,
}

// ── Default constants ────────────────────────────────────────────────────────

pub const DEFAULT_LOG_LEVEL: &str = "info";

// ── Config file locator ──────────────────────────────────────────────────────

/// Return the list of candidate config file paths in priority order.
///
/// Does NOT include the CLI `--config` path; that is handled separately.
fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(env_path) = std::env::var("FENN_CONFIG") {
        paths.push(PathBuf::from(env_path));
    }

    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.join(".fenn.toml"));
    }

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("fenn").join("config.toml"));
    }

    paths
}

/// Try to read and parse a TOML config file. Returns `None` if the file
/// doesn't exist or can't be parsed (with a warning printed to stderr).
fn load_file(path: &Path) -> Option<AppConfig> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => return None,
    };
    match toml::from_str::<AppConfig>(&content) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            // Logging is not up yet; it is configured from this file.
            eprintln!(
                "Warning: failed to parse config file {}: {}",
                path.display(),
                e
            );
            None
        }
    }
}

// ── Merge logic ──────────────────────────────────────────────────────────────

impl AppConfig {
    /// Merge `other` on top of `self`; `other`'s `Some` values win.
    pub fn merge(self, other: &AppConfig) -> AppConfig {
        AppConfig {
            general: GeneralConfig {
                show_hidden: other.general.show_hidden.or(self.general.show_hidden),
                mouse: other.general.mouse.or(self.general.mouse),
            },
            tree: TreeConfig {
                ignore: other.tree.ignore.clone().or(self.tree.ignore),
                dirs_first: other.tree.dirs_first.or(self.tree.dirs_first),
                sidecar_suffix: other
                    .tree
                    .sidecar_suffix
                    .clone()
                    .or(self.tree.sidecar_suffix),
            },
            selection: SelectionConfig {
                store_path: other
                    .selection
                    .store_path
                    .clone()
                    .or(self.selection.store_path),
            },
            status: StatusConfig {
                primary_prefix: other
                    .status
                    .primary_prefix
                    .clone()
                    .or(self.status.primary_prefix),
                secondary_prefix: other
                    .status
                    .secondary_prefix
                    .clone()
                    .or(self.status.secondary_prefix),
                porcelain_file: other
                    .status
                    .porcelain_file
                    .clone()
                    .or(self.status.porcelain_file),
            },
            log: LogConfig {
                level: other.log.level.clone().or(self.log.level),
                directory: other.log.directory.clone().or(self.log.directory),
            },
            theme: ThemeConfig {
                scheme: other.theme.scheme.clone().or(self.theme.scheme),
                custom: match (&self.theme.custom, &other.theme.custom) {
                    (_, Some(o)) => Some(o.clone()),
                    (Some(s), None) => Some(s.clone()),
                    (None, None) => None,
                },
            },
        }
    }

    /// Load the final merged configuration.
    ///
    /// `cli_config_path` is an explicit config file path from `--config`.
    /// `cli_overrides` are partial overrides derived from CLI flags.
    pub fn load(cli_config_path: Option<&Path>, cli_overrides: Option<&AppConfig>) -> AppConfig {
        let mut config = AppConfig::default();

        // Walk in reverse so that the highest-priority candidate is merged last.
        for path in candidate_paths().iter().rev() {
            if let Some(file_cfg) = load_file(path) {
                config = config.merge(&file_cfg);
            }
        }

        if let Some(cli_path) = cli_config_path {
            if let Some(file_cfg) = load_file(cli_path) {
                config = config.merge(&file_cfg);
            }
        }

        if let Some(overrides) = cli_overrides {
            config = config.merge(overrides);
        }

        config
    }

    // ── Convenience getters with built-in defaults ──────────────────────────

    pub fn show_hidden(&self) -> bool {
        self.general.show_hidden.unwrap_or(false)
    }

    pub fn mouse_enabled(&self) -> bool {
        self.general.mouse.unwrap_or(true)
    }

    /// Directory names skipped while listing.
    pub fn ignore(&self) -> Vec<String> {
        match &self.tree.ignore {
            Some(ignore) => ignore.clone(),
            None => DEFAULT_IGNORE_PATTERNS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn dirs_first(&self) -> bool {
        self.tree.dirs_first.unwrap_or(true)
    }

    pub fn sidecar_suffix(&self) -> &str {
        self.tree
            .sidecar_suffix
            .as_deref()
            .unwrap_or(DEFAULT_SIDECAR_SUFFIX)
    }

    /// Selection file for `root`: the configured path, or a per-root file
    /// under the user data directory, or `<root>/.fenn/selection.json` when
    /// there is no data directory.
    pub fn selection_store_path(&self, root: &Path) -> PathBuf {
        if let Some(path) = &self.selection.store_path {
            return path.clone();
        }
        match dirs::data_dir() {
            Some(data) => data
                .join("fenn")
                .join("selections")
                .join(format!("{}.json", sanitize(root))),
            None => root.join(".fenn").join("selection.json"),
        }
    }

    pub fn primary_prefix(&self) -> Option<&str> {
        self.status.primary_prefix.as_deref()
    }

    pub fn secondary_prefix(&self) -> Option<&str> {
        self.status.secondary_prefix.as_deref()
    }

    pub fn porcelain_file(&self) -> Option<&Path> {
        self.status.porcelain_file.as_deref()
    }

    pub fn log_level(&self) -> &str {
        self.log.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    /// Directory for the log file; the user cache directory by default.
    pub fn log_directory(&self) -> PathBuf {
        match &self.log.directory {
            Some(dir) => dir.clone(),
            None => dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("fenn"),
        }
    }

    /// Theme scheme: "dark", "light", or "custom".
    pub fn theme_scheme(&self) -> &str {
        self.theme.scheme.as_deref().unwrap_or("dark")
    }
}

/// Turn a root path into a single file-name-safe token.
fn sanitize(root: &Path) -> String {
    let raw = root.to_string_lossy();
    let token: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
        .collect();
    let token = token.trim_matches('_');
    if token.is_empty() {
        "root".to_string()
    } else {
        token.to_string()
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_values() {
        let cfg = AppConfig::default();
        assert!(!cfg.show_hidden());
        assert!(cfg.mouse_enabled());
        assert!(cfg.dirs_first());
        assert_eq!(cfg.sidecar_suffix(), "dvc");
        assert_eq!(cfg.log_level(), "info");
        assert_eq!(cfg.theme_scheme(), "dark");
        assert!(cfg.ignore().contains(&".git".to_string()));
        assert!(cfg.porcelain_file().is_none());
    }

    #[test]
    fn test_toml_parsing_full() {
        let toml = r#"
[general]
show_hidden = true
mouse = false

[tree]
ignore = ["venv"]
dirs_first = false
sidecar_suffix = "ptr"

[selection]
store_path = "/tmp/sel.json"

[status]
primary_prefix = "sub/project"
porcelain_file = "status.txt"

[log]
level = "fenn=debug"
directory = "/tmp/fenn-logs"

[theme]
scheme = "light"
"#;
        let cfg: AppConfig = toml::from_str(toml).expect("parse failed");
        assert!(cfg.show_hidden());
        assert!(!cfg.mouse_enabled());
        assert_eq!(cfg.ignore(), vec!["venv".to_string()]);
        assert!(!cfg.dirs_first());
        assert_eq!(cfg.sidecar_suffix(), "ptr");
        assert_eq!(
            cfg.selection_store_path(Path::new("/any")),
            PathBuf::from("/tmp/sel.json")
        );
        assert_eq!(cfg.primary_prefix(), Some("sub/project"));
        assert_eq!(cfg.secondary_prefix(), None);
        assert_eq!(cfg.porcelain_file(), Some(Path::new("status.txt")));
        assert_eq!(cfg.log_level(), "fenn=debug");
        assert_eq!(cfg.log_directory(), PathBuf::from("/tmp/fenn-logs"));
        assert_eq!(cfg.theme_scheme(), "light");
    }

    #[test]
    fn test_toml_parsing_partial() {
        let cfg: AppConfig = toml::from_str("[general]\nshow_hidden = true\n").expect("parse failed");
        assert!(cfg.show_hidden());
        assert!(cfg.dirs_first());
        assert_eq!(cfg.sidecar_suffix(), "dvc");
    }

    #[test]
    fn test_merge_overrides() {
        let base = AppConfig {
            general: GeneralConfig {
                show_hidden: Some(false),
                mouse: Some(false),
            },
            tree: TreeConfig {
                sidecar_suffix: Some("dvc".into()),
                dirs_first: Some(true),
                ..Default::default()
            },
            ..Default::default()
        };
        let over = AppConfig {
            general: GeneralConfig {
                show_hidden: Some(true),
                ..Default::default()
            },
            tree: TreeConfig {
                sidecar_suffix: Some("lfs".into()),
                ..Default::default()
            },
            ..Default::default()
        };

        let merged = base.merge(&over);
        assert!(merged.show_hidden());
        assert!(!merged.mouse_enabled());
        assert_eq!(merged.sidecar_suffix(), "lfs");
        assert!(merged.dirs_first());
    }

    #[test]
    fn test_merge_none_does_not_clear_some() {
        let base = AppConfig {
            log: LogConfig {
                level: Some("warn".into()),
                directory: None,
            },
            ..Default::default()
        };
        let merged = base.merge(&AppConfig::default());
        assert_eq!(merged.log_level(), "warn");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg_path = dir.path().join("test-config.toml");
        let mut f = std::fs::File::create(&cfg_path).expect("create");
        writeln!(f, "[status]\nsecondary_prefix = \"repo/sub\"\n").expect("write");

        let cfg = load_file(&cfg_path).expect("load");
        assert_eq!(cfg.secondary_prefix(), Some("repo/sub"));
        assert!(!cfg.show_hidden());
    }

    #[test]
    fn test_load_missing_file() {
        assert!(load_file(Path::new("/nonexistent/config.toml")).is_none());
    }

    #[test]
    fn test_load_invalid_toml_returns_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg_path = dir.path().join("bad.toml");
        std::fs::write(&cfg_path, "this is { not valid toml").expect("write");
        assert!(load_file(&cfg_path).is_none());
    }

    #[test]
    fn test_load_with_cli_overrides() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg_path = dir.path().join("config.toml");
        std::fs::write(
            &cfg_path,
            "[general]\nshow_hidden = true\n\n[log]\nlevel = \"debug\"\n",
        )
        .expect("write");

        let cli_overrides = AppConfig {
            log: LogConfig {
                level: Some("trace".into()),
                ..Default::default()
            },
            ..Default::default()
        };

        let cfg = AppConfig::load(Some(&cfg_path), Some(&cli_overrides));
        assert_eq!(cfg.log_level(), "trace");
        assert!(cfg.show_hidden());
    }

    #[test]
    fn test_default_store_path_is_per_root() {
        let cfg = AppConfig::default();
        let a = cfg.selection_store_path(Path::new("/work/a"));
        let b = cfg.selection_store_path(Path::new("/work/b"));
        assert_ne!(a, b);
        assert_eq!(a.extension().and_then(|e| e.to_str()), Some("json"));
    }

    #[test]
    fn test_sanitize_root() {
        assert_eq!(sanitize(Path::new("/work/my repo")), "work_my_repo");
        assert_eq!(sanitize(Path::new("/")), "root");
    }
}

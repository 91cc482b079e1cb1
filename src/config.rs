//! Configuration.
//!
//! Arbor keeps all managed state under a single base directory:
//!
//! ```toml
//! # ~/.config/arbor/config.toml
//! base-dir = "~/Code"
//!
//! # Each path can also be set individually:
//! # repositories-dir = "~/Code/repositories"
//! # workspaces-dir = "~/Code/workspaces"
//! # status-file = "~/Code/status.toml"
//! ```
//!
//! The library only ever sees the resolved [`Config`] value; reading and
//! expanding the file is the binary's job via [`Config::load`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Resolved configuration, immutable after load.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory under which all managed clones and worktrees live.
    pub repositories_dir: PathBuf,
    /// Directory under which generated workspace descriptor files live.
    pub workspaces_dir: PathBuf,
    /// Path of the status document.
    pub status_file: PathBuf,
}

/// Shell commands run around every operation, from the `[hooks]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct HookCommandsConfig {
    /// Command run before each operation (blocking, fail-fast)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre: Option<String>,

    /// Command run after each successful operation (best-effort)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post: Option<String>,
}

/// On-disk shape of the config file. Everything is optional; unset values
/// fall back to paths derived from `base-dir`.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct ConfigFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    base_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    repositories_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    workspaces_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    status_file: Option<String>,
    #[serde(default, skip_serializing_if = "is_default_hooks")]
    hooks: HookCommandsConfig,
}

fn is_default_hooks(hooks: &HookCommandsConfig) -> bool {
    *hooks == HookCommandsConfig::default()
}

impl Config {
    /// Load configuration from `path`, or from the default location when
    /// `path` is `None`. A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        Ok(Self::load_full(path)?.0)
    }

    /// Like [`Config::load`], also returning the hook commands the binary
    /// wires into its dispatcher. The library core only ever sees the
    /// resolved paths.
    pub fn load_full(path: Option<&Path>) -> anyhow::Result<(Self, HookCommandsConfig)> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => default_config_path(),
        };

        let file = if path.is_file() {
            let content = std::fs::read_to_string(&path)?;
            toml::from_str(&content)
                .map_err(|e| anyhow::anyhow!("invalid config {}: {e}", path.display()))?
        } else {
            ConfigFile::default()
        };

        let hooks = file.hooks.clone();
        Ok((Self::resolve(file), hooks))
    }

    /// Construct a config rooted at an explicit base directory.
    ///
    /// Tests use this to point everything at a temp dir.
    pub fn with_base_dir(base: &Path) -> Self {
        Self {
            repositories_dir: base.join("repositories"),
            workspaces_dir: base.join("workspaces"),
            status_file: base.join("status.toml"),
        }
    }

    fn resolve(file: ConfigFile) -> Self {
        let base = file
            .base_dir
            .as_deref()
            .map(expand)
            .unwrap_or_else(default_base_dir);

        Self {
            repositories_dir: file
                .repositories_dir
                .as_deref()
                .map(expand)
                .unwrap_or_else(|| base.join("repositories")),
            workspaces_dir: file
                .workspaces_dir
                .as_deref()
                .map(expand)
                .unwrap_or_else(|| base.join("workspaces")),
            status_file: file
                .status_file
                .as_deref()
                .map(expand)
                .unwrap_or_else(|| base.join("status.toml")),
        }
    }

    /// Create the configured directories (and the status file's parent).
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.repositories_dir)?;
        std::fs::create_dir_all(&self.workspaces_dir)?;
        if let Some(parent) = self.status_file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    /// Write a starter config file at `path` unless one already exists.
    ///
    /// Returns whether a file was written.
    pub fn write_starter_file(path: &Path) -> anyhow::Result<bool> {
        if path.exists() {
            return Ok(false);
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let starter = ConfigFile {
            base_dir: Some("~/Code".to_string()),
            ..ConfigFile::default()
        };
        std::fs::write(path, toml::to_string_pretty(&starter)?)?;
        Ok(true)
    }
}

/// Default config file location: `<platform config dir>/arbor/config.toml`.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("arbor")
        .join("config.toml")
}

fn default_base_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Code")
}

fn expand(value: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(value).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_derive_from_base_dir() {
        let config = Config::resolve(ConfigFile {
            base_dir: Some("/srv/code".into()),
            ..ConfigFile::default()
        });
        assert_eq!(config.repositories_dir, Path::new("/srv/code/repositories"));
        assert_eq!(config.workspaces_dir, Path::new("/srv/code/workspaces"));
        assert_eq!(config.status_file, Path::new("/srv/code/status.toml"));
    }

    #[test]
    fn test_explicit_paths_win() {
        let config = Config::resolve(ConfigFile {
            base_dir: Some("/srv/code".into()),
            status_file: Some("/var/lib/arbor/status.toml".into()),
            ..ConfigFile::default()
        });
        assert_eq!(
            config.status_file,
            Path::new("/var/lib/arbor/status.toml")
        );
        assert_eq!(config.repositories_dir, Path::new("/srv/code/repositories"));
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(Some(&dir.path().join("nope.toml"))).unwrap();
        assert!(config.repositories_dir.ends_with("repositories"));
    }

    #[test]
    fn test_load_rejects_unknown_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "base-dir = \"/x\"\nbogus = 1\n").unwrap();
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn test_load_full_reads_hooks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "base-dir = \"/x\"\n\n[hooks]\npre = \"echo before\"\n",
        )
        .unwrap();
        let (_, hooks) = Config::load_full(Some(&path)).unwrap();
        assert_eq!(hooks.pre.as_deref(), Some("echo before"));
        assert_eq!(hooks.post, None);
    }

    #[test]
    fn test_starter_file_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        assert!(Config::write_starter_file(&path).unwrap());
        assert!(!Config::write_starter_file(&path).unwrap());
        let config = Config::load(Some(&path)).unwrap();
        assert!(config.status_file.ends_with("status.toml"));
    }
}

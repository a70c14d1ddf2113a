//! Layered configuration for qmlsync.
//!
//! Later layers override earlier ones:
//!
//! 1. built-in defaults,
//! 2. `config.toml` in the per-user configuration directory,
//! 3. an explicit file (`.toml`, `.yaml`/`.yml` or `.json`),
//! 4. `QMLSYNC_*` environment variables, nested keys split on `__`.
//!
//! ```no_run
//! let config = qmlsync_config::Loader::new().load().unwrap();
//! println!("watching {}", config.root.display());
//! ```

pub mod error;

use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use qmlsync_fs::validate_path;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{ErrorKind, Result};

pub const ENV_PREFIX: &str = "QMLSYNC_";
const CONFIG_FILE_NAME: &str = "config.toml";
const DATABASE_FILE_NAME: &str = "project.sqlite";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "qmlsync")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Workspace root; every other path is relative to it.
    pub root: PathBuf,
    /// SQLite file holding the project storage. Relative paths are resolved
    /// against `root`.
    pub database: PathBuf,
    /// Manifests to track, relative to `root`. Empty means every `qmldir`
    /// file found below `root`.
    pub qml_dirs: Vec<PathBuf>,
    /// Never write through the filesystem backend.
    pub read_only: bool,
}
impl Default for Config {
    fn default() -> Self {
        let database = match project_dirs() {
            Some(dirs) => dirs.data_dir().join(DATABASE_FILE_NAME),
            None => PathBuf::from(DATABASE_FILE_NAME),
        };
        Self { root: PathBuf::from("."), database, qml_dirs: Vec::new(), read_only: true }
    }
}
impl Config {
    /// Make `root` and `database` absolute, relative to `cwd` and `root`.
    pub fn resolve(mut self, cwd: &Path) -> Self {
        if self.root.is_relative() {
            self.root = cwd.join(&self.root);
        }
        if self.database.is_relative() {
            self.database = self.root.join(&self.database);
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.root.is_absolute() {
            exn::bail!(ErrorKind::Validation(format!("root must be absolute: {}", self.root.display())));
        }
        if self.database.as_os_str().is_empty() {
            exn::bail!(ErrorKind::Validation("database path is empty".to_string()));
        }
        for qml_dir in &self.qml_dirs {
            let invalid =
                |reason: &str| ErrorKind::Validation(format!("qml_dirs entry {}: {reason}", qml_dir.display()));
            if qml_dir.is_absolute() {
                exn::bail!(invalid("must be relative to root"));
            }
            let normalised = validate_path(qml_dir).or_raise(|| invalid("not a valid path below root"))?;
            if normalised.file_name().and_then(|name| name.to_str()) != Some("qmldir") {
                exn::bail!(invalid("must name a qmldir file"));
            }
        }
        Ok(())
    }
}

/// Builds the layered [`Figment`] and extracts a validated [`Config`].
#[derive(Debug, Clone)]
pub struct Loader {
    user_file: Option<PathBuf>,
    file: Option<PathBuf>,
}
impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}
impl Loader {
    pub fn new() -> Self {
        Self { user_file: project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME)), file: None }
    }

    /// Skip the per-user configuration file.
    pub fn without_user_file(mut self) -> Self {
        self.user_file = None;
        self
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    pub fn figment(&self) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(user_file) = &self.user_file {
            // Toml::file ignores files that do not exist.
            figment = figment.merge(Toml::file(user_file));
        }
        if let Some(file) = &self.file {
            if !file.is_file() {
                exn::bail!(ErrorKind::NotFound(file.clone()));
            }
            figment = match file.extension().and_then(|ext| ext.to_str()) {
                Some("toml") => figment.merge(Toml::file(file)),
                Some("yaml" | "yml") => figment.merge(Yaml::file(file)),
                Some("json") => figment.merge(Json::file(file)),
                _ => exn::bail!(ErrorKind::UnsupportedFormat(file.clone())),
            };
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Extract, resolve against the current directory and validate.
    pub fn load(&self) -> Result<Config> {
        let config: Config = self.figment()?.extract().or_raise(|| ErrorKind::Load)?;
        let cwd = std::env::current_dir().or_raise(|| ErrorKind::Load)?;
        let config = config.resolve(&cwd);
        config.validate()?;
        debug!(root = %config.root.display(), database = %config.database.display(), "Loaded configuration");
        Ok(config)
    }
}

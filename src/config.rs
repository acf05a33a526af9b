//! Bootstrap configuration
//!
//! The built-in defaults are the fixed literals of the bootstrap procedure.
//! TOML files may override any of them; later layers win key by key.
//!
//! Lookup order:
//! 1. built-in defaults
//! 2. `$XDG_CONFIG_HOME/bootseq/config.toml`
//! 3. `bootseq.toml` in the working directory (or an explicit `--config` path)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// File name looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "bootseq.toml";

const DEFAULT_INDEX_URL: &str = "https://storage.googleapis.com/jax-releases/jax_releases.html";

const DEFAULT_PROJECT_EXTRAS: &[&str] = &[
    "docs", "dev", "full", "gmsh", "tidy3d", "devsim", "meow", "sax", "ray", "database",
    "kfactory", "femwell",
];

/// Fully resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Config {
    /// Shell used to source scripts
    pub shell: String,
    pub package_manager: PackageManagerConfig,
    pub build_script: ScriptConfig,
    pub test_script: ScriptConfig,
    pub index: IndexConfig,
    pub package: PackageConfig,
    pub project: ProjectConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageManagerConfig {
    pub program: String,
    /// Flag that answers yes to every prompt
    pub yes_flag: String,
    pub packages: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptConfig {
    pub path: PathBuf,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexConfig {
    pub variable: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageConfig {
    pub installer: String,
    pub name: String,
    pub extras: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectConfig {
    pub installer: String,
    pub path: PathBuf,
    pub editable: bool,
    pub extras: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            shell: "bash".to_string(),
            package_manager: PackageManagerConfig {
                program: "conda".to_string(),
                yes_flag: "-y".to_string(),
                packages: vec!["posix".to_string()],
            },
            build_script: ScriptConfig {
                path: PathBuf::from("scripts/build.sh"),
                enabled: true,
            },
            // Kept in the plan but switched off.
            test_script: ScriptConfig {
                path: PathBuf::from("scripts/test.sh"),
                enabled: false,
            },
            index: IndexConfig {
                variable: "PIP_FIND_LINKS".to_string(),
                url: DEFAULT_INDEX_URL.to_string(),
            },
            package: PackageConfig {
                installer: "pip".to_string(),
                name: "jax".to_string(),
                extras: vec!["cpu".to_string()],
            },
            project: ProjectConfig {
                installer: "pip".to_string(),
                path: PathBuf::from("."),
                editable: true,
                extras: DEFAULT_PROJECT_EXTRAS.iter().map(|s| s.to_string()).collect(),
            },
        }
    }
}

// On-disk layer: every key is optional.

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ConfigToml {
    shell: Option<String>,
    package_manager: Option<PackageManagerToml>,
    build_script: Option<ScriptToml>,
    test_script: Option<ScriptToml>,
    index: Option<IndexToml>,
    package: Option<PackageToml>,
    project: Option<ProjectToml>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct PackageManagerToml {
    program: Option<String>,
    yes_flag: Option<String>,
    packages: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ScriptToml {
    path: Option<PathBuf>,
    enabled: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct IndexToml {
    variable: Option<String>,
    url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct PackageToml {
    installer: Option<String>,
    name: Option<String>,
    extras: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ProjectToml {
    installer: Option<String>,
    path: Option<PathBuf>,
    editable: Option<bool>,
    extras: Option<Vec<String>>,
}

fn set<T>(dst: &mut T, src: Option<T>) {
    if let Some(v) = src {
        *dst = v;
    }
}

impl Config {
    /// Overlay one parsed file on top of `self`.
    fn merge(&mut self, layer: ConfigToml) {
        set(&mut self.shell, layer.shell);
        if let Some(pm) = layer.package_manager {
            set(&mut self.package_manager.program, pm.program);
            set(&mut self.package_manager.yes_flag, pm.yes_flag);
            set(&mut self.package_manager.packages, pm.packages);
        }
        if let Some(s) = layer.build_script {
            set(&mut self.build_script.path, s.path);
            set(&mut self.build_script.enabled, s.enabled);
        }
        if let Some(s) = layer.test_script {
            set(&mut self.test_script.path, s.path);
            set(&mut self.test_script.enabled, s.enabled);
        }
        if let Some(i) = layer.index {
            set(&mut self.index.variable, i.variable);
            set(&mut self.index.url, i.url);
        }
        if let Some(p) = layer.package {
            set(&mut self.package.installer, p.installer);
            set(&mut self.package.name, p.name);
            set(&mut self.package.extras, p.extras);
        }
        if let Some(p) = layer.project {
            set(&mut self.project.installer, p.installer);
            set(&mut self.project.path, p.path);
            set(&mut self.project.editable, p.editable);
            set(&mut self.project.extras, p.extras);
        }
    }

    /// Parse a TOML document and overlay it on the defaults.
    pub fn from_toml_str(content: &str, origin: &Path) -> Result<Self, ConfigError> {
        let mut config = Config::default();
        config.merge_str(content, origin)?;
        Ok(config)
    }

    fn merge_str(&mut self, content: &str, origin: &Path) -> Result<(), ConfigError> {
        let layer: ConfigToml = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        self.merge(layer);
        Ok(())
    }

    /// Overlay the file at `path` on top of `self`.
    pub fn merge_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        self.merge_str(&content, path)
    }

    /// Load defaults plus every config layer that exists.
    ///
    /// `explicit` replaces the working-directory lookup and must exist.
    /// Returns the config and the files that were applied, in order.
    pub fn discover(
        cwd: &Path,
        explicit: Option<&Path>,
    ) -> Result<(Self, Vec<PathBuf>), ConfigError> {
        Self::discover_in(user_config_path().as_deref(), cwd, explicit)
    }

    /// Like [`Config::discover`], with the user config file given directly.
    ///
    /// A `user` path that does not exist is skipped.
    pub fn discover_in(
        user: Option<&Path>,
        cwd: &Path,
        explicit: Option<&Path>,
    ) -> Result<(Self, Vec<PathBuf>), ConfigError> {
        let mut config = Config::default();
        let mut sources = Vec::new();

        if let Some(user) = user.filter(|p| p.is_file()) {
            config.merge_file(user)?;
            sources.push(user.to_path_buf());
        }

        match explicit {
            Some(path) => {
                config.merge_file(path)?;
                sources.push(path.to_path_buf());
            }
            None => {
                let local = cwd.join(LOCAL_CONFIG_FILE);
                if local.is_file() {
                    config.merge_file(&local)?;
                    sources.push(local);
                }
            }
        }

        config.validate()?;
        Ok((config, sources))
    }

    /// Reject values that would produce an unusable command line.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("shell", self.shell.as_str()),
            ("package_manager.program", self.package_manager.program.as_str()),
            ("index.variable", self.index.variable.as_str()),
            ("package.installer", self.package.installer.as_str()),
            ("package.name", self.package.name.as_str()),
            ("project.installer", self.project.installer.as_str()),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("{} must not be empty", key)));
            }
        }
        if self.package_manager.packages.is_empty() {
            return Err(ConfigError::Invalid(
                "package_manager.packages must list at least one package".into(),
            ));
        }
        let var = &self.index.variable;
        if var.contains('=') || var.contains('\0') {
            return Err(ConfigError::Invalid(format!(
                "index.variable is not a valid variable name: {}",
                var
            )));
        }
        Ok(())
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

/// Per-user config file location, if a config dir is known.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("bootseq").join("config.toml"))
}

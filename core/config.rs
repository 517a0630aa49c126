use crate::discover::DiscoveryOptions;
use crate::error::{AppError, Result};
use crate::ignore_rules::{DEFAULT_EXCLUDE_PATTERN, IgnoreMatcher};
use crate::output_formats::OutputFormat;
use crate::project;
use crate::registry::PluginRegistry;
use log;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_DIR: &str = ".xtools/xdeps";
pub const DEFAULT_CONFIG_FILENAME: &str = "xdeps.toml";
pub const DEFAULT_SAVE_DIR: &str = ".xtools/xdeps/output";
pub const DEFAULT_FILENAME_BASE: &str = "xdeps_bundle";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub languages: LanguagesConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub save: SaveConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct GeneralConfig {
    #[serde(default)]
    pub project_name: Option<String>,
    /// Case-insensitive regex over root-relative paths; empty disables it.
    #[serde(default = "default_exclude")]
    pub exclude: String,
    #[serde(default = "default_true")]
    pub use_gitignore: bool,
    #[serde(default = "default_true")]
    pub enable_builtin_ignore: bool,
    #[serde(default = "default_true")]
    pub canonicalize_paths: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct LanguagesConfig {
    #[serde(default)]
    pub disabled: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default = "default_true")]
    pub include_tree: bool,
    #[serde(default = "default_true")]
    pub include_project_root: bool,
    #[serde(default = "default_true")]
    pub include_timestamp: bool,
    #[serde(default = "default_false")]
    pub json_minify: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SaveConfig {
    #[serde(default = "default_save_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub filename_base: Option<String>,
    #[serde(default)]
    pub extension: Option<String>,
}

fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_exclude() -> String {
    DEFAULT_EXCLUDE_PATTERN.to_string()
}
fn default_format() -> String {
    "markdown".to_string()
}
fn default_save_dir() -> PathBuf {
    PathBuf::from(DEFAULT_SAVE_DIR)
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            project_name: None,
            exclude: default_exclude(),
            use_gitignore: default_true(),
            enable_builtin_ignore: default_true(),
            canonicalize_paths: default_true(),
        }
    }
}
impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            include_tree: default_true(),
            include_project_root: default_true(),
            include_timestamp: default_true(),
            json_minify: default_false(),
        }
    }
}
impl Default for SaveConfig {
    fn default() -> Self {
        Self {
            output_dir: default_save_dir(),
            filename_base: None,
            extension: None,
        }
    }
}

impl Config {
    /// `--project-root`, else `PROJECT_ROOT`, else the root located from
    /// the first input (or the current directory).
    pub fn determine_project_root(
        cli_project_root: Option<&PathBuf>,
        first_input: Option<&Path>,
    ) -> Result<PathBuf> {
        let explicit = cli_project_root
            .map(|p| p.to_string_lossy().to_string())
            .or_else(|| env::var("PROJECT_ROOT").ok().filter(|s| !s.is_empty()));

        let Some(path_str) = explicit else {
            let start = match first_input {
                Some(input) => PathBuf::from(shellexpand::tilde(&input.to_string_lossy()).as_ref()),
                None => env::current_dir().map_err(AppError::Io)?,
            };
            let root = project::locate_project_root(&start);
            log::debug!("Project root located from {}: {}", start.display(), root.display());
            return Ok(root);
        };

        let path_to_resolve = PathBuf::from(shellexpand::tilde(&path_str).as_ref());
        path_to_resolve.canonicalize().map_err(|e| {
            AppError::Io(std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to canonicalize project root '{}': {}",
                    path_to_resolve.display(),
                    e
                ),
            ))
        })
    }

    pub fn resolve_config_path(
        project_root: &Path,
        cli_config_file: Option<&String>,
        cli_disable_config: bool,
    ) -> Result<Option<PathBuf>> {
        if cli_disable_config {
            log::debug!("Config file loading disabled via CLI flag.");
            return Ok(None);
        }

        let Some(p_str) = cli_config_file else {
            let default_path = project_root
                .join(DEFAULT_CONFIG_DIR)
                .join(DEFAULT_CONFIG_FILENAME);
            if default_path.exists() {
                log::debug!("Using default config file path: {}", default_path.display());
                return Ok(Some(default_path));
            }
            log::debug!(
                "No config file specified and default not found at: {}",
                default_path.display()
            );
            return Ok(None);
        };

        let mut path = PathBuf::from(shellexpand::tilde(p_str).as_ref());
        let looks_like_path =
            path.is_absolute() || path.components().count() > 1 || p_str.contains(['/', '\\']);

        if looks_like_path {
            if !path.exists() && path.extension().is_none() {
                path.set_extension("toml");
            }
            if !path.exists() {
                return Err(AppError::Config(format!(
                    "Specified config file not found at path: {}",
                    path.display()
                )));
            }
            log::debug!("Using specified config file path: {}", path.display());
            return Ok(Some(path));
        }

        let filename = if path.extension().is_none_or(|e| e != "toml") {
            format!("{}.toml", path.to_string_lossy())
        } else {
            path.to_string_lossy().to_string()
        };
        let full_path = project_root.join(DEFAULT_CONFIG_DIR).join(filename);
        if !full_path.exists() {
            return Err(AppError::Config(format!(
                "Specified config file '{}' not found in default directory: {}",
                path.display(),
                project_root.join(DEFAULT_CONFIG_DIR).display()
            )));
        }
        log::debug!(
            "Using specified config filename in default directory: {}",
            full_path.display()
        );
        Ok(Some(full_path))
    }

    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        log::info!("Loading configuration from: {}", config_path.display());
        let toml_content = fs::read_to_string(config_path).map_err(|e| AppError::FileRead {
            path: config_path.to_path_buf(),
            source: e,
        })?;
        toml::from_str::<Config>(&toml_content).map_err(|e| {
            AppError::TomlParse(format!(
                "Error parsing config file '{}': {}. Check TOML syntax and structure.",
                config_path.display(),
                e
            ))
        })
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Writes the default configuration to `<project_root>/.xtools/xdeps/xdeps.toml`.
    pub fn save_default(project_root: &Path) -> Result<PathBuf> {
        let dir = project_root.join(DEFAULT_CONFIG_DIR);
        let path = dir.join(DEFAULT_CONFIG_FILENAME);
        fs::create_dir_all(&dir).map_err(|e| AppError::FileWrite {
            path: dir.clone(),
            source: e,
        })?;
        let content = Config::default().to_toml_string()?;
        fs::write(&path, content).map_err(|e| AppError::FileWrite {
            path: path.clone(),
            source: e,
        })?;
        log::info!("Default configuration written to {}", path.display());
        Ok(path)
    }

    pub fn output_format(&self) -> Result<OutputFormat> {
        self.output.format.parse()
    }

    pub fn get_effective_project_name(&self, project_root: &Path) -> String {
        self.general.project_name.clone().unwrap_or_else(|| {
            project_root
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "UnknownProject".to_string())
        })
    }

    pub fn build_matcher(&self, project_root: &Path) -> Result<IgnoreMatcher> {
        IgnoreMatcher::new(
            project_root,
            Some(self.general.exclude.as_str()),
            self.general.use_gitignore,
            self.general.enable_builtin_ignore,
        )
    }

    pub fn build_registry(&self) -> PluginRegistry {
        PluginRegistry::builtin_without(&self.languages.disabled)
    }

    pub fn discovery_options(&self) -> DiscoveryOptions {
        DiscoveryOptions {
            canonicalize_paths: self.general.canonicalize_paths,
        }
    }

    /// `<output_dir>/<filename_base>.<extension>`, with relative output
    /// directories taken from the project root.
    pub fn save_path(
        &self,
        project_root: &Path,
        dir_override: Option<&Path>,
        format: OutputFormat,
    ) -> PathBuf {
        let dir = dir_override.unwrap_or(self.save.output_dir.as_path());
        let dir = if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            project_root.join(dir)
        };
        let base = self
            .save
            .filename_base
            .as_deref()
            .unwrap_or(DEFAULT_FILENAME_BASE);
        let extension = self
            .save
            .extension
            .as_deref()
            .unwrap_or(format.extension())
            .trim_start_matches('.');
        dir.join(format!("{}.{}", base, extension))
    }
}

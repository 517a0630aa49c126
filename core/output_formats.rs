use crate::error::{AppError, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

#[derive(Debug, Default, Deserialize)]
pub struct BuiltinIgnores {
    #[serde(default)]
    pub directories: Vec<String>,
    #[serde(default)]
    pub files: Vec<String>,
}

static BUILTIN_IGNORE_PATTERNS: Lazy<BuiltinIgnores> = Lazy::new(|| {
    let yaml_content = include_str!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../data/builtin_ignores.yaml"
    ));
    serde_yml::from_str(yaml_content).expect("Failed to parse embedded data/builtin_ignores.yaml")
});
static LANGUAGE_LABELS: Lazy<HashMap<String, String>> = Lazy::new(|| {
    let yaml_content = include_str!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../data/languages.yaml"
    ));
    serde_yml::from_str(yaml_content).expect("Failed to parse embedded data/languages.yaml")
});

pub fn get_builtin_ignore_patterns() -> &'static BuiltinIgnores {
    &BUILTIN_IGNORE_PATTERNS
}
pub fn get_language_labels() -> &'static HashMap<String, String> {
    &LANGUAGE_LABELS
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Markdown,
    Json,
    Yaml,
    Xml,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Markdown => "md",
            OutputFormat::Json => "json",
            OutputFormat::Yaml => "yaml",
            OutputFormat::Xml => "xml",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "json" => Ok(OutputFormat::Json),
            "yaml" | "yml" => Ok(OutputFormat::Yaml),
            "xml" => Ok(OutputFormat::Xml),
            other => Err(AppError::InvalidArgument(format!(
                "Unknown output format \"{}\" (expected markdown, json, yaml or xml)",
                other
            ))),
        }
    }
}

pub fn serialize_to_json<T: Serialize>(value: &T, pretty: bool) -> Result<String> {
    if pretty {
        serde_json::to_string_pretty(value).map_err(AppError::JsonSerialize)
    } else {
        serde_json::to_string(value).map_err(AppError::JsonSerialize)
    }
}

pub fn serialize_to_yaml<T: Serialize>(value: &T) -> Result<String> {
    serde_yml::to_string(value).map_err(AppError::YamlError)
}

#[cfg(feature = "serde_support")]
pub fn serialize_to_xml<T: Serialize>(value: &T, root_name: &str) -> Result<String> {
    quick_xml::se::to_string_with_root(root_name, value)
        .map_err(|e| AppError::XmlSerialize(e.to_string()))
}

#[cfg(not(feature = "serde_support"))]
pub fn serialize_to_xml<T: Serialize>(_value: &T, _root_name: &str) -> Result<String> {
    Err(AppError::XmlSerialize(
        "XML output requires the serde_support feature".to_string(),
    ))
}

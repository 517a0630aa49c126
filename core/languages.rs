use crate::plugin::{LanguagePlugin, Specifier};
use indexmap::IndexSet;
use regex::Regex;
use std::sync::Arc;

pub mod c_family;
pub mod css;
pub mod dockerfile;
pub mod ecmascript;
pub mod go;
pub mod html;
pub mod java;
pub mod php;
pub mod python;
pub mod ruby;
pub mod rust;
pub mod shell;

/// The built-in plugins in registration order. This order is also the
/// extension-probe order and the fallback resolver order.
pub fn builtin_plugins() -> Vec<Arc<dyn LanguagePlugin>> {
    vec![
        Arc::new(ecmascript::JavaScript),
        Arc::new(ecmascript::TypeScript),
        Arc::new(python::Python),
        Arc::new(ruby::Ruby),
        Arc::new(rust::Rust),
        Arc::new(go::Go),
        Arc::new(c_family::CFamily),
        Arc::new(css::Css),
        Arc::new(java::Java),
        Arc::new(php::Php),
        Arc::new(html::Html),
        Arc::new(shell::Shell),
        Arc::new(dockerfile::Dockerfile),
    ]
}

/// Collects capture group 1 of every match, in order of first appearance.
pub(crate) fn capture_all(regex: &Regex, content: &str) -> IndexSet<String> {
    regex
        .captures_iter(content)
        .filter_map(|c| c.get(1).map(|m| m.as_str().trim().to_string()))
        .filter(|v| !v.is_empty())
        .collect()
}

pub(crate) fn dedup(specifiers: Vec<Specifier>) -> Vec<Specifier> {
    let unique: IndexSet<Specifier> = specifiers.into_iter().collect();
    unique.into_iter().collect()
}

pub(crate) fn is_remote_reference(value: &str) -> bool {
    let lower = value.to_ascii_lowercase();
    lower.starts_with("http://")
        || lower.starts_with("https://")
        || lower.starts_with("//")
        || lower.starts_with("data:")
        || lower.starts_with("mailto:")
}

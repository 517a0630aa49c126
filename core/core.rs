pub mod alias;
pub mod bundle;
pub mod config;
pub mod discover;
pub mod error;
pub mod ignore_rules;
pub mod languages;
pub mod output_formats;
pub mod plugin;
pub mod project;
pub mod registry;
pub mod stats;
pub mod tree;
pub mod walker;

pub use alias::{AliasConfig, load_alias_config};
pub use bundle::{BundleDocument, BundleFile, BundleOptions};
pub use config::Config;
pub use discover::{
    DependencyGraphBuilder, DiscoveryEvent, DiscoveryOptions, DiscoveryReport,
    discover_from_inputs,
};
pub use error::{AppError, Result};
pub use ignore_rules::IgnoreMatcher;
pub use output_formats::{
    OutputFormat, get_builtin_ignore_patterns, get_language_labels, serialize_to_json,
    serialize_to_xml, serialize_to_yaml,
};
pub use plugin::{LanguagePlugin, ResolutionContext, Resolver, ScanContext, Specifier};
pub use project::locate_project_root;
pub use registry::PluginRegistry;
pub use stats::{BundleStats, FileStats, calculate_stats};
pub use tree::{DirectoryTreeNode, build_tree, render_tree};

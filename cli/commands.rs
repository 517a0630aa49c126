pub mod bundle;
pub mod completion;
pub mod config;
pub mod debug;
pub mod list;
pub mod stats;
pub mod tree;

use crate::cli_args::{DiscoveryArgs, FormatOutputOpts};
use crate::load_config_for_command;
use anyhow::{Context, Result};
use log;
use std::path::PathBuf;
use xdeps_core::{Config, DiscoveryReport, PluginRegistry, discover_from_inputs};

/// Everything a discovery-based command needs after the traversal.
pub struct Discovery {
    pub project_root: PathBuf,
    pub config: Config,
    pub registry: PluginRegistry,
    pub report: DiscoveryReport,
}

impl Discovery {
    pub fn project_name(&self) -> String {
        self.config.get_effective_project_name(&self.project_root)
    }
}

/// Resolves the project root and config, then runs discovery from the
/// command's input paths.
pub fn run_discovery(
    args: &DiscoveryArgs,
    format_opts: Option<&FormatOutputOpts>,
) -> Result<Discovery> {
    let project_root = Config::determine_project_root(
        args.project_config.project_root.as_ref(),
        args.paths.first().map(PathBuf::as_path),
    )
    .context("Failed to determine project root")?;
    log::info!("Project root determined: {}", project_root.display());

    let config = load_config_for_command(
        &project_root,
        &args.project_config,
        Some(&args.filters),
        format_opts,
    )
    .context("Failed to load configuration")?;

    let matcher = config
        .build_matcher(&project_root)
        .context("Failed to build ignore rules")?;
    let registry = config.build_registry();
    log::debug!(
        "Registry: {} plugin(s), {} extension(s)",
        registry.plugins().len(),
        registry.all_extensions().len()
    );

    let report = discover_from_inputs(
        &args.paths,
        &registry,
        &matcher,
        config.discovery_options(),
    )?;
    log::info!(
        "Discovered {} file(s) with {} scan(s); {} unresolved reference(s)",
        report.files.len(),
        report.scan_count,
        report.unresolved_count()
    );

    Ok(Discovery {
        project_root,
        config,
        registry,
        report,
    })
}

use crate::cli_args::BundleArgs;
use crate::commands::run_discovery;
use crate::output::{Sink, serialize_output};
use anyhow::{Context, Result};
use log;
use xdeps_core::{BundleDocument, BundleOptions, OutputFormat};

pub fn handle_bundle_command(args: BundleArgs, quiet: bool) -> Result<()> {
    let discovery = run_discovery(&args.discovery, Some(&args.format_output))?;
    let config = &discovery.config;
    let format = config
        .output_format()
        .context("Invalid output format in configuration")?;

    let options = BundleOptions {
        project_name: discovery.project_name(),
        include_tree: config.output.include_tree && !args.no_tree,
        include_project_root: config.output.include_project_root,
        include_timestamp: config.output.include_timestamp,
    };
    let files = discovery.report.sorted_files();
    let document = BundleDocument::build(&discovery.project_root, &files, &options);
    log::debug!(
        "Bundle assembled: {} of {} discovered file(s) have readable text content",
        document.files.len(),
        files.len()
    );

    let content = match format {
        OutputFormat::Markdown => document.to_markdown(),
        structured => serialize_output(&document, structured, !config.output.json_minify, "bundle")?,
    };
    Sink::from_opts(&args.target, config, &discovery.project_root, format).emit(
        &content,
        "Bundle",
        quiet,
    )
}

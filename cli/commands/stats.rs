use crate::cli_args::StatsArgs;
use crate::commands::run_discovery;
use crate::output::{print_stats_pretty_table, requested_format, serialize_output, write_to_stdout};
use anyhow::{Context, Result};
use log;
use xdeps_core::{BundleDocument, BundleOptions, OutputFormat, calculate_stats};

pub fn handle_stats_command(args: StatsArgs, quiet: bool) -> Result<()> {
    let discovery = run_discovery(&args.discovery, Some(&args.format_output))?;
    let format = requested_format(args.format_output.format.as_deref())?;

    let options = BundleOptions {
        project_name: discovery.project_name(),
        include_tree: false,
        include_project_root: false,
        include_timestamp: false,
    };
    let document = BundleDocument::build(
        &discovery.project_root,
        &discovery.report.sorted_files(),
        &options,
    );
    if document.files.is_empty() && !quiet {
        println!("No text files discovered to calculate statistics.");
        return Ok(());
    }

    log::debug!("Calculating statistics...");
    let stats = calculate_stats(&document.files).context("Failed to calculate statistics")?;
    log::debug!("Statistics calculation complete.");

    match format {
        None | Some(OutputFormat::Markdown) => {
            print_stats_pretty_table(&stats);
            Ok(())
        }
        Some(structured) => write_to_stdout(&serialize_output(
            &stats,
            structured,
            !discovery.config.output.json_minify,
            "stats",
        )?),
    }
}

use crate::cli_args::DebugArgs;
use crate::commands::{Discovery, run_discovery};
use crate::output::{requested_format, serialize_output, write_to_stdout};
use anyhow::{Context, Result};
use colored::*;
use log;
use pathdiff;
use serde::Serialize;
use std::path::{Path, PathBuf};
use toml;
use xdeps_core::alias::find_alias_config_file;
use xdeps_core::{Config, DiscoveryEvent, OutputFormat};

#[derive(Debug, Serialize)]
struct PluginInfo {
    name: &'static str,
    extensions: Vec<&'static str>,
    resolves: bool,
}

#[derive(Debug, Serialize)]
struct DebugInfo<'a> {
    project_root: &'a Path,
    effective_config: &'a Config,
    alias_config: Option<PathBuf>,
    plugins: Vec<PluginInfo>,
    seeds: Vec<String>,
    discovered_files: Vec<String>,
    scan_count: usize,
    events: &'a [DiscoveryEvent],
}

pub fn handle_debug_command(args: DebugArgs) -> Result<()> {
    let discovery = run_discovery(&args.discovery, Some(&args.format_output))?;
    let format = requested_format(args.format_output.format.as_deref())?;
    let debug_data = collect_debug_info(&discovery);

    match format {
        None | Some(OutputFormat::Markdown) => {
            log::debug!("Debug: Printing pretty output...");
            print_debug_info_pretty(&debug_data)
        }
        Some(structured) => {
            log::debug!("Debug: Printing structured output ({:?})...", structured);
            write_to_stdout(&serialize_output(
                &debug_data,
                structured,
                !discovery.config.output.json_minify,
                "debug",
            )?)
        }
    }
}

fn collect_debug_info(discovery: &Discovery) -> DebugInfo<'_> {
    let root = discovery.project_root.as_path();
    let report = &discovery.report;

    let plugins = discovery
        .registry
        .plugins()
        .iter()
        .map(|plugin| PluginInfo {
            name: plugin.name(),
            extensions: plugin.extensions().to_vec(),
            resolves: plugin.resolver().is_some(),
        })
        .collect();

    let seeds = report
        .events
        .iter()
        .filter_map(|event| match event {
            DiscoveryEvent::Seeded { path, .. } => Some(relative_path(path, root)),
            _ => None,
        })
        .collect();

    DebugInfo {
        project_root: root,
        effective_config: &discovery.config,
        alias_config: report
            .files
            .first()
            .and_then(|hint| find_alias_config_file(root, hint)),
        plugins,
        seeds,
        discovered_files: report
            .sorted_files()
            .iter()
            .map(|f| relative_path(f, root))
            .collect(),
        scan_count: report.scan_count,
        events: &report.events,
    }
}

fn relative_path(path: &Path, project_root: &Path) -> String {
    pathdiff::diff_paths(path, project_root)
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

fn print_debug_info_pretty(debug_info: &DebugInfo) -> Result<()> {
    print_heading("Project Root");
    println!("{}", debug_info.project_root.display().to_string().cyan());

    print_heading("Effective Configuration");
    let config_toml = toml::to_string_pretty(debug_info.effective_config)
        .context("Failed to serialize effective config to TOML")?;
    println!("{}", config_toml);

    print_heading("Alias Config");
    match &debug_info.alias_config {
        Some(path) => println!("{}", path.display().to_string().cyan()),
        None => println!("{}", "(None found)".dimmed()),
    }

    print_heading("Registered Plugins");
    println!(
        "{:<14} {:<9} {}",
        "Plugin".bold(),
        "Resolves".bold(),
        "Extensions".bold()
    );
    println!("{:-<65}", "");
    for plugin in &debug_info.plugins {
        let resolves = if plugin.resolves {
            "yes".green()
        } else {
            "no".dimmed()
        };
        println!(
            "{:<14} {:<9} {}",
            plugin.name.blue(),
            resolves,
            plugin.extensions.join(" ")
        );
    }

    print_path_list("Seeds", &debug_info.seeds);
    print_path_list("Discovered Files", &debug_info.discovered_files);

    print_heading("Discovery Events");
    if debug_info.events.is_empty() {
        println!("{}", "(None)".dimmed());
    }
    for event in debug_info.events {
        println!("{}", describe_event(event, debug_info.project_root));
    }
    println!(
        "\n{} {}",
        "Files scanned:".green(),
        debug_info.scan_count.to_string().cyan()
    );

    println!("{}", "\n--- End Debug Info ---".green().bold());
    Ok(())
}

fn print_heading(title: &str) {
    println!(
        "{}",
        format!("\n--- {} ---", title).green().bold().underline()
    );
}

fn print_path_list(title: &str, paths: &[String]) {
    print_heading(title);
    if paths.is_empty() {
        println!("{}", "(None)".dimmed());
    } else {
        paths.iter().for_each(|p| println!("- {}", p.cyan()));
    }
}

fn describe_event(event: &DiscoveryEvent, root: &Path) -> String {
    match event {
        DiscoveryEvent::MissingInput { path } => {
            format!("{} {}", "missing ".red(), relative_path(path, root))
        }
        DiscoveryEvent::Seeded { path, recognized } => {
            let note = if *recognized { "" } else { " (not scanned)" };
            format!("{} {}{}", "seed    ".blue(), relative_path(path, root), note.dimmed())
        }
        DiscoveryEvent::Scanned {
            path,
            plugin,
            specifiers,
        } => format!(
            "{} {} [{}] {} specifier(s)",
            "scan    ".magenta(),
            relative_path(path, root),
            plugin,
            specifiers
        ),
        DiscoveryEvent::Resolved {
            from,
            specifier,
            to,
            via,
        } => format!(
            "{} {}: {} -> {} ({})",
            "resolve ".green(),
            relative_path(from, root),
            specifier,
            relative_path(to, root),
            via.dimmed()
        ),
        DiscoveryEvent::Unresolved { from, specifier } => {
            format!("{} {}: {}", "miss    ".yellow(), relative_path(from, root), specifier)
        }
        DiscoveryEvent::Excluded { from, path } => {
            format!("{} {}: {}", "exclude ".dimmed(), relative_path(from, root), relative_path(path, root))
        }
        DiscoveryEvent::NotAFile { from, path } => {
            format!("{} {}: {}", "not file".dimmed(), relative_path(from, root), relative_path(path, root))
        }
        DiscoveryEvent::ReadFailed { path, error } => {
            format!("{} {}: {}", "unread  ".red(), relative_path(path, root), error)
        }
    }
}

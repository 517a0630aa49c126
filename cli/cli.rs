mod cli_args;
mod commands;
mod output;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use colored::*;
use log;
use std::path::Path;
use std::process;

use cli_args::{Cli, Commands, FilterOpts, FormatOutputOpts, ProjectConfigOpts};
use xdeps_core::{AppError, Config};

fn main() {
    let cli_args = Cli::parse();

    setup_logging(cli_args.quiet, cli_args.verbose);

    let quiet = cli_args.quiet;

    log::debug!("CLI args parsed: {:?}", cli_args);

    let exit_code = match run_app(cli_args, quiet) {
        Ok(_) => {
            log::info!("Application finished successfully.");
            0
        }
        Err(e) => {
            let exit_code = exit_code_for(&e);
            if !quiet || exit_code == 1 || exit_code == 5 {
                eprintln!("{} {:#}", "Error:".red().bold(), e);
            } else {
                log::error!("Application failed: {:#}", e);
            }
            exit_code
        }
    };
    log::debug!("Exiting with code {}", exit_code);
    process::exit(exit_code);
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<AppError>() {
        Some(AppError::Config(_)) => 1,
        Some(AppError::TomlParse(_)) => 1,
        Some(AppError::TomlSerialize(_)) => 1,
        Some(AppError::Io(_)) => 2,
        Some(AppError::FileRead { .. }) => 2,
        Some(AppError::FileWrite { .. }) => 2,
        Some(AppError::NoSeedFiles(_)) => 3,
        Some(AppError::InvalidPattern { .. }) => 5,
        Some(AppError::Glob(_)) => 5,
        Some(AppError::InvalidArgument(_)) => 5,
        Some(AppError::JsonSerialize(_)) => 6,
        Some(AppError::YamlError(_)) => 6,
        Some(AppError::XmlSerialize(_)) => 6,
        Some(AppError::TikToken(_)) => 8,
        Some(_) => 1,
        None => 1,
    }
}

fn setup_logging(quiet: bool, verbose: u8) {
    let log_level = if quiet {
        log::LevelFilter::Off
    } else {
        match verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();
    log::trace!("Logger initialized with level: {:?}", log_level);
}

fn run_app(cli: Cli, quiet: bool) -> Result<()> {
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };
    match command {
        Commands::Bundle(args) => {
            log::debug!("Executing 'bundle' command...");
            commands::bundle::handle_bundle_command(args, quiet)?;
        }
        Commands::List(args) => {
            log::debug!("Executing 'list' command...");
            commands::list::handle_list_command(args, quiet)?;
        }
        Commands::Tree(args) => {
            log::debug!("Executing 'tree' command...");
            commands::tree::handle_tree_command(args, quiet)?;
        }
        Commands::Stats(args) => {
            log::debug!("Executing 'stats' command...");
            commands::stats::handle_stats_command(args, quiet)?;
        }
        Commands::Debug(args) => {
            log::debug!("Executing 'debug' command...");
            commands::debug::handle_debug_command(args)?;
        }
        Commands::Completion(args) => {
            log::debug!("Executing 'completion' command...");
            commands::completion::handle_completion_command(&args, quiet)?;
        }
        Commands::Config(args) => {
            log::debug!("Executing 'config' command...");
            let project_root = Config::determine_project_root(
                args.project_root.as_ref(),
                None,
            )
            .context("Failed to determine project root for config command")?;
            commands::config::handle_config_command(&args, &project_root, quiet)?;
        }
    }
    Ok(())
}

fn merge_config_with_cli_overrides(
    mut config: Config,
    project_opts: &ProjectConfigOpts,
    filters: Option<&FilterOpts>,
    format_opts: Option<&FormatOutputOpts>,
) -> Config {
    log::trace!("Applying CLI overrides to config...");

    if let Some(name) = &project_opts.project_name {
        config.general.project_name = Some(name.clone());
    }

    if let Some(filters) = filters {
        if let Some(exclude) = &filters.exclude {
            config.general.exclude = exclude.clone();
        }
        if filters.no_gitignore {
            config.general.use_gitignore = false;
        }
        if filters.no_builtin_ignore {
            config.general.enable_builtin_ignore = false;
        }
        for name in &filters.disable_language {
            if !config.languages.disabled.contains(name) {
                config.languages.disabled.push(name.clone());
            }
        }
    }

    if let Some(fmt_opts) = format_opts {
        if let Some(format) = &fmt_opts.format {
            config.output.format = format.clone();
        }
        if fmt_opts.enable_json_minify {
            config.output.json_minify = true;
        }
        if fmt_opts.disable_json_minify {
            config.output.json_minify = false;
        }
    }

    log::trace!("Config after CLI overrides: {:?}", config);
    config
}

/// Loads the config file selected by `project_opts` and layers the CLI
/// overrides on top.
pub fn load_config_for_command(
    project_root: &Path,
    project_opts: &ProjectConfigOpts,
    filters: Option<&FilterOpts>,
    format_opts: Option<&FormatOutputOpts>,
) -> Result<Config> {
    let config_path = Config::resolve_config_path(
        project_root,
        project_opts.context_file.as_ref(),
        project_opts.disable_context_file,
    )
    .context("Failed to resolve configuration path")?;

    let config = match &config_path {
        Some(path) => Config::load_from_path(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };

    let mut config = merge_config_with_cli_overrides(config, project_opts, filters, format_opts);
    config.general.project_name = Some(config.get_effective_project_name(project_root));
    Ok(config)
}

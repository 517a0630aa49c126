use crate::cli_args::ConfigArgs;
use crate::output::{confirm_overwrite, write_to_stdout};
use anyhow::{Context, Result};
use colored::*;
use std::path::Path;
use xdeps_core::Config;
use xdeps_core::config::{DEFAULT_CONFIG_DIR, DEFAULT_CONFIG_FILENAME};

pub fn handle_config_command(args: &ConfigArgs, project_root: &Path, quiet: bool) -> Result<()> {
    if !args.save {
        let content = Config::default()
            .to_toml_string()
            .context("Failed to serialize default configuration")?;
        return write_to_stdout(&content);
    }

    let target = project_root
        .join(DEFAULT_CONFIG_DIR)
        .join(DEFAULT_CONFIG_FILENAME);
    if !confirm_overwrite(&target, "Config file", quiet)? {
        println!("Save cancelled.");
        return Ok(());
    }

    let saved = Config::save_default(project_root)?;
    if !quiet {
        println!(
            "{} Default config saved to: {}",
            "✅".green(),
            saved.display().to_string().blue()
        );
    }
    Ok(())
}

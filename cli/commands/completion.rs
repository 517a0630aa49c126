use anyhow::{Context, Result};
use clap::CommandFactory;
use clap_complete::{Shell, generate};
use colored::*;
use std::fs::{self, File};
use std::io;
use std::path::PathBuf;
use xdeps_core::AppError;

use crate::cli_args::{Cli, CompletionArgs};
use crate::output::confirm_overwrite;

fn parse_shell(name: &str) -> Result<Shell> {
    match name.to_lowercase().as_str() {
        "fish" => Ok(Shell::Fish),
        "bash" => Ok(Shell::Bash),
        "zsh" => Ok(Shell::Zsh),
        _ => Err(AppError::InvalidArgument(format!(
            "Unsupported shell for completion: {}",
            name
        ))
        .into()),
    }
}

/// Conventional per-user completion location for `shell`.
fn default_completion_path(shell: Shell, bin_name: &str) -> Result<PathBuf> {
    let (dir, filename) = match shell {
        Shell::Fish => (
            dirs::config_dir().map(|p| p.join("fish").join("completions")),
            format!("{}.fish", bin_name),
        ),
        Shell::Bash => (
            dirs::data_local_dir().map(|p| p.join("bash-completion").join("completions")),
            bin_name.to_string(),
        ),
        Shell::Zsh => (
            dirs::data_local_dir().map(|p| p.join("zsh").join("site-functions")),
            format!("_{}", bin_name),
        ),
        other => anyhow::bail!(AppError::InvalidArgument(format!(
            "Default save location not known for shell: {}",
            other
        ))),
    };
    let dir = dir.ok_or_else(|| anyhow::anyhow!("Could not determine standard completion directory."))?;
    Ok(dir.join(filename))
}

pub fn handle_completion_command(args: &CompletionArgs, quiet: bool) -> Result<()> {
    let shell_name = args.shell.as_deref().unwrap_or("fish");
    let shell = parse_shell(shell_name)?;

    let mut command = Cli::command();
    let bin_name = command.get_name().to_string();

    if !args.save {
        generate(shell, &mut command, bin_name, &mut io::stdout());
        return Ok(());
    }

    let save_path = default_completion_path(shell, &bin_name)?;
    if !confirm_overwrite(&save_path, "Completion file", quiet)? {
        println!("Save cancelled.");
        return Ok(());
    }
    if let Some(dir) = save_path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory {}", dir.display()))?;
    }
    let mut file = File::create(&save_path)
        .with_context(|| format!("Failed to create file {}", save_path.display()))?;
    generate(shell, &mut command, bin_name, &mut file);

    if !quiet {
        println!(
            "{} {} completions saved to: {}",
            "✅".green(),
            shell_name.cyan(),
            save_path.display().to_string().blue()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shell_names_are_case_insensitive() {
        assert_eq!(parse_shell("ZSH").unwrap(), Shell::Zsh);
        assert!(parse_shell("powershell").is_err());
    }

    #[test]
    fn zsh_completion_file_is_underscored() {
        if let Ok(path) = default_completion_path(Shell::Zsh, "xdeps") {
            assert_eq!(path.file_name().unwrap(), "_xdeps");
        }
    }
}

use anyhow::{Context, Result};
use colored::*;
use comfy_table::{Cell, CellAlignment, Color, ContentArrangement, Table, presets::UTF8_FULL};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use xdeps_core::{BundleStats, Config, OutputFormat, output_formats};

use crate::cli_args::OutputTargetOpts;

/// Where a command's rendered output goes.
pub enum Sink {
    Stdout,
    File(PathBuf),
}

impl Sink {
    /// `--output` wins, then `--save [DIR]` through the `[save]` config,
    /// else stdout.
    pub fn from_opts(
        target: &OutputTargetOpts,
        config: &Config,
        project_root: &Path,
        format: OutputFormat,
    ) -> Self {
        if let Some(path) = &target.output {
            return Sink::File(path.clone());
        }
        match &target.save {
            Some(dir) => Sink::File(config.save_path(project_root, dir.as_deref(), format)),
            None => Sink::Stdout,
        }
    }

    pub fn emit(&self, content: &str, what: &str, quiet: bool) -> Result<()> {
        match self {
            Sink::Stdout => write_to_stdout(content),
            Sink::File(path) => {
                write_to_file(path, content)?;
                if !quiet {
                    eprintln!(
                        "{} {} saved to: {}",
                        "✅".green(),
                        what,
                        path.display().to_string().blue()
                    );
                }
                Ok(())
            }
        }
    }
}

/// Serializes `data` in one of the structured formats. Markdown has no
/// generic rendering and falls back to pretty JSON.
pub fn serialize_output<T: Serialize>(
    data: &T,
    format: OutputFormat,
    pretty_json: bool,
    xml_root: &str,
) -> Result<String> {
    let content = match format {
        OutputFormat::Yaml => output_formats::serialize_to_yaml(data)?,
        OutputFormat::Xml => output_formats::serialize_to_xml(data, xml_root)?,
        OutputFormat::Json => output_formats::serialize_to_json(data, pretty_json)?,
        OutputFormat::Markdown => output_formats::serialize_to_json(data, true)?,
    };
    Ok(content)
}

/// The explicitly requested format, if any. `None` means the command's own
/// text rendering.
pub fn requested_format(format: Option<&str>) -> Result<Option<OutputFormat>> {
    format
        .map(|f| f.parse::<OutputFormat>())
        .transpose()
        .context("Invalid output format")
}

/// Asks before replacing `path`. Quiet mode never overwrites.
pub fn confirm_overwrite(path: &Path, what: &str, quiet: bool) -> Result<bool> {
    if !path.exists() {
        return Ok(true);
    }
    if quiet {
        anyhow::bail!(
            "Target file '{}' exists. Overwrite prevented in quiet mode.",
            path.display()
        );
    }
    print!(
        "{} {} already exists at '{}'. Overwrite? [{}/{}] ",
        "⚠️".yellow(),
        what,
        path.display().to_string().cyan(),
        "y".green(),
        "N".red()
    );
    io::stdout().flush().context("Failed to flush stdout")?;
    let mut response = String::new();
    io::stdin()
        .read_line(&mut response)
        .context("Failed to read user input")?;
    Ok(response.trim().eq_ignore_ascii_case("y"))
}

pub fn write_to_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let mut file =
        File::create(path).with_context(|| format!("Failed to create file {}", path.display()))?;
    file.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write to file {}", path.display()))?;
    Ok(())
}

pub fn write_to_stdout(content: &str) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(content.as_bytes())
        .context("Failed to write to stdout")?;
    if !content.ends_with('\n') {
        handle
            .write_all(b"\n")
            .context("Failed to write newline to stdout")?;
    }
    handle.flush().context("Failed to flush stdout")?;
    Ok(())
}

pub fn print_stats_pretty_table(stats: &BundleStats) {
    println!();
    println!("{}", " Bundle Statistics ".green().bold().underline());
    println!(
        "{:<20} {}",
        "Total Files:".green(),
        stats.total_files.to_string().cyan()
    );
    println!(
        "{:<20} {}",
        "Total Lines:".green(),
        stats.total_lines.to_string().cyan()
    );
    println!(
        "{:<20} {}",
        "Total Size:".green(),
        stats.total_bytes_readable.cyan()
    );
    println!(
        "{:<20} {}",
        "Est. Tokens:".green(),
        stats.estimated_tokens.to_string().cyan()
    );

    if stats.files_details.is_empty() {
        println!("\n{}", "(No non-empty text files discovered)".yellow());
    } else {
        println!("\n{}", " File Details ".green().bold().underline());
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec![
            Cell::new("Path").fg(Color::Green),
            Cell::new("Language").fg(Color::Green),
            Cell::new("Lines").fg(Color::Green),
            Cell::new("Size").fg(Color::Green),
            Cell::new("Tokens").fg(Color::Green),
        ]);
        for file in &stats.files_details {
            table.add_row(vec![
                Cell::new(&file.path).fg(Color::Cyan),
                Cell::new(&file.language).fg(Color::DarkGrey),
                Cell::new(file.lines).set_alignment(CellAlignment::Right),
                Cell::new(&file.bytes_readable)
                    .set_alignment(CellAlignment::Right)
                    .fg(Color::DarkGrey),
                Cell::new(file.estimated_tokens).set_alignment(CellAlignment::Right),
            ]);
        }
        println!("{table}");
    }
    println!();
}

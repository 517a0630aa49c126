use crate::cli_args::ListArgs;
use crate::commands::run_discovery;
use crate::output::{Sink, requested_format, serialize_output};
use anyhow::Result;
use xdeps_core::{OutputFormat, bundle::relative_display};

pub fn handle_list_command(args: ListArgs, quiet: bool) -> Result<()> {
    let discovery = run_discovery(&args.discovery, Some(&args.format_output))?;
    let format = requested_format(args.format_output.format.as_deref())?;

    let paths: Vec<String> = discovery
        .report
        .sorted_files()
        .iter()
        .map(|file| {
            if args.absolute {
                file.to_string_lossy().into_owned()
            } else {
                relative_display(file, &discovery.project_root)
            }
        })
        .collect();

    let content = match format {
        None | Some(OutputFormat::Markdown) => paths.join("\n"),
        Some(structured) => serialize_output(
            &paths,
            structured,
            !discovery.config.output.json_minify,
            "files",
        )?,
    };
    let sink_format = format.unwrap_or(OutputFormat::Markdown);
    Sink::from_opts(&args.target, &discovery.config, &discovery.project_root, sink_format)
        .emit(&content, "File list", quiet)
}

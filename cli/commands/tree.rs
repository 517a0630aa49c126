use crate::cli_args::TreeArgs;
use crate::commands::run_discovery;
use crate::output::{Sink, requested_format, serialize_output};
use anyhow::Result;
use xdeps_core::{OutputFormat, bundle, render_tree};

pub fn handle_tree_command(args: TreeArgs, quiet: bool) -> Result<()> {
    let discovery = run_discovery(&args.discovery, Some(&args.format_output))?;
    let format = requested_format(args.format_output.format.as_deref())?;

    let relative: Vec<String> = discovery
        .report
        .sorted_files()
        .iter()
        .map(|file| bundle::relative_display(file, &discovery.project_root))
        .collect();
    let tree = bundle::build_project_tree(&discovery.project_name(), &relative);

    let content = match format {
        None | Some(OutputFormat::Markdown) => render_tree(&tree),
        Some(structured) => serialize_output(
            &tree,
            structured,
            !discovery.config.output.json_minify,
            "tree",
        )?,
    };
    let sink_format = format.unwrap_or(OutputFormat::Markdown);
    Sink::from_opts(&args.target, &discovery.config, &discovery.project_root, sink_format)
        .emit(&content, "Tree", quiet)
}

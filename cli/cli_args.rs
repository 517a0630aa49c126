use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Args, Debug, Clone, Default)]
pub struct ProjectConfigOpts {
    #[arg(
        long,
        help = "Base directory for root-relative resolution (default: located from the first input).",
        help_heading = "Project Setup",
        value_name = "PATH"
    )]
    pub project_root: Option<PathBuf>,

    #[arg(
        long,
        help = "Specify path/filename of the TOML config file (default: .xtools/xdeps/xdeps.toml).",
        value_name = "CONTEXT_FILE",
        conflicts_with = "disable_context_file",
        help_heading = "Project Setup"
    )]
    pub context_file: Option<String>,

    #[arg(
        long,
        help = "Disable loading any TOML config file.",
        conflicts_with = "context_file",
        help_heading = "Project Setup"
    )]
    pub disable_context_file: bool,

    #[arg(
        long,
        help = "Specify the project name (overrides config/dir name).",
        value_name = "NAME",
        help_heading = "Project Setup"
    )]
    pub project_name: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct FormatOutputOpts {
    #[arg(short = 'f', long, help = "Set the output format.", value_name = "FORMAT", value_parser = ["markdown", "json", "yaml", "xml"], help_heading = "Output Formatting")]
    pub format: Option<String>,

    #[arg(
        long,
        help = "Ensure JSON output is compact (minified).",
        conflicts_with = "disable_json_minify",
        help_heading = "Output Formatting"
    )]
    pub enable_json_minify: bool,

    #[arg(
        long,
        help = "Ensure JSON output is pretty-printed [default].",
        conflicts_with = "enable_json_minify",
        help_heading = "Output Formatting"
    )]
    pub disable_json_minify: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct FilterOpts {
    #[arg(
        short = 'e',
        long,
        value_name = "REGEX",
        help = "Case-insensitive exclude regex over root-relative paths (empty string disables it).",
        help_heading = "Filtering"
    )]
    pub exclude: Option<String>,

    #[arg(
        long,
        help = "Do not read .gitignore/.ignore files.",
        help_heading = "Filtering"
    )]
    pub no_gitignore: bool,

    #[arg(
        long,
        help = "Disable default built-in ignores (lock files, images, archives...).",
        help_heading = "Filtering"
    )]
    pub no_builtin_ignore: bool,

    #[arg(long = "disable-language", value_name = "PLUGIN", action = clap::ArgAction::Append, help = "Leave a language plugin out of the registry (e.g., php).", help_heading = "Filtering")]
    pub disable_language: Vec<String>,
}

/// Inputs and settings shared by every command that runs discovery.
#[derive(Args, Debug, Clone)]
pub struct DiscoveryArgs {
    #[arg(
        required = true,
        value_name = "PATHS",
        help = "Seed files or directories."
    )]
    pub paths: Vec<PathBuf>,

    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,
    #[clap(flatten)]
    pub filters: FilterOpts,
}

#[derive(Args, Debug, Clone, Default)]
pub struct OutputTargetOpts {
    #[arg(
        short = 'o',
        long,
        value_name = "FILE",
        help = "Write the result to FILE instead of stdout.",
        conflicts_with = "save",
        help_heading = "Output Control"
    )]
    pub output: Option<PathBuf>,

    #[arg(
        short = 's', long, value_name = "SAVE_DIR",
        num_args = 0..=1,
        help_heading = "Output Control",
        help = "Save the result. Optional SAVE_DIR overrides config/default logic.",
    )]
    pub save: Option<Option<PathBuf>>,
}

#[derive(Parser, Debug)]
#[command(
    name = "xdeps",
    author,
    version,
    about = "Bundle a file and everything it references into one document.",
    long_about = "xdeps starts from the given files or directories, follows imports, includes and \nrequires across 13 languages, and renders every reachable project file as a \nsingle tree + codebase document suitable for AI processing.",
    help_template = "{about-section}\nUsage: {usage}\n\n{all-args}{after-help}",
    after_help = "EXAMPLES:\n  xdeps bundle src/main.ts -o bundle.md\n  xdeps list app/models/user.rb -f json\n  xdeps tree cmd/server/main.go\n  xdeps stats src/",
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[arg(short, long, action = clap::ArgAction::Count, global = true, help = "Increase message verbosity (-v, -vv, -vvv).")]
    pub verbose: u8,

    #[arg(
        short,
        long,
        global = true,
        help = "Silence informational messages and warnings."
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    #[command(
        visible_alias = "b",
        about = "Discover dependencies and emit the bundle document."
    )]
    Bundle(BundleArgs),

    #[command(
        visible_alias = "l",
        about = "Discover dependencies and list the files found."
    )]
    List(ListArgs),

    #[command(
        visible_alias = "t",
        about = "Discover dependencies and print the project tree."
    )]
    Tree(TreeArgs),

    #[command(
        visible_alias = "m",
        about = "Line, size and token statistics for the discovered files."
    )]
    Stats(StatsArgs),

    #[command(
        visible_alias = "d",
        about = "Show effective configuration, plugins and the discovery event log."
    )]
    Debug(DebugArgs),

    #[command(about = "Generate or save shell completion scripts.")]
    Completion(CompletionArgs),

    #[command(about = "Show or save the default configuration file structure.")]
    Config(ConfigArgs),
}

#[derive(Args, Debug, Clone)]
pub struct BundleArgs {
    #[clap(flatten)]
    pub discovery: DiscoveryArgs,
    #[clap(flatten)]
    pub format_output: FormatOutputOpts,
    #[clap(flatten)]
    pub target: OutputTargetOpts,

    #[arg(
        long,
        help = "Leave the project tree out of the document.",
        help_heading = "Output Control"
    )]
    pub no_tree: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    #[clap(flatten)]
    pub discovery: DiscoveryArgs,
    #[clap(flatten)]
    pub format_output: FormatOutputOpts,
    #[clap(flatten)]
    pub target: OutputTargetOpts,

    #[arg(
        long,
        help = "Print absolute paths instead of root-relative ones.",
        help_heading = "Output Control"
    )]
    pub absolute: bool,
}

#[derive(Args, Debug, Clone)]
pub struct TreeArgs {
    #[clap(flatten)]
    pub discovery: DiscoveryArgs,
    #[clap(flatten)]
    pub format_output: FormatOutputOpts,
    #[clap(flatten)]
    pub target: OutputTargetOpts,
}

#[derive(Args, Debug, Clone)]
pub struct StatsArgs {
    #[clap(flatten)]
    pub discovery: DiscoveryArgs,
    #[clap(flatten)]
    pub format_output: FormatOutputOpts,
}

#[derive(Args, Debug, Clone)]
pub struct DebugArgs {
    #[clap(flatten)]
    pub discovery: DiscoveryArgs,
    #[clap(flatten)]
    pub format_output: FormatOutputOpts,
}

#[derive(Args, Debug, Clone)]
pub struct CompletionArgs {
    #[arg(
        long,
        value_name = "SHELL",
        help = "Shell to generate completions for (fish, bash, zsh) [default: fish]"
    )]
    pub shell: Option<String>,
    #[arg(
        long,
        help = "Save completion script to default location (prompts overwrite)."
    )]
    pub save: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    #[arg(
        long,
        help = "Save default config structure to default path (prompts overwrite)."
    )]
    pub save: bool,

    #[arg(
        long,
        help = "Project directory to save the config into (default: located from the current dir).",
        value_name = "PATH"
    )]
    pub project_root: Option<PathBuf>,
}

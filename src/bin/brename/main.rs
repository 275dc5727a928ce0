mod brename;
mod config;

use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use batch_rename::case::CaseType;
use batch_rename::date::DateSource;
use batch_rename::filter::FileTypeGroup;
use batch_rename::number::{NumberFormat, Position};

use crate::brename::BatchRename;

#[derive(Parser)]
#[command(author, version, name = env!("CARGO_BIN_NAME"), about = "Batch rename files with a rule pipeline and undo history")]
pub(crate) struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Optional input directory or file
    #[arg(value_hint = clap::ValueHint::AnyPath)]
    path: Option<PathBuf>,

    /// Read rules from a TOML file
    #[arg(short = 'f', long, value_name = "FILE", value_hint = clap::ValueHint::FilePath)]
    rules: Option<PathBuf>,

    /// Start from a preset in the user config
    #[arg(short = 'P', long, value_name = "NAME")]
    preset: Option<String>,

    /// Write the final rules to a TOML file
    #[arg(short = 'E', long, value_name = "FILE", value_hint = clap::ValueHint::FilePath)]
    export: Option<PathBuf>,

    /// Substitute pattern with replacement in file names
    #[arg(short = 's', long, num_args = 2, action = clap::ArgAction::Append, value_names = ["PATTERN", "REPLACEMENT"])]
    substitute: Vec<String>,

    /// Treat the substitute pattern as a regular expression
    #[arg(short = 'g', long)]
    regex: bool,

    /// Match the substitute pattern case-sensitively
    #[arg(short = 'C', long)]
    case_sensitive: bool,

    /// Replace the whole name with the given text
    #[arg(short = 'e', long, value_name = "TEXT", conflicts_with = "substitute")]
    entire: Option<String>,

    /// Add prefix to the start
    #[arg(short = 'x', long)]
    prefix: Option<String>,

    /// Add suffix to the end
    #[arg(short = 'u', long)]
    suffix: Option<String>,

    /// Remove characters from the start of the name
    #[arg(long, value_name = "COUNT")]
    trim_start: Option<usize>,

    /// Remove characters from the end of the name
    #[arg(long, value_name = "COUNT")]
    trim_end: Option<usize>,

    /// Convert the name to the given case
    #[arg(short = 'k', long, value_enum)]
    case: Option<CaseType>,

    /// Add a sequence number
    #[arg(short = 'n', long)]
    number: bool,

    /// Number format
    #[arg(long, value_enum, requires = "number")]
    number_format: Option<NumberFormat>,

    /// Zero padding width (implies custom number format)
    #[arg(long, value_name = "WIDTH", requires = "number")]
    padding: Option<usize>,

    /// Where to insert the number
    #[arg(long, value_enum, requires = "number")]
    number_position: Option<Position>,

    /// Character index for a custom number position
    #[arg(long, value_name = "INDEX", requires = "number")]
    number_index: Option<usize>,

    /// First number
    #[arg(long, requires = "number", allow_hyphen_values = true)]
    start: Option<i64>,

    /// Number increment
    #[arg(long, requires = "number", allow_hyphen_values = true)]
    increment: Option<i64>,

    /// Separator between the name and the number
    #[arg(long, requires = "number")]
    separator: Option<String>,

    /// Add a date stamp
    #[arg(short = 't', long)]
    date: bool,

    /// Date stamp format using YYYY, MM, DD, HH, mm and ss
    #[arg(long, value_name = "FORMAT", requires = "date")]
    date_format: Option<String>,

    /// Where to insert the date stamp
    #[arg(long, value_enum, requires = "date")]
    date_position: Option<Position>,

    /// Which date to use for the stamp
    #[arg(long, value_enum, requires = "date")]
    date_source: Option<DateSource>,

    /// Build the name from metadata, for example "{year}-{name}"
    #[arg(short = 'm', long, value_name = "PATTERN")]
    metadata: Option<String>,

    /// Only rename files of the given type group
    #[arg(short = 'T', long = "type", value_enum, value_name = "GROUP")]
    file_type: Option<FileTypeGroup>,

    /// Only rename files with the given extensions
    #[arg(short = 'X', long = "extension", value_name = "EXT", value_delimiter = ',', conflicts_with = "file_type")]
    extensions: Vec<String>,

    /// Rename directories too
    #[arg(short = 'd', long)]
    directory: bool,

    /// Fail on conflicting names instead of numbering them
    #[arg(short = 'a', long)]
    no_auto_number: bool,

    /// Only print changes without renaming files
    #[arg(short = 'p', long, global = true)]
    print: bool,

    /// Recurse into subdirectories
    #[arg(short = 'r', long)]
    recurse: bool,

    /// Enable debug prints
    #[arg(short = 'D', long, global = true)]
    debug: bool,

    /// Create shell completion
    #[arg(short = 'l', long, name = "SHELL")]
    completion: Option<Shell>,

    /// Print verbose output
    #[arg(short = 'v', long, global = true)]
    verbose: bool,
}

#[derive(Debug, Clone, Subcommand)]
pub(crate) enum Command {
    /// Revert the latest rename batch
    #[command(name = "undo")]
    Undo,

    /// Apply the latest undone batch again
    #[command(name = "redo")]
    Redo,

    /// Show recent rename batches
    #[command(name = "history")]
    History {
        /// Number of batches to show
        #[arg(short = 'n', long, default_value_t = 10)]
        count: usize,
    },

    /// Manage rule presets in the user config
    #[command(name = "preset")]
    Preset {
        #[command(subcommand)]
        action: PresetAction,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub(crate) enum PresetAction {
    /// List saved presets
    #[command(name = "list")]
    List,

    /// Save the rules given with flags under a name
    #[command(name = "save")]
    Save {
        /// Preset name
        name: String,
    },

    /// Remove a preset
    #[command(name = "remove")]
    Remove {
        /// Preset name
        name: String,
    },

    /// Rename a preset
    #[command(name = "rename")]
    Rename {
        /// Current preset name
        old_name: String,
        /// New preset name
        new_name: String,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    if let Some(ref shell) = args.completion {
        batch_rename::generate_shell_completion(*shell, Args::command(), true, env!("CARGO_BIN_NAME"))
    } else {
        BatchRename::run_with_args(args)
    }
}

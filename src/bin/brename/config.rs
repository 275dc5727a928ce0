use std::fmt;
use std::path::PathBuf;

use anyhow::Context;

use batch_rename::config::RenameConfig;
use batch_rename::escalation::EscalationPolicy;
use batch_rename::filter::FileFilter;
use batch_rename::number::NumberFormat;
use batch_rename::rules::{Presets, RuleConfiguration};
use batch_rename::session::SessionSettings;

use crate::{Args, Command};

/// Final config created from CLI arguments and user config file.
#[derive(Debug)]
pub struct Config {
    pub(crate) auto_number: bool,
    pub(crate) chunk_size: usize,
    pub(crate) command: Option<Command>,
    pub(crate) debug: bool,
    pub(crate) dryrun: bool,
    pub(crate) escalation_paddings: Vec<usize>,
    pub(crate) export: Option<PathBuf>,
    pub(crate) filter: FileFilter,
    pub(crate) history_limit: usize,
    pub(crate) include_dirs: bool,
    pub(crate) message_limit: usize,
    pub(crate) path: Option<PathBuf>,
    pub(crate) presets: Presets,
    pub(crate) recurse: bool,
    pub(crate) rules: RuleConfiguration,
    pub(crate) verbose: bool,
}

impl Config {
    /// Create config from given command line args and user config file.
    pub fn from_args(args: Args) -> anyhow::Result<Self> {
        let user_config = RenameConfig::get_user_config()?;
        Self::from_args_and_user_config(args, user_config)
    }

    fn from_args_and_user_config(args: Args, user_config: RenameConfig) -> anyhow::Result<Self> {
        let mut rules = if let Some(path) = &args.rules {
            RuleConfiguration::from_file(path)?
        } else if let Some(name) = &args.preset {
            user_config
                .presets
                .get(name)
                .cloned()
                .with_context(|| format!("Unknown preset: '{name}'"))?
        } else {
            RuleConfiguration::default()
        };
        args.apply_rule_flags(&mut rules);
        let filter = args
            .file_type
            .map_or_else(|| FileFilter::from_extensions(&args.extensions), FileFilter::from);

        Ok(Self {
            auto_number: !args.no_auto_number && user_config.auto_number,
            chunk_size: user_config.chunk_size,
            command: args.command,
            debug: args.debug || user_config.debug,
            dryrun: args.print || user_config.dryrun,
            escalation_paddings: user_config.escalation_paddings,
            export: args.export,
            filter,
            history_limit: user_config.history_limit,
            include_dirs: args.directory || user_config.include_dirs,
            message_limit: user_config.message_limit,
            path: args.path,
            presets: user_config.presets,
            recurse: args.recurse || user_config.recurse,
            rules,
            verbose: args.verbose || user_config.verbose,
        })
    }

    pub(crate) fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            escalation: EscalationPolicy::new(self.escalation_paddings.clone()),
            auto_number: self.auto_number,
            verbose: self.verbose,
        }
    }
}

impl Args {
    /// Enable and override rules from command line flags.
    fn apply_rule_flags(&self, rules: &mut RuleConfiguration) {
        if let [pattern, replacement] = self.substitute.as_slice() {
            rules.find_replace.enabled = true;
            rules.find_replace.find.clone_from(pattern);
            rules.find_replace.replace.clone_from(replacement);
            rules.find_replace.replace_entire = false;
        } else if self.substitute.len() > 2 {
            batch_rename::print_warning!("Only one substitute pair is supported, using the first one");
            rules.find_replace.enabled = true;
            rules.find_replace.find.clone_from(&self.substitute[0]);
            rules.find_replace.replace.clone_from(&self.substitute[1]);
            rules.find_replace.replace_entire = false;
        }
        if let Some(text) = &self.entire {
            rules.find_replace.enabled = true;
            rules.find_replace.replace_entire = true;
            rules.find_replace.replace.clone_from(text);
        }
        if self.regex {
            rules.find_replace.use_regex = true;
        }
        if self.case_sensitive {
            rules.find_replace.case_sensitive = true;
        }

        if let Some(prefix) = &self.prefix {
            rules.prefix.enabled = true;
            rules.prefix.text.clone_from(prefix);
        }
        if let Some(suffix) = &self.suffix {
            rules.suffix.enabled = true;
            rules.suffix.text.clone_from(suffix);
        }

        if self.trim_start.is_some() || self.trim_end.is_some() {
            rules.trim.enabled = true;
            rules.trim.from_start = self.trim_start.unwrap_or(rules.trim.from_start);
            rules.trim.from_end = self.trim_end.unwrap_or(rules.trim.from_end);
        }

        if let Some(case_type) = self.case {
            rules.case.enabled = true;
            rules.case.case_type = case_type;
        }

        if self.number {
            let numbering = &mut rules.numbering;
            numbering.enabled = true;
            if let Some(format) = self.number_format {
                numbering.format = format;
            }
            if let Some(padding) = self.padding {
                numbering.format = NumberFormat::Custom;
                numbering.custom_padding = padding;
            }
            if let Some(position) = self.number_position {
                numbering.position = position;
            }
            if self.number_index.is_some() {
                numbering.custom_position = self.number_index;
            }
            numbering.start = self.start.unwrap_or(numbering.start);
            numbering.increment = self.increment.unwrap_or(numbering.increment);
            if self.separator.is_some() {
                numbering.separator.clone_from(&self.separator);
            }
        }

        if self.date {
            let date_stamp = &mut rules.date_stamp;
            date_stamp.enabled = true;
            if let Some(format) = &self.date_format {
                date_stamp.format.clone_from(format);
            }
            if let Some(position) = self.date_position {
                date_stamp.position = position;
            }
            if let Some(source) = self.date_source {
                date_stamp.source = source;
            }
        }

        if let Some(pattern) = &self.metadata {
            rules.metadata.enabled = true;
            rules.metadata.pattern.clone_from(pattern);
        }
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Config:")?;
        writeln!(f, "  auto number:  {}", batch_rename::colorize_bool(self.auto_number))?;
        writeln!(f, "  debug:        {}", batch_rename::colorize_bool(self.debug))?;
        writeln!(f, "  dryrun:       {}", batch_rename::colorize_bool(self.dryrun))?;
        writeln!(f, "  include dirs: {}", batch_rename::colorize_bool(self.include_dirs))?;
        writeln!(f, "  recurse:      {}", batch_rename::colorize_bool(self.recurse))?;
        writeln!(f, "  verbose:      {}", batch_rename::colorize_bool(self.verbose))?;
        writeln!(f, "  chunk size:   {}", self.chunk_size)?;
        writeln!(f, "  paddings:     {:?}", self.escalation_paddings)?;
        writeln!(f, "  filter:       {}", self.filter)?;
        write!(f, "{}", self.rules)
    }
}

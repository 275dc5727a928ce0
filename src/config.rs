//! User configuration and data file locations.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::{fmt, fs};

use anyhow::Context;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use toml_edit::{DocumentMut, Item, Table};

use crate::escalation::DEFAULT_ESCALATION_PADDINGS;
use crate::executor::DEFAULT_CHUNK_SIZE;
use crate::history::DEFAULT_HISTORY_LIMIT;
use crate::rules::Presets;

const PROJECT_NAME: &str = env!("CARGO_PKG_NAME");
const PROJECT_SECTION: &str = "brename";

/// Default number of characters shown for a long error message.
pub const DEFAULT_MESSAGE_LIMIT: usize = 100;

/// Path to the user config file: `$HOME/.config/batch-rename.toml`
///
/// Returns `None` if the home directory cannot be determined.
pub static CONFIG_PATH: LazyLock<Option<PathBuf>> = LazyLock::new(|| {
    let home_dir = dirs::home_dir()?;
    Some(home_dir.join(".config").join(format!("{PROJECT_NAME}.toml")))
});

/// Path to the rename history file.
///
/// Uses the platform-specific local data directory:
/// - Windows: `%LOCALAPPDATA%\batch-rename\history.json`
/// - macOS: `~/Library/Application Support/batch-rename/history.json`
/// - Linux: `~/.local/share/batch-rename/history.json`
pub static HISTORY_PATH: LazyLock<PathBuf> = LazyLock::new(|| {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(PROJECT_NAME)
        .join("history.json")
});

/// Config from the `[brename]` section of the user config file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RenameConfig {
    #[serde(default = "default_true")]
    pub auto_number: bool,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub dryrun: bool,
    #[serde(default = "default_escalation_paddings")]
    pub escalation_paddings: Vec<usize>,
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    #[serde(default)]
    pub include_dirs: bool,
    #[serde(default = "default_message_limit")]
    pub message_limit: usize,
    #[serde(default)]
    pub presets: Presets,
    #[serde(default)]
    pub recurse: bool,
    #[serde(default)]
    pub verbose: bool,
}

/// Wrapper needed for parsing the config section.
#[derive(Debug, Default, Deserialize)]
struct UserConfig {
    #[serde(default)]
    brename: RenameConfig,
}

/// Presets rendered on their own before moving them under `[brename]`.
#[derive(Serialize)]
struct PresetSection<'a> {
    presets: &'a Presets,
}

impl Default for RenameConfig {
    fn default() -> Self {
        Self {
            auto_number: true,
            chunk_size: DEFAULT_CHUNK_SIZE,
            debug: false,
            dryrun: false,
            escalation_paddings: DEFAULT_ESCALATION_PADDINGS.to_vec(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            include_dirs: false,
            message_limit: DEFAULT_MESSAGE_LIMIT,
            presets: Presets::default(),
            recurse: false,
            verbose: false,
        }
    }
}

impl RenameConfig {
    /// Try to read user config from the file if it exists.
    /// Otherwise, fall back to default config.
    ///
    /// # Errors
    /// Returns an error if config file exists but cannot be read or parsed.
    pub fn get_user_config() -> anyhow::Result<Self> {
        let Some(path) = CONFIG_PATH.as_deref() else {
            return Ok(Self::default());
        };
        Self::from_path(path)
    }

    /// Read config from the given file. A missing file gives the default config.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        match fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse config file {}:\n{e}", path.display())),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(error) => Err(anyhow::anyhow!(
                "Failed to read config file {}: {error}",
                path.display()
            )),
        }
    }

    /// Parse config from a TOML string.
    ///
    /// # Errors
    /// Returns an error if the TOML string is invalid.
    pub fn from_toml_str(toml_str: &str) -> anyhow::Result<Self> {
        toml::from_str::<UserConfig>(toml_str)
            .map(|config| config.brename)
            .with_context(|| "Failed to parse config TOML")
    }
}

/// Write presets to the `[brename]` section of the given config file.
///
/// The rest of the file, including comments and other sections, is kept as is.
/// A missing file is created.
///
/// # Errors
/// Returns an error if the file cannot be read, parsed or written.
pub fn save_presets(path: &Path, presets: &Presets) -> anyhow::Result<()> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(error) => {
            return Err(anyhow::anyhow!("Failed to read config file {}: {error}", path.display()));
        }
    };
    let updated = replace_presets_in_toml(&content, presets)
        .with_context(|| format!("Failed to update presets in {}", path.display()))?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory {}", parent.display()))?;
    }
    fs::write(path, updated).with_context(|| format!("Failed to write config file {}", path.display()))
}

/// Replace the `brename.presets` array in a config TOML string.
///
/// Empty presets remove the array.
///
/// # Errors
/// Returns an error if the content is not valid TOML or `brename` is not a table.
pub fn replace_presets_in_toml(content: &str, presets: &Presets) -> anyhow::Result<String> {
    let mut document = content.parse::<DocumentMut>().context("Failed to parse config TOML")?;
    let section = document
        .entry(PROJECT_SECTION)
        .or_insert_with(|| {
            let mut table = Table::new();
            table.set_implicit(true);
            Item::Table(table)
        })
        .as_table_mut()
        .with_context(|| format!("Config key '{PROJECT_SECTION}' is not a table"))?;

    if presets.is_empty() {
        section.remove("presets");
        return Ok(document.to_string());
    }

    let rendered = toml::to_string(&PresetSection { presets }).context("Failed to serialize presets")?;
    let mut rendered = rendered
        .parse::<DocumentMut>()
        .context("Failed to parse serialized presets")?;
    let mut item = rendered.remove("presets").context("Serialized presets are missing")?;
    clear_item_positions(&mut item);
    section.insert("presets", item);
    Ok(document.to_string())
}

/// Tables without a position are written after the table they are nested in.
fn clear_item_positions(item: &mut Item) {
    match item {
        Item::Table(table) => clear_table_positions(table),
        Item::ArrayOfTables(array) => array.iter_mut().for_each(clear_table_positions),
        _ => {}
    }
}

fn clear_table_positions(table: &mut Table) {
    table.set_position(None);
    for (_, item) in table.iter_mut() {
        clear_item_positions(item);
    }
}

impl fmt::Display for RenameConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let presets = if self.presets.is_empty() {
            "presets:      []".to_string()
        } else {
            "presets:\n".to_string() + &*self.presets.names().map(|name| format!("    {name}")).join("\n")
        };
        writeln!(f, "Config:")?;
        writeln!(f, "  auto number:  {}", crate::colorize_bool(self.auto_number))?;
        writeln!(f, "  debug:        {}", crate::colorize_bool(self.debug))?;
        writeln!(f, "  dryrun:       {}", crate::colorize_bool(self.dryrun))?;
        writeln!(f, "  include dirs: {}", crate::colorize_bool(self.include_dirs))?;
        writeln!(f, "  recurse:      {}", crate::colorize_bool(self.recurse))?;
        writeln!(f, "  verbose:      {}", crate::colorize_bool(self.verbose))?;
        writeln!(f, "  chunk size:   {}", self.chunk_size)?;
        writeln!(f, "  history:      {}", self.history_limit)?;
        writeln!(f, "  paddings:     {:?}", self.escalation_paddings)?;
        writeln!(f, "  {presets}")
    }
}

const fn default_true() -> bool {
    true
}

const fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

const fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

const fn default_message_limit() -> usize {
    DEFAULT_MESSAGE_LIMIT
}

fn default_escalation_paddings() -> Vec<usize> {
    DEFAULT_ESCALATION_PADDINGS.to_vec()
}

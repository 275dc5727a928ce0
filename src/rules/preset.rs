//! Named rule presets.

use serde::{Deserialize, Serialize};

use crate::rules::RuleConfiguration;

/// Rule configuration saved under a name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulePreset {
    pub name: String,
    #[serde(default)]
    pub rules: RuleConfiguration,
}

/// Collection of presets with unique names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Presets {
    presets: Vec<RulePreset>,
}

impl Presets {
    #[must_use]
    pub const fn new(presets: Vec<RulePreset>) -> Self {
        Self { presets }
    }

    /// Save rules under the given name, replacing an existing preset with the same name.
    pub fn save(&mut self, name: &str, rules: &RuleConfiguration) {
        let name = name.trim();
        if let Some(existing) = self.presets.iter_mut().find(|preset| preset.name == name) {
            existing.rules = rules.clone();
        } else {
            self.presets.push(RulePreset {
                name: name.to_string(),
                rules: rules.clone(),
            });
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RuleConfiguration> {
        let name = name.trim();
        self.presets
            .iter()
            .find(|preset| preset.name == name)
            .map(|preset| &preset.rules)
    }

    /// Remove the named preset. Returns true if it existed.
    pub fn remove(&mut self, name: &str) -> bool {
        let name = name.trim();
        let before = self.presets.len();
        self.presets.retain(|preset| preset.name != name);
        self.presets.len() != before
    }

    /// Rename a preset.
    /// Returns false if the old name does not exist or the new name is empty or already taken.
    pub fn rename(&mut self, old_name: &str, new_name: &str) -> bool {
        let new_name = new_name.trim();
        if new_name.is_empty() || self.get(new_name).is_some() {
            return false;
        }
        let old_name = old_name.trim();
        if let Some(preset) = self.presets.iter_mut().find(|preset| preset.name == old_name) {
            preset.name = new_name.to_string();
            true
        } else {
            false
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.presets.iter().map(|preset| preset.name.as_str())
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.presets.len()
    }
}

impl From<Vec<RulePreset>> for Presets {
    fn from(presets: Vec<RulePreset>) -> Self {
        Self::new(presets)
    }
}

//! Rename rules and the pipeline that applies them.

mod config;
mod pipeline;
mod preset;

pub use config::{
    CaseRule, DateStampRule, FindReplaceRule, MetadataRule, NumberingRule, RuleConfiguration, TextRule, TrimRule,
};
pub use pipeline::{RuleContext, RulePipeline, apply_rules, split_extension};
pub use preset::{Presets, RulePreset};

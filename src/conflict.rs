//! Detect colliding rename targets.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

use itertools::Itertools;

use crate::workspace::FileId;

/// A file with a valid new name that differs from its current name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedRename {
    pub id: FileId,
    pub path: PathBuf,
    pub name: String,
    pub new_name: String,
}

/// One target path claimed by more than one file, or by a file and an existing bystander.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collision {
    pub target: PathBuf,
    /// Original names of the files renaming onto the target, in input order.
    pub sources: Vec<String>,
    pub ids: Vec<FileId>,
    /// Existing file outside the batch that occupies the target.
    pub bystander: Option<PathBuf>,
}

/// Collisions in the order their targets were first seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollisionReport {
    collisions: Vec<Collision>,
}

impl PlannedRename {
    #[must_use]
    pub fn target_path(&self) -> PathBuf {
        self.path.with_file_name(&self.new_name)
    }

    /// Check if the rename only changes letter case.
    #[must_use]
    pub fn is_case_only(&self) -> bool {
        path_key(&self.target_path()) == path_key(&self.path)
    }
}

impl CollisionReport {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.collisions.is_empty()
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.collisions.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Collision> {
        self.collisions.iter()
    }

    /// Ids of all files involved in a collision, without duplicates.
    #[must_use]
    pub fn colliding_ids(&self) -> Vec<FileId> {
        self.collisions
            .iter()
            .flat_map(|collision| collision.ids.iter().copied())
            .unique()
            .collect()
    }

    /// Human readable lines, limited to the given number of collisions.
    #[must_use]
    pub fn summary(&self, max_items: usize) -> String {
        let lines: Vec<String> = self.collisions.iter().map(ToString::to_string).collect();
        crate::summarize_lines(&lines, max_items)
    }
}

impl fmt::Display for Collision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let target = crate::path_to_filename_string(&self.target);
        write!(f, "{target} <- {}", self.sources.join(", "))?;
        if let Some(bystander) = &self.bystander {
            write!(f, " (existing file: {})", crate::path_to_string(bystander))?;
        }
        Ok(())
    }
}

impl fmt::Display for CollisionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.collisions.iter().map(|collision| format!("  {collision}")).join("\n"))
    }
}

impl<'a> IntoIterator for &'a CollisionReport {
    type Item = &'a Collision;
    type IntoIter = std::slice::Iter<'a, Collision>;

    fn into_iter(self) -> Self::IntoIter {
        self.collisions.iter()
    }
}

/// Find target paths that would be claimed twice.
///
/// Paths are compared case-insensitively.
/// A case-only rename never collides with itself but keeps its path occupied.
/// Existing paths that are not renamed away in this batch are bystanders:
/// a single file renaming onto a bystander is a collision.
#[must_use]
pub fn detect_duplicates(planned: &[PlannedRename], existing_paths: &[PathBuf]) -> CollisionReport {
    let moving: HashSet<String> = planned
        .iter()
        .filter(|rename| !rename.is_case_only())
        .map(|rename| path_key(&rename.path))
        .collect();

    let mut occupied: HashMap<String, PathBuf> = existing_paths
        .iter()
        .map(|path| (path_key(path), path))
        .filter(|(key, _)| !moving.contains(key))
        .map(|(key, path)| (key, path.clone()))
        .collect();
    for rename in planned.iter().filter(|rename| rename.is_case_only()) {
        occupied.insert(path_key(&rename.path), rename.path.clone());
    }

    let mut order: Vec<String> = Vec::new();
    let mut targets: HashMap<String, Collision> = HashMap::new();
    for rename in planned.iter().filter(|rename| !rename.is_case_only()) {
        let target = rename.target_path();
        let key = path_key(&target);
        let entry = targets.entry(key.clone()).or_insert_with(|| {
            order.push(key.clone());
            Collision {
                bystander: occupied.get(&key).cloned(),
                target,
                sources: Vec::new(),
                ids: Vec::new(),
            }
        });
        entry.sources.push(rename.name.clone());
        entry.ids.push(rename.id);
    }

    let collisions = order
        .into_iter()
        .filter_map(|key| targets.remove(&key))
        .filter(|collision| collision.sources.len() > 1 || collision.bystander.is_some())
        .collect();

    CollisionReport { collisions }
}

/// Case-insensitive comparison key for a path.
fn path_key(path: &Path) -> String {
    crate::path_to_string(path).to_lowercase()
}

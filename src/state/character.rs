//! Character export state
//!
//! A character is the export configuration for one rig: the filename
//! prefix, which objects to export, where to write, and the animation
//! entries it owns. Setters validate and leave the record untouched on
//! failure; persistence is the session's job.

use std::path::{Path, PathBuf};

use crate::config::ExportConfig;
use crate::error::ValidationFailure;
use crate::host::HostBridge;
use crate::layers::LayerKind;
use crate::state::entry::{AnimationEntry, EntryId};
use crate::state::folders::{normalize_folder, resolve_folder};
use crate::state::naming::{names_collide, title_case, validate_prefix};

/// Split of configured names into those that resolve and those that don't.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolved<T> {
    pub existing: Vec<T>,
    pub missing: Vec<String>,
}

/// Export configuration and entries for one rig.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Character {
    prefix: String,
    objects: Vec<String>,
    folders: Vec<String>,
    entries: Vec<AnimationEntry>,
}

impl Character {
    /// Empty character with the given prefix.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            objects: Vec::new(),
            folders: Vec::new(),
            entries: Vec::new(),
        }
    }

    /// Empty character carrying the configured default prefix.
    pub fn with_defaults(config: &ExportConfig) -> Self {
        Self::new(config.default_prefix.clone())
    }

    /// Build from stored fields. Stored values are trusted as-is.
    pub fn from_parts(
        prefix: String,
        objects: Vec<String>,
        folders: Vec<String>,
        entries: Vec<AnimationEntry>,
    ) -> Self {
        let mut character = Self::new(prefix);
        for object in objects {
            if !character.objects.contains(&object) {
                character.objects.push(object);
            }
        }
        for folder in folders {
            if !character.folders.contains(&folder) {
                character.folders.push(folder);
            }
        }
        character.entries = entries;
        character
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn objects(&self) -> &[String] {
        &self.objects
    }

    pub fn folders(&self) -> &[String] {
        &self.folders
    }

    // ========================================================================
    // Entries
    // ========================================================================

    /// Entries in insertion order.
    pub fn entries(&self) -> &[AnimationEntry] {
        &self.entries
    }

    /// Entries sorted by name for display.
    pub fn entries_by_name(&self) -> Vec<&AnimationEntry> {
        let mut sorted: Vec<&AnimationEntry> = self.entries.iter().collect();
        sorted.sort_by_key(|entry| entry.name().to_lowercase());
        sorted
    }

    /// Entries sorted by range start, the persisted order.
    pub fn entries_by_start(&self) -> Vec<&AnimationEntry> {
        let mut sorted: Vec<&AnimationEntry> = self.entries.iter().collect();
        sorted.sort_by_key(|entry| (entry.range().start(), entry.range().end()));
        sorted
    }

    pub fn entry(&self, id: EntryId) -> Option<&AnimationEntry> {
        self.entries.iter().find(|entry| entry.id() == id)
    }

    pub fn entry_by_name(&self, name: &str) -> Option<&AnimationEntry> {
        self.entries
            .iter()
            .find(|entry| names_collide(entry.name(), name))
    }

    /// Whether `candidate` is free, ignoring case, whitespace and the entry
    /// `except` (the one being renamed).
    pub fn is_name_available(&self, candidate: &str, except: Option<EntryId>) -> bool {
        !self
            .entries
            .iter()
            .filter(|entry| Some(entry.id()) != except)
            .any(|entry| names_collide(entry.name(), candidate))
    }

    /// First unused generated name: "Anim_1", "Anim_2", ...
    pub fn next_default_name(&self, config: &ExportConfig) -> String {
        (1..)
            .map(|index| config.entry_name(index))
            .find(|name| self.is_name_available(name, None))
            .unwrap_or_else(|| config.entry_name(self.entries.len() + 1))
    }

    pub fn push_entry(&mut self, entry: AnimationEntry) {
        self.entries.push(entry);
    }

    /// Remove an entry. Absent ids are ignored.
    pub fn remove_entry(&mut self, id: EntryId) -> Option<AnimationEntry> {
        let index = self.entries.iter().position(|entry| entry.id() == id)?;
        Some(self.entries.remove(index))
    }

    pub fn rename_entry(&mut self, id: EntryId, candidate: &str) -> Result<bool, ValidationFailure> {
        let taken: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| entry.id() != id)
            .map(|entry| entry.name().to_string())
            .collect();
        let Some(entry) = self.entries.iter_mut().find(|entry| entry.id() == id) else {
            return Ok(false);
        };
        entry.try_rename(candidate, |name| {
            !taken.iter().any(|other| names_collide(other, name))
        })?;
        Ok(true)
    }

    pub fn set_entry_range(&mut self, id: EntryId, start: i32, end: i32) -> Result<bool, ValidationFailure> {
        match self.entries.iter_mut().find(|entry| entry.id() == id) {
            Some(entry) => entry.try_set_range(start, end).map(|()| true),
            None => Ok(false),
        }
    }

    /// Returns whether the entry exists and its layer sets changed.
    pub fn set_entry_layer(&mut self, id: EntryId, layer: &str, kind: LayerKind, enabled: bool) -> bool {
        self.entries
            .iter_mut()
            .find(|entry| entry.id() == id)
            .is_some_and(|entry| entry.set_layer(layer, kind, enabled))
    }

    /// Ids of entries whose range covers `frame`.
    pub fn entries_at(&self, frame: i32) -> Vec<EntryId> {
        self.entries
            .iter()
            .filter(|entry| entry.range().contains(frame))
            .map(AnimationEntry::id)
            .collect()
    }

    // ========================================================================
    // Prefix
    // ========================================================================

    /// Trim, validate and store a title-cased prefix.
    pub fn set_prefix(&mut self, candidate: &str) -> Result<(), ValidationFailure> {
        let trimmed = candidate.trim();
        validate_prefix(trimmed)?;
        self.prefix = title_case(trimmed);
        Ok(())
    }

    // ========================================================================
    // Export objects
    // ========================================================================

    /// Append names not already configured. Returns how many were added.
    ///
    /// An empty input means nothing was selected.
    pub fn add_export_objects<S: AsRef<str>>(&mut self, names: &[S]) -> Result<usize, ValidationFailure> {
        if names.is_empty() {
            return Err(ValidationFailure::NothingSelected);
        }
        let before = self.objects.len();
        for name in names {
            let name = name.as_ref();
            if !self.objects.iter().any(|existing| existing == name) {
                self.objects.push(name.to_string());
            }
        }
        Ok(self.objects.len() - before)
    }

    /// Replace the configured objects.
    pub fn replace_export_objects<S: AsRef<str>>(&mut self, names: &[S]) -> Result<(), ValidationFailure> {
        if names.is_empty() {
            return Err(ValidationFailure::NothingSelected);
        }
        self.objects.clear();
        self.add_export_objects(names).map(|_| ())
    }

    pub fn remove_export_object(&mut self, name: &str) -> bool {
        let before = self.objects.len();
        self.objects.retain(|existing| existing != name);
        before != self.objects.len()
    }

    pub fn clear_export_objects(&mut self) {
        self.objects.clear();
    }

    /// Configured objects split by whether the scene still has them.
    pub fn resolve_objects<H: HostBridge + ?Sized>(&self, host: &H) -> Resolved<String> {
        let mut resolved = Resolved::default();
        for object in &self.objects {
            if host.object_exists(object) {
                resolved.existing.push(object.clone());
            } else {
                resolved.missing.push(object.clone());
            }
        }
        resolved
    }

    // ========================================================================
    // Export folders
    // ========================================================================

    /// Normalize and append a folder. Returns the stored form.
    pub fn add_export_folder(&mut self, path: &str, root: Option<&Path>) -> Result<String, ValidationFailure> {
        let stored = normalize_folder(path, root);
        if self.folders.contains(&stored) {
            return Err(ValidationFailure::DuplicateFolder { path: stored });
        }
        self.folders.push(stored.clone());
        Ok(stored)
    }

    pub fn remove_export_folder(&mut self, stored: &str) -> bool {
        let before = self.folders.len();
        self.folders.retain(|existing| existing != stored);
        before != self.folders.len()
    }

    pub fn clear_export_folders(&mut self) {
        self.folders.clear();
    }

    /// Configured folders split by whether they exist on disk.
    pub fn resolve_folders(&self, root: Option<&Path>) -> Resolved<PathBuf> {
        let mut resolved = Resolved::default();
        for folder in &self.folders {
            let path = resolve_folder(folder, root);
            if path.is_dir() {
                resolved.existing.push(path);
            } else {
                resolved.missing.push(folder.clone());
            }
        }
        resolved
    }
}

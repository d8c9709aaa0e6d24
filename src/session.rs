//! Character Session
//!
//! One open character: the host it lives in, the metadata store it is
//! persisted to, and the export flag guarding its scene. Every edit goes
//! through here so it is saved immediately and the observer is told.
//! The presentation shell owns a `Session` and forwards host events
//! (scene loaded, new scene, time changed) to it.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::ExportConfig;
use crate::error::{ExportError, Result};
use crate::export::{self, BatchItem, ExportFlag, ExportOptions, ExportReport};
use crate::host::{HostBridge, ObjectKind};
use crate::layers::{self, apply_layer_state, AppliedLayers, LayerKind, LayerRow, LayerState};
use crate::state::{AnimationEntry, Character, EntryId, EntryOverrides, MetadataStore};

/// What a successful edit changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    EntryAdded(EntryId),
    EntryRemoved(EntryId),
    EntryChanged(EntryId),
    PrefixChanged,
    ObjectsChanged,
    FoldersChanged,
    /// The whole character was replaced (scene load, new scene).
    Reloaded,
}

/// A configured export object as the scene currently sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectStatus {
    pub name: String,
    pub exists: bool,
    pub kind: Option<ObjectKind>,
}

impl ObjectStatus {
    pub fn is_joint(&self) -> bool {
        self.kind.as_ref().is_some_and(ObjectKind::is_joint)
    }
}

type Observer = Box<dyn FnMut(&ChangeEvent)>;

/// Context object for one open character.
pub struct Session<H: HostBridge> {
    host: H,
    store: MetadataStore,
    /// Metadata slot of the character ("Data1", "Data2", ...)
    id: String,
    character: Character,
    flag: ExportFlag,
    observer: Option<Observer>,
}

impl<H: HostBridge> Session<H> {
    /// Open the character stored under `id`, or a default one if nothing
    /// is stored there yet.
    pub fn open(host: H, config: ExportConfig, id: impl Into<String>) -> Self {
        let id = id.into();
        let store = MetadataStore::new(config);
        let character = store.load(&host, &id);
        info!(
            "[STORE] Opened {} '{}' with {} entries",
            id,
            character.prefix(),
            character.entries().len()
        );
        Self {
            host,
            store,
            id,
            character,
            flag: ExportFlag::new(),
            observer: None,
        }
    }

    /// Open the first stored character, falling back to the first id.
    pub fn open_first(host: H, config: ExportConfig) -> Self {
        let store = MetadataStore::new(config);
        let id = store
            .discover(&host)
            .into_iter()
            .next()
            .unwrap_or_else(|| store.config().character_id(1));
        Self::open(host, store.config().clone(), id)
    }

    /// Start a new character in the first free slot and persist it.
    pub fn create(host: H, config: ExportConfig) -> Result<Self> {
        let store = MetadataStore::new(config);
        let id = store.next_free_id(&host);
        let mut session = Self {
            character: Character::with_defaults(store.config()),
            host,
            store,
            id,
            flag: ExportFlag::new(),
            observer: None,
        };
        session.save()?;
        info!("[STORE] Created {}", session.id);
        Ok(session)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn character(&self) -> &Character {
        &self.character
    }

    pub fn config(&self) -> &ExportConfig {
        self.store.config()
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Direct host access for the shell. Scene edits made here are not
    /// tracked by the session.
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn into_host(self) -> H {
        self.host
    }

    /// Shared handle on the in-progress flag, for host callbacks that must
    /// not start an export while one is running.
    pub fn export_flag(&self) -> ExportFlag {
        self.flag.clone()
    }

    /// Register the callback notified after every saved edit.
    pub fn set_observer<F>(&mut self, observer: F)
    where
        F: FnMut(&ChangeEvent) + 'static,
    {
        self.observer = Some(Box::new(observer));
    }

    fn save(&mut self) -> Result<()> {
        self.store.save(&mut self.host, &self.id, &self.character)
    }

    fn notify(&mut self, event: ChangeEvent) {
        debug!("[STORE] {}: {:?}", self.id, event);
        if let Some(observer) = self.observer.as_mut() {
            observer(&event);
        }
    }

    /// Save, then tell the observer.
    fn commit(&mut self, event: ChangeEvent) -> Result<()> {
        self.save()?;
        self.notify(event);
        Ok(())
    }

    fn entry_or_err(&self, id: EntryId) -> Result<&AnimationEntry> {
        self.character
            .entry(id)
            .ok_or_else(|| ExportError::EntryNotFound {
                name: id.to_string(),
            })
    }

    // ========================================================================
    // Entries
    // ========================================================================

    /// Add an entry named "Anim_N" capturing the host's current range and
    /// layer flags.
    pub fn add_entry(&mut self) -> Result<&AnimationEntry> {
        let name = self.character.next_default_name(self.store.config());
        self.add_entry_with(EntryOverrides::new().with_name(name))
    }

    /// Add an entry, capturing whatever `overrides` leaves unset.
    ///
    /// A supplied name still goes through the rename rules.
    pub fn add_entry_with(&mut self, overrides: EntryOverrides) -> Result<&AnimationEntry> {
        let requested = overrides.name.clone();
        let mut entry = AnimationEntry::capture(&self.host, overrides.with_name(String::new()));
        if let Some(name) = requested {
            let character = &self.character;
            entry.try_rename(&name, |candidate| character.is_name_available(candidate, None))?;
        }
        let id = entry.id();
        info!("[STORE] Adding '{}' ({})", entry.name(), entry.range());
        self.character.push_entry(entry);
        self.commit(ChangeEvent::EntryAdded(id))?;
        self.entry_or_err(id)
    }

    /// Remove an entry. Absent ids are not an error; the character is
    /// saved either way.
    pub fn remove_entry(&mut self, id: EntryId) -> Result<bool> {
        let removed = self.character.remove_entry(id).is_some();
        self.save()?;
        if removed {
            self.notify(ChangeEvent::EntryRemoved(id));
        }
        Ok(removed)
    }

    pub fn rename_entry(&mut self, id: EntryId, candidate: &str) -> Result<()> {
        if !self.character.rename_entry(id, candidate)? {
            return Err(ExportError::EntryNotFound {
                name: id.to_string(),
            });
        }
        self.commit(ChangeEvent::EntryChanged(id))
    }

    pub fn set_entry_range(&mut self, id: EntryId, start: i32, end: i32) -> Result<()> {
        if !self.character.set_entry_range(id, start, end)? {
            return Err(ExportError::EntryNotFound {
                name: id.to_string(),
            });
        }
        self.commit(ChangeEvent::EntryChanged(id))
    }

    /// Solo or mute `layer` for an entry. Returns whether anything changed.
    ///
    /// Turning a flag on needs the layer to exist in the host; turning one
    /// off always works so stale names can be cleared.
    pub fn set_entry_layer(&mut self, id: EntryId, layer: &str, kind: LayerKind, enabled: bool) -> Result<bool> {
        self.entry_or_err(id)?;
        if enabled && !self.current_layers().contains(layer) {
            return Err(ExportError::StaleReference {
                name: layer.to_string(),
            });
        }
        if !self.character.set_entry_layer(id, layer, kind, enabled) {
            return Ok(false);
        }
        self.commit(ChangeEvent::EntryChanged(id))?;
        Ok(true)
    }

    // ========================================================================
    // Character configuration
    // ========================================================================

    pub fn set_prefix(&mut self, candidate: &str) -> Result<()> {
        self.character.set_prefix(candidate)?;
        self.commit(ChangeEvent::PrefixChanged)
    }

    /// Append objects. Returns how many were new.
    pub fn add_export_objects<S: AsRef<str>>(&mut self, names: &[S]) -> Result<usize> {
        let added = self.character.add_export_objects(names)?;
        self.commit(ChangeEvent::ObjectsChanged)?;
        Ok(added)
    }

    /// Append the host's current selection.
    pub fn add_selected_objects(&mut self) -> Result<usize> {
        let selection = self.host.selection();
        self.add_export_objects(&selection)
    }

    /// Replace the export objects with the host's current selection.
    pub fn use_selection_for_export(&mut self) -> Result<usize> {
        let selection = self.host.selection();
        self.character.replace_export_objects(&selection)?;
        self.commit(ChangeEvent::ObjectsChanged)?;
        Ok(self.character.objects().len())
    }

    pub fn remove_export_object(&mut self, name: &str) -> Result<bool> {
        let removed = self.character.remove_export_object(name);
        self.commit(ChangeEvent::ObjectsChanged)?;
        Ok(removed)
    }

    pub fn clear_export_objects(&mut self) -> Result<()> {
        self.character.clear_export_objects();
        self.commit(ChangeEvent::ObjectsChanged)
    }

    /// Add a folder, stored relative to the project root when inside it.
    /// Returns the stored form.
    pub fn add_export_folder(&mut self, path: &str) -> Result<String> {
        let root = self.host.project_root();
        let stored = self.character.add_export_folder(path, root.as_deref())?;
        self.commit(ChangeEvent::FoldersChanged)?;
        Ok(stored)
    }

    pub fn remove_export_folder(&mut self, stored: &str) -> Result<bool> {
        let removed = self.character.remove_export_folder(stored);
        self.commit(ChangeEvent::FoldersChanged)?;
        Ok(removed)
    }

    pub fn clear_export_folders(&mut self) -> Result<()> {
        self.character.clear_export_folders();
        self.commit(ChangeEvent::FoldersChanged)
    }

    // ========================================================================
    // Scene
    // ========================================================================

    /// Configured objects with their presence and type in the scene.
    pub fn export_object_status(&self) -> Vec<ObjectStatus> {
        self.character
            .objects()
            .iter()
            .map(|name| ObjectStatus {
                name: name.clone(),
                exists: self.host.object_exists(name),
                kind: self.host.object_kind(name),
            })
            .collect()
    }

    /// The host's layers right now.
    pub fn current_layers(&self) -> LayerState {
        layers::snapshot(&self.host)
    }

    /// Host layers merged with an entry's stored solo/mute sets.
    pub fn layer_rows(&self, id: EntryId) -> Result<Vec<LayerRow>> {
        let entry = self.entry_or_err(id)?;
        Ok(layers::layer_rows(&self.current_layers(), entry.layers()))
    }

    /// Put an entry's range and layer flags on the scene for preview.
    ///
    /// Unlike an export this is left in place.
    pub fn apply_entry(&mut self, id: EntryId) -> Result<AppliedLayers> {
        if self.flag.is_held() {
            return Err(ExportError::ReentrantExport);
        }
        let entry = self
            .character
            .entry(id)
            .ok_or_else(|| ExportError::EntryNotFound {
                name: id.to_string(),
            })?;
        let range = entry.range();
        self.host.set_playback_range(range.start(), range.end())?;
        apply_layer_state(&mut self.host, &entry.layers().solo, &entry.layers().mute)
    }

    pub fn export_entry(&mut self, id: EntryId, prebake: bool) -> Result<ExportReport> {
        let entry = self
            .character
            .entry(id)
            .ok_or_else(|| ExportError::EntryNotFound {
                name: id.to_string(),
            })?;
        export::export_entry(
            &mut self.host,
            self.store.config(),
            &self.flag,
            &self.character,
            entry,
            ExportOptions { prebake },
        )
    }

    /// Export every entry in range-start order.
    pub fn export_all(&mut self, prebake: bool) -> Result<Vec<BatchItem>> {
        export::export_all(
            &mut self.host,
            self.store.config(),
            &self.flag,
            &self.character,
            ExportOptions { prebake },
        )
    }

    // ========================================================================
    // Host events
    // ========================================================================

    /// Entries whose range covers `frame`.
    pub fn on_time_changed(&self, frame: i32) -> Vec<EntryId> {
        self.character.entries_at(frame)
    }

    /// Entries covering the host's current frame.
    pub fn active_entries(&self) -> Vec<EntryId> {
        self.on_time_changed(self.host.current_time())
    }

    /// Reload the character from the freshly opened scene.
    pub fn on_scene_loaded(&mut self) {
        self.character = self.store.load(&self.host, &self.id);
        self.notify(ChangeEvent::Reloaded);
    }

    /// Reset to a default character in the first slot. Nothing is written
    /// until the first edit.
    pub fn on_new_scene(&mut self) {
        self.id = self.store.config().character_id(1);
        self.character = Character::with_defaults(self.store.config());
        self.notify(ChangeEvent::Reloaded);
    }
}

//! In-memory host for tests and headless use
//!
//! Models just enough of a real host to exercise the exporter: a layer tree
//! under an implicit root, scene objects with keyed frames, a selection, a
//! metadata store and an undo stack of chunk snapshots. Every export command
//! is recorded together with the scene state at the moment it ran.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use super::{HostBridge, HostError, HostResult, ObjectKind, UpAxis};
use crate::export::ExportCommand;
use crate::layers::LayerKind;
use crate::state::FrameRange;

/// Name the mock gives its implicit root layer.
pub const ROOT_LAYER: &str = "BaseAnimation";

#[derive(Debug, Clone)]
struct MockLayer {
    name: String,
    parent: Option<String>,
    muted: bool,
    soloed: bool,
}

/// Undoable part of the scene.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SceneSnapshot {
    range: (i32, i32),
    /// Layer name to (muted, soloed).
    flags: BTreeMap<String, (bool, bool)>,
    keys: BTreeMap<String, BTreeSet<i32>>,
}

/// An export command plus the scene state it saw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedExport {
    pub command: ExportCommand,
    /// The command as the host's script would run it.
    pub script: String,
    pub playback_range: (i32, i32),
    pub muted: Vec<String>,
    pub soloed: Vec<String>,
    pub selection: Vec<String>,
    pub keys: BTreeMap<String, BTreeSet<i32>>,
}

/// In-memory [`HostBridge`].
#[derive(Debug, Clone)]
pub struct MockHost {
    range: (i32, i32),
    time: i32,
    layers: Vec<MockLayer>,
    objects: BTreeMap<String, ObjectKind>,
    keys: BTreeMap<String, BTreeSet<i32>>,
    selection: Vec<String>,
    project_root: Option<PathBuf>,
    file_info: BTreeMap<String, String>,
    up_axis: UpAxis,
    open_chunks: Vec<SceneSnapshot>,
    undo_stack: Vec<SceneSnapshot>,
    exports: Vec<RecordedExport>,
    fail_exports: bool,
    undo_calls: usize,
}

impl Default for MockHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MockHost {
    /// Empty scene with a 1-120 playback range.
    pub fn new() -> Self {
        Self {
            range: (1, 120),
            time: 1,
            layers: Vec::new(),
            objects: BTreeMap::new(),
            keys: BTreeMap::new(),
            selection: Vec::new(),
            project_root: None,
            file_info: BTreeMap::new(),
            up_axis: UpAxis::Y,
            open_chunks: Vec::new(),
            undo_stack: Vec::new(),
            exports: Vec::new(),
            fail_exports: false,
            undo_calls: 0,
        }
    }

    // ========================================================================
    // Scene setup
    // ========================================================================

    pub fn set_range(&mut self, min: i32, max: i32) {
        self.range = (min, max);
    }

    pub fn set_time(&mut self, frame: i32) {
        self.time = frame;
    }

    /// Add a layer under `parent`, or under the root when `None`.
    pub fn add_layer(&mut self, name: &str, parent: Option<&str>) {
        self.layers.push(MockLayer {
            name: name.to_string(),
            parent: parent.map(str::to_string),
            muted: false,
            soloed: false,
        });
    }

    /// Remove a layer and re-parent its children onto its parent.
    pub fn remove_layer(&mut self, name: &str) {
        let parent = self
            .layers
            .iter()
            .find(|layer| layer.name == name)
            .and_then(|layer| layer.parent.clone());
        self.layers.retain(|layer| layer.name != name);
        for layer in &mut self.layers {
            if layer.parent.as_deref() == Some(name) {
                layer.parent = parent.clone();
            }
        }
    }

    pub fn set_flag(&mut self, name: &str, kind: LayerKind, enabled: bool) {
        if let Some(layer) = self.layers.iter_mut().find(|layer| layer.name == name) {
            match kind {
                LayerKind::Solo => layer.soloed = enabled,
                LayerKind::Mute => layer.muted = enabled,
            }
        }
    }

    pub fn add_object(&mut self, name: &str, kind: ObjectKind) {
        self.objects.insert(name.to_string(), kind);
    }

    pub fn remove_object(&mut self, name: &str) {
        self.objects.remove(name);
        self.keys.remove(name);
    }

    /// Place keys on an object.
    pub fn key_object(&mut self, name: &str, frames: &[i32]) {
        self.keys
            .entry(name.to_string())
            .or_default()
            .extend(frames.iter().copied());
    }

    pub fn set_selection(&mut self, names: &[&str]) {
        self.selection = names.iter().map(|n| n.to_string()).collect();
    }

    pub fn set_project_root(&mut self, root: impl Into<PathBuf>) {
        self.project_root = Some(root.into());
    }

    pub fn set_up_axis(&mut self, axis: UpAxis) {
        self.up_axis = axis;
    }

    /// Store raw metadata without going through the exporter.
    pub fn put_file_info(&mut self, key: &str, value: &str) {
        self.file_info.insert(key.to_string(), value.to_string());
    }

    /// Make every following export command fail.
    pub fn fail_exports(&mut self, fail: bool) {
        self.fail_exports = fail;
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    pub fn exports(&self) -> &[RecordedExport] {
        &self.exports
    }

    pub fn keys(&self, name: &str) -> Option<&BTreeSet<i32>> {
        self.keys.get(name)
    }

    pub fn raw_file_info(&self, key: &str) -> Option<&str> {
        self.file_info.get(key).map(String::as_str)
    }

    pub fn file_info_keys(&self) -> Vec<String> {
        self.file_info.keys().cloned().collect()
    }

    /// Number of undo chunks still open.
    pub fn open_chunk_count(&self) -> usize {
        self.open_chunks.len()
    }

    pub fn undo_calls(&self) -> usize {
        self.undo_calls
    }

    fn flagged(&self, kind: LayerKind) -> Vec<String> {
        self.layers
            .iter()
            .filter(|layer| match kind {
                LayerKind::Solo => layer.soloed,
                LayerKind::Mute => layer.muted,
            })
            .map(|layer| layer.name.clone())
            .collect()
    }

    fn capture(&self) -> SceneSnapshot {
        SceneSnapshot {
            range: self.range,
            flags: self
                .layers
                .iter()
                .map(|layer| (layer.name.clone(), (layer.muted, layer.soloed)))
                .collect(),
            keys: self.keys.clone(),
        }
    }

    fn restore(&mut self, snapshot: SceneSnapshot) {
        self.range = snapshot.range;
        // Layers created after the snapshot keep their flags
        for layer in self.layers.iter_mut() {
            if let Some(&(muted, soloed)) = snapshot.flags.get(&layer.name) {
                layer.muted = muted;
                layer.soloed = soloed;
            }
        }
        self.keys = snapshot.keys;
    }

    fn require_objects(&self, objects: &[String]) -> HostResult<()> {
        match objects.iter().find(|name| !self.objects.contains_key(*name)) {
            Some(missing) => Err(HostError::UnknownObject {
                name: missing.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl HostBridge for MockHost {
    fn playback_range(&self) -> (i32, i32) {
        self.range
    }

    fn set_playback_range(&mut self, start: i32, end: i32) -> HostResult<()> {
        self.range = (start, end);
        Ok(())
    }

    fn current_time(&self) -> i32 {
        self.time
    }

    fn root_layer(&self) -> Option<String> {
        if self.layers.is_empty() {
            None
        } else {
            Some(ROOT_LAYER.to_string())
        }
    }

    fn layer_children(&self, layer: &str) -> Vec<String> {
        let parent = if layer == ROOT_LAYER { None } else { Some(layer) };
        self.layers
            .iter()
            .filter(|candidate| candidate.parent.as_deref() == parent)
            .map(|candidate| candidate.name.clone())
            .collect()
    }

    fn layer_flag(&self, layer: &str, kind: LayerKind) -> Option<bool> {
        self.layers
            .iter()
            .find(|candidate| candidate.name == layer)
            .map(|found| match kind {
                LayerKind::Solo => found.soloed,
                LayerKind::Mute => found.muted,
            })
    }

    fn set_layer_flag(&mut self, layer: &str, kind: LayerKind, enabled: bool) -> HostResult<()> {
        if !self.layers.iter().any(|candidate| candidate.name == layer) {
            return Err(HostError::UnknownLayer {
                name: layer.to_string(),
            });
        }
        self.set_flag(layer, kind, enabled);
        Ok(())
    }

    fn object_exists(&self, name: &str) -> bool {
        self.objects.contains_key(name)
    }

    fn object_kind(&self, name: &str) -> Option<ObjectKind> {
        self.objects.get(name).cloned()
    }

    fn selection(&self) -> Vec<String> {
        self.selection.clone()
    }

    fn select(&mut self, names: &[String]) -> HostResult<()> {
        self.selection = names
            .iter()
            .filter(|name| self.objects.contains_key(*name))
            .cloned()
            .collect();
        Ok(())
    }

    fn project_root(&self) -> Option<PathBuf> {
        self.project_root.clone()
    }

    fn file_info(&self, key: &str) -> Option<String> {
        self.file_info.get(key).cloned()
    }

    fn set_file_info(&mut self, key: &str, value: &str) -> HostResult<()> {
        self.file_info.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn open_undo_chunk(&mut self, _name: &str) {
        let snapshot = self.capture();
        self.open_chunks.push(snapshot);
    }

    fn close_undo_chunk(&mut self) {
        if let Some(snapshot) = self.open_chunks.pop() {
            // Nested chunks fold into their parent
            if self.open_chunks.is_empty() {
                self.undo_stack.push(snapshot);
            }
        }
    }

    fn undo(&mut self) -> HostResult<()> {
        self.undo_calls += 1;
        let snapshot = self.undo_stack.pop().ok_or(HostError::NothingToUndo)?;
        self.restore(snapshot);
        Ok(())
    }

    fn bake_keys(&mut self, objects: &[String], range: FrameRange) -> HostResult<()> {
        self.require_objects(objects)?;
        for name in objects {
            self.keys
                .entry(name.clone())
                .or_default()
                .extend(range.start()..=range.end());
        }
        Ok(())
    }

    fn set_keys(&mut self, objects: &[String], frame: i32) -> HostResult<()> {
        self.require_objects(objects)?;
        for name in objects {
            self.keys.entry(name.clone()).or_default().insert(frame);
        }
        Ok(())
    }

    fn cut_keys_outside(&mut self, objects: &[String], range: FrameRange) -> HostResult<()> {
        self.require_objects(objects)?;
        for name in objects {
            if let Some(frames) = self.keys.get_mut(name) {
                frames.retain(|frame| range.contains(*frame));
            }
        }
        Ok(())
    }

    fn up_axis(&self) -> UpAxis {
        self.up_axis
    }

    fn run_export(&mut self, command: &ExportCommand) -> HostResult<()> {
        if self.fail_exports {
            return Err(HostError::Command {
                command: "export".to_string(),
                reason: format!("refused to write {}", command.path.display()),
            });
        }
        self.exports.push(RecordedExport {
            command: command.clone(),
            script: command.to_script(),
            playback_range: self.range,
            muted: self.flagged(LayerKind::Mute),
            soloed: self.flagged(LayerKind::Solo),
            selection: self.selection.clone(),
            keys: self.keys.clone(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undo_restores_closed_chunk() {
        let mut host = MockHost::new();
        host.add_layer("Face", None);

        host.open_undo_chunk("test");
        host.set_playback_range(10, 20).unwrap();
        host.set_layer_flag("Face", LayerKind::Mute, true).unwrap();
        host.close_undo_chunk();

        host.undo().unwrap();
        assert_eq!(host.playback_range(), (1, 120));
        assert_eq!(host.layer_flag("Face", LayerKind::Mute), Some(false));
    }

    #[test]
    fn test_undo_restores_flags_by_layer_name() {
        let mut host = MockHost::new();
        host.add_layer("Face", None);
        host.add_layer("Arms", None);
        host.set_flag("Arms", LayerKind::Solo, true);

        host.open_undo_chunk("test");
        host.remove_layer("Face");
        host.add_layer("Legs", None);
        host.set_layer_flag("Arms", LayerKind::Solo, false).unwrap();
        host.set_layer_flag("Legs", LayerKind::Mute, true).unwrap();
        host.close_undo_chunk();

        host.undo().unwrap();
        assert_eq!(host.layer_flag("Arms", LayerKind::Solo), Some(true));
        assert_eq!(host.layer_flag("Arms", LayerKind::Mute), Some(false));
        assert_eq!(host.layer_flag("Legs", LayerKind::Mute), Some(true));
    }

    #[test]
    fn test_undo_without_chunk_fails() {
        let mut host = MockHost::new();
        assert_eq!(host.undo(), Err(HostError::NothingToUndo));
    }

    #[test]
    fn test_root_only_present_with_layers() {
        let mut host = MockHost::new();
        assert_eq!(host.root_layer(), None);
        host.add_layer("Face", None);
        assert_eq!(host.root_layer().as_deref(), Some(ROOT_LAYER));
        assert_eq!(host.layer_children(ROOT_LAYER), vec!["Face".to_string()]);
    }

    #[test]
    fn test_remove_layer_reparents_children() {
        let mut host = MockHost::new();
        host.add_layer("Body", None);
        host.add_layer("Arms", Some("Body"));
        host.remove_layer("Body");
        assert_eq!(host.layer_children(ROOT_LAYER), vec!["Arms".to_string()]);
    }

    #[test]
    fn test_cut_keys_outside() {
        let mut host = MockHost::new();
        host.add_object("root_jnt", ObjectKind::Joint);
        host.key_object("root_jnt", &[0, 5, 10, 30]);
        let range = FrameRange::new(5, 10).unwrap();
        host.cut_keys_outside(&["root_jnt".to_string()], range).unwrap();
        assert_eq!(
            host.keys("root_jnt").unwrap().iter().copied().collect::<Vec<_>>(),
            vec![5, 10]
        );
    }
}

//! Export orchestration
//!
//! Runs one entry through the phase machine: validate without touching the
//! scene, then inside a [`SceneMutationScope`] set the range, apply the
//! entry's layers, optionally prebake, select the export objects and invoke
//! the export once per existing folder. The scope reverts everything before
//! this returns, whether the export worked or not.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};

use super::bake::prebake;
use super::command::ExportCommand;
use super::filename::{base_filename, find_collisions, output_path};
use super::phase::{ExportPhase, PhaseTracker};
use super::scope::{ExportFlag, SceneMutationScope};
use super::validate::{validate_character, validate_export, ExportTargets};
use crate::config::ExportConfig;
use crate::error::{ExportError, Result};
use crate::host::HostBridge;
use crate::layers::apply_layer_state;
use crate::state::{AnimationEntry, Character};

/// Per-call export options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportOptions {
    /// Bake to explicit keys over the entry's range before exporting.
    pub prebake: bool,
}

impl ExportOptions {
    pub fn prebaked() -> Self {
        Self { prebake: true }
    }
}

/// What a successful export did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportReport {
    /// Entry name.
    pub entry: String,
    /// Files written, one per existing folder.
    pub files: Vec<PathBuf>,
    /// Configured objects missing from the scene.
    pub skipped_objects: Vec<String>,
    /// Configured folders missing from disk.
    pub skipped_folders: Vec<String>,
    /// Layers the entry references that the scene no longer has.
    pub stale_layers: Vec<String>,
    pub phases: Vec<ExportPhase>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Export one entry of `character`.
///
/// Validation failures abort before the scene is touched. Any failure
/// after that still reverts the scene before it is returned.
pub fn export_entry<H: HostBridge + ?Sized>(
    host: &mut H,
    config: &ExportConfig,
    flag: &ExportFlag,
    character: &Character,
    entry: &AnimationEntry,
    options: ExportOptions,
) -> Result<ExportReport> {
    let _busy = flag.try_acquire()?;
    let started_at = Utc::now();
    let mut phases = PhaseTracker::new();

    phases.advance(ExportPhase::Validating);
    let targets = match validate_export(character, entry, host) {
        Ok(targets) => targets,
        Err(failure) => {
            phases.advance(ExportPhase::Aborted);
            phases.advance(ExportPhase::Idle);
            info!("[EXPORT] '{}' aborted: {}", entry.name(), failure);
            return Err(failure.into());
        }
    };

    let base = base_filename(character.prefix(), entry.name());

    phases.advance(ExportPhase::Mutating);
    let mut scope = SceneMutationScope::enter(host, &config.undo_chunk_name);
    let outcome = run_in_scope(
        &mut scope,
        config,
        entry,
        &targets,
        &base,
        options,
        &mut phases,
    );
    phases.advance(ExportPhase::Reverting);
    let reverted = scope.finish();
    phases.advance(ExportPhase::Idle);

    let (files, stale_layers) = match (outcome, reverted) {
        (Ok(written), Ok(())) => written,
        (Ok(_), Err(e)) => return Err(e),
        (Err(e), Ok(())) => return Err(e),
        (Err(e), Err(revert)) => {
            error!("[SCOPE] Revert after failed export also failed: {}", revert);
            return Err(e);
        }
    };

    info!(
        "[EXPORT] '{}' written to {} folder(s)",
        entry.name(),
        files.len()
    );

    Ok(ExportReport {
        entry: entry.name().to_string(),
        files,
        skipped_objects: targets.skipped_objects,
        skipped_folders: targets.skipped_folders,
        stale_layers,
        phases: phases.history().to_vec(),
        started_at,
        finished_at: Utc::now(),
    })
}

/// Outcome of one entry in a batch.
#[derive(Debug)]
pub struct BatchItem {
    pub entry: String,
    pub result: Result<ExportReport>,
}

/// Export every entry of `character` in range-start order.
///
/// Character-level validation runs once up front and aborts the whole
/// batch. After that each entry succeeds or fails on its own.
pub fn export_all<H: HostBridge + ?Sized>(
    host: &mut H,
    config: &ExportConfig,
    flag: &ExportFlag,
    character: &Character,
    options: ExportOptions,
) -> Result<Vec<BatchItem>> {
    if flag.is_held() {
        return Err(ExportError::ReentrantExport);
    }
    validate_character(character, host)?;

    let entries = character.entries_by_start();
    for (base, names) in find_collisions(entries.iter().map(|entry| entry.name())) {
        warn!(
            "[EXPORT] {} entries share the filename '{}': {}",
            names.len(),
            base,
            names.join(", ")
        );
    }

    let items: Vec<BatchItem> = entries
        .into_iter()
        .map(|entry| BatchItem {
            entry: entry.name().to_string(),
            result: export_entry(host, config, flag, character, entry, options),
        })
        .collect();

    let failed = items.iter().filter(|item| item.result.is_err()).count();
    info!(
        "[EXPORT] Batch finished: {} exported, {} failed",
        items.len() - failed,
        failed
    );
    Ok(items)
}

fn run_in_scope<H: HostBridge + ?Sized>(
    scope: &mut SceneMutationScope<'_, H>,
    config: &ExportConfig,
    entry: &AnimationEntry,
    targets: &ExportTargets,
    base: &str,
    options: ExportOptions,
    phases: &mut PhaseTracker,
) -> Result<(Vec<PathBuf>, Vec<String>)> {
    let range = entry.range();
    let host: &mut H = scope;

    host.set_playback_range(range.start(), range.end())?;
    let applied = apply_layer_state(host, &entry.layers().solo, &entry.layers().mute)?;
    for name in &applied.stale {
        warn!("[EXPORT] '{}' references missing layer '{}'", entry.name(), name);
    }

    if options.prebake {
        prebake(host, &targets.objects, range)?;
    }
    host.select(&targets.objects)?;

    phases.advance(ExportPhase::Exporting);
    let up_axis = host.up_axis();
    let mut files = Vec::with_capacity(targets.folders.len());
    for folder in &targets.folders {
        let path = output_path(folder, base, &config.file_extension);
        let command = ExportCommand::new(path.clone(), range, up_axis, targets.objects.clone());
        host.run_export(&command)
            .map_err(|source| ExportError::ExportInvocation {
                path: path.clone(),
                source,
            })?;
        files.push(path);
    }

    Ok((files, applied.stale))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{MockHost, ObjectKind};
    use crate::layers::LayerKind;
    use crate::state::{FrameRange, LayerSets};
    use pretty_assertions::assert_eq;

    struct Fixture {
        host: MockHost,
        character: Character,
        temp: tempfile::TempDir,
    }

    fn fixture() -> Fixture {
        let temp = tempfile::tempdir().unwrap();
        std::fs::create_dir(temp.path().join("out")).unwrap();

        let mut host = MockHost::new();
        host.set_project_root(temp.path());
        host.add_layer("FaceLayer", None);
        host.add_object("root_jnt", ObjectKind::Joint);
        host.set_selection(&[]);

        let mut character = Character::new("Hero");
        character.add_export_objects(&["root_jnt"]).unwrap();
        character.add_export_folder("out", Some(temp.path())).unwrap();

        Fixture {
            host,
            character,
            temp,
        }
    }

    fn run_with_face_muted() -> AnimationEntry {
        let mut layers = LayerSets::default();
        layers.set("FaceLayer", LayerKind::Mute, true);
        AnimationEntry::from_parts("Run", FrameRange::new(1, 24).unwrap(), layers)
    }

    #[test]
    fn test_export_mutates_then_reverts() {
        let mut f = fixture();
        let entry = run_with_face_muted();

        let report = export_entry(
            &mut f.host,
            &ExportConfig::default(),
            &ExportFlag::new(),
            &f.character,
            &entry,
            ExportOptions::default(),
        )
        .unwrap();

        let expected = f.temp.path().join("out").join("Hero@Run.fbx");
        assert_eq!(report.files, vec![expected.clone()]);
        assert_eq!(
            report.phases,
            vec![
                ExportPhase::Validating,
                ExportPhase::Mutating,
                ExportPhase::Exporting,
                ExportPhase::Reverting,
                ExportPhase::Idle,
            ]
        );

        let recorded = &f.host.exports()[0];
        assert_eq!(recorded.command.path, expected);
        assert_eq!(recorded.playback_range, (1, 24));
        assert_eq!(recorded.muted, vec!["FaceLayer".to_string()]);
        assert_eq!(recorded.selection, vec!["root_jnt".to_string()]);

        assert_eq!(f.host.playback_range(), (1, 120));
        assert_eq!(f.host.layer_flag("FaceLayer", LayerKind::Mute), Some(false));
        assert!(f.host.selection().is_empty());
    }

    #[test]
    fn test_validation_failure_leaves_scene_alone() {
        let mut f = fixture();
        f.character.clear_export_folders();

        let err = export_entry(
            &mut f.host,
            &ExportConfig::default(),
            &ExportFlag::new(),
            &f.character,
            &run_with_face_muted(),
            ExportOptions::default(),
        )
        .unwrap_err();

        assert!(err.is_validation());
        assert_eq!(f.host.undo_calls(), 0);
        assert!(f.host.exports().is_empty());
    }

    #[test]
    fn test_failed_export_still_reverts() {
        let mut f = fixture();
        f.host.fail_exports(true);

        let err = export_entry(
            &mut f.host,
            &ExportConfig::default(),
            &ExportFlag::new(),
            &f.character,
            &run_with_face_muted(),
            ExportOptions::prebaked(),
        )
        .unwrap_err();

        assert!(matches!(err, ExportError::ExportInvocation { .. }));
        assert_eq!(f.host.undo_calls(), 1);
        assert_eq!(f.host.playback_range(), (1, 120));
        assert_eq!(f.host.layer_flag("FaceLayer", LayerKind::Mute), Some(false));
        assert_eq!(f.host.keys("root_jnt"), None);
    }

    #[test]
    fn test_held_flag_rejects_export() {
        let mut f = fixture();
        let flag = ExportFlag::new();
        let _held = flag.try_acquire().unwrap();

        let err = export_entry(
            &mut f.host,
            &ExportConfig::default(),
            &flag,
            &f.character,
            &run_with_face_muted(),
            ExportOptions::default(),
        )
        .unwrap_err();

        assert!(matches!(err, ExportError::ReentrantExport));
        assert_eq!(f.host.open_chunk_count(), 0);
    }

    #[test]
    fn test_export_all_in_start_order() {
        let mut f = fixture();
        let late =
            AnimationEntry::from_parts("Walk", FrameRange::new(30, 60).unwrap(), LayerSets::default());
        f.character.push_entry(late);
        f.character.push_entry(run_with_face_muted());

        let items = export_all(
            &mut f.host,
            &ExportConfig::default(),
            &ExportFlag::new(),
            &f.character,
            ExportOptions::default(),
        )
        .unwrap();

        let names: Vec<&str> = items.iter().map(|item| item.entry.as_str()).collect();
        assert_eq!(names, vec!["Run", "Walk"]);
        assert!(items.iter().all(|item| item.result.is_ok()));
        assert_eq!(f.host.exports().len(), 2);
        assert_eq!(f.host.exports()[1].playback_range, (30, 60));
    }
}

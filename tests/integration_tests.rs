//! Integration Tests
//!
//! End-to-end export tests driving a `Session<MockHost>`.

use game_anim_export::export::ExportPhase;
use game_anim_export::host::ObjectKind;
use game_anim_export::{
    EntryId, ExportConfig, ExportError, HostBridge, LayerKind, MockHost, Session,
    ValidationFailure,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Scene with a Hero rig, a FaceLayer and an `out` folder in the project.
fn hero_session() -> (Session<MockHost>, TempDir) {
    init_logging();
    let temp = tempfile::tempdir().unwrap();
    std::fs::create_dir(temp.path().join("out")).unwrap();

    let mut host = MockHost::new();
    host.set_project_root(temp.path());
    host.add_layer("FaceLayer", None);
    host.add_layer("ArmsLayer", None);
    host.add_object("root_jnt", ObjectKind::Joint);
    host.add_object("camera", ObjectKind::Transform);
    host.set_selection(&["camera"]);

    let mut session = Session::open(host, ExportConfig::default(), "Data1");
    session.set_prefix("Hero").unwrap();
    session.add_export_objects(&["root_jnt"]).unwrap();
    session.add_export_folder("out").unwrap();
    (session, temp)
}

fn add_run(session: &mut Session<MockHost>) -> EntryId {
    let id = session.add_entry().unwrap().id();
    session.rename_entry(id, "Run").unwrap();
    session.set_entry_range(id, 1, 24).unwrap();
    session
        .set_entry_layer(id, "FaceLayer", LayerKind::Mute, true)
        .unwrap();
    id
}

// === Export ===

#[test]
fn test_export_single_entry_end_to_end() {
    let (mut session, temp) = hero_session();
    let id = add_run(&mut session);

    let report = session.export_entry(id, false).unwrap();

    let expected = temp.path().join("out").join("Hero@Run.fbx");
    assert_eq!(report.files, vec![expected.clone()]);
    assert!(report.finished_at >= report.started_at);

    let exports = session.host().exports();
    assert_eq!(exports.len(), 1);
    let recorded = &exports[0];
    assert_eq!(recorded.command.path, expected);
    assert_eq!(
        (recorded.command.range.start(), recorded.command.range.end()),
        (1, 24)
    );
    assert_eq!(recorded.playback_range, (1, 24));
    assert_eq!(recorded.muted, vec!["FaceLayer".to_string()]);
    assert!(recorded.soloed.is_empty());
    assert_eq!(recorded.selection, vec!["root_jnt".to_string()]);

    let script = &recorded.script;
    assert!(script.starts_with("FBXResetExport;\n"));
    assert!(script.contains("FBXExportBakeComplexStart -v 1;"));
    assert!(script.contains("FBXExportBakeComplexEnd -v 24;"));
    assert!(script.contains("FBXExportUpAxis y;"));
    let target = expected.to_string_lossy().replace('\\', "/");
    assert!(script.ends_with(&format!("FBXExport -f \"{}\" -s;", target)));

    // Scene is back to how the artist left it
    let host = session.host();
    assert_eq!(host.playback_range(), (1, 120));
    assert_eq!(host.layer_flag("FaceLayer", LayerKind::Mute), Some(false));
    assert_eq!(host.selection(), vec!["camera".to_string()]);
    assert_eq!(host.open_chunk_count(), 0);
}

#[test]
fn test_export_to_every_existing_folder() {
    let (mut session, temp) = hero_session();
    std::fs::create_dir(temp.path().join("backup")).unwrap();
    session.add_export_folder("backup").unwrap();
    session.add_export_folder("not_there").unwrap();
    let id = add_run(&mut session);

    let report = session.export_entry(id, false).unwrap();

    assert_eq!(report.files.len(), 2);
    assert_eq!(report.skipped_folders, vec!["not_there".to_string()]);
    assert_eq!(session.host().exports().len(), 2);
}

#[test]
fn test_failed_export_reverts_scene() {
    let (mut session, _temp) = hero_session();
    let id = add_run(&mut session);
    session.host_mut().key_object("root_jnt", &[0, 60]);
    session.host_mut().fail_exports(true);

    let err = session.export_entry(id, true).unwrap_err();

    assert_eq!(err.error_code(), "EXPORT_INVOCATION");
    let host = session.host();
    assert_eq!(host.undo_calls(), 1);
    assert_eq!(host.playback_range(), (1, 120));
    assert_eq!(host.layer_flag("FaceLayer", LayerKind::Mute), Some(false));
    assert_eq!(host.selection(), vec!["camera".to_string()]);
    let keys: Vec<i32> = host.keys("root_jnt").unwrap().iter().copied().collect();
    assert_eq!(keys, vec![0, 60]);
    assert!(!session.export_flag().is_held());
}

#[test]
fn test_prebake_keys_only_inside_range() {
    let (mut session, _temp) = hero_session();
    let id = add_run(&mut session);
    session.host_mut().key_object("root_jnt", &[-10, 5, 200]);

    session.export_entry(id, true).unwrap();

    let recorded = &session.host().exports()[0];
    let baked: Vec<i32> = recorded.keys["root_jnt"].iter().copied().collect();
    assert_eq!(baked, (1..=24).collect::<Vec<_>>());

    let after: Vec<i32> = session
        .host()
        .keys("root_jnt")
        .unwrap()
        .iter()
        .copied()
        .collect();
    assert_eq!(after, vec![-10, 5, 200]);
}

#[test]
fn test_stale_layer_is_skipped() {
    let (mut session, _temp) = hero_session();
    let id = add_run(&mut session);
    session
        .set_entry_layer(id, "ArmsLayer", LayerKind::Solo, true)
        .unwrap();
    session.host_mut().remove_layer("ArmsLayer");

    let report = session.export_entry(id, false).unwrap();

    assert_eq!(report.stale_layers, vec!["ArmsLayer".to_string()]);
    assert_eq!(session.host().exports()[0].muted, vec!["FaceLayer".to_string()]);
}

#[test]
fn test_reentrant_export_rejected() {
    let (mut session, _temp) = hero_session();
    let id = add_run(&mut session);

    let flag = session.export_flag();
    let _running = flag.try_acquire().unwrap();

    let err = session.export_entry(id, false).unwrap_err();
    assert!(matches!(err, ExportError::ReentrantExport));
    assert!(session.host().exports().is_empty());
    assert!(matches!(
        session.apply_entry(id),
        Err(ExportError::ReentrantExport)
    ));
}

// === Validation ===

#[test]
fn test_validation_aborts_before_scene_changes() {
    let (mut session, _temp) = hero_session();
    let id = add_run(&mut session);
    session.host_mut().remove_object("root_jnt");

    let err = session.export_entry(id, false).unwrap_err();

    assert!(matches!(
        err,
        ExportError::Validation(ValidationFailure::NoExistingExportObjects)
    ));
    assert_eq!(session.host().undo_calls(), 0);
    assert_eq!(session.host().open_chunk_count(), 0);
}

#[test]
fn test_objects_checked_before_folders() {
    let (mut session, _temp) = hero_session();
    let id = add_run(&mut session);
    session.clear_export_objects().unwrap();
    session.clear_export_folders().unwrap();

    let err = session.export_entry(id, false).unwrap_err();
    assert!(matches!(
        err,
        ExportError::Validation(ValidationFailure::NoExportObjects)
    ));
}

// === Batch ===

#[test]
fn test_export_all() {
    let (mut session, temp) = hero_session();
    add_run(&mut session);
    let idle = session.add_entry().unwrap().id();
    session.rename_entry(idle, "Idle").unwrap();
    session.set_entry_range(idle, 100, 130).unwrap();

    let items = session.export_all(false).unwrap();

    let names: Vec<&str> = items.iter().map(|item| item.entry.as_str()).collect();
    assert_eq!(names, vec!["Run", "Idle"]);
    let report = items[1].result.as_ref().unwrap();
    assert_eq!(report.files, vec![temp.path().join("out").join("Hero@Idle.fbx")]);
    assert_eq!(report.phases.last(), Some(&ExportPhase::Idle));
}

#[test]
fn test_export_all_stops_on_character_failure() {
    let (mut session, _temp) = hero_session();
    add_run(&mut session);
    session.clear_export_folders().unwrap();

    assert!(session.export_all(false).is_err());
    assert!(session.host().exports().is_empty());
}

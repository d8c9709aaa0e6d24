//! Export preconditions
//!
//! Checked in a fixed order so the artist always sees the first thing to
//! fix: prefix, objects configured, objects present, folders configured,
//! folders present, then the entry itself. Nothing here touches the scene.

use std::path::PathBuf;

use log::warn;

use crate::error::ValidationFailure;
use crate::host::HostBridge;
use crate::state::{AnimationEntry, Character};

/// What an export will actually use once stale references are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportTargets {
    /// Configured objects present in the scene.
    pub objects: Vec<String>,
    /// Configured folders present on disk, resolved.
    pub folders: Vec<PathBuf>,
    /// Configured objects missing from the scene.
    pub skipped_objects: Vec<String>,
    /// Configured folders missing from disk, as stored.
    pub skipped_folders: Vec<String>,
}

/// Character-level checks, shared by every entry of a batch.
pub fn validate_character<H: HostBridge + ?Sized>(
    character: &Character,
    host: &H,
) -> Result<ExportTargets, ValidationFailure> {
    if character.prefix().trim().is_empty() {
        return Err(ValidationFailure::MissingPrefix);
    }

    if character.objects().is_empty() {
        return Err(ValidationFailure::NoExportObjects);
    }
    let objects = character.resolve_objects(host);
    if objects.existing.is_empty() {
        return Err(ValidationFailure::NoExistingExportObjects);
    }

    if character.folders().is_empty() {
        return Err(ValidationFailure::NoExportFolders);
    }
    let root = host.project_root();
    let folders = character.resolve_folders(root.as_deref());
    if folders.existing.is_empty() {
        return Err(ValidationFailure::NoExistingExportFolders);
    }

    for name in &objects.missing {
        warn!("[EXPORT] Skipping missing object '{}'", name);
    }
    for folder in &folders.missing {
        warn!("[EXPORT] Skipping missing folder '{}'", folder);
    }

    Ok(ExportTargets {
        objects: objects.existing,
        folders: folders.existing,
        skipped_objects: objects.missing,
        skipped_folders: folders.missing,
    })
}

pub fn validate_entry(entry: &AnimationEntry) -> Result<(), ValidationFailure> {
    if entry.is_exportable() {
        Ok(())
    } else {
        Err(ValidationFailure::IncompleteEntry {
            name: entry.name().to_string(),
        })
    }
}

/// Every precondition for exporting `entry`, in order.
pub fn validate_export<H: HostBridge + ?Sized>(
    character: &Character,
    entry: &AnimationEntry,
    host: &H,
) -> Result<ExportTargets, ValidationFailure> {
    let targets = validate_character(character, host)?;
    validate_entry(entry)?;
    Ok(targets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{MockHost, ObjectKind};
    use crate::state::{FrameRange, LayerSets};
    use test_case::test_case;

    struct Fixture {
        host: MockHost,
        character: Character,
        _temp: tempfile::TempDir,
    }

    fn fixture(objects: &[&str], folders: &[&str]) -> Fixture {
        let temp = tempfile::tempdir().unwrap();
        std::fs::create_dir(temp.path().join("out")).unwrap();

        let mut host = MockHost::new();
        host.add_object("root_jnt", ObjectKind::Joint);
        host.set_project_root(temp.path());

        let mut character = Character::new("Hero");
        if !objects.is_empty() {
            character.add_export_objects(objects).unwrap();
        }
        for folder in folders {
            character.add_export_folder(folder, Some(temp.path())).unwrap();
        }
        Fixture {
            host,
            character,
            _temp: temp,
        }
    }

    fn run() -> AnimationEntry {
        AnimationEntry::from_parts("Run", FrameRange::new(1, 24).unwrap(), LayerSets::default())
    }

    #[test_case(&[], &[], ValidationFailure::NoExportObjects ; "objects reported before folders")]
    #[test_case(&["gone"], &["out"], ValidationFailure::NoExistingExportObjects ; "no object exists")]
    #[test_case(&["root_jnt"], &[], ValidationFailure::NoExportFolders ; "no folders")]
    #[test_case(&["root_jnt"], &["missing"], ValidationFailure::NoExistingExportFolders ; "no folder exists")]
    fn test_validation_order(objects: &[&str], folders: &[&str], expected: ValidationFailure) {
        let f = fixture(objects, folders);
        assert_eq!(validate_export(&f.character, &run(), &f.host), Err(expected));
    }

    #[test]
    fn test_partial_targets_proceed() {
        let f = fixture(&["root_jnt", "gone"], &["out", "missing"]);
        let targets = validate_export(&f.character, &run(), &f.host).unwrap();
        assert_eq!(targets.objects, vec!["root_jnt".to_string()]);
        assert_eq!(targets.skipped_objects, vec!["gone".to_string()]);
        assert_eq!(targets.folders.len(), 1);
        assert_eq!(targets.skipped_folders, vec!["missing".to_string()]);
    }

    #[test]
    fn test_incomplete_entry_checked_last() {
        let f = fixture(&["root_jnt"], &["out"]);
        let unnamed =
            AnimationEntry::from_parts("", FrameRange::new(1, 24).unwrap(), LayerSets::default());
        assert_eq!(
            validate_export(&f.character, &unnamed, &f.host),
            Err(ValidationFailure::IncompleteEntry {
                name: String::new()
            })
        );
    }

    #[test]
    fn test_missing_prefix_first() {
        let f = fixture(&[], &[]);
        let blank = Character::from_parts(String::new(), vec![], vec![], vec![]);
        assert_eq!(
            validate_export(&blank, &run(), &f.host),
            Err(ValidationFailure::MissingPrefix)
        );
    }
}

//! Animation entries
//!
//! An entry ("take") is a named frame range plus a frozen copy of which
//! animation layers were soloed or muted when it was last edited. It is not
//! a live binding to the host's layers.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationFailure;
use crate::host::HostBridge;
use crate::layers::{snapshot, LayerKind, LayerState};
use crate::state::naming::{title_case, validate_entry_name};

/// Runtime identity of an entry, stable across renames. Not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(Uuid);

impl EntryId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Inclusive frame range, serialized as `[start, end]`.
///
/// Ranges captured from the host may be degenerate (`start == end`); ranges
/// set through [`FrameRange::new`] always have `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[i32; 2]", into = "[i32; 2]")]
pub struct FrameRange {
    start: i32,
    end: i32,
}

impl FrameRange {
    /// Create a range with `start < end`.
    pub fn new(start: i32, end: i32) -> Result<Self, ValidationFailure> {
        if start < end {
            Ok(Self { start, end })
        } else {
            Err(ValidationFailure::InvertedRange { start, end })
        }
    }

    /// Create a range from two frames in any order.
    pub fn from_unordered(a: i32, b: i32) -> Self {
        Self {
            start: a.min(b),
            end: a.max(b),
        }
    }

    pub fn start(&self) -> i32 {
        self.start
    }

    pub fn end(&self) -> i32 {
        self.end
    }

    pub fn is_valid(&self) -> bool {
        self.start < self.end
    }

    pub fn contains(&self, frame: i32) -> bool {
        self.start <= frame && frame <= self.end
    }
}

impl From<[i32; 2]> for FrameRange {
    fn from(pair: [i32; 2]) -> Self {
        Self::from_unordered(pair[0], pair[1])
    }
}

impl From<FrameRange> for [i32; 2] {
    fn from(range: FrameRange) -> Self {
        [range.start, range.end]
    }
}

impl fmt::Display for FrameRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Names of the layers an entry solos and mutes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerSets {
    pub solo: BTreeSet<String>,
    pub mute: BTreeSet<String>,
}

impl LayerSets {
    /// Reduce a snapshot to the names that are soloed and muted.
    pub fn from_state(state: &LayerState) -> Self {
        Self {
            solo: state.names_with(LayerKind::Solo).collect(),
            mute: state.names_with(LayerKind::Mute).collect(),
        }
    }

    pub fn get(&self, kind: LayerKind) -> &BTreeSet<String> {
        match kind {
            LayerKind::Solo => &self.solo,
            LayerKind::Mute => &self.mute,
        }
    }

    pub fn contains(&self, name: &str, kind: LayerKind) -> bool {
        self.get(kind).contains(name)
    }

    /// Turn `name` on or off for `kind`. Returns whether anything changed.
    pub fn set(&mut self, name: &str, kind: LayerKind, enabled: bool) -> bool {
        let set = match kind {
            LayerKind::Solo => &mut self.solo,
            LayerKind::Mute => &mut self.mute,
        };
        if enabled {
            set.insert(name.to_string())
        } else {
            set.remove(name)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.solo.is_empty() && self.mute.is_empty()
    }

    /// Every layer name referenced by either set.
    pub fn names(&self) -> BTreeSet<&str> {
        self.solo
            .iter()
            .chain(self.mute.iter())
            .map(String::as_str)
            .collect()
    }
}

/// Optional fields for a new entry. Anything left `None` is captured from
/// the host.
#[derive(Debug, Clone, Default)]
pub struct EntryOverrides {
    pub name: Option<String>,
    pub range: Option<FrameRange>,
    pub layers: Option<LayerSets>,
}

impl EntryOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_range(mut self, range: FrameRange) -> Self {
        self.range = Some(range);
        self
    }

    pub fn with_layers(mut self, layers: LayerSets) -> Self {
        self.layers = Some(layers);
        self
    }
}

/// A named, exportable animation take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimationEntry {
    id: EntryId,
    name: String,
    range: FrameRange,
    layers: LayerSets,
}

impl AnimationEntry {
    /// Create an entry, capturing unspecified fields from the host: the
    /// playback range sorted ascending and the soloed/muted layer names.
    pub fn capture<H: HostBridge + ?Sized>(host: &H, overrides: EntryOverrides) -> Self {
        let range = overrides.range.unwrap_or_else(|| {
            let (min, max) = host.playback_range();
            FrameRange::from_unordered(min, max)
        });
        let layers = overrides
            .layers
            .unwrap_or_else(|| LayerSets::from_state(&snapshot(host)));

        Self {
            id: EntryId::new(),
            name: overrides.name.unwrap_or_default(),
            range,
            layers,
        }
    }

    /// Build an entry from stored fields.
    pub fn from_parts(name: impl Into<String>, range: FrameRange, layers: LayerSets) -> Self {
        Self {
            id: EntryId::new(),
            name: name.into(),
            range,
            layers,
        }
    }

    pub fn id(&self) -> EntryId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn range(&self) -> FrameRange {
        self.range
    }

    pub fn layers(&self) -> &LayerSets {
        &self.layers
    }

    /// Rename, reporting why a candidate was rejected.
    ///
    /// `is_available` is the owning character's uniqueness check; it must
    /// ignore this entry so re-entering the current name succeeds.
    pub fn try_rename<F>(&mut self, candidate: &str, is_available: F) -> Result<(), ValidationFailure>
    where
        F: Fn(&str) -> bool,
    {
        let trimmed = candidate.trim();
        validate_entry_name(trimmed)?;
        if !is_available(trimmed) {
            return Err(ValidationFailure::DuplicateName {
                candidate: trimmed.to_string(),
            });
        }
        self.name = title_case(trimmed);
        Ok(())
    }

    /// Rename. Returns false and leaves the name untouched on rejection.
    pub fn rename<F>(&mut self, candidate: &str, is_available: F) -> bool
    where
        F: Fn(&str) -> bool,
    {
        self.try_rename(candidate, is_available).is_ok()
    }

    /// Set the range, reporting an inverted range.
    pub fn try_set_range(&mut self, start: i32, end: i32) -> Result<(), ValidationFailure> {
        self.range = FrameRange::new(start, end)?;
        Ok(())
    }

    /// Set the range. Returns false and keeps the old range unless
    /// `start < end`.
    pub fn set_range(&mut self, start: i32, end: i32) -> bool {
        self.try_set_range(start, end).is_ok()
    }

    /// Solo or mute a layer for this entry. Returns whether anything changed.
    pub fn set_layer(&mut self, name: &str, kind: LayerKind, enabled: bool) -> bool {
        self.layers.set(name, kind, enabled)
    }

    /// Whether the entry has what an export needs.
    pub fn is_exportable(&self) -> bool {
        !self.name.trim().is_empty() && self.range.is_valid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MockHost;
    use pretty_assertions::assert_eq;

    fn entry(name: &str, start: i32, end: i32) -> AnimationEntry {
        AnimationEntry::from_parts(
            name,
            FrameRange::new(start, end).unwrap(),
            LayerSets::default(),
        )
    }

    #[test]
    fn test_capture_defaults_from_host() {
        let mut host = MockHost::new();
        host.set_range(48, 12);
        host.add_layer("Upper", None);
        host.add_layer("Face", None);
        host.set_flag("Face", LayerKind::Mute, true);

        let entry = AnimationEntry::capture(&host, EntryOverrides::new());

        assert_eq!(entry.name(), "");
        assert_eq!(entry.range(), FrameRange::from_unordered(12, 48));
        assert!(entry.layers().contains("Face", LayerKind::Mute));
        assert!(entry.layers().solo.is_empty());
    }

    #[test]
    fn test_capture_overrides_win() {
        let host = MockHost::new();
        let range = FrameRange::new(1, 24).unwrap();
        let entry = AnimationEntry::capture(
            &host,
            EntryOverrides::new().with_name("Run").with_range(range),
        );
        assert_eq!(entry.name(), "Run");
        assert_eq!(entry.range(), range);
    }

    #[test]
    fn test_set_range_valid() {
        let mut e = entry("Run", 1, 24);
        assert!(e.set_range(-10, 10));
        assert_eq!(e.range(), FrameRange::new(-10, 10).unwrap());
    }

    #[test]
    fn test_set_range_rejects_inverted_and_equal() {
        let mut e = entry("Run", 1, 24);
        for (start, end) in [(10, 10), (24, 1), (0, -1)] {
            assert!(!e.set_range(start, end));
            assert_eq!(e.range(), FrameRange::new(1, 24).unwrap());
        }
    }

    #[test]
    fn test_rename_trims_and_title_cases() {
        let mut e = entry("Anim_1", 1, 24);
        assert!(e.rename("  run cycle ", |_| true));
        assert_eq!(e.name(), "Run Cycle");
    }

    #[test]
    fn test_rename_rejects_unavailable() {
        let mut e = entry("Anim_1", 1, 24);
        let result = e.try_rename("Walk", |_| false);
        assert_eq!(
            result,
            Err(ValidationFailure::DuplicateName {
                candidate: "Walk".to_string()
            })
        );
        assert_eq!(e.name(), "Anim_1");
    }

    #[test]
    fn test_rename_rejects_blank() {
        let mut e = entry("Anim_1", 1, 24);
        assert!(!e.rename("   ", |_| true));
        assert_eq!(e.name(), "Anim_1");
    }

    #[test]
    fn test_set_layer_is_set_like() {
        let mut e = entry("Run", 1, 24);
        assert!(e.set_layer("Face", LayerKind::Mute, true));
        assert!(!e.set_layer("Face", LayerKind::Mute, true));
        assert_eq!(e.layers().mute.len(), 1);
        assert!(e.set_layer("Face", LayerKind::Mute, false));
        assert!(!e.set_layer("Face", LayerKind::Mute, false));
        assert!(e.layers().is_empty());
    }

    #[test]
    fn test_frame_range_serializes_as_pair() {
        let range = FrameRange::new(1, 24).unwrap();
        assert_eq!(serde_json::to_string(&range).unwrap(), "[1,24]");
        let parsed: FrameRange = serde_json::from_str("[24,1]").unwrap();
        assert_eq!(parsed, range);
    }

    #[test]
    fn test_is_exportable() {
        assert!(entry("Run", 1, 24).is_exportable());
        let degenerate = AnimationEntry::from_parts(
            "Idle",
            FrameRange::from_unordered(5, 5),
            LayerSets::default(),
        );
        assert!(!degenerate.is_exportable());
    }
}

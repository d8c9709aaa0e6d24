//! Layer snapshot and application.

use std::collections::{BTreeSet, HashSet};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::LayerKind;
use crate::error::Result;
use crate::host::HostBridge;
use crate::state::LayerSets;

/// One layer as seen in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerRecord {
    pub name: String,
    pub muted: bool,
    pub soloed: bool,
    /// Nesting level; direct children of the root layer are at depth 0.
    pub depth: usize,
}

impl LayerRecord {
    pub fn flag(&self, kind: LayerKind) -> bool {
        match kind {
            LayerKind::Solo => self.soloed,
            LayerKind::Mute => self.muted,
        }
    }
}

/// Ordered, depth-first record of every layer below the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerState {
    layers: Vec<LayerRecord>,
}

impl LayerState {
    pub fn iter(&self) -> impl Iterator<Item = &LayerRecord> {
        self.layers.iter()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&LayerRecord> {
        self.layers.iter().find(|layer| layer.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Names in traversal order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.layers.iter().map(|layer| layer.name.as_str())
    }

    /// Names whose `kind` flag is on, in traversal order.
    pub fn names_with(&self, kind: LayerKind) -> impl Iterator<Item = String> + '_ {
        self.layers
            .iter()
            .filter(move |layer| layer.flag(kind))
            .map(|layer| layer.name.clone())
    }
}

/// Walk the host's layer tree depth-first from its root.
///
/// Iterative so pathological nesting cannot overflow the stack. A layer
/// reached twice (a malformed tree) is recorded once.
pub fn snapshot<H: HostBridge + ?Sized>(host: &H) -> LayerState {
    let Some(root) = host.root_layer() else {
        return LayerState::default();
    };

    let mut layers = Vec::new();
    let mut visited: HashSet<String> = HashSet::new();
    visited.insert(root.clone());

    let mut stack: Vec<(String, usize)> = host
        .layer_children(&root)
        .into_iter()
        .rev()
        .map(|child| (child, 0))
        .collect();

    while let Some((name, depth)) = stack.pop() {
        if !visited.insert(name.clone()) {
            warn!("[LAYERS] Layer '{}' reached twice, skipping", name);
            continue;
        }

        for child in host.layer_children(&name).into_iter().rev() {
            stack.push((child, depth + 1));
        }

        layers.push(LayerRecord {
            muted: host.layer_flag(&name, LayerKind::Mute).unwrap_or(false),
            soloed: host.layer_flag(&name, LayerKind::Solo).unwrap_or(false),
            name,
            depth,
        });
    }

    LayerState { layers }
}

/// Outcome of [`apply_layer_state`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppliedLayers {
    /// Requested names no longer present in the host.
    pub stale: Vec<String>,
}

/// Reset every layer's solo and mute flag, then turn on the requested ones.
///
/// Names missing from the host are skipped and reported back, never an
/// error. Resetting first keeps flags from a previously applied entry from
/// bleeding into this one.
pub fn apply_layer_state<H: HostBridge + ?Sized>(
    host: &mut H,
    solo: &BTreeSet<String>,
    mute: &BTreeSet<String>,
) -> Result<AppliedLayers> {
    let current = snapshot(host);

    for layer in current.iter() {
        for kind in LayerKind::ALL {
            if layer.flag(kind) {
                host.set_layer_flag(&layer.name, kind, false)?;
            }
        }
    }

    let mut applied = AppliedLayers::default();
    for (kind, names) in [(LayerKind::Solo, solo), (LayerKind::Mute, mute)] {
        for name in names {
            if current.contains(name) {
                host.set_layer_flag(name, kind, true)?;
            } else {
                debug!("[LAYERS] Skipping stale {} layer '{}'", kind, name);
                if !applied.stale.contains(name) {
                    applied.stale.push(name.clone());
                }
            }
        }
    }

    Ok(applied)
}

/// A layer line in the entry editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerRow {
    pub name: String,
    /// Depth in the host tree; `None` when the layer is gone from the host.
    pub depth: Option<usize>,
    pub solo: bool,
    pub mute: bool,
}

impl LayerRow {
    pub fn is_present(&self) -> bool {
        self.depth.is_some()
    }
}

/// Merge the host's current layers with an entry's stored sets.
///
/// Host layers come first in traversal order. Names the entry still
/// references but the host no longer has follow, sorted.
pub fn layer_rows(state: &LayerState, sets: &LayerSets) -> Vec<LayerRow> {
    let mut rows: Vec<LayerRow> = state
        .iter()
        .map(|layer| LayerRow {
            name: layer.name.clone(),
            depth: Some(layer.depth),
            solo: sets.contains(&layer.name, LayerKind::Solo),
            mute: sets.contains(&layer.name, LayerKind::Mute),
        })
        .collect();

    rows.extend(
        sets.names()
            .into_iter()
            .filter(|name| !state.contains(name))
            .map(|name| LayerRow {
                name: name.to_string(),
                depth: None,
                solo: sets.contains(name, LayerKind::Solo),
                mute: sets.contains(name, LayerKind::Mute),
            }),
    );

    rows
}

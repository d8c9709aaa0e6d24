//! Animation Layer Module
//!
//! Flattens the host's animation-layer tree into an ordered snapshot and
//! re-applies solo/mute sets onto it:
//! - Snapshot: depth-first, order-preserving, side-effect free
//! - Apply: reset every flag, then set the requested ones, skipping stale names

mod snapshot;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use snapshot::{
    apply_layer_state, layer_rows, snapshot, AppliedLayers, LayerRecord, LayerRow, LayerState,
};

/// The two per-layer flags an entry can store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    Solo,
    Mute,
}

impl LayerKind {
    pub const ALL: [LayerKind; 2] = [LayerKind::Solo, LayerKind::Mute];
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerKind::Solo => write!(f, "solo"),
            LayerKind::Mute => write!(f, "mute"),
        }
    }
}

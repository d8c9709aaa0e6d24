//! Host application bridge
//!
//! The capability surface consumed from the 3D host: playback range,
//! animation-layer flags, scene objects, selection, scene metadata, undo
//! chunks, key baking and the export command itself. Everything here runs
//! on the host's single scripting thread.

pub mod mock;

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::export::ExportCommand;
use crate::layers::LayerKind;
use crate::state::FrameRange;

pub use mock::{MockHost, RecordedExport};

/// Result type for host calls
pub type HostResult<T> = std::result::Result<T, HostError>;

/// Failures reported by the host itself.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    #[error("Command '{command}' failed: {reason}")]
    Command { command: String, reason: String },

    #[error("No such animation layer: {name}")]
    UnknownLayer { name: String },

    #[error("No such object: {name}")]
    UnknownObject { name: String },

    #[error("Nothing to undo")]
    NothingToUndo,
}

/// Node type of a scene object, as far as the export UI cares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Joint,
    Transform,
    Mesh,
    Other(String),
}

impl ObjectKind {
    /// Map a host node type name onto a kind.
    pub fn from_type_name(type_name: &str) -> Self {
        match type_name {
            "joint" => ObjectKind::Joint,
            "transform" => ObjectKind::Transform,
            "mesh" => ObjectKind::Mesh,
            other => ObjectKind::Other(other.to_string()),
        }
    }

    pub fn is_joint(&self) -> bool {
        matches!(self, ObjectKind::Joint)
    }
}

/// World up axis of the host scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpAxis {
    #[default]
    Y,
    Z,
}

impl UpAxis {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpAxis::Y => "y",
            UpAxis::Z => "z",
        }
    }
}

impl fmt::Display for UpAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capabilities the host application exposes to the exporter.
///
/// Queries take `&self` and never change scene state. Mutations take
/// `&mut self`; those that touch scene state (range, layer flags, keys) are
/// expected to be undoable through [`HostBridge::undo`] when made inside an
/// undo chunk.
pub trait HostBridge {
    // Playback

    /// Playback range as (min, max) frames.
    fn playback_range(&self) -> (i32, i32);

    fn set_playback_range(&mut self, start: i32, end: i32) -> HostResult<()>;

    fn current_time(&self) -> i32;

    // Animation layers

    /// The implicit root layer, or `None` when the scene has no layers.
    fn root_layer(&self) -> Option<String>;

    /// Direct children of a layer, in host order.
    fn layer_children(&self, layer: &str) -> Vec<String>;

    /// Current mute or solo flag of a layer. `None` if the layer is unknown.
    fn layer_flag(&self, layer: &str, kind: LayerKind) -> Option<bool>;

    fn set_layer_flag(&mut self, layer: &str, kind: LayerKind, enabled: bool) -> HostResult<()>;

    // Scene objects

    fn object_exists(&self, name: &str) -> bool;

    fn object_kind(&self, name: &str) -> Option<ObjectKind>;

    fn selection(&self) -> Vec<String>;

    /// Replace the current selection.
    fn select(&mut self, names: &[String]) -> HostResult<()>;

    // Paths

    /// Root of the current project, used to store folders relatively.
    fn project_root(&self) -> Option<PathBuf>;

    // Scene metadata

    fn file_info(&self, key: &str) -> Option<String>;

    fn set_file_info(&mut self, key: &str, value: &str) -> HostResult<()>;

    // Undo

    fn open_undo_chunk(&mut self, name: &str);

    fn close_undo_chunk(&mut self);

    /// Undo the most recent closed chunk.
    fn undo(&mut self) -> HostResult<()>;

    // Baking

    /// Bake evaluated animation of `objects` into explicit keys on every
    /// frame of `range`.
    fn bake_keys(&mut self, objects: &[String], range: FrameRange) -> HostResult<()>;

    /// Key every animated attribute of `objects` at `frame`.
    fn set_keys(&mut self, objects: &[String], frame: i32) -> HostResult<()>;

    /// Remove keys of `objects` outside `range`.
    fn cut_keys_outside(&mut self, objects: &[String], range: FrameRange) -> HostResult<()>;

    // Export

    fn up_axis(&self) -> UpAxis;

    fn run_export(&mut self, command: &ExportCommand) -> HostResult<()>;
}

//! Export configuration
//!
//! Metadata keys, naming defaults and validation limits shared by the
//! state and export modules.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Validation limits
pub mod limits {
    /// Prefix length must be strictly greater than this
    pub const PREFIX_MIN_EXCLUSIVE: usize = 2;

    /// Prefix length must be strictly less than this
    pub const PREFIX_MAX_EXCLUSIVE: usize = 30;

    /// Shortest accepted animation name
    pub const NAME_MIN: usize = 2;

    /// Longest accepted animation name
    pub const NAME_MAX: usize = 80;

    /// Character reserved as the prefix/name separator in exported filenames
    pub const NAME_SEPARATOR: char = '@';
}

const DEFAULT_DATA_KEY: &str = "GameAnimExportData";
const DEFAULT_ID_PREFIX: &str = "Data";
const DEFAULT_PREFIX: &str = "Default";
const DEFAULT_ENTRY_NAME_BASE: &str = "Anim_";
const DEFAULT_FILE_EXTENSION: &str = "fbx";
const DEFAULT_UNDO_CHUNK: &str = "GameAnimExport";

/// Configuration for one export session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Scene metadata key holding all characters. Legacy blobs append a
    /// numeric suffix to it.
    pub data_key: String,

    /// Character ids are this prefix followed by 1, 2, 3, ...
    pub id_prefix: String,

    /// Prefix given to characters with nothing stored.
    pub default_prefix: String,

    /// Base for generated animation names ("Anim_1", "Anim_2", ...).
    pub entry_name_base: String,

    /// Extension appended to exported files, without the dot.
    pub file_extension: String,

    /// Name of the undo chunk wrapping each export.
    pub undo_chunk_name: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            data_key: DEFAULT_DATA_KEY.to_string(),
            id_prefix: DEFAULT_ID_PREFIX.to_string(),
            default_prefix: DEFAULT_PREFIX.to_string(),
            entry_name_base: DEFAULT_ENTRY_NAME_BASE.to_string(),
            file_extension: DEFAULT_FILE_EXTENSION.to_string(),
            undo_chunk_name: DEFAULT_UNDO_CHUNK.to_string(),
        }
    }
}

impl ExportConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Character id for the given 1-based index.
    pub fn character_id(&self, index: usize) -> String {
        format!("{}{}", self.id_prefix, index)
    }

    /// Legacy metadata key for the given 1-based index.
    pub fn legacy_key(&self, index: usize) -> String {
        format!("{}{}", self.data_key, index)
    }

    /// Parse the 1-based index back out of a character id.
    pub fn character_index(&self, id: &str) -> Option<usize> {
        id.strip_prefix(self.id_prefix.as_str())?
            .parse()
            .ok()
            .filter(|index| *index > 0)
    }

    /// Generated entry name for the given 1-based index.
    pub fn entry_name(&self, index: usize) -> String {
        format!("{}{}", self.entry_name_base, index)
    }
}

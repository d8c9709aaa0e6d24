//! Scene metadata persistence
//!
//! All characters of a scene live in one JSON object stored under the
//! configured data key:
//!
//! ```text
//! GameAnimExportData = {"Data1": {"pref": ..., "objs": [...], "dirs": [...], "anim": [...]},
//!                       "Data2": {...}}
//! ```
//!
//! Saves are write-through: each one rewrites the character's slot and
//! leaves other slots, and unknown fields inside the slot, untouched.
//!
//! Older scenes may instead hold one escaped record directly under the data
//! key. That record is read as the first character and moved into its slot
//! on the next save. A blob that cannot be decoded is copied to
//! `GameAnimExportDataBackup` before a save replaces it.

use std::collections::BTreeMap;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ExportConfig;
use crate::error::{ExportError, Result};
use crate::host::HostBridge;
use crate::state::character::Character;
use crate::state::entry::{AnimationEntry, EntryOverrides, FrameRange, LayerSets};
use crate::state::migration::{decode_legacy, upgrade_legacy_record};

/// Field names of a stored character record.
const RECORD_FIELDS: [&str; 4] = ["pref", "objs", "dirs", "anim"];

/// Stored shape of one character.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CharacterRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pref: Option<String>,

    #[serde(default)]
    pub objs: Vec<String>,

    #[serde(default)]
    pub dirs: Vec<String>,

    #[serde(default)]
    pub anim: Vec<EntryRecord>,
}

/// Stored shape of one animation entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryRecord {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<FrameRange>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layers: Option<LayerSets>,
}

impl CharacterRecord {
    /// Record for a character, entries ordered by range start.
    pub fn from_character(character: &Character) -> Self {
        Self {
            pref: Some(character.prefix().to_string()),
            objs: character.objects().to_vec(),
            dirs: character.folders().to_vec(),
            anim: character
                .entries_by_start()
                .into_iter()
                .map(|entry| EntryRecord {
                    name: entry.name().to_string(),
                    range: Some(entry.range()),
                    layers: Some(entry.layers().clone()),
                })
                .collect(),
        }
    }

    /// Build a character, back-filling missing fields. Entries without a
    /// range or layers take the host's current values, as new entries do.
    pub fn into_character<H: HostBridge + ?Sized>(self, host: &H, config: &ExportConfig) -> Character {
        let entries = self
            .anim
            .into_iter()
            .map(|record| {
                let overrides = EntryOverrides {
                    name: Some(record.name),
                    range: record.range,
                    layers: record.layers,
                };
                AnimationEntry::capture(host, overrides)
            })
            .collect();

        Character::from_parts(
            self.pref
                .filter(|prefix| !prefix.trim().is_empty())
                .unwrap_or_else(|| config.default_prefix.clone()),
            self.objs,
            self.dirs,
            entries,
        )
    }
}

/// Where a loaded record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordSource {
    Current,
    Legacy,
}

/// Contents of the data key.
enum StoredBlob {
    Absent,
    /// Current format: character id to record.
    Slots(BTreeMap<String, Value>),
    /// One record stored directly under the key, as older scenes did. It
    /// belongs to the first character id.
    Record(Value),
    Unreadable { raw: String, error: ExportError },
}

/// Reads and writes characters in scene metadata.
#[derive(Debug, Clone)]
pub struct MetadataStore {
    config: ExportConfig,
}

impl MetadataStore {
    pub fn new(config: ExportConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Strictly decode a current-format blob.
    pub fn decode_blob(&self, raw: &str) -> Result<BTreeMap<String, Value>> {
        serde_json::from_str(raw).map_err(|e| ExportError::PersistenceDecode {
            key: self.config.data_key.clone(),
            reason: e.to_string(),
        })
    }

    /// What the data key holds right now.
    fn read_stored<H: HostBridge + ?Sized>(&self, host: &H) -> StoredBlob {
        let Some(raw) = host.file_info(&self.config.data_key) else {
            return StoredBlob::Absent;
        };
        let key = &self.config.data_key;

        let error = match self.decode_blob(&raw) {
            Ok(map) if self.is_single_record(map.keys()) => {
                return match upgrade_legacy_record(key, Value::Object(map.into_iter().collect())) {
                    Ok(record) => StoredBlob::Record(record),
                    Err(error) => StoredBlob::Unreadable { raw, error },
                };
            }
            Ok(map) => return StoredBlob::Slots(map),
            Err(error) => error,
        };

        // Older scenes kept one escaped record directly under the data key
        match decode_legacy(key, &raw) {
            Ok(Value::Object(map)) if self.is_single_record(map.keys()) => StoredBlob::Record(Value::Object(map)),
            _ => StoredBlob::Unreadable { raw, error },
        }
    }

    /// A bare character record rather than a map of character slots.
    fn is_single_record<'a>(&self, keys: impl Iterator<Item = &'a String>) -> bool {
        let keys: Vec<&String> = keys.collect();
        !keys.iter().any(|key| self.config.character_index(key).is_some())
            && keys.iter().any(|key| RECORD_FIELDS.contains(&key.as_str()))
    }

    /// First unused backup key: `GameAnimExportDataBackup`, `...Backup2`, ...
    fn backup_key<H: HostBridge + ?Sized>(&self, host: &H) -> String {
        (1..)
            .map(|index| match index {
                1 => format!("{}Backup", self.config.data_key),
                n => format!("{}Backup{}", self.config.data_key, n),
            })
            .find(|key| host.file_info(key).is_none())
            .unwrap_or_else(|| format!("{}Backup", self.config.data_key))
    }

    /// Strictly decode the stored record for `id`.
    ///
    /// Returns `Ok(None)` when neither format has it.
    pub fn read_record<H: HostBridge + ?Sized>(
        &self,
        host: &H,
        id: &str,
    ) -> Result<Option<(CharacterRecord, RecordSource)>> {
        match self.read_stored(host) {
            StoredBlob::Slots(mut slots) => {
                if let Some(value) = slots.remove(id) {
                    let record = serde_json::from_value(value).map_err(|e| ExportError::PersistenceDecode {
                        key: format!("{}.{}", self.config.data_key, id),
                        reason: e.to_string(),
                    })?;
                    return Ok(Some((record, RecordSource::Current)));
                }
            }
            StoredBlob::Record(value) if self.config.character_index(id) == Some(1) => {
                let record = serde_json::from_value(value).map_err(|e| ExportError::PersistenceDecode {
                    key: self.config.data_key.clone(),
                    reason: e.to_string(),
                })?;
                return Ok(Some((record, RecordSource::Legacy)));
            }
            StoredBlob::Unreadable { error, .. } => return Err(error),
            StoredBlob::Record(_) | StoredBlob::Absent => {}
        }

        let Some(index) = self.config.character_index(id) else {
            return Ok(None);
        };
        let legacy_key = self.config.legacy_key(index);
        let Some(raw) = host.file_info(&legacy_key) else {
            return Ok(None);
        };
        let value = decode_legacy(&legacy_key, &raw)?;
        let record = serde_json::from_value(value).map_err(|e| ExportError::PersistenceDecode {
            key: legacy_key,
            reason: e.to_string(),
        })?;
        Ok(Some((record, RecordSource::Legacy)))
    }

    /// Load the character stored under `id`.
    ///
    /// Absent or undecodable data yields a default character; decode
    /// problems are logged, never returned.
    pub fn load<H: HostBridge + ?Sized>(&self, host: &H, id: &str) -> Character {
        match self.read_record(host, id) {
            Ok(Some((record, source))) => {
                debug!("[STORE] Loaded {} from {:?} format", id, source);
                record.into_character(host, &self.config)
            }
            Ok(None) => {
                debug!("[STORE] Nothing stored for {}, using defaults", id);
                Character::with_defaults(&self.config)
            }
            Err(e) => {
                warn!("[STORE] {}, using defaults", e);
                Character::with_defaults(&self.config)
            }
        }
    }

    /// Write `character` into its slot of the current-format blob.
    ///
    /// A bare legacy record under the data key moves into the first slot.
    /// Text that cannot be decoded at all is copied to a backup key before
    /// the blob is rewritten.
    pub fn save<H: HostBridge + ?Sized>(&self, host: &mut H, id: &str, character: &Character) -> Result<()> {
        let mut blob = match self.read_stored(host) {
            StoredBlob::Absent => BTreeMap::new(),
            StoredBlob::Slots(slots) => slots,
            StoredBlob::Record(record) => {
                let first = self.config.character_id(1);
                info!("[STORE] Moving legacy record under {} into slot {}", self.config.data_key, first);
                BTreeMap::from([(first, record)])
            }
            StoredBlob::Unreadable { raw, error } => {
                let backup = self.backup_key(host);
                warn!("[STORE] {}, keeping the old text under {}", error, backup);
                host.set_file_info(&backup, &raw)?;
                BTreeMap::new()
            }
        };
        let record = serde_json::to_value(CharacterRecord::from_character(character))?;

        let merged = match (blob.remove(id), record) {
            (Some(Value::Object(mut existing)), Value::Object(fields)) => {
                existing.extend(fields);
                Value::Object(existing)
            }
            (_, record) => record,
        };
        blob.insert(id.to_string(), merged);

        let content = serde_json::to_string(&blob)?;
        host.set_file_info(&self.config.data_key, &content)?;
        debug!(
            "[STORE] Saved {} ({} entries)",
            id,
            character.entries().len()
        );
        Ok(())
    }

    /// Whether either format has something stored for `id`.
    pub fn contains<H: HostBridge + ?Sized>(&self, host: &H, id: &str) -> bool {
        let in_blob = match self.read_stored(host) {
            StoredBlob::Slots(slots) => slots.contains_key(id),
            StoredBlob::Record(_) => self.config.character_index(id) == Some(1),
            StoredBlob::Absent | StoredBlob::Unreadable { .. } => false,
        };
        if in_blob {
            return true;
        }
        self.config
            .character_index(id)
            .is_some_and(|index| host.file_info(&self.config.legacy_key(index)).is_some())
    }

    /// Ids with stored data, probing `Data1`, `Data2`, ... until one is absent.
    pub fn discover<H: HostBridge + ?Sized>(&self, host: &H) -> Vec<String> {
        let ids: Vec<String> = (1..)
            .map(|index| self.config.character_id(index))
            .take_while(|id| self.contains(host, id))
            .collect();
        info!("[STORE] Found {} stored character(s)", ids.len());
        ids
    }

    /// First id with nothing stored.
    pub fn next_free_id<H: HostBridge + ?Sized>(&self, host: &H) -> String {
        self.config.character_id(self.discover(host).len() + 1)
    }
}

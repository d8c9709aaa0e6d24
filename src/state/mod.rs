//! State Module
//!
//! Animation entries, characters, their text and path rules, and how they
//! are persisted in scene metadata (including the read-only legacy format).

pub mod character;
pub mod entry;
pub mod folders;
pub mod migration;
pub mod naming;
pub mod store;

pub use character::{Character, Resolved};
pub use entry::{AnimationEntry, EntryId, EntryOverrides, FrameRange, LayerSets};
pub use store::{CharacterRecord, EntryRecord, MetadataStore, RecordSource};

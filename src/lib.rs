//! GameAnimExport - Animation Take Export for 3D Hosts
//!
//! Artists define named takes (frame range plus which animation layers are
//! soloed or muted) per character, and export each take to one or more
//! folders through the host's export command.
//!
//! # Architecture
//!
//! - `host`: the capability surface consumed from the 3D application
//! - `layers`: depth-first snapshot of the host's animation-layer tree
//! - `state`: takes, characters and their persistence in scene metadata
//! - `export`: validation and scoped scene mutation around each export
//! - `session`: one open character, tying the above together
//!
//! Exports never leave a trace in the scene: every edit they need is made
//! inside an undo chunk that is reverted before the call returns.

pub mod config;
pub mod error;
pub mod export;
pub mod host;
pub mod layers;
pub mod session;
pub mod state;

pub use config::ExportConfig;
pub use error::{ExportError, Result, ValidationFailure};
pub use export::{ExportOptions, ExportReport};
pub use host::{HostBridge, HostError, MockHost};
pub use layers::{LayerKind, LayerState};
pub use session::{ChangeEvent, ObjectStatus, Session};
pub use state::{AnimationEntry, Character, EntryId, FrameRange, LayerSets};

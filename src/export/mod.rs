//! Export Module
//!
//! Turns an [`AnimationEntry`](crate::state::AnimationEntry) into files on
//! disk through the host's export command:
//! - Validation: ordered precondition checks, nothing touched on failure
//! - Scope: selection and undo-chunk bracketing with guaranteed revert
//! - Phases: Idle → Validating → Mutating → Exporting → Reverting → Idle
//! - Filenames: `<Prefix>@<Name>.<ext>` with unsafe characters replaced

mod bake;
mod command;
mod exporter;
mod filename;
mod phase;
mod scope;
mod validate;

pub use bake::prebake;
pub use command::ExportCommand;
pub use exporter::{export_all, export_entry, BatchItem, ExportOptions, ExportReport};
pub use filename::{base_filename, find_collisions, output_path, sanitize};
pub use phase::{ExportPhase, PhaseTracker};
pub use scope::{ExportFlag, ExportFlagGuard, SceneMutationScope};
pub use validate::{validate_character, validate_entry, validate_export, ExportTargets};

//! Export command block handed to the host.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::host::UpAxis;
use crate::state::FrameRange;

/// One export invocation: which objects, which frames, where to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportCommand {
    pub path: PathBuf,
    pub range: FrameRange,
    pub up_axis: UpAxis,
    pub objects: Vec<String>,
}

impl ExportCommand {
    pub fn new(path: PathBuf, range: FrameRange, up_axis: UpAxis, objects: Vec<String>) -> Self {
        Self {
            path,
            range,
            up_axis,
            objects,
        }
    }

    /// Textual configuration block for the host's export plugin.
    ///
    /// Animation is always baked over the command's range; the selection
    /// is what gets written.
    pub fn to_script(&self) -> String {
        let path = self
            .path
            .to_string_lossy()
            .replace('\\', "/")
            .replace('"', "\\\"");
        let lines = [
            "FBXResetExport".to_string(),
            "FBXExportBakeComplexAnimation -v true".to_string(),
            format!("FBXExportBakeComplexStart -v {}", self.range.start()),
            format!("FBXExportBakeComplexEnd -v {}", self.range.end()),
            format!("FBXExportUpAxis {}", self.up_axis),
            format!("FBXExport -f \"{}\" -s", path),
        ];
        let mut script = lines.join(";\n");
        script.push(';');
        script
    }
}

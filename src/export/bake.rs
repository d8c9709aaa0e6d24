//! Prebaking for engines that cannot read layered animation.

use log::debug;

use crate::error::Result;
use crate::host::HostBridge;
use crate::state::FrameRange;

/// Bake `objects` into explicit keys on every frame of `range`, pin keys on
/// both boundaries, then drop keys outside the range.
///
/// The result is a self-contained key set that no longer depends on which
/// layers are active.
pub fn prebake<H: HostBridge + ?Sized>(host: &mut H, objects: &[String], range: FrameRange) -> Result<()> {
    debug!("[BAKE] Baking {} object(s) over {}", objects.len(), range);
    host.bake_keys(objects, range)?;
    host.set_keys(objects, range.start())?;
    host.set_keys(objects, range.end())?;
    host.cut_keys_outside(objects, range)?;
    Ok(())
}

//! Scoped scene mutation
//!
//! Exporting needs the scene changed (playback range, layer flags, baked
//! keys, selection) and then put back exactly as it was. The scope records
//! the selection and opens an undo chunk on entry; on exit it restores the
//! selection, closes the chunk and undoes it once. Exit happens through
//! [`SceneMutationScope::finish`] or, on early return or panic, `Drop`.

use std::cell::Cell;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;

use log::{debug, error};

use crate::error::{ExportError, Result};
use crate::host::HostBridge;

/// Shared "an export is running" flag.
///
/// Clones share state, so host callbacks holding a clone can check it, and
/// a second export started while one is open is refused instead of
/// corrupting the undo stack.
#[derive(Debug, Clone, Default)]
pub struct ExportFlag(Rc<Cell<bool>>);

impl ExportFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_held(&self) -> bool {
        self.0.get()
    }

    /// Claim the flag for the lifetime of the returned guard.
    pub fn try_acquire(&self) -> Result<ExportFlagGuard> {
        if self.0.replace(true) {
            return Err(ExportError::ReentrantExport);
        }
        Ok(ExportFlagGuard(self.0.clone()))
    }
}

/// Releases the [`ExportFlag`] on drop.
#[derive(Debug)]
pub struct ExportFlagGuard(Rc<Cell<bool>>);

impl Drop for ExportFlagGuard {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Exclusive, self-reverting hold on the host scene.
pub struct SceneMutationScope<'h, H: HostBridge + ?Sized> {
    host: &'h mut H,
    selection: Vec<String>,
    closed: bool,
}

impl<'h, H: HostBridge + ?Sized> SceneMutationScope<'h, H> {
    /// Record the selection and open an undo chunk.
    pub fn enter(host: &'h mut H, chunk_name: &str) -> Self {
        let selection = host.selection();
        host.open_undo_chunk(chunk_name);
        debug!("[SCOPE] Opened '{}'", chunk_name);
        Self {
            host,
            selection,
            closed: false,
        }
    }

    /// Restore, close and undo, reporting the first failure.
    pub fn finish(mut self) -> Result<()> {
        self.revert()
    }

    fn revert(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let restored = self.host.select(&self.selection);
        self.host.close_undo_chunk();
        let undone = self.host.undo();
        debug!("[SCOPE] Reverted scene edits");

        restored?;
        undone?;
        Ok(())
    }
}

impl<H: HostBridge + ?Sized> Deref for SceneMutationScope<'_, H> {
    type Target = H;

    fn deref(&self) -> &H {
        self.host
    }
}

impl<H: HostBridge + ?Sized> DerefMut for SceneMutationScope<'_, H> {
    fn deref_mut(&mut self) -> &mut H {
        self.host
    }
}

impl<H: HostBridge + ?Sized> Drop for SceneMutationScope<'_, H> {
    fn drop(&mut self) {
        if let Err(e) = self.revert() {
            error!("[SCOPE] Failed to revert scene: {}", e);
        }
    }
}

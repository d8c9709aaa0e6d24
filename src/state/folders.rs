//! Export folder paths
//!
//! Folders inside the project root are stored relative to it so scenes can
//! move between machines; anything else is stored absolute. Stored forms
//! always use forward slashes.

use std::path::{Component, Path, PathBuf};

use log::warn;

/// Collapse `.` and `..` without touching the filesystem.
pub fn lexical_clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let last_is_normal = matches!(out.components().next_back(), Some(Component::Normal(_)));
                if last_is_normal {
                    out.pop();
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn to_stored(path: &Path) -> String {
    let text = path.to_string_lossy().replace('\\', "/");
    if text.is_empty() {
        ".".to_string()
    } else {
        text
    }
}

/// Normalize a folder for storage.
///
/// Relative input is taken as relative to `root`, or to the working
/// directory when there is no root. The result is relative when it lies
/// inside `root`, absolute otherwise.
pub fn normalize_folder(path: &str, root: Option<&Path>) -> String {
    let candidate = Path::new(path.trim());
    let absolute = match root {
        Some(root) if candidate.is_relative() => lexical_clean(&root.join(candidate)),
        None if candidate.is_relative() => match std::env::current_dir() {
            Ok(cwd) => lexical_clean(&cwd.join(candidate)),
            Err(e) => {
                warn!("[FOLDERS] No working directory for '{}': {}", path, e);
                lexical_clean(candidate)
            }
        },
        _ => lexical_clean(candidate),
    };

    if let Some(root) = root {
        if let Ok(relative) = absolute.strip_prefix(lexical_clean(root)) {
            return to_stored(relative);
        }
    }
    to_stored(&absolute)
}

/// Turn a stored folder back into a usable path.
pub fn resolve_folder(stored: &str, root: Option<&Path>) -> PathBuf {
    let path = Path::new(stored);
    match root {
        Some(root) if path.is_relative() => lexical_clean(&root.join(path)),
        _ => path.to_path_buf(),
    }
}

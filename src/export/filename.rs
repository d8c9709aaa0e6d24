//! Output filenames.
//!
//! Files are named `<prefix>@<entry>.<ext>`, each component reduced to
//! `[A-Za-z0-9_-]`. Two different names can reduce to the same string;
//! [`find_collisions`] reports those, nothing resolves them.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::limits::NAME_SEPARATOR;

/// Replace every character outside `[A-Za-z0-9_-]` with `_`.
pub fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// `prefix@name`, both sanitized.
pub fn base_filename(prefix: &str, name: &str) -> String {
    format!("{}{}{}", sanitize(prefix), NAME_SEPARATOR, sanitize(name))
}

pub fn output_path(folder: &Path, base: &str, extension: &str) -> PathBuf {
    folder.join(format!("{}.{}", base, extension))
}

/// Groups of distinct names that sanitize to the same filename component.
pub fn find_collisions<'a, I>(names: I) -> Vec<(String, Vec<String>)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for name in names {
        let group = groups.entry(sanitize(name)).or_default();
        if !group.iter().any(|existing| existing == name) {
            group.push(name.to_string());
        }
    }
    groups
        .into_iter()
        .filter(|(_, names)| names.len() > 1)
        .collect()
}

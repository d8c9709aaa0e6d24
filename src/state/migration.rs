//! Legacy metadata support.
//!
//! Older scenes stored one blob per character under `GameAnimExportData<N>`,
//! as backslash-escaped JSON text whose entries kept a per-layer flag map:
//!
//! ```text
//! "layers": {"Face": {"mute": true, "solo": false}, "Arms": {...}}
//! ```
//!
//! Legacy blobs are read and upgraded to the current record shape; they are
//! never written back.

use serde_json::{Map, Value};

use crate::error::{ExportError, Result};

/// Undo the backslash escaping applied to legacy blobs.
///
/// Handles `\\`, `\"`, `\'`, `\n`, `\r`, `\t`, `\xHH` and `\uXXXX`. Unknown
/// escapes are kept verbatim.
pub fn unescape_legacy(key: &str, raw: &str) -> Result<String> {
    let decode_error = |reason: String| ExportError::PersistenceDecode {
        key: key.to_string(),
        reason,
    };

    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some(kind @ ('x' | 'u')) => {
                let width = if kind == 'x' { 2 } else { 4 };
                let digits: String = chars.by_ref().take(width).collect();
                if digits.len() != width {
                    return Err(decode_error(format!("truncated \\{} escape", kind)));
                }
                let code = u32::from_str_radix(&digits, 16)
                    .map_err(|_| decode_error(format!("bad \\{} escape '{}'", kind, digits)))?;
                let decoded = char::from_u32(code)
                    .ok_or_else(|| decode_error(format!("invalid code point {:#x}", code)))?;
                out.push(decoded);
            }
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => return Err(decode_error("trailing backslash".to_string())),
        }
    }
    Ok(out)
}

/// Decode a legacy blob into a JSON value in the current record shape.
pub fn decode_legacy(key: &str, raw: &str) -> Result<Value> {
    let text = unescape_legacy(key, raw)?;
    let data: Value = serde_json::from_str(&text).map_err(|e| ExportError::PersistenceDecode {
        key: key.to_string(),
        reason: e.to_string(),
    })?;
    upgrade_legacy_record(key, data)
}

/// Convert a legacy record to the current shape.
pub fn upgrade_legacy_record(key: &str, mut data: Value) -> Result<Value> {
    let Some(record) = data.as_object_mut() else {
        return Err(ExportError::PersistenceDecode {
            key: key.to_string(),
            reason: "legacy record is not an object".to_string(),
        });
    };

    if let Some(Value::Array(entries)) = record.get_mut("anim") {
        for entry in entries.iter_mut() {
            if let Some(layers) = entry.get_mut("layers") {
                if is_flag_map(layers) {
                    *layers = flag_map_to_sets(layers);
                }
            }
        }
    }

    Ok(data)
}

/// True for `{layer: {mute, solo}}` maps, false for `{solo: [], mute: []}`.
fn is_flag_map(layers: &Value) -> bool {
    match layers {
        Value::Object(map) => map.values().all(Value::is_object) && !map.is_empty(),
        _ => false,
    }
}

fn flag_map_to_sets(layers: &Value) -> Value {
    let mut solo = Vec::new();
    let mut mute = Vec::new();
    if let Value::Object(map) = layers {
        for (name, flags) in map {
            let flag = |field: &str| flags.get(field).and_then(Value::as_bool).unwrap_or(false);
            if flag("solo") {
                solo.push(Value::String(name.clone()));
            }
            if flag("mute") {
                mute.push(Value::String(name.clone()));
            }
        }
    }
    let mut sets = Map::new();
    sets.insert("solo".to_string(), Value::Array(solo));
    sets.insert("mute".to_string(), Value::Array(mute));
    Value::Object(sets)
}

//! Reading and writing profile documents on disk.

use crate::core::error::ProfileError;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::io;
use std::path::Path;

/// What was found at a profile path.
#[derive(Debug, Clone, PartialEq)]
pub enum Loaded {
    Missing,
    Parsed(Map<String, Value>),
    Corrupt(String),
}

pub fn read_document(path: &Path) -> Loaded {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Loaded::Missing,
        Err(e) => return Loaded::Corrupt(e.to_string()),
    };
    match serde_json::from_str::<Value>(&content) {
        Ok(Value::Object(map)) => Loaded::Parsed(map),
        Ok(other) => Loaded::Corrupt(format!(
            "top-level value is {}, expected an object",
            crate::core::schema::ValueKind::of(&other)
        )),
        Err(e) => Loaded::Corrupt(e.to_string()),
    }
}

/// Pretty-print `data` with `indent` spaces.
pub fn render(data: &Map<String, Value>, indent: usize) -> Result<Vec<u8>, ProfileError> {
    let indent = vec![b' '; indent];
    let formatter = serde_json::ser::PrettyFormatter::with_indent(&indent);
    let mut out = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
    data.serialize(&mut ser)?;
    out.push(b'\n');
    Ok(out)
}

/// Overwrite the document at `path`, creating parent directories.
///
/// The body goes to a sibling temp file first and is renamed into place.
pub fn write_document(
    path: &Path,
    data: &Map<String, Value>,
    indent: usize,
) -> Result<(), ProfileError> {
    let body = render(data, indent)?;
    let persist = |e: io::Error| ProfileError::Persistence {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(persist)?;
    }
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(".{}.tmp", file_name));
    fs::write(&tmp, &body).map_err(persist)?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(persist(e));
    }
    Ok(())
}

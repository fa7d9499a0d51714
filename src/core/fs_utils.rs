//! File system utility helpers (BOM-aware readers, etc.)
use std::fs;
use std::path::Path;

/// Read a tree dump or source file as UTF-8 text, stripping the UTF-8 BOM if present.
pub fn read_text_file(path: &Path) -> std::io::Result<String> {
    let content = fs::read_to_string(path)?;
    Ok(match content.strip_prefix('\u{FEFF}') {
        Some(rest) => rest.to_string(),
        None => content,
    })
}

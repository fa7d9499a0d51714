//! Document discovery for directory batches.
//!
//! `<old-dir>/x.json` pairs with `<new-dir>/x.json`; an optional
//! `<old-dir>/x.active.json` lists the active statements of the old tree.

use super::engine::DocumentInput;
use crate::ast_core::json::{load_active_statements, load_tree};
use anyhow::{Context, Result};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentPaths {
    /// Путь относительно старой директории
    pub name: String,
    pub old: PathBuf,
    pub new: PathBuf,
    pub active: Option<PathBuf>,
}

/// Пары файлов в порядке имён; файлы без пары пропускаются с предупреждением.
pub fn collect_pairs(old_dir: &Path, new_dir: &Path) -> Vec<DocumentPaths> {
    let mut pairs = Vec::new();
    for entry in WalkDir::new(old_dir).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else { continue };
        if !entry.file_type().is_file() || !file_name.ends_with(".json") || file_name.ends_with(".active.json") {
            continue;
        }
        let Ok(relative) = path.strip_prefix(old_dir) else { continue };
        let new_path = new_dir.join(relative);
        if !new_path.exists() {
            tracing::warn!("No counterpart for {} in {}", relative.display(), new_dir.display());
            continue;
        }
        let active = path.with_file_name(format!("{}.active.json", file_name.trim_end_matches(".json")));
        pairs.push(DocumentPaths {
            name: relative.display().to_string(),
            old: path.to_path_buf(),
            new: new_path,
            active: active.exists().then_some(active),
        });
    }
    pairs
}

pub fn load_document(paths: &DocumentPaths) -> Result<DocumentInput> {
    let old = load_tree(&paths.old).with_context(|| format!("Failed to load tree from {}", paths.old.display()))?;
    let new = load_tree(&paths.new).with_context(|| format!("Failed to load tree from {}", paths.new.display()))?;
    let active = match &paths.active {
        Some(path) => load_active_statements(path)
            .with_context(|| format!("Failed to load active statements from {}", path.display()))?,
        None => Vec::new(),
    };
    Ok(DocumentInput { name: paths.name.clone(), old, new, active })
}

/// Загружает все пары директорий параллельно.
pub fn load_documents(old_dir: &Path, new_dir: &Path) -> Result<Vec<DocumentInput>> {
    let pairs = collect_pairs(old_dir, new_dir);
    tracing::debug!("found {} document pairs under {}", pairs.len(), old_dir.display());
    pairs.par_iter().map(load_document).collect()
}

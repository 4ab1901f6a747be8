use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::errors::DbError;

/// Extract data files carry a `.txt` suffix.
const DATA_SUFFIX: &str = ".txt";

/// Map base file names (suffix stripped) to paths, searching `root`
/// recursively.
///
/// When files in different subdirectories share a base name, the one
/// encountered last during the walk wins. That last-write-wins collision
/// policy is deliberate and preserved from the source behavior.
pub fn find_data_files(root: &Path) -> Result<HashMap<String, PathBuf>, DbError> {
    let mut files = HashMap::new();
    walk(root, &mut files)?;
    Ok(files)
}

fn walk(dir: &Path, files: &mut HashMap<String, PathBuf>) -> Result<(), DbError> {
    let entries = std::fs::read_dir(dir).map_err(|e| DbError::Io(e.to_string()))?;
    for entry in entries {
        let entry = entry.map_err(|e| DbError::Io(e.to_string()))?;
        let path = entry.path();
        if path.is_dir() {
            walk(&path, files)?;
        } else if let Some(base) = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_suffix(DATA_SUFFIX))
        {
            files.insert(base.to_string(), path.clone());
        }
    }
    Ok(())
}

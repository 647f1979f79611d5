//! Model file checks for `rules check`.

use std::path::PathBuf;

use anyhow::Result;

use crate::io::loader::{LoadOptions, load_model_from_path};

/// Per-file check result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckReport {
    pub path: PathBuf,
    pub rules: usize,
}

/// Load every file strictly; the first unreadable file or unparseable rule
/// is an error.
pub fn check_model_files(paths: &[PathBuf]) -> Result<Vec<CheckReport>> {
    let options = LoadOptions {
        fail_on_parse_error: true,
    };
    paths
        .iter()
        .map(|path| {
            let model = load_model_from_path(path, options)?;
            Ok(CheckReport {
                path: path.clone(),
                rules: model.len(),
            })
        })
        .collect()
}

use anyhow::Result;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::member::ModuleInfo;

pub const INIT_FILE: &str = "__init__.py";
const SOURCE_SUFFIX: &str = ".py";
const EXTENSION_SUFFIXES: &[&str] = &[".so", ".pyd"];

/// Lists the direct child modules of a package search path.
pub struct ModuleScanner;

impl ModuleScanner {
    pub fn new() -> Self {
        Self
    }

    /// Children of every directory in `paths`, each name prefixed with `prefix`.
    ///
    /// Directories are visited in order and their entries sorted by file name.
    /// A name found in more than one directory is reported once.
    pub fn iter_modules(&self, paths: &[PathBuf], prefix: &str) -> Result<Vec<ModuleInfo>> {
        let mut yielded = HashSet::new();
        let mut modules = Vec::new();

        for dir in paths {
            if !dir.is_dir() {
                continue;
            }

            for entry in WalkDir::new(dir)
                .min_depth(1)
                .max_depth(1)
                .follow_links(true)
                .sort_by_file_name()
            {
                let entry = entry?;
                let Some(file_name) = entry.file_name().to_str() else {
                    continue;
                };

                let Some((name, is_package)) = self.classify(entry.path(), file_name) else {
                    continue;
                };

                if !yielded.insert(name.to_string()) {
                    continue;
                }

                modules.push(ModuleInfo {
                    name: format!("{prefix}{name}"),
                    path: entry.path().to_path_buf(),
                    is_package,
                });
            }
        }

        Ok(modules)
    }

    fn classify<'a>(&self, path: &Path, file_name: &'a str) -> Option<(&'a str, bool)> {
        if path.is_dir() {
            if file_name.contains('.') || !path.join(INIT_FILE).is_file() {
                return None;
            }
            return Some((file_name, true));
        }

        if let Some(stem) = file_name.strip_suffix(SOURCE_SUFFIX) {
            if stem == "__init__" || stem.is_empty() {
                return None;
            }
            return Some((stem, false));
        }

        if EXTENSION_SUFFIXES
            .iter()
            .any(|suffix| file_name.ends_with(suffix))
        {
            log::warn!(
                "Skipping native extension module {} (no Python source)",
                path.display()
            );
        }

        None
    }
}

impl Default for ModuleScanner {
    fn default() -> Self {
        Self::new()
    }
}

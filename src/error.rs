use std::path::PathBuf;
use thiserror::Error;

/// Failures that abort a stub generation run.
#[derive(Error, Debug)]
pub enum StubError {
    #[error("Not a Python package (no __init__.py): {0}")]
    NotAPackage(PathBuf),

    #[error("No module named '{0}'")]
    ModuleNotFound(String),

    #[error("Failed to import {name} from {}: {source}", path.display())]
    Import {
        name: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid syntax in {name} ({}:{line}:{column})", path.display())]
    Syntax {
        name: String,
        path: PathBuf,
        line: usize,
        column: usize,
    },

    #[error("Attempted relative import beyond top-level package in {0}")]
    RelativeImport(String),

    #[error("No signature found for {function}: unexpected parameter '{parameter}'")]
    Signature { function: String, parameter: String },

    #[error("Failed to load Python grammar: {0}")]
    Language(#[from] tree_sitter::LanguageError),
}

pub mod common;
pub mod python;
pub mod signature;
pub mod values;

pub use python::{ImportResolver, NoImports, PythonParser};
pub use signature::SignatureRenderer;

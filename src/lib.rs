//! # PYSTUBS
//!
//! Type-stub generation for Python packages by static analysis.
//!
//! PYSTUBS walks a package's module tree, rebuilds the namespace each module
//! would have after import by parsing its source with tree-sitter, and writes
//! one `.pyi` file per leaf module describing its classes, functions,
//! re-exported modules and simple attributes. Target code is never executed.
//!
//! ## Output
//!
//! The output tree mirrors the dotted package hierarchy:
//! `pkg.sub.mod` is written to `<output>/pkg/sub/mod.pyi`.

pub mod core;
pub mod error;
pub mod formatters;
pub mod parsers;

pub use error::StubError;

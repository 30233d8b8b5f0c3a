use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::member::{LoadedModule, MemberKind, BUILTINS_MODULE};

pub const STUB_EXTENSION: &str = "pyi";

/// Writes one `.pyi` file per module, one declaration block per member.
pub struct StubFormatter;

impl StubFormatter {
    pub fn new() -> Self {
        Self
    }

    /// `<output_root>/<package segments>/<bare module name>.pyi`
    pub fn stub_path(&self, module: &LoadedModule, output_root: &Path) -> PathBuf {
        let mut path = output_root.to_path_buf();
        for segment in module.package.split('.').filter(|s| !s.is_empty()) {
            path.push(segment);
        }
        path.push(format!("{}.{}", module.bare_name(), STUB_EXTENSION));
        path
    }

    /// Write the module's stub, replacing any previous file. Returns its path.
    pub fn format_to_file(&self, module: &LoadedModule, output_root: &Path) -> Result<PathBuf> {
        let output_path = self.stub_path(module, output_root);
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        fs::write(&output_path, self.format_module(module))
            .with_context(|| format!("Failed to write stub {}", output_path.display()))?;
        Ok(output_path)
    }

    pub fn format_module(&self, module: &LoadedModule) -> String {
        let mut output = String::new();
        let _ = writeln!(output, "# Auto-generated stub from pystubs {}", module.name);
        output.push('\n');

        for (name, kind) in &module.members {
            if name.starts_with("__") {
                continue;
            }
            output.push_str(&self.format_member(name, kind));
            output.push_str("\n\n");
        }

        output
    }

    fn format_member(&self, name: &str, kind: &MemberKind) -> String {
        match kind {
            MemberKind::Class { .. } => format!("class {name}:\n    ..."),
            MemberKind::Function { signature } => format!("def {name}{signature}: ..."),
            MemberKind::Module { name: module } => format!("import {module}  # type: ignore"),
            MemberKind::Builtin => format!("# Built-in: {name}"),
            MemberKind::Value { type_name, module } => {
                let type_name = type_name.as_deref().unwrap_or("None");
                let is_builtin = if module == BUILTINS_MODULE { "True" } else { "False" };
                format!("{name}: {type_name} # builtin: {module} {is_builtin}")
            }
        }
    }
}

impl Default for StubFormatter {
    fn default() -> Self {
        Self::new()
    }
}

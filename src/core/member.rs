use std::collections::BTreeMap;
use std::path::PathBuf;

/// Module that defines the interpreter's builtin types and functions.
pub const BUILTINS_MODULE: &str = "builtins";

/// Kind of a module member, checked in this priority order when rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberKind {
    /// A class: its `__name__` and the module that defines it.
    Class { name: String, module: String },
    /// A Python-level function with its rendered call signature.
    Function { signature: String },
    /// A module object bound in the namespace, by fully qualified name.
    Module { name: String },
    /// A natively implemented callable with no inspectable signature.
    Builtin,
    /// Any other value. `type_name` is `None` for the `None` singleton.
    Value {
        type_name: Option<String>,
        module: String,
    },
}

impl MemberKind {
    pub fn class(name: impl Into<String>, module: impl Into<String>) -> Self {
        MemberKind::Class {
            name: name.into(),
            module: module.into(),
        }
    }

    pub fn value(type_name: impl Into<String>, module: impl Into<String>) -> Self {
        MemberKind::Value {
            type_name: Some(type_name.into()),
            module: module.into(),
        }
    }

    pub fn builtin_value(type_name: impl Into<String>) -> Self {
        Self::value(type_name, BUILTINS_MODULE)
    }

    pub fn none() -> Self {
        MemberKind::Value {
            type_name: None,
            module: BUILTINS_MODULE.to_string(),
        }
    }

    /// Value whose type could not be determined statically.
    pub fn unknown() -> Self {
        Self::value("Any", "typing")
    }
}

/// A package being walked: its dotted name and module search path.
#[derive(Debug, Clone)]
pub struct Package {
    pub name: String,
    pub path: Vec<PathBuf>,
}

impl Package {
    pub fn new(name: impl Into<String>, path: Vec<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path,
        }
    }
}

/// A child module found while scanning a package search path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleInfo {
    pub name: String,
    /// The `.py` file for a module, the directory for a package.
    pub path: PathBuf,
    pub is_package: bool,
}

/// A module whose source has been parsed and whose namespace is known.
#[derive(Debug, Clone)]
pub struct LoadedModule {
    pub name: String,
    /// `__package__`: the parent package for a module, itself for a package.
    pub package: String,
    pub origin: PathBuf,
    /// Namespace members ordered by name.
    pub members: BTreeMap<String, MemberKind>,
    /// Literal `__all__`, when the module declares one.
    pub exports: Option<Vec<String>>,
}

impl LoadedModule {
    /// Name of the module without its package prefix.
    pub fn bare_name(&self) -> &str {
        self.name
            .strip_prefix(&self.package)
            .and_then(|rest| rest.strip_prefix('.'))
            .unwrap_or(&self.name)
    }

    pub fn member(&self, name: &str) -> Option<&MemberKind> {
        self.members.get(name)
    }

    /// Names bound by `from <module> import *`.
    pub fn star_exports(&self) -> Vec<(String, MemberKind)> {
        match &self.exports {
            Some(names) => names
                .iter()
                .filter_map(|name| {
                    self.members
                        .get(name)
                        .map(|kind| (name.clone(), kind.clone()))
                })
                .collect(),
            None => self
                .members
                .iter()
                .filter(|(name, _)| !name.starts_with('_'))
                .map(|(name, kind)| (name.clone(), kind.clone()))
                .collect(),
        }
    }
}

/// Package portion of a dotted module name (`a.b.c` -> `a.b`).
pub fn parent_name(name: &str) -> &str {
    name.rsplit_once('.').map(|(parent, _)| parent).unwrap_or("")
}

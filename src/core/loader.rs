use anyhow::{Context, Result};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use super::member::{parent_name, LoadedModule, ModuleInfo, Package};
use super::scanner::INIT_FILE;
use crate::error::StubError;
use crate::parsers::{ImportResolver, PythonParser};

/// Where the source of a dotted module name lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleSource {
    /// A plain `name.py` file.
    Module(PathBuf),
    /// A regular package: the path of its `__init__.py`.
    Package(PathBuf),
    /// A directory without `__init__.py`.
    Namespace(PathBuf),
}

/// Locates and parses Python modules on an explicit search path.
///
/// Each top-level import starts from an empty module table, so nothing is
/// shared between the modules being generated. Within one import chain a
/// module is parsed at most once.
pub struct ModuleLoader {
    search_path: Vec<PathBuf>,
}

impl ModuleLoader {
    pub fn new(search_path: Vec<PathBuf>) -> Self {
        Self { search_path }
    }

    pub fn search_path(&self) -> &[PathBuf] {
        &self.search_path
    }

    /// Finds a module by absolute dotted name. Regular packages and modules
    /// win over namespace directories, earlier search roots over later ones.
    pub fn find_module(&self, name: &str) -> Option<ModuleSource> {
        let parts: Vec<&str> = name.split('.').collect();
        let (last, parents) = parts.split_last()?;
        if last.is_empty() || parents.iter().any(|part| part.is_empty()) {
            return None;
        }

        let mut namespace = None;
        for root in &self.search_path {
            let dir = parents.iter().fold(root.clone(), |dir, part| dir.join(part));

            let package_dir = dir.join(last);
            let init = package_dir.join(INIT_FILE);
            if init.is_file() {
                return Some(ModuleSource::Package(init));
            }

            let file = dir.join(format!("{last}.py"));
            if file.is_file() {
                return Some(ModuleSource::Module(file));
            }

            if namespace.is_none() && package_dir.is_dir() {
                namespace = Some(ModuleSource::Namespace(package_dir));
            }
        }
        namespace
    }

    /// Imports a module found by the scanner.
    pub fn import_module(&self, info: &ModuleInfo) -> Result<LoadedModule> {
        let (origin, package) = if info.is_package {
            (info.path.join(INIT_FILE), info.name.clone())
        } else {
            (info.path.clone(), parent_name(&info.name).to_string())
        };
        let mut context = ImportContext::new(self);
        context.load_source(&info.name, &package, &origin)
    }

    /// Imports a module by absolute dotted name.
    pub fn import_by_name(&self, name: &str) -> Result<LoadedModule> {
        let mut context = ImportContext::new(self);
        context
            .load(name)?
            .ok_or_else(|| StubError::ModuleNotFound(name.to_string()).into())
    }

    /// Imports the package rooted at `dir`, returning it ready for walking.
    pub fn import_package(&self, name: &str, dir: &Path) -> Result<Package> {
        let mut context = ImportContext::new(self);
        context.load_source(name, name, &dir.join(INIT_FILE))?;
        Ok(Package::new(name, vec![dir.to_path_buf()]))
    }
}

/// Dotted name of the package at `dir` and the search root containing it.
///
/// Parent directories are part of the name as long as they hold an
/// `__init__.py` themselves.
pub fn locate_package(dir: &Path) -> Result<(String, PathBuf)> {
    let dir = dir
        .canonicalize()
        .with_context(|| format!("Failed to resolve package directory {}", dir.display()))?;
    if !dir.join(INIT_FILE).is_file() {
        return Err(StubError::NotAPackage(dir).into());
    }

    let mut parts = Vec::new();
    let mut current = dir.as_path();
    loop {
        let name = current
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| StubError::NotAPackage(current.to_path_buf()))?;
        parts.push(name.to_string());

        match current.parent() {
            Some(parent) if parent.join(INIT_FILE).is_file() => current = parent,
            Some(parent) => {
                parts.reverse();
                return Ok((parts.join("."), parent.to_path_buf()));
            }
            None => return Err(StubError::NotAPackage(dir.clone()).into()),
        }
    }
}

/// One chain of imports: the modules currently being loaded and the
/// `sys.modules`-like table of those already loaded.
struct ImportContext<'l> {
    loader: &'l ModuleLoader,
    stack: Vec<String>,
    modules: HashMap<String, Option<LoadedModule>>,
}

impl<'l> ImportContext<'l> {
    fn new(loader: &'l ModuleLoader) -> Self {
        Self {
            loader,
            stack: Vec::new(),
            modules: HashMap::new(),
        }
    }

    fn load_source(&mut self, name: &str, package: &str, origin: &Path) -> Result<LoadedModule> {
        let source = fs::read_to_string(origin).map_err(|source| StubError::Import {
            name: name.to_string(),
            path: origin.to_path_buf(),
            source,
        })?;

        log::debug!("Importing {} from {}", name, origin.display());
        let mut parser = PythonParser::new()?;
        self.stack.push(name.to_string());
        let loaded = parser.parse_module(name, package, origin, &source, self);
        self.stack.pop();
        loaded
    }
}

impl ImportResolver for ImportContext<'_> {
    fn module_exists(&mut self, name: &str) -> bool {
        self.loader.find_module(name).is_some()
    }

    fn load(&mut self, name: &str) -> Result<Option<LoadedModule>> {
        if self.stack.iter().any(|loading| loading == name) {
            log::debug!("Import cycle through {name}; treating it as unresolved");
            return Ok(None);
        }
        if let Some(loaded) = self.modules.get(name) {
            return Ok(loaded.clone());
        }

        let loaded = match self.loader.find_module(name) {
            Some(ModuleSource::Module(origin)) => {
                self.load_source(name, parent_name(name), &origin).map(Some)
            }
            Some(ModuleSource::Package(origin)) => self.load_source(name, name, &origin).map(Some),
            Some(ModuleSource::Namespace(dir)) => Ok(Some(LoadedModule {
                name: name.to_string(),
                package: name.to_string(),
                origin: dir,
                members: BTreeMap::new(),
                exports: None,
            })),
            None => Ok(None),
        }?;
        self.modules.insert(name.to_string(), loaded.clone());
        Ok(loaded)
    }
}

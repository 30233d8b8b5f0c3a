use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::loader::ModuleLoader;
use super::member::Package;
use super::scanner::ModuleScanner;
use crate::formatters::StubFormatter;

/// One stub file written during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedStub {
    pub module: String,
    pub path: PathBuf,
}

/// Stubs written by a run, in traversal order.
#[derive(Debug, Clone, Default)]
pub struct GenerationReport {
    pub stubs: Vec<GeneratedStub>,
}

impl GenerationReport {
    pub fn len(&self) -> usize {
        self.stubs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stubs.is_empty()
    }
}

/// Walks a package depth-first and writes a stub for every leaf module.
pub struct StubGenerator {
    package: Package,
    loader: ModuleLoader,
    scanner: ModuleScanner,
    formatter: StubFormatter,
}

impl StubGenerator {
    pub fn new(package: Package, loader: ModuleLoader) -> Self {
        Self {
            package,
            loader,
            scanner: ModuleScanner::new(),
            formatter: StubFormatter::new(),
        }
    }

    /// Generates stubs under `output_folder`.
    ///
    /// With `flush_old` the output folder is deleted first so that stubs of
    /// removed modules do not linger. The first failing import aborts the run.
    pub fn generate(&self, output_folder: &Path, flush_old: bool) -> Result<GenerationReport> {
        if flush_old && output_folder.exists() {
            log::info!("Removing previous stubs in {}", output_folder.display());
            fs::remove_dir_all(output_folder).with_context(|| {
                format!("Failed to remove old stubs in {}", output_folder.display())
            })?;
        }
        fs::create_dir_all(output_folder)
            .with_context(|| format!("Failed to create {}", output_folder.display()))?;

        let mut report = GenerationReport::default();
        self.generate_stubs(&self.package, output_folder, &mut report)?;
        Ok(report)
    }

    fn generate_stubs(
        &self,
        package: &Package,
        output_folder: &Path,
        report: &mut GenerationReport,
    ) -> Result<()> {
        let prefix = format!("{}.", package.name);
        let children = self.scanner.iter_modules(&package.path, &prefix)?;

        for child in children {
            if child.is_package {
                let subpackage = self.loader.import_package(&child.name, &child.path)?;
                self.generate_stubs(&subpackage, output_folder, report)?;
                continue;
            }

            let module = self.loader.import_module(&child)?;
            let path = self.formatter.format_to_file(&module, output_folder)?;
            log::info!("Generated stub for {} at {}", module.name, path.display());
            report.stubs.push(GeneratedStub {
                module: module.name,
                path,
            });
        }

        Ok(())
    }
}

use pretty_assertions::assert_eq;
use pystubs::core::{LoadedModule, MemberKind};
use pystubs::formatters::StubFormatter;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

fn sample_module() -> LoadedModule {
    let mut members = BTreeMap::new();
    members.insert("Widget".to_string(), MemberKind::class("Widget", "app.ui.widgets"));
    members.insert(
        "build".to_string(),
        MemberKind::Function {
            signature: "(name, *, size: int = 3) -> Widget".to_string(),
        },
    );
    members.insert(
        "np".to_string(),
        MemberKind::Module {
            name: "numpy".to_string(),
        },
    );
    members.insert("measure".to_string(), MemberKind::Builtin);
    members.insert("DEFAULT".to_string(), MemberKind::none());
    members.insert("registry".to_string(), MemberKind::builtin_value("dict"));
    members.insert("theme".to_string(), MemberKind::value("Theme", "app.ui.themes"));
    members.insert("__version__".to_string(), MemberKind::builtin_value("str"));
    members.insert("__doc__".to_string(), MemberKind::none());

    LoadedModule {
        name: "app.ui.widgets".to_string(),
        package: "app.ui".to_string(),
        origin: PathBuf::from("app/ui/widgets.py"),
        members,
        exports: None,
    }
}

#[test]
fn stub_path_mirrors_the_package_hierarchy() {
    let formatter = StubFormatter::new();
    assert_eq!(
        formatter.stub_path(&sample_module(), Path::new("out")),
        Path::new("out").join("app").join("ui").join("widgets.pyi")
    );
}

#[test]
fn formatter_renders_one_block_per_public_member() {
    let rendered = StubFormatter::new().format_module(&sample_module());

    let expected = "\
# Auto-generated stub from pystubs app.ui.widgets

DEFAULT: None # builtin: builtins True

class Widget:
    ...

def build(name, *, size: int = 3) -> Widget: ...

# Built-in: measure

import numpy  # type: ignore

registry: dict # builtin: builtins True

theme: Theme # builtin: app.ui.themes False

";
    assert_eq!(rendered, expected);
}

#[test]
fn format_to_file_creates_directories_and_overwrites() {
    let dir = tempfile::TempDir::new().unwrap();
    let formatter = StubFormatter::new();
    let module = sample_module();

    let target = dir.path().join("app/ui/widgets.pyi");
    fs::create_dir_all(target.parent().unwrap()).unwrap();
    fs::write(&target, "stale contents").unwrap();

    let written = formatter.format_to_file(&module, dir.path()).unwrap();
    assert_eq!(written, target);
    assert_eq!(
        fs::read_to_string(&written).unwrap(),
        formatter.format_module(&module)
    );
}

use indoc::indoc;
use pretty_assertions::assert_eq;
use pystubs::core::{LoadedModule, MemberKind};
use pystubs::parsers::{NoImports, PythonParser};
use pystubs::StubError;
use std::path::Path;

fn parse(code: &str) -> LoadedModule {
    try_parse(code).unwrap()
}

fn try_parse(code: &str) -> anyhow::Result<LoadedModule> {
    let mut parser = PythonParser::new().unwrap();
    parser.parse_module(
        "pkg.sample",
        "pkg",
        Path::new("pkg/sample.py"),
        code,
        &mut NoImports,
    )
}

fn function(signature: &str) -> MemberKind {
    MemberKind::Function {
        signature: signature.to_string(),
    }
}

fn module(name: &str) -> MemberKind {
    MemberKind::Module {
        name: name.to_string(),
    }
}

#[test]
fn python_parser_classifies_top_level_members() {
    let module_ = parse(indoc! {r#"
        import os
        import xml.etree.ElementTree as ET

        __version__ = "1.0"

        class Foo(Base):
            """Doc for Foo"""
            def method(self, x):
                return helper(x)

        def add(a, b=1):
            return a + b

        X = None
        COUNT = 3
        NAME = 'x'
        double = lambda v: v * 2
        say = print
    "#});

    assert_eq!(module_.name, "pkg.sample");
    assert_eq!(module_.bare_name(), "sample");
    assert_eq!(
        module_.member("Foo"),
        Some(&MemberKind::class("Foo", "pkg.sample"))
    );
    assert_eq!(module_.member("method"), None);
    assert_eq!(module_.member("add"), Some(&function("(a, b=1)")));
    assert_eq!(module_.member("os"), Some(&module("os")));
    assert_eq!(module_.member("ET"), Some(&module("xml.etree.ElementTree")));
    assert_eq!(module_.member("X"), Some(&MemberKind::none()));
    assert_eq!(module_.member("COUNT"), Some(&MemberKind::builtin_value("int")));
    assert_eq!(module_.member("NAME"), Some(&MemberKind::builtin_value("str")));
    assert_eq!(module_.member("double"), Some(&function("(v)")));
    assert_eq!(module_.member("say"), Some(&MemberKind::Builtin));
    assert_eq!(
        module_.member("__version__"),
        Some(&MemberKind::builtin_value("str"))
    );
}

#[test]
fn dotted_import_binds_top_level_package() {
    let module_ = parse("import os.path\n");
    assert_eq!(module_.member("os"), Some(&module("os")));
    assert_eq!(module_.member("path"), None);
}

#[test]
fn decorated_and_async_functions_are_functions() {
    let module_ = parse(indoc! {r#"
        import functools

        @functools.lru_cache(maxsize=None)
        def cached(key):
            return key

        async def fetch(url, timeout=30):
            return url

        @dataclass
        class Point:
            x: int
    "#});

    assert_eq!(module_.member("cached"), Some(&function("(key)")));
    assert_eq!(module_.member("fetch"), Some(&function("(url, timeout=30)")));
    assert_eq!(
        module_.member("Point"),
        Some(&MemberKind::class("Point", "pkg.sample"))
    );
}

#[test]
fn later_bindings_replace_earlier_ones() {
    let module_ = parse(indoc! {r#"
        from typing import TYPE_CHECKING

        if TYPE_CHECKING:
            from collections import OrderedDict

        try:
            import json
        except ImportError:
            json = None

        value = 1
        value = "now a string"

        temporary = []
        del temporary

        if __name__ == "__main__":
            main_only = 1
        else:
            imported = True
    "#});

    assert_eq!(module_.member("OrderedDict"), None);
    assert_eq!(module_.member("TYPE_CHECKING"), Some(&MemberKind::unknown()));
    assert_eq!(module_.member("json"), Some(&MemberKind::none()));
    assert_eq!(module_.member("value"), Some(&MemberKind::builtin_value("str")));
    assert_eq!(module_.member("temporary"), None);
    assert_eq!(module_.member("main_only"), None);
    assert_eq!(module_.member("imported"), Some(&MemberKind::builtin_value("bool")));
}

#[test]
fn assigned_values_are_typed_from_their_expression() {
    let module_ = parse(indoc! {r#"
        class Config:
            pass

        default = Config()
        items = [1, 2]
        mapping = {"a": 1}
        ratio = 1 / 2
        flag = not True
        neg = -5
        raw = b"bytes"
        numbers = range(3)
        Alias = Config
        a, b = 1, "two"
        first, *rest = load()
        timeout: float = compute()
        declared_only: int
        opaque = compute()
    "#});

    assert_eq!(
        module_.member("default"),
        Some(&MemberKind::value("Config", "pkg.sample"))
    );
    assert_eq!(module_.member("items"), Some(&MemberKind::builtin_value("list")));
    assert_eq!(module_.member("mapping"), Some(&MemberKind::builtin_value("dict")));
    assert_eq!(module_.member("ratio"), Some(&MemberKind::builtin_value("float")));
    assert_eq!(module_.member("flag"), Some(&MemberKind::builtin_value("bool")));
    assert_eq!(module_.member("neg"), Some(&MemberKind::builtin_value("int")));
    assert_eq!(module_.member("raw"), Some(&MemberKind::builtin_value("bytes")));
    assert_eq!(module_.member("numbers"), Some(&MemberKind::builtin_value("range")));
    assert_eq!(
        module_.member("Alias"),
        Some(&MemberKind::class("Config", "pkg.sample"))
    );
    assert_eq!(module_.member("a"), Some(&MemberKind::builtin_value("int")));
    assert_eq!(module_.member("b"), Some(&MemberKind::builtin_value("str")));
    assert_eq!(module_.member("first"), Some(&MemberKind::unknown()));
    assert_eq!(module_.member("rest"), Some(&MemberKind::builtin_value("list")));
    assert_eq!(module_.member("timeout"), Some(&MemberKind::builtin_value("float")));
    assert_eq!(module_.member("declared_only"), None);
    assert_eq!(module_.member("opaque"), Some(&MemberKind::unknown()));
}

#[test]
fn native_module_functions_are_builtins() {
    let module_ = parse(indoc! {r#"
        import math
        from math import sqrt, pi
        from time import perf_counter as clock

        floor = math.floor
    "#});

    assert_eq!(module_.member("sqrt"), Some(&MemberKind::Builtin));
    assert_eq!(module_.member("pi"), Some(&MemberKind::builtin_value("float")));
    assert_eq!(module_.member("clock"), Some(&MemberKind::Builtin));
    assert_eq!(module_.member("floor"), Some(&MemberKind::Builtin));
}

#[test]
fn future_import_binds_feature_and_stringifies_annotations() {
    let module_ = parse(indoc! {r#"
        from __future__ import annotations

        def convert(a: int, b: list[str] = None) -> str:
            return str(a)
    "#});

    assert_eq!(
        module_.member("annotations"),
        Some(&MemberKind::value("_Feature", "__future__"))
    );
    assert_eq!(
        module_.member("convert"),
        Some(&function("(a: 'int', b: 'list[str]' = None) -> 'str'"))
    );
}

#[test]
fn literal_dunder_all_is_recorded_as_exports() {
    let module_ = parse(indoc! {r#"
        __all__ = ["Engine", "start"]
        __all__ += ["VERSION"]
    "#});

    assert_eq!(
        module_.exports,
        Some(vec![
            "Engine".to_string(),
            "start".to_string(),
            "VERSION".to_string()
        ])
    );
}

#[test]
fn syntax_errors_abort_the_import() {
    let err = try_parse("def broken(:\n    pass\n").unwrap_err();
    match err.downcast_ref::<StubError>() {
        Some(StubError::Syntax { name, line, .. }) => {
            assert_eq!(name, "pkg.sample");
            assert_eq!(*line, 1);
        }
        other => panic!("expected a syntax error, got {other:?}"),
    }
}

#[test]
fn relative_import_beyond_top_level_package_fails() {
    let err = try_parse("from .. import sibling\n").unwrap_err();
    assert!(matches!(
        err.downcast_ref::<StubError>(),
        Some(StubError::RelativeImport(name)) if name == "pkg.sample"
    ));
}

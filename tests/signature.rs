use indoc::indoc;
use pretty_assertions::assert_eq;
use pystubs::core::MemberKind;
use pystubs::parsers::values::{format_float, format_integer, render_string};
use pystubs::parsers::{NoImports, PythonParser};
use std::path::Path;

fn signature_of(code: &str, name: &str) -> String {
    let mut parser = PythonParser::new().unwrap();
    let module = parser
        .parse_module("pkg.sigs", "pkg", Path::new("pkg/sigs.py"), code, &mut NoImports)
        .unwrap();
    match module.member(name) {
        Some(MemberKind::Function { signature }) => signature.clone(),
        other => panic!("{name} is not a function: {other:?}"),
    }
}

#[test]
fn renders_parameter_kinds_and_separators() {
    let code = indoc! {r#"
        def f(a, /, b: int, *, c: str = "x", **kw) -> bool:
            return True

        def g(*args, scale=1.5, flags=0x10, items=(1, 2), name='it\'s'):
            pass

        def h(x: "Foo" = None, *, ys: list[int] = [1, -2], mapping={'k': (3,)}):
            pass

        def empty():
            pass
    "#};

    assert_eq!(
        signature_of(code, "f"),
        "(a, /, b: int, *, c: str = 'x', **kw) -> bool"
    );
    assert_eq!(
        signature_of(code, "g"),
        r#"(*args, scale=1.5, flags=16, items=(1, 2), name="it's")"#
    );
    assert_eq!(
        signature_of(code, "h"),
        "(x: 'Foo' = None, *, ys: list[int] = [1, -2], mapping={'k': (3,)})"
    );
    assert_eq!(signature_of(code, "empty"), "()");
}

#[test]
fn class_annotations_are_qualified_outside_builtins() {
    let code = indoc! {r#"
        class Foo:
            pass

        def f(x: Foo, y: "Foo" = None, *, n: int = 0) -> Foo:
            pass

        def g(z: Missing, w: list[Foo]) -> dict:
            pass
    "#};

    assert_eq!(
        signature_of(code, "f"),
        "(x: pkg.sigs.Foo, y: 'Foo' = None, *, n: int = 0) -> pkg.sigs.Foo"
    );
    assert_eq!(signature_of(code, "g"), "(z: Missing, w: list[Foo]) -> dict");
}

#[test]
fn future_annotations_stay_unqualified_strings() {
    let code = indoc! {r#"
        from __future__ import annotations

        class Foo:
            pass

        def f(x: Foo) -> Foo:
            pass
    "#};

    assert_eq!(signature_of(code, "f"), "(x: 'Foo') -> 'Foo'");
}

#[test]
fn non_literal_defaults_render_as_source_text() {
    let code = indoc! {r#"
        def connect(host=DEFAULT_HOST, retries=len(  HOSTS  ), factory=lambda: None):
            pass
    "#};

    assert_eq!(
        signature_of(code, "connect"),
        "(host=DEFAULT_HOST, retries=len( HOSTS ), factory=lambda: None)"
    );
}

#[test]
fn lambdas_render_their_parameters() {
    let code = "scale = lambda value, factor=2, *rest: value * factor\nnoop = lambda: None\n";
    assert_eq!(signature_of(code, "scale"), "(value, factor=2, *rest)");
    assert_eq!(signature_of(code, "noop"), "()");
}

#[test]
fn literal_repr_matches_python() {
    assert_eq!(format_integer("1_000"), "1000");
    assert_eq!(format_integer("0b101"), "5");
    assert_eq!(format_integer("0o17"), "15");
    assert_eq!(format_float(1e16), "1e+16");
    assert_eq!(format_float(0.00001), "1e-05");
    assert_eq!(format_float(2.0), "2.0");
    assert_eq!(format_float(0.1), "0.1");
    assert_eq!(render_string(r#""plain""#).as_deref(), Some("'plain'"));
    assert_eq!(render_string(r"r'\d+'").as_deref(), Some(r"'\\d+'"));
    assert_eq!(render_string(r#"b"raw""#).as_deref(), Some("b'raw'"));
    assert_eq!(render_string(r#"f"{x}""#), None);
}

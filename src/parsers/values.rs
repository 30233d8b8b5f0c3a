//! Static typing and `repr`-style rendering of Python expressions.

use tree_sitter::Node as TSNode;

use super::common::{extract_text, named_children, normalized_text};
use crate::core::member::{MemberKind, BUILTINS_MODULE};

/// Functions in `builtins` implemented natively (`builtin_function_or_method`).
pub const BUILTIN_FUNCTIONS: &[&str] = &[
    "__build_class__",
    "__import__",
    "abs",
    "aiter",
    "all",
    "anext",
    "any",
    "ascii",
    "bin",
    "breakpoint",
    "callable",
    "chr",
    "compile",
    "delattr",
    "dir",
    "divmod",
    "eval",
    "exec",
    "format",
    "getattr",
    "globals",
    "hasattr",
    "hash",
    "hex",
    "id",
    "input",
    "isinstance",
    "issubclass",
    "iter",
    "len",
    "locals",
    "max",
    "min",
    "next",
    "oct",
    "open",
    "ord",
    "pow",
    "print",
    "repr",
    "round",
    "setattr",
    "sorted",
    "sum",
    "vars",
];

/// Classes defined in `builtins`.
pub const BUILTIN_TYPES: &[&str] = &[
    "bool",
    "bytearray",
    "bytes",
    "classmethod",
    "complex",
    "dict",
    "enumerate",
    "filter",
    "float",
    "frozenset",
    "int",
    "list",
    "map",
    "memoryview",
    "object",
    "property",
    "range",
    "reversed",
    "set",
    "slice",
    "staticmethod",
    "str",
    "super",
    "tuple",
    "type",
    "zip",
    "ArithmeticError",
    "AssertionError",
    "AttributeError",
    "BaseException",
    "DeprecationWarning",
    "EOFError",
    "Exception",
    "FileNotFoundError",
    "ImportError",
    "IndexError",
    "KeyError",
    "KeyboardInterrupt",
    "LookupError",
    "NameError",
    "NotImplementedError",
    "OSError",
    "OverflowError",
    "PermissionError",
    "RuntimeError",
    "StopIteration",
    "SyntaxError",
    "TimeoutError",
    "TypeError",
    "UnicodeDecodeError",
    "UnicodeEncodeError",
    "UserWarning",
    "ValueError",
    "Warning",
    "ZeroDivisionError",
];

const MATH_CONSTANTS: &[&str] = &["e", "inf", "nan", "pi", "tau"];

const TIME_FUNCTIONS: &[&str] = &[
    "asctime",
    "ctime",
    "gmtime",
    "localtime",
    "mktime",
    "monotonic",
    "monotonic_ns",
    "perf_counter",
    "perf_counter_ns",
    "process_time",
    "process_time_ns",
    "sleep",
    "strftime",
    "strptime",
    "time",
    "time_ns",
];

/// Kind of `name` looked up in `builtins`.
pub fn builtin_member(name: &str) -> Option<MemberKind> {
    if BUILTIN_FUNCTIONS.contains(&name) {
        Some(MemberKind::Builtin)
    } else if BUILTIN_TYPES.contains(&name) {
        Some(MemberKind::class(name, BUILTINS_MODULE))
    } else {
        match name {
            "None" => Some(MemberKind::none()),
            "True" | "False" => Some(MemberKind::builtin_value("bool")),
            "Ellipsis" => Some(MemberKind::builtin_value("ellipsis")),
            "NotImplemented" => Some(MemberKind::builtin_value("NotImplementedType")),
            _ => None,
        }
    }
}

/// Kind of `name` imported from a natively implemented standard module.
pub fn native_member(module: &str, name: &str) -> Option<MemberKind> {
    match module {
        BUILTINS_MODULE => builtin_member(name),
        "math" if MATH_CONSTANTS.contains(&name) => Some(MemberKind::builtin_value("float")),
        "math" if is_function_name(name) => Some(MemberKind::Builtin),
        "time" if TIME_FUNCTIONS.contains(&name) => Some(MemberKind::Builtin),
        _ => None,
    }
}

fn is_function_name(name: &str) -> bool {
    name.chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// Builtin type name of a literal-valued expression, `None` when unknown.
///
/// The `None` literal itself is reported as the type name `NoneType`.
pub fn literal_type(node: &TSNode, source: &[u8]) -> Option<&'static str> {
    match node.kind() {
        "integer" | "float" => {
            let text = extract_text(node, source);
            if text.ends_with(['j', 'J']) {
                Some("complex")
            } else if node.kind() == "integer" {
                Some("int")
            } else {
                Some("float")
            }
        }
        "string" => {
            let (prefix, _) = split_string_prefix(extract_text(node, source));
            if prefix.contains(['b', 'B']) {
                Some("bytes")
            } else {
                Some("str")
            }
        }
        "concatenated_string" => named_children(node)
            .first()
            .and_then(|first| literal_type(first, source)),
        "true" | "false" | "not_operator" | "comparison_operator" => Some("bool"),
        "none" => Some("NoneType"),
        "ellipsis" => Some("ellipsis"),
        "list" | "list_comprehension" => Some("list"),
        "dictionary" | "dictionary_comprehension" => Some("dict"),
        "set" | "set_comprehension" => Some("set"),
        "tuple" | "expression_list" => Some("tuple"),
        "generator_expression" => Some("generator"),
        "parenthesized_expression" => named_children(node)
            .first()
            .and_then(|inner| literal_type(inner, source)),
        "unary_operator" => {
            let argument = node.child_by_field_name("argument")?;
            match literal_type(&argument, source) {
                Some(ty @ ("int" | "float" | "complex")) => Some(ty),
                Some("bool") => Some("int"),
                _ => None,
            }
        }
        "binary_operator" => {
            let left = literal_type(&node.child_by_field_name("left")?, source)?;
            let right = literal_type(&node.child_by_field_name("right")?, source)?;
            let operator = node
                .child_by_field_name("operator")
                .map(|op| extract_text(&op, source))
                .unwrap_or("");
            binary_result(left, operator, right)
        }
        _ => None,
    }
}

fn binary_result(left: &'static str, operator: &str, right: &'static str) -> Option<&'static str> {
    let numeric = |ty: &str| matches!(ty, "int" | "float" | "complex");
    match (left, right) {
        ("int", "int") if operator == "/" => Some("float"),
        (l, r)
            if l == r
                && matches!(l, "int" | "float" | "complex" | "str" | "bytes" | "list" | "tuple") =>
        {
            Some(l)
        }
        (l, r) if numeric(l) && numeric(r) => {
            if l == "complex" || r == "complex" {
                Some("complex")
            } else {
                Some("float")
            }
        }
        ("str", _) if operator == "%" => Some("str"),
        _ => None,
    }
}

/// Render an expression the way `repr()` shows the value it evaluates to.
///
/// Only literals are evaluated; any other expression is rendered as its
/// whitespace-normalized source text.
pub fn render_value(node: &TSNode, source: &[u8]) -> String {
    match node.kind() {
        "integer" => format_integer(extract_text(node, source)),
        "float" => format_float_literal(extract_text(node, source)),
        "string" => render_string(extract_text(node, source))
            .unwrap_or_else(|| normalized_text(node, source)),
        "concatenated_string" => render_concatenated(node, source)
            .unwrap_or_else(|| normalized_text(node, source)),
        "true" => "True".to_string(),
        "false" => "False".to_string(),
        "none" => "None".to_string(),
        "ellipsis" => "Ellipsis".to_string(),
        "parenthesized_expression" => match named_children(node).as_slice() {
            [inner] => render_value(inner, source),
            _ => normalized_text(node, source),
        },
        "unary_operator" => {
            let operator = node
                .child_by_field_name("operator")
                .map(|op| extract_text(&op, source))
                .unwrap_or("");
            match (operator, node.child_by_field_name("argument")) {
                ("-", Some(arg)) if matches!(arg.kind(), "integer" | "float") => {
                    format!("-{}", render_value(&arg, source))
                }
                ("+", Some(arg)) if matches!(arg.kind(), "integer" | "float") => {
                    render_value(&arg, source)
                }
                _ => normalized_text(node, source),
            }
        }
        "tuple" => {
            let items = render_items(node, source);
            if items.len() == 1 {
                format!("({},)", items[0])
            } else {
                format!("({})", items.join(", "))
            }
        }
        "list" => format!("[{}]", render_items(node, source).join(", ")),
        "set" => format!("{{{}}}", render_items(node, source).join(", ")),
        "dictionary" => {
            let mut entries = Vec::new();
            for child in named_children(node) {
                match (
                    child.kind(),
                    child.child_by_field_name("key"),
                    child.child_by_field_name("value"),
                ) {
                    ("pair", Some(key), Some(value)) => entries.push(format!(
                        "{}: {}",
                        render_value(&key, source),
                        render_value(&value, source)
                    )),
                    _ => return normalized_text(node, source),
                }
            }
            format!("{{{}}}", entries.join(", "))
        }
        _ => normalized_text(node, source),
    }
}

fn render_items(node: &TSNode, source: &[u8]) -> Vec<String> {
    named_children(node)
        .iter()
        .filter(|child| child.kind() != "comment")
        .map(|child| render_value(child, source))
        .collect()
}

fn render_concatenated(node: &TSNode, source: &[u8]) -> Option<String> {
    let mut prefix_bytes = None;
    let mut content = String::new();
    for part in named_children(node) {
        if part.kind() != "string" {
            continue;
        }
        let literal = StringLiteral::parse(extract_text(&part, source))?;
        if *prefix_bytes.get_or_insert(literal.is_bytes) != literal.is_bytes {
            return None;
        }
        content.push_str(&literal.value);
    }
    Some(quote_repr(&content, prefix_bytes.unwrap_or(false)))
}

/// `repr` of a single string literal; `None` for f-strings.
pub fn render_string(text: &str) -> Option<String> {
    let literal = StringLiteral::parse(text)?;
    Some(quote_repr(&literal.value, literal.is_bytes))
}

/// Value of a plain string literal, `None` for f-strings and bytes.
pub fn string_value(text: &str) -> Option<String> {
    StringLiteral::parse(text)
        .filter(|literal| !literal.is_bytes)
        .map(|literal| literal.value)
}

struct StringLiteral {
    /// Contents with escape sequences left as written, quotes unescaped.
    value: String,
    is_bytes: bool,
}

impl StringLiteral {
    fn parse(text: &str) -> Option<Self> {
        let (prefix, rest) = split_string_prefix(text);
        if prefix.contains(['f', 'F']) {
            return None;
        }
        let quote = ["\"\"\"", "'''", "\"", "'"]
            .into_iter()
            .find(|quote| rest.starts_with(quote) && rest.len() >= 2 * quote.len())?;
        let body = rest.strip_prefix(quote)?.strip_suffix(quote)?;

        let mut value = String::with_capacity(body.len());
        let raw = prefix.contains(['r', 'R']);
        let mut chars = body.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '\\' if raw => value.push_str("\\\\"),
                '\\' => match chars.next() {
                    Some(q @ ('\'' | '"')) => value.push(q),
                    Some('\n') => {}
                    Some(other) => {
                        value.push('\\');
                        value.push(other);
                    }
                    None => value.push('\\'),
                },
                '\n' => value.push_str("\\n"),
                '\t' => value.push_str("\\t"),
                '\r' => value.push_str("\\r"),
                other => value.push(other),
            }
        }

        Some(Self {
            value,
            is_bytes: prefix.contains(['b', 'B']),
        })
    }
}

fn split_string_prefix(text: &str) -> (&str, &str) {
    let split = text
        .find(|c: char| c == '\'' || c == '"')
        .unwrap_or(text.len());
    text.split_at(split)
}

/// `repr` of a `str` holding `value`.
pub fn quote_str(value: &str) -> String {
    quote_repr(value, false)
}

fn quote_repr(value: &str, is_bytes: bool) -> String {
    let prefix = if is_bytes { "b" } else { "" };
    if value.contains('\'') && !value.contains('"') {
        format!("{prefix}\"{value}\"")
    } else {
        format!("{prefix}'{}'", value.replace('\'', "\\'"))
    }
}

/// Decimal rendering of an integer literal (`0x1F` -> `31`, `1_000` -> `1000`).
pub fn format_integer(text: &str) -> String {
    let cleaned = text.replace('_', "").to_ascii_lowercase();
    if cleaned.ends_with('j') {
        return cleaned;
    }
    let parsed = if let Some(hex) = cleaned.strip_prefix("0x") {
        u128::from_str_radix(hex, 16).ok()
    } else if let Some(oct) = cleaned.strip_prefix("0o") {
        u128::from_str_radix(oct, 8).ok()
    } else if let Some(bin) = cleaned.strip_prefix("0b") {
        u128::from_str_radix(bin, 2).ok()
    } else {
        cleaned.parse::<u128>().ok()
    };
    parsed.map(|value| value.to_string()).unwrap_or(cleaned)
}

fn format_float_literal(text: &str) -> String {
    let cleaned = text.replace('_', "");
    if cleaned.ends_with(['j', 'J']) {
        return cleaned.to_ascii_lowercase();
    }
    match cleaned.parse::<f64>() {
        Ok(value) => format_float(value),
        Err(_) => cleaned,
    }
}

/// Python's `repr(float)`: shortest round-trip digits, exponent outside
/// `1e-4 <= |x| < 1e16`.
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let magnitude = value.abs();
    if value == 0.0 || (1e-4..1e16).contains(&magnitude) {
        let fixed = format!("{value}");
        if fixed.contains('.') {
            fixed
        } else {
            format!("{fixed}.0")
        }
    } else {
        let scientific = format!("{value:e}");
        let (mantissa, exponent) = scientific
            .split_once('e')
            .unwrap_or((scientific.as_str(), "0"));
        let exponent: i32 = exponent.parse().unwrap_or(0);
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{mantissa}e{sign}{:02}", exponent.abs())
    }
}

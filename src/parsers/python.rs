use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tree_sitter::Node as TSNode;

use super::common::{
    extract_text, is_identifier, named_children, normalized_text, TreeSitterParser,
};
use super::signature::SignatureRenderer;
use super::values::{builtin_member, literal_type, native_member, string_value};
use crate::core::member::{LoadedModule, MemberKind, BUILTINS_MODULE};
use crate::error::StubError;

/// Conditions whose body never runs when a module is imported.
static IMPORT_TIME_DEAD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^(?:(?:typing\.)?TYPE_CHECKING|__name__ ?== ?['"]__main__['"])$"#)
        .expect("static regex is valid")
});

/// Gives the namespace builder access to other modules named in imports.
pub trait ImportResolver {
    /// Whether a module with this absolute dotted name can be located.
    fn module_exists(&mut self, name: &str) -> bool;

    /// Loads a module by absolute dotted name.
    ///
    /// `Ok(None)` when the module cannot be located or is already being
    /// loaded further up the import chain.
    fn load(&mut self, name: &str) -> Result<Option<LoadedModule>>;
}

/// Resolver for modules analysed in isolation: nothing can be imported.
pub struct NoImports;

impl ImportResolver for NoImports {
    fn module_exists(&mut self, _name: &str) -> bool {
        false
    }

    fn load(&mut self, _name: &str) -> Result<Option<LoadedModule>> {
        Ok(None)
    }
}

pub struct PythonParser {
    parser: TreeSitterParser,
}

impl PythonParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            parser: TreeSitterParser::python()?,
        })
    }

    /// Parse a module's source and rebuild the namespace its import would create.
    pub fn parse_module(
        &mut self,
        name: &str,
        package: &str,
        origin: &Path,
        source: &str,
        resolver: &mut dyn ImportResolver,
    ) -> Result<LoadedModule> {
        let tree = self.parser.parse_source(name, origin, source)?;

        let mut builder = NamespaceBuilder {
            module_name: name,
            package,
            source: source.as_bytes(),
            resolver,
            members: BTreeMap::new(),
            exports: None,
            future_annotations: false,
        };
        builder.visit_block(&tree.root_node())?;

        Ok(LoadedModule {
            name: name.to_string(),
            package: package.to_string(),
            origin: origin.to_path_buf(),
            members: builder.members,
            exports: builder.exports,
        })
    }
}

struct NamespaceBuilder<'a, 'r> {
    module_name: &'a str,
    package: &'a str,
    source: &'a [u8],
    resolver: &'r mut dyn ImportResolver,
    members: BTreeMap<String, MemberKind>,
    exports: Option<Vec<String>>,
    future_annotations: bool,
}

impl<'a> NamespaceBuilder<'a, '_> {
    fn visit_block(&mut self, block: &TSNode) -> Result<()> {
        for statement in named_children(block) {
            self.visit_statement(&statement)?;
        }
        Ok(())
    }

    fn visit_statement(&mut self, node: &TSNode) -> Result<()> {
        match node.kind() {
            "class_definition" => self.bind_class(node),
            "function_definition" => self.bind_function(node)?,
            "decorated_definition" => {
                if let Some(definition) = node.child_by_field_name("definition") {
                    self.visit_statement(&definition)?;
                }
            }
            "import_statement" => self.visit_import(node),
            "import_from_statement" => self.visit_import_from(node)?,
            "future_import_statement" => self.visit_future_import(node),
            "expression_statement" => {
                for child in named_children(node) {
                    match child.kind() {
                        "assignment" => self.visit_assignment(&child)?,
                        "augmented_assignment" => self.visit_augmented_assignment(&child),
                        _ => {}
                    }
                }
            }
            "if_statement" => self.visit_if(node)?,
            "try_statement" => {
                for child in named_children(node) {
                    match child.kind() {
                        "block" => self.visit_block(&child)?,
                        "except_clause" | "except_group_clause" | "else_clause"
                        | "finally_clause" => {
                            for clause_child in named_children(&child) {
                                if clause_child.kind() == "block" {
                                    self.visit_block(&clause_child)?;
                                }
                            }
                        }
                        _ => {}
                    }
                }
            }
            "with_statement" => {
                if let Some(body) = node.child_by_field_name("body") {
                    self.visit_block(&body)?;
                }
            }
            "delete_statement" => self.visit_delete(node),
            _ => {}
        }
        Ok(())
    }

    fn bind(&mut self, name: &str, kind: MemberKind) {
        self.members.insert(name.to_string(), kind);
    }

    fn text(&self, node: &TSNode) -> &'a str {
        extract_text(node, self.source)
    }

    fn bind_class(&mut self, node: &TSNode) {
        if let Some(name) = node.child_by_field_name("name") {
            let name = self.text(&name).to_string();
            let kind = MemberKind::class(name.as_str(), self.module_name);
            self.bind(&name, kind);
        }
    }

    fn bind_function(&mut self, node: &TSNode) -> Result<()> {
        let Some(name) = node.child_by_field_name("name") else {
            return Ok(());
        };
        let name = self.text(&name).to_string();
        let qualified = self.qualified_annotations(node)?;
        let signature = SignatureRenderer::new(self.source, self.future_annotations)
            .with_qualified_names(qualified)
            .render_function(&name, node)?;
        self.bind(&name, MemberKind::Function { signature });
        Ok(())
    }

    /// Annotations of a function that evaluate to classes, keyed by the
    /// start byte of the annotation expression. Classes outside `builtins`
    /// are shown as `module.Name`, as `inspect` formats them.
    fn qualified_annotations(&mut self, node: &TSNode) -> Result<HashMap<usize, String>> {
        let mut qualified = HashMap::new();
        if self.future_annotations {
            return Ok(qualified);
        }
        for expression in SignatureRenderer::annotation_expressions(node) {
            if let Some(MemberKind::Class { name, module }) = self.lookup_expression(&expression)? {
                let rendered = if module == BUILTINS_MODULE {
                    name
                } else {
                    format!("{module}.{name}")
                };
                qualified.insert(expression.start_byte(), rendered);
            }
        }
        Ok(qualified)
    }

    fn visit_import(&mut self, node: &TSNode) {
        let mut cursor = node.walk();
        let names: Vec<TSNode> = node.children_by_field_name("name", &mut cursor).collect();
        for imported in names {
            match imported.kind() {
                "dotted_name" => {
                    // `import a.b.c` binds the top-level package `a`.
                    let dotted = self.text(&imported);
                    let top = dotted.split('.').next().unwrap_or(dotted).trim();
                    self.bind(top, MemberKind::Module { name: top.to_string() });
                }
                "aliased_import" => {
                    let (Some(target), Some(alias)) = (
                        imported.child_by_field_name("name"),
                        imported.child_by_field_name("alias"),
                    ) else {
                        continue;
                    };
                    let target = normalized_text(&target, self.source).replace(' ', "");
                    let alias = self.text(&alias).to_string();
                    self.bind(&alias, MemberKind::Module { name: target });
                }
                _ => {}
            }
        }
    }

    fn visit_import_from(&mut self, node: &TSNode) -> Result<()> {
        let Some(module_node) = node.child_by_field_name("module_name") else {
            return Ok(());
        };
        let module = self.absolute_module(&module_node)?;

        let mut cursor = node.walk();
        let is_star = node
            .children(&mut cursor)
            .any(|child| child.kind() == "wildcard_import");
        if is_star {
            return self.import_star(&module);
        }

        let loaded = self.resolver.load(&module)?;
        let mut cursor = node.walk();
        let names: Vec<TSNode> = node.children_by_field_name("name", &mut cursor).collect();
        for imported in names {
            let Some((target, bound)) = self.imported_name(&imported) else {
                continue;
            };

            let kind = match self.attribute_of(&module, loaded.as_ref(), target) {
                Some(kind) => kind,
                None => {
                    log::debug!(
                        "{}: cannot resolve '{}' from '{}'",
                        self.module_name,
                        target,
                        module
                    );
                    MemberKind::unknown()
                }
            };
            self.bind(bound, kind);
        }
        Ok(())
    }

    fn import_star(&mut self, module: &str) -> Result<()> {
        match self.resolver.load(module)? {
            Some(loaded) => {
                for (name, kind) in loaded.star_exports() {
                    self.bind(&name, kind);
                }
            }
            None => log::debug!(
                "{}: skipping 'from {} import *' (module not found)",
                self.module_name,
                module
            ),
        }
        Ok(())
    }

    fn visit_future_import(&mut self, node: &TSNode) {
        let mut cursor = node.walk();
        let names: Vec<TSNode> = node.children_by_field_name("name", &mut cursor).collect();
        for feature in names {
            let Some((feature_name, bound)) = self.imported_name(&feature) else {
                continue;
            };
            if feature_name == "annotations" {
                self.future_annotations = true;
            }
            self.bind(bound, MemberKind::value("_Feature", "__future__"));
        }
    }

    /// `(imported name, bound name)` of one entry of a `from ... import` list.
    fn imported_name(&self, node: &TSNode) -> Option<(&'a str, &'a str)> {
        match node.kind() {
            "aliased_import" => {
                let target = node.child_by_field_name("name")?;
                let alias = node.child_by_field_name("alias")?;
                Some((self.text(&target), self.text(&alias)))
            }
            _ => {
                let name = self.text(node);
                Some((name, name))
            }
        }
    }

    /// Absolute dotted name of the `from` clause of an import.
    fn absolute_module(&self, module_node: &TSNode) -> Result<String> {
        if module_node.kind() != "relative_import" {
            return Ok(normalized_text(module_node, self.source).replace(' ', ""));
        }

        let mut level = 0;
        let mut tail = None;
        for child in named_children(module_node) {
            match child.kind() {
                "import_prefix" => level = self.text(&child).matches('.').count(),
                "dotted_name" => tail = Some(self.text(&child).to_string()),
                _ => {}
            }
        }

        let mut parts: Vec<&str> = self.package.split('.').filter(|p| !p.is_empty()).collect();
        if level == 0 || parts.len() < level {
            return Err(StubError::RelativeImport(self.module_name.to_string()).into());
        }
        parts.truncate(parts.len() + 1 - level);

        let base = parts.join(".");
        Ok(match tail {
            Some(tail) => format!("{base}.{tail}"),
            None => base,
        })
    }

    /// Kind of attribute `name` of module `module`: the module's own binding,
    /// then a submodule, then the natively implemented standard modules.
    fn resolve_attribute(&mut self, module: &str, name: &str) -> Result<Option<MemberKind>> {
        let loaded = self.resolver.load(module)?;
        Ok(self.attribute_of(module, loaded.as_ref(), name))
    }

    /// Like `resolve_attribute`, for a module that has already been loaded.
    fn attribute_of(
        &mut self,
        module: &str,
        loaded: Option<&LoadedModule>,
        name: &str,
    ) -> Option<MemberKind> {
        if let Some(kind) = loaded.and_then(|loaded| loaded.member(name)) {
            return Some(kind.clone());
        }

        let submodule = format!("{module}.{name}");
        if self.resolver.module_exists(&submodule) {
            return Some(MemberKind::Module { name: submodule });
        }

        native_member(module, name)
    }

    /// Kind of a name or dotted attribute expression evaluated in this namespace.
    fn lookup_expression(&mut self, node: &TSNode) -> Result<Option<MemberKind>> {
        match node.kind() {
            "identifier" | "keyword_identifier" => {
                let name = self.text(node);
                Ok(self
                    .members
                    .get(name)
                    .cloned()
                    .or_else(|| builtin_member(name)))
            }
            "attribute" => {
                let (Some(object), Some(attribute)) = (
                    node.child_by_field_name("object"),
                    node.child_by_field_name("attribute"),
                ) else {
                    return Ok(None);
                };
                let attribute = self.text(&attribute).to_string();
                match self.lookup_expression(&object)? {
                    Some(MemberKind::Module { name }) => self.resolve_attribute(&name, &attribute),
                    _ => Ok(None),
                }
            }
            _ => Ok(None),
        }
    }

    fn visit_assignment(&mut self, node: &TSNode) -> Result<()> {
        let annotation = node.child_by_field_name("type");
        let mut targets = Vec::new();
        let mut current = *node;
        let value = loop {
            if let Some(left) = current.child_by_field_name("left") {
                targets.push(left);
            }
            match current.child_by_field_name("right") {
                Some(right) if right.kind() == "assignment" => current = right,
                right => break right,
            }
        };

        // A bare annotation binds nothing at runtime.
        let Some(value) = value else {
            return Ok(());
        };

        for target in targets {
            self.bind_target(&target, &value, annotation.as_ref())?;
        }
        Ok(())
    }

    fn bind_target(
        &mut self,
        target: &TSNode,
        value: &TSNode,
        annotation: Option<&TSNode>,
    ) -> Result<()> {
        match target.kind() {
            "identifier" | "keyword_identifier" => {
                let name = self.text(target).to_string();
                if name == "__all__" {
                    self.exports = literal_string_list(value, self.source);
                }
                let kind = self.classify_value(&name, value, annotation)?;
                self.bind(&name, kind);
            }
            "pattern_list" | "tuple_pattern" | "list_pattern" => {
                let elements: Vec<TSNode> = named_children(target)
                    .into_iter()
                    .filter(|child| child.kind() != "comment")
                    .collect();
                let values: Option<Vec<TSNode>> =
                    matches!(value.kind(), "expression_list" | "tuple" | "list").then(|| {
                        named_children(value)
                            .into_iter()
                            .filter(|child| child.kind() != "comment")
                            .collect()
                    });
                let has_splat = elements
                    .iter()
                    .any(|element| element.kind() == "list_splat_pattern");

                match values {
                    Some(values) if !has_splat && values.len() == elements.len() => {
                        for (element, value) in elements.iter().zip(values.iter()) {
                            self.bind_target(element, value, None)?;
                        }
                    }
                    _ => {
                        for element in &elements {
                            self.bind_unpacked(element);
                        }
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Binds an unpacking target whose value is not known element-wise.
    fn bind_unpacked(&mut self, element: &TSNode) {
        match element.kind() {
            "identifier" | "keyword_identifier" => {
                let name = self.text(element).to_string();
                self.bind(&name, MemberKind::unknown());
            }
            "list_splat_pattern" => {
                if let Some(inner) = element.named_child(0).filter(is_identifier) {
                    let name = self.text(&inner).to_string();
                    self.bind(&name, MemberKind::builtin_value("list"));
                }
            }
            "pattern_list" | "tuple_pattern" | "list_pattern" => {
                for nested in named_children(element) {
                    self.bind_unpacked(&nested);
                }
            }
            _ => {}
        }
    }

    fn visit_augmented_assignment(&mut self, node: &TSNode) {
        let (Some(left), Some(right)) = (
            node.child_by_field_name("left"),
            node.child_by_field_name("right"),
        ) else {
            return;
        };
        if self.text(&left) != "__all__" {
            return;
        }
        if let (Some(exports), Some(extra)) = (
            self.exports.as_mut(),
            literal_string_list(&right, self.source),
        ) {
            exports.extend(extra);
        }
    }

    fn visit_delete(&mut self, node: &TSNode) {
        let mut targets = Vec::new();
        for child in named_children(node) {
            match child.kind() {
                "expression_list" => targets.extend(named_children(&child)),
                _ => targets.push(child),
            }
        }
        for target in targets.iter().filter(|target| is_identifier(target)) {
            let name = self.text(target).to_string();
            self.members.remove(&name);
        }
    }

    fn visit_if(&mut self, node: &TSNode) -> Result<()> {
        self.visit_conditional_branch(node)?;

        let mut cursor = node.walk();
        let alternatives: Vec<TSNode> = node
            .children_by_field_name("alternative", &mut cursor)
            .collect();
        for alternative in alternatives {
            match alternative.kind() {
                "elif_clause" => self.visit_conditional_branch(&alternative)?,
                "else_clause" => {
                    if let Some(body) = alternative.child_by_field_name("body") {
                        self.visit_block(&body)?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn visit_conditional_branch(&mut self, node: &TSNode) -> Result<()> {
        let dead = node
            .child_by_field_name("condition")
            .map(|condition| IMPORT_TIME_DEAD.is_match(&normalized_text(&condition, self.source)))
            .unwrap_or(false);
        if dead {
            return Ok(());
        }
        if let Some(consequence) = node.child_by_field_name("consequence") {
            self.visit_block(&consequence)?;
        }
        Ok(())
    }

    /// Kind of the object an assignment binds to `name`.
    fn classify_value(
        &mut self,
        name: &str,
        value: &TSNode,
        annotation: Option<&TSNode>,
    ) -> Result<MemberKind> {
        let inferred = match value.kind() {
            "lambda" => Some(MemberKind::Function {
                signature: SignatureRenderer::new(self.source, self.future_annotations)
                    .render_lambda(name, value)?,
            }),
            "identifier" | "keyword_identifier" | "attribute" => self.lookup_expression(value)?,
            "call" => self.instance_of_call(value)?,
            _ => literal_type(value, self.source).map(|type_name| match type_name {
                "NoneType" => MemberKind::none(),
                other => MemberKind::builtin_value(other),
            }),
        };

        match inferred {
            Some(kind) => Ok(kind),
            None => match annotation {
                Some(annotation) => self.annotated_value(annotation),
                None => Ok(MemberKind::unknown()),
            },
        }
    }

    /// `Cls(...)` evaluates to an instance of `Cls` when `Cls` is a known class.
    fn instance_of_call(&mut self, call: &TSNode) -> Result<Option<MemberKind>> {
        let Some(callee) = call.child_by_field_name("function") else {
            return Ok(None);
        };
        Ok(match self.lookup_expression(&callee)? {
            Some(MemberKind::Class { name, module }) => Some(MemberKind::value(name, module)),
            _ => None,
        })
    }

    /// Value kind declared by an annotation when the value itself is opaque.
    fn annotated_value(&mut self, annotation: &TSNode) -> Result<MemberKind> {
        let expression = match annotation.kind() {
            "type" => annotation.named_child(0).unwrap_or(*annotation),
            _ => *annotation,
        };
        if let Some(MemberKind::Class { name, module }) = self.lookup_expression(&expression)? {
            return Ok(MemberKind::value(name, module));
        }
        let text = normalized_text(&expression, self.source);
        if text == "None" {
            return Ok(MemberKind::none());
        }
        Ok(MemberKind::value(text, "typing"))
    }
}

/// Strings of a literal list or tuple of plain string literals.
fn literal_string_list(node: &TSNode, source: &[u8]) -> Option<Vec<String>> {
    if !matches!(node.kind(), "list" | "tuple") {
        return None;
    }
    named_children(node)
        .iter()
        .filter(|child| child.kind() != "comment")
        .map(|child| match child.kind() {
            "string" => string_value(extract_text(child, source)),
            _ => None,
        })
        .collect()
}

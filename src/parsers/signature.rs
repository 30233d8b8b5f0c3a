use anyhow::Result;
use std::collections::HashMap;
use tree_sitter::Node as TSNode;

use super::common::{extract_text, named_children, normalized_text};
use super::values::{quote_str, render_string, render_value};
use crate::error::StubError;

/// Renders call signatures in the format of `inspect.Signature.__str__`.
pub struct SignatureRenderer<'a> {
    source: &'a [u8],
    /// Set when the module uses `from __future__ import annotations`.
    stringify_annotations: bool,
    /// Rendered class names by annotation start byte.
    qualified: HashMap<usize, String>,
}

impl<'a> SignatureRenderer<'a> {
    pub fn new(source: &'a [u8], stringify_annotations: bool) -> Self {
        Self {
            source,
            stringify_annotations,
            qualified: HashMap::new(),
        }
    }

    /// Render the annotation expressions starting at these byte offsets with
    /// the given text instead of their source.
    pub fn with_qualified_names(mut self, qualified: HashMap<usize, String>) -> Self {
        self.qualified = qualified;
        self
    }

    /// Name and attribute expressions used as annotations of a
    /// `function_definition`, return annotation included.
    pub fn annotation_expressions<'t>(node: &TSNode<'t>) -> Vec<TSNode<'t>> {
        let mut annotations = Vec::new();
        if let Some(parameters) = node.child_by_field_name("parameters") {
            for parameter in named_children(&parameters) {
                if matches!(parameter.kind(), "typed_parameter" | "typed_default_parameter") {
                    annotations.extend(parameter.child_by_field_name("type"));
                }
            }
        }
        annotations.extend(node.child_by_field_name("return_type"));

        annotations
            .into_iter()
            .map(|annotation| annotation_expression(&annotation))
            .filter(|expression| matches!(expression.kind(), "identifier" | "attribute"))
            .collect()
    }

    /// Signature of a `function_definition` node, e.g. `(a, b=1) -> int`.
    pub fn render_function(&self, name: &str, node: &TSNode) -> Result<String> {
        let mut signature = self.render_parameters(name, node.child_by_field_name("parameters"))?;
        if let Some(return_type) = node.child_by_field_name("return_type") {
            signature.push_str(" -> ");
            signature.push_str(&self.render_annotation(&return_type));
        }
        Ok(signature)
    }

    /// Signature of a `lambda` node.
    pub fn render_lambda(&self, name: &str, node: &TSNode) -> Result<String> {
        self.render_parameters(name, node.child_by_field_name("parameters"))
    }

    fn render_parameters(&self, name: &str, parameters: Option<TSNode>) -> Result<String> {
        let Some(parameters) = parameters else {
            return Ok("()".to_string());
        };

        let mut rendered = Vec::new();
        let mut cursor = parameters.walk();
        for parameter in parameters.children(&mut cursor) {
            match parameter.kind() {
                "(" | ")" | "," | "comment" => continue,
                _ => rendered.push(self.render_parameter(name, &parameter)?),
            }
        }

        Ok(format!("({})", rendered.join(", ")))
    }

    fn render_parameter(&self, function: &str, parameter: &TSNode) -> Result<String> {
        let rendered = match parameter.kind() {
            "identifier" | "list_splat_pattern" | "dictionary_splat_pattern" => {
                normalized_text(parameter, self.source)
            }
            "keyword_separator" | "*" => "*".to_string(),
            "positional_separator" | "/" => "/".to_string(),
            "typed_parameter" => {
                let target = parameter
                    .named_child(0)
                    .filter(|target| target.kind() != "type")
                    .ok_or_else(|| self.signature_error(function, parameter))?;
                let annotation = parameter
                    .child_by_field_name("type")
                    .ok_or_else(|| self.signature_error(function, parameter))?;
                format!(
                    "{}: {}",
                    normalized_text(&target, self.source),
                    self.render_annotation(&annotation)
                )
            }
            "default_parameter" => {
                let (name, value) = self.name_and_value(function, parameter)?;
                format!("{}={}", name, render_value(&value, self.source))
            }
            "typed_default_parameter" => {
                let (name, value) = self.name_and_value(function, parameter)?;
                let annotation = parameter
                    .child_by_field_name("type")
                    .ok_or_else(|| self.signature_error(function, parameter))?;
                format!(
                    "{}: {} = {}",
                    name,
                    self.render_annotation(&annotation),
                    render_value(&value, self.source)
                )
            }
            _ => return Err(self.signature_error(function, parameter).into()),
        };
        Ok(rendered)
    }

    fn name_and_value<'t>(
        &self,
        function: &str,
        parameter: &TSNode<'t>,
    ) -> Result<(&'a str, TSNode<'t>)> {
        let name = parameter
            .child_by_field_name("name")
            .filter(|name| name.kind() == "identifier")
            .ok_or_else(|| self.signature_error(function, parameter))?;
        let value = parameter
            .child_by_field_name("value")
            .ok_or_else(|| self.signature_error(function, parameter))?;
        Ok((extract_text(&name, self.source), value))
    }

    fn render_annotation(&self, annotation: &TSNode) -> String {
        let expression = annotation_expression(annotation);

        if self.stringify_annotations {
            return quote_str(&normalized_text(&expression, self.source));
        }
        if let Some(qualified) = self.qualified.get(&expression.start_byte()) {
            return qualified.clone();
        }

        match expression.kind() {
            "string" => render_string(extract_text(&expression, self.source))
                .unwrap_or_else(|| normalized_text(&expression, self.source)),
            _ => normalized_text(&expression, self.source),
        }
    }

    fn signature_error(&self, function: &str, parameter: &TSNode) -> StubError {
        StubError::Signature {
            function: function.to_string(),
            parameter: normalized_text(parameter, self.source),
        }
    }
}

// `type` nodes wrap the annotation expression.
fn annotation_expression<'t>(annotation: &TSNode<'t>) -> TSNode<'t> {
    match annotation.kind() {
        "type" => annotation.named_child(0).unwrap_or(*annotation),
        _ => *annotation,
    }
}

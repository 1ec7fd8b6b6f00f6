//! C# language analyser.

use std::path::Path;
use std::sync::LazyLock;

use log::{debug, warn};
use regex::Regex;
use tree_sitter::{Language, Node, Parser};

use super::CodeAnalyser;
use crate::error::AnalysisError;
use crate::heuristics;
use crate::model::{
    AccessModifier, AnalysisResult, AttributeInfo, ClassInfo, ConstructorInfo, DependencyInfo,
    MethodInfo, ParameterInfo, PropertyInfo,
};

/// `Name = value` inside an attribute argument list.
static NAMED_ARGUMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^([A-Za-z_]\w*)\s*=\s*([^=].*)$").unwrap());

/// Node kinds that add one to a method's cyclomatic complexity.
const BRANCH_KINDS: &[&str] = &[
    "if_statement",
    "while_statement",
    "for_statement",
    "foreach_statement",
    "switch_statement",
    "catch_clause",
    "conditional_expression",
];

fn text(node: &Node, source: &[u8]) -> String {
    node.utf8_text(source).unwrap_or("").trim().to_string()
}

fn children<'t>(node: &Node<'t>) -> impl Iterator<Item = Node<'t>> {
    let node = *node;
    (0..node.child_count()).filter_map(move |i| node.child(i))
}

fn get_name(node: &Node, source: &[u8]) -> Option<String> {
    if let Some(name_node) = node.child_by_field_name("name") {
        return name_node.utf8_text(source).ok().map(|s| s.to_string());
    }
    children(node)
        .find(|c| c.kind() == "identifier")
        .and_then(|c| c.utf8_text(source).ok().map(|s| s.to_string()))
}

/// Lowercased text of every `modifier` child.
fn get_modifiers(node: &Node, source: &[u8]) -> Vec<String> {
    children(node)
        .filter(|c| c.kind() == "modifier")
        .map(|c| text(&c, source).to_lowercase())
        .collect()
}

/// Resolve modifiers with the fixed precedence
/// public > protected internal > private protected > protected > internal > private.
fn access_modifier(modifiers: &[String], default: AccessModifier) -> AccessModifier {
    let has = |m: &str| modifiers.iter().any(|x| x == m);
    if has("public") {
        AccessModifier::Public
    } else if has("protected") && has("internal") {
        AccessModifier::ProtectedInternal
    } else if has("private") && has("protected") {
        AccessModifier::PrivateProtected
    } else if has("protected") {
        AccessModifier::Protected
    } else if has("internal") {
        AccessModifier::Internal
    } else if has("private") {
        AccessModifier::Private
    } else {
        default
    }
}

/// Contiguous `///` comments directly above a declaration.
fn get_documentation(node: &Node, source: &[u8]) -> Option<String> {
    let mut lines = Vec::new();
    let mut current = node.prev_sibling();
    while let Some(sibling) = current {
        if sibling.kind() != "comment" {
            break;
        }
        let comment = text(&sibling, source);
        if !comment.starts_with("///") {
            break;
        }
        lines.push(comment);
        current = sibling.prev_sibling();
    }
    if lines.is_empty() {
        return None;
    }
    lines.reverse();
    Some(lines.join("\n"))
}

fn extract_attributes(node: &Node, source: &[u8]) -> Vec<AttributeInfo> {
    attributes_from_lists(children(node).filter(|c| c.kind() == "attribute_list"), source)
}

fn attributes_from_lists<'t>(
    lists: impl Iterator<Item = Node<'t>>,
    source: &[u8],
) -> Vec<AttributeInfo> {
    let mut attributes = Vec::new();
    for list in lists {
        for attr in children(&list).filter(|c| c.kind() == "attribute") {
            let name = attr
                .child_by_field_name("name")
                .or_else(|| attr.named_child(0))
                .map(|n| text(&n, source))
                .unwrap_or_default();
            let mut info = AttributeInfo {
                full_name: name.clone(),
                name,
                ..Default::default()
            };
            if let Some(args) = children(&attr).find(|c| c.kind() == "attribute_argument_list") {
                for arg in children(&args).filter(|c| c.kind() == "attribute_argument") {
                    let arg_text = text(&arg, source);
                    match NAMED_ARGUMENT_RE.captures(&arg_text) {
                        Some(cap) => {
                            info.named_arguments
                                .insert(cap[1].to_string(), cap[2].trim().to_string());
                        }
                        None => info.arguments.push(arg_text),
                    }
                }
            }
            attributes.push(info);
        }
    }
    attributes
}

fn extract_parameters(node: &Node, source: &[u8]) -> Vec<ParameterInfo> {
    let Some(list) = node.child_by_field_name("parameters") else {
        return Vec::new();
    };
    let mut params = Vec::new();
    // A `params` array is not wrapped in a node: its attribute lists, the
    // keyword, the type and the name sit directly in the parameter list.
    let mut loose_attributes = Vec::new();
    let mut array: Option<ParameterInfo> = None;
    for child in children(&list) {
        match child.kind() {
            "parameter" | "parameter_array" => {
                loose_attributes.clear();
                params.extend(build_parameter(&child, source));
            }
            "attribute_list" => loose_attributes.push(child),
            "params" => {
                array = Some(ParameterInfo {
                    is_params: true,
                    attributes: attributes_from_lists(loose_attributes.drain(..), source),
                    ..Default::default()
                });
            }
            "identifier" if array.as_ref().is_some_and(|p| !p.param_type.is_empty()) => {
                if let Some(mut param) = array.take() {
                    param.name = text(&child, source);
                    params.push(param);
                }
            }
            _ if child.is_named() => {
                if let Some(param) = array.as_mut().filter(|p| p.param_type.is_empty()) {
                    param.param_type = text(&child, source);
                }
            }
            _ => {}
        }
    }
    params
}

fn build_parameter(node: &Node, source: &[u8]) -> Option<ParameterInfo> {
    let name_node = node
        .child_by_field_name("name")
        .or_else(|| children(node).filter(|c| c.kind() == "identifier").last())?;

    let type_node = node.child_by_field_name("type").or_else(|| {
        children(node).find(|c| {
            c.is_named()
                && c.id() != name_node.id()
                && !matches!(
                    c.kind(),
                    "attribute_list" | "equals_value_clause" | "modifier" | "parameter_modifier"
                )
        })
    });

    let mut param = ParameterInfo {
        name: text(&name_node, source),
        param_type: type_node
            .map(|t| text(&t, source))
            .unwrap_or_else(|| "object".to_string()),
        attributes: extract_attributes(node, source),
        ..Default::default()
    };

    for child in children(node) {
        match text(&child, source).as_str() {
            "params" => param.is_params = true,
            "out" => param.is_out = true,
            "ref" => param.is_ref = true,
            _ => {}
        }
    }

    if let Some(default) = children(node).find(|c| c.kind() == "equals_value_clause") {
        let value = default
            .named_child(0)
            .map(|v| text(&v, source))
            .unwrap_or_else(|| text(&default, source).trim_start_matches('=').trim().to_string());
        param.default_value = Some(value);
        param.is_optional = true;
    }

    Some(param)
}

fn is_logical_operator(node: &Node, source: &[u8]) -> bool {
    let op = node
        .child_by_field_name("operator")
        .map(|o| text(&o, source))
        .or_else(|| {
            children(node)
                .filter(|c| !c.is_named())
                .map(|c| text(&c, source))
                .find(|t| t == "&&" || t == "||")
        });
    matches!(op.as_deref(), Some("&&") | Some("||"))
}

fn count_branches(node: &Node, source: &[u8]) -> u32 {
    let mut count = 0;
    if BRANCH_KINDS.contains(&node.kind())
        || (node.kind() == "binary_expression" && is_logical_operator(node, source))
    {
        count += 1;
    }
    for child in children(node) {
        count += count_branches(&child, source);
    }
    count
}

/// Types constructed in `throw new X(..)`, first occurrence order.
fn collect_thrown(node: &Node, source: &[u8], out: &mut Vec<String>) {
    if matches!(node.kind(), "throw_statement" | "throw_expression") {
        if let Some(creation) = children(node).find(|c| c.kind() == "object_creation_expression")
        {
            if let Some(ty) = creation.child_by_field_name("type") {
                let name = text(&ty, source);
                if !out.contains(&name) {
                    out.push(name);
                }
            }
        }
    }
    for child in children(node) {
        collect_thrown(&child, source, out);
    }
}

fn build_method(node: &Node, source: &[u8], member_default: AccessModifier) -> Option<MethodInfo> {
    let name = get_name(node, source)?;
    let modifiers = get_modifiers(node, source);
    let has = |m: &str| modifiers.iter().any(|x| x == m);
    let return_type = node
        .child_by_field_name("returns")
        .or_else(|| node.child_by_field_name("type"))
        .map(|t| text(&t, source))
        .unwrap_or_else(|| "void".to_string());

    let body = node.child_by_field_name("body");
    let mut thrown_exceptions = Vec::new();
    if let Some(ref b) = body {
        collect_thrown(b, source, &mut thrown_exceptions);
    }

    Some(MethodInfo {
        is_async: has("async") || return_type.contains("Task"),
        is_static: has("static"),
        is_virtual: has("virtual"),
        is_override: has("override"),
        is_abstract: has("abstract"),
        access_modifier: access_modifier(&modifiers, member_default),
        parameters: extract_parameters(node, source),
        attributes: extract_attributes(node, source),
        documentation: get_documentation(node, source),
        cyclomatic_complexity: 1 + body.map(|b| count_branches(&b, source)).unwrap_or(0),
        thrown_exceptions,
        line: node.start_position().row + 1,
        name,
        return_type,
    })
}

fn build_property(
    node: &Node,
    source: &[u8],
    member_default: AccessModifier,
) -> Option<PropertyInfo> {
    let name = get_name(node, source)?;
    let modifiers = get_modifiers(node, source);
    let mut prop = PropertyInfo {
        name,
        property_type: node
            .child_by_field_name("type")
            .map(|t| text(&t, source))
            .unwrap_or_else(|| "object".to_string()),
        access_modifier: access_modifier(&modifiers, member_default),
        is_static: modifiers.iter().any(|m| m == "static"),
        attributes: extract_attributes(node, source),
        ..Default::default()
    };

    let accessors = node
        .child_by_field_name("accessors")
        .or_else(|| children(node).find(|c| c.kind() == "accessor_list"));
    if let Some(list) = accessors {
        let mut all_bodiless = true;
        for accessor in children(&list).filter(|c| c.kind() == "accessor_declaration") {
            for child in children(&accessor) {
                match child.kind() {
                    "get" => prop.has_getter = true,
                    "set" => prop.has_setter = true,
                    "block" | "arrow_expression_clause" => all_bodiless = false,
                    _ => {}
                }
            }
        }
        prop.is_auto_property = all_bodiless;
    }

    let value = node
        .child_by_field_name("value")
        .or_else(|| children(node).find(|c| c.kind() == "arrow_expression_clause"));
    if let Some(v) = value {
        if v.kind() == "arrow_expression_clause" {
            prop.has_getter = true;
            prop.default_value = v.named_child(0).map(|e| text(&e, source));
        } else {
            prop.default_value = Some(text(&v, source));
        }
    }

    Some(prop)
}

fn build_constructor(node: &Node, source: &[u8]) -> ConstructorInfo {
    let modifiers = get_modifiers(node, source);
    let initializer = children(node)
        .find(|c| c.kind() == "constructor_initializer")
        .map(|c| text(&c, source).trim_start_matches(':').trim().to_string())
        .unwrap_or_default();

    ConstructorInfo {
        parameters: extract_parameters(node, source),
        access_modifier: access_modifier(&modifiers, AccessModifier::Private),
        is_static: modifiers.iter().any(|m| m == "static"),
        calls_base: initializer.starts_with("base"),
        calls_this: initializer.starts_with("this"),
        documentation: get_documentation(node, source),
        line: node.start_position().row + 1,
    }
}

fn extract_base_list(node: &Node, source: &[u8]) -> (Vec<String>, Vec<String>) {
    let mut base_types = Vec::new();
    let mut interfaces = Vec::new();
    if let Some(list) = children(node).find(|c| c.kind() == "base_list") {
        for entry in children(&list).filter(|c| c.is_named()) {
            let name = text(&entry, source);
            if heuristics::is_interface_name(&name) {
                interfaces.push(name);
            } else {
                base_types.push(name);
            }
        }
    }
    (base_types, interfaces)
}

fn build_class(node: &Node, source: &[u8], namespace: &str) -> Option<ClassInfo> {
    let name = get_name(node, source)?;
    let is_interface = node.kind() == "interface_declaration";
    let modifiers = get_modifiers(node, source);
    let has = |m: &str| modifiers.iter().any(|x| x == m);
    let attributes = extract_attributes(node, source);
    let (base_types, interfaces) = extract_base_list(node, source);

    // Interface members are implicitly public.
    let member_default = if is_interface {
        AccessModifier::Public
    } else {
        AccessModifier::Private
    };

    let mut methods = Vec::new();
    let mut properties = Vec::new();
    let mut constructors = Vec::new();
    if let Some(body) = node.child_by_field_name("body") {
        for member in children(&body) {
            match member.kind() {
                "method_declaration" => methods.extend(build_method(&member, source, member_default)),
                "property_declaration" => {
                    properties.extend(build_property(&member, source, member_default))
                }
                "constructor_declaration" => constructors.push(build_constructor(&member, source)),
                _ => {}
            }
        }
    }

    Some(ClassInfo {
        full_name: if namespace.is_empty() {
            name.clone()
        } else {
            format!("{namespace}.{name}")
        },
        namespace: namespace.to_string(),
        access_modifier: access_modifier(&modifiers, AccessModifier::Internal),
        is_abstract: has("abstract"),
        is_sealed: has("sealed"),
        is_static: has("static"),
        is_interface,
        is_controller: heuristics::is_controller(&name, &base_types, &attributes),
        is_service: heuristics::is_service(&name),
        is_repository: heuristics::is_repository(&name),
        base_types,
        interfaces,
        attributes,
        methods,
        properties,
        constructors,
        line: node.start_position().row + 1,
        name,
    })
}

/// Pre-order walk collecting class and interface declarations, nested ones included.
fn walk_types(node: &Node, source: &[u8], namespace: &str, classes: &mut Vec<ClassInfo>) {
    for child in children(node) {
        if matches!(child.kind(), "class_declaration" | "interface_declaration") {
            classes.extend(build_class(&child, source, namespace));
        }
        if child.child_count() > 0 {
            walk_types(&child, source, namespace, classes);
        }
    }
}

fn find_namespace(node: &Node, source: &[u8]) -> Option<String> {
    for child in children(node) {
        if matches!(
            child.kind(),
            "namespace_declaration" | "file_scoped_namespace_declaration"
        ) {
            if let Some(name) = child.child_by_field_name("name") {
                return Some(text(&name, source));
            }
        }
        if let Some(found) = find_namespace(&child, source) {
            return Some(found);
        }
    }
    None
}

fn collect_usings(node: &Node, source: &[u8], usings: &mut Vec<String>) {
    for child in children(node) {
        if child.kind() == "using_directive" {
            // The imported name is the last name-like child; for aliases the first is the alias.
            let target = children(&child)
                .filter(|c| {
                    matches!(
                        c.kind(),
                        "identifier" | "qualified_name" | "generic_name" | "alias_qualified_name"
                    )
                })
                .last();
            if let Some(t) = target {
                let name = text(&t, source);
                if !name.is_empty() {
                    usings.push(name);
                }
            }
        } else if matches!(
            child.kind(),
            "namespace_declaration" | "file_scoped_namespace_declaration" | "declaration_list"
        ) {
            collect_usings(&child, source, usings);
        }
    }
}

/// One dependency per constructor parameter that looks injectable.
fn extract_dependencies(classes: &[ClassInfo]) -> Vec<DependencyInfo> {
    let mut dependencies: Vec<DependencyInfo> = Vec::new();
    for class in classes.iter().filter(|c| !c.is_interface) {
        for ctor in &class.constructors {
            for param in &ctor.parameters {
                if !heuristics::is_dependency_type(&param.param_type) {
                    continue;
                }
                let duplicate = dependencies.iter().any(|d| {
                    d.owner == class.name
                        && d.name == param.name
                        && d.dependency_type == param.param_type
                });
                if duplicate {
                    continue;
                }
                dependencies.push(DependencyInfo {
                    name: param.name.clone(),
                    dependency_type: param.param_type.clone(),
                    interface_type: heuristics::is_interface_name(&param.param_type)
                        .then(|| param.param_type.clone()),
                    is_injected: true,
                    lifetime: heuristics::guess_lifetime(&param.param_type),
                    requires_mock: true,
                    owner: class.name.clone(),
                });
            }
        }
    }
    dependencies
}

pub struct CSharpAnalyser;

impl Default for CSharpAnalyser {
    fn default() -> Self {
        Self
    }
}

impl CSharpAnalyser {
    pub fn new() -> Self {
        Self
    }

    fn get_language(&self) -> Language {
        tree_sitter_c_sharp::LANGUAGE.into()
    }
}

impl CodeAnalyser for CSharpAnalyser {
    fn extensions(&self) -> &[&str] {
        &["cs"]
    }

    fn language_name(&self) -> &str {
        "C#"
    }

    fn file_type(&self) -> &str {
        "csharp"
    }

    fn analyze_source(&self, source: &str, path: &Path) -> Result<AnalysisResult, AnalysisError> {
        let mut parser = Parser::new();
        parser.set_language(&self.get_language())?;
        let tree = parser.parse(source, None).ok_or_else(|| AnalysisError::Parse {
            path: path.to_path_buf(),
        })?;
        let root = tree.root_node();
        let bytes = source.as_bytes();

        let mut result = AnalysisResult::new(path, self.file_type());
        if root.has_error() {
            warn!("Syntax errors in {}; analysing recovered tree", path.display());
        }
        result
            .metadata
            .insert("has_syntax_errors".to_string(), root.has_error().into());
        result
            .metadata
            .insert("language".to_string(), self.language_name().into());
        result
            .metadata
            .insert("line_count".to_string(), source.lines().count().into());

        result.namespace = find_namespace(&root, bytes).unwrap_or_default();
        collect_usings(&root, bytes, &mut result.usings);
        walk_types(&root, bytes, &result.namespace.clone(), &mut result.classes);

        result.methods = result
            .classes
            .iter()
            .flat_map(|c| c.methods.iter().cloned())
            .collect();
        result.properties = result
            .classes
            .iter()
            .flat_map(|c| c.properties.iter().cloned())
            .collect();
        result.dependencies = extract_dependencies(&result.classes);

        debug!(
            "Analysed {}: {} classes, {} methods",
            path.display(),
            result.classes.len(),
            result.methods.len()
        );
        Ok(result)
    }
}

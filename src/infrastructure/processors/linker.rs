//! Turns ES modules into registry functions and renders them as one ES module.
//!
//! Every module becomes `function(__exports, __require) { … }`. Static imports
//! are hoisted to the top of that function as `__require` calls and every
//! reference to an imported binding reads through the required module.
//! Exports become getters on `__exports`, so bindings stay live across
//! modules and import cycles, and the bundle ends by requiring the entry and
//! re-exporting its bindings.

use crate::utils::{Diagnostic, Location};
use oxc_allocator::Allocator;
use oxc_ast::ast::{
    BindingPatternKind, Declaration, ExportDefaultDeclarationKind, Expression, ImportDeclarationSpecifier,
    ModuleExportName, Statement,
};
use oxc_ast::AstKind;
use oxc_diagnostics::OxcDiagnostic;
use oxc_parser::Parser;
use oxc_semantic::SemanticBuilder;
use oxc_span::{GetSpan, SourceType};
use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;

const RUNTIME: &str = r#"var __cache = {};
function __require(id) {
  var cached = __cache[id];
  if (cached) return cached.exports;
  var module = __cache[id] = { exports: {} };
  var factory = __modules[id];
  factory(module.exports, __require);
  return module.exports;
}
"#;

/// A static dependency of a module, in source order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRecord {
    pub specifier: String,
    pub offset: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Code(String),
    /// Placeholder for the id of the module `imports[n]` resolves to
    Require(usize),
}

/// A module rewritten for the registry, independent of how its imports resolve
#[derive(Debug, Clone, Default)]
pub struct ModuleRecord {
    pub segments: Vec<Segment>,
    pub imports: Vec<ImportRecord>,
    /// Names the module exports, `default` included
    pub exports: Vec<String>,
    pub has_star_exports: bool,
}

impl ModuleRecord {
    /// Registry function body for a module whose only export is `default`
    pub fn default_export(expression: String) -> Self {
        Self {
            segments: vec![Segment::Code(format!("__exports.default = {};\n", expression))],
            exports: vec!["default".to_string()],
            ..Default::default()
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Render the function body, mapping each import to a module id
    fn render(&self, module_ids: &[String], out: &mut String) {
        for segment in &self.segments {
            match segment {
                Segment::Code(code) => out.push_str(code),
                Segment::Require(index) => {
                    let id = module_ids.get(*index).map(String::as_str).unwrap_or_default();
                    out.push_str(&json_string(id));
                }
            }
        }
    }
}

/// One module of the bundle, ready to render
pub struct LinkedModule<'a> {
    pub id: String,
    pub record: &'a ModuleRecord,
    /// Module id for every entry of `record.imports`
    pub dependency_ids: Vec<String>,
}

struct Edit {
    start: u32,
    end: u32,
    text: String,
}

/// Rewrite one ES module for the registry
pub fn analyze_module(filename: &str, source: &str) -> Result<ModuleRecord, Vec<Diagnostic>> {
    let allocator = Allocator::default();
    let parsed = Parser::new(&allocator, source, SourceType::mjs()).parse();

    if !parsed.errors.is_empty() {
        return Err(diagnostics_from_oxc(&parsed.errors, filename, source));
    }
    if parsed.panicked {
        return Err(vec![Diagnostic::located(
            Location::new(filename, 1, 0),
            "failed to parse module",
        )]);
    }

    let semantic = SemanticBuilder::new().build(&parsed.program).semantic;
    let scoping = semantic.scoping();
    let nodes = semantic.nodes();

    // identifier positions whose rewrite needs more than a plain substitution
    let mut shorthand_values = HashSet::new();
    let mut callees = HashSet::new();
    for node in nodes.iter() {
        match node.kind() {
            AstKind::ObjectProperty(property) if property.shorthand => {
                shorthand_values.insert(property.value.span().start);
            }
            AstKind::CallExpression(call) => {
                if let Expression::Identifier(ident) = &call.callee {
                    callees.insert(ident.span.start);
                }
            }
            _ => {}
        }
    }

    let mut imports: Vec<ImportRecord> = Vec::new();
    let mut bindings = Vec::new();
    let mut edits: Vec<Edit> = Vec::new();
    let mut hoisted = String::new();
    let mut getters: Vec<(String, String)> = Vec::new();
    let mut hoisted_segments: Vec<Segment> = Vec::new();
    let mut has_star_exports = false;

    // `const __iN = __require(<id of import N>);`
    let mut require = |specifier: &str, offset: u32, hoisted_segments: &mut Vec<Segment>, hoisted: &mut String| {
        let index = imports.len();
        imports.push(ImportRecord {
            specifier: specifier.to_string(),
            offset,
        });
        hoisted.push_str(&format!("const __i{} = __require(", index));
        hoisted_segments.push(Segment::Code(std::mem::take(hoisted)));
        hoisted_segments.push(Segment::Require(index));
        hoisted.push_str(");\n");
        format!("__i{}", index)
    };

    for statement in &parsed.program.body {
        match statement {
            Statement::ImportDeclaration(decl) => {
                let binding = require(&decl.source.value, decl.span.start, &mut hoisted_segments, &mut hoisted);
                if let Some(specifiers) = &decl.specifiers {
                    for specifier in specifiers {
                        match specifier {
                            ImportDeclarationSpecifier::ImportDefaultSpecifier(default) => {
                                bindings.push((&default.local, format!("{}.default", binding)));
                            }
                            ImportDeclarationSpecifier::ImportNamespaceSpecifier(namespace) => {
                                bindings.push((&namespace.local, binding.clone()));
                            }
                            ImportDeclarationSpecifier::ImportSpecifier(named) => {
                                bindings.push((&named.local, member(&binding, &export_name(&named.imported))));
                            }
                        }
                    }
                }
                edits.push(Edit {
                    start: decl.span.start,
                    end: decl.span.end,
                    text: String::new(),
                });
            }
            Statement::ExportNamedDeclaration(decl) => {
                if let Some(source_literal) = &decl.source {
                    let binding = require(&source_literal.value, decl.span.start, &mut hoisted_segments, &mut hoisted);
                    for specifier in &decl.specifiers {
                        getters.push((
                            export_name(&specifier.exported),
                            format!("{}[{}]", binding, json_string(&export_name(&specifier.local))),
                        ));
                    }
                    edits.push(Edit {
                        start: decl.span.start,
                        end: decl.span.end,
                        text: String::new(),
                    });
                } else if let Some(declaration) = &decl.declaration {
                    for name in declared_names(declaration) {
                        getters.push((name.clone(), name));
                    }
                    // drop the `export` keyword, keep the declaration
                    edits.push(Edit {
                        start: decl.span.start,
                        end: declaration.span().start,
                        text: String::new(),
                    });
                } else {
                    for specifier in &decl.specifiers {
                        getters.push((export_name(&specifier.exported), export_name(&specifier.local)));
                    }
                    edits.push(Edit {
                        start: decl.span.start,
                        end: decl.span.end,
                        text: String::new(),
                    });
                }
            }
            Statement::ExportDefaultDeclaration(decl) => {
                let named = match &decl.declaration {
                    ExportDefaultDeclarationKind::FunctionDeclaration(function) => {
                        function.id.as_ref().map(|id| id.name.to_string())
                    }
                    ExportDefaultDeclarationKind::ClassDeclaration(class) => {
                        class.id.as_ref().map(|id| id.name.to_string())
                    }
                    _ => None,
                };
                let declaration_start = decl.declaration.span().start;
                match named {
                    Some(name) => {
                        getters.push(("default".to_string(), name));
                        edits.push(Edit {
                            start: decl.span.start,
                            end: declaration_start,
                            text: String::new(),
                        });
                    }
                    None => {
                        getters.push(("default".to_string(), "__default".to_string()));
                        edits.push(Edit {
                            start: decl.span.start,
                            end: declaration_start,
                            text: "const __default = ".to_string(),
                        });
                        edits.push(Edit {
                            start: decl.span.end,
                            end: decl.span.end,
                            text: ";".to_string(),
                        });
                    }
                }
            }
            Statement::ExportAllDeclaration(decl) => {
                let binding = require(&decl.source.value, decl.span.start, &mut hoisted_segments, &mut hoisted);
                match &decl.exported {
                    Some(exported) => getters.push((export_name(exported), binding)),
                    None => {
                        has_star_exports = true;
                        let _ = writeln!(hoisted, "__reexport(__exports, {});", binding);
                    }
                }
                edits.push(Edit {
                    start: decl.span.start,
                    end: decl.span.end,
                    text: String::new(),
                });
            }
            _ => {}
        }
    }

    // imported bindings read through the required module on every access
    let mut imported_locals = HashMap::new();
    for (local, access) in bindings {
        if let Some(symbol_id) = local.symbol_id.get() {
            for &reference_id in scoping.get_resolved_reference_ids(symbol_id) {
                let node_id = scoping.get_reference(reference_id).node_id();
                let span = nodes.get_node(node_id).kind().span();
                let text = if shorthand_values.contains(&span.start) {
                    format!("{}: {}", local.name, access)
                } else if callees.contains(&span.start) {
                    format!("(0, {})", access)
                } else {
                    access.clone()
                };
                edits.push(Edit {
                    start: span.start,
                    end: span.end,
                    text,
                });
            }
        }
        imported_locals.insert(local.name.to_string(), access);
    }

    let mut segments = Vec::new();
    if !getters.is_empty() {
        let mut export_block = String::from("__export(__exports, {\n");
        for (exported, local) in &getters {
            let local = imported_locals.get(local).unwrap_or(local);
            let _ = writeln!(export_block, "  {}: () => {},", json_string(exported), local);
        }
        export_block.push_str("});\n");
        segments.push(Segment::Code(export_block));
    }
    segments.extend(hoisted_segments);
    if !hoisted.is_empty() {
        segments.push(Segment::Code(hoisted));
    }
    segments.push(Segment::Code(apply_edits(source, edits)));

    Ok(ModuleRecord {
        segments,
        exports: getters.into_iter().map(|(exported, _)| exported).collect(),
        imports,
        has_star_exports,
    })
}

/// Render linked modules as a single ES module whose exports are the entry's
pub fn render_bundle(modules: &[LinkedModule<'_>], entry: &LinkedModule<'_>) -> String {
    let mut out = String::from("var __modules = {\n");
    for module in modules {
        let _ = writeln!(out, "{}: function(__exports, __require) {{", json_string(&module.id));
        module.record.render(&module.dependency_ids, &mut out);
        out.push_str("\n},\n");
    }
    out.push_str("};\n");
    out.push_str(RUNTIME);

    if modules.iter().any(|m| !m.record.exports.is_empty()) {
        out.push_str(
            "function __export(target, getters) {\n  for (var name in getters) Object.defineProperty(target, name, { enumerable: true, get: getters[name] });\n}\n",
        );
    }
    if modules.iter().any(|m| m.record.has_star_exports) {
        out.push_str(
            "function __reexport(target, source) {\n  Object.keys(source).forEach(function(name) {\n    if (name !== \"default\" && !Object.prototype.hasOwnProperty.call(target, name)) Object.defineProperty(target, name, { enumerable: true, get: function() { return source[name]; } });\n  });\n}\n",
        );
    }

    let _ = writeln!(out, "var __entry = __require({});", json_string(&entry.id));

    let named: Vec<&String> = entry
        .record
        .exports
        .iter()
        .filter(|name| name.as_str() != "default" && is_identifier(name))
        .collect();
    if !named.is_empty() {
        let _ = writeln!(
            out,
            "export const {{ {} }} = __entry;",
            named.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")
        );
    }
    if entry.record.exports.iter().any(|name| name == "default") {
        out.push_str("export default __entry.default;\n");
    }

    out
}

/// Convert oxc parser errors into located diagnostics
pub fn diagnostics_from_oxc(errors: &[OxcDiagnostic], filename: &str, source: &str) -> Vec<Diagnostic> {
    errors
        .iter()
        .map(|error| {
            let offset = error
                .labels
                .as_ref()
                .and_then(|labels| labels.first())
                .map(|label| label.offset() as u32);
            match offset {
                Some(offset) => Diagnostic::located(
                    Location::from_offset(filename, source, offset),
                    error.message.to_string(),
                ),
                None => Diagnostic::new(format!("{}: {}", filename, error.message)),
            }
        })
        .collect()
}

fn declared_names(declaration: &Declaration<'_>) -> Vec<String> {
    match declaration {
        Declaration::VariableDeclaration(variable) => variable
            .declarations
            .iter()
            .flat_map(|declarator| binding_names(&declarator.id.kind))
            .collect(),
        Declaration::FunctionDeclaration(function) => {
            function.id.iter().map(|id| id.name.to_string()).collect()
        }
        Declaration::ClassDeclaration(class) => class.id.iter().map(|id| id.name.to_string()).collect(),
        _ => Vec::new(),
    }
}

fn binding_names(kind: &BindingPatternKind<'_>) -> Vec<String> {
    match kind {
        BindingPatternKind::BindingIdentifier(ident) => vec![ident.name.to_string()],
        BindingPatternKind::ObjectPattern(object) => {
            let mut names: Vec<String> = object
                .properties
                .iter()
                .flat_map(|property| binding_names(&property.value.kind))
                .collect();
            if let Some(rest) = &object.rest {
                names.extend(binding_names(&rest.argument.kind));
            }
            names
        }
        BindingPatternKind::ArrayPattern(array) => {
            let mut names: Vec<String> = array
                .elements
                .iter()
                .flatten()
                .flat_map(|element| binding_names(&element.kind))
                .collect();
            if let Some(rest) = &array.rest {
                names.extend(binding_names(&rest.argument.kind));
            }
            names
        }
        BindingPatternKind::AssignmentPattern(assignment) => binding_names(&assignment.left.kind),
    }
}

/// Property read of `name` on `object`
fn member(object: &str, name: &str) -> String {
    if is_identifier(name) {
        format!("{}.{}", object, name)
    } else {
        format!("{}[{}]", object, json_string(name))
    }
}

fn export_name(name: &ModuleExportName<'_>) -> String {
    match name {
        ModuleExportName::IdentifierName(ident) => ident.name.to_string(),
        ModuleExportName::IdentifierReference(ident) => ident.name.to_string(),
        ModuleExportName::StringLiteral(lit) => lit.value.to_string(),
    }
}

fn apply_edits(source: &str, mut edits: Vec<Edit>) -> String {
    edits.sort_by_key(|edit| (edit.start, edit.end));
    let mut out = String::with_capacity(source.len());
    let mut cursor = 0usize;
    for edit in edits {
        let start = edit.start as usize;
        let end = edit.end as usize;
        if start < cursor {
            continue;
        }
        out.push_str(&source[cursor..start]);
        out.push_str(&edit.text);
        cursor = end;
    }
    out.push_str(&source[cursor..]);
    out
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c == '_' || c == '$' || c.is_alphabetic())
        && chars.all(|c| c == '_' || c == '$' || c.is_alphanumeric())
}

fn json_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("\"{}\"", value))
}

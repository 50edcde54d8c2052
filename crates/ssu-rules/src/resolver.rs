//! Receiver type resolution
//!
//! A small inference: enough to type the receivers Silverstripe
//! code usually calls framework methods on (`$this`, typed parameters and
//! properties, `new Foo`, `Foo::create()`). Anything else is unresolved.

use std::collections::HashMap;

use mago_span::{HasSpan, Span};
use mago_syntax::ast::*;
use ssu_core::InferredType;

use crate::names::NameContext;
use crate::symbols::ClassIndex;

/// Injectable-style factories returning an instance of the called class
const FACTORY_METHODS: &[&str] = &["create", "singleton"];

/// Class name given to `new class {}` without a parent
pub(crate) const ANONYMOUS_CLASS: &str = "class@anonymous";

/// The class-like whose body is being traversed
#[derive(Debug, Clone)]
pub struct ClassContext {
    pub name: String,
    pub parent: Option<String>,
}

/// Variable types of one function or method body
#[derive(Debug, Clone, Default)]
pub struct TypeScope {
    variables: HashMap<String, InferredType>,
}

impl TypeScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a variable; the name may include the leading `$`
    pub fn set(&mut self, name: &str, ty: InferredType) {
        self.variables.insert(name.trim_start_matches('$').to_string(), ty);
    }

    pub fn get(&self, name: &str) -> Option<&InferredType> {
        self.variables.get(name.trim_start_matches('$'))
    }
}

pub(crate) fn span_text(source: &str, span: Span) -> &str {
    &source[span.start.offset as usize..span.end.offset as usize]
}

fn scalar_type(lower: &str) -> Option<InferredType> {
    let ty = match lower {
        "object" => InferredType::ObjectWithoutClass,
        "mixed" => InferredType::Unresolved,
        "never" => InferredType::Never,
        "int" | "integer" | "float" | "double" | "string" | "bool" | "boolean" | "true"
        | "false" | "null" | "void" | "array" | "iterable" | "callable" | "resource" => {
            InferredType::Scalar(lower.to_string())
        }
        _ => return None,
    };
    Some(ty)
}

/// Resolves expressions to receiver types at one point of a file
pub struct Resolver<'r> {
    pub index: &'r ClassIndex,
    pub source: &'r str,
    pub names: &'r NameContext,
    pub class: Option<&'r ClassContext>,
    pub scope: Option<&'r TypeScope>,
}

impl<'r> Resolver<'r> {
    fn text(&self, span: Span) -> &'r str {
        span_text(self.source, span)
    }

    /// Resolve a class name as written, honoring `self`, `static` and `parent`
    pub fn class_reference(&self, written: &str) -> Option<String> {
        match written.to_ascii_lowercase().as_str() {
            "self" | "static" => self.class.map(|c| c.name.clone()),
            "parent" => self.class.and_then(|c| c.parent.clone()),
            _ => Some(self.names.resolve(written)),
        }
    }

    /// Type described by a declared hint
    pub fn hint_type(&self, hint: &Hint<'_>) -> InferredType {
        match hint {
            Hint::Identifier(ident) => {
                let written = self.text(ident.span());
                let lower = written.to_ascii_lowercase();
                if let Some(ty) = scalar_type(&lower) {
                    return ty;
                }
                self.class_reference(written)
                    .map(InferredType::Object)
                    .unwrap_or(InferredType::Unresolved)
            }
            Hint::Nullable(nullable) => InferredType::union(vec![
                self.hint_type(&nullable.hint),
                InferredType::Scalar("null".into()),
            ]),
            Hint::Union(union) => {
                InferredType::union(vec![self.hint_type(&union.left), self.hint_type(&union.right)])
            }
            Hint::Parenthesized(paren) => self.hint_type(&paren.hint),
            other => {
                let lower = self.text(other.span()).trim().to_ascii_lowercase();
                match lower.as_str() {
                    "self" | "static" | "parent" => self
                        .class_reference(&lower)
                        .map(InferredType::Object)
                        .unwrap_or(InferredType::Unresolved),
                    _ => scalar_type(&lower).unwrap_or(InferredType::Unresolved),
                }
            }
        }
    }

    /// Class named by the class part of a static call or instantiation
    ///
    /// `None` for computed class expressions (`$class::run()`).
    pub fn static_class(&self, class_expr: &Expression<'_>) -> Option<String> {
        match class_expr {
            Expression::Identifier(ident) => self.class_reference(self.text(ident.span())),
            Expression::Parenthesized(_) | Expression::Variable(_) => None,
            other => {
                let written = self.text(other.span()).trim();
                match written.to_ascii_lowercase().as_str() {
                    "self" | "static" | "parent" => self.class_reference(written),
                    _ => None,
                }
            }
        }
    }

    /// Inferred type of a receiver expression
    pub fn resolve(&self, expr: &Expression<'_>) -> InferredType {
        match expr {
            Expression::Variable(Variable::Direct(var)) => {
                if var.name.trim_start_matches('$') == "this" {
                    return self
                        .class
                        .map(|c| InferredType::object(c.name.clone()))
                        .unwrap_or(InferredType::Unresolved);
                }
                self.scope
                    .and_then(|scope| scope.get(var.name))
                    .cloned()
                    .unwrap_or(InferredType::Unresolved)
            }
            Expression::Parenthesized(paren) => self.resolve(&paren.expression),
            Expression::Assignment(assign) => self.resolve(&assign.rhs),
            Expression::Clone(clone) => self.resolve(&clone.object),
            Expression::Instantiation(inst) => self
                .static_class(&inst.class)
                .map(InferredType::Object)
                .unwrap_or(InferredType::Unresolved),
            Expression::AnonymousClass(class) => class
                .extends
                .as_ref()
                .and_then(|extends| extends.types.first())
                .map(|parent| InferredType::Object(self.names.resolve(self.text(parent.span()))))
                .unwrap_or_else(|| InferredType::object(ANONYMOUS_CLASS)),
            Expression::Call(Call::StaticMethod(call)) => {
                let ClassLikeMemberSelector::Identifier(method) = &call.method else {
                    return InferredType::Unresolved;
                };
                if !FACTORY_METHODS
                    .iter()
                    .any(|f| method.value.eq_ignore_ascii_case(f))
                {
                    return InferredType::Unresolved;
                }
                self.static_class(&call.class)
                    .map(InferredType::Object)
                    .unwrap_or(InferredType::Unresolved)
            }
            Expression::Access(Access::Property(access)) => {
                let ClassLikeMemberSelector::Identifier(property) = &access.property else {
                    return InferredType::Unresolved;
                };
                let owners = self.resolve(&access.object);
                let found: Vec<InferredType> = owners
                    .class_names()
                    .into_iter()
                    .filter_map(|owner| self.index.property_type(owner, property.value).cloned())
                    .collect();
                if found.is_empty() {
                    InferredType::Unresolved
                } else {
                    InferredType::union(found)
                }
            }
            Expression::Conditional(ternary) => {
                let then = match &ternary.then {
                    Some(then) => self.resolve(then),
                    None => self.resolve(&ternary.condition),
                };
                let otherwise = self.resolve(&ternary.r#else);
                if then.is_unknown() || otherwise.is_unknown() {
                    InferredType::Unresolved
                } else {
                    InferredType::union(vec![then, otherwise])
                }
            }
            Expression::Literal(literal) => {
                let name = match literal {
                    Literal::String(_) => "string",
                    Literal::Integer(_) => "int",
                    Literal::Float(_) => "float",
                    Literal::True(_) | Literal::False(_) => "bool",
                    Literal::Null(_) => "null",
                };
                InferredType::Scalar(name.to_string())
            }
            Expression::Array(_) => InferredType::Scalar("array".into()),
            _ => InferredType::Unresolved,
        }
    }
}

/// Parse `@var Type $name` tags of an inline docblock
pub fn var_tags(docblock: &str) -> Vec<(String, String)> {
    let mut tags = Vec::new();
    for line in docblock.lines() {
        let Some(rest) = line.split("@var").nth(1) else {
            continue;
        };
        let mut parts = rest.split_whitespace();
        let (Some(ty), Some(var)) = (parts.next(), parts.next()) else {
            continue;
        };
        if let Some(var) = var.strip_prefix('$') {
            let var = var.trim_end_matches("*/");
            tags.push((ty.to_string(), var.to_string()));
        }
    }
    tags
}

impl Resolver<'_> {
    /// Type written in a docblock, e.g. `?Foo`, `Foo|null`, `\Bar\Baz`
    pub fn doc_type(&self, written: &str) -> InferredType {
        let (nullable, written) = match written.strip_prefix('?') {
            Some(rest) => (true, rest),
            None => (false, written),
        };
        let mut members: Vec<InferredType> = written
            .split('|')
            .map(|part| {
                let part = part.trim();
                let lower = part.to_ascii_lowercase();
                if let Some(ty) = scalar_type(&lower) {
                    return ty;
                }
                let base = part.split('<').next().unwrap_or(part);
                if base.ends_with("[]") {
                    return InferredType::Scalar("array".into());
                }
                self.class_reference(base)
                    .map(InferredType::Object)
                    .unwrap_or(InferredType::Unresolved)
            })
            .collect();
        if nullable {
            members.push(InferredType::Scalar("null".into()));
        }
        InferredType::union(members)
    }
}

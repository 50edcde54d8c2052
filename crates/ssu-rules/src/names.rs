//! Class name resolution through namespaces and `use` imports

use std::collections::HashMap;

use mago_span::HasSpan;
use mago_syntax::ast::*;

/// Namespace and import table in effect at a point of a file
#[derive(Debug, Clone, Default)]
pub struct NameContext {
    namespace: Option<String>,
    /// Lowercased alias -> fully qualified name
    imports: HashMap<String, String>,
}

impl NameContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter a namespace; imports of the previous namespace are forgotten
    pub fn set_namespace(&mut self, namespace: Option<String>) {
        self.namespace = namespace.filter(|ns| !ns.is_empty());
        self.imports.clear();
    }

    pub fn add_import(&mut self, alias: &str, fqn: &str) {
        self.imports
            .insert(alias.to_ascii_lowercase(), fqn.trim_start_matches('\\').to_string());
    }

    /// Fully qualified name for a class declared in the current namespace
    pub fn declare(&self, short_name: &str) -> String {
        match &self.namespace {
            Some(ns) => format!("{}\\{}", ns, short_name),
            None => short_name.to_string(),
        }
    }

    /// Resolve a class reference as written in source
    pub fn resolve(&self, name: &str) -> String {
        if let Some(fqn) = name.strip_prefix('\\') {
            return fqn.to_string();
        }

        if let Some(rest) = name.strip_prefix("namespace\\") {
            return self.declare(rest);
        }

        let (first, rest) = match name.split_once('\\') {
            Some((first, rest)) => (first, Some(rest)),
            None => (name, None),
        };

        if let Some(fqn) = self.imports.get(&first.to_ascii_lowercase()) {
            return match rest {
                Some(rest) => format!("{}\\{}", fqn, rest),
                None => fqn.clone(),
            };
        }

        self.declare(name)
    }

    /// Record the class imports of a `use` statement
    pub fn add_use_statement(&mut self, use_stmt: &Use<'_>, source: &str) {
        let text = |span: mago_span::Span| -> String {
            source[span.start.offset as usize..span.end.offset as usize].to_string()
        };

        match &use_stmt.items {
            UseItems::Sequence(seq) => {
                for item in seq.items.iter() {
                    self.add_use_item(item, None, &text);
                }
            }
            UseItems::TypedSequence(typed_seq) => {
                if typed_seq.r#type.is_function() || typed_seq.r#type.is_const() {
                    return;
                }
                for item in typed_seq.items.iter() {
                    self.add_use_item(item, None, &text);
                }
            }
            UseItems::TypedList(typed_list) => {
                if typed_list.r#type.is_function() || typed_list.r#type.is_const() {
                    return;
                }
                let prefix = text(typed_list.namespace.span());
                for item in typed_list.items.iter() {
                    self.add_use_item(item, Some(&prefix), &text);
                }
            }
            UseItems::MixedList(mixed_list) => {
                let prefix = text(mixed_list.namespace.span());
                for maybe_typed in mixed_list.items.iter() {
                    if let Some(use_type) = &maybe_typed.r#type {
                        if use_type.is_function() || use_type.is_const() {
                            continue;
                        }
                    }
                    self.add_use_item(&maybe_typed.item, Some(&prefix), &text);
                }
            }
        }
    }

    fn add_use_item(
        &mut self,
        item: &UseItem<'_>,
        prefix: Option<&str>,
        text: &dyn Fn(mago_span::Span) -> String,
    ) {
        let name = text(item.name.span());
        let fqn = match prefix {
            Some(prefix) => format!("{}\\{}", prefix.trim_end_matches('\\'), name),
            None => name,
        };
        let alias = match &item.alias {
            // `as Alias`
            Some(alias) => text(alias.span())
                .split_whitespace()
                .last()
                .unwrap_or_default()
                .to_string(),
            None => fqn.rsplit('\\').next().unwrap_or(&fqn).to_string(),
        };
        self.add_import(&alias, &fqn);
    }
}

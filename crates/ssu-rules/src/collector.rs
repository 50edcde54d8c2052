//! Class collection pass feeding the [`ClassIndex`]

use mago_span::HasSpan;
use mago_syntax::ast::*;
use ssu_core::{visit, InferredType, Visitor};

use crate::names::NameContext;
use crate::resolver::{span_text, ClassContext, Resolver};
use crate::symbols::{ClassIndex, ClassInfo};

/// Collect every class-like declared in a parsed file
pub fn collect_classes<'a>(program: &Program<'a>, source: &str) -> Vec<ClassInfo> {
    let mut collector = ClassCollector {
        source,
        names: NameContext::new(),
        classes: Vec::new(),
    };
    visit(&mut collector, program, source);
    collector.classes
}

struct ClassCollector<'s> {
    source: &'s str,
    names: NameContext,
    classes: Vec<ClassInfo>,
}

impl<'s> ClassCollector<'s> {
    fn text(&self, span: mago_span::Span) -> &'s str {
        span_text(self.source, span)
    }

    fn resolve(&self, span: mago_span::Span) -> String {
        self.names.resolve(self.text(span))
    }

    fn collect_members(&self, info: &mut ClassInfo, members: &Sequence<'_, ClassLikeMember<'_>>) {
        let empty = ClassIndex::new();
        let context = ClassContext {
            name: info.full_name.clone(),
            parent: info.parent.clone(),
        };
        let resolver = Resolver {
            index: &empty,
            source: self.source,
            names: &self.names,
            class: Some(&context),
            scope: None,
        };

        for member in members.iter() {
            match member {
                ClassLikeMember::Method(method) => {
                    // Promoted constructor parameters are properties too
                    if method.name.value.eq_ignore_ascii_case("__construct") {
                        for param in method.parameter_list.parameters.iter() {
                            if param.modifiers.is_empty() {
                                continue;
                            }
                            if let Some(hint) = &param.hint {
                                add_property(info, param.variable.name, resolver.hint_type(hint));
                            }
                        }
                    }
                }
                ClassLikeMember::TraitUse(trait_use) => {
                    for name in trait_use.trait_names.iter() {
                        info.traits.push(self.resolve(name.span()));
                    }
                }
                ClassLikeMember::Property(Property::Plain(prop)) => {
                    let Some(hint) = &prop.hint else {
                        continue;
                    };
                    let ty = resolver.hint_type(hint);
                    for item in prop.items.nodes.iter() {
                        let name = match item {
                            PropertyItem::Abstract(abs) => abs.variable.name,
                            PropertyItem::Concrete(concrete) => concrete.variable.name,
                        };
                        add_property(info, name, ty.clone());
                    }
                }
                _ => {}
            }
        }
    }
}

fn add_property(info: &mut ClassInfo, name: &str, ty: InferredType) {
    if ty.class_names().is_empty() {
        return;
    }
    info.properties.insert(name.trim_start_matches('$').to_string(), ty);
}

impl<'a> Visitor<'a> for ClassCollector<'_> {
    fn visit_statement(&mut self, stmt: &Statement<'a>, _source: &str) -> bool {
        match stmt {
            Statement::Namespace(ns) => {
                let name = ns.name.as_ref().map(|n| self.text(n.span()).to_string());
                self.names.set_namespace(name);
                true
            }
            Statement::Use(use_stmt) => {
                self.names.add_use_statement(use_stmt, self.source);
                false
            }
            Statement::Class(class) => {
                let mut info = ClassInfo::new(self.names.declare(class.name.value));
                if let Some(extends) = &class.extends {
                    info.parent = extends.types.first().map(|parent| self.resolve(parent.span()));
                }
                if let Some(implements) = &class.implements {
                    info.interfaces = implements.types.iter().map(|i| self.resolve(i.span())).collect();
                }
                self.collect_members(&mut info, &class.members);
                self.classes.push(info);
                true
            }
            Statement::Interface(iface) => {
                let mut info = ClassInfo::new(self.names.declare(iface.name.value));
                if let Some(extends) = &iface.extends {
                    info.interfaces = extends.types.iter().map(|i| self.resolve(i.span())).collect();
                }
                self.collect_members(&mut info, &iface.members);
                self.classes.push(info);
                true
            }
            Statement::Trait(tr) => {
                let mut info = ClassInfo::new(self.names.declare(tr.name.value));
                self.collect_members(&mut info, &tr.members);
                self.classes.push(info);
                true
            }
            Statement::Enum(en) => {
                let mut info = ClassInfo::new(self.names.declare(en.name.value));
                if let Some(implements) = &en.implements {
                    info.interfaces = implements.types.iter().map(|i| self.resolve(i.span())).collect();
                }
                self.collect_members(&mut info, &en.members);
                self.classes.push(info);
                true
            }
            _ => true,
        }
    }

    fn leave_statement(&mut self, stmt: &Statement<'a>, _source: &str) {
        if let Statement::Namespace(ns) = stmt {
            if matches!(ns.body, NamespaceBody::BraceDelimited(_)) {
                self.names.set_namespace(None);
            }
        }
    }

    fn visit_method(&mut self, _method: &Method<'a>, _source: &str) -> bool {
        false
    }

    // Anonymous classes have no name to index under
    fn visit_expression(&mut self, _expr: &Expression<'a>, _source: &str) -> bool {
        false
    }
}

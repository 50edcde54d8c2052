//! Single-pass annotation checker
//!
//! Walks a parsed file once, classifies every method call, nullsafe call,
//! static call, method declaration and class declaration into a
//! [`CallSite`], and lets each enabled rule annotate the comment target of
//! that site. Targets are shared between rules so that one docblock receives
//! all of its lines in a single edit.

use std::collections::BTreeMap;

use mago_span::{HasSpan, Span};
use mago_syntax::ast::*;
use ssu_core::{
    visit, CallSite, ChangeMatcher, DeclarationPlacement, Edit, NodeKind, UpgradeRule, Visitor,
};
use tracing::debug;

use crate::docblock::{attached_comments, PendingDoc};
use crate::names::NameContext;
use crate::resolver::{span_text, var_tags, ClassContext, Resolver, TypeScope, ANONYMOUS_CLASS};
use crate::symbols::ClassIndex;

/// One TODO line written during a check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    /// Name of the rule that produced the line
    pub rule: String,
    pub text: String,
    /// Start offset of the annotated node
    pub offset: u32,
}

/// Result of checking one file
#[derive(Debug, Clone, Default)]
pub struct CheckResult {
    /// One edit per annotated target
    pub edits: Vec<Edit>,
    pub annotations: Vec<Annotation>,
}

impl CheckResult {
    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }
}

/// Run `rules` over a parsed program
pub fn check_program<'a>(
    program: &Program<'a>,
    source: &str,
    rules: &[&UpgradeRule],
    index: &ClassIndex,
) -> CheckResult {
    if rules.is_empty() {
        return CheckResult::default();
    }

    let mut checker = AnnotationChecker {
        source,
        trivia: program.trivia.as_slice(),
        rules,
        index,
        matcher: ChangeMatcher::new(index),
        names: NameContext::new(),
        classes: Vec::new(),
        scopes: vec![TypeScope::new()],
        statements: Vec::new(),
        pinned: Vec::new(),
        targets: BTreeMap::new(),
        annotations: Vec::new(),
    };
    visit(&mut checker, program, source);

    CheckResult {
        edits: checker
            .targets
            .into_values()
            .filter_map(PendingDoc::into_edit)
            .collect(),
        annotations: checker.annotations,
    }
}

struct AnnotationChecker<'c, 'a> {
    source: &'c str,
    trivia: &'c [Trivia<'a>],
    rules: &'c [&'c UpgradeRule],
    index: &'c ClassIndex,
    matcher: ChangeMatcher<'c>,
    names: NameContext,
    /// Enclosing class-likes, innermost last
    classes: Vec<ClassContext>,
    /// Variable types per function body, innermost last
    scopes: Vec<TypeScope>,
    /// Spans of the statements being traversed, innermost last
    statements: Vec<Span>,
    /// Variables typed by an inline `@var`, per statement
    pinned: Vec<Vec<String>>,
    /// Pending docblocks keyed by the start offset of their node
    targets: BTreeMap<u32, PendingDoc>,
    annotations: Vec<Annotation>,
}

impl<'c, 'a> AnnotationChecker<'c, 'a> {
    fn text(&self, span: Span) -> &'c str {
        span_text(self.source, span)
    }

    fn resolver(&self) -> Resolver<'_> {
        Resolver {
            index: self.index,
            source: self.source,
            names: &self.names,
            class: self.classes.last(),
            scope: self.scopes.last(),
        }
    }

    fn scope_mut(&mut self) -> &mut TypeScope {
        if self.scopes.is_empty() {
            self.scopes.push(TypeScope::new());
        }
        let last = self.scopes.len() - 1;
        &mut self.scopes[last]
    }

    /// Scope of a function-like body with its parameters bound
    fn parameter_scope(&self, parameters: &FunctionLikeParameterList<'_>, base: TypeScope) -> TypeScope {
        let resolver = self.resolver();
        let mut scope = base;
        for param in parameters.parameters.iter() {
            let ty = param
                .hint
                .as_ref()
                .map(|hint| resolver.hint_type(hint))
                .unwrap_or_default();
            scope.set(param.variable.name, ty);
        }
        scope
    }

    /// Let every rule that wants `site` annotate the node at `target`
    fn annotate(&mut self, site: &CallSite, target: Span, rules: &[&UpgradeRule]) {
        for rule in rules {
            if !rule.wants(site.kind) {
                continue;
            }
            if site.kind != NodeKind::ClassDeclaration && !rule.has_method(&site.method_name) {
                continue;
            }

            let trivia = self.trivia;
            let source = self.source;
            let doc = self
                .targets
                .entry(target.start.offset)
                .or_insert_with(|| PendingDoc::new(trivia, source, target));

            let outcome = rule.refactor(site, &self.matcher, doc);
            doc.record(outcome.lines());
            for line in outcome.lines() {
                self.annotations.push(Annotation {
                    rule: rule.name().to_string(),
                    text: line.clone(),
                    offset: target.start.offset,
                });
            }
        }
    }

    fn annotate_call(&mut self, site: CallSite, call_span: Span) {
        let target = self.statements.last().copied().unwrap_or(call_span);
        let rules = self.rules;
        self.annotate(&site, target, rules);
    }

    fn check_method_declaration(&mut self, method: &Method<'a>) {
        let Some(class) = self.classes.last() else {
            return;
        };
        let site = CallSite::method_declaration(method.name.value, class.name.clone());

        let first_statement = match &method.body {
            MethodBody::Concrete(block) => block.statements.iter().next().map(|s| s.span()),
            MethodBody::Abstract(_) => None,
        };

        let rules = self.rules;
        for &rule in rules {
            let target = match rule.placement() {
                DeclarationPlacement::DocBlock => method.span(),
                DeclarationPlacement::FirstStatement => first_statement.unwrap_or_else(|| method.span()),
            };
            self.annotate(&site, target, &[rule]);
        }
    }

    fn check_class_declaration(
        &mut self,
        members: &Sequence<'a, ClassLikeMember<'a>>,
        name: &str,
        target: Span,
    ) {
        let rules = self.rules;
        if !rules.iter().any(|rule| rule.wants(NodeKind::ClassDeclaration)) {
            return;
        }

        let mut traits = Vec::new();
        for member in members.iter() {
            if let ClassLikeMember::TraitUse(trait_use) = member {
                for trait_name in trait_use.trait_names.iter() {
                    traits.push(self.names.resolve(self.text(trait_name.span())));
                }
            }
        }

        let site = CallSite::class_declaration(name, traits);
        self.annotate(&site, target, rules);
    }

    fn parent_name(&self, extends: Option<&Extends<'a>>) -> Option<String> {
        extends
            .and_then(|extends| extends.types.first())
            .map(|parent| self.names.resolve(self.text(parent.span())))
    }

    fn enter_class_like(&mut self, short_name: &str, parent: Option<String>) -> String {
        let name = self.names.declare(short_name);
        self.classes.push(ClassContext {
            name: name.clone(),
            parent,
        });
        name
    }

    /// Bind the variables typed by `@var` tags of the statement's docblock
    fn pin_var_tags(&mut self, stmt: &Statement<'a>) -> Vec<String> {
        let attached = attached_comments(self.trivia, self.source, stmt.span().start.offset);
        let Some((_, doc)) = attached.doc else {
            return Vec::new();
        };

        let mut pinned = Vec::new();
        for (written, var) in var_tags(&doc) {
            let ty = self.resolver().doc_type(&written);
            debug!(var = %var, ty = %ty, "typed by @var");
            self.scope_mut().set(&var, ty);
            pinned.push(var);
        }
        pinned
    }

    fn is_pinned(&self, var: &str) -> bool {
        let var = var.trim_start_matches('$');
        self.pinned
            .last()
            .is_some_and(|names| names.iter().any(|name| name == var))
    }
}

impl<'a> Visitor<'a> for AnnotationChecker<'_, 'a> {
    fn visit_statement(&mut self, stmt: &Statement<'a>, _source: &str) -> bool {
        let mut pinned = Vec::new();

        match stmt {
            Statement::Namespace(ns) => {
                let name = ns.name.as_ref().map(|n| self.text(n.span()).to_string());
                self.names.set_namespace(name);
            }
            Statement::Use(use_stmt) => {
                self.names.add_use_statement(use_stmt, self.source);
            }
            Statement::Class(class) => {
                let parent = self.parent_name(class.extends.as_ref());
                let name = self.enter_class_like(class.name.value, parent);
                self.check_class_declaration(&class.members, &name, class.span());
            }
            Statement::Interface(iface) => {
                self.enter_class_like(iface.name.value, None);
            }
            Statement::Trait(tr) => {
                self.enter_class_like(tr.name.value, None);
            }
            Statement::Enum(en) => {
                self.enter_class_like(en.name.value, None);
            }
            Statement::Function(func) => {
                let scope = self.parameter_scope(&func.parameter_list, TypeScope::new());
                self.scopes.push(scope);
            }
            Statement::Expression(_) => {
                pinned = self.pin_var_tags(stmt);
            }
            _ => {}
        }

        self.statements.push(stmt.span());
        self.pinned.push(pinned);
        true
    }

    fn leave_statement(&mut self, stmt: &Statement<'a>, _source: &str) {
        self.statements.pop();
        self.pinned.pop();

        match stmt {
            Statement::Namespace(ns) => {
                if matches!(ns.body, NamespaceBody::BraceDelimited(_)) {
                    self.names.set_namespace(None);
                }
            }
            Statement::Class(_) | Statement::Interface(_) | Statement::Trait(_) | Statement::Enum(_) => {
                self.classes.pop();
            }
            Statement::Function(_) => {
                self.scopes.pop();
            }
            _ => {}
        }
    }

    fn visit_method(&mut self, method: &Method<'a>, _source: &str) -> bool {
        self.check_method_declaration(method);
        let scope = self.parameter_scope(&method.parameter_list, TypeScope::new());
        self.scopes.push(scope);
        true
    }

    fn leave_method(&mut self, _method: &Method<'a>, _source: &str) {
        self.scopes.pop();
    }

    /// An anonymous class stands in for its parent: `$this`, `self` and its
    /// method declarations resolve to the class it extends
    fn visit_anonymous_class(&mut self, class: &AnonymousClass<'a>, _source: &str) -> bool {
        let parent = self.parent_name(class.extends.as_ref());
        let name = parent
            .clone()
            .unwrap_or_else(|| ANONYMOUS_CLASS.to_string());
        let target = self.statements.last().copied().unwrap_or_else(|| class.span());
        self.check_class_declaration(&class.members, &name, target);
        self.classes.push(ClassContext { name, parent });
        true
    }

    fn leave_anonymous_class(&mut self, _class: &AnonymousClass<'a>, _source: &str) {
        self.classes.pop();
    }

    fn visit_expression(&mut self, expr: &Expression<'a>, _source: &str) -> bool {
        match expr {
            Expression::Call(Call::Method(call)) => {
                if let ClassLikeMemberSelector::Identifier(method) = &call.method {
                    let receiver = self.resolver().resolve(&call.object);
                    let site = CallSite::method_call(method.value, receiver);
                    self.annotate_call(site, expr.span());
                }
            }
            Expression::Call(Call::NullSafeMethod(call)) => {
                if let ClassLikeMemberSelector::Identifier(method) = &call.method {
                    let receiver = self.resolver().resolve(&call.object);
                    let site = CallSite::nullsafe_method_call(method.value, receiver);
                    self.annotate_call(site, expr.span());
                }
            }
            Expression::Call(Call::StaticMethod(call)) => {
                if let ClassLikeMemberSelector::Identifier(method) = &call.method {
                    match self.resolver().static_class(&call.class) {
                        Some(class) => {
                            let site = CallSite::static_call(method.value, Some(class));
                            self.annotate_call(site, expr.span());
                        }
                        None => {
                            debug!(method = method.value, "skipping static call on computed class");
                        }
                    }
                }
            }
            Expression::Closure(closure) => {
                let mut captured = TypeScope::new();
                if let Some(use_clause) = &closure.use_clause {
                    let outer = self.scopes.last();
                    for var in use_clause.variables.iter() {
                        let name = var.variable.name;
                        if let Some(ty) = outer.and_then(|scope| scope.get(name)) {
                            captured.set(name, ty.clone());
                        }
                    }
                }
                let scope = self.parameter_scope(&closure.parameter_list, captured);
                self.scopes.push(scope);
            }
            Expression::ArrowFunction(arrow) => {
                let outer = self.scopes.last().cloned().unwrap_or_default();
                let scope = self.parameter_scope(&arrow.parameter_list, outer);
                self.scopes.push(scope);
            }
            _ => {}
        }
        true
    }

    fn leave_expression(&mut self, expr: &Expression<'a>, _source: &str) {
        match expr {
            Expression::Closure(_) | Expression::ArrowFunction(_) => {
                self.scopes.pop();
            }
            Expression::Assignment(assign) => {
                if !matches!(assign.operator, AssignmentOperator::Assign(_)) {
                    return;
                }
                let Expression::Variable(Variable::Direct(var)) = &assign.lhs else {
                    return;
                };
                if self.is_pinned(var.name) {
                    return;
                }
                let ty = self.resolver().resolve(&assign.rhs);
                self.scope_mut().set(var.name, ty);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::collect_classes;
    use bumpalo::Bump;
    use mago_database::file::FileId;
    use ssu_core::{apply_edits, ChangeRecord, TodoStyle};

    fn build_task_rule() -> UpgradeRule {
        let mut rule = UpgradeRule::new("add_new_parameter", "Methods that gained a new parameter");
        rule.set_records(vec![ChangeRecord::new(
            "BuildTask",
            "run",
            "Added new parameter $output",
        )]);
        rule
    }

    const LINE: &str = "@TODO UPGRADE TASK - BuildTask::run: Added new parameter $output";

    const FRAMEWORK: &str = r#"<?php
namespace SilverStripe\Dev;

abstract class BuildTask
{
    public function run($request) {}
}
"#;

    fn check(source: &str, rules: &[&UpgradeRule]) -> (String, CheckResult) {
        let arena = Bump::new();
        let mut index = ClassIndex::new();
        for file in [FRAMEWORK, source] {
            let (program, _) = mago_syntax::parser::parse_file_content(&arena, FileId::new("test.php"), file);
            index.extend(collect_classes(program, file));
        }

        let (program, _) = mago_syntax::parser::parse_file_content(&arena, FileId::new("test.php"), source);
        let result = check_program(program, source, rules, &index);
        let output = apply_edits(source, &result.edits).unwrap();
        (output, result)
    }

    #[test]
    fn test_typed_parameter_receiver() {
        let rule = build_task_rule();
        let source = r#"<?php
use SilverStripe\Dev\BuildTask;

function migrate(BuildTask $task, $request)
{
    $task->run($request);
}
"#;
        let (output, result) = check(source, &[&rule]);
        assert_eq!(result.annotations.len(), 1);
        assert_eq!(result.annotations[0].rule, "add_new_parameter");
        assert!(output.contains(&format!("    /** {} */\n    $task->run($request);", LINE)));
    }

    #[test]
    fn test_rerun_is_a_no_op() {
        let rule = build_task_rule();
        let source = r#"<?php
use SilverStripe\Dev\BuildTask;

function migrate(BuildTask $task, $request)
{
    $task->run($request);
}
"#;
        let (once, _) = check(source, &[&rule]);
        let (twice, result) = check(&once, &[&rule]);
        assert_eq!(once, twice);
        assert!(result.is_empty());
        assert!(result.edits.is_empty());
    }

    #[test]
    fn test_unknown_receiver_is_silent() {
        let rule = build_task_rule();
        let source = "<?php\nfunction migrate($task) {\n    $task->run(null);\n}\n";
        let (output, result) = check(source, &[&rule]);
        assert!(result.is_empty());
        assert_eq!(output, source);
    }

    #[test]
    fn test_unknown_receiver_with_allow_flag() {
        let mut rule = UpgradeRule::new("add_new_parameter", "");
        rule.set_records(vec![
            ChangeRecord::new("BuildTask", "run", "Added new parameter $output").allowing_unknown_receiver(),
        ]);
        let source = "<?php\nfunction migrate($task) {\n    $task->run(null);\n}\n";
        let (output, _) = check(source, &[&rule]);
        assert!(output.contains(&format!("/** {} */\n    $task->run(null);", LINE)));
    }

    #[test]
    fn test_assignment_and_factory_types() {
        let rule = build_task_rule();
        let source = r#"<?php
namespace App;

use SilverStripe\Dev\BuildTask;

class MigrateTask extends BuildTask {}

$first = new MigrateTask();
$first->run(null);
$second = MigrateTask::create();
$second?->run(null);
$third = $first;
$third = $unknown;
$third->run(null);
"#;
        let (_, result) = check(source, &[&rule]);
        assert_eq!(result.annotations.len(), 2);
        let first = source.find("$first->run").unwrap() as u32;
        let second = source.find("$second?->run").unwrap() as u32;
        let offsets: Vec<u32> = result.annotations.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![first, second]);
    }

    #[test]
    fn test_var_tag_types_assignment() {
        let rule = build_task_rule();
        let source = r#"<?php
use SilverStripe\Dev\BuildTask;

/** @var BuildTask $task */
$task = $container->get('task');
$task->run(null);
"#;
        let (_, result) = check(source, &[&rule]);
        assert_eq!(result.annotations.len(), 1);
    }

    #[test]
    fn test_this_and_static_receivers() {
        let rule = build_task_rule();
        let source = r#"<?php
namespace App;

use SilverStripe\Dev\BuildTask;

class Runner extends BuildTask
{
    public function go()
    {
        $this->run(null);
        parent::run(null);
        $class = BuildTask::class;
        $class::run(null);
    }
}
"#;
        let (_, result) = check(source, &[&rule]);
        let texts: Vec<&str> = result.annotations.iter().map(|a| a.text.as_str()).collect();
        assert_eq!(texts, vec![LINE, LINE]);
    }

    #[test]
    fn test_subclass_declaration_placements() {
        let docblock = build_task_rule();
        let mut first_statement = UpgradeRule::new("obsolete_method_todo", "")
            .with_placement(DeclarationPlacement::FirstStatement)
            .with_style(TodoStyle::SsuRector);
        first_statement.set_records(vec![ChangeRecord::new("BuildTask", "run", "Removed")]);

        let source = r#"<?php
namespace App;

use SilverStripe\Dev\BuildTask;

class MigrateTask extends BuildTask
{
    public function run($request)
    {
        echo 'migrating';
    }
}
"#;
        let (output, _) = check(source, &[&docblock, &first_statement]);
        assert!(output.contains(&format!("    /** {} */\n    public function run($request)", LINE)));
        assert!(output.contains(
            "        /** @TODO SSU RECTOR UPGRADE TASK - BuildTask::run: Removed */\n        echo 'migrating';"
        ));
    }

    #[test]
    fn test_lines_from_several_rules_share_one_docblock() {
        let added = build_task_rule();
        let mut renamed = UpgradeRule::new("renamed_parameter", "");
        renamed.set_records(vec![ChangeRecord::new("BuildTask", "run", "Renamed parameter $request")]);

        let source = r#"<?php
use SilverStripe\Dev\BuildTask;

function migrate(BuildTask $task)
{
    /**
     * Kick off the migration
     */
    $task->run(null);
}
"#;
        let (output, result) = check(source, &[&added, &renamed]);
        assert_eq!(result.edits.len(), 1);
        assert!(output.contains(&format!(
            "    /**\n     * Kick off the migration\n     * {}\n     * @TODO UPGRADE TASK - BuildTask::run: Renamed parameter $request\n     */",
            LINE
        )));
    }

    #[test]
    fn test_closure_scopes() {
        let rule = build_task_rule();
        let source = r#"<?php
use SilverStripe\Dev\BuildTask;

function migrate(BuildTask $task)
{
    $run = function () use ($task) {
        $task->run(null);
    };
    $other = function ($task) {
        $task->run(null);
    };
    $arrow = fn () => $task->run(null);
}
"#;
        let (_, result) = check(source, &[&rule]);
        assert_eq!(result.annotations.len(), 2);
    }

    #[test]
    fn test_calls_inside_match_string_throw_and_yield() {
        let rule = build_task_rule();
        let source = r#"<?php
use SilverStripe\Dev\BuildTask;

function migrate(BuildTask $task, $mode)
{
    $label = match ($mode) {
        'run' => $task->run(null),
        default => null,
    };
    echo "Result: {$task->run(null)}";
    throw new \RuntimeException($task->run(null));
}

function steps(BuildTask $task)
{
    yield $task->run(null);
}
"#;
        let (output, result) = check(source, &[&rule]);
        assert_eq!(result.annotations.len(), 4);
        assert_eq!(result.edits.len(), 4);
        assert!(output.contains(&format!("    /** {} */\n    $label = match ($mode) {{", LINE)));
        assert!(output.contains(&format!("    /** {} */\n    echo \"Result: ", LINE)));
        assert!(output.contains(&format!("    /** {} */\n    throw new \\RuntimeException", LINE)));
        assert!(output.contains(&format!("    /** {} */\n    yield $task->run(null);", LINE)));
    }

    #[test]
    fn test_anonymous_subclass_resolves_to_parent() {
        let rule = build_task_rule();
        let source = r#"<?php
namespace App;

use SilverStripe\Dev\BuildTask;

$task = new class extends BuildTask {
    public function run($request)
    {
        echo 'anonymous';
    }

    public function again()
    {
        $this->run(null);
    }
};
$task->run(null);
"#;
        let (output, result) = check(source, &[&rule]);
        let offsets: Vec<u32> = result.annotations.iter().map(|a| a.offset).collect();
        let declaration = source.find("public function run").unwrap() as u32;
        let inner_call = source.find("$this->run").unwrap() as u32;
        let outer_call = source.find("$task->run").unwrap() as u32;
        assert_eq!(offsets, vec![declaration, inner_call, outer_call]);
        assert!(output.contains(&format!("    /** {} */\n    public function run($request)", LINE)));
        assert!(output.contains(&format!("        /** {} */\n        $this->run(null);", LINE)));
    }

    #[test]
    fn test_anonymous_class_arguments_use_outer_class() {
        let rule = build_task_rule();
        let source = r#"<?php
namespace App;

use SilverStripe\Dev\BuildTask;

class Runner extends BuildTask
{
    public function wrap()
    {
        return new class($this->run(null)) {
            public function run($request)
            {
                $this->run(null);
            }
        };
    }
}
"#;
        let (_, result) = check(source, &[&rule]);
        assert_eq!(result.annotations.len(), 1);
        assert_eq!(result.annotations[0].offset, source.find("return new class").unwrap() as u32);
    }

    #[test]
    fn test_echo_tag_is_not_annotated() {
        let rule = build_task_rule();
        let source = r#"<?php
use SilverStripe\Dev\BuildTask;

/** @var BuildTask $task */
$task = $container->get('task');
?>
<p><?= $task->run(null) ?></p>
"#;
        let (output, result) = check(source, &[&rule]);
        assert!(result.is_empty());
        assert_eq!(output, source);
    }
}

//! Configurable upgrade rules
//!
//! A rule owns one normalized catalog and knows how to phrase its TODO lines
//! and where declarations receive them. The host decides which node is the
//! comment target; the rule decides whether anything is written there.

use std::collections::HashMap;

use serde_yaml::Value;
use tracing::debug;

use crate::annotation::{todo_line, write_annotation, CommentTarget, TodoStyle};
use crate::call_site::{CallSite, NodeKind};
use crate::catalog::{normalize_entries, Catalog, ChangeRecord};
use crate::matcher::ChangeMatcher;

/// Where a matched method declaration is annotated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeclarationPlacement {
    /// The method's own docblock
    #[default]
    DocBlock,
    /// The first statement of the method body, or the docblock if the body is empty
    FirstStatement,
}

/// Result of running a rule against one node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefactorOutcome {
    Unchanged,
    /// Lines newly written to the target
    Annotated(Vec<String>),
}

impl RefactorOutcome {
    pub fn is_changed(&self) -> bool {
        matches!(self, RefactorOutcome::Annotated(_))
    }

    pub fn lines(&self) -> &[String] {
        match self {
            RefactorOutcome::Unchanged => &[],
            RefactorOutcome::Annotated(lines) => lines,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UpgradeRule {
    name: String,
    description: String,
    style: TodoStyle,
    placement: DeclarationPlacement,
    records: Vec<ChangeRecord>,
    /// Lowercased method name -> record indices in catalog order
    by_method: HashMap<String, Vec<usize>>,
    type_level: Vec<usize>,
}

impl UpgradeRule {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            style: TodoStyle::default(),
            placement: DeclarationPlacement::default(),
            records: Vec::new(),
            by_method: HashMap::new(),
            type_level: Vec::new(),
        }
    }

    pub fn with_style(mut self, style: TodoStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_placement(mut self, placement: DeclarationPlacement) -> Self {
        self.placement = placement;
        self
    }

    pub fn with_catalog(mut self, catalog: Catalog) -> Self {
        self.set_records(catalog.records);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn style(&self) -> TodoStyle {
        self.style
    }

    pub fn placement(&self) -> DeclarationPlacement {
        self.placement
    }

    pub fn records(&self) -> &[ChangeRecord] {
        &self.records
    }

    /// Replace the catalog with raw, unnormalized entries
    pub fn configure(&mut self, entries: &[Value]) {
        self.set_records(normalize_entries(entries));
    }

    pub fn set_records(&mut self, records: Vec<ChangeRecord>) {
        self.by_method.clear();
        self.type_level.clear();

        for (index, record) in records.iter().enumerate() {
            if record.is_type_level() {
                self.type_level.push(index);
            } else {
                self.by_method
                    .entry(record.method_name.to_ascii_lowercase())
                    .or_default()
                    .push(index);
            }
        }

        debug!(rule = %self.name, records = records.len(), "configured rule");
        self.records = records;
    }

    /// Node kinds this rule wants visited
    pub fn node_kinds(&self) -> Vec<NodeKind> {
        let mut kinds = vec![
            NodeKind::MethodCall,
            NodeKind::NullsafeMethodCall,
            NodeKind::StaticCall,
            NodeKind::ClassMethod,
        ];
        if !self.type_level.is_empty() {
            kinds.push(NodeKind::ClassDeclaration);
        }
        kinds
    }

    pub fn wants(&self, kind: NodeKind) -> bool {
        match kind {
            NodeKind::ClassDeclaration => !self.type_level.is_empty(),
            _ => !self.by_method.is_empty(),
        }
    }

    /// Whether any record concerns this method name
    pub fn has_method(&self, method_name: &str) -> bool {
        self.by_method.contains_key(&method_name.to_ascii_lowercase())
    }

    fn candidates<'r>(&'r self, site: &CallSite) -> impl Iterator<Item = &'r ChangeRecord> + 'r {
        let indices: &[usize] = if site.kind == NodeKind::ClassDeclaration {
            &self.type_level
        } else {
            self.by_method
                .get(&site.method_name.to_ascii_lowercase())
                .map(Vec::as_slice)
                .unwrap_or(&[])
        };
        indices.iter().map(move |&i| &self.records[i])
    }

    /// TODO lines this rule would attach for `site`, in catalog order
    pub fn annotations(&self, site: &CallSite, matcher: &ChangeMatcher<'_>) -> Vec<String> {
        let mut lines: Vec<String> = Vec::new();
        for record in matcher.matching(site, self.candidates(site)) {
            let line = todo_line(self.style, record);
            if !lines.contains(&line) {
                lines.push(line);
            }
        }
        lines
    }

    /// Annotate `target` for every matching record
    pub fn refactor<T: CommentTarget + ?Sized>(
        &self,
        site: &CallSite,
        matcher: &ChangeMatcher<'_>,
        target: &mut T,
    ) -> RefactorOutcome {
        let written: Vec<String> = self
            .annotations(site, matcher)
            .into_iter()
            .filter(|line| write_annotation(target, line))
            .collect();

        if written.is_empty() {
            RefactorOutcome::Unchanged
        } else {
            debug!(rule = %self.name, method = %site.method_name, count = written.len(), "annotated");
            RefactorOutcome::Annotated(written)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::tests::FakeHierarchy;
    use crate::hierarchy::NoHierarchy;
    use crate::types::InferredType;

    #[derive(Default)]
    struct Doc(Option<String>);

    impl CommentTarget for Doc {
        fn comments(&self) -> Vec<String> {
            self.0.iter().cloned().collect()
        }

        fn doc_comment(&self) -> Option<String> {
            self.0.clone()
        }

        fn set_doc_comment(&mut self, text: String) {
            self.0 = Some(text);
        }
    }

    fn add_new_parameter() -> UpgradeRule {
        let mut rule = UpgradeRule::new("add_new_parameter", "Flags methods that gained a parameter");
        let entries: Vec<Value> = serde_yaml::from_str(
            "- {class: BuildTask, method: run, note: 'Added new parameter $output'}",
        )
        .unwrap();
        rule.configure(&entries);
        rule
    }

    #[test]
    fn test_scenario_known_receiver() {
        let rule = add_new_parameter();
        let matcher = ChangeMatcher::new(&NoHierarchy);
        let site = CallSite::method_call("run", InferredType::object("BuildTask"));
        let mut doc = Doc::default();

        let outcome = rule.refactor(&site, &matcher, &mut doc);
        assert_eq!(
            outcome,
            RefactorOutcome::Annotated(vec![
                "@TODO UPGRADE TASK - BuildTask::run: Added new parameter $output".to_string()
            ])
        );

        assert_eq!(rule.refactor(&site, &matcher, &mut doc), RefactorOutcome::Unchanged);
        assert_eq!(
            doc.0.as_deref(),
            Some("/** @TODO UPGRADE TASK - BuildTask::run: Added new parameter $output */")
        );
    }

    #[test]
    fn test_scenario_unknown_receiver_without_flag() {
        let rule = add_new_parameter();
        let matcher = ChangeMatcher::new(&NoHierarchy);
        let site = CallSite::method_call("run", InferredType::Unresolved);
        let mut doc = Doc::default();

        assert_eq!(rule.refactor(&site, &matcher, &mut doc), RefactorOutcome::Unchanged);
        assert!(doc.0.is_none());
    }

    #[test]
    fn test_scenario_declaration_in_subclass() {
        let rule = add_new_parameter();
        let hierarchy = FakeHierarchy::default()
            .with("SilverStripe\\Dev\\BuildTask", None, &[])
            .with("App\\MigrateTask", Some("SilverStripe\\Dev\\BuildTask"), &[]);
        let matcher = ChangeMatcher::new(&hierarchy);
        let site = CallSite::method_declaration("run", "App\\MigrateTask");
        let mut doc = Doc(Some("/**\n * Runs it\n */".to_string()));

        assert!(rule.refactor(&site, &matcher, &mut doc).is_changed());
        assert_eq!(
            doc.0.as_deref(),
            Some("/**\n * Runs it\n * @TODO UPGRADE TASK - BuildTask::run: Added new parameter $output\n */")
        );
    }

    #[test]
    fn test_ssu_style_prefix() {
        let rule = UpgradeRule::new("return_type", "Return type changes")
            .with_style(TodoStyle::SsuRector)
            .with_catalog(Catalog {
                name: "return_type".into(),
                records: vec![ChangeRecord::new("DataObject", "getCMSFields", "Now returns FieldList")],
            });
        let matcher = ChangeMatcher::new(&NoHierarchy);
        let site = CallSite::method_declaration("getCMSFields", "DataObject");

        assert_eq!(
            rule.annotations(&site, &matcher),
            vec!["@TODO SSU RECTOR UPGRADE TASK - DataObject::getCMSFields: Now returns FieldList"]
        );
    }

    #[test]
    fn test_node_kinds_include_class_only_with_type_level_records() {
        let rule = add_new_parameter();
        assert!(!rule.node_kinds().contains(&NodeKind::ClassDeclaration));
        assert!(rule.has_method("RUN"));

        let rule = UpgradeRule::new("other_method", "").with_catalog(Catalog {
            name: "other_method".into(),
            records: vec![ChangeRecord::new("SessionEnvTypeSwitcher", "", "Removed")],
        });
        assert!(rule.node_kinds().contains(&NodeKind::ClassDeclaration));
        assert!(rule.wants(NodeKind::ClassDeclaration));
        assert!(!rule.wants(NodeKind::MethodCall));
    }

    #[test]
    fn test_duplicate_lines_are_written_once() {
        let rule = UpgradeRule::new("use_instead", "").with_catalog(Catalog {
            name: "use_instead".into(),
            records: vec![
                ChangeRecord::new("BuildTask", "run", "same"),
                ChangeRecord::new("SilverStripe\\Dev\\BuildTask", "run", "same"),
            ],
        });
        let matcher = ChangeMatcher::new(&NoHierarchy);
        let site = CallSite::method_call("run", InferredType::object("SilverStripe\\Dev\\BuildTask"));
        let mut doc = Doc::default();

        assert_eq!(rule.refactor(&site, &matcher, &mut doc).lines().len(), 1);
    }
}

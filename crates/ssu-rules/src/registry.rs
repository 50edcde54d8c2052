//! Registry of the upgrade rules shipped with ssu-rector

use std::collections::HashSet;

use mago_syntax::ast::Program;
use ssu_core::{Catalog, DeclarationPlacement, TodoStyle, UpgradeRule};

use crate::catalogs::builtin_catalog;
use crate::checker::{check_program, CheckResult};
use crate::symbols::ClassIndex;

/// Built-in rules: (name, catalog, description, style, placement)
const BUILTIN_RULES: &[(&str, &str, &str, TodoStyle, DeclarationPlacement)] = &[
    (
        "add_new_parameter",
        "add_new_parameter",
        "Flag calls and overrides of methods that gained a new parameter",
        TodoStyle::UpgradeTask,
        DeclarationPlacement::DocBlock,
    ),
    (
        "changed_default_parameter_value",
        "changed_default_parameter_value",
        "Flag methods whose parameter defaults changed",
        TodoStyle::UpgradeTask,
        DeclarationPlacement::DocBlock,
    ),
    (
        "changed_parameter_type",
        "changed_parameter_type",
        "Flag methods whose parameter types changed",
        TodoStyle::UpgradeTask,
        DeclarationPlacement::DocBlock,
    ),
    (
        "moved_to_extension",
        "moved_to_extension",
        "Flag methods that moved to an extension",
        TodoStyle::UpgradeTask,
        DeclarationPlacement::DocBlock,
    ),
    (
        "obsolete_method",
        "obsolete_method",
        "Flag methods removed without replacement",
        TodoStyle::UpgradeTask,
        DeclarationPlacement::DocBlock,
    ),
    (
        "obsolete_method_todo",
        "obsolete_method",
        "Flag overrides of removed methods inside their body",
        TodoStyle::UpgradeTask,
        DeclarationPlacement::FirstStatement,
    ),
    (
        "other_method",
        "other_method",
        "Flag other method and trait changes",
        TodoStyle::UpgradeTask,
        DeclarationPlacement::DocBlock,
    ),
    (
        "removed_parameter",
        "removed_parameter",
        "Flag methods that lost a parameter",
        TodoStyle::UpgradeTask,
        DeclarationPlacement::DocBlock,
    ),
    (
        "renamed_parameter",
        "renamed_parameter",
        "Flag methods whose parameters were renamed",
        TodoStyle::UpgradeTask,
        DeclarationPlacement::DocBlock,
    ),
    (
        "renamed_to",
        "renamed_to",
        "Flag methods that were renamed",
        TodoStyle::UpgradeTask,
        DeclarationPlacement::DocBlock,
    ),
    (
        "replaced_with",
        "replaced_with",
        "Flag methods replaced by another API",
        TodoStyle::UpgradeTask,
        DeclarationPlacement::DocBlock,
    ),
    (
        "return_type",
        "return_type",
        "Flag methods whose return type changed",
        TodoStyle::SsuRector,
        DeclarationPlacement::DocBlock,
    ),
    (
        "use_instead",
        "use_instead",
        "Flag deprecated methods with a suggested alternative",
        TodoStyle::UpgradeTask,
        DeclarationPlacement::DocBlock,
    ),
    (
        "visibility",
        "visibility",
        "Flag methods whose visibility changed",
        TodoStyle::SsuRector,
        DeclarationPlacement::DocBlock,
    ),
];

/// Rules that share a catalog with a default rule; they run only when selected
const OPT_IN_RULES: &[&str] = &["obsolete_method_todo"];

/// Registry of all available upgrade rules
pub struct RuleRegistry {
    rules: Vec<UpgradeRule>,
}

impl RuleRegistry {
    /// Create a registry with every built-in rule and its embedded catalog
    pub fn new() -> Self {
        let mut registry = Self::empty();

        for &(name, catalog, description, style, placement) in BUILTIN_RULES {
            let mut rule = UpgradeRule::new(name, description)
                .with_style(style)
                .with_placement(placement);
            if let Some(catalog) = builtin_catalog(catalog) {
                rule = rule.with_catalog(catalog);
            }
            registry.register(rule);
        }

        registry
    }

    /// A registry without any rules
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Register a rule, replacing any rule of the same name
    pub fn register(&mut self, rule: UpgradeRule) {
        match self.rules.iter_mut().find(|r| r.name() == rule.name()) {
            Some(existing) => *existing = rule,
            None => self.rules.push(rule),
        }
    }

    pub fn get(&self, name: &str) -> Option<&UpgradeRule> {
        self.rules.iter().find(|r| r.name() == name)
    }

    /// Replace the catalog of a rule; returns false for unknown rules
    pub fn set_catalog(&mut self, name: &str, catalog: Catalog) -> bool {
        match self.rules.iter_mut().find(|r| r.name() == name) {
            Some(rule) => {
                rule.set_records(catalog.records);
                true
            }
            None => false,
        }
    }

    /// Get all rule names
    pub fn all_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Names of the rules that run when none are selected explicitly
    pub fn default_names(&self) -> Vec<&str> {
        self.all_names()
            .into_iter()
            .filter(|name| !self.is_opt_in(name))
            .collect()
    }

    pub fn is_opt_in(&self, name: &str) -> bool {
        OPT_IN_RULES.contains(&name)
    }

    /// Get rules filtered by enabled names
    pub fn get_enabled(&self, enabled: &HashSet<String>) -> Vec<&UpgradeRule> {
        self.rules
            .iter()
            .filter(|r| enabled.contains(r.name()))
            .collect()
    }

    /// Get all rules with their descriptions (for --list-rules)
    pub fn list_rules(&self) -> Vec<(&str, &str)> {
        self.rules
            .iter()
            .map(|r| (r.name(), r.description()))
            .collect()
    }

    /// Run all enabled rules on a program
    pub fn check_all<'a>(
        &self,
        program: &Program<'a>,
        source: &str,
        enabled: &HashSet<String>,
        index: &ClassIndex,
    ) -> CheckResult {
        check_program(program, source, &self.get_enabled(enabled), index)
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ssu_core::ChangeRecord;

    #[test]
    fn test_builtin_rules() {
        let registry = RuleRegistry::new();
        let names = registry.all_names();
        assert_eq!(names.len(), 14);
        assert!(names.contains(&"obsolete_method_todo"));
        assert!(names.contains(&"visibility"));

        let todo = registry.get("obsolete_method_todo").unwrap();
        let obsolete = registry.get("obsolete_method").unwrap();
        assert_eq!(todo.placement(), DeclarationPlacement::FirstStatement);
        assert_eq!(todo.records(), obsolete.records());
        assert_eq!(registry.get("return_type").unwrap().style(), TodoStyle::SsuRector);
    }

    #[test]
    fn test_obsolete_method_todo_is_opt_in() {
        let registry = RuleRegistry::new();
        let defaults = registry.default_names();
        assert_eq!(defaults.len(), 13);
        assert!(defaults.contains(&"obsolete_method"));
        assert!(!defaults.contains(&"obsolete_method_todo"));
        assert!(registry.is_opt_in("obsolete_method_todo"));
        assert!(registry.all_names().contains(&"obsolete_method_todo"));
    }

    #[test]
    fn test_every_builtin_rule_has_records() {
        let registry = RuleRegistry::new();
        for (name, _) in registry.list_rules() {
            assert!(!registry.get(name).unwrap().records().is_empty(), "{} is empty", name);
        }
    }

    #[test]
    fn test_get_enabled() {
        let registry = RuleRegistry::new();
        let enabled: HashSet<String> = ["visibility".to_string(), "missing".to_string()].into();
        let rules = registry.get_enabled(&enabled);
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].name(), "visibility");
    }

    #[test]
    fn test_set_catalog_replaces_records() {
        let mut registry = RuleRegistry::new();
        let catalog = Catalog {
            name: "custom".into(),
            records: vec![ChangeRecord::new("Foo", "bar", "Baz")],
        };
        assert!(registry.set_catalog("renamed_to", catalog.clone()));
        assert_eq!(registry.get("renamed_to").unwrap().records().len(), 1);
        assert!(!registry.set_catalog("missing", catalog));
    }
}

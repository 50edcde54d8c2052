//! Match decision for a (call site, change record) pair

use tracing::debug;

use crate::call_site::{CallSite, Receiver, ReceiverKind};
use crate::catalog::ChangeRecord;
use crate::hierarchy::{names_match, ClassHierarchy, ClassMatcher};

/// Shared, stateless matching service injected into every rule
#[derive(Debug, Clone, Copy)]
pub struct ChangeMatcher<'h> {
    classes: ClassMatcher<'h>,
}

impl<'h> ChangeMatcher<'h> {
    pub fn new(hierarchy: &'h dyn ClassHierarchy) -> Self {
        Self {
            classes: ClassMatcher::new(hierarchy),
        }
    }

    /// Whether `record` applies to `site`
    pub fn matches(&self, site: &CallSite, record: &ChangeRecord) -> bool {
        if let Receiver::ClassLike { class, traits } = &site.receiver {
            return record.is_type_level() && self.matches_class_like(class, traits, record);
        }

        if !record.matches_method(&site.method_name) {
            return false;
        }

        if !site.receiver_type_known() {
            if site.receiver_kind() == ReceiverKind::Static {
                debug!(method = %site.method_name, "skipping static call with computed class");
                return false;
            }
            debug!(
                method = %site.method_name,
                class = %record.target_class,
                allowed = record.allow_unknown_receiver,
                "unknown receiver type"
            );
            return record.allow_unknown_receiver;
        }

        // Union members match independently
        site.candidate_classes()
            .into_iter()
            .any(|class| self.classes.is_same_or_subclass(class, &record.target_class))
    }

    /// Records of `records` that apply to `site`, in catalog order
    pub fn matching<'r>(
        &self,
        site: &CallSite,
        records: impl IntoIterator<Item = &'r ChangeRecord>,
    ) -> Vec<&'r ChangeRecord> {
        records.into_iter().filter(|r| self.matches(site, r)).collect()
    }

    fn matches_class_like(&self, class: &str, traits: &[String], record: &ChangeRecord) -> bool {
        self.classes.is_same_or_subclass(class, &record.target_class)
            || traits.iter().any(|t| names_match(t, &record.target_class))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::tests::FakeHierarchy;
    use crate::hierarchy::NoHierarchy;
    use crate::types::InferredType;

    fn build_task_record() -> ChangeRecord {
        ChangeRecord::new("BuildTask", "run", "Added new parameter $output")
    }

    #[test]
    fn test_known_receiver_matches_case_insensitively() {
        let matcher = ChangeMatcher::new(&NoHierarchy);
        let record = build_task_record();

        for class in ["BuildTask", "buildtask", "BUILDTASK"] {
            let site = CallSite::method_call("run", InferredType::object(class));
            assert!(matcher.matches(&site, &record), "{class}");
        }
    }

    #[test]
    fn test_method_name_prefilter() {
        let matcher = ChangeMatcher::new(&NoHierarchy);
        let site = CallSite::method_call("RUN", InferredType::object("BuildTask"));
        assert!(matcher.matches(&site, &build_task_record()));

        let site = CallSite::method_call("execute", InferredType::object("BuildTask"));
        assert!(!matcher.matches(&site, &build_task_record()));
    }

    #[test]
    fn test_unknown_receiver_gating() {
        let matcher = ChangeMatcher::new(&NoHierarchy);
        let site = CallSite::method_call("run", InferredType::Unresolved);

        assert!(!matcher.matches(&site, &build_task_record()));
        assert!(matcher.matches(&site, &build_task_record().allowing_unknown_receiver()));

        let site = CallSite::method_call("run", InferredType::ObjectWithoutClass);
        assert!(matcher.matches(&site, &build_task_record().allowing_unknown_receiver()));
    }

    #[test]
    fn test_scalar_receiver_never_matches() {
        let matcher = ChangeMatcher::new(&NoHierarchy);
        let site = CallSite::method_call("run", InferredType::Scalar("string".into()));
        assert!(!matcher.matches(&site, &build_task_record().allowing_unknown_receiver()));
    }

    #[test]
    fn test_union_is_inclusive_or() {
        let matcher = ChangeMatcher::new(&NoHierarchy);
        let record = ChangeRecord::new("B", "run", "note");
        let site = CallSite::method_call(
            "run",
            InferredType::union(vec![InferredType::object("A"), InferredType::object("B")]),
        );
        assert!(matcher.matches(&site, &record));
    }

    #[test]
    fn test_computed_static_class_is_skipped_even_when_allowed() {
        let matcher = ChangeMatcher::new(&NoHierarchy);
        let site = CallSite::static_call("run", None);
        assert!(!matcher.matches(&site, &build_task_record().allowing_unknown_receiver()));

        let site = CallSite::static_call("run", Some("SilverStripe\\Dev\\BuildTask".into()));
        assert!(matcher.matches(&site, &build_task_record()));
    }

    #[test]
    fn test_declaration_uses_hierarchy_only() {
        let hierarchy = FakeHierarchy::default()
            .with("SilverStripe\\Dev\\BuildTask", None, &[])
            .with("App\\MigrateTask", Some("SilverStripe\\Dev\\BuildTask"), &[])
            .with("App\\Other", None, &[]);
        let matcher = ChangeMatcher::new(&hierarchy);
        let record = build_task_record().allowing_unknown_receiver();

        let site = CallSite::method_declaration("run", "App\\MigrateTask");
        assert!(matcher.matches(&site, &record));

        let site = CallSite::method_declaration("run", "App\\Other");
        assert!(!matcher.matches(&site, &record));
    }

    #[test]
    fn test_type_level_records_only_match_class_declarations() {
        let matcher = ChangeMatcher::new(&NoHierarchy);
        let record = ChangeRecord::new("SessionEnvTypeSwitcher", "", "Removed trait");

        let class = CallSite::class_declaration("App\\Page", vec!["SilverStripe\\Dev\\SessionEnvTypeSwitcher".into()]);
        assert!(matcher.matches(&class, &record));

        let unrelated = CallSite::class_declaration("App\\Page", vec![]);
        assert!(!matcher.matches(&unrelated, &record));

        let call = CallSite::method_call("", InferredType::object("SessionEnvTypeSwitcher"));
        assert!(!matcher.matches(&call, &record));

        let method_record = build_task_record();
        let task = CallSite::class_declaration("BuildTask", vec![]);
        assert!(!matcher.matches(&task, &method_record));
    }

    #[test]
    fn test_matching_keeps_catalog_order() {
        let matcher = ChangeMatcher::new(&NoHierarchy);
        let records = vec![
            ChangeRecord::new("BuildTask", "run", "first"),
            ChangeRecord::new("Other", "run", "skip"),
            ChangeRecord::new("BuildTask", "run", "second"),
        ];
        let site = CallSite::method_call("run", InferredType::object("BuildTask"));
        let notes: Vec<&str> = matcher
            .matching(&site, &records)
            .into_iter()
            .map(|r| r.note.as_str())
            .collect();
        assert_eq!(notes, vec!["first", "second"]);
    }
}

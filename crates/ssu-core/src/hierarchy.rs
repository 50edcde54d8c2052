//! Class-hierarchy queries and the same-or-subclass comparator
//!
//! Catalog entries name classes either by short name (`BuildTask`) or fully
//! qualified (`SilverStripe\Dev\BuildTask`), and framework releases move
//! classes between namespaces. The comparator therefore tries cheap string
//! comparisons first and only then asks the hierarchy.

use tracing::trace;

/// Read-only view of the class hierarchy owned by the host
pub trait ClassHierarchy {
    /// Whether the class is known (case-insensitive, leading `\` ignored)
    fn has_class(&self, name: &str) -> bool;

    /// Declared name of a known class
    fn class_name(&self, name: &str) -> Option<String>;

    /// Names of all parent classes, nearest first, excluding the class itself
    fn parent_class_names(&self, name: &str) -> Vec<String>;

    /// Whether `class` extends or implements `other`, directly or transitively.
    /// A class is not a subclass of itself. Unknown classes are never subclasses.
    fn is_subclass_of(&self, class: &str, other: &str) -> bool;
}

/// Hierarchy that knows no classes
///
/// Matching then falls back to exact and suffix name comparison only.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHierarchy;

impl ClassHierarchy for NoHierarchy {
    fn has_class(&self, _name: &str) -> bool {
        false
    }

    fn class_name(&self, _name: &str) -> Option<String> {
        None
    }

    fn parent_class_names(&self, _name: &str) -> Vec<String> {
        Vec::new()
    }

    fn is_subclass_of(&self, _class: &str, _other: &str) -> bool {
        false
    }
}

/// Strip any namespace prefix, keeping the last segment
pub fn short_class_name(name: &str) -> &str {
    let name = name.trim_start_matches('\\');
    name.rsplit('\\').next().unwrap_or(name)
}

/// Case-insensitive exact or namespace-suffix match
///
/// `actual` matches `configured` when both are equal, or when `actual` ends
/// with `\` followed by `configured`. A short configured name therefore
/// matches any namespaced class sharing that trailing segment.
pub fn names_match(actual: &str, configured: &str) -> bool {
    let actual = actual.trim_start_matches('\\');
    let configured = configured.trim_start_matches('\\');

    if configured.is_empty() {
        return false;
    }

    if actual.eq_ignore_ascii_case(configured) {
        return true;
    }

    if actual.len() <= configured.len() {
        return false;
    }

    let split = actual.len() - configured.len();
    actual.is_char_boundary(split)
        && actual[split..].eq_ignore_ascii_case(configured)
        && actual[..split].ends_with('\\')
}

/// Stateless comparator shared by every rule
#[derive(Clone, Copy)]
pub struct ClassMatcher<'h> {
    hierarchy: &'h dyn ClassHierarchy,
}

impl<'h> ClassMatcher<'h> {
    pub fn new(hierarchy: &'h dyn ClassHierarchy) -> Self {
        Self { hierarchy }
    }

    /// Whether `actual` is the configured class or one of its subclasses
    pub fn is_same_or_subclass(&self, actual: &str, configured: &str) -> bool {
        let actual = actual.trim_start_matches('\\');
        let configured = configured.trim_start_matches('\\');

        if names_match(actual, configured) {
            return true;
        }

        if !self.hierarchy.has_class(actual) {
            trace!(actual, configured, "class unknown to hierarchy");
            return false;
        }

        if configured.contains('\\') {
            if let Some(declared) = self.hierarchy.class_name(actual) {
                if declared.eq_ignore_ascii_case(configured) {
                    return true;
                }
            }
            return self.hierarchy.is_subclass_of(actual, configured);
        }

        // Short configured name: retry against the whole ancestor chain
        let declared = self
            .hierarchy
            .class_name(actual)
            .unwrap_or_else(|| actual.to_string());

        std::iter::once(declared)
            .chain(self.hierarchy.parent_class_names(actual))
            .filter(|candidate| !candidate.is_empty())
            .any(|candidate| names_match(&candidate, configured))
    }
}

impl std::fmt::Debug for ClassMatcher<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassMatcher").finish_non_exhaustive()
    }
}

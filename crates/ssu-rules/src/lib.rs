//! ssu-rules: Silverstripe upgrade annotation rules for PHP sources
//!
//! Binds the ssu-core engine to files parsed with mago-syntax:
//! - collector / symbols: class index built from every scanned file
//! - names / resolver: namespace-aware receiver type resolution
//! - docblock: reading and writing the comments attached to a node
//! - checker: one traversal that runs every enabled rule
//! - catalogs / registry: embedded Silverstripe 6 catalogs and their rules
//!
//! Available rules:
//! - add_new_parameter, changed_default_parameter_value, changed_parameter_type
//! - moved_to_extension, obsolete_method, obsolete_method_todo, other_method
//! - removed_parameter, renamed_parameter, renamed_to, replaced_with
//! - return_type, use_instead, visibility
//!
//! `obsolete_method_todo` is opt-in: it reuses the obsolete_method catalog.

pub mod catalogs;
pub mod checker;
pub mod collector;
pub mod docblock;
pub mod names;
pub mod registry;
pub mod resolver;
pub mod symbols;

pub use catalogs::{builtin_catalog, load_catalog_dir, load_catalog_file};
pub use checker::{check_program, Annotation, CheckResult};
pub use collector::collect_classes;
pub use registry::RuleRegistry;
pub use symbols::{ClassIndex, ClassInfo};

//! ssu-core: Matching and annotation engine for framework upgrade TODOs
//!
//! This crate provides:
//! - `ChangeRecord` / `Catalog`: normalized "what changed" tables
//! - `InferredType`: receiver types as reported by a type-inference host
//! - `ClassHierarchy` / `ClassMatcher`: class-hierarchy queries and the
//!   same-or-subclass comparator with short-name fallback
//! - `CallSite` / `ChangeMatcher`: the per (call site, record) match decision
//! - `CommentTarget` / `write_annotation()`: idempotent docblock annotation
//! - `UpgradeRule`: a configurable rule tying the above together
//! - `Edit` / `apply_edits()`: span-based source modification
//! - `Visitor`: trait for traversing PHP AST

pub mod annotation;
pub mod call_site;
pub mod catalog;
mod edit;
pub mod hierarchy;
pub mod matcher;
pub mod rule;
pub mod types;
pub mod visitor;

pub use annotation::{merge_into_docblock, todo_line, write_annotation, CommentTarget, TodoStyle};
pub use call_site::{CallSite, NodeKind, Receiver, ReceiverKind};
pub use catalog::{normalize_entries, normalize_entry, Catalog, CatalogError, ChangeRecord};
pub use edit::{apply_edits, Edit, EditError};
pub use hierarchy::{names_match, short_class_name, ClassHierarchy, ClassMatcher, NoHierarchy};
pub use matcher::ChangeMatcher;
pub use rule::{DeclarationPlacement, RefactorOutcome, UpgradeRule};
pub use types::InferredType;
pub use visitor::{visit, Visitor};

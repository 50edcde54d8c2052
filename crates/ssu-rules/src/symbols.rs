//! Class index for hierarchy queries
//!
//! Collected from every scanned file before rules run, so that a call in one
//! file can be matched against a class hierarchy declared in another.

use std::collections::{HashMap, HashSet};

use ssu_core::{ClassHierarchy, InferredType};

/// Information about a declared class-like
#[derive(Debug, Clone)]
pub struct ClassInfo {
    /// Fully qualified name
    pub full_name: String,
    /// Parent class (interfaces record their parents in `interfaces`)
    pub parent: Option<String>,
    pub interfaces: Vec<String>,
    pub traits: Vec<String>,
    /// Property name (without `$`) -> declared type
    pub properties: HashMap<String, InferredType>,
}

impl ClassInfo {
    pub fn new(full_name: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
            parent: None,
            interfaces: Vec::new(),
            traits: Vec::new(),
            properties: HashMap::new(),
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_interface(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    /// Short name (without namespace)
    pub fn name(&self) -> &str {
        self.full_name.rsplit('\\').next().unwrap_or(&self.full_name)
    }
}

/// All classes known to a run, keyed case-insensitively
#[derive(Debug, Clone, Default)]
pub struct ClassIndex {
    classes: HashMap<String, ClassInfo>,
}

fn key(name: &str) -> String {
    name.trim_start_matches('\\').to_ascii_lowercase()
}

impl ClassIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class; a later declaration of the same name wins
    pub fn register(&mut self, info: ClassInfo) {
        self.classes.insert(key(&info.full_name), info);
    }

    pub fn extend(&mut self, infos: impl IntoIterator<Item = ClassInfo>) {
        for info in infos {
            self.register(info);
        }
    }

    pub fn get(&self, name: &str) -> Option<&ClassInfo> {
        self.classes.get(&key(name))
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Declared spelling of a known class
    pub fn canonical_name(&self, name: &str) -> Option<&str> {
        self.get(name).map(|c| c.full_name.as_str())
    }

    /// Parent chain, nearest first; stops at unknown classes and cycles
    pub fn ancestors(&self, name: &str) -> Vec<String> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        seen.insert(key(name));

        let mut current = self.get(name).and_then(|c| c.parent.clone());
        while let Some(parent) = current {
            if !seen.insert(key(&parent)) {
                break;
            }
            current = self.get(&parent).and_then(|c| c.parent.clone());
            chain.push(
                self.canonical_name(&parent)
                    .map(str::to_string)
                    .unwrap_or(parent),
            );
        }
        chain
    }

    /// Proper subclass test through parents and implemented interfaces
    pub fn is_subclass_of(&self, class: &str, other: &str) -> bool {
        let target = key(other);
        let mut seen = HashSet::new();
        let mut queue = vec![key(class)];

        while let Some(current) = queue.pop() {
            if !seen.insert(current.clone()) {
                continue;
            }
            let Some(info) = self.classes.get(&current) else {
                continue;
            };
            for next in info.parent.iter().chain(info.interfaces.iter()) {
                let next = key(next);
                if next == target {
                    return true;
                }
                queue.push(next);
            }
        }
        false
    }

    /// Declared class type of a property, searching parents and used traits
    pub fn property_type(&self, class: &str, property: &str) -> Option<&InferredType> {
        let mut seen = HashSet::new();
        let mut queue = vec![key(class)];

        while let Some(current) = queue.pop() {
            if !seen.insert(current.clone()) {
                continue;
            }
            let Some(info) = self.classes.get(&current) else {
                continue;
            };
            if let Some(ty) = info.properties.get(property) {
                return Some(ty);
            }
            queue.extend(info.traits.iter().map(|t| key(t)));
            queue.extend(info.parent.iter().map(|p| key(p)));
        }
        None
    }
}

impl ClassHierarchy for ClassIndex {
    fn has_class(&self, name: &str) -> bool {
        self.classes.contains_key(&key(name))
    }

    fn class_name(&self, name: &str) -> Option<String> {
        self.canonical_name(name).map(str::to_string)
    }

    fn parent_class_names(&self, name: &str) -> Vec<String> {
        self.ancestors(name)
    }

    fn is_subclass_of(&self, class: &str, other: &str) -> bool {
        ClassIndex::is_subclass_of(self, class, other)
    }
}

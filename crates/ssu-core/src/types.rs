//! Receiver types as reported by the type-inference host
//!
//! Only the distinctions the matcher cares about are kept: concrete classes,
//! unions of them, and the sentinel categories that mean "cannot tell".

use std::fmt;

/// Inferred type of a receiver expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InferredType {
    /// Instance of a named class
    Object(String),

    /// `object` with no concrete class
    ObjectWithoutClass,

    /// Inference could not resolve the expression (mixed)
    Unresolved,

    /// Inference failed with an error
    Error,

    /// Expression never produces a value
    Never,

    /// Any non-object type (int, string, array, ...)
    Scalar(String),

    /// Union of member types (e.g. `A|B|null`)
    Union(Vec<InferredType>),
}

impl InferredType {
    /// Create an object type for a specific class
    pub fn object(class_name: impl Into<String>) -> Self {
        InferredType::Object(class_name.into())
    }

    /// Create a union type, flattening nested unions
    ///
    /// A single member collapses to that member; an empty list is `Never`.
    pub fn union(types: Vec<InferredType>) -> Self {
        let mut flat = Vec::with_capacity(types.len());
        for ty in types {
            match ty {
                InferredType::Union(inner) => flat.extend(inner),
                other => {
                    if !flat.contains(&other) {
                        flat.push(other);
                    }
                }
            }
        }

        match flat.len() {
            0 => InferredType::Never,
            1 => flat.remove(0),
            _ => InferredType::Union(flat),
        }
    }

    /// Whether this type is one of the "unknown" categories
    ///
    /// A union is never unknown as a whole; its members are checked one by one.
    pub fn is_unknown(&self) -> bool {
        matches!(
            self,
            InferredType::Unresolved | InferredType::Error | InferredType::ObjectWithoutClass
        )
    }

    /// All concrete class names this type may name
    pub fn class_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_class_names(&mut names);
        names
    }

    fn collect_class_names<'t>(&'t self, names: &mut Vec<&'t str>) {
        match self {
            InferredType::Object(name) => names.push(name.as_str()),
            InferredType::Union(types) => {
                for ty in types {
                    ty.collect_class_names(names);
                }
            }
            _ => {}
        }
    }
}

impl Default for InferredType {
    fn default() -> Self {
        InferredType::Unresolved
    }
}

impl fmt::Display for InferredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InferredType::Object(name) => write!(f, "{}", name),
            InferredType::ObjectWithoutClass => write!(f, "object"),
            InferredType::Unresolved => write!(f, "mixed"),
            InferredType::Error => write!(f, "*ERROR*"),
            InferredType::Never => write!(f, "never"),
            InferredType::Scalar(name) => write!(f, "{}", name),
            InferredType::Union(types) => {
                let parts: Vec<String> = types.iter().map(|t| t.to_string()).collect();
                write!(f, "{}", parts.join("|"))
            }
        }
    }
}

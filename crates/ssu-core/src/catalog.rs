//! Change catalogs: normalized "what changed" records
//!
//! Raw entries come from YAML documents authored by maintainers. Entries that
//! lack a class, method or note are dropped instead of failing the run.

use serde_yaml::{Mapping, Value};
use thiserror::Error;
use tracing::debug;

/// Errors raised while loading a catalog document
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid catalog YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("catalog must be a list of entries or a mapping with `entries`, found {0}")]
    Shape(&'static str),
}

/// One documented incompatibility between two framework versions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    pub target_class: String,
    /// Empty for changes that concern the whole class or trait
    pub method_name: String,
    pub note: String,
    pub parameter: Option<String>,
    pub from_value: Option<String>,
    pub to_value: Option<String>,
    /// Annotate even when the receiver type cannot be resolved
    pub allow_unknown_receiver: bool,
}

impl ChangeRecord {
    pub fn new(
        target_class: impl Into<String>,
        method_name: impl Into<String>,
        note: impl Into<String>,
    ) -> Self {
        Self {
            target_class: target_class.into(),
            method_name: method_name.into(),
            note: note.into(),
            parameter: None,
            from_value: None,
            to_value: None,
            allow_unknown_receiver: false,
        }
    }

    pub fn allowing_unknown_receiver(mut self) -> Self {
        self.allow_unknown_receiver = true;
        self
    }

    /// Whether the record concerns a whole class or trait rather than a method
    pub fn is_type_level(&self) -> bool {
        self.method_name.is_empty()
    }

    /// Case-insensitive method-name pre-filter
    pub fn matches_method(&self, method_name: &str) -> bool {
        !self.is_type_level() && self.method_name.eq_ignore_ascii_case(method_name)
    }
}

const CLASS_KEYS: &[&str] = &["class", "c"];
const METHOD_KEYS: &[&str] = &["method", "m"];
const NOTE_KEYS: &[&str] = &["note", "n"];
const UNKNOWN_KEYS: &[&str] = &["unknown-receiver-allowed", "unknown-allowed", "u"];

/// Convert one raw entry into a record, or `None` if it is unusable
pub fn normalize_entry(entry: &Value) -> Option<ChangeRecord> {
    let Value::Mapping(map) = entry else {
        debug!("dropping catalog entry that is not a mapping");
        return None;
    };

    let target_class = lookup(map, CLASS_KEYS).and_then(scalar_string);
    let method_name = lookup(map, METHOD_KEYS).and_then(scalar_string);
    let note = lookup(map, NOTE_KEYS).and_then(scalar_string);

    let (Some(target_class), Some(method_name), Some(note)) = (target_class, method_name, note)
    else {
        debug!(?map, "dropping catalog entry without class, method and note");
        return None;
    };

    let target_class = target_class.trim().trim_start_matches('\\').to_string();
    if target_class.is_empty() || note.trim().is_empty() {
        debug!(class = %target_class, method = %method_name, "dropping catalog entry with empty class or note");
        return None;
    }

    Some(ChangeRecord {
        target_class,
        method_name: method_name.trim().to_string(),
        note,
        parameter: lookup(map, &["parameter"]).and_then(scalar_string),
        from_value: lookup(map, &["from"]).and_then(scalar_string),
        to_value: lookup(map, &["to"]).and_then(scalar_string),
        allow_unknown_receiver: lookup(map, UNKNOWN_KEYS).map(flag).unwrap_or(false),
    })
}

/// Normalize a list of raw entries, keeping catalog order
pub fn normalize_entries(entries: &[Value]) -> Vec<ChangeRecord> {
    let records: Vec<ChangeRecord> = entries.iter().filter_map(normalize_entry).collect();
    if records.len() != entries.len() {
        debug!(
            kept = records.len(),
            dropped = entries.len() - records.len(),
            "normalized catalog entries"
        );
    }
    records
}

fn lookup<'v>(map: &'v Mapping, keys: &[&str]) -> Option<&'v Value> {
    keys.iter().find_map(|key| map.get(*key))
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn flag(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
        Value::Number(n) => n.as_i64().is_some_and(|n| n != 0),
        _ => false,
    }
}

/// A named, normalized catalog
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub name: String,
    pub records: Vec<ChangeRecord>,
}

impl Catalog {
    /// Parse a catalog document
    ///
    /// `fallback_name` is used when the document carries no `name` key.
    pub fn from_yaml_str(content: &str, fallback_name: &str) -> Result<Self, CatalogError> {
        let value: Value = serde_yaml::from_str(content)?;
        Self::from_value(&value, fallback_name)
    }

    /// Build a catalog from an already-parsed document
    pub fn from_value(value: &Value, fallback_name: &str) -> Result<Self, CatalogError> {
        let (name, entries) = match value {
            Value::Null => (None, Vec::new()),
            Value::Sequence(entries) => (None, entries.clone()),
            Value::Mapping(map) => {
                let name = map.get("name").and_then(scalar_string);
                let entries = match map.get("entries") {
                    Some(Value::Sequence(entries)) => entries.clone(),
                    Some(Value::Null) | None => Vec::new(),
                    Some(_) => return Err(CatalogError::Shape("non-list `entries`")),
                };
                (name, entries)
            }
            Value::String(_) => return Err(CatalogError::Shape("a string")),
            Value::Number(_) => return Err(CatalogError::Shape("a number")),
            Value::Bool(_) => return Err(CatalogError::Shape("a boolean")),
            Value::Tagged(_) => return Err(CatalogError::Shape("a tagged value")),
        };

        Ok(Self {
            name: name.unwrap_or_else(|| fallback_name.to_string()),
            records: normalize_entries(&entries),
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_type_level_records(&self) -> bool {
        self.records.iter().any(ChangeRecord::is_type_level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(yaml: &str) -> Value {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_normalize_full_entry() {
        let record = normalize_entry(&entry(
            r#"
class: 'SilverStripe\Dev\BuildTask'
method: run
note: 'Added new parameter $output'
parameter: output
unknown-receiver-allowed: true
"#,
        ))
        .unwrap();

        assert_eq!(record.target_class, "SilverStripe\\Dev\\BuildTask");
        assert_eq!(record.method_name, "run");
        assert_eq!(record.note, "Added new parameter $output");
        assert_eq!(record.parameter.as_deref(), Some("output"));
        assert!(record.allow_unknown_receiver);
    }

    #[test]
    fn test_normalize_short_keys() {
        let record = normalize_entry(&entry("{c: BuildTask, m: run, n: changed, u: 'yes'}")).unwrap();
        assert_eq!(record.target_class, "BuildTask");
        assert_eq!(record.method_name, "run");
        assert!(record.allow_unknown_receiver);
    }

    #[test]
    fn test_flag_defaults_to_false() {
        let record = normalize_entry(&entry("{class: A, method: b, note: c}")).unwrap();
        assert!(!record.allow_unknown_receiver);

        let record = normalize_entry(&entry("{class: A, method: b, note: c, u: maybe}")).unwrap();
        assert!(!record.allow_unknown_receiver);
    }

    #[test]
    fn test_missing_required_keys_are_dropped() {
        assert!(normalize_entry(&entry("{class: A, method: b}")).is_none());
        assert!(normalize_entry(&entry("{class: A, note: c}")).is_none());
        assert!(normalize_entry(&entry("{method: b, note: c}")).is_none());
        assert!(normalize_entry(&entry("{class: A, method: b, note: '  '}")).is_none());
        assert!(normalize_entry(&entry("- not a mapping")).is_none());
    }

    #[test]
    fn test_empty_method_is_type_level() {
        let record = normalize_entry(&entry("{class: SessionEnvTypeSwitcher, method: '', note: removed}")).unwrap();
        assert!(record.is_type_level());
        assert!(!record.matches_method(""));
    }

    #[test]
    fn test_matches_method_case_insensitive() {
        let record = ChangeRecord::new("BuildTask", "run", "note");
        assert!(record.matches_method("RUN"));
        assert!(record.matches_method("Run"));
        assert!(!record.matches_method("runTask"));
    }

    #[test]
    fn test_catalog_keeps_order_and_drops_bad_entries() {
        let catalog = Catalog::from_yaml_str(
            r#"
name: add_new_parameter
entries:
  - {class: A, method: one, note: first}
  - {class: B, method: two}
  - {class: C, method: three, note: third}
"#,
            "fallback",
        )
        .unwrap();

        assert_eq!(catalog.name, "add_new_parameter");
        let methods: Vec<&str> = catalog.records.iter().map(|r| r.method_name.as_str()).collect();
        assert_eq!(methods, vec!["one", "three"]);
    }

    #[test]
    fn test_catalog_bare_list_and_empty() {
        let catalog = Catalog::from_yaml_str("- {class: A, method: b, note: c}", "renamed_to").unwrap();
        assert_eq!(catalog.name, "renamed_to");
        assert_eq!(catalog.len(), 1);

        let empty = Catalog::from_yaml_str("", "empty").unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_catalog_rejects_scalar_document() {
        let result = Catalog::from_yaml_str("just a string", "x");
        assert!(matches!(result, Err(CatalogError::Shape(_))));

        let result = Catalog::from_yaml_str("entries: 3", "x");
        assert!(matches!(result, Err(CatalogError::Shape(_))));
    }

    #[test]
    fn test_numeric_values_are_stringified() {
        let record = normalize_entry(&entry("{class: A, method: limit, note: changed, from: 10, to: 20}")).unwrap();
        assert_eq!(record.from_value.as_deref(), Some("10"));
        assert_eq!(record.to_value.as_deref(), Some("20"));
    }
}

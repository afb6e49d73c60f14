//! Deterministic map from a polymorphic root type name to a backing
//! collection name. Per-DataSource configuration passed at construction,
//! rather than process-wide mutable ignored-prefix/suffix lists.

use serde::{Deserialize, Serialize};

/// Name-mapping rules. Exactly one prefix and one suffix are stripped, first
/// match wins, in the order the lists are declared.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionRouter {
    pub ignored_class_name_prefixes: Vec<String>,
    pub ignored_class_name_suffixes: Vec<String>,
    pub ignored_namespace_prefixes: Vec<String>,
    pub ignored_namespace_suffixes: Vec<String>,
}

impl Default for CollectionRouter {
    fn default() -> Self {
        Self {
            ignored_class_name_prefixes: Vec::new(),
            ignored_class_name_suffixes: vec!["Data".to_string(), "Key".to_string()],
            ignored_namespace_prefixes: Vec::new(),
            ignored_namespace_suffixes: Vec::new(),
        }
    }
}

fn strip_first_match<'a>(value: &'a str, candidates: &[String], prefix: bool) -> &'a str {
    for candidate in candidates {
        if candidate.is_empty() {
            continue;
        }
        if prefix && value.starts_with(candidate.as_str()) {
            return &value[candidate.len()..];
        }
        if !prefix && value.ends_with(candidate.as_str()) {
            return &value[..value.len() - candidate.len()];
        }
    }
    value
}

impl CollectionRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a root type's simple name (and optional module path) to its
    /// backing collection name.
    pub fn collection_for(&self, root_name: &str, namespace: Option<&str>) -> String {
        let after_prefix = strip_first_match(root_name, &self.ignored_class_name_prefixes, true);
        let class_part = strip_first_match(after_prefix, &self.ignored_class_name_suffixes, false);

        match namespace {
            Some(ns) if !ns.is_empty() => {
                let after_ns_prefix = strip_first_match(ns, &self.ignored_namespace_prefixes, true);
                let ns_part = strip_first_match(after_ns_prefix, &self.ignored_namespace_suffixes, false);
                if ns_part.is_empty() {
                    class_part.to_string()
                } else {
                    format!("{}.{}", ns_part, class_part)
                }
            }
            _ => class_part.to_string(),
        }
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod router_tests;

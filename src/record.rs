//! The polymorphic record data model: base fields, the tombstone subtype,
//! and the type-chain registry that stands in for runtime reflection --
//! callers register each concrete record subtype explicitly up front.

use std::collections::{HashMap, HashSet};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::identifier::Identifier;

/// Implemented by every concrete record subtype an application defines.
/// `ANCESTORS` lists the type's ancestry from the polymorphic root down to
/// (but excluding) `TYPE_NAME` itself; an empty slice means this type *is*
/// the root.
pub trait RecordType: Serialize + DeserializeOwned + Send + Sync + 'static {
    const TYPE_NAME: &'static str;
    const ANCESTORS: &'static [&'static str] = &[];

    fn full_chain() -> Vec<String> {
        let mut chain: Vec<String> = Self::ANCESTORS.iter().map(|s| s.to_string()).collect();
        chain.push(Self::TYPE_NAME.to_string());
        chain
    }

    fn root_name() -> &'static str {
        Self::ANCESTORS.first().copied().unwrap_or(Self::TYPE_NAME)
    }
}

/// Reserved discriminator value for tombstones. Never a legal `RecordType::TYPE_NAME`.
pub const TOMBSTONE_DISCRIMINATOR: &str = "__tombstone__";

/// Reserved discriminator value for dataset-descriptor records.
pub const DATASET_DISCRIMINATOR: &str = "__dataset__";

/// Base fields every stored record carries, independent of subtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordMeta {
    pub id: Identifier,
    pub dataset: Identifier,
}

/// A dataset-descriptor record, stored through RecordStore like any other
/// record but with a reserved discriminator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DatasetDescriptor {
    pub name: String,
    pub imports: Vec<Identifier>,
    #[serde(default)]
    pub non_temporal: bool,
}

impl RecordType for DatasetDescriptor {
    const TYPE_NAME: &'static str = DATASET_DISCRIMINATOR;
}

/// Maps each registered leaf type name to its full root-to-leaf ancestry
/// chain. Stands in for the runtime type reflection the original relies on:
/// callers register every `RecordType` they use once, up front.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    chains: HashMap<String, Vec<String>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self { chains: HashMap::new() }
    }

    pub fn register<T: RecordType>(&mut self) {
        self.chains.insert(T::TYPE_NAME.to_string(), T::full_chain());
    }

    pub fn chain_of(&self, leaf: &str) -> Option<&[String]> {
        self.chains.get(leaf).map(|v| v.as_slice())
    }

    pub fn root_of(&self, leaf: &str) -> Option<&str> {
        self.chain_of(leaf).and_then(|c| c.first()).map(|s| s.as_str())
    }

    /// True if a record whose leaf discriminator is `leaf` may be decoded as
    /// the type named `requested`: subtypes sharing a root collection are
    /// assignable to ancestor types including the root.
    pub fn is_assignable(&self, leaf: &str, requested: &str) -> bool {
        if leaf == requested {
            return true;
        }
        self.chain_of(leaf)
            .map(|chain| chain.iter().any(|t| t == requested))
            .unwrap_or(false)
    }

    /// Every registered leaf type name assignable to `requested`, used by
    /// QueryPlanner's Stage A typed probe: a query for a base type must also
    /// match every registered subtype sharing its collection.
    pub fn leaves_assignable_to(&self, requested: &str) -> HashSet<String> {
        self.chains
            .iter()
            .filter(|(_, chain)| chain.iter().any(|t| t == requested))
            .map(|(leaf, _)| leaf.clone())
            .collect()
    }
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod record_tests;

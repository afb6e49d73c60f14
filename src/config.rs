//! Construction-time configuration surface: everything a `DataSource` needs
//! to fix once and never mutate afterwards -- one serde-able options struct
//! with explicit, non-derived defaults where those defaults are non-trivial.

use serde::{Deserialize, Serialize};

use crate::backend::DiscriminatorConvention;
use crate::identifier::Identifier;
use crate::router::CollectionRouter;

/// Gate for `DataSource::drop_database`: only the first three variants may
/// ever be targets of a drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceType {
    Dev,
    User,
    Test,
    Uat,
    Prod,
}

impl InstanceType {
    pub fn allows_drop(self) -> bool {
        matches!(self, InstanceType::Dev | InstanceType::User | InstanceType::Test)
    }
}

impl std::fmt::Display for InstanceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            InstanceType::Dev => "dev",
            InstanceType::User => "user",
            InstanceType::Test => "test",
            InstanceType::Uat => "uat",
            InstanceType::Prod => "prod",
        };
        write!(f, "{}", s)
    }
}

/// Connection descriptor for the backing document store. Kept abstract:
/// this crate ships only the in-process backend, so the only meaningful
/// variant is a path for an optionally-persisted collection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub enum DataStoreDescriptor {
    #[default]
    InMemory,
    OnDisk { root: String },
}

/// Full option surface recognized at `DataSource` construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSourceOptions {
    #[serde(default)]
    pub cutoff: Option<Identifier>,
    #[serde(default)]
    pub freeze_imports: bool,
    #[serde(default = "default_discriminator")]
    pub discriminator: DiscriminatorConvention,
    #[serde(default)]
    pub router: CollectionRouter,
    #[serde(default = "default_instance_type")]
    pub instance_type: InstanceType,
    #[serde(default)]
    pub data_store: DataStoreDescriptor,
}

fn default_discriminator() -> DiscriminatorConvention {
    DiscriminatorConvention::Scalar
}

fn default_instance_type() -> InstanceType {
    InstanceType::Dev
}

impl Default for DataSourceOptions {
    fn default() -> Self {
        Self {
            cutoff: None,
            freeze_imports: false,
            discriminator: default_discriminator(),
            router: CollectionRouter::default(),
            instance_type: default_instance_type(),
            data_store: DataStoreDescriptor::default(),
        }
    }
}

/// Forbidden characters in an assembled database name.
pub const FORBIDDEN_NAME_CHARS: &[char] = &['/', '\\', '.', '"', ' ', '$', '*', '<', '>', ':', '|', '?'];
pub const MAX_NAME_BYTES: usize = 64;

/// Validates a dataset/database name against the forbidden-character set and
/// length limit. Called at every boundary that assembles a name from
/// caller-supplied parts.
pub fn validate_database_name(name: &str) -> Result<(), String> {
    if name.len() > MAX_NAME_BYTES {
        return Err(format!("database name '{}' exceeds {} bytes", name, MAX_NAME_BYTES));
    }
    if let Some(c) = name.chars().find(|c| FORBIDDEN_NAME_CHARS.contains(c)) {
        return Err(format!("database name '{}' contains forbidden character '{}'", name, c));
    }
    Ok(())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;

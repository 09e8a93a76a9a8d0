//! Configuration documents: loading, schema validation, defaulting and
//! resolution into [`RequestSpec`](crate::request::RequestSpec)s.

pub mod coords;
pub mod document;
pub mod profiles;
mod resolver;
pub mod schema;
pub mod template;

use std::path::{Path, PathBuf};

pub use document::{ConfigDocument, ResolvedDocument};
pub use resolver::{ConfigResolver, HarvestArgs};
pub use schema::{SchemaError, SchemaValidator, Strictness, ValidationReport};

/// Where a configuration document comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentSource {
    /// A YAML file. Relative `infile` paths resolve against its directory.
    Path(PathBuf),
    /// An already parsed document. Relative paths resolve against the working directory.
    Value(serde_yaml::Value),
}

impl DocumentSource {
    /// Human-readable origin for error messages.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Path(path) => path.display().to_string(),
            Self::Value(_) => "<in-memory document>".to_string(),
        }
    }
}

impl From<&Path> for DocumentSource {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl From<PathBuf> for DocumentSource {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<serde_yaml::Value> for DocumentSource {
    fn from(value: serde_yaml::Value) -> Self {
        Self::Value(value)
    }
}

//! Domain newtypes with validation
//!
//! Strongly-typed wrappers for rate-limit group names and operation
//! identifiers. Each newtype ensures validity at construction time.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

// ============================================================================
// GroupId
// ============================================================================

/// Name of a rate-limit group (e.g. `core`, `search`)
///
/// Group names are lowercase ASCII letters, digits, `-` and `_`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GroupId(String);

impl GroupId {
    /// Name of the fallback group for unmapped namespaces
    pub const CORE: &'static str = "core";
    /// Name of the group used by the search API
    pub const SEARCH: &'static str = "search";

    /// Create a new GroupId, validating the name
    pub fn new(name: impl Into<String>) -> Result<Self, DomainError> {
        let name = name.into();
        if name.is_empty() {
            return Err(DomainError::InvalidGroupId(
                "group name cannot be empty".to_string(),
            ));
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
        {
            return Err(DomainError::InvalidGroupId(name));
        }
        Ok(Self(name))
    }

    /// The `core` group
    #[must_use]
    pub fn core() -> Self {
        Self(Self::CORE.to_string())
    }

    /// The `search` group
    #[must_use]
    pub fn search() -> Self {
        Self(Self::SEARCH.to_string())
    }

    /// Get the group name as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for GroupId {
    fn default() -> Self {
        Self::core()
    }
}

impl Display for GroupId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for GroupId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for GroupId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<GroupId> for String {
    fn from(id: GroupId) -> Self {
        id.0
    }
}

impl AsRef<str> for GroupId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// OperationId
// ============================================================================

/// Address of a remote operation: `(namespace, name)`
///
/// Rendered and parsed in dotted form, e.g. `repos.createRelease`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OperationId {
    namespace: String,
    name: String,
}

impl OperationId {
    /// Create a new OperationId from its two components
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Result<Self, DomainError> {
        let namespace = namespace.into();
        let name = name.into();
        if namespace.is_empty() || name.is_empty() {
            return Err(DomainError::InvalidOperationId(format!(
                "{namespace}.{name}"
            )));
        }
        if namespace.contains('.') || name.contains('.') {
            return Err(DomainError::InvalidOperationId(format!(
                "{namespace}.{name}"
            )));
        }
        Ok(Self { namespace, name })
    }

    /// The namespace component (e.g. `repos`)
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The operation name component (e.g. `createRelease`)
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Display for OperationId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.namespace, self.name)
    }
}

impl FromStr for OperationId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('.') {
            Some((namespace, name)) => Self::new(namespace, name),
            None => Err(DomainError::InvalidOperationId(s.to_string())),
        }
    }
}

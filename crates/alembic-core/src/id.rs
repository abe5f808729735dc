//! Strongly-typed identifiers.
//!
//! Reagent and reaction ids are shared `Arc<str>` strings. Each `new` call
//! allocates; clones share that allocation, which keeps copying them into
//! candidate sets and state maps cheap.
//! Container and solution ids are opaque integers handed out by the host.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

/// Identifies a reagent (a named chemical substance).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReagentId(Arc<str>);

impl ReagentId {
    /// Create a reagent id from any string-like value.
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReagentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ReagentId {
    fn from(v: &str) -> Self {
        Self::new(v)
    }
}

impl From<String> for ReagentId {
    fn from(v: String) -> Self {
        Self::new(v)
    }
}

impl Borrow<str> for ReagentId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Identifies a reaction definition.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReactionId(Arc<str>);

impl ReactionId {
    /// Create a reaction id from any string-like value.
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ReactionId {
    fn from(v: &str) -> Self {
        Self::new(v)
    }
}

impl From<String> for ReactionId {
    fn from(v: String) -> Self {
        Self::new(v)
    }
}

impl Borrow<str> for ReactionId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Opaque identifier of the entity that owns one or more solutions
/// (a cup, a body, a machine tank).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerId(pub u64);

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ContainerId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Identifies one solution within its container.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SolutionId(pub u32);

impl fmt::Display for SolutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for SolutionId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Fully qualified address of a solution: owning container plus slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SolutionKey {
    /// The owning container.
    pub container: ContainerId,
    /// The solution slot within the container.
    pub solution: SolutionId,
}

impl SolutionKey {
    /// Build a key from raw container and solution ids.
    pub fn new(container: impl Into<ContainerId>, solution: impl Into<SolutionId>) -> Self {
        Self {
            container: container.into(),
            solution: solution.into(),
        }
    }
}

impl fmt::Display for SolutionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.container, self.solution)
    }
}

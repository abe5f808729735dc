//! Mixing categories and the state reported by external mixers.
//!
//! Some reactions only proceed while the solution is being physically
//! agitated (stirred, shaken, centrifuged). Mixers report the categories
//! they currently provide for a container; the evaluator only reads them.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

/// A kind of physical agitation, e.g. `"stir"`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MixingCategory(Arc<str>);

impl MixingCategory {
    /// Create a category from any string-like value.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// The category name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MixingCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MixingCategory {
    fn from(v: &str) -> Self {
        Self::new(v)
    }
}

/// The mixing a reaction needs in order to proceed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MixingRequirement {
    /// Every one of these must be active.
    pub categories: SmallVec<[MixingCategory; 2]>,
    /// If true the requirement is checked on every step, not only when
    /// the reaction starts.
    pub continuous: bool,
}

/// Mixing categories currently active on a container.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MixingState {
    active: SmallVec<[MixingCategory; 2]>,
}

impl MixingState {
    /// No active mixing.
    pub fn none() -> Self {
        Self::default()
    }

    /// Mark a category active.
    pub fn activate(&mut self, category: impl Into<MixingCategory>) {
        let category = category.into();
        if !self.active.contains(&category) {
            self.active.push(category);
        }
    }

    /// Mark a category inactive.
    pub fn deactivate(&mut self, category: &str) {
        self.active.retain(|c| c.as_str() != category);
    }

    /// Whether `category` is active.
    pub fn is_active(&self, category: &str) -> bool {
        self.active.iter().any(|c| c.as_str() == category)
    }

    /// Whether nothing is mixing the container.
    pub fn is_idle(&self) -> bool {
        self.active.is_empty()
    }

    /// Active categories.
    pub fn categories(&self) -> &[MixingCategory] {
        &self.active
    }

    /// Whether every category in `requirement` is active.
    ///
    /// An idle mixer never satisfies a requirement, even an empty one.
    pub fn covers(&self, requirement: &MixingRequirement) -> bool {
        !self.is_idle()
            && requirement
                .categories
                .iter()
                .all(|c| self.active.contains(c))
    }
}

impl<C: Into<MixingCategory>> FromIterator<C> for MixingState {
    fn from_iter<I: IntoIterator<Item = C>>(iter: I) -> Self {
        let mut state = Self::none();
        for c in iter {
            state.activate(c);
        }
        state
    }
}

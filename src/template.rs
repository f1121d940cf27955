//! Known logo templates.
//!
//! Seed templates are loaded at startup and numbered in load order.
//! Harvested templates come from a patch where the logo was detected and are
//! identified by that patch.
//! Priority says how useful a template has been; higher goes first.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::features::FeatureSet;
use crate::patches::PatchId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateIdentity {
    Seed(usize),
    Harvested(PatchId),
}

impl fmt::Display for TemplateIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateIdentity::Seed(index) => write!(f, "seed{}", index),
            TemplateIdentity::Harvested(patch) => write!(f, "{}", patch),
        }
    }
}

/// A template with its precomputed features.
///
/// Equality and hashing look at the identity only, never at pixels or
/// priority. There is no `Ord`: ordering is by priority, which would
/// disagree with identity equality. Use [`LogoTemplate::priority_order`].
#[derive(Debug, Clone)]
pub struct LogoTemplate {
    features: FeatureSet,
    identity: TemplateIdentity,
    pub priority: i32,
}

impl LogoTemplate {
    pub fn seed(index: usize, features: FeatureSet) -> LogoTemplate {
        LogoTemplate {
            features,
            identity: TemplateIdentity::Seed(index),
            priority: 0,
        }
    }

    /// Template extracted from `patch`; `features` must be computed on the
    /// harvested image.
    pub fn harvested(patch: PatchId, features: FeatureSet) -> LogoTemplate {
        LogoTemplate {
            features,
            identity: TemplateIdentity::Harvested(patch),
            priority: 0,
        }
    }

    pub fn features(&self) -> &FeatureSet {
        &self.features
    }

    pub fn identity(&self) -> &TemplateIdentity {
        &self.identity
    }

    pub fn increment_priority(&mut self, delta: i32) {
        self.priority += delta;
    }

    /// Higher priority sorts first.
    pub fn priority_order(&self, other: &LogoTemplate) -> Ordering {
        other.priority.cmp(&self.priority)
    }
}

impl PartialEq for LogoTemplate {
    fn eq(&self, other: &Self) -> bool {
        self.identity == other.identity
    }
}

impl Eq for LogoTemplate {}

impl Hash for LogoTemplate {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity.hash(state);
    }
}

impl fmt::Display for LogoTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (priority {})", self.identity, self.priority)
    }
}

/// Sorts by descending priority; equal priorities keep their current order.
pub fn sort_by_priority(templates: &mut [LogoTemplate]) {
    templates.sort_by(|a, b| a.priority_order(b));
}

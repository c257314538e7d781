//! Consent categories and the preference set a visitor grants.

use serde::{Deserialize, Serialize};

/// Consent categories shown in the banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Strictly necessary storage. Always granted.
    Necessary,
    Analytics,
    Marketing,
    Functional,
}

impl Category {
    pub fn all() -> &'static [Category] {
        &[
            Self::Necessary,
            Self::Analytics,
            Self::Marketing,
            Self::Functional,
        ]
    }

    /// Whether a visitor may turn this category off.
    pub fn is_optional(&self) -> bool {
        !matches!(self, Self::Necessary)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Necessary => write!(f, "necessary"),
            Self::Analytics => write!(f, "analytics"),
            Self::Marketing => write!(f, "marketing"),
            Self::Functional => write!(f, "functional"),
        }
    }
}

/// Raw category flags as a caller submits them.
///
/// `necessary` is accepted so callers can send the full banner form, but it is
/// dropped on conversion into a [`PreferenceSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceFlags {
    #[serde(default = "granted")]
    pub necessary: bool,
    #[serde(default)]
    pub analytics: bool,
    #[serde(default)]
    pub marketing: bool,
    #[serde(default)]
    pub functional: bool,
}

fn granted() -> bool {
    true
}

/// The category grants in effect for a visitor.
///
/// There is no way to represent a revoked `necessary` category: the flag is a
/// constant, serialized as `true`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "PreferenceFlags", from = "PreferenceFlags")]
pub struct PreferenceSet {
    pub analytics: bool,
    pub marketing: bool,
    pub functional: bool,
}

impl PreferenceSet {
    /// Privacy-conservative fallback: only necessary storage.
    pub const fn default_deny() -> Self {
        Self {
            analytics: false,
            marketing: false,
            functional: false,
        }
    }

    /// Every category granted.
    pub const fn all_granted() -> Self {
        Self {
            analytics: true,
            marketing: true,
            functional: true,
        }
    }

    pub const fn necessary(&self) -> bool {
        true
    }

    /// Check whether a category is granted.
    pub fn is_granted(&self, category: Category) -> bool {
        match category {
            Category::Necessary => true,
            Category::Analytics => self.analytics,
            Category::Marketing => self.marketing,
            Category::Functional => self.functional,
        }
    }

    /// Return a copy with one category changed. Changing `Necessary` is a no-op.
    pub fn with(mut self, category: Category, granted: bool) -> Self {
        match category {
            Category::Necessary => {}
            Category::Analytics => self.analytics = granted,
            Category::Marketing => self.marketing = granted,
            Category::Functional => self.functional = granted,
        }
        self
    }

    /// Categories currently granted, in banner order.
    pub fn granted_categories(&self) -> Vec<Category> {
        Category::all()
            .iter()
            .copied()
            .filter(|c| self.is_granted(*c))
            .collect()
    }

    pub fn is_default_deny(&self) -> bool {
        *self == Self::default_deny()
    }
}

impl From<PreferenceFlags> for PreferenceSet {
    fn from(flags: PreferenceFlags) -> Self {
        Self {
            analytics: flags.analytics,
            marketing: flags.marketing,
            functional: flags.functional,
        }
    }
}

impl From<PreferenceSet> for PreferenceFlags {
    fn from(set: PreferenceSet) -> Self {
        Self {
            necessary: set.necessary(),
            analytics: set.analytics,
            marketing: set.marketing,
            functional: set.functional,
        }
    }
}

//! Flag groups: required together, one required, mutually exclusive.
//!
//! Members are selected by flag name or by the [`TargetKey`] of a registered
//! value, which resolves to every flag registered over that target.

use crate::error::{FlagGroupError, FlagbindError, Result};
use crate::flag::{Target, TargetKey};

use super::FlagHandle;

/// Selects the members of a flag group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagSelector {
    /// The flag registered under this name.
    Name(String),
    /// Every flag registered over the target with this key.
    Target(TargetKey),
}

impl From<&str> for FlagSelector {
    fn from(name: &str) -> Self {
        Self::Name(name.to_owned())
    }
}

impl From<String> for FlagSelector {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<TargetKey> for FlagSelector {
    fn from(key: TargetKey) -> Self {
        Self::Target(key)
    }
}

impl<T> From<&Target<T>> for FlagSelector {
    fn from(target: &Target<T>) -> Self {
        Self::Target(target.key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GroupKind {
    RequiredTogether,
    OneRequired,
    MutuallyExclusive,
}

#[derive(Debug, Clone)]
pub(crate) struct FlagGroup {
    pub(crate) kind: GroupKind,
    pub(crate) members: Vec<FlagSelector>,
}

impl FlagGroup {
    /// Resolves the members to flag names among `visible` flags.
    pub(crate) fn resolve(&self, visible: &[FlagHandle]) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for selector in &self.members {
            match selector {
                FlagSelector::Name(name) => {
                    if !visible.iter().any(|flag| flag.name() == name) {
                        return Err(FlagbindError::UnknownFlag { name: name.clone() });
                    }
                    names.push(name.clone());
                }
                FlagSelector::Target(key) => {
                    let before = names.len();
                    names.extend(
                        visible
                            .iter()
                            .filter(|flag| flag.value().target_key() == *key)
                            .map(|flag| flag.name().to_owned()),
                    );
                    if names.len() == before {
                        return Err(FlagbindError::UnknownFlag {
                            name: key.to_string(),
                        });
                    }
                }
            }
        }
        Ok(names)
    }
}

/// Checks one resolved group against the flags set on the command line.
pub(crate) fn validate(
    kind: GroupKind,
    names: &[String],
    visible: &[FlagHandle],
) -> std::result::Result<(), FlagGroupError> {
    let is_set = |name: &String| {
        visible
            .iter()
            .any(|flag| flag.name() == name.as_str() && flag.changed())
    };
    let group = names.join(" ");
    let mut set: Vec<&str> = names.iter().filter(|n| is_set(n)).map(String::as_str).collect();
    let mut unset: Vec<&str> = names.iter().filter(|n| !is_set(n)).map(String::as_str).collect();
    set.sort_unstable();
    unset.sort_unstable();

    match kind {
        GroupKind::RequiredTogether if !set.is_empty() && !unset.is_empty() => {
            Err(FlagGroupError::RequiredTogether {
                group,
                missing: unset.join(" "),
            })
        }
        GroupKind::OneRequired if set.is_empty() => Err(FlagGroupError::OneRequired { group }),
        GroupKind::MutuallyExclusive if set.len() > 1 => Err(FlagGroupError::MutuallyExclusive {
            group,
            set: set.join(" "),
        }),
        _ => Ok(()),
    }
}

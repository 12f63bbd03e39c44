//! Deferred reconciliation of flags against a configuration source.
//!
//! A [`Bound`] value carries the configuration key its flag may be sourced
//! from. At registration it hands out a [`Binder`], which the command runs once
//! per invocation after the command line has been applied and before any
//! user code. The binder gives the command line precedence: a configured
//! value only overwrites the flag when the flag was not set explicitly.

use std::fmt;

use tracing::debug;

use super::{SliceValue, TargetKey, Value};
use crate::command::FlagHandle;
use crate::error::{BindingError, ParseError};
use crate::source::ConfigSource;

/// A one-shot reconciliation action for a registered flag.
pub type Binder = Box<dyn Fn(&FlagHandle, &mut dyn ConfigSource) -> Result<(), BindingError>>;

/// A [`Value`] bound to a configuration key.
///
/// All [`Value`] behaviour is delegated to the wrapped value. An empty
/// `config_key` produces no binder, so the source is never touched.
///
/// # Example
///
/// ```
/// use flagbind::flag::{Bindable, Target, Typed, Value, parser};
///
/// let house = Target::new(String::new());
/// let bound = Typed::new(house, parser::not_empty_trimmed::<String>).bound_to("FAVORITE_HOUSE");
/// assert_eq!(bound.config_key(), "FAVORITE_HOUSE");
/// assert!(bound.bind_to().is_some());
/// ```
#[derive(Clone)]
pub struct Bound<V> {
    value: V,
    config_key: String,
}

impl<V: Value> Bound<V> {
    /// Binds `value` to `config_key`.
    pub fn new(value: V, config_key: impl Into<String>) -> Self {
        Self {
            value,
            config_key: config_key.into(),
        }
    }

    /// Returns the configuration key.
    #[must_use]
    pub fn config_key(&self) -> &str {
        &self.config_key
    }

    /// Returns the wrapped value.
    #[must_use]
    pub const fn inner(&self) -> &V {
        &self.value
    }
}

/// Extension for attaching a configuration key to any [`Value`].
pub trait Bindable: Value + Sized {
    /// Binds this value to `config_key`.
    fn bound_to(self, config_key: impl Into<String>) -> Bound<Self> {
        Bound::new(self, config_key)
    }
}

impl<V: Value> Bindable for V {}

impl<V: Value> fmt::Display for Bound<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.value, f)
    }
}

impl<V: Value> Value for Bound<V> {
    fn set(&self, raw: &str) -> Result<(), ParseError> {
        self.value.set(raw)
    }

    fn type_name(&self) -> String {
        self.value.type_name()
    }

    fn is_bool_flag(&self) -> bool {
        self.value.is_bool_flag()
    }

    fn target_key(&self) -> TargetKey {
        self.value.target_key()
    }

    fn as_slice(&self) -> Option<&dyn SliceValue> {
        self.value.as_slice()
    }

    fn bind_to(&self) -> Option<Binder> {
        if self.config_key.is_empty() {
            return None;
        }
        let config_key = self.config_key.clone();
        Some(Box::new(move |flag, source| reconcile(&config_key, flag, source)))
    }
}

/// Reconciles `flag` with the value `source` holds for `config_key`.
///
/// Presence is probed before the flag is registered as the key's fallback,
/// since registration would otherwise always make the key look present.
fn reconcile(
    config_key: &str,
    flag: &FlagHandle,
    source: &mut dyn ConfigSource,
) -> Result<(), BindingError> {
    let present = source.get(config_key).is_some();

    source
        .bind_flag(config_key, flag)
        .map_err(|err| BindingError::Register {
            key: config_key.to_owned(),
            source: err,
        })?;

    if !present {
        debug!(
            flag = flag.name(),
            key = config_key,
            "no configured value, keeping flag"
        );
        return Ok(());
    }
    if flag.changed() {
        debug!(
            flag = flag.name(),
            key = config_key,
            "flag set on command line, ignoring configured value"
        );
        return Ok(());
    }

    let unmarshal_failed = |err| BindingError::Unmarshal {
        key: config_key.to_owned(),
        source: err,
    };
    if let Some(slice) = flag.value().as_slice() {
        let raws = source.unmarshal_strings(config_key).map_err(unmarshal_failed)?;
        slice.replace(&raws).map_err(|err| BindingError::Replace {
            key: config_key.to_owned(),
            value: format!("{raws:?}"),
            source: err,
        })?;
    } else {
        let raw = source.unmarshal_string(config_key).map_err(unmarshal_failed)?;
        flag.value().set(&raw).map_err(|err| BindingError::Set {
            key: config_key.to_owned(),
            value: raw.clone(),
            source: err,
        })?;
    }
    debug!(flag = flag.name(), key = config_key, "applied configured value");
    Ok(())
}

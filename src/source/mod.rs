//! External configuration sources that bound flags reconcile against.
//!
//! A [`ConfigSource`] is consulted by the binding protocol in a fixed order:
//! the presence probe ([`ConfigSource::get`]) runs before the flag is
//! registered as the key's fallback ([`ConfigSource::bind_flag`]), and the
//! stored value is only decoded when it was present and the flag was not set
//! on the command line.
//!
//! [`Settings`] is the layered implementation used by applications;
//! [`NoConfig`] is a source that never holds anything.

mod settings;

use ortho_config::serde_json::Value;

pub use settings::{Settings, SettingsOptions};

use crate::command::FlagHandle;
use crate::error::SourceError;

/// An external configuration source keyed by configuration keys.
pub trait ConfigSource {
    /// Returns the value held by the source's own layers for `key`.
    ///
    /// Flags registered through [`ConfigSource::bind_flag`] must not make a
    /// key appear present here.
    fn get(&self, key: &str) -> Option<Value>;

    /// Registers `flag` as the fallback provider for `key`.
    ///
    /// # Errors
    ///
    /// Returns a [`SourceError`] when the flag cannot be registered, for
    /// example because `key` is empty.
    fn bind_flag(&mut self, key: &str, flag: &FlagHandle) -> Result<(), SourceError>;

    /// Decodes the value for `key` as a single string.
    ///
    /// # Errors
    ///
    /// Returns a [`SourceError`] when no value is available or the value is a
    /// list or table.
    fn unmarshal_string(&self, key: &str) -> Result<String, SourceError>;

    /// Decodes the value for `key` as an ordered list of strings.
    ///
    /// # Errors
    ///
    /// Returns a [`SourceError`] when no value is available or the value is a
    /// table.
    fn unmarshal_strings(&self, key: &str) -> Result<Vec<String>, SourceError>;
}

/// A source with no configuration at all.
///
/// Binding against it never changes a flag's value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoConfig;

impl ConfigSource for NoConfig {
    fn get(&self, _key: &str) -> Option<Value> {
        None
    }

    fn bind_flag(&mut self, _key: &str, _flag: &FlagHandle) -> Result<(), SourceError> {
        Ok(())
    }

    fn unmarshal_string(&self, key: &str) -> Result<String, SourceError> {
        Err(SourceError::Missing {
            key: key.to_owned(),
        })
    }

    fn unmarshal_strings(&self, key: &str) -> Result<Vec<String>, SourceError> {
        Err(SourceError::Missing {
            key: key.to_owned(),
        })
    }
}

/// Describes the shape of a configuration value for diagnostics.
pub(crate) const fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "table",
    }
}

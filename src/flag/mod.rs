//! Typed flag values and their binding to configuration sources.
//!
//! A [`Value`] adapts a caller-owned [`Target`] cell and a parser into something
//! the command layer can register as a flag: it can be set from a raw string,
//! rendered back to a string, and reports a type tag for help output.
//!
//! - [`Typed`] wraps scalar targets.
//! - [`Slice`] wraps ordered collections with append and replace semantics and
//!   comma-separated encoding.
//! - [`Bound`] attaches a configuration key so the value is reconciled against a
//!   [`ConfigSource`](crate::source::ConfigSource) before the command runs.
//! - [`RegisterOptions`] describes how a value is exposed as a flag.

mod binding;
mod csv;
pub mod parser;
mod register;
mod slice;
mod target;
mod typed;

use std::fmt;

pub use binding::{Bindable, Binder, Bound};
pub use parser::{Parser, SliceParser, SliceTargetParser, TargetParser, parse_slice_of};
pub use register::RegisterOptions;
pub use slice::Slice;
pub use target::{Target, TargetKey};
pub use typed::Typed;

use crate::error::ParseError;

/// A settable, renderable, typed flag value.
///
/// Rendering (via [`fmt::Display`]) is inverse-compatible with [`Value::set`]
/// so that default values shown in help text can be fed back in.
pub trait Value: fmt::Display {
    /// Parses `raw` and stores the result in the target.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] when `raw` is rejected. The target is left
    /// unchanged in that case.
    fn set(&self, raw: &str) -> Result<(), ParseError>;

    /// Returns the human-readable type tag, or an empty string for bool flags.
    fn type_name(&self) -> String;

    /// Returns whether the flag may be given without an explicit argument.
    fn is_bool_flag(&self) -> bool;

    /// Returns the logical key of the underlying target.
    fn target_key(&self) -> TargetKey;

    /// Returns the collection view of this value, if it wraps a collection.
    fn as_slice(&self) -> Option<&dyn SliceValue> {
        None
    }

    /// Produces the reconciliation action for this value, if it is bound to a
    /// configuration key.
    fn bind_to(&self) -> Option<Binder> {
        None
    }
}

/// A [`Value`] over an ordered collection.
pub trait SliceValue: Value {
    /// Parses a single element and appends it to the target.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] when the element is rejected; the target is
    /// left unchanged.
    fn append(&self, raw: &str) -> Result<(), ParseError>;

    /// Parses every element and replaces the target wholesale.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError::Element`] naming the first failing index; the
    /// target is left unchanged.
    fn replace(&self, raws: &[String]) -> Result<(), ParseError>;

    /// Renders each element of the target.
    fn get_slice(&self) -> Vec<String>;
}

/// Derives a type tag from the Rust type name of `T`.
///
/// Primitives keep their name, standard library types use their last path
/// segment (`String` renders as `string`), and other types are qualified by
/// their defining module, e.g. `config.House`.
pub(crate) fn type_tag<T: ?Sized>() -> String {
    qualified_name(std::any::type_name::<T>())
}

/// Like [`type_tag`] but never qualified by module.
pub(crate) fn short_type_tag<T: ?Sized>() -> String {
    let full = std::any::type_name::<T>();
    let (path, generics) = split_generics(full);
    let last = path.rsplit("::").next().unwrap_or(path);
    normalise_std(last, generics)
}

fn qualified_name(full: &str) -> String {
    let (path, generics) = split_generics(full);
    let mut segments = path.rsplit("::");
    let last = segments.next().unwrap_or(path);
    match segments.next() {
        None => normalise_std(last, generics),
        Some(_) if is_std_path(path) => normalise_std(last, generics),
        Some(module) => format!("{module}.{last}{generics}"),
    }
}

fn split_generics(full: &str) -> (&str, &str) {
    full.find('<')
        .map_or((full, ""), |at| full.split_at(at))
}

fn is_std_path(path: &str) -> bool {
    ["std::", "core::", "alloc::"]
        .iter()
        .any(|prefix| path.starts_with(prefix))
}

fn normalise_std(last: &str, generics: &str) -> String {
    if last == "String" && generics.is_empty() {
        String::from("string")
    } else {
        format!("{last}{generics}")
    }
}

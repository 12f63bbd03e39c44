//! Conversions from raw strings into typed values.
//!
//! A [`Parser`] converts one raw string; a [`SliceParser`] converts a list and
//! reports the index of the first element it rejects. Targets that know how to
//! parse themselves implement [`TargetParser`] or [`SliceTargetParser`] instead.

use std::fmt::Display;
use std::rc::Rc;
use std::str::FromStr;

use crate::error::ParseError;

/// Converts a raw string into a `T`.
pub type Parser<T> = Rc<dyn Fn(&str) -> Result<T, ParseError>>;

/// Converts a list of raw strings into a list of `T`.
pub type SliceParser<T> = Rc<dyn Fn(&[String]) -> Result<Vec<T>, ParseError>>;

/// Implemented by target types that parse raw strings into themselves.
pub trait TargetParser {
    /// Parses `raw` into `self`.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] when `raw` is rejected. Implementations must
    /// leave `self` unchanged on error.
    fn parse_target(&mut self, raw: &str) -> Result<(), ParseError>;
}

/// Implemented by element types whose collections parse themselves.
pub trait SliceTargetParser: Sized {
    /// Parses `raws` and replaces the contents of `target`.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] when any element is rejected; `target` must be
    /// left unchanged.
    fn parse_and_replace(target: &mut Vec<Self>, raws: &[String]) -> Result<(), ParseError>;

    /// Parses `raw` and appends it to `target`.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] when `raw` is rejected; `target` must be left
    /// unchanged.
    fn parse_and_append(target: &mut Vec<Self>, raw: &str) -> Result<(), ParseError>;
}

/// Accepts any string that is not empty after trimming, and stores it trimmed.
///
/// # Errors
///
/// Returns [`ParseError::Invalid`] for empty or whitespace-only input.
pub fn not_empty_trimmed<T: From<String>>(raw: &str) -> Result<T, ParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ParseError::invalid(format!(
            "value '{raw}' after trimming is empty"
        )));
    }
    any_string(trimmed)
}

/// Accepts any non-empty string verbatim.
///
/// # Errors
///
/// Returns [`ParseError::Invalid`] for the empty string.
pub fn not_empty<T: From<String>>(raw: &str) -> Result<T, ParseError> {
    if raw.is_empty() {
        return Err(ParseError::invalid(format!("value '{raw}' is empty")));
    }
    any_string(raw)
}

/// Accepts any string verbatim.
///
/// Prefer [`not_empty_trimmed`] or [`not_empty`] so that users cannot
/// accidentally pass blank values.
///
/// # Errors
///
/// Never fails; the signature matches [`Parser`].
pub fn any_string<T: From<String>>(raw: &str) -> Result<T, ParseError> {
    Ok(T::from(raw.to_owned()))
}

/// Parses a boolean using the conventional command-line spellings.
///
/// Accepts `1`, `t`, `T`, `TRUE`, `true`, `True` and their false counterparts
/// `0`, `f`, `F`, `FALSE`, `false`, `False`.
///
/// # Errors
///
/// Returns [`ParseError::Conversion`] for any other input.
pub fn boolean(raw: &str) -> Result<bool, ParseError> {
    match raw {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
        _ => Err(ParseError::Conversion {
            value: raw.to_owned(),
            message: String::from("invalid syntax"),
        }),
    }
}

/// Parses any [`FromStr`] type.
///
/// # Errors
///
/// Returns [`ParseError::Conversion`] carrying the type's own error message.
pub fn from_str<T>(raw: &str) -> Result<T, ParseError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.parse().map_err(|err: T::Err| ParseError::Conversion {
        value: raw.to_owned(),
        message: err.to_string(),
    })
}

/// Lifts an element parser into a [`SliceParser`].
///
/// Elements are parsed in order; the first failure aborts with
/// [`ParseError::Element`] carrying its zero-based index, and no partial
/// result is returned.
pub fn parse_slice_of<T, P>(parser: P) -> SliceParser<T>
where
    T: 'static,
    P: Fn(&str) -> Result<T, ParseError> + 'static,
{
    Rc::new(move |raws: &[String]| -> Result<Vec<T>, ParseError> {
        raws.iter()
            .enumerate()
            .map(|(index, raw)| {
                parser(raw).map_err(|err| ParseError::Element {
                    index,
                    source: Box::new(err),
                })
            })
            .collect()
    })
}

//! Scalar flag values over arbitrary target types.

use std::any::TypeId;
use std::fmt;
use std::rc::Rc;

use super::parser::{self, Parser, TargetParser};
use super::{Target, TargetKey, Value, type_tag};
use crate::error::ParseError;

/// How raw strings reach the target.
enum Strategy<T> {
    /// A parser supplied at construction produces a fresh value.
    External(Parser<T>),
    /// The target parses into itself.
    SelfParsing(fn(&mut T, &str) -> Result<(), ParseError>),
}

impl<T> Clone for Strategy<T> {
    fn clone(&self) -> Self {
        match self {
            Self::External(parser) => Self::External(Rc::clone(parser)),
            Self::SelfParsing(parse) => Self::SelfParsing(*parse),
        }
    }
}

/// A scalar [`Value`] over a [`Target`].
///
/// Construct with [`Typed::new`] and a parser, with [`Typed::self_parsing`] for
/// targets implementing [`TargetParser`], or with [`Typed::boolean`].
///
/// # Example
///
/// ```
/// use flagbind::flag::{Target, Typed, Value, parser};
///
/// let port = Target::new(8080_u16);
/// let value = Typed::new(port.clone(), parser::from_str);
/// value.set("9090").expect("port should parse");
/// assert_eq!(port.get(), 9090);
/// assert_eq!(value.type_name(), "u16");
/// ```
pub struct Typed<T> {
    target: Target<T>,
    strategy: Strategy<T>,
    format: Rc<dyn Fn(&T) -> String>,
    bool_flag: bool,
}

impl<T: fmt::Display + 'static> Typed<T> {
    /// Wraps `target`, converting raw strings with `parser`.
    pub fn new<P>(target: Target<T>, parser: P) -> Self
    where
        P: Fn(&str) -> Result<T, ParseError> + 'static,
    {
        Self::with_strategy(target, Strategy::External(Rc::new(parser)))
    }

    fn with_strategy(target: Target<T>, strategy: Strategy<T>) -> Self {
        Self {
            target,
            strategy,
            format: Rc::new(T::to_string),
            bool_flag: TypeId::of::<T>() == TypeId::of::<bool>(),
        }
    }
}

impl<T: TargetParser + fmt::Display + 'static> Typed<T> {
    /// Wraps a target that parses raw strings into itself.
    #[must_use]
    pub fn self_parsing(target: Target<T>) -> Self {
        Self::with_strategy(target, Strategy::SelfParsing(T::parse_target))
    }
}

impl Typed<bool> {
    /// Wraps a boolean target using [`parser::boolean`].
    #[must_use]
    pub fn boolean(target: Target<bool>) -> Self {
        Self::new(target, parser::boolean)
    }
}

impl<T> Typed<T> {
    /// Replaces the rendering used for help text and [`fmt::Display`].
    #[must_use]
    pub fn formatted_with(mut self, format: impl Fn(&T) -> String + 'static) -> Self {
        self.format = Rc::new(format);
        self
    }

    /// Marks the value as a boolean flag, so it may be given without an
    /// argument. Targets of type `bool` are detected automatically.
    #[must_use]
    pub const fn bool_flag(mut self) -> Self {
        self.bool_flag = true;
        self
    }

    /// Returns the wrapped target.
    #[must_use]
    pub const fn target(&self) -> &Target<T> {
        &self.target
    }
}

impl<T> Clone for Typed<T> {
    fn clone(&self) -> Self {
        Self {
            target: self.target.clone(),
            strategy: self.strategy.clone(),
            format: Rc::clone(&self.format),
            bool_flag: self.bool_flag,
        }
    }
}

impl<T> fmt::Display for Typed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&(self.format)(&self.target.borrow()))
    }
}

impl<T> Value for Typed<T> {
    fn set(&self, raw: &str) -> Result<(), ParseError> {
        match &self.strategy {
            Strategy::External(parser) => {
                let parsed = parser(raw)?;
                self.target.set(parsed);
                Ok(())
            }
            Strategy::SelfParsing(parse) => self.target.update(|target| parse(target, raw)),
        }
    }

    fn type_name(&self) -> String {
        if self.is_bool_flag() {
            return String::new();
        }
        type_tag::<T>()
    }

    fn is_bool_flag(&self) -> bool {
        self.bool_flag
    }

    fn target_key(&self) -> TargetKey {
        self.target.key()
    }
}

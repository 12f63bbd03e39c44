//! Collection flag values with append and replace semantics.

use std::fmt;
use std::rc::Rc;

use super::csv;
use super::parser::{SliceParser, SliceTargetParser};
use super::{SliceValue, Target, TargetKey, Value, short_type_tag};
use crate::error::ParseError;

type ReplaceFn<T> = fn(&mut Vec<T>, &[String]) -> Result<(), ParseError>;
type AppendFn<T> = fn(&mut Vec<T>, &str) -> Result<(), ParseError>;

enum Strategy<T> {
    External(SliceParser<T>),
    SelfParsing {
        replace: ReplaceFn<T>,
        append: AppendFn<T>,
    },
}

impl<T> Clone for Strategy<T> {
    fn clone(&self) -> Self {
        match self {
            Self::External(parser) => Self::External(Rc::clone(parser)),
            Self::SelfParsing { replace, append } => Self::SelfParsing {
                replace: *replace,
                append: *append,
            },
        }
    }
}

/// A [`SliceValue`] over a [`Target`] holding a `Vec<T>`.
///
/// Raw input given to [`Value::set`] is read as a single comma-separated
/// record, after stripping one surrounding pair of `[` `]`, and replaces the
/// target. Rendering is the inverse: elements are joined as a record with
/// quoting where needed. A target that is empty and has never been assigned
/// renders as `<nil>`; once assigned an empty list it renders as `<empty>`.
/// Assignment is tracked by the [`Target`], so it is seen by every value
/// wrapping the same target.
///
/// # Example
///
/// ```
/// use flagbind::flag::{Slice, SliceValue, Target, Value, parse_slice_of, parser};
///
/// let ports = Target::new(Vec::<u16>::new());
/// let value = Slice::new(ports.clone(), parse_slice_of(parser::from_str));
/// assert_eq!(value.to_string(), "<nil>");
///
/// value.set("[80,443]").expect("ports should parse");
/// value.append("8080").expect("port should parse");
/// assert_eq!(ports.get(), vec![80, 443, 8080]);
/// assert_eq!(value.to_string(), "80,443,8080");
/// ```
pub struct Slice<T> {
    target: Target<Vec<T>>,
    strategy: Strategy<T>,
    format: Rc<dyn Fn(&T) -> String>,
}

impl<T: fmt::Display + 'static> Slice<T> {
    /// Wraps `target`, converting raw lists with `parser`.
    ///
    /// Use [`parse_slice_of`](super::parse_slice_of) to lift an element parser.
    #[must_use]
    pub fn new(target: Target<Vec<T>>, parser: SliceParser<T>) -> Self {
        Self::with_strategy(target, Strategy::External(parser))
    }

    fn with_strategy(target: Target<Vec<T>>, strategy: Strategy<T>) -> Self {
        Self {
            target,
            strategy,
            format: Rc::new(T::to_string),
        }
    }
}

impl<T: SliceTargetParser + fmt::Display + 'static> Slice<T> {
    /// Wraps a target whose element type parses collections itself.
    #[must_use]
    pub fn self_parsing(target: Target<Vec<T>>) -> Self {
        Self::with_strategy(
            target,
            Strategy::SelfParsing {
                replace: T::parse_and_replace,
                append: T::parse_and_append,
            },
        )
    }
}

impl<T> Slice<T> {
    /// Replaces the per-element rendering.
    #[must_use]
    pub fn formatted_with(mut self, format: impl Fn(&T) -> String + 'static) -> Self {
        self.format = Rc::new(format);
        self
    }

    /// Returns the wrapped target.
    #[must_use]
    pub const fn target(&self) -> &Target<Vec<T>> {
        &self.target
    }
}

impl<T> Clone for Slice<T> {
    fn clone(&self) -> Self {
        Self {
            target: self.target.clone(),
            strategy: self.strategy.clone(),
            format: Rc::clone(&self.format),
        }
    }
}

impl<T> fmt::Display for Slice<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let empty = self.target.borrow().is_empty();
        match (empty, self.target.assigned()) {
            (true, false) => f.write_str("<nil>"),
            (true, true) => f.write_str("<empty>"),
            (false, _) => f.write_str(&csv::write_record(&self.get_slice())),
        }
    }
}

impl<T> Value for Slice<T> {
    fn set(&self, raw: &str) -> Result<(), ParseError> {
        let opened = raw.strip_prefix('[').unwrap_or(raw);
        let inner = opened.strip_suffix(']').unwrap_or(opened);
        let fields = csv::read_record(inner)?;
        self.replace(&fields)
    }

    fn type_name(&self) -> String {
        format!("[]{}", short_type_tag::<T>())
    }

    fn is_bool_flag(&self) -> bool {
        false
    }

    fn target_key(&self) -> TargetKey {
        self.target.key()
    }

    fn as_slice(&self) -> Option<&dyn SliceValue> {
        Some(self)
    }
}

impl<T> SliceValue for Slice<T> {
    fn append(&self, raw: &str) -> Result<(), ParseError> {
        match &self.strategy {
            Strategy::External(parser) => {
                let added = parser(&[raw.to_owned()])?;
                self.target.update(|items| items.extend(added));
            }
            Strategy::SelfParsing { append, .. } => {
                self.target.update(|items| append(items, raw))?;
            }
        }
        self.target.mark_assigned();
        Ok(())
    }

    fn replace(&self, raws: &[String]) -> Result<(), ParseError> {
        match &self.strategy {
            Strategy::External(parser) => {
                let parsed = parser(raws)?;
                self.target.set(parsed);
            }
            Strategy::SelfParsing { replace, .. } => {
                self.target.update(|items| replace(items, raws))?;
            }
        }
        self.target.mark_assigned();
        Ok(())
    }

    fn get_slice(&self) -> Vec<String> {
        self.target.borrow().iter().map(|item| (self.format)(item)).collect()
    }
}

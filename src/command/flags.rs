//! Registered flags and the handles hooks see at run time.

use std::fmt;
use std::rc::Rc;

use clap::{Arg, ArgAction};

use crate::flag::{RegisterOptions, Value};

/// A flag as seen during one invocation.
///
/// `changed` records whether the flag was given explicitly on the command
/// line.
#[derive(Clone)]
pub struct FlagHandle {
    name: String,
    changed: bool,
    value: Rc<dyn Value>,
}

impl FlagHandle {
    /// Creates a handle for the flag `name`.
    pub fn new(name: impl Into<String>, changed: bool, value: Rc<dyn Value>) -> Self {
        Self {
            name: name.into(),
            changed,
            value,
        }
    }

    /// Returns the flag name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns whether the flag was set explicitly on the command line.
    #[must_use]
    pub const fn changed(&self) -> bool {
        self.changed
    }

    /// Returns the flag's value.
    #[must_use]
    pub fn value(&self) -> &dyn Value {
        &*self.value
    }
}

impl fmt::Debug for FlagHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlagHandle")
            .field("name", &self.name)
            .field("changed", &self.changed)
            .field("value", &self.value.to_string())
            .finish()
    }
}

/// A value registered under a name on a command.
pub(crate) struct Flag {
    pub(crate) name: String,
    pub(crate) shorthand: Option<char>,
    pub(crate) usage: String,
    pub(crate) value: Rc<dyn Value>,
    pub(crate) default_text: String,
    pub(crate) required: bool,
    pub(crate) hidden: bool,
    pub(crate) deprecated: Option<String>,
    pub(crate) no_opt_default: Option<String>,
}

impl Flag {
    pub(crate) fn new(options: &RegisterOptions, value: Rc<dyn Value>) -> Self {
        Self {
            name: options.name.clone(),
            shorthand: options.shorthand,
            usage: options.usage.clone(),
            default_text: value.to_string(),
            value,
            required: false,
            hidden: false,
            deprecated: None,
            no_opt_default: None,
        }
    }

    pub(crate) fn handle(&self, changed: bool) -> FlagHandle {
        FlagHandle::new(self.name.clone(), changed, Rc::clone(&self.value))
    }

    fn help(&self) -> String {
        let trivial = self.default_text.is_empty()
            || (self.value.is_bool_flag() && self.default_text == "false");
        if trivial {
            return self.usage.clone();
        }
        format!("{} (default {})", self.usage, self.default_text)
            .trim_start()
            .to_owned()
    }

    /// Builds the clap argument for this flag.
    ///
    /// Every occurrence is kept so each raw value can be fed to the value in
    /// order. Requiredness is checked after parsing, as clap rejects required
    /// global arguments.
    pub(crate) fn to_arg(&self) -> Arg {
        let mut arg = Arg::new(self.name.clone())
            .long(self.name.clone())
            .action(ArgAction::Append)
            .help(self.help())
            .hide(self.hidden || self.deprecated.is_some());
        if let Some(short) = self.shorthand {
            arg = arg.short(short);
        }
        let type_name = self.value.type_name();
        if !type_name.is_empty() {
            arg = arg.value_name(type_name);
        }
        if let Some(missing) = &self.no_opt_default {
            arg = arg
                .num_args(0..=1)
                .require_equals(true)
                .default_missing_value(missing.clone());
        }
        arg
    }
}

/// The flags registered in one scope of a command.
#[derive(Default)]
pub(crate) struct FlagSet {
    flags: Vec<Flag>,
}

impl FlagSet {
    pub(crate) fn add(&mut self, flag: Flag) {
        self.flags.push(flag);
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Flag> {
        self.flags.iter()
    }

    #[cfg(test)]
    pub(crate) fn lookup(&self, name: &str) -> Option<&Flag> {
        self.flags.iter().find(|flag| flag.name == name)
    }
}

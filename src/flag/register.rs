//! How a value is exposed as a flag on a command.

use crate::command::{Command, Flag, FlagSet};

/// Options accompanying a [`Value`](super::Value) when it is registered as a
/// flag.
///
/// # Example
///
/// ```
/// use flagbind::flag::RegisterOptions;
///
/// let options = RegisterOptions::named("evil")
///     .shorthand('e')
///     .usage("Be evil")
///     .persistent();
/// assert!(options.persistent);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterOptions {
    /// The long flag name, given with a double dash prefix.
    pub name: String,
    /// An optional short flag, given with a single dash prefix.
    pub shorthand: Option<char>,
    /// Describes how to use the flag.
    pub usage: String,
    /// Marks the flag deprecated; the text names the alternative. Deprecated
    /// flags are hidden from help and warn when used.
    pub deprecated: Option<String>,
    /// Hides the flag from help output.
    pub hidden: bool,
    /// Forces the flag to be given on the command line.
    pub required: bool,
    /// Registers the flag as persistent, so sub-commands inherit it and its
    /// binder runs before any of them.
    pub persistent: bool,
}

impl RegisterOptions {
    /// Creates options for a flag called `name`.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets the short flag.
    #[must_use]
    pub const fn shorthand(mut self, shorthand: char) -> Self {
        self.shorthand = Some(shorthand);
        self
    }

    /// Sets the usage text.
    #[must_use]
    pub fn usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = usage.into();
        self
    }

    /// Marks the flag as deprecated in favour of `alternative`.
    #[must_use]
    pub fn deprecated(mut self, alternative: impl Into<String>) -> Self {
        self.deprecated = Some(alternative.into());
        self
    }

    /// Hides the flag from help output.
    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Requires the flag to be given.
    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Registers the flag as persistent.
    #[must_use]
    pub const fn persistent(mut self) -> Self {
        self.persistent = true;
        self
    }

    /// Returns the flag collection matching the requested scope.
    pub(crate) const fn select_flags<'c>(&self, command: &'c mut Command) -> &'c mut FlagSet {
        if self.persistent {
            &mut command.persistent_flags
        } else {
            &mut command.flags
        }
    }

    /// Wires a freshly built flag into `command`.
    ///
    /// A binder produced by the value is scheduled in the hook list matching
    /// the scope. Display attributes are copied onto the flag, and bool flags
    /// accept being given without an argument.
    pub(crate) fn after_registration(&self, command: &mut Command, flag: &mut Flag) {
        if let Some(binder) = flag.value.bind_to() {
            let hooks = if self.persistent {
                &mut command.persistent_pre_run
            } else {
                &mut command.pre_run
            };
            hooks.push_binder(&flag.name, binder);
        }
        flag.deprecated.clone_from(&self.deprecated);
        flag.hidden = self.hidden;
        flag.required = self.required;
        if flag.value.is_bool_flag() {
            flag.no_opt_default = Some(String::from("true"));
        }
    }
}

impl From<&str> for RegisterOptions {
    fn from(name: &str) -> Self {
        Self::named(name)
    }
}

impl From<String> for RegisterOptions {
    fn from(name: String) -> Self {
        Self::named(name)
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::flag::{Bindable, Target, Typed, Value, parser};
    use rstest::rstest;

    fn register(command: &mut Command, value: Rc<dyn Value>, options: &RegisterOptions) {
        let mut flag = Flag::new(options, value);
        options.after_registration(command, &mut flag);
        options.select_flags(command).add(flag);
    }

    #[rstest]
    fn builder_sets_every_field() {
        let options = RegisterOptions::named("house")
            .shorthand('H')
            .usage("Favorite house")
            .deprecated("use --home")
            .hidden()
            .required();
        assert_eq!(options.name, "house");
        assert_eq!(options.shorthand, Some('H'));
        assert_eq!(options.usage, "Favorite house");
        assert_eq!(options.deprecated.as_deref(), Some("use --home"));
        assert!(options.hidden && options.required && !options.persistent);
    }

    #[rstest]
    #[case(false, false)]
    #[case(true, true)]
    fn select_flags_follows_scope(#[case] persistent: bool, #[case] expect_persistent: bool) {
        let mut command = Command::new();
        let options = RegisterOptions {
            persistent,
            ..RegisterOptions::named("some-flag")
        };
        register(&mut command, Rc::new(Typed::boolean(Target::new(false))), &options);
        assert_eq!(command.persistent_flags.lookup("some-flag").is_some(), expect_persistent);
        assert_eq!(command.flags.lookup("some-flag").is_some(), !expect_persistent);
    }

    #[rstest]
    fn bool_flags_accept_missing_argument() {
        let mut command = Command::new();
        let options = RegisterOptions::named("evil");
        register(&mut command, Rc::new(Typed::boolean(Target::new(false))), &options);
        let flag = command.flags.lookup("evil").expect("flag should be registered");
        assert_eq!(flag.no_opt_default.as_deref(), Some("true"));
    }

    #[rstest]
    fn attributes_are_copied_onto_flag() {
        let mut command = Command::new();
        let options = RegisterOptions::named("old").deprecated("use --new").hidden().required();
        let value = Typed::new(Target::new(String::new()), parser::any_string::<String>);
        register(&mut command, Rc::new(value), &options);
        let flag = command.flags.lookup("old").expect("flag should be registered");
        assert_eq!(flag.deprecated.as_deref(), Some("use --new"));
        assert!(flag.hidden && flag.required);
        assert!(flag.no_opt_default.is_none());
    }

    #[rstest]
    #[case(false)]
    #[case(true)]
    fn binder_is_scheduled_in_matching_hook_list(#[case] persistent: bool) {
        let mut command = Command::new();
        let options = RegisterOptions {
            persistent,
            ..RegisterOptions::named("house")
        };
        let value = Typed::new(Target::new(String::new()), parser::any_string::<String>)
            .bound_to("FAVORITE_HOUSE");
        register(&mut command, Rc::new(value), &options);
        assert_eq!(command.persistent_pre_run.len(), usize::from(persistent));
        assert_eq!(command.pre_run.len(), usize::from(!persistent));
    }

    #[rstest]
    fn empty_config_key_schedules_nothing() {
        let mut command = Command::new();
        let value =
            Typed::new(Target::new(String::new()), parser::any_string::<String>).bound_to("");
        register(&mut command, Rc::new(value), &RegisterOptions::named("house"));
        assert_eq!(command.pre_run.len(), 0);
    }
}

//! A thin command tree on top of `clap`.
//!
//! [`Command`] registers typed [`Value`]s as flags, keeps ordered pre-execution
//! hook lists (ordinary and persistent) and flag groups, and runs one
//! invocation against a [`ConfigSource`](crate::source::ConfigSource). The
//! grammar itself is parsed by `clap`; this module records which flags were
//! set explicitly and feeds their raw values to the registered values.

mod execute;
mod flags;
mod groups;
mod hooks;

use std::rc::Rc;

pub use flags::FlagHandle;
pub(crate) use flags::{Flag, FlagSet};
pub use groups::FlagSelector;
use groups::{FlagGroup, GroupKind};
use hooks::Hooks;
pub use hooks::{HookFn, Invocation};

use crate::flag::{RegisterOptions, Value};

/// The run callback of a command.
pub type RunFn = Box<dyn FnMut() -> eyre::Result<()>>;

/// A command with flags, hooks and sub-commands.
///
/// Commands are assembled with consuming builder methods and executed with
/// [`Command::execute`] or [`Command::execute_with_args`].
///
/// # Example
///
/// ```
/// use flagbind::command::Command;
/// use flagbind::flag::{Target, Typed, parser};
/// use flagbind::source::NoConfig;
///
/// let house = Target::new(String::from("Hufflepuff"));
/// let mut command = Command::new()
///     .use_("sorting-hat")
///     .short("Choose a house")
///     .flag(Typed::new(house.clone(), parser::not_empty_trimmed::<String>), "house")
///     .run(|| Ok(()));
///
/// command
///     .execute_with_args(["--house", "Ravenclaw"], &mut NoConfig)
///     .expect("command should run");
/// assert_eq!(house.get(), "Ravenclaw");
/// ```
#[derive(Default)]
pub struct Command {
    name: String,
    use_line: String,
    short: String,
    long: String,
    pub(crate) flags: FlagSet,
    pub(crate) persistent_flags: FlagSet,
    pub(crate) pre_run: Hooks,
    pub(crate) persistent_pre_run: Hooks,
    run: Option<RunFn>,
    commands: Vec<Command>,
    groups: Vec<FlagGroup>,
}

impl Command {
    /// Creates an empty command.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the one-line usage; its first word is the command name.
    #[must_use]
    pub fn use_(mut self, use_line: impl Into<String>) -> Self {
        self.use_line = use_line.into();
        self.name = self
            .use_line
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_owned();
        self
    }

    /// Sets the short description shown in command listings.
    #[must_use]
    pub fn short(mut self, short: impl Into<String>) -> Self {
        self.short = short.into();
        self
    }

    /// Appends a sentence to the long description, on a new line.
    #[must_use]
    pub fn long(self, sentence: &str) -> Self {
        self.append_long(sentence, "\n")
    }

    /// Appends a paragraph to the long description, after a blank line.
    #[must_use]
    pub fn long_paragraph(self, paragraph: &str) -> Self {
        self.append_long(paragraph, "\n\n")
    }

    fn append_long(mut self, addition: &str, separator: &str) -> Self {
        self.long = format!("{}{separator}{addition}", self.long).trim().to_owned();
        self
    }

    /// Returns the command name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the one-line usage.
    #[must_use]
    pub fn use_line(&self) -> &str {
        &self.use_line
    }

    /// Returns the short description.
    #[must_use]
    pub fn short_description(&self) -> &str {
        &self.short
    }

    /// Returns the long description.
    #[must_use]
    pub fn long_description(&self) -> &str {
        &self.long
    }

    /// Registers `value` as a flag.
    ///
    /// If the value is bound to a configuration key, its binder is scheduled
    /// in the pre-execution hooks matching the flag's scope.
    #[must_use]
    pub fn flag(
        mut self,
        value: impl Value + 'static,
        options: impl Into<RegisterOptions>,
    ) -> Self {
        let opts: RegisterOptions = options.into();
        let mut flag = Flag::new(&opts, Rc::new(value));
        opts.after_registration(&mut self, &mut flag);
        opts.select_flags(&mut self).add(flag);
        self
    }

    /// Adds sub-commands.
    #[must_use]
    pub fn add_commands(mut self, commands: impl IntoIterator<Item = Self>) -> Self {
        self.commands.extend(commands);
        self
    }

    /// Sets the run callback, making the command runnable.
    #[must_use]
    pub fn run(mut self, run: impl FnMut() -> eyre::Result<()> + 'static) -> Self {
        self.run = Some(Box::new(run));
        self
    }

    /// Replaces the run callback in place.
    pub fn set_run(&mut self, run: impl FnMut() -> eyre::Result<()> + 'static) {
        self.run = Some(Box::new(run));
    }

    /// Appends a hook run before this command runs.
    #[must_use]
    pub fn add_pre_run(
        mut self,
        hook: impl FnMut(&mut Invocation<'_>) -> eyre::Result<()> + 'static,
    ) -> Self {
        self.pre_run.push_action(Box::new(hook));
        self
    }

    /// Appends a hook run before this command or any of its sub-commands runs.
    #[must_use]
    pub fn add_persistent_pre_run(
        mut self,
        hook: impl FnMut(&mut Invocation<'_>) -> eyre::Result<()> + 'static,
    ) -> Self {
        self.persistent_pre_run.push_action(Box::new(hook));
        self
    }

    /// Requires that if any member is set, all members are set.
    #[must_use]
    pub fn mark_flags_required_together<S: Into<FlagSelector>>(
        self,
        members: impl IntoIterator<Item = S>,
    ) -> Self {
        self.mark(GroupKind::RequiredTogether, members)
    }

    /// Requires that at least one member is set.
    #[must_use]
    pub fn mark_flags_one_required<S: Into<FlagSelector>>(
        self,
        members: impl IntoIterator<Item = S>,
    ) -> Self {
        self.mark(GroupKind::OneRequired, members)
    }

    /// Requires that at most one member is set.
    #[must_use]
    pub fn mark_flags_mutually_exclusive<S: Into<FlagSelector>>(
        self,
        members: impl IntoIterator<Item = S>,
    ) -> Self {
        self.mark(GroupKind::MutuallyExclusive, members)
    }

    fn mark<S: Into<FlagSelector>>(
        mut self,
        kind: GroupKind,
        members: impl IntoIterator<Item = S>,
    ) -> Self {
        self.groups.push(FlagGroup {
            kind,
            members: members.into_iter().map(Into::into).collect(),
        });
        self
    }

    const fn is_runnable(&self) -> bool {
        self.run.is_some()
    }
}

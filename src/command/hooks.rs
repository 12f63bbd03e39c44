//! Ordered pre-execution hooks and the invocation state they receive.

use crate::error::{FlagbindError, Result};
use crate::flag::Binder;
use crate::source::ConfigSource;

use super::FlagHandle;

/// A caller-supplied pre-execution action.
pub type HookFn = Box<dyn FnMut(&mut Invocation<'_>) -> eyre::Result<()>>;

/// State of one command invocation, handed to pre-execution hooks.
pub struct Invocation<'a> {
    command: String,
    flags: Vec<FlagHandle>,
    args: Vec<String>,
    source: &'a mut dyn ConfigSource,
}

impl<'a> Invocation<'a> {
    pub(crate) fn new(
        command: String,
        flags: Vec<FlagHandle>,
        args: Vec<String>,
        source: &'a mut dyn ConfigSource,
    ) -> Self {
        Self {
            command,
            flags,
            args,
            source,
        }
    }

    /// Returns the name of the invoked command.
    #[must_use]
    pub fn command_name(&self) -> &str {
        &self.command
    }

    /// Returns every flag visible to the invoked command.
    #[must_use]
    pub fn flags(&self) -> &[FlagHandle] {
        &self.flags
    }

    /// Looks up a visible flag by name.
    #[must_use]
    pub fn flag(&self, name: &str) -> Option<&FlagHandle> {
        self.flags.iter().find(|flag| flag.name() == name)
    }

    /// Returns whether the flag `name` was set on the command line.
    #[must_use]
    pub fn changed(&self, name: &str) -> bool {
        self.flag(name).is_some_and(FlagHandle::changed)
    }

    /// Returns the positional arguments.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Returns the configuration source bound flags reconcile against.
    pub fn source(&mut self) -> &mut dyn ConfigSource {
        &mut *self.source
    }
}

enum Hook {
    Bind { flag: String, binder: Binder },
    Action(HookFn),
}

/// Pre-execution actions of one command, run in registration order.
///
/// Actions are appended to a list rather than wrapped around each other, so
/// any number of them can share a slot.
#[derive(Default)]
pub(crate) struct Hooks {
    hooks: Vec<Hook>,
}

impl Hooks {
    pub(crate) fn push_binder(&mut self, flag: &str, binder: Binder) {
        self.hooks.push(Hook::Bind {
            flag: flag.to_owned(),
            binder,
        });
    }

    pub(crate) fn push_action(&mut self, action: HookFn) {
        self.hooks.push(Hook::Action(action));
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.hooks.len()
    }

    /// Runs every hook in order, stopping at the first failure.
    pub(crate) fn run(&mut self, invocation: &mut Invocation<'_>) -> Result<()> {
        for hook in &mut self.hooks {
            match hook {
                Hook::Bind { flag, binder } => {
                    let handle = invocation
                        .flag(flag)
                        .cloned()
                        .ok_or_else(|| FlagbindError::UnknownFlag { name: flag.clone() })?;
                    binder(&handle, invocation.source())?;
                }
                Hook::Action(action) => action(invocation).map_err(FlagbindError::Hook)?,
            }
        }
        Ok(())
    }
}

//! Running one invocation of a command tree.

use std::collections::HashSet;
use std::ffi::OsString;

use clap::parser::ValueSource;
use clap::{Arg, ArgAction, ArgMatches};
use tracing::warn;

use super::groups::validate;
use super::{Command, Flag, FlagHandle, Invocation};
use crate::error::{FlagbindError, Result};
use crate::source::ConfigSource;

/// Identifier of the positional arguments of leaf commands.
///
/// Brackets keep it apart from the names flags are registered under.
const ARGS_ID: &str = "[args]";

impl Command {
    /// Executes the command tree with the process arguments.
    ///
    /// # Errors
    ///
    /// See [`Command::execute_with_args`].
    pub fn execute(&mut self, source: &mut dyn ConfigSource) -> Result<()> {
        self.execute_with_args(std::env::args_os().skip(1), source)
    }

    /// Executes the command tree with `args`, which exclude the program name.
    ///
    /// Help and version requests are printed and succeed. Otherwise every
    /// flag given on the command line is applied, flag groups and required
    /// flags are validated, and, for a runnable command, the persistent hooks
    /// of every command from the root down run, followed by the invoked
    /// command's own hooks and its run callback. A command that is not
    /// runnable prints its help instead.
    ///
    /// # Errors
    ///
    /// Returns [`FlagbindError::Usage`] if the arguments do not match the
    /// grammar, [`FlagbindError::InvalidArgument`] if a value is rejected,
    /// a group or required-flag error, a binding error from a bound flag, or
    /// the error of a hook or the run callback.
    pub fn execute_with_args<I, S>(
        &mut self,
        args: I,
        source: &mut dyn ConfigSource,
    ) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.check_definition(&HashSet::new(), &HashSet::new())?;

        let mut app = self.to_clap();
        let argv = std::iter::once(OsString::from(self.name.clone()))
            .chain(args.into_iter().map(Into::into));
        let matches = match app.try_get_matches_from_mut(argv) {
            Ok(matches) => matches,
            Err(err) if !err.use_stderr() => {
                err.print()?;
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };

        let (path, leaf_matches) = self.walk(&matches)?;
        let (handles, positional) = self.apply_command_line(&path, leaf_matches)?;
        self.check_flags(&path, &handles)?;

        let leaf = self.descend(&path)?;
        if !leaf.is_runnable() {
            let mut help = app;
            for name in &path {
                help = help
                    .find_subcommand(name)
                    .cloned()
                    .ok_or_else(|| unknown_command(name))?;
            }
            help.print_help()?;
            return Ok(());
        }

        let mut invocation = Invocation::new(leaf.name.clone(), handles, positional, source);
        self.run_hooks(&path, &mut invocation)
    }

    fn to_clap(&self) -> clap::Command {
        let mut app = clap::Command::new(self.name.clone());
        if !self.short.is_empty() {
            app = app.about(self.short.clone());
        }
        if !self.long.is_empty() {
            app = app.long_about(self.long.clone());
        }
        for flag in self.persistent_flags.iter() {
            app = app.arg(flag.to_arg().global(true));
        }
        for flag in self.flags.iter() {
            app = app.arg(flag.to_arg());
        }
        if self.commands.is_empty() {
            app = app.arg(
                Arg::new(ARGS_ID)
                    .value_name("ARGS")
                    .num_args(0..)
                    .action(ArgAction::Append),
            );
        }
        for command in &self.commands {
            app = app.subcommand(command.to_clap());
        }
        app
    }

    /// Rejects trees clap would refuse to build.
    ///
    /// Persistent flags stay visible below the command that registers them,
    /// so their names and shorthands are passed down to every sub-command.
    fn check_definition(
        &self,
        inherited: &HashSet<String>,
        inherited_shorthands: &HashSet<char>,
    ) -> Result<()> {
        let invalid = |reason: String| FlagbindError::InvalidDefinition {
            command: self.name.clone(),
            reason,
        };
        if self.name.is_empty() {
            return Err(invalid(String::from(
                "the use line must start with the command name",
            )));
        }

        let mut visible = inherited.clone();
        let mut shorthands = inherited_shorthands.clone();
        for flag in self.persistent_flags.iter().chain(self.flags.iter()) {
            if flag.name.is_empty() {
                return Err(invalid(String::from("a flag was registered without a name")));
            }
            if flag.name == ARGS_ID {
                return Err(invalid(format!("flag name '{ARGS_ID}' is reserved")));
            }
            if flag.name == "help" || flag.shorthand == Some('h') {
                return Err(invalid(format!(
                    "flag '{}' clashes with the help flag",
                    flag.name
                )));
            }
            if !visible.insert(flag.name.clone()) {
                return Err(invalid(format!("flag '{}' is registered twice", flag.name)));
            }
            if let Some(short) = flag.shorthand {
                if !shorthands.insert(short) {
                    return Err(invalid(format!(
                        "shorthand '-{short}' of flag '{}' is already in use",
                        flag.name
                    )));
                }
            }
        }

        let mut names = HashSet::new();
        let mut children_inherit = inherited.clone();
        children_inherit.extend(self.persistent_flags.iter().map(|flag| flag.name.clone()));
        let mut children_shorthands = inherited_shorthands.clone();
        children_shorthands.extend(self.persistent_flags.iter().filter_map(|flag| flag.shorthand));
        for command in &self.commands {
            if command.name == "help" {
                return Err(invalid(String::from(
                    "sub-command 'help' clashes with the help command",
                )));
            }
            if !names.insert(command.name.as_str()) {
                return Err(invalid(format!(
                    "sub-command '{}' is added twice",
                    command.name
                )));
            }
            command.check_definition(&children_inherit, &children_shorthands)?;
        }
        Ok(())
    }

    /// Follows the matched sub-commands down to the invoked command.
    fn walk<'m>(&self, matches: &'m ArgMatches) -> Result<(Vec<String>, &'m ArgMatches)> {
        let mut path = Vec::new();
        let mut current = matches;
        while let Some((name, sub_matches)) = current.subcommand() {
            path.push(name.to_owned());
            current = sub_matches;
        }
        self.descend(&path)?;
        Ok((path, current))
    }

    fn descend(&self, path: &[String]) -> Result<&Self> {
        let mut command = self;
        for name in path {
            command = command.child(name).ok_or_else(|| unknown_command(name))?;
        }
        Ok(command)
    }

    fn child(&self, name: &str) -> Option<&Self> {
        self.commands.iter().find(|command| command.name == name)
    }

    fn child_mut(&mut self, name: &str) -> Option<&mut Self> {
        self.commands.iter_mut().find(|command| command.name == name)
    }

    /// Returns every flag visible to the command at `path`: the persistent
    /// flags of the command and its ancestors, then its own flags.
    fn visible_flags(&self, path: &[String]) -> Result<Vec<&Flag>> {
        let mut flags: Vec<&Flag> = self.persistent_flags.iter().collect();
        let mut command = self;
        for name in path {
            command = command.child(name).ok_or_else(|| unknown_command(name))?;
            flags.extend(command.persistent_flags.iter());
        }
        flags.extend(command.flags.iter());
        Ok(flags)
    }

    /// Feeds every explicitly given raw value to its flag.
    fn apply_command_line(
        &self,
        path: &[String],
        matches: &ArgMatches,
    ) -> Result<(Vec<FlagHandle>, Vec<String>)> {
        let mut handles = Vec::new();
        for flag in self.visible_flags(path)? {
            let changed = matches.value_source(&flag.name) == Some(ValueSource::CommandLine);
            if changed {
                if let Some(alternative) = &flag.deprecated {
                    warn!(
                        flag = %flag.name,
                        "Flag --{} has been deprecated, {alternative}",
                        flag.name
                    );
                }
                let raws = matches.try_get_raw(&flag.name).ok().flatten();
                for raw in raws.into_iter().flatten() {
                    let text = raw.to_string_lossy();
                    flag.value
                        .set(&text)
                        .map_err(|source| FlagbindError::InvalidArgument {
                            flag: flag.name.clone(),
                            value: String::from(text.as_ref()),
                            source,
                        })?;
                }
            }
            handles.push(flag.handle(changed));
        }

        let positional = matches
            .try_get_raw(ARGS_ID)
            .ok()
            .flatten()
            .into_iter()
            .flatten()
            .map(|raw| raw.to_string_lossy().into_owned())
            .collect();
        Ok((handles, positional))
    }

    /// Checks required flags and the flag groups of every command on `path`.
    ///
    /// Groups of ancestors only apply when all their members are visible to
    /// the invoked command.
    fn check_flags(&self, path: &[String], handles: &[FlagHandle]) -> Result<()> {
        let missing: Vec<String> = self
            .visible_flags(path)?
            .into_iter()
            .filter(|flag| flag.required)
            .filter(|flag| !handles.iter().any(|h| h.name() == flag.name && h.changed()))
            .map(|flag| format!("\"{}\"", flag.name))
            .collect();
        if !missing.is_empty() {
            return Err(FlagbindError::MissingRequired {
                flags: missing.join(", "),
            });
        }

        let leaf = self.descend(path)?;
        let mut command = self;
        let mut remaining = path.iter();
        loop {
            let is_leaf = std::ptr::eq(command, leaf);
            for group in &command.groups {
                match group.resolve(handles) {
                    Ok(names) => validate(group.kind, &names, handles)?,
                    Err(err) if is_leaf => return Err(err),
                    Err(_) => {}
                }
            }
            let Some(name) = remaining.next() else {
                return Ok(());
            };
            command = command.child(name).ok_or_else(|| unknown_command(name))?;
        }
    }

    /// Runs persistent hooks root to leaf, then the leaf's hooks and run
    /// callback.
    fn run_hooks(&mut self, path: &[String], invocation: &mut Invocation<'_>) -> Result<()> {
        let mut command = self;
        command.persistent_pre_run.run(invocation)?;
        for name in path {
            command = command.child_mut(name).ok_or_else(|| unknown_command(name))?;
            command.persistent_pre_run.run(invocation)?;
        }
        command.pre_run.run(invocation)?;
        if let Some(run) = command.run.as_mut() {
            run().map_err(FlagbindError::Run)?;
        }
        Ok(())
    }
}

fn unknown_command(name: &str) -> FlagbindError {
    FlagbindError::InvalidDefinition {
        command: name.to_owned(),
        reason: String::from("matched a sub-command that is not registered"),
    }
}

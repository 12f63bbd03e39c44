//! `flagbind` demonstration entry point.
//!
//! A small sorting-hat command showing flags bound to configuration keys.
//! Every bound flag can be supplied, from highest to lowest precedence, on the
//! command line, through a `FLAGBIND_*` environment variable, or in the
//! configuration file (`~/.config/flagbind/config.toml` or the path in
//! `FLAGBIND_CONFIG_PATH`).
//!
//! Logging is controlled through `RUST_LOG`, e.g. `RUST_LOG=flagbind=debug`.

use std::io::{self, Write};

use eyre::{Report, Result as EyreResult};
use flagbind::command::Command;
use flagbind::flag::{Bindable, RegisterOptions, Slice, Target, Typed, parse_slice_of, parser};
use flagbind::source::{Settings, SettingsOptions};
use mockable::DefaultEnv;
use tracing_subscriber::EnvFilter;

/// Application entry point.
///
/// Builds the layered settings, discovers the configuration file, and executes
/// the command tree against them. Errors are converted to `eyre::Report` at
/// this boundary.
fn main() -> EyreResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let options = SettingsOptions {
        env_prefix: Some(String::from("FLAGBIND")),
        ..SettingsOptions::default()
    };
    let mut settings = Settings::with_options(DefaultEnv::new(), options);
    settings
        .discover_config_file("flagbind")
        .map_err(Report::from)?;

    sorting_hat().execute(&mut settings).map_err(Report::from)
}

/// Builds the demo command tree.
fn sorting_hat() -> Command {
    let house = Target::new(String::from("Hufflepuff"));
    let evil = Target::new(false);
    let friends = Target::new(Vec::<String>::new());
    let password = Target::new(String::new());

    let chamber = Command::new()
        .use_("secret-chamber")
        .short("Open the secret chamber")
        .flag(
            Typed::new(password.clone(), parser::not_empty_trimmed::<String>)
                .bound_to("CHAMBER_PASSWORD"),
            RegisterOptions::named("password").usage("Password of the chamber"),
        )
        .run(open_chamber(evil.clone(), password));

    Command::new()
        .use_("flagbind")
        .short("Sort students into houses")
        .long("Picks a house for the student.")
        .long_paragraph(
            "Flags may also be set through FLAGBIND_* environment variables or the \
             configuration file.",
        )
        .flag(
            Typed::new(house.clone(), parser::not_empty_trimmed::<String>)
                .bound_to("FAVORITE_HOUSE"),
            RegisterOptions::named("house").shorthand('H').usage("Favorite house"),
        )
        .flag(
            Typed::boolean(evil.clone()).bound_to("IS_EVIL"),
            RegisterOptions::named("evil")
                .shorthand('e')
                .usage("Be evil")
                .persistent(),
        )
        .flag(
            Slice::new(friends.clone(), parse_slice_of(parser::not_empty_trimmed::<String>))
                .bound_to("FRIENDS"),
            RegisterOptions::named("friends").usage("Friends to be sorted alongside"),
        )
        .run(move || {
            let mut out = io::stdout().lock();
            let chosen = if evil.get() {
                String::from("Slytherin")
            } else {
                house.get()
            };
            writeln!(out, "Welcome to {chosen}!")?;
            for friend in friends.borrow().iter() {
                writeln!(out, "{friend} joins you.")?;
            }
            Ok(())
        })
        .add_commands([chamber])
}

fn open_chamber(evil: Target<bool>, password: Target<String>) -> impl FnMut() -> EyreResult<()> {
    move || {
        let mut out = io::stdout().lock();
        if !evil.get() {
            writeln!(out, "Only the heir may open the chamber.")?;
            return Ok(());
        }
        if password.borrow().is_empty() {
            return Err(eyre::eyre!("the chamber needs a password"));
        }
        writeln!(out, "The chamber opens.")?;
        Ok(())
    }
}

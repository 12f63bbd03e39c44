//! Layered configuration backed by environment variables and TOML files.
//!
//! Values are looked up (highest to lowest) in explicit overrides, the
//! environment, the configuration file, and registered defaults. Keys are
//! case-insensitive; nested tables in the configuration file are addressed
//! with the key delimiter, e.g. `engine.socket`.

use std::collections::HashMap;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use mockable::{DefaultEnv, Env};
use ortho_config::discovery::ConfigDiscovery;
use ortho_config::serde_json::{Map, Value};
use ortho_config::toml;
use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;
use tracing::debug;

use super::{ConfigSource, kind_of};
use crate::command::FlagHandle;
use crate::error::SourceError;

/// Options controlling how [`Settings`] maps keys onto its layers.
///
/// Missing fields take their defaults when deserialized.
#[derive(Debug, Clone, PartialEq, Eq, SmartDefault, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsOptions {
    /// Prefix prepended (with `_`) to every environment variable name.
    pub env_prefix: Option<String>,

    /// Whether keys are looked up in the environment at all.
    #[default = true]
    pub automatic_env: bool,

    /// Whether an environment variable set to the empty string counts as a
    /// value. When disabled it is treated as unset.
    pub allow_empty_env: bool,

    /// Separator between the segments of a nested key.
    #[default = "."]
    pub key_delimiter: String,
}

/// A layered [`ConfigSource`].
///
/// Environment access goes through [`mockable::Env`] so tests can substitute
/// a mock.
///
/// # Example
///
/// ```
/// use flagbind::source::{ConfigSource, Settings};
/// use mockable::DefaultEnv;
///
/// let mut settings = Settings::new(DefaultEnv::new());
/// settings.set_default("house", "Hufflepuff");
/// settings
///     .read_config_str("[engine]\nsocket = \"/run/podman.sock\"\n")
///     .expect("inline configuration should parse");
///
/// assert_eq!(
///     settings.unmarshal_string("engine.socket").ok().as_deref(),
///     Some("/run/podman.sock")
/// );
/// ```
pub struct Settings<E: Env = DefaultEnv> {
    env: E,
    options: SettingsOptions,
    overrides: HashMap<String, Value>,
    file: Map<String, Value>,
    config_file: Option<Utf8PathBuf>,
    defaults: HashMap<String, Value>,
    flags: HashMap<String, FlagHandle>,
}

impl<E: Env> Settings<E> {
    /// Creates empty settings reading the environment through `env`.
    #[must_use]
    pub fn new(env: E) -> Self {
        Self::with_options(env, SettingsOptions::default())
    }

    /// Creates empty settings with explicit options.
    #[must_use]
    pub fn with_options(env: E, options: SettingsOptions) -> Self {
        Self {
            env,
            options,
            overrides: HashMap::new(),
            file: Map::new(),
            config_file: None,
            defaults: HashMap::new(),
            flags: HashMap::new(),
        }
    }

    /// Returns the options in effect.
    #[must_use]
    pub const fn options(&self) -> &SettingsOptions {
        &self.options
    }

    /// Returns the path of the configuration file last read, if any.
    #[must_use]
    pub fn config_file(&self) -> Option<&Utf8Path> {
        self.config_file.as_deref()
    }

    /// Sets an override for `key`, which takes precedence over every other
    /// layer.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.overrides.insert(normalise(key), value.into());
    }

    /// Sets the lowest-precedence default for `key`.
    pub fn set_default(&mut self, key: &str, value: impl Into<Value>) {
        self.defaults.insert(normalise(key), value.into());
    }

    /// Returns the environment variable consulted for `key`.
    ///
    /// The key is upper-cased, `.`, `-` and the key delimiter become `_`, and
    /// the configured prefix is prepended.
    #[must_use]
    pub fn env_var_name(&self, key: &str) -> String {
        let delimiter = self.options.key_delimiter.as_str();
        let mut name = key.to_uppercase();
        if !delimiter.is_empty() {
            name = name.replace(delimiter, "_");
        }
        name = name.replace(['.', '-'], "_");
        match self.options.env_prefix.as_deref() {
            Some(prefix) if !prefix.is_empty() => format!("{}_{name}", prefix.to_uppercase()),
            _ => name,
        }
    }

    /// Reads a TOML configuration file, replacing any previously read file.
    ///
    /// Uses `cap_std::fs_utf8` and opens the file's parent directory with
    /// ambient authority.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::FileRead`] if the file cannot be read, or
    /// [`SourceError::FileParse`] if it is not a TOML table.
    pub fn read_config_file(&mut self, path: &Utf8Path) -> Result<(), SourceError> {
        let parent = match path.parent() {
            Some(dir) if !dir.as_str().is_empty() => dir,
            _ => Utf8Path::new("."),
        };
        let file_name = path.file_name().unwrap_or(path.as_str());

        let dir = Dir::open_ambient_dir(parent, ambient_authority()).map_err(|e| {
            SourceError::FileRead {
                path: path.to_path_buf(),
                message: format!("failed to open directory {parent}: {e}"),
            }
        })?;
        let content = dir
            .read_to_string(file_name)
            .map_err(|e| SourceError::FileRead {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        self.file = parse_table(&content, path)?;
        self.config_file = Some(path.to_path_buf());
        debug!(path = %path, "loaded configuration file");
        Ok(())
    }

    /// Reads TOML configuration from a string, replacing any previously read
    /// file.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::FileParse`] if `content` is not a TOML table.
    pub fn read_config_str(&mut self, content: &str) -> Result<(), SourceError> {
        self.file = parse_table(content, Utf8Path::new("<string>"))?;
        self.config_file = None;
        Ok(())
    }

    /// Discovers and reads the configuration file for `app`.
    ///
    /// Candidates are `$<APP>_CONFIG_PATH`, then `config.toml` and
    /// `.<app>.toml` in the usual configuration directories. The first
    /// existing candidate is read.
    ///
    /// # Errors
    ///
    /// Returns a [`SourceError`] if the discovered file cannot be read or
    /// parsed.
    pub fn discover_config_file(&mut self, app: &str) -> Result<Option<Utf8PathBuf>, SourceError> {
        let env_var = format!("{}_CONFIG_PATH", app.to_uppercase().replace('-', "_"));
        let dotfile = format!(".{app}.toml");
        let discovery = ConfigDiscovery::builder(app)
            .env_var(env_var.as_str())
            .config_file_name("config.toml")
            .dotfile_name(dotfile.as_str())
            .build();
        let found = discovery
            .candidates()
            .into_iter()
            .filter(|p| p.exists())
            .find_map(|p| Utf8PathBuf::try_from(p).ok());

        if let Some(path) = &found {
            self.read_config_file(path)?;
        }
        Ok(found)
    }

    /// Resolves `key` across every layer, including bound flags.
    ///
    /// Precedence, highest first: overrides, flags set on the command line,
    /// environment, configuration file, defaults, and finally the current
    /// value of a bound flag.
    #[must_use]
    pub fn resolve(&self, key: &str) -> Option<Value> {
        if key.is_empty() {
            return None;
        }
        let normalised = normalise(key);
        let flag = self.flags.get(&normalised);
        self.overrides
            .get(&normalised)
            .cloned()
            .or_else(|| flag.filter(|f| f.changed()).map(flag_value))
            .or_else(|| self.lookup_env(key))
            .or_else(|| self.lookup_file(&normalised))
            .or_else(|| self.defaults.get(&normalised).cloned())
            .or_else(|| flag.map(flag_value))
    }

    fn lookup_layers(&self, key: &str) -> Option<Value> {
        if key.is_empty() {
            return None;
        }
        let normalised = normalise(key);
        self.overrides
            .get(&normalised)
            .cloned()
            .or_else(|| self.lookup_env(key))
            .or_else(|| self.lookup_file(&normalised))
            .or_else(|| self.defaults.get(&normalised).cloned())
    }

    fn lookup_env(&self, key: &str) -> Option<Value> {
        if !self.options.automatic_env {
            return None;
        }
        let value = self.env.string(&self.env_var_name(key))?;
        if value.is_empty() && !self.options.allow_empty_env {
            return None;
        }
        Some(Value::String(value))
    }

    fn lookup_file(&self, normalised: &str) -> Option<Value> {
        let delimiter = self.options.key_delimiter.as_str();
        let mut segments: Vec<&str> = if delimiter.is_empty() {
            vec![normalised]
        } else {
            normalised.split(delimiter).collect()
        };
        let last = segments.pop()?;
        let mut table = &self.file;
        for segment in segments {
            match find_ignoring_case(table, segment)? {
                Value::Object(nested) => table = nested,
                _ => return None,
            }
        }
        find_ignoring_case(table, last).cloned()
    }
}

impl Default for Settings<DefaultEnv> {
    fn default() -> Self {
        Self::new(DefaultEnv::new())
    }
}

impl<E: Env> ConfigSource for Settings<E> {
    fn get(&self, key: &str) -> Option<Value> {
        self.lookup_layers(key)
    }

    fn bind_flag(&mut self, key: &str, flag: &FlagHandle) -> Result<(), SourceError> {
        if key.is_empty() {
            return Err(SourceError::EmptyKey);
        }
        self.flags.insert(normalise(key), flag.clone());
        Ok(())
    }

    fn unmarshal_string(&self, key: &str) -> Result<String, SourceError> {
        let value = self.resolve(key).ok_or_else(|| missing(key))?;
        match value {
            Value::Null => Ok(String::new()),
            Value::String(text) => Ok(text),
            Value::Bool(flag) => Ok(flag.to_string()),
            Value::Number(number) => Ok(number.to_string()),
            other @ (Value::Array(_) | Value::Object(_)) => Err(SourceError::Unmarshal {
                key: key.to_owned(),
                expected: "string",
                found: kind_of(&other).to_owned(),
            }),
        }
    }

    fn unmarshal_strings(&self, key: &str) -> Result<Vec<String>, SourceError> {
        let value = self.resolve(key).ok_or_else(|| missing(key))?;
        let unexpected = |found: &Value| SourceError::Unmarshal {
            key: key.to_owned(),
            expected: "list of strings",
            found: kind_of(found).to_owned(),
        };
        match value {
            Value::Null => Ok(Vec::new()),
            Value::String(text) if text.is_empty() => Ok(Vec::new()),
            Value::String(text) => Ok(text.split(',').map(str::to_owned).collect()),
            Value::Bool(flag) => Ok(vec![flag.to_string()]),
            Value::Number(number) => Ok(vec![number.to_string()]),
            Value::Array(items) => items
                .iter()
                .map(|item| scalar_text(item).ok_or_else(|| unexpected(item)))
                .collect(),
            other @ Value::Object(_) => Err(unexpected(&other)),
        }
    }
}

fn normalise(key: &str) -> String {
    key.to_lowercase()
}

fn missing(key: &str) -> SourceError {
    SourceError::Missing {
        key: key.to_owned(),
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        Value::String(text) => Some(text.clone()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Number(number) => Some(number.to_string()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

fn flag_value(flag: &FlagHandle) -> Value {
    let value = flag.value();
    value.as_slice().map_or_else(
        || Value::String(value.to_string()),
        |slice| Value::Array(slice.get_slice().into_iter().map(Value::String).collect()),
    )
}

fn find_ignoring_case<'a>(table: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    table.get(key).or_else(|| {
        table
            .iter()
            .find(|(name, _)| name.to_lowercase() == key)
            .map(|(_, value)| value)
    })
}

fn parse_table(content: &str, path: &Utf8Path) -> Result<Map<String, Value>, SourceError> {
    let parsed = toml::from_str::<Value>(content).map_err(|e| SourceError::FileParse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    match parsed {
        Value::Object(table) => Ok(table),
        other => Err(SourceError::FileParse {
            path: path.to_path_buf(),
            message: format!("expected a table at the top level, found {}", kind_of(&other)),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::flag::{Slice, Target, Typed, parse_slice_of, parser};
    use mockable::MockEnv;
    use rstest::{fixture, rstest};

    fn env_with(pairs: &[(&str, &str)]) -> MockEnv {
        let vars: Vec<(String, String)> = pairs
            .iter()
            .map(|(name, value)| ((*name).to_owned(), (*value).to_owned()))
            .collect();
        let mut env = MockEnv::new();
        env.expect_string().returning(move |key| {
            vars.iter()
                .find(|(name, _)| name == key)
                .map(|(_, value)| value.clone())
        });
        env
    }

    /// Fixture providing settings over an empty environment.
    #[fixture]
    fn empty_settings() -> Settings<MockEnv> {
        Settings::new(env_with(&[]))
    }

    fn string_flag(name: &str, initial: &str, changed: bool) -> FlagHandle {
        let value = Typed::new(Target::new(initial.to_owned()), parser::any_string::<String>);
        FlagHandle::new(name, changed, Rc::new(value))
    }

    #[rstest]
    fn options_default_to_automatic_env_with_dot_delimiter() {
        let options = SettingsOptions::default();
        assert!(options.automatic_env);
        assert!(!options.allow_empty_env);
        assert_eq!(options.key_delimiter, ".");
        assert_eq!(options.env_prefix, None);
    }

    #[rstest]
    fn options_deserialize_with_defaults_for_missing_fields() {
        let options: SettingsOptions =
            toml::from_str("env_prefix = \"hat\"\nkey_delimiter = \"::\"\n")
                .expect("options should deserialize");
        assert_eq!(options.env_prefix.as_deref(), Some("hat"));
        assert_eq!(options.key_delimiter, "::");
        assert!(options.automatic_env);
        assert!(!options.allow_empty_env);
    }

    #[rstest]
    #[case(None, "some_val", "SOME_VAL")]
    #[case(None, "engine.socket", "ENGINE_SOCKET")]
    #[case(None, "favorite-house", "FAVORITE_HOUSE")]
    #[case(Some("flagbind"), "is_evil", "FLAGBIND_IS_EVIL")]
    fn env_var_name_is_derived_from_key(
        #[case] prefix: Option<&str>,
        #[case] key: &str,
        #[case] expected: &str,
    ) {
        let options = SettingsOptions {
            env_prefix: prefix.map(str::to_owned),
            ..SettingsOptions::default()
        };
        let settings = Settings::with_options(env_with(&[]), options);
        assert_eq!(settings.env_var_name(key), expected);
    }

    #[rstest]
    fn env_value_is_present() {
        let settings = Settings::new(env_with(&[("SOME_VAL", "some-value")]));
        assert_eq!(settings.get("SOME_VAL"), Some(Value::from("some-value")));
        assert_eq!(settings.get("some_val"), Some(Value::from("some-value")));
    }

    #[rstest]
    fn empty_env_value_counts_as_absent_by_default() {
        let settings = Settings::new(env_with(&[("SOME_VAL", "")]));
        assert!(settings.get("SOME_VAL").is_none());
    }

    #[rstest]
    fn empty_env_value_is_kept_when_allowed() {
        let options = SettingsOptions {
            allow_empty_env: true,
            ..SettingsOptions::default()
        };
        let settings = Settings::with_options(env_with(&[("SOME_VAL", "")]), options);
        assert_eq!(settings.get("SOME_VAL"), Some(Value::from("")));
    }

    #[rstest]
    fn env_is_ignored_without_automatic_env() {
        let options = SettingsOptions {
            automatic_env: false,
            ..SettingsOptions::default()
        };
        let settings = Settings::with_options(env_with(&[("SOME_VAL", "x")]), options);
        assert!(settings.get("SOME_VAL").is_none());
    }

    #[rstest]
    fn layers_follow_precedence() {
        let mut settings = Settings::new(env_with(&[("HOUSE", "Gryffindor")]));
        settings.set_default("house", "Hufflepuff");
        settings
            .read_config_str("house = \"Ravenclaw\"\n")
            .expect("inline configuration should parse");
        assert_eq!(settings.get("house"), Some(Value::from("Gryffindor")));

        settings.set("HOUSE", "Slytherin");
        assert_eq!(settings.get("house"), Some(Value::from("Slytherin")));
    }

    #[rstest]
    fn file_layer_beats_defaults(mut empty_settings: Settings<MockEnv>) {
        empty_settings.set_default("house", "Hufflepuff");
        empty_settings
            .read_config_str("House = \"Ravenclaw\"\n")
            .expect("inline configuration should parse");
        assert_eq!(empty_settings.get("house"), Some(Value::from("Ravenclaw")));
    }

    #[rstest]
    fn nested_file_keys_use_delimiter(mut empty_settings: Settings<MockEnv>) {
        empty_settings
            .read_config_str("[engine]\nsocket = \"/run/podman.sock\"\n")
            .expect("inline configuration should parse");
        assert_eq!(
            empty_settings.get("ENGINE.SOCKET"),
            Some(Value::from("/run/podman.sock"))
        );
        assert!(empty_settings.get("engine.missing").is_none());
    }

    #[rstest]
    fn invalid_toml_is_reported(mut empty_settings: Settings<MockEnv>) {
        let error = empty_settings
            .read_config_str("house = ")
            .expect_err("invalid TOML should fail");
        assert!(matches!(error, SourceError::FileParse { .. }));
    }

    #[rstest]
    fn empty_key_is_never_present(empty_settings: Settings<MockEnv>) {
        assert!(empty_settings.get("").is_none());
        assert!(empty_settings.resolve("").is_none());
    }

    #[rstest]
    fn bound_flag_does_not_make_key_present(mut empty_settings: Settings<MockEnv>) {
        let flag = string_flag("house", "Hufflepuff", false);
        empty_settings
            .bind_flag("FAVORITE_HOUSE", &flag)
            .expect("binding should succeed");
        assert!(empty_settings.get("FAVORITE_HOUSE").is_none());
        assert_eq!(
            empty_settings.resolve("FAVORITE_HOUSE"),
            Some(Value::from("Hufflepuff"))
        );
    }

    #[rstest]
    fn changed_flag_beats_env_when_resolving() {
        let mut settings = Settings::new(env_with(&[("FAVORITE_HOUSE", "Gryffindor")]));
        let flag = string_flag("house", "Ravenclaw", true);
        settings
            .bind_flag("FAVORITE_HOUSE", &flag)
            .expect("binding should succeed");
        assert_eq!(
            settings.resolve("FAVORITE_HOUSE"),
            Some(Value::from("Ravenclaw"))
        );
    }

    #[rstest]
    fn bound_slice_flag_resolves_to_list(mut empty_settings: Settings<MockEnv>) {
        let value = Slice::new(Target::new(vec![6, 8]), parse_slice_of(parser::from_str::<i32>));
        let flag = FlagHandle::new("some-ints", false, Rc::new(value));
        empty_settings
            .bind_flag("SOME_INTS", &flag)
            .expect("binding should succeed");
        assert_eq!(
            empty_settings.unmarshal_strings("SOME_INTS").expect("list should decode"),
            vec![String::from("6"), String::from("8")]
        );
    }

    #[rstest]
    fn bind_flag_rejects_empty_key(mut empty_settings: Settings<MockEnv>) {
        let flag = string_flag("house", "", false);
        assert!(matches!(
            empty_settings.bind_flag("", &flag),
            Err(SourceError::EmptyKey)
        ));
    }

    #[rstest]
    #[case("some_ints = \"2,x3x,4\"", vec!["2", "x3x", "4"])]
    #[case("some_ints = [2, 3]", vec!["2", "3"])]
    #[case("some_ints = 7", vec!["7"])]
    #[case("some_ints = \"\"", vec![])]
    fn unmarshal_strings_decodes_lists(
        mut empty_settings: Settings<MockEnv>,
        #[case] content: &str,
        #[case] expected: Vec<&str>,
    ) {
        empty_settings
            .read_config_str(content)
            .expect("inline configuration should parse");
        assert_eq!(
            empty_settings.unmarshal_strings("SOME_INTS").expect("list should decode"),
            expected
        );
    }

    #[rstest]
    fn unmarshal_strings_rejects_tables(mut empty_settings: Settings<MockEnv>) {
        empty_settings
            .read_config_str("[some_ints]\na = 1\n")
            .expect("inline configuration should parse");
        assert!(matches!(
            empty_settings.unmarshal_strings("SOME_INTS"),
            Err(SourceError::Unmarshal { .. })
        ));
    }

    #[rstest]
    #[case("flag = true", "true")]
    #[case("flag = 42", "42")]
    #[case("flag = \"text\"", "text")]
    fn unmarshal_string_renders_scalars(
        mut empty_settings: Settings<MockEnv>,
        #[case] content: &str,
        #[case] expected: &str,
    ) {
        empty_settings
            .read_config_str(content)
            .expect("inline configuration should parse");
        assert_eq!(
            empty_settings.unmarshal_string("flag").expect("scalar should decode"),
            expected
        );
    }

    #[rstest]
    fn unmarshal_string_rejects_lists(mut empty_settings: Settings<MockEnv>) {
        empty_settings
            .read_config_str("flag = [1, 2]")
            .expect("inline configuration should parse");
        let error = empty_settings
            .unmarshal_string("flag")
            .expect_err("list should not decode as string");
        assert_eq!(
            error.to_string(),
            "cannot decode configuration key 'flag' as string: found array"
        );
    }

    #[rstest]
    fn unmarshal_reports_missing_key(empty_settings: Settings<MockEnv>) {
        assert!(matches!(
            empty_settings.unmarshal_string("absent"),
            Err(SourceError::Missing { .. })
        ));
    }

    #[rstest]
    fn read_config_file_records_path() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let path = Utf8PathBuf::try_from(dir.path().join("config.toml"))
            .expect("temp path should be UTF-8");
        std::fs::write(&path, "house = \"Ravenclaw\"\n").expect("config should be written");

        let mut settings = Settings::new(env_with(&[]));
        settings.read_config_file(&path).expect("config should load");
        assert_eq!(settings.config_file(), Some(path.as_path()));
        assert_eq!(settings.get("house"), Some(Value::from("Ravenclaw")));
    }

    #[rstest]
    fn read_config_file_reports_missing_file(mut empty_settings: Settings<MockEnv>) {
        let error = empty_settings
            .read_config_file(Utf8Path::new("/nonexistent/flagbind/config.toml"))
            .expect_err("missing file should fail");
        assert!(matches!(error, SourceError::FileRead { .. }));
    }
}

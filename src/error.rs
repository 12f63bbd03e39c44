//! Semantic error types for flagbind.
//!
//! This module defines the error hierarchy for flagbind, following the principle of
//! using semantic error enums (via `thiserror`) for conditions the caller might
//! inspect, while reserving opaque errors (`eyre::Report`) for user callbacks and
//! the application boundary.

use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors raised while converting raw strings into typed values.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The raw value was rejected by a parser.
    #[error("cannot parse parameter: {message}")]
    Invalid {
        /// A description of why the value was rejected.
        message: String,
    },

    /// The raw value could not be converted into the target type.
    #[error("parsing \"{value}\": {message}")]
    Conversion {
        /// The raw value that failed to convert.
        value: String,
        /// The conversion failure reported by the target type.
        message: String,
    },

    /// An element of a collection failed to parse.
    #[error("cannot parse slice element {index}: {source}")]
    Element {
        /// The zero-based index of the first failing element.
        index: usize,
        /// The element's parse failure.
        #[source]
        source: Box<ParseError>,
    },

    /// The raw value is not a valid comma-separated record.
    #[error("cannot read value '{value}' as comma-separated values: {reason}")]
    Csv {
        /// The raw value that was read.
        value: String,
        /// The CSV syntax problem.
        reason: String,
    },
}

impl ParseError {
    /// Builds an [`ParseError::Invalid`] from any message.
    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }
}

/// Errors raised by an external configuration source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The configuration key is empty.
    #[error("configuration key must not be empty")]
    EmptyKey,

    /// No value is present for the configuration key.
    #[error("no value present for configuration key '{key}'")]
    Missing {
        /// The configuration key that was looked up.
        key: String,
    },

    /// The stored value has a shape that cannot be decoded into the request.
    #[error("cannot decode configuration key '{key}' as {expected}: found {found}")]
    Unmarshal {
        /// The configuration key that was decoded.
        key: String,
        /// The requested shape.
        expected: &'static str,
        /// The stored value's shape.
        found: String,
    },

    /// The configuration file could not be read.
    #[error("failed to read configuration file {path}: {message}")]
    FileRead {
        /// The path of the configuration file.
        path: Utf8PathBuf,
        /// A description of the I/O failure.
        message: String,
    },

    /// The configuration file is not valid TOML.
    #[error("failed to parse configuration file {path}: {message}")]
    FileParse {
        /// The path (or label) of the configuration content.
        path: Utf8PathBuf,
        /// A description of the syntax error.
        message: String,
    },
}

/// Errors raised while reconciling a bound flag with a configuration source.
#[derive(Debug, Error)]
pub enum BindingError {
    /// The flag could not be registered as the key's fallback provider.
    #[error("cannot bind value to config source for key '{key}': {source}")]
    Register {
        /// The configuration key.
        key: String,
        /// The source failure.
        #[source]
        source: SourceError,
    },

    /// The configured value could not be decoded.
    #[error("cannot unmarshal value of config key '{key}': {source}")]
    Unmarshal {
        /// The configuration key.
        key: String,
        /// The decoding failure.
        #[source]
        source: SourceError,
    },

    /// The configured scalar value was rejected by the flag's parser.
    #[error("cannot set value to config value {key}='{value}': {source}")]
    Set {
        /// The configuration key.
        key: String,
        /// The raw configured value.
        value: String,
        /// The parse failure.
        #[source]
        source: ParseError,
    },

    /// The configured list was rejected by the flag's parser.
    #[error("cannot replace slice value to config {key}='{value}': {source}")]
    Replace {
        /// The configuration key.
        key: String,
        /// The raw configured list, rendered for diagnostics.
        value: String,
        /// The parse failure.
        #[source]
        source: ParseError,
    },
}

/// Violations of flag groups declared on a command.
#[derive(Debug, Error)]
pub enum FlagGroupError {
    /// Some, but not all, flags of a required-together group were set.
    #[error("if any flags in the group [{group}] are set they must all be set; missing [{missing}]")]
    RequiredTogether {
        /// The space-separated group members.
        group: String,
        /// The space-separated members that were not set.
        missing: String,
    },

    /// None of the flags of a one-required group were set.
    #[error("at least one of the flags in the group [{group}] is required")]
    OneRequired {
        /// The space-separated group members.
        group: String,
    },

    /// More than one flag of a mutually exclusive group was set.
    #[error("if any flags in the group [{group}] are set none of the others can be; [{set}] were all set")]
    MutuallyExclusive {
        /// The space-separated group members.
        group: String,
        /// The space-separated members that were set.
        set: String,
    },
}

/// Top-level error type for flagbind.
///
/// Every failure of a command invocation surfaces as one of these variants. At
/// the application boundary they are typically converted to `eyre::Report`.
#[derive(Debug, Error)]
pub enum FlagbindError {
    /// A raw command-line value was rejected by its flag.
    #[error("invalid argument \"{value}\" for \"--{flag}\" flag: {source}")]
    InvalidArgument {
        /// The flag name.
        flag: String,
        /// The raw value supplied on the command line.
        value: String,
        /// The parse failure.
        #[source]
        source: ParseError,
    },

    /// A bound flag could not be reconciled with its configuration source.
    #[error(transparent)]
    Binding(#[from] BindingError),

    /// A flag group constraint was violated.
    #[error(transparent)]
    FlagGroup(#[from] FlagGroupError),

    /// The configuration source failed outside of a binding.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// The command line did not match the command's grammar.
    #[error(transparent)]
    Usage(#[from] clap::Error),

    /// Flags marked as required were not set on the command line.
    #[error("required flag(s) {flags} not set")]
    MissingRequired {
        /// The quoted, comma-separated names of the missing flags.
        flags: String,
    },

    /// A flag was referenced that is not registered on the invoked command path.
    #[error("flag '{name}' is not registered")]
    UnknownFlag {
        /// The flag name or target description.
        name: String,
    },

    /// The command tree is inconsistent.
    #[error("invalid definition of command '{command}': {reason}")]
    InvalidDefinition {
        /// The command name.
        command: String,
        /// What is wrong with the definition.
        reason: String,
    },

    /// A pre-execution hook registered by the caller failed.
    #[error("{0}")]
    Hook(eyre::Report),

    /// The command's run callback failed.
    #[error("{0}")]
    Run(eyre::Report),

    /// Help or version output could not be written.
    #[error("failed to write command output: {0}")]
    Output(#[from] std::io::Error),
}

/// A specialised `Result` type for flagbind operations.
pub type Result<T> = std::result::Result<T, FlagbindError>;

#[cfg(test)]
mod tests {
    use super::*;
    use eyre::Report;
    use rstest::{fixture, rstest};

    /// Fixture providing a sample configuration key.
    #[fixture]
    fn config_key() -> String {
        String::from("SOME_INTEGERS")
    }

    #[rstest]
    fn parse_error_element_reports_index() {
        let error = ParseError::Element {
            index: 1,
            source: Box::new(ParseError::Conversion {
                value: String::from("x3x"),
                message: String::from("invalid digit found in string"),
            }),
        };
        assert_eq!(
            error.to_string(),
            "cannot parse slice element 1: parsing \"x3x\": invalid digit found in string"
        );
    }

    #[rstest]
    fn parse_error_invalid_displays_message() {
        let error = ParseError::invalid("value '' is empty");
        assert_eq!(error.to_string(), "cannot parse parameter: value '' is empty");
    }

    #[rstest]
    fn binding_error_replace_names_key_and_value(config_key: String) {
        let error = BindingError::Replace {
            key: config_key,
            value: String::from("[\"2\", \"x3x\"]"),
            source: ParseError::invalid("bad"),
        };
        assert_eq!(
            error.to_string(),
            "cannot replace slice value to config SOME_INTEGERS='[\"2\", \"x3x\"]': cannot parse parameter: bad"
        );
    }

    #[rstest]
    fn binding_error_register_wraps_source(config_key: String) {
        let error = BindingError::Register {
            key: config_key,
            source: SourceError::EmptyKey,
        };
        assert_eq!(
            error.to_string(),
            "cannot bind value to config source for key 'SOME_INTEGERS': configuration key must not be empty"
        );
    }

    #[rstest]
    #[case(
        FlagGroupError::RequiredTogether {
            group: String::from("user password"),
            missing: String::from("password"),
        },
        "if any flags in the group [user password] are set they must all be set; missing [password]"
    )]
    #[case(
        FlagGroupError::OneRequired { group: String::from("json yaml") },
        "at least one of the flags in the group [json yaml] is required"
    )]
    #[case(
        FlagGroupError::MutuallyExclusive {
            group: String::from("json yaml"),
            set: String::from("json yaml"),
        },
        "if any flags in the group [json yaml] are set none of the others can be; [json yaml] were all set"
    )]
    fn flag_group_error_displays_correctly(#[case] error: FlagGroupError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }

    #[rstest]
    fn flagbind_error_invalid_argument_mentions_flag() {
        let error = FlagbindError::InvalidArgument {
            flag: String::from("some-ints"),
            value: String::from("5,x6x,7"),
            source: ParseError::invalid("bad element"),
        };
        assert_eq!(
            error.to_string(),
            "invalid argument \"5,x6x,7\" for \"--some-ints\" flag: cannot parse parameter: bad element"
        );
    }

    #[rstest]
    fn flagbind_error_wraps_binding_error(config_key: String) {
        let binding_error = BindingError::Unmarshal {
            key: config_key.clone(),
            source: SourceError::Missing { key: config_key },
        };
        let error: FlagbindError = binding_error.into();
        assert_eq!(
            error.to_string(),
            "cannot unmarshal value of config key 'SOME_INTEGERS': no value present for configuration key 'SOME_INTEGERS'"
        );
    }

    #[rstest]
    #[case(
        FlagbindError::from(FlagGroupError::OneRequired { group: String::from("a b") }),
        "at least one of the flags in the group [a b] is required"
    )]
    #[case(
        FlagbindError::Run(Report::msg("some error")),
        "some error"
    )]
    #[case(
        FlagbindError::UnknownFlag { name: String::from("missing") },
        "flag 'missing' is not registered"
    )]
    fn eyre_report_preserves_error_messages(#[case] error: FlagbindError, #[case] expected: &str) {
        let report = Report::from(error);
        assert_eq!(report.to_string(), expected);
    }
}

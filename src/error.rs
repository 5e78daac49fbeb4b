use std::path::PathBuf;

/// Errors raised while compiling or rendering a template.
///
/// Every variant is terminal for the render that raised it: no partial output is produced.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// The template references a token that the context does not know about.
    #[error("Unknown token `{name}` at position {position}")]
    UnknownToken {
        /// Name of the offending token
        name: String,
        /// Byte offset of the token's opening `{{` in the template as written
        position: usize,
    },

    /// The template's delimiters or token arguments are malformed.
    #[error("Template syntax error at position {position}: {reason}")]
    Syntax {
        /// Byte offset in the template as written where the problem was detected. Multi-line
        /// templates count their indentation and blank lines too.
        position: usize,
        /// What was expected at that position
        reason: &'static str,
    },

    /// A token was called with the wrong number of arguments.
    #[error("Token `{name}` at position {position} takes {expected} argument(s)")]
    WrongArity {
        /// Name of the offending token
        name: String,
        /// Byte offset of the token's opening `{{` in the template as written
        position: usize,
        /// Number of arguments the token accepts
        expected: usize,
    },

    /// The argument of a `timestamp` token is not a valid date/time pattern.
    #[error("Invalid timestamp pattern `{pattern}`: {reason}")]
    InvalidTimestampPattern {
        /// The pattern as written in the template
        pattern: String,
        /// What is wrong with it
        reason: String,
    },
}

/// Errors raised while loading or validating configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Could not read configuration file `{}`: {source}", path.display())]
    Unreadable {
        /// Path of the configuration file
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for this tool.
    #[error("Could not parse configuration: {0}")]
    Malformed(#[from] toml::de::Error),

    /// A configured template does not compile.
    #[error("Invalid `{field}`: {source}")]
    InvalidTemplate {
        /// Name of the configuration field holding the template
        field: &'static str,
        /// Why the template does not compile
        source: TemplateError,
    },

    /// The configured encoding is not supported.
    #[error("Unsupported encoding `{encoding}` (expected one of: {supported})")]
    UnsupportedEncoding {
        /// Encoding name as configured
        encoding: String,
        /// Comma-separated list of supported names
        supported: String,
    },

    /// The configured output URI is neither `stdout` nor a `file:` URI with an absolute path.
    #[error("Invalid output URI `{uri}`: {reason}")]
    InvalidOutputUri {
        /// URI as configured
        uri: String,
        /// What is wrong with it
        reason: &'static str,
    },
}

/// Errors raised while delivering rendered output.
#[derive(thiserror::Error, Debug)]
pub enum OutputError {
    /// The rendered text contains a character the configured charset cannot encode.
    #[error("Character `{character}` at position {position} cannot be encoded as {charset}")]
    Unencodable {
        /// The offending character
        character: char,
        /// Byte offset of the character in the rendered text
        position: usize,
        /// Name of the target charset
        charset: &'static str,
    },

    /// Writing to the output target failed.
    #[error("Could not write output to {target}: {source}")]
    Io {
        /// Human readable name of the target
        target: String,
        /// Underlying I/O error
        source: std::io::Error,
    },
}

use crate::{
    error::ConfigError,
    output::{Charset, OutputTarget},
    template::Template,
};
use serde::Deserialize;
use std::{fs, path::Path};

/// Leaves the version as it is.
pub const DEFAULT_RELEASE_VERSION_FORMAT: &str = "{{ version }}";

/// Encoding of the delivered output.
pub const DEFAULT_ENCODING: &str = "UTF-8";

/// Prints the output to the console.
pub const DEFAULT_OUTPUT_URI: &str = "stdout";

/// Outputs nothing but the version.
pub const DEFAULT_OUTPUT_TEMPLATE: &str = "{{ version }}";

/// Configuration for deriving and delivering a release version.
///
/// Every field is optional in a configuration file and falls back to its default.
///
/// ```toml
/// release_version_format = "{{ qualified_api_version }}-build.{{ timestamp('yyyyMMdd') }}"
/// encoding = "UTF-8"
/// output_uri = "file:///var/build/project.properties"
/// output_template = """
///     PROJECT_VERSION={{ version }}
///     BUILT_ON={{ timestamp('yyyy-MM-dd') }}
/// """
/// ```
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// How the current version is turned into the release version, e.g.
    /// `{{ api_version }}.{{ timestamp('yyyyMMdd') }}`.
    #[serde(alias = "releaseVersionFormat")]
    pub release_version_format: String,

    /// Encoding used when writing output.
    pub encoding: String,

    /// Where output goes: `stdout`, or a `file:` URI naming an absolute path.
    #[serde(alias = "outputUri")]
    pub output_uri: String,

    /// How the output is structured, e.g. `PROJECT_VERSION={{ version }}`. Leading whitespace is
    /// stripped from every line of a multi-line template.
    #[serde(alias = "outputTemplate")]
    pub output_template: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            release_version_format: DEFAULT_RELEASE_VERSION_FORMAT.to_owned(),
            encoding: DEFAULT_ENCODING.to_owned(),
            output_uri: DEFAULT_OUTPUT_URI.to_owned(),
            output_template: DEFAULT_OUTPUT_TEMPLATE.to_owned(),
        }
    }
}

impl Config {
    /// Reads a TOML configuration file.
    ///
    /// # Errors
    ///
    /// - [ConfigError::Unreadable] if the file cannot be read.
    /// - [ConfigError::Malformed] if it is not valid TOML or has unexpected value types.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
            path: path.to_owned(),
            source,
        })?;
        Self::from_toml(&contents)
    }

    /// Parses a TOML configuration document.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Checks every field and compiles the templates, so nothing is left to fail for
    /// configuration reasons once work starts.
    ///
    /// # Errors
    ///
    /// - [ConfigError::InvalidTemplate] if a template does not compile.
    /// - [ConfigError::UnsupportedEncoding] if the encoding is unknown.
    /// - [ConfigError::InvalidOutputUri] if the output URI is neither `stdout` nor an absolute
    ///   `file:` URI.
    pub fn validate(&self) -> Result<Settings, ConfigError> {
        let template = |field: &'static str, text: &str| {
            Template::parse(text).map_err(|source| ConfigError::InvalidTemplate { field, source })
        };

        Ok(Settings {
            release_version_format: template(
                "release_version_format",
                &self.release_version_format,
            )?,
            output_template: template("output_template", &self.output_template)?,
            charset: Charset::from_name(&self.encoding)?,
            target: OutputTarget::parse(&self.output_uri)?,
        })
    }
}

/// A validated [Config].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Compiled release version format
    pub release_version_format: Template,
    /// Compiled output template
    pub output_template: Template,
    /// Output encoding
    pub charset: Charset,
    /// Output destination
    pub target: OutputTarget,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TemplateError;
    use std::path::PathBuf;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!("{{ version }}", config.release_version_format);
        assert_eq!("UTF-8", config.encoding);
        assert_eq!("stdout", config.output_uri);
        assert_eq!("{{ version }}", config.output_template);

        let settings = config.validate().unwrap();
        assert_eq!(Charset::Utf8, settings.charset);
        assert_eq!(OutputTarget::Stdout, settings.target);
    }

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let config = Config::from_toml(
            r#"
            release_version_format = "{{ api_version }}.{{ timestamp('yyyyMMdd') }}"
            "#,
        )
        .unwrap();
        assert_eq!(
            "{{ api_version }}.{{ timestamp('yyyyMMdd') }}",
            config.release_version_format
        );
        assert_eq!(DEFAULT_ENCODING, config.encoding);
        assert_eq!(DEFAULT_OUTPUT_URI, config.output_uri);
        assert_eq!(DEFAULT_OUTPUT_TEMPLATE, config.output_template);
    }

    #[test]
    fn test_camel_case_aliases() {
        let config = Config::from_toml(
            r#"
            releaseVersionFormat = "{{ api_version }}"
            outputUri = "file:///tmp/project.properties"
            outputTemplate = "PROJECT_VERSION={{ version }}"
            "#,
        )
        .unwrap();
        assert_eq!("{{ api_version }}", config.release_version_format);
        assert_eq!("file:///tmp/project.properties", config.output_uri);
        assert_eq!("PROJECT_VERSION={{ version }}", config.output_template);
    }

    #[test]
    fn test_malformed_toml() {
        let actual = Config::from_toml("encoding = 8");
        assert!(matches!(actual, Err(ConfigError::Malformed(_))));
    }

    #[test]
    fn test_validate_errors() {
        let bad_template = Config {
            output_template: "{{ version".to_owned(),
            ..Config::default()
        };
        assert!(matches!(
            bad_template.validate(),
            Err(ConfigError::InvalidTemplate {
                field: "output_template",
                source: TemplateError::Syntax { .. }
            })
        ));

        let bad_encoding = Config {
            encoding: "EBCDIC".to_owned(),
            ..Config::default()
        };
        assert!(matches!(
            bad_encoding.validate(),
            Err(ConfigError::UnsupportedEncoding { .. })
        ));

        let bad_uri = Config {
            output_uri: "relative/project.properties".to_owned(),
            ..Config::default()
        };
        assert!(matches!(
            bad_uri.validate(),
            Err(ConfigError::InvalidOutputUri { .. })
        ));
    }

    #[test]
    fn test_validate_file_target() {
        let config = Config {
            output_uri: "file:///var/build/project.properties".to_owned(),
            ..Config::default()
        };
        assert_eq!(
            OutputTarget::File(PathBuf::from("/var/build/project.properties")),
            config.validate().unwrap().target
        );
    }
}

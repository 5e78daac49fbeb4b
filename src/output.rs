use crate::error::{ConfigError, OutputError};
use core::fmt::{self, Display};
use std::{
    fs::File,
    io::{self, Write},
    path::PathBuf,
};
use url::Url;

const FILE_SCHEME: &str = "file";

/// Text encodings output can be written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    /// UTF-8
    Utf8,
    /// 7-bit US-ASCII
    UsAscii,
    /// ISO-8859-1 (Latin-1)
    Latin1,
}

impl Charset {
    const ALL: [Charset; 3] = [Charset::Utf8, Charset::UsAscii, Charset::Latin1];

    /// Looks up a charset by name, ignoring case. Common aliases such as `utf8`, `ascii`, and
    /// `latin1` are accepted.
    ///
    /// # Errors
    ///
    /// - Returns [ConfigError::UnsupportedEncoding] for any other name.
    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        let charset = match name.to_ascii_uppercase().as_str() {
            "UTF-8" | "UTF8" => Charset::Utf8,
            "US-ASCII" | "ASCII" => Charset::UsAscii,
            "ISO-8859-1" | "ISO8859-1" | "ISO_8859_1" | "LATIN1" => Charset::Latin1,
            _ => {
                return Err(ConfigError::UnsupportedEncoding {
                    encoding: name.to_owned(),
                    supported: Self::ALL
                        .iter()
                        .map(Charset::name)
                        .collect::<Vec<_>>()
                        .join(", "),
                })
            }
        };
        Ok(charset)
    }

    /// The canonical name of this charset.
    pub fn name(&self) -> &'static str {
        match self {
            Charset::Utf8 => "UTF-8",
            Charset::UsAscii => "US-ASCII",
            Charset::Latin1 => "ISO-8859-1",
        }
    }

    /// Encodes `text` in this charset.
    ///
    /// # Errors
    ///
    /// - Returns [OutputError::Unencodable] for the first character outside of the charset.
    pub fn encode(&self, text: &str) -> Result<Vec<u8>, OutputError> {
        let limit = match self {
            Charset::Utf8 => return Ok(text.as_bytes().to_vec()),
            Charset::UsAscii => 0x7f,
            Charset::Latin1 => 0xff,
        };

        text.char_indices()
            .map(|(position, character)| {
                u8::try_from(u32::from(character))
                    .ok()
                    .filter(|byte| u32::from(*byte) <= limit)
                    .ok_or(OutputError::Unencodable {
                        character,
                        position,
                        charset: self.name(),
                    })
            })
            .collect()
    }
}

impl Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where rendered output is delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// The process's standard output
    Stdout,
    /// A file, created or truncated on delivery
    File(PathBuf),
}

impl OutputTarget {
    /// Parses an output URI: `stdout`, or a `file:` URI naming an absolute local path, such as
    /// `file:///var/build/project.properties` or `file:/var/build/project.properties`.
    /// Percent-escapes in the path are decoded.
    ///
    /// # Errors
    ///
    /// - Returns [ConfigError::InvalidOutputUri] for anything else.
    pub fn parse(uri: &str) -> Result<Self, ConfigError> {
        if uri.eq_ignore_ascii_case("stdout") {
            return Ok(OutputTarget::Stdout);
        }

        let invalid = |reason| ConfigError::InvalidOutputUri {
            uri: uri.to_owned(),
            reason,
        };

        let url = Url::parse(uri)
            .ok()
            .filter(|url| url.scheme() == FILE_SCHEME)
            .ok_or_else(|| invalid("expected `stdout` or a `file:` URI"))?;
        let path = url
            .to_file_path()
            .map_err(|()| invalid("file URI should name an absolute local path"))?;

        Ok(OutputTarget::File(path))
    }

    /// Encodes `text` followed by a newline and writes it to this target.
    ///
    /// # Errors
    ///
    /// - Returns [OutputError::Unencodable] if `text` does not fit `charset`. Nothing is written
    ///   in that case.
    /// - Returns [OutputError::Io] if the target cannot be opened or written.
    pub fn deliver(&self, text: &str, charset: Charset) -> Result<(), OutputError> {
        let mut bytes = charset.encode(text)?;
        bytes.push(b'\n');

        tracing::info!("Writing {} bytes ({}) to {}", bytes.len(), charset, self);

        let io_error = |source| OutputError::Io {
            target: self.to_string(),
            source,
        };
        match self {
            OutputTarget::Stdout => write_all(&mut io::stdout().lock(), &bytes).map_err(io_error),
            OutputTarget::File(path) => File::create(path)
                .and_then(|mut file| write_all(&mut file, &bytes))
                .map_err(io_error),
        }
    }
}

fn write_all(writer: &mut impl Write, bytes: &[u8]) -> io::Result<()> {
    writer.write_all(bytes)?;
    writer.flush()
}

impl Display for OutputTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputTarget::Stdout => f.write_str("stdout"),
            OutputTarget::File(path) => match Url::from_file_path(path) {
                Ok(url) => write!(f, "{url}"),
                Err(()) => write!(f, "{}", path.display()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    #[rstest]
    #[case("UTF-8", Charset::Utf8)]
    #[case("utf8", Charset::Utf8)]
    #[case("US-ASCII", Charset::UsAscii)]
    #[case("ascii", Charset::UsAscii)]
    #[case("ISO-8859-1", Charset::Latin1)]
    #[case("Latin1", Charset::Latin1)]
    fn test_charset_from_name(#[case] name: &str, #[case] expected: Charset) {
        assert_eq!(expected, Charset::from_name(name).unwrap());
    }

    #[test]
    fn test_charset_unsupported() {
        let actual = Charset::from_name("UTF-16");
        assert!(matches!(
            actual,
            Err(ConfigError::UnsupportedEncoding { encoding, supported })
                if encoding == "UTF-16" && supported == "UTF-8, US-ASCII, ISO-8859-1"
        ));
    }

    #[rstest]
    #[case(Charset::Utf8, "1.2.0-ß", Some(b"1.2.0-\xc3\x9f".to_vec()))]
    #[case(Charset::Latin1, "1.2.0-ß", Some(b"1.2.0-\xdf".to_vec()))]
    #[case(Charset::UsAscii, "1.2.0", Some(b"1.2.0".to_vec()))]
    #[case(Charset::UsAscii, "1.2.0-ß", None)]
    #[case(Charset::Latin1, "1.2.0-€", None)]
    fn test_charset_encode(
        #[case] charset: Charset,
        #[case] text: &str,
        #[case] expected: Option<Vec<u8>>,
    ) {
        assert_eq!(expected, charset.encode(text).ok());
    }

    #[test]
    fn test_charset_unencodable_position() {
        let actual = Charset::UsAscii.encode("1.2.0-ß");
        assert!(matches!(
            actual,
            Err(OutputError::Unencodable {
                character: 'ß',
                position: 6,
                charset: "US-ASCII"
            })
        ));
    }

    #[rstest]
    #[case("stdout", Some(OutputTarget::Stdout))]
    #[case("STDOUT", Some(OutputTarget::Stdout))]
    #[case(
        "file:///var/build/project.properties",
        Some(OutputTarget::File(PathBuf::from("/var/build/project.properties")))
    )]
    #[case(
        "file:/var/build/project.properties",
        Some(OutputTarget::File(PathBuf::from("/var/build/project.properties")))
    )]
    #[case(
        "file:///tmp/my%20dir/project.properties",
        Some(OutputTarget::File(PathBuf::from("/tmp/my dir/project.properties")))
    )]
    #[case(
        "file://localhost/var/build/project.properties",
        Some(OutputTarget::File(PathBuf::from("/var/build/project.properties")))
    )]
    #[case("file://relative/project.properties", None)]
    #[case("/var/build/project.properties", None)]
    #[case("http://example.com/version", None)]
    #[case("", None)]
    fn test_output_target_parse(#[case] uri: &str, #[case] expected: Option<OutputTarget>) {
        assert_eq!(expected, OutputTarget::parse(uri).ok());
    }

    #[test]
    fn test_output_target_display_round_trip() {
        let uris = [
            "stdout",
            "file:///var/build/project.properties",
            "file:///tmp/my%20dir/project.properties",
        ];
        for uri in uris {
            let target = OutputTarget::parse(uri).unwrap();
            assert_eq!(uri, target.to_string());
        }
    }

    #[test]
    fn test_deliver_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("project.properties");
        let target = OutputTarget::File(path.clone());

        target
            .deliver("PROJECT_VERSION=1.2.0-ß", Charset::Latin1)
            .unwrap();
        assert_eq!(
            b"PROJECT_VERSION=1.2.0-\xdf\n".to_vec(),
            std::fs::read(&path).unwrap()
        );

        // delivering again replaces the previous contents
        target.deliver("PROJECT_VERSION=1.3.0", Charset::Utf8).unwrap();
        assert_eq!(
            "PROJECT_VERSION=1.3.0\n",
            std::fs::read_to_string(&path).unwrap()
        );
    }

    #[test]
    fn test_deliver_unencodable_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("project.properties");
        let target = OutputTarget::File(path.clone());

        let actual = target.deliver("1.2.0-€", Charset::UsAscii);
        assert!(matches!(actual, Err(OutputError::Unencodable { .. })));
        assert!(!path.exists());
    }

    #[test]
    fn test_deliver_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let target = OutputTarget::File(dir.path().join("missing").join("project.properties"));
        let actual = target.deliver("1.2.0", Charset::Utf8);
        assert!(matches!(actual, Err(OutputError::Io { .. })));
    }
}

use core::{
    convert::Infallible,
    fmt::{self, Display},
    str::FromStr,
};

/// The separator that introduces a qualifier, as in `1.2.0-beta`.
pub const DEFAULT_SEPARATOR: char = '-';

/// Marker that Maven-style projects append to in-development versions. It is never treated as a
/// qualifier.
pub const SNAPSHOT: &str = "SNAPSHOT";

/// A version string decomposed into a numeric release, an optional qualifier, and optional build
/// metadata.
///
/// Parsing is lenient: every string produces a [VersionIdentifier], with fewer components
/// populated the less the string looks like a version.
///
/// ```
/// use release_candidate::VersionIdentifier;
///
/// let version = VersionIdentifier::parse("1.2.0-beta-SNAPSHOT");
/// assert_eq!(&[1, 2, 0], version.numeric_release());
/// assert_eq!(Some("beta"), version.qualifier());
/// assert_eq!(Some("SNAPSHOT"), version.build_metadata());
///
/// assert_eq!("1.2.0-beta-SNAPSHOT", version.full_version());
/// assert_eq!("1.2.0", version.api_version());
/// assert_eq!("1.2.0-beta", version.qualified_api_version());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionIdentifier {
    raw: String,
    numeric_release: Vec<u64>,
    qualifier: Option<String>,
    build_metadata: Option<String>,
    separator: char,
    /// Whether a separator came right before the build metadata, as in `1.2.0-SNAPSHOT` but not
    /// `1.0.RELEASE`
    metadata_separated: bool,
}

impl VersionIdentifier {
    /// Parses `raw` using `-` as the qualifier separator. Never fails.
    ///
    /// The leading run of dot-separated integers becomes the numeric release. If what follows
    /// starts with `-`, the next `-`-delimited segment is the qualifier and everything after it is
    /// build metadata, verbatim. A suffix that does not start with `-` is kept whole as build
    /// metadata, and so is the entire string when it does not start with a number.
    pub fn parse(raw: &str) -> Self {
        Self::parse_with_separator(raw, DEFAULT_SEPARATOR)
    }

    /// Like [Self::parse], but with a custom qualifier separator.
    pub fn parse_with_separator(raw: &str, separator: char) -> Self {
        let (numeric_release, numeric_len) = scan_numeric_run(raw);

        let suffix = if numeric_release.is_empty() {
            Suffix {
                qualifier: None,
                build_metadata: non_empty(raw),
                metadata_separated: false,
            }
        } else {
            split_suffix(&raw[numeric_len..], separator)
        };

        Self {
            raw: raw.to_owned(),
            numeric_release,
            qualifier: suffix.qualifier,
            build_metadata: suffix.build_metadata,
            separator,
            metadata_separated: suffix.metadata_separated,
        }
    }

    /// The separator this version was parsed with.
    pub fn separator(&self) -> char {
        self.separator
    }

    /// The numeric release segments, e.g. `[1, 2, 0]` for `1.2.0-beta`. Empty when the version
    /// does not start with a number.
    pub fn numeric_release(&self) -> &[u64] {
        &self.numeric_release
    }

    /// The qualifier, e.g. `beta` for `1.2.0-beta-SNAPSHOT`.
    pub fn qualifier(&self) -> Option<&str> {
        self.qualifier.as_deref()
    }

    /// Everything after the qualifier, e.g. `SNAPSHOT` for `1.2.0-beta-SNAPSHOT`.
    pub fn build_metadata(&self) -> Option<&str> {
        self.build_metadata.as_deref()
    }

    /// Returns true if the build metadata ends with the `SNAPSHOT` marker.
    pub fn is_snapshot(&self) -> bool {
        self.build_metadata
            .as_deref()
            .map_or(false, |metadata| metadata.ends_with(SNAPSHOT))
    }

    /// The version exactly as it was given.
    pub fn full_version(&self) -> &str {
        &self.raw
    }

    /// The numeric release joined with dots, e.g. `1.2.0`. Empty if there is no numeric release.
    pub fn api_version(&self) -> String {
        self.numeric_release
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(".")
    }

    /// [Self::api_version] followed by `-` and the qualifier, if there is one.
    pub fn qualified_api_version(&self) -> String {
        let api_version = self.api_version();
        match &self.qualifier {
            Some(qualifier) => format!("{api_version}-{qualifier}"),
            None => api_version,
        }
    }

    /// Joins the components back together with the separators they were parsed with. Parsing the
    /// result with [Self::separator] gives the same components.
    ///
    /// This differs from [Self::full_version] only where the numeric release was not in canonical
    /// form, e.g. `1.2.0` for `01.2.00`.
    ///
    /// ```
    /// use release_candidate::VersionIdentifier;
    ///
    /// let version = VersionIdentifier::parse_with_separator("01.2.0_beta_SNAPSHOT", '_');
    /// assert_eq!("1.2.0_beta_SNAPSHOT", version.components_string());
    /// ```
    pub fn components_string(&self) -> String {
        let mut joined = self.api_version();
        if let Some(qualifier) = &self.qualifier {
            joined.push(self.separator);
            joined.push_str(qualifier);
        }
        if let Some(metadata) = &self.build_metadata {
            if self.metadata_separated {
                joined.push(self.separator);
            }
            joined.push_str(metadata);
        }
        joined
    }
}

/// Returns the dot-separated integers at the start of `raw` and the number of bytes they span.
fn scan_numeric_run(raw: &str) -> (Vec<u64>, usize) {
    let bytes = raw.as_bytes();
    let mut segments = Vec::new();
    let mut consumed = 0;

    loop {
        let start = if segments.is_empty() {
            0
        } else if bytes.get(consumed) == Some(&b'.') {
            consumed + 1
        } else {
            break;
        };

        let digits = bytes[start..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();
        if digits == 0 {
            // a trailing dot stays in the suffix
            break;
        }

        // an overflowing segment ends the run, just like a non-numeric one would
        let Ok(value) = raw[start..start + digits].parse::<u64>() else {
            break;
        };

        segments.push(value);
        consumed = start + digits;
    }

    (segments, consumed)
}

struct Suffix {
    qualifier: Option<String>,
    build_metadata: Option<String>,
    metadata_separated: bool,
}

/// Splits whatever follows the numeric run into qualifier and build metadata.
fn split_suffix(suffix: &str, separator: char) -> Suffix {
    let Some(body) = suffix.strip_prefix(separator) else {
        return Suffix {
            qualifier: None,
            build_metadata: non_empty(suffix),
            metadata_separated: false,
        };
    };

    let (head, tail) = match body.split_once(separator) {
        Some((head, tail)) => (head, tail),
        None => (body, ""),
    };

    if head.is_empty() || head == SNAPSHOT {
        Suffix {
            qualifier: None,
            build_metadata: non_empty(body),
            metadata_separated: true,
        }
    } else {
        Suffix {
            qualifier: Some(head.to_owned()),
            build_metadata: non_empty(tail),
            metadata_separated: true,
        }
    }
}

fn non_empty(text: &str) -> Option<String> {
    (!text.is_empty()).then(|| text.to_owned())
}

impl FromStr for VersionIdentifier {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl Display for VersionIdentifier {
    /// Displays the version exactly as it was given.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

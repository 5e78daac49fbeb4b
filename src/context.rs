use crate::{clock::Clock, error::TemplateError, timestamp::TimestampPattern, VersionIdentifier};
use chrono::{DateTime, FixedOffset};
use std::collections::BTreeMap;

/// Token for the version exactly as given, e.g. `1.2.0-beta-SNAPSHOT`.
pub const VERSION: &str = "version";

/// Token for the numeric release, e.g. `1.2.0`.
pub const API_VERSION: &str = "api_version";

/// Token for the numeric release plus qualifier, e.g. `1.2.0-beta`.
pub const QUALIFIED_API_VERSION: &str = "qualified_api_version";

/// Token for the current time, formatted with a pattern argument, e.g. `timestamp('yyyyMMdd')`.
pub const TIMESTAMP: &str = "timestamp";

/// How a token is turned into text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolver {
    /// A zero-argument token that always resolves to this text.
    Value(String),

    /// A one-argument token that formats this instant with the pattern given as its argument.
    Timestamp(DateTime<FixedOffset>),
}

impl Resolver {
    /// Number of arguments the token takes.
    pub fn arity(&self) -> usize {
        match self {
            Resolver::Value(_) => 0,
            Resolver::Timestamp(_) => 1,
        }
    }

    fn resolve(&self, argument: Option<&str>) -> Result<String, ResolveError> {
        match (self, argument) {
            (Resolver::Value(value), None) => Ok(value.clone()),
            (Resolver::Timestamp(at), Some(pattern)) => Ok(TimestampPattern::parse(pattern)
                .map_err(ResolveError::Template)?
                .format(at)),
            _ => Err(ResolveError::WrongArity),
        }
    }
}

enum ResolveError {
    WrongArity,
    Template(TemplateError),
}

/// The tokens a template may use, by name.
///
/// A context is built for one render: [TemplateContext::new] reads the clock once, so every
/// `timestamp` token in a render formats the same instant.
///
/// ```
/// use release_candidate::{render, FixedClock, TemplateContext, VersionIdentifier};
///
/// let version = VersionIdentifier::parse("1.2.0-beta-SNAPSHOT");
/// let clock = FixedClock::at_date(2015, 8, 1).unwrap();
/// let context = TemplateContext::new(&version, &clock);
///
/// let rendered = render("{{ api_version }}.{{ timestamp('yyyyMMdd') }}", &context).unwrap();
/// assert_eq!("1.2.0.20150801", rendered);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TemplateContext {
    resolvers: BTreeMap<String, Resolver>,
}

impl TemplateContext {
    /// A context with the `version`, `api_version`, `qualified_api_version`, and `timestamp`
    /// tokens for `version`, with the current time read from `clock`.
    pub fn new(version: &VersionIdentifier, clock: &impl Clock) -> Self {
        Self::empty()
            .with_value(VERSION, version.full_version())
            .with_value(API_VERSION, version.api_version())
            .with_value(QUALIFIED_API_VERSION, version.qualified_api_version())
            .with_timestamp(TIMESTAMP, clock.now())
    }

    /// A context without any tokens.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a zero-argument token.
    pub fn with_value(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.resolvers
            .insert(name.into(), Resolver::Value(value.into()));
        self
    }

    /// Adds (or replaces) a one-argument token that formats `at`.
    pub fn with_timestamp(mut self, name: impl Into<String>, at: DateTime<FixedOffset>) -> Self {
        self.resolvers.insert(name.into(), Resolver::Timestamp(at));
        self
    }

    /// Returns the resolver registered for `name`, if any.
    pub fn get(&self, name: &str) -> Option<&Resolver> {
        self.resolvers.get(name)
    }

    /// Names of all tokens in this context, in lexicographic order.
    pub fn token_names(&self) -> impl Iterator<Item = &str> {
        self.resolvers.keys().map(String::as_str)
    }

    pub(crate) fn resolve(
        &self,
        name: &str,
        argument: Option<&str>,
        position: usize,
    ) -> Result<String, TemplateError> {
        let resolver = self.get(name).ok_or_else(|| TemplateError::UnknownToken {
            name: name.to_owned(),
            position,
        })?;

        resolver.resolve(argument).map_err(|err| match err {
            ResolveError::WrongArity => TemplateError::WrongArity {
                name: name.to_owned(),
                position,
                expected: resolver.arity(),
            },
            ResolveError::Template(err) => err,
        })
    }
}

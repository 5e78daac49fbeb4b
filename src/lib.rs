//! # release-candidate
//!
//! Derive a release version from a project's current version and a template, then render it in
//! whatever shape a build server expects.
//!
//! A version such as `1.2.0-beta-SNAPSHOT` is decomposed into a numeric release (`1.2.0`), a
//! qualifier (`beta`), and build metadata (`SNAPSHOT`). Templates reference those parts, and the
//! current time, with `{{ token }}` placeholders.
//!
//! ## Examples
//!
//! ```
//! use release_candidate::prelude::*;
//!
//! let version = VersionIdentifier::parse("1.2.0-beta-SNAPSHOT");
//! let clock = FixedClock::at_date(2015, 8, 1).unwrap();   // or `SystemClock`
//! let context = TemplateContext::new(&version, &clock);
//!
//! let release = render("{{ api_version }}.{{ timestamp('yyyyMMdd') }}", &context).unwrap();
//! assert_eq!("1.2.0.20150801", release);
//!
//! let release = render("{{ qualified_api_version }}-builton.{{ timestamp('yyyyMMdd') }}", &context).unwrap();
//! assert_eq!("1.2.0-beta-builton.20150801", release);
//! ```
//!
//! Or compile a template once and render it many times:
//!
//! ```
//! use release_candidate::prelude::*;
//!
//! let template = Template::parse("PROJECT_VERSION={{ version }}").unwrap();
//! let clock = SystemClock;
//! for raw in ["1.0.0", "2.0.0-rc1"] {
//!     let version = VersionIdentifier::parse(raw);
//!     let rendered = template.render(&TemplateContext::new(&version, &clock)).unwrap();
//!     assert_eq!(format!("PROJECT_VERSION={raw}"), rendered);
//! }
//! ```
//!
//! ## Tokens
//!
//! In the "Example" column below, the version is `1.2.0-beta-SNAPSHOT` and the date is
//! `2015-08-01`.
//!
//! | Token | Example | Description |
//! |---|---|---|
//! | `{{ version }}` | `1.2.0-beta-SNAPSHOT` | The version as it is |
//! | `{{ api_version }}` | `1.2.0` | Only the numeric release |
//! | `{{ qualified_api_version }}` | `1.2.0-beta` | The numeric release plus the qualifier |
//! | `{{ timestamp('yyyyMMdd') }}` | `20150801` | The current time, in a [Joda-Time pattern](TimestampPattern) |
//!
//! Tokens can be mixed with literal text: `v{{ api_version }}-build.{{ timestamp('yyyyMMdd') }}`
//! renders `v1.2.0-build.20150801`. Anything outside of `{{ }}`, such as a `${build_number}`
//! placeholder meant for another tool, is left untouched.
//!
//! ## Errors
//!
//! Parsing a version never fails: strings that don't look like versions just populate fewer
//! parts. Templates fail with a [TemplateError] for unknown tokens, malformed syntax, or invalid
//! timestamp patterns.
//!
//! ## Prelude
//!
//! release-candidate provides a prelude module for convenience. Use it with:
//!
//! ```
//! use release_candidate::prelude::*;
//! ```
#![warn(missing_docs)]

mod clock;
mod config;
mod context;
mod error;
mod output;
mod release;
mod template;
mod timestamp;
mod version;

pub use crate::clock::{Clock, FixedClock, SystemClock};
pub use crate::config::{
    Config, Settings, DEFAULT_ENCODING, DEFAULT_OUTPUT_TEMPLATE, DEFAULT_OUTPUT_URI,
    DEFAULT_RELEASE_VERSION_FORMAT,
};
pub use crate::context::{
    Resolver, TemplateContext, API_VERSION, QUALIFIED_API_VERSION, TIMESTAMP, VERSION,
};
pub use crate::error::{ConfigError, OutputError, TemplateError};
pub use crate::output::{Charset, OutputTarget};
pub use crate::release::{release_version, structured_output};
pub use crate::template::{render, Template};
pub use crate::timestamp::TimestampPattern;
pub use crate::version::{VersionIdentifier, DEFAULT_SEPARATOR, SNAPSHOT};

/// A convenience module appropriate for glob imports (`use release_candidate::prelude::*;`).
pub mod prelude {
    #[doc(no_inline)]
    pub use crate::render;
    #[doc(no_inline)]
    pub use crate::Clock;
    #[doc(no_inline)]
    pub use crate::FixedClock;
    #[doc(no_inline)]
    pub use crate::SystemClock;
    #[doc(no_inline)]
    pub use crate::Template;
    #[doc(no_inline)]
    pub use crate::TemplateContext;
    #[doc(no_inline)]
    pub use crate::TemplateError;
    #[doc(no_inline)]
    pub use crate::VersionIdentifier;
}

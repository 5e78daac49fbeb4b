use crate::{
    clock::Clock, context::TemplateContext, error::TemplateError, template::Template,
    version::VersionIdentifier,
};

/// Derives the release version from `current` by rendering `format`.
///
/// The result is parsed again, so its `api_version` and `qualified_api_version` are available to
/// the output template.
///
/// ```
/// use release_candidate::{release_version, FixedClock, Template, VersionIdentifier};
///
/// let current = VersionIdentifier::parse("1.2.0-beta-SNAPSHOT");
/// let format = Template::parse("{{ api_version }}.{{ timestamp('yyyyMMdd') }}").unwrap();
/// let clock = FixedClock::at_date(2015, 8, 1).unwrap();
///
/// let release = release_version(&current, &format, &clock).unwrap();
/// assert_eq!("1.2.0.20150801", release.full_version());
/// ```
pub fn release_version(
    current: &VersionIdentifier,
    format: &Template,
    clock: &impl Clock,
) -> Result<VersionIdentifier, TemplateError> {
    let rendered = format.render(&TemplateContext::new(current, clock))?;
    Ok(VersionIdentifier::parse(&rendered))
}

/// Renders the output template for `version`, e.g. `PROJECT_VERSION={{ version }}`.
pub fn structured_output(
    version: &VersionIdentifier,
    template: &Template,
    clock: &impl Clock,
) -> Result<String, TemplateError> {
    template.render(&TemplateContext::new(version, clock))
}

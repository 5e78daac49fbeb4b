use crate::{context::TemplateContext, error::TemplateError};
use core::fmt::{self, Display};
use std::borrow::Cow;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

#[derive(Debug, Clone)]
enum TemplateToken {
    /// Text copied to the output as is.
    Literal(String),

    /// A `{{ name }}` or `{{ name('argument') }}` occurrence. `position` is the byte offset of its
    /// opening braces in the normalized template.
    Call {
        name: String,
        argument: Option<String>,
        position: usize,
    },
}

/// Two tokens are equal when they render the same, wherever they appear.
impl PartialEq for TemplateToken {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (TemplateToken::Literal(a), TemplateToken::Literal(b)) => a == b,
            (
                TemplateToken::Call { name, argument, .. },
                TemplateToken::Call {
                    name: other_name,
                    argument: other_argument,
                    ..
                },
            ) => name == other_name && argument == other_argument,
            _ => false,
        }
    }
}

impl Eq for TemplateToken {}

/// A multi-line template with indentation and blank lines removed, and where each kept line
/// started in the template as written.
struct Normalized<'t> {
    text: Cow<'t, str>,
    /// `(offset in text, offset in the original)` of every kept line
    lines: Vec<(usize, usize)>,
}

impl Normalized<'_> {
    fn original_position(&self, position: usize) -> usize {
        match self.lines.iter().rev().find(|(start, _)| *start <= position) {
            Some((start, original)) => original + (position - start),
            None => position,
        }
    }

    fn relocate(&self, err: TemplateError) -> TemplateError {
        match err {
            TemplateError::Syntax { position, reason } => TemplateError::Syntax {
                position: self.original_position(position),
                reason,
            },
            err => err,
        }
    }
}

/// Where the scanner is, and what it has read of the current token so far.
enum ScanState<'t> {
    Literal,
    InTokenName { start: usize },
    InTokenArg { start: usize, name: &'t str },
}

struct Scanner<'t> {
    text: &'t str,
    pos: usize,
}

impl<'t> Scanner<'t> {
    fn rest(&self) -> &'t str {
        &self.text[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos == self.text.len()
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn eat(&mut self, expected: &str) -> bool {
        let found = self.rest().starts_with(expected);
        if found {
            self.pos += expected.len();
        }
        found
    }

    fn identifier(&mut self) -> Option<&'t str> {
        let rest = self.rest();
        let mut chars = rest.char_indices();
        match chars.next() {
            Some((_, c)) if c.is_ascii_alphabetic() || c == '_' => {}
            _ => return None,
        }
        let len = chars
            .find(|(_, c)| !(c.is_ascii_alphanumeric() || *c == '_'))
            .map_or(rest.len(), |(idx, _)| idx);
        self.pos += len;
        Some(&rest[..len])
    }

    /// Reads a `'...'` or `"..."` string and returns its contents. Returns `Ok(None)` if there is
    /// no opening quote here, and an error if the closing one is missing.
    fn quoted(&mut self) -> Result<Option<&'t str>, TemplateError> {
        let rest = self.rest();
        let Some(quote) = rest.chars().next().filter(|c| *c == '\'' || *c == '"') else {
            return Ok(None);
        };
        let contents = &rest[1..];
        let len = contents.find(quote).ok_or(TemplateError::Syntax {
            position: self.pos,
            reason: "unterminated quoted argument",
        })?;
        self.pos += len + 2;
        Ok(Some(&contents[..len]))
    }

    fn syntax_error(&self, start: usize, reason: &'static str) -> TemplateError {
        if self.at_end() {
            TemplateError::Syntax {
                position: start,
                reason: "unterminated token",
            }
        } else {
            TemplateError::Syntax {
                position: self.pos,
                reason,
            }
        }
    }
}

/// A compiled template: literal text interleaved with `{{ token }}` and `{{ token('argument') }}`
/// occurrences.
///
/// Compiling only checks syntax. Token names are looked up when the template is
/// [rendered](Template::render), so one template can be rendered against many contexts.
///
/// Text outside of the `{{`/`}}` delimiters, including `${...}` placeholders meant for other
/// tools, is copied verbatim.
///
/// When a template spans several lines, leading whitespace is stripped from every line and blank
/// lines are dropped before compiling, so indentation used to lay out a configuration value does
/// not end up in the output.
///
/// ```
/// use release_candidate::{FixedClock, Template, TemplateContext, VersionIdentifier};
///
/// let template = Template::parse("{{ qualified_api_version }}-build.${build_number}").unwrap();
///
/// let version = VersionIdentifier::parse("1.2.0-beta-SNAPSHOT");
/// let context = TemplateContext::new(&version, &FixedClock::at_date(2015, 8, 1).unwrap());
/// assert_eq!("1.2.0-beta-build.${build_number}", template.render(&context).unwrap());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    tokens: Vec<TemplateToken>,
}

impl Template {
    /// Compiles `template`.
    ///
    /// # Errors
    ///
    /// - Returns [TemplateError::Syntax] for an unmatched `{{` or `}}`, a token without a name, or
    ///   an argument without its closing quote or parenthesis. The position is a byte offset into
    ///   `template` as given, even when it spans several lines.
    pub fn parse(template: &str) -> Result<Self, TemplateError> {
        let normalized = normalize(template);
        let mut tokens = scan(&normalized.text).map_err(|err| normalized.relocate(err))?;
        for token in &mut tokens {
            if let TemplateToken::Call { position, .. } = token {
                *position = normalized.original_position(*position);
            }
        }
        Ok(Self { tokens })
    }

    /// Resolves every token against `context` and returns the rendered text.
    ///
    /// # Errors
    ///
    /// - Returns [TemplateError::UnknownToken] if a token is not in `context`.
    /// - Returns [TemplateError::WrongArity] if a token is given an argument it does not take, or
    ///   is missing one it needs.
    /// - Returns [TemplateError::InvalidTimestampPattern] if a `timestamp` argument is not a valid
    ///   pattern.
    pub fn render(&self, context: &TemplateContext) -> Result<String, TemplateError> {
        let mut rendered = String::new();
        for token in &self.tokens {
            match token {
                TemplateToken::Literal(text) => rendered.push_str(text),
                TemplateToken::Call {
                    name,
                    argument,
                    position,
                } => rendered.push_str(&context.resolve(name, argument.as_deref(), *position)?),
            }
        }
        Ok(rendered)
    }

    /// Names of the tokens this template uses, in order of appearance.
    pub fn token_names(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().filter_map(|token| match token {
            TemplateToken::Call { name, .. } => Some(name.as_str()),
            TemplateToken::Literal(_) => None,
        })
    }
}

impl Display for Template {
    /// Displays the template in canonical form, e.g. `v{{ api_version }}.{{ timestamp('yyyy') }}`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in &self.tokens {
            match token {
                TemplateToken::Literal(text) => f.write_str(text)?,
                TemplateToken::Call {
                    name,
                    argument: None,
                    ..
                } => write!(f, "{{{{ {name} }}}}")?,
                TemplateToken::Call {
                    name,
                    argument: Some(argument),
                    ..
                } => {
                    let quote = if argument.contains('\'') { '"' } else { '\'' };
                    write!(f, "{{{{ {name}({quote}{argument}{quote}) }}}}")?
                }
            }
        }
        Ok(())
    }
}

/// Compiles and renders `template` in one go. See [Template].
pub fn render(template: &str, context: &TemplateContext) -> Result<String, TemplateError> {
    Template::parse(template)?.render(context)
}

/// Splits normalized template text into literal and token parts.
fn scan(text: &str) -> Result<Vec<TemplateToken>, TemplateError> {
    let mut scanner = Scanner { text, pos: 0 };
    let mut tokens = Vec::new();
    let mut state = ScanState::Literal;

    loop {
        state = match state {
            ScanState::Literal => {
                let rest = scanner.rest();
                let open = rest.find(OPEN);
                let close = rest.find(CLOSE);

                let stray_close = close.filter(|close| open.map_or(true, |open| *close < open));
                if let Some(close) = stray_close {
                    return Err(TemplateError::Syntax {
                        position: scanner.pos + close,
                        reason: "unmatched `}}`",
                    });
                }

                let Some(open) = open else {
                    push_literal(&mut tokens, rest);
                    break;
                };

                push_literal(&mut tokens, &rest[..open]);
                let start = scanner.pos + open;
                scanner.pos = start + OPEN.len();
                ScanState::InTokenName { start }
            }

            ScanState::InTokenName { start } => {
                scanner.skip_whitespace();
                let name = scanner
                    .identifier()
                    .ok_or_else(|| scanner.syntax_error(start, "expected a token name"))?;
                scanner.skip_whitespace();

                if scanner.eat(CLOSE) {
                    tokens.push(TemplateToken::Call {
                        name: name.to_owned(),
                        argument: None,
                        position: start,
                    });
                    ScanState::Literal
                } else if scanner.eat("(") {
                    ScanState::InTokenArg { start, name }
                } else {
                    return Err(scanner.syntax_error(start, "expected `}}` or `(`"));
                }
            }

            ScanState::InTokenArg { start, name } => {
                scanner.skip_whitespace();
                let argument = scanner
                    .quoted()?
                    .ok_or_else(|| scanner.syntax_error(start, "expected a quoted argument"))?;
                scanner.skip_whitespace();
                if !scanner.eat(")") {
                    return Err(scanner.syntax_error(start, "expected `)`"));
                }
                scanner.skip_whitespace();
                if !scanner.eat(CLOSE) {
                    return Err(scanner.syntax_error(start, "expected `}}`"));
                }

                tokens.push(TemplateToken::Call {
                    name: name.to_owned(),
                    argument: Some(argument.to_owned()),
                    position: start,
                });
                ScanState::Literal
            }
        };
    }

    Ok(tokens)
}

/// Strips leading whitespace from every line of a multi-line template and drops blank lines.
fn normalize(template: &str) -> Normalized<'_> {
    if !template.contains('\n') {
        return Normalized {
            text: Cow::Borrowed(template),
            lines: Vec::new(),
        };
    }

    let mut text = String::with_capacity(template.len());
    let mut lines = Vec::new();
    let mut offset = 0;
    for line in template.split_inclusive('\n') {
        let start = offset;
        offset += line.len();

        let line = line.strip_suffix('\n').unwrap_or(line);
        let line = line.strip_suffix('\r').unwrap_or(line);
        let trimmed = line.trim_start();
        if trimmed.is_empty() {
            continue;
        }

        if !text.is_empty() {
            text.push('\n');
        }
        lines.push((text.len(), start + line.len() - trimmed.len()));
        text.push_str(trimmed);
    }

    Normalized {
        text: Cow::Owned(text),
        lines,
    }
}

fn push_literal(tokens: &mut Vec<TemplateToken>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(TemplateToken::Literal(last)) = tokens.last_mut() {
        last.push_str(text);
    } else {
        tokens.push(TemplateToken::Literal(text.to_owned()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{clock::FixedClock, VersionIdentifier};
    use rstest::*;

    fn context_for(version: &str) -> TemplateContext {
        let version = VersionIdentifier::parse(version);
        TemplateContext::new(&version, &FixedClock::at_date(2015, 8, 1).unwrap())
    }

    #[fixture]
    fn context() -> TemplateContext {
        context_for("1.2.0-beta-SNAPSHOT")
    }

    #[rstest]
    #[case("{{ version }}", "1.2.0-beta-SNAPSHOT")]
    #[case("{{ api_version }}", "1.2.0")]
    #[case("{{ qualified_api_version }}", "1.2.0-beta")]
    #[case("{{ timestamp('YYYYMMdd') }}", "20150801")]
    #[case("{{ api_version }}.{{ timestamp('yyyyMMdd') }}", "1.2.0.20150801")]
    #[case(
        "{{ qualified_api_version }}-builton.{{ timestamp('yyyyMMdd') }}",
        "1.2.0-beta-builton.20150801"
    )]
    #[case(
        "v{{ api_version }}-build.{{ timestamp('yyyyMMdd') }}",
        "v1.2.0-build.20150801"
    )]
    #[case("{{version}}", "1.2.0-beta-SNAPSHOT")]
    #[case("{{   api_version\t}}", "1.2.0")]
    #[case("{{ timestamp ( 'yyyy' ) }}", "2015")]
    #[case(r#"{{ timestamp("yyyy'-Q'") }}"#, "2015-Q")]
    #[case("{{ api_version }}{{ api_version }}", "1.2.01.2.0")]
    #[case(
        "{{ qualified_api_version }}-build.${build_number}",
        "1.2.0-beta-build.${build_number}"
    )]
    #[case("{ version } {version}", "{ version } {version}")]
    #[case("PROJECT_VERSION={{ version }}", "PROJECT_VERSION=1.2.0-beta-SNAPSHOT")]
    fn test_render(context: TemplateContext, #[case] template: &str, #[case] expected: &str) {
        assert_eq!(Ok(expected.to_owned()), render(template, &context));
    }

    #[test]
    fn test_render_version_is_full_version() {
        for raw in ["1.2.0-beta-SNAPSHOT", "", "latest", "1.0.RELEASE", "3"] {
            let context = context_for(raw);
            assert_eq!(Ok(raw.to_owned()), render("{{ version }}", &context));
        }
    }

    #[rstest]
    #[case("")]
    #[case("plain text")]
    #[case("  indented single line  ")]
    #[case("${project.version} { } }{")]
    fn test_render_literal_only(context: TemplateContext, #[case] template: &str) {
        assert_eq!(Ok(template.to_owned()), render(template, &context));
    }

    #[rstest]
    fn test_render_multi_line(context: TemplateContext) {
        let template = "
            ##teamcity[setParameter name='env.PROJECT_VERSION' value='{{ version }}']

            ##teamcity[message text='Project version: {{ version }}']
        ";
        let expected = "##teamcity[setParameter name='env.PROJECT_VERSION' value='1.2.0-beta-SNAPSHOT']\n\
                        ##teamcity[message text='Project version: 1.2.0-beta-SNAPSHOT']";
        assert_eq!(Ok(expected.to_owned()), render(template, &context));
    }

    #[rstest]
    fn test_render_unknown_token(context: TemplateContext) {
        assert_eq!(
            Err(TemplateError::UnknownToken {
                name: "unknown_token".to_owned(),
                position: 0,
            }),
            render("{{ unknown_token }}", &context)
        );
        assert_eq!(
            Err(TemplateError::UnknownToken {
                name: "build".to_owned(),
                position: 2,
            }),
            render("v.{{ build }}", &context)
        );
    }

    #[rstest]
    #[case("{{ version", 0, "unterminated token")]
    #[case("{{", 0, "unterminated token")]
    #[case("1.{{ version }}.{{ timestamp('yyyy'", 16, "unterminated token")]
    #[case("{{ timestamp('yyyy) }}", 13, "unterminated quoted argument")]
    #[case("{{ timestamp('yyyy' }}", 20, "expected `)`")]
    #[case("{{ timestamp('yyyy') x", 21, "expected `}}`")]
    #[case("{{ timestamp(yyyy) }}", 13, "expected a quoted argument")]
    #[case("{{ }}", 3, "expected a token name")]
    #[case("{{ 1version }}", 3, "expected a token name")]
    #[case("{{ version ]]", 11, "expected `}}` or `(`")]
    #[case("version }}", 8, "unmatched `}}`")]
    #[case("}} {{ version }}", 0, "unmatched `}}`")]
    fn test_syntax_error(
        #[case] template: &str,
        #[case] position: usize,
        #[case] reason: &'static str,
    ) {
        let actual = Template::parse(template);
        assert_eq!(Err(TemplateError::Syntax { position, reason }), actual);
    }

    #[rstest]
    #[case("{{ version('x') }}", "version", 0)]
    #[case("{{ timestamp }}", "timestamp", 1)]
    fn test_wrong_arity(
        context: TemplateContext,
        #[case] template: &str,
        #[case] name: &str,
        #[case] expected: usize,
    ) {
        assert_eq!(
            Err(TemplateError::WrongArity {
                name: name.to_owned(),
                position: 0,
                expected,
            }),
            render(template, &context)
        );
    }

    #[rstest]
    fn test_invalid_timestamp_pattern(context: TemplateContext) {
        let actual = render("{{ timestamp('yyyyQQ') }}", &context);
        assert!(matches!(
            actual,
            Err(TemplateError::InvalidTimestampPattern { pattern, .. }) if pattern == "yyyyQQ"
        ));
    }

    #[rstest]
    fn test_render_is_idempotent(context: TemplateContext) {
        let template =
            Template::parse("{{ version }}@{{ timestamp('yyyyMMddHHmmssSSS') }}").unwrap();
        assert_eq!(template.render(&context), template.render(&context));
    }

    #[test]
    fn test_one_timestamp_per_context() {
        let version = VersionIdentifier::parse("1.0");
        let context = TemplateContext::new(&version, &crate::clock::SystemClock);
        let rendered = render(
            "{{ timestamp('HHmmssSSSSSSSSS') }}|{{ timestamp('HHmmssSSSSSSSSS') }}",
            &context,
        )
        .unwrap();
        let (first, second) = rendered.split_once('|').unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_display_round_trip() {
        let args = [
            (
                "v{{api_version}}-{{ timestamp( 'yyyy' ) }}",
                "v{{ api_version }}-{{ timestamp('yyyy') }}",
            ),
            (r#"{{ timestamp("yyyy'T'") }}"#, r#"{{ timestamp("yyyy'T'") }}"#),
            ("${x}", "${x}"),
        ];

        for (template, canonical) in args {
            let parsed = Template::parse(template).unwrap();
            assert_eq!(canonical, parsed.to_string());
            assert_eq!(parsed, Template::parse(&parsed.to_string()).unwrap());
        }
    }

    #[test]
    fn test_equality_ignores_layout() {
        assert_eq!(
            Template::parse("v{{ api_version }}").unwrap(),
            Template::parse("v{{api_version}}").unwrap()
        );
        assert_eq!(
            Template::parse("{{ timestamp('yyyy') }}").unwrap(),
            Template::parse("  \n{{ timestamp ( \"yyyy\" ) }}").unwrap()
        );
        assert_ne!(
            Template::parse("{{ version }}").unwrap(),
            Template::parse("{{ api_version }}").unwrap()
        );
    }

    #[rstest]
    fn test_multi_line_positions_point_into_original(context: TemplateContext) {
        let template = "
            PROJECT_VERSION={{ version }}

            \tBUILD={{ build }}
        ";
        assert_eq!(
            Err(TemplateError::UnknownToken {
                name: "build".to_owned(),
                position: template.find("{{ build").unwrap(),
            }),
            render(template, &context)
        );

        let template = "A={{ version }}\r\n   B={{ timestamp('yyyy) }}\n";
        assert_eq!(
            Err(TemplateError::Syntax {
                position: template.find("'yyyy").unwrap(),
                reason: "unterminated quoted argument",
            }),
            Template::parse(template)
        );

        let template = "A={{ version }}\n   B={{ version";
        assert_eq!(
            Err(TemplateError::Syntax {
                position: template.rfind("{{").unwrap(),
                reason: "unterminated token",
            }),
            Template::parse(template)
        );
    }

    #[test]
    fn test_token_names() {
        let template =
            Template::parse("{{ version }}-{{ timestamp('yyyy') }}-{{ version }}").unwrap();
        let names: Vec<&str> = template.token_names().collect();
        assert_eq!(vec!["version", "timestamp", "version"], names);
    }
}

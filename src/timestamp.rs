use crate::error::TemplateError;
use chrono::{DateTime, Datelike, FixedOffset, Timelike};
use core::iter::Peekable;
use core::str::Chars;

/// A date/time field addressed by a pattern letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Era,
    CenturyOfEra,
    YearOfEra,
    WeekYear,
    WeekOfWeekYear,
    DayOfWeek,
    DayOfWeekText,
    Year,
    DayOfYear,
    Month,
    DayOfMonth,
    HalfDay,
    HourOfHalfDay,
    ClockHourOfHalfDay,
    HourOfDay,
    ClockHourOfDay,
    Minute,
    Second,
    FractionOfSecond,
    TimeZone,
    TimeZoneOffset,
}

impl Field {
    fn from_letter(letter: char) -> Option<Self> {
        use Field::*;
        let field = match letter {
            'G' => Era,
            'C' => CenturyOfEra,
            'Y' => YearOfEra,
            'x' => WeekYear,
            'w' => WeekOfWeekYear,
            'e' => DayOfWeek,
            'E' => DayOfWeekText,
            'y' => Year,
            'D' => DayOfYear,
            'M' => Month,
            'd' => DayOfMonth,
            'a' => HalfDay,
            'K' => HourOfHalfDay,
            'h' => ClockHourOfHalfDay,
            'H' => HourOfDay,
            'k' => ClockHourOfDay,
            'm' => Minute,
            's' => Second,
            'S' => FractionOfSecond,
            'z' => TimeZone,
            'Z' => TimeZoneOffset,
            _ => return None,
        };
        Some(field)
    }

    fn format(&self, width: usize, at: &DateTime<FixedOffset>) -> String {
        use Field::*;
        match self {
            Era => String::from(if at.year_ce().0 { "AD" } else { "BC" }),
            CenturyOfEra => padded(i64::from(at.year_ce().1 / 100), width),
            YearOfEra => year(i64::from(at.year_ce().1), width),
            WeekYear => year(i64::from(at.iso_week().year()), width),
            WeekOfWeekYear => padded(i64::from(at.iso_week().week()), width),
            DayOfWeek => padded(i64::from(at.weekday().number_from_monday()), width),
            DayOfWeekText => text(at, if width >= 4 { "%A" } else { "%a" }),
            Year => year(i64::from(at.year()), width),
            DayOfYear => padded(i64::from(at.ordinal()), width),
            Month => match width {
                1 | 2 => padded(i64::from(at.month()), width),
                3 => text(at, "%b"),
                _ => text(at, "%B"),
            },
            DayOfMonth => padded(i64::from(at.day()), width),
            HalfDay => text(at, "%p"),
            HourOfHalfDay => padded(i64::from(at.hour() % 12), width),
            ClockHourOfHalfDay => padded(i64::from(at.hour12().1), width),
            HourOfDay => padded(i64::from(at.hour()), width),
            ClockHourOfDay => match at.hour() {
                0 => padded(24, width),
                hour => padded(i64::from(hour), width),
            },
            Minute => padded(i64::from(at.minute()), width),
            Second => padded(i64::from(at.second()), width),
            FractionOfSecond => fraction(at.nanosecond() % 1_000_000_000, width),
            TimeZone => text(at, "%Z"),
            TimeZoneOffset => text(at, if width == 1 { "%z" } else { "%:z" }),
        }
    }
}

fn padded(value: i64, width: usize) -> String {
    if value < 0 {
        format!("-{:0width$}", value.unsigned_abs())
    } else {
        format!("{value:0width$}")
    }
}

/// Two letters mean a two-digit year, any other count is a minimum width.
fn year(value: i64, width: usize) -> String {
    if width == 2 {
        padded(value.rem_euclid(100), 2)
    } else {
        padded(value, width)
    }
}

/// Fraction digits are truncated, not rounded, and zero-filled past millisecond precision.
fn fraction(nanos: u32, width: usize) -> String {
    let mut digits = format!("{:03}", nanos / 1_000_000);
    if width <= digits.len() {
        digits.truncate(width);
    } else {
        digits.extend(core::iter::repeat('0').take(width - 3));
    }
    digits
}

fn text(at: &DateTime<FixedOffset>, strftime: &str) -> String {
    at.format(strftime).to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PatternToken {
    Field { field: Field, width: usize },
    Literal(String),
}

/// A compiled date/time pattern in the Joda-Time letter convention, e.g. `yyyyMMdd` or
/// `yyyy-MM-dd'T'HH:mm:ss.SSSZZ`.
///
/// Repeating a letter sets the minimum width of a numeric field (zero-padded). `yy` is a two-digit
/// year, `MMM` and `EEE` are short month and weekday names, `MMMM` and `EEEE` full ones. Text in
/// single quotes is copied as is, and `''` is a single quote. Every other non-letter is a literal.
///
/// Like Joda-Time, fractions of a second (`S`) carry millisecond precision: `SSSSSS` is the
/// milliseconds followed by three zeros. Unlike Joda-Time, `z` renders the UTC offset (`+02:00`)
/// rather than a zone name, since the time only carries a fixed offset.
///
/// ```
/// use release_candidate::{FixedClock, Clock, TimestampPattern};
///
/// let pattern = TimestampPattern::parse("yyyy.MM.dd").unwrap();
/// let now = FixedClock::at_date(2015, 8, 1).unwrap().now();
/// assert_eq!("2015.08.01", pattern.format(&now));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampPattern {
    tokens: Vec<PatternToken>,
}

impl TimestampPattern {
    /// Compiles `pattern`.
    ///
    /// # Errors
    ///
    /// - Returns [TemplateError::InvalidTimestampPattern] if the pattern uses a letter that does
    ///   not name a field, or if quoted text is not closed.
    pub fn parse(pattern: &str) -> Result<Self, TemplateError> {
        let invalid = |reason: String| TemplateError::InvalidTimestampPattern {
            pattern: pattern.to_owned(),
            reason,
        };

        let mut tokens = Vec::new();
        let mut chars = pattern.chars().peekable();

        while let Some(c) = chars.next() {
            if c.is_ascii_alphabetic() {
                let field = Field::from_letter(c)
                    .ok_or_else(|| invalid(format!("illegal pattern letter `{c}`")))?;
                let mut width = 1;
                while chars.next_if_eq(&c).is_some() {
                    width += 1;
                }
                tokens.push(PatternToken::Field { field, width });
            } else if c == '\'' {
                let quoted = read_quoted(&mut chars)
                    .ok_or_else(|| invalid("unterminated quoted text".to_owned()))?;
                push_literal(&mut tokens, &quoted);
            } else {
                push_literal(&mut tokens, c.encode_utf8(&mut [0; 4]));
            }
        }

        Ok(Self { tokens })
    }

    /// Formats `at` with this pattern.
    pub fn format(&self, at: &DateTime<FixedOffset>) -> String {
        let mut formatted = String::new();
        for token in &self.tokens {
            match token {
                PatternToken::Field { field, width } => {
                    formatted.push_str(&field.format(*width, at))
                }
                PatternToken::Literal(text) => formatted.push_str(text),
            }
        }
        formatted
    }
}

/// Reads quoted text after its opening quote, consuming the closing one. `''` right after the
/// opening quote, or inside quoted text, is a literal quote. Returns `None` if the text never
/// closes.
fn read_quoted(chars: &mut Peekable<Chars<'_>>) -> Option<String> {
    if chars.next_if_eq(&'\'').is_some() {
        return Some("'".to_owned());
    }

    let mut quoted = String::new();
    loop {
        match chars.next()? {
            '\'' => {
                if chars.next_if_eq(&'\'').is_some() {
                    quoted.push('\'');
                } else {
                    return Some(quoted);
                }
            }
            c => quoted.push(c),
        }
    }
}

fn push_literal(tokens: &mut Vec<PatternToken>, text: &str) {
    // consecutive literals are merged to keep formatting to one push per run
    if let Some(PatternToken::Literal(last)) = tokens.last_mut() {
        last.push_str(text);
    } else {
        tokens.push(PatternToken::Literal(text.to_owned()));
    }
}

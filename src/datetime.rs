//! Date/time formatting and strict parsing with `SimpleDateFormat`-style patterns.
//!
//! Patterns are sequences of pattern letters and literals, e.g. `yyyy-MM-dd HH:mm:ss,SSS`:
//!
//! | Letter     | Meaning                                              |
//! |------------|------------------------------------------------------|
//! | `G`        | era, `AD` / `BC`                                     |
//! | `y`        | year (`yy` is a two-digit year)                      |
//! | `Y`        | ISO week-based year                                  |
//! | `M`, `L`   | month (`MMM` abbreviated, `MMMM` full)               |
//! | `w`        | ISO week of year                                     |
//! | `W`        | week of month, weeks starting on Monday              |
//! | `D`        | day of year                                          |
//! | `d`        | day of month                                         |
//! | `F`        | occurrence of the weekday within the month           |
//! | `E`        | day of week (`EEEE` full)                            |
//! | `u`        | day of week number, 1 is Monday                      |
//! | `a`        | `AM` / `PM`                                          |
//! | `H`        | hour of day, 0-23                                    |
//! | `k`        | hour of day, 1-24                                    |
//! | `K`        | hour of am/pm, 0-11                                  |
//! | `h`        | hour of am/pm, 1-12                                  |
//! | `m`        | minute                                               |
//! | `s`        | second                                               |
//! | `S`        | millisecond                                          |
//! | `z`        | UTC offset as `GMT+08:00`                            |
//! | `Z`        | UTC offset as `+0800`                                |
//! | `X`        | UTC offset as `+08`, `+0800` or `+08:00`; `Z` for UTC |
//!
//! Any other ASCII letter is rejected. Text inside single quotes is literal and `''` stands for a
//! single quote. Every call compiles the pattern afresh, so nothing is shared between threads.
//!
//! The offset letters need a value that carries one, such as a [`chrono::DateTime`]; see
//! [`Timestamp`].

use std::fmt::Write as _;
use std::mem;

use chrono::{
    DateTime, Datelike, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone,
    Timelike, Weekday,
};
use snafu::prelude::*;

const MONTHS_FULL: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];
const MONTHS_ABBREV: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];
const WEEKDAYS_FULL: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];
const WEEKDAYS_ABBREV: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DateTimeError {
    #[snafu(display("date/time pattern cannot be blank"))]
    EmptyPattern,

    #[snafu(display("date/time text cannot be blank"))]
    EmptyInput,

    #[snafu(display("illegal pattern character {c:?} in {pattern:?}"))]
    IllegalPatternCharacter { c: char, pattern: String },

    #[snafu(display("unterminated quote in pattern {pattern:?}"))]
    UnterminatedQuote { pattern: String },

    #[snafu(display("pattern {pattern:?} needs a value with a UTC offset"))]
    MissingOffset { pattern: String },

    #[snafu(display("length of {text:?} differs from the length of pattern {pattern:?}"))]
    LengthMismatch { pattern: String, text: String },

    #[snafu(display("{text:?} does not match pattern {pattern:?} at position {position}"))]
    Unparseable {
        pattern: String,
        text: String,
        position: usize,
    },

    #[snafu(display("{text:?} has an out-of-range {field} for pattern {pattern:?}"))]
    OutOfRange {
        pattern: String,
        text: String,
        field: &'static str,
    },
}

/// A calendar value that patterns can render.
pub trait Timestamp: Datelike + Timelike {
    /// Offset from UTC, if the value is tied to a time zone.
    fn utc_offset(&self) -> Option<FixedOffset>;
}

impl Timestamp for NaiveDateTime {
    fn utc_offset(&self) -> Option<FixedOffset> {
        None
    }
}

impl<Tz: TimeZone> Timestamp for DateTime<Tz> {
    fn utc_offset(&self) -> Option<FixedOffset> {
        Some(self.offset().fix())
    }
}

/// Named patterns used throughout configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pattern {
    /// `yyyyMMdd`
    CompactDate,
    /// `yyyy-MM-dd`
    Date,
    /// `HHmmss`
    CompactTime,
    /// `HH:mm:ss,SSS`
    TimeMillis,
    /// `HH:mm`
    ShortTime,
    /// `HHmm`
    CompactShortTime,
    /// `yyyy-MM-dd HH:mm:ss SSS`
    DateTimeMillis,
    /// `yyyyMMdd_HHmmss_SSS`
    FileStamp,
    /// `yyyy/MM/dd HH:mm:ss.SSS`
    SlashDateTimeMillis,
    /// `yyyyMMddHHmmssSSS`
    CompactDateTimeMillis,
    /// `yyMMddHHmmssSSS`
    ShortCompactDateTimeMillis,
    /// `yyyyMMddHHmmss`
    CompactDateTime,
    /// `yyyy-MM-dd HH:mm:ss`
    DateTime,
}

impl Pattern {
    pub const ALL: [Pattern; 13] = [
        Self::CompactDate,
        Self::Date,
        Self::CompactTime,
        Self::TimeMillis,
        Self::ShortTime,
        Self::CompactShortTime,
        Self::DateTimeMillis,
        Self::FileStamp,
        Self::SlashDateTimeMillis,
        Self::CompactDateTimeMillis,
        Self::ShortCompactDateTimeMillis,
        Self::CompactDateTime,
        Self::DateTime,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CompactDate => "yyyyMMdd",
            Self::Date => "yyyy-MM-dd",
            Self::CompactTime => "HHmmss",
            Self::TimeMillis => "HH:mm:ss,SSS",
            Self::ShortTime => "HH:mm",
            Self::CompactShortTime => "HHmm",
            Self::DateTimeMillis => "yyyy-MM-dd HH:mm:ss SSS",
            Self::FileStamp => "yyyyMMdd_HHmmss_SSS",
            Self::SlashDateTimeMillis => "yyyy/MM/dd HH:mm:ss.SSS",
            Self::CompactDateTimeMillis => "yyyyMMddHHmmssSSS",
            Self::ShortCompactDateTimeMillis => "yyMMddHHmmssSSS",
            Self::CompactDateTime => "yyyyMMddHHmmss",
            Self::DateTime => "yyyy-MM-dd HH:mm:ss",
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::CompactDate => "compact_date",
            Self::Date => "date",
            Self::CompactTime => "compact_time",
            Self::TimeMillis => "time_millis",
            Self::ShortTime => "short_time",
            Self::CompactShortTime => "compact_short_time",
            Self::DateTimeMillis => "date_time_millis",
            Self::FileStamp => "file_stamp",
            Self::SlashDateTimeMillis => "slash_date_time_millis",
            Self::CompactDateTimeMillis => "compact_date_time_millis",
            Self::ShortCompactDateTimeMillis => "short_compact_date_time_millis",
            Self::CompactDateTime => "compact_date_time",
            Self::DateTime => "date_time",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|pattern| pattern.name() == name)
    }

    pub fn format<T: Timestamp>(self, value: &T) -> Result<String, DateTimeError> {
        format(self.as_str(), value)
    }

    pub fn parse(self, text: &str) -> Result<NaiveDateTime, DateTimeError> {
        parse(self.as_str(), text)
    }
}

/// Convert milliseconds since the Unix epoch into local time.
#[must_use]
pub fn local_from_millis(millis: i64) -> Option<DateTime<Local>> {
    Local.timestamp_millis_opt(millis).single()
}

/// Render `value` using `pattern`.
pub fn format<T: Timestamp>(pattern: &str, value: &T) -> Result<String, DateTimeError> {
    let layout = Layout::compile(pattern)?;
    let mut buf = String::with_capacity(pattern.len() + 8);

    for item in &layout.items {
        match *item {
            Item::Literal(ref literal) => buf.push_str(literal),
            Item::Field { field, width } => write_field(&mut buf, field, width, value)
                .context(MissingOffsetSnafu { pattern })?,
        }
    }

    Ok(buf)
}

/// Strictly parse `text` using `pattern`.
///
/// The text must have exactly as many characters as the pattern, must be consumed entirely,
/// and every component must be in range. Components missing from the pattern default to
/// `1970-01-01 00:00:00.000`. When the text carries a UTC offset the result is converted to
/// local time.
pub fn parse(pattern: &str, text: &str) -> Result<NaiveDateTime, DateTimeError> {
    let layout = Layout::compile(pattern)?;

    ensure!(!text.trim().is_empty(), EmptyInputSnafu);
    ensure!(
        pattern.chars().count() == text.chars().count(),
        LengthMismatchSnafu { pattern, text }
    );

    let mut parser = Parser {
        pattern,
        text,
        rest: text,
        parsed: Parsed::default(),
    };
    parser.parse(&layout.items)?;
    parser.resolve()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Era,
    Year,
    WeekYear,
    Month,
    WeekOfYear,
    WeekOfMonth,
    DayOfYear,
    Day,
    DayOfWeekInMonth,
    Weekday,
    WeekdayNumber,
    Meridiem,
    Hour,
    Hour1To24,
    Hour0To11,
    Hour12,
    Minute,
    Second,
    Millisecond,
    ZoneName,
    Rfc822Zone,
    IsoZone,
}

impl Field {
    fn from_letter(c: char) -> Option<Self> {
        Some(match c {
            'G' => Self::Era,
            'y' => Self::Year,
            'Y' => Self::WeekYear,
            'M' | 'L' => Self::Month,
            'w' => Self::WeekOfYear,
            'W' => Self::WeekOfMonth,
            'D' => Self::DayOfYear,
            'd' => Self::Day,
            'F' => Self::DayOfWeekInMonth,
            'E' => Self::Weekday,
            'u' => Self::WeekdayNumber,
            'a' => Self::Meridiem,
            'H' => Self::Hour,
            'k' => Self::Hour1To24,
            'K' => Self::Hour0To11,
            'h' => Self::Hour12,
            'm' => Self::Minute,
            's' => Self::Second,
            'S' => Self::Millisecond,
            'z' => Self::ZoneName,
            'Z' => Self::Rfc822Zone,
            'X' => Self::IsoZone,
            _ => return None,
        })
    }

    fn is_numeric(self, width: usize) -> bool {
        match self {
            Self::Month => width < 3,
            Self::Era
            | Self::Weekday
            | Self::Meridiem
            | Self::ZoneName
            | Self::Rfc822Zone
            | Self::IsoZone => false,
            _ => true,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Era => "era",
            Self::Year => "year",
            Self::WeekYear => "week year",
            Self::Month => "month",
            Self::WeekOfYear => "week of year",
            Self::WeekOfMonth => "week of month",
            Self::DayOfYear => "day of year",
            Self::Day => "day",
            Self::DayOfWeekInMonth => "day of week in month",
            Self::Weekday | Self::WeekdayNumber => "day of week",
            Self::Meridiem => "am/pm marker",
            Self::Hour | Self::Hour1To24 | Self::Hour0To11 | Self::Hour12 => "hour",
            Self::Minute => "minute",
            Self::Second => "second",
            Self::Millisecond => "millisecond",
            Self::ZoneName | Self::Rfc822Zone | Self::IsoZone => "time zone",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Item {
    Literal(String),
    Field { field: Field, width: usize },
}

/// A compiled pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Layout {
    items: Vec<Item>,
}

impl Layout {
    fn compile(pattern: &str) -> Result<Self, DateTimeError> {
        ensure!(!pattern.trim().is_empty(), EmptyPatternSnafu);

        let mut items = Vec::with_capacity(8);
        let mut literal = String::new();
        let mut chars = pattern.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '\'' {
                if chars.next_if_eq(&'\'').is_some() {
                    literal.push('\'');
                    continue;
                }

                loop {
                    match chars.next() {
                        Some('\'') if chars.next_if_eq(&'\'').is_some() => literal.push('\''),
                        Some('\'') => break,
                        Some(q) => literal.push(q),
                        None => return UnterminatedQuoteSnafu { pattern }.fail(),
                    }
                }
                continue;
            }

            if !c.is_ascii_alphabetic() {
                literal.push(c);
                continue;
            }

            let field = Field::from_letter(c).context(IllegalPatternCharacterSnafu { c, pattern })?;
            let mut width = 1;
            while chars.next_if_eq(&c).is_some() {
                width += 1;
            }
            // `XXX` is the longest ISO 8601 offset form.
            ensure!(
                field != Field::IsoZone || width <= 3,
                IllegalPatternCharacterSnafu { c, pattern }
            );

            if !literal.is_empty() {
                items.push(Item::Literal(mem::take(&mut literal)));
            }
            items.push(Item::Field { field, width });
        }

        if !literal.is_empty() {
            items.push(Item::Literal(literal));
        }

        Ok(Self { items })
    }
}

/// Returns `None` when `field` is an offset and `value` has none.
fn write_field<T: Timestamp>(buf: &mut String, field: Field, width: usize, value: &T) -> Option<()> {
    let number = match field {
        Field::Era => {
            buf.push_str(if value.year() > 0 { "AD" } else { "BC" });
            return Some(());
        }
        Field::Year if width == 2 => i64::from(value.year().rem_euclid(100)),
        Field::Year => i64::from(value.year()),
        Field::WeekYear if width == 2 => i64::from(value.iso_week().year().rem_euclid(100)),
        Field::WeekYear => i64::from(value.iso_week().year()),
        Field::Month if width >= 3 => {
            let names = if width == 3 { MONTHS_ABBREV } else { MONTHS_FULL };
            buf.push_str(names[value.month0() as usize]);
            return Some(());
        }
        Field::Month => i64::from(value.month()),
        Field::WeekOfYear => i64::from(value.iso_week().week()),
        Field::WeekOfMonth => i64::from(week_of_month(value.day(), value.weekday())),
        Field::DayOfYear => i64::from(value.ordinal()),
        Field::Day => i64::from(value.day()),
        Field::DayOfWeekInMonth => i64::from((value.day() - 1) / 7 + 1),
        Field::Weekday => {
            let i = value.weekday().num_days_from_monday() as usize;
            buf.push_str(if width >= 4 {
                WEEKDAYS_FULL[i]
            } else {
                WEEKDAYS_ABBREV[i]
            });
            return Some(());
        }
        Field::WeekdayNumber => i64::from(value.weekday().number_from_monday()),
        Field::Meridiem => {
            buf.push_str(if value.hour12().0 { "PM" } else { "AM" });
            return Some(());
        }
        Field::Hour => i64::from(value.hour()),
        Field::Hour1To24 => i64::from(match value.hour() {
            0 => 24,
            hour => hour,
        }),
        Field::Hour0To11 => i64::from(value.hour() % 12),
        Field::Hour12 => i64::from(value.hour12().1),
        Field::Minute => i64::from(value.minute()),
        Field::Second => i64::from(value.second()),
        // Leap seconds carry nanoseconds past 1e9.
        Field::Millisecond => i64::from((value.nanosecond() / 1_000_000).min(999)),
        Field::ZoneName | Field::Rfc822Zone | Field::IsoZone => {
            write_offset(buf, field, width, value.utc_offset()?);
            return Some(());
        }
    };

    _ = write!(buf, "{number:0width$}");
    Some(())
}

fn write_offset(buf: &mut String, field: Field, width: usize, offset: FixedOffset) {
    let seconds = offset.local_minus_utc();
    if field == Field::IsoZone && seconds == 0 {
        return buf.push('Z');
    }

    let sign = if seconds < 0 { '-' } else { '+' };
    let minutes = seconds.unsigned_abs() / 60;
    let (hours, minutes) = (minutes / 60, minutes % 60);

    _ = match field {
        Field::ZoneName => write!(buf, "GMT{sign}{hours:02}:{minutes:02}"),
        Field::IsoZone if width == 1 => write!(buf, "{sign}{hours:02}"),
        Field::IsoZone if width == 3 => write!(buf, "{sign}{hours:02}:{minutes:02}"),
        _ => write!(buf, "{sign}{hours:02}{minutes:02}"),
    };
}

/// Week of the month for weeks starting on Monday. The week holding the 1st is week 1.
fn week_of_month(day: u32, weekday: Weekday) -> u32 {
    let first = (weekday.num_days_from_monday() + 7 - (day - 1) % 7) % 7;
    (day - 1 + first) / 7 + 1
}

/// Resolve a two-digit year into the century window `[now - 80, now + 20)`.
fn resolve_two_digit_year(year: i32, now: i32) -> i32 {
    let start = now - 80;
    let candidate = start - start.rem_euclid(100) + year;
    if candidate < start {
        candidate + 100
    } else {
        candidate
    }
}

#[derive(Debug, Default)]
struct Parsed {
    bc: Option<bool>,
    year: Option<i32>,
    week_year: Option<i32>,
    month: Option<u32>,
    week_of_year: Option<u32>,
    week_of_month: Option<u32>,
    day_of_year: Option<u32>,
    day: Option<u32>,
    day_of_week_in_month: Option<u32>,
    weekday: Option<Weekday>,
    weekday_number: Option<u32>,
    pm: Option<bool>,
    hour: Option<u32>,
    hour_1_to_24: Option<u32>,
    hour_0_to_11: Option<u32>,
    hour12: Option<u32>,
    minute: Option<u32>,
    second: Option<u32>,
    millisecond: Option<u32>,
    /// Seconds east of UTC.
    offset: Option<i32>,
}

/// Represents an on-going parse.
struct Parser<'a> {
    pattern: &'a str,
    text: &'a str,
    rest: &'a str,
    parsed: Parsed,
}

impl Parser<'_> {
    fn parse(&mut self, items: &[Item]) -> Result<(), DateTimeError> {
        for (i, item) in items.iter().enumerate() {
            match *item {
                Item::Literal(ref literal) => {
                    self.rest = self
                        .rest
                        .strip_prefix(literal.as_str())
                        .ok_or_else(|| self.unparseable())?;
                }
                Item::Field { field, width } if field.is_numeric(width) => {
                    // Adjacent numeric fields cannot be told apart, so each takes exactly its
                    // width.
                    let abutting = matches!(
                        items.get(i + 1),
                        Some(&Item::Field { field: next, width: w }) if next.is_numeric(w)
                    );
                    self.parse_number(field, width, abutting)?;
                }
                Item::Field { field, .. } => self.parse_text(field)?,
            }
        }

        ensure!(self.rest.is_empty(), UnparseableSnafu {
            pattern: self.pattern,
            text: self.text,
            position: self.position(),
        });
        Ok(())
    }

    fn parse_number(
        &mut self,
        field: Field,
        width: usize,
        abutting: bool,
    ) -> Result<(), DateTimeError> {
        let available = self
            .rest
            .bytes()
            .take_while(u8::is_ascii_digit)
            .count();
        let len = if abutting { width } else { available };

        if available == 0 || available < len {
            return Err(self.unparseable());
        }

        let (digits, rest) = self.rest.split_at(len);
        let value = digits
            .parse::<u32>()
            .map_err(|_| self.out_of_range(field.name()))?;
        self.rest = rest;

        if matches!(field, Field::Year | Field::WeekYear) {
            let year = i32::try_from(value).map_err(|_| self.out_of_range(field.name()))?;
            let year = if width <= 2 && len == 2 {
                resolve_two_digit_year(year, Local::now().year())
            } else {
                year
            };
            if field == Field::Year {
                self.parsed.year = Some(year);
            } else {
                self.parsed.week_year = Some(year);
            }
            return Ok(());
        }

        let p = &mut self.parsed;
        let slot = match field {
            Field::Month => &mut p.month,
            Field::WeekOfYear => &mut p.week_of_year,
            Field::WeekOfMonth => &mut p.week_of_month,
            Field::DayOfYear => &mut p.day_of_year,
            Field::Day => &mut p.day,
            Field::DayOfWeekInMonth => &mut p.day_of_week_in_month,
            Field::WeekdayNumber => &mut p.weekday_number,
            Field::Hour => &mut p.hour,
            Field::Hour1To24 => &mut p.hour_1_to_24,
            Field::Hour0To11 => &mut p.hour_0_to_11,
            Field::Hour12 => &mut p.hour12,
            Field::Minute => &mut p.minute,
            Field::Second => &mut p.second,
            Field::Millisecond => &mut p.millisecond,
            _ => unreachable!("{field:?} is not a numeric field"),
        };
        *slot = Some(value);

        Ok(())
    }

    fn parse_text(&mut self, field: Field) -> Result<(), DateTimeError> {
        match field {
            Field::Month => {
                let i = self
                    .match_name(&MONTHS_FULL)
                    .or_else(|| self.match_name(&MONTHS_ABBREV))
                    .ok_or_else(|| self.unparseable())?;
                self.parsed.month = Some(i as u32 + 1);
            }
            Field::Weekday => {
                let i = self
                    .match_name(&WEEKDAYS_FULL)
                    .or_else(|| self.match_name(&WEEKDAYS_ABBREV))
                    .ok_or_else(|| self.unparseable())?;
                self.parsed.weekday = Some(WEEKDAYS[i]);
            }
            Field::Era => {
                let i = self
                    .match_name(&["AD", "BC"])
                    .ok_or_else(|| self.unparseable())?;
                self.parsed.bc = Some(i == 1);
            }
            Field::Meridiem => {
                let i = self
                    .match_name(&["AM", "PM"])
                    .ok_or_else(|| self.unparseable())?;
                self.parsed.pm = Some(i == 1);
            }
            Field::ZoneName | Field::Rfc822Zone | Field::IsoZone => self.parse_offset(field)?,
            _ => unreachable!("{field:?} is not a text field"),
        }

        Ok(())
    }

    /// Accepts `+hh`, `+hhmm` and `+hh:mm`, plus `Z` for `X` and a `GMT`/`UTC` prefix for `z`.
    fn parse_offset(&mut self, field: Field) -> Result<(), DateTimeError> {
        if field == Field::IsoZone && self.match_name(&["Z"]).is_some() {
            self.parsed.offset = Some(0);
            return Ok(());
        }
        if field == Field::ZoneName
            && self.match_name(&["GMT", "UTC"]).is_some()
            && !self.rest.starts_with(['+', '-'])
        {
            self.parsed.offset = Some(0);
            return Ok(());
        }

        let negative = match self.rest.as_bytes().first() {
            Some(b'+') => false,
            Some(b'-') => true,
            _ => return Err(self.unparseable()),
        };
        self.rest = &self.rest[1..];

        let hours = self.take_digits(2)?;
        let minutes = if let Some(rest) = self.rest.strip_prefix(':') {
            self.rest = rest;
            self.take_digits(2)?
        } else if self.rest.starts_with(|c: char| c.is_ascii_digit()) {
            self.take_digits(2)?
        } else {
            0
        };
        if hours > 23 || minutes > 59 {
            return Err(self.out_of_range("time zone"));
        }

        let seconds = i32::try_from((hours * 60 + minutes) * 60)
            .map_err(|_| self.out_of_range("time zone"))?;
        self.parsed.offset = Some(if negative { -seconds } else { seconds });
        Ok(())
    }

    fn take_digits(&mut self, len: usize) -> Result<u32, DateTimeError> {
        let digits = self
            .rest
            .get(..len)
            .filter(|digits| digits.bytes().all(|b| b.is_ascii_digit()))
            .ok_or_else(|| self.unparseable())?;
        let value = digits.parse().map_err(|_| self.unparseable())?;
        self.rest = &self.rest[len..];
        Ok(value)
    }

    /// Consume the first of `names` that prefixes the remaining input, ignoring ASCII case.
    fn match_name(&mut self, names: &[&str]) -> Option<usize> {
        let i = names.iter().position(|name| {
            self.rest
                .get(..name.len())
                .is_some_and(|s| s.eq_ignore_ascii_case(name))
        })?;
        self.rest = &self.rest[names[i].len()..];
        Some(i)
    }

    fn resolve(self) -> Result<NaiveDateTime, DateTimeError> {
        let p = &self.parsed;

        let year = match p.year {
            Some(year) if year < 1 => return Err(self.out_of_range("year")),
            Some(year) if p.bc == Some(true) => 1 - year,
            Some(year) => year,
            None => 1970,
        };
        if NaiveDate::from_ymd_opt(year, 1, 1).is_none() {
            return Err(self.out_of_range("year"));
        }

        let date = match (p.month, p.day, p.day_of_year) {
            (None, None, Some(ordinal)) => NaiveDate::from_yo_opt(year, ordinal)
                .ok_or_else(|| self.out_of_range("day of year"))?,
            (month, day, _) => {
                let month = month.unwrap_or(1);
                if !(1..=12).contains(&month) {
                    return Err(self.out_of_range("month"));
                }
                NaiveDate::from_ymd_opt(year, month, day.unwrap_or(1))
                    .ok_or_else(|| self.out_of_range("day"))?
            }
        };

        // Fields that are implied by the date must agree with it.
        self.agree(date.ordinal(), p.day_of_year, "day of year")?;
        self.agree(date.iso_week().year(), p.week_year, "week year")?;
        self.agree(date.iso_week().week(), p.week_of_year, "week of year")?;
        self.agree(week_of_month(date.day(), date.weekday()), p.week_of_month, "week of month")?;
        self.agree((date.day() - 1) / 7 + 1, p.day_of_week_in_month, "day of week in month")?;
        self.agree(date.weekday(), p.weekday, "weekday")?;
        self.agree(date.weekday().number_from_monday(), p.weekday_number, "day of week")?;

        let pm = if p.pm == Some(true) { 12 } else { 0 };
        let hour = match (p.hour, p.hour_1_to_24, p.hour12, p.hour_0_to_11) {
            (Some(hour), ..) => hour,
            (None, Some(hour), ..) if (1..=24).contains(&hour) => hour % 24,
            (None, None, Some(hour), _) if (1..=12).contains(&hour) => hour % 12 + pm,
            (None, None, None, Some(hour)) if hour < 12 => hour + pm,
            (None, None, None, None) => pm,
            _ => return Err(self.out_of_range("hour")),
        };
        if hour > 23 {
            return Err(self.out_of_range("hour"));
        }
        let minute = p.minute.unwrap_or(0);
        if minute > 59 {
            return Err(self.out_of_range("minute"));
        }
        let second = p.second.unwrap_or(0);
        if second > 59 {
            return Err(self.out_of_range("second"));
        }
        // chrono reads 1000..=1999 as a leap second.
        let millisecond = p.millisecond.unwrap_or(0);
        if millisecond > 999 {
            return Err(self.out_of_range("millisecond"));
        }
        let time = NaiveTime::from_hms_milli_opt(hour, minute, second, millisecond)
            .ok_or_else(|| self.out_of_range("millisecond"))?;

        let datetime = NaiveDateTime::new(date, time);
        let Some(offset) = p.offset else {
            return Ok(datetime);
        };

        FixedOffset::east_opt(offset)
            .and_then(|offset| offset.from_local_datetime(&datetime).single())
            .map(|instant| instant.with_timezone(&Local).naive_local())
            .ok_or_else(|| self.out_of_range("time zone"))
    }

    fn agree<V: PartialEq>(
        &self,
        actual: V,
        parsed: Option<V>,
        field: &'static str,
    ) -> Result<(), DateTimeError> {
        match parsed {
            Some(parsed) if parsed != actual => Err(self.out_of_range(field)),
            _ => Ok(()),
        }
    }

    /// Character offset of the remaining input.
    fn position(&self) -> usize {
        self.text[..self.text.len() - self.rest.len()].chars().count()
    }

    fn unparseable(&self) -> DateTimeError {
        DateTimeError::Unparseable {
            pattern: self.pattern.to_owned(),
            text: self.text.to_owned(),
            position: self.position(),
        }
    }

    fn out_of_range(&self, field: &'static str) -> DateTimeError {
        DateTimeError::OutOfRange {
            pattern: self.pattern.to_owned(),
            text: self.text.to_owned(),
            field,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 5)
            .and_then(|date| date.and_hms_milli_opt(7, 8, 9, 45))
            .expect("hardcoded date should be valid")
    }

    fn date(year: i32, month: u32, day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .expect("hardcoded date should be valid")
    }

    #[test]
    fn named_patterns() {
        let t = sample();
        let expected = [
            (Pattern::CompactDate, "20240305"),
            (Pattern::Date, "2024-03-05"),
            (Pattern::CompactTime, "070809"),
            (Pattern::TimeMillis, "07:08:09,045"),
            (Pattern::ShortTime, "07:08"),
            (Pattern::CompactShortTime, "0708"),
            (Pattern::DateTimeMillis, "2024-03-05 07:08:09 045"),
            (Pattern::FileStamp, "20240305_070809_045"),
            (Pattern::SlashDateTimeMillis, "2024/03/05 07:08:09.045"),
            (Pattern::CompactDateTimeMillis, "20240305070809045"),
            (Pattern::ShortCompactDateTimeMillis, "240305070809045"),
            (Pattern::CompactDateTime, "20240305070809"),
            (Pattern::DateTime, "2024-03-05 07:08:09"),
        ];

        for (pattern, text) in expected {
            assert_eq!(pattern.format(&t).as_deref(), Ok(text), "{pattern:?}");
        }
    }

    #[test]
    fn registry_lookup() {
        for pattern in Pattern::ALL {
            assert_eq!(Pattern::from_name(pattern.name()), Some(pattern));
        }
        assert_eq!(Pattern::from_name("date1"), None);
    }

    #[test]
    fn format_text_fields() {
        let t = sample();
        assert_eq!(
            format("EEE, d MMM yyyy hh:mm a", &t).as_deref(),
            Ok("Tue, 5 Mar 2024 07:08 AM")
        );
        assert_eq!(format("EEEE MMMM", &t).as_deref(), Ok("Tuesday March"));

        let evening = t.with_hour(19).expect("hardcoded hour should be valid");
        assert_eq!(format("h a", &evening).as_deref(), Ok("7 PM"));
    }

    #[test]
    fn format_quoted_literals() {
        assert_eq!(
            format("yyyy'T'HH 'o''clock'", &sample()).as_deref(),
            Ok("2024T07 o'clock")
        );
        assert_eq!(format("''yy''", &sample()).as_deref(), Ok("'24'"));
    }

    #[test]
    fn format_rejects_bad_patterns() {
        assert_eq!(format("  ", &sample()), Err(DateTimeError::EmptyPattern));
        assert_eq!(
            format("yyyy-bb", &sample()),
            Err(DateTimeError::IllegalPatternCharacter {
                c: 'b',
                pattern: "yyyy-bb".to_owned()
            })
        );
        assert!(matches!(
            format("yyyy'T", &sample()),
            Err(DateTimeError::UnterminatedQuote { .. })
        ));
    }

    #[test]
    fn parse_date() {
        assert_eq!(parse("yyyy-MM-dd", "2024-01-05"), Ok(date(2024, 1, 5)));
        assert_eq!(Pattern::CompactDateTimeMillis.parse("20240305070809045"), Ok(sample()));
    }

    #[test]
    fn parse_time_only_defaults_to_epoch_date() {
        let expected = date(1970, 1, 1)
            .with_hour(23)
            .and_then(|t| t.with_minute(59))
            .and_then(|t| t.with_second(59))
            .expect("hardcoded time should be valid");
        assert_eq!(parse("HHmmss", "235959"), Ok(expected));
    }

    #[test]
    fn parse_requires_equal_length() {
        assert_eq!(
            parse("yyyy-MM-dd", "2024-01-5"),
            Err(DateTimeError::LengthMismatch {
                pattern: "yyyy-MM-dd".to_owned(),
                text: "2024-01-5".to_owned()
            })
        );
    }

    #[test]
    fn parse_rejects_out_of_range_components() {
        let field = |result: Result<NaiveDateTime, DateTimeError>| match result {
            Err(DateTimeError::OutOfRange { field, .. }) => field,
            other => panic!("expected out-of-range error, got {other:?}"),
        };

        assert_eq!(field(parse("yyyy-MM-dd", "2024-13-05")), "month");
        assert_eq!(field(parse("yyyy-MM-dd", "2023-02-29")), "day");
        assert_eq!(field(parse("HH:mm", "24:00")), "hour");
        assert_eq!(field(parse("HH:mm", "12:60")), "minute");
        assert_eq!(field(parse("EEE yyyy-MM-dd", "Mon 2024-03-05")), "weekday");
        assert_eq!(field(parse("HH:mm:ss.SSSS", "10:00:59.1500")), "millisecond");
        assert_eq!(field(parse("yyyy-MM-dd", "0000-01-01")), "year");
        assert_eq!(field(parse("yyyyyy", "999999")), "year");
        assert_eq!(field(parse("kk:mm", "00:30")), "hour");
        assert_eq!(field(parse("KK:mm", "12:30")), "hour");
        assert_eq!(parse("yyyy-MM-dd", "2024-02-29"), Ok(date(2024, 2, 29)));
    }

    #[test]
    fn parse_rejects_mismatched_content() {
        assert_eq!(
            parse("yyyy-MM-dd", "2024-0a-05"),
            Err(DateTimeError::Unparseable {
                pattern: "yyyy-MM-dd".to_owned(),
                text: "2024-0a-05".to_owned(),
                position: 6
            })
        );
        assert!(matches!(
            parse("yyyy/MM/dd", "2024-01-05"),
            Err(DateTimeError::Unparseable { position: 4, .. })
        ));
        assert_eq!(parse("yyyyMMdd", "        "), Err(DateTimeError::EmptyInput));
    }

    #[test]
    fn parse_text_fields() {
        assert_eq!(parse("dd MMM yyyy", "05 mar 2024"), Ok(date(2024, 3, 5)));
        assert_eq!(parse("EEE yyyy-MM-dd", "Tue 2024-03-05"), Ok(date(2024, 3, 5)));

        let evening = parse("hh:mm aa", "07:30 PM").expect("hardcoded time should parse");
        assert_eq!((evening.hour(), evening.minute()), (19, 30));
        let midnight = parse("hh:mm aa", "12:00 AM").expect("hardcoded time should parse");
        assert_eq!(midnight.hour(), 0);
    }

    #[test]
    fn two_digit_years() {
        assert_eq!(resolve_two_digit_year(24, 2026), 2024);
        assert_eq!(resolve_two_digit_year(50, 2026), 1950);
        assert_eq!(resolve_two_digit_year(45, 2026), 2045);
        assert_eq!(resolve_two_digit_year(46, 2026), 1946);
    }

    #[test]
    fn millis_to_local_time_round_trips() {
        let local = local_from_millis(0).expect("epoch should be representable");
        assert_eq!(local.timestamp_millis(), 0);

        let back = Local
            .from_local_datetime(&local.naive_local())
            .single()
            .expect("epoch should map to a single instant");
        assert_eq!(back.timestamp_millis(), 0);
    }

    #[test]
    fn format_calendar_fields() {
        let t = sample();
        assert_eq!(format("GG yyyy", &t).as_deref(), Ok("AD 2024"));
        assert_eq!(format("YYYY-'W'ww-u", &t).as_deref(), Ok("2024-W10-2"));
        assert_eq!(format("DDD", &t).as_deref(), Ok("065"));
        assert_eq!(format("W F", &t).as_deref(), Ok("2 1"));
        assert_eq!(format("LL/dd", &t).as_deref(), Ok("03/05"));

        // 2024-12-30 is a Monday in ISO week 1 of 2025.
        let new_year = date(2024, 12, 30);
        assert_eq!(format("YY ww yy", &new_year).as_deref(), Ok("25 01 24"));
    }

    #[test]
    fn format_hour_variants() {
        let hours = |t: NaiveDateTime| format("H k K h", &t).expect("hardcoded pattern");

        assert_eq!(hours(sample()), "7 7 7 7");
        assert_eq!(hours(date(2024, 3, 5)), "0 24 0 12");
        let evening = sample().with_hour(19).expect("hardcoded hour should be valid");
        assert_eq!(hours(evening), "19 19 7 7");
    }

    #[test]
    fn format_utc_offsets() {
        let at = |seconds: i32| {
            FixedOffset::east_opt(seconds)
                .and_then(|tz| tz.from_local_datetime(&sample()).single())
                .expect("hardcoded offset should be valid")
        };

        let east = at(8 * 3600);
        assert_eq!(format("yyyyMMddHHmmssZ", &east).as_deref(), Ok("20240305070809+0800"));
        assert_eq!(format("X|XX|XXX", &east).as_deref(), Ok("+08|+0800|+08:00"));
        assert_eq!(format("z", &east).as_deref(), Ok("GMT+08:00"));

        let west = at(-(5 * 3600 + 30 * 60));
        assert_eq!(format("Z XXX", &west).as_deref(), Ok("-0530 -05:30"));
        assert_eq!(format("Z X", &at(0)).as_deref(), Ok("+0000 Z"));

        assert_eq!(
            format("HH Z", &sample()),
            Err(DateTimeError::MissingOffset {
                pattern: "HH Z".to_owned()
            })
        );
        assert!(matches!(
            format("XXXX", &east),
            Err(DateTimeError::IllegalPatternCharacter { c: 'X', .. })
        ));
    }

    #[test]
    fn parse_calendar_fields() {
        assert_eq!(parse("yyyy DDD", "2024 065"), Ok(date(2024, 3, 5)));
        assert_eq!(parse("yyyy-MM-dd u", "2024-03-05 2"), Ok(date(2024, 3, 5)));
        assert_eq!(parse("yyyy-MM-dd ww", "2024-03-05 10"), Ok(date(2024, 3, 5)));
        assert_eq!(parse("GG yyyy-MM-dd", "AD 2024-03-05"), Ok(date(2024, 3, 5)));

        let field = |result: Result<NaiveDateTime, DateTimeError>| match result {
            Err(DateTimeError::OutOfRange { field, .. }) => field,
            other => panic!("expected out-of-range error, got {other:?}"),
        };
        assert_eq!(field(parse("yyyy-MM-dd u", "2024-03-05 3")), "day of week");
        assert_eq!(field(parse("yyyy-MM-dd ww", "2024-03-05 11")), "week of year");
        assert_eq!(field(parse("yyyy DDD", "2023 366")), "day of year");
    }

    #[test]
    fn parse_hour_variants() {
        let hour = |pattern: &str, text: &str| parse(pattern, text).map(|t| t.hour());

        assert_eq!(hour("kk:mm", "24:30"), Ok(0));
        assert_eq!(hour("kk:mm", "13:30"), Ok(13));
        assert_eq!(hour("KK:mm aa", "11:30 PM"), Ok(23));
        assert_eq!(hour("KK:mm aa", "00:30 AM"), Ok(0));
    }

    #[test]
    fn parse_utc_offsets() {
        // 2024-07-15T12:00:00Z
        let instant = |parsed: NaiveDateTime| {
            Local
                .from_local_datetime(&parsed)
                .single()
                .map(|t| t.timestamp_millis())
        };
        let expected = Some(1_721_044_800_000);

        let cases = [
            ("yyyy-MM-dd HH:mmZZZZZ", "2024-07-15 20:00+0800"),
            ("yyyy-MM-dd HH:mmX", "2024-07-15 12:00Z"),
            ("yyyy-MM-dd HH:mmZZZZZ", "2024-07-15 06:30-0530"),
            ("yyyy-MM-dd HH:mm zzzzzzzzz", "2024-07-15 21:00 GMT+09:00"),
        ];
        for (pattern, text) in cases {
            match parse(pattern, text) {
                Ok(parsed) => assert_eq!(instant(parsed), expected, "{pattern}"),
                Err(err) => panic!("{pattern}: {err}"),
            }
        }

        assert!(matches!(
            parse("HH:mmZZZZZ", "12:00+2400"),
            Err(DateTimeError::OutOfRange { field: "time zone", .. })
        ));
    }
}

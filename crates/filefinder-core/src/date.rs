//! Date aggregation for the `date` pseudo-group.
//!
//! Several default groups are date elements. This module combines their
//! matched strings into a single [`NaiveDateTime`], and decomposes a date back
//! into per-element values when the `date` pseudo-group is fixed.
//!
//! Elements, in increasing priority: `Y B m d j H M S F x X`.
//!
//! | Name | Meaning |
//! |------|---------|
//! | `Y` | year |
//! | `B` | month name, full or 3-letter, any case |
//! | `m`, `d` | month, day of month |
//! | `j` | day of year, relative to the resolved year |
//! | `H`, `M`, `S` | hour, minute, second |
//! | `F` | `YYYY-mm-dd` |
//! | `x` | `YYYYmmdd` |
//! | `X` | `HHMMSS` (seconds optional) |

use std::collections::HashMap;
use std::ops::Range;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

use crate::error::{FinderError, FinderResult};
use crate::matches::Matches;
use crate::value::Value;

/// Names of the groups taking part in a date.
pub const DATE_ELEMENTS: &str = "YBmdjHMSFxX";

const MONTH_NAMES: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

/// Whether a group name is a date element.
pub fn is_date_element(name: &str) -> bool {
    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => DATE_ELEMENTS.contains(c),
        _ => false,
    }
}

/// Month number (1-12) of a full or abbreviated month name, ignoring case.
pub fn month_number(name: &str) -> Option<u32> {
    let name = name.to_lowercase();
    MONTH_NAMES
        .iter()
        .position(|m| *m == name || (name.len() == 3 && m.starts_with(&name)))
        .map(|i| i as u32 + 1)
}

/// Fallback for the date fields a filename does not provide.
///
/// Any subset of fields may be set; unset ones fall back to
/// 1970-01-01 00:00:00.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DefaultDate {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub day: Option<u32>,
    pub hour: Option<u32>,
    pub minute: Option<u32>,
    pub second: Option<u32>,
}

impl DefaultDate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_month(mut self, month: u32) -> Self {
        self.month = Some(month);
        self
    }

    pub fn with_day(mut self, day: u32) -> Self {
        self.day = Some(day);
        self
    }

    pub fn with_hour(mut self, hour: u32) -> Self {
        self.hour = Some(hour);
        self
    }

    pub fn with_minute(mut self, minute: u32) -> Self {
        self.minute = Some(minute);
        self
    }

    pub fn with_second(mut self, second: u32) -> Self {
        self.second = Some(second);
        self
    }
}

impl From<NaiveDateTime> for DefaultDate {
    fn from(d: NaiveDateTime) -> Self {
        DefaultDate {
            year: Some(d.year()),
            month: Some(d.month()),
            day: Some(d.day()),
            hour: Some(d.hour()),
            minute: Some(d.minute()),
            second: Some(d.second()),
        }
    }
}

impl From<NaiveDate> for DefaultDate {
    fn from(d: NaiveDate) -> Self {
        DefaultDate::new()
            .with_year(d.year())
            .with_month(d.month())
            .with_day(d.day())
    }
}

struct DateParts {
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: u32,
}

impl DateParts {
    fn from_default(default: Option<DefaultDate>) -> Self {
        let d = default.unwrap_or_default();
        DateParts {
            year: d.year.unwrap_or(1970),
            month: d.month.unwrap_or(1),
            day: d.day.unwrap_or(1),
            hour: d.hour.unwrap_or(0),
            minute: d.minute.unwrap_or(0),
            second: d.second.unwrap_or(0),
        }
    }
}

fn parse_element<T: FromStr>(name: char, raw: &str) -> FinderResult<T> {
    raw.parse().map_err(|_| FinderError::ParseValue {
        group: name.to_string(),
        value: raw.to_string(),
        message: "not a valid date element".to_string(),
    })
}

fn slice(name: char, raw: &str, range: Range<usize>) -> FinderResult<String> {
    raw.get(range)
        .map(str::to_string)
        .ok_or_else(|| FinderError::ParseValue {
            group: name.to_string(),
            value: raw.to_string(),
            message: "too short to hold a date".to_string(),
        })
}

/// Build a date from the date elements of a match set.
///
/// Discarded groups are ignored, as are optional groups that matched nothing.
/// When an element appears several times, the last one wins. Missing fields
/// are taken from `default`, then from 1970-01-01 00:00:00.
///
/// # Errors
///
/// - `DateUnavailable` if no date element was matched, or the date is invalid.
/// - `ParseValue` if an element is not a number.
pub fn get_date(matches: &Matches, default: Option<DefaultDate>) -> FinderResult<NaiveDateTime> {
    let mut elements: HashMap<char, String> = HashMap::new();
    for m in matches.iter() {
        let group = m.group();
        if group.is_discard() || m.raw().is_empty() || !is_date_element(group.name()) {
            continue;
        }
        if let Some(name) = group.name().chars().next() {
            elements.insert(name, m.raw().to_string());
        }
    }
    if elements.is_empty() {
        return Err(FinderError::DateUnavailable {
            message: "no date element in the pattern".to_string(),
        });
    }

    let mut parts = DateParts::from_default(default);

    if let Some(raw) = elements.remove(&'B') {
        if let Some(month) = month_number(&raw) {
            parts.month = month;
        }
    }

    // Combined elements are split into their components.
    if let Some(raw) = elements.remove(&'F') {
        elements.insert('Y', slice('F', &raw, 0..4)?);
        elements.insert('m', slice('F', &raw, 5..7)?);
        elements.insert('d', slice('F', &raw, 8..10)?);
    }
    if let Some(raw) = elements.remove(&'x') {
        elements.insert('Y', slice('x', &raw, 0..4)?);
        elements.insert('m', slice('x', &raw, 4..6)?);
        elements.insert('d', slice('x', &raw, 6..8)?);
    }
    if let Some(raw) = elements.remove(&'X') {
        elements.insert('H', slice('X', &raw, 0..2)?);
        elements.insert('M', slice('X', &raw, 2..4)?);
        if raw.len() > 4 {
            elements.insert('S', slice('X', &raw, 4..6)?);
        }
    }

    if let Some(raw) = elements.get(&'Y') {
        parts.year = parse_element('Y', raw)?;
    }
    if let Some(raw) = elements.get(&'m') {
        parts.month = parse_element('m', raw)?;
    }
    if let Some(raw) = elements.get(&'d') {
        parts.day = parse_element('d', raw)?;
    }
    if let Some(raw) = elements.get(&'j') {
        let ordinal: u32 = parse_element('j', raw)?;
        let date = NaiveDate::from_yo_opt(parts.year, ordinal).ok_or_else(|| {
            FinderError::DateUnavailable {
                message: format!("day {} does not exist in year {}", ordinal, parts.year),
            }
        })?;
        parts.month = date.month();
        parts.day = date.day();
    }
    if let Some(raw) = elements.get(&'H') {
        parts.hour = parse_element('H', raw)?;
    }
    if let Some(raw) = elements.get(&'M') {
        parts.minute = parse_element('M', raw)?;
    }
    if let Some(raw) = elements.get(&'S') {
        parts.second = parse_element('S', raw)?;
    }

    NaiveDate::from_ymd_opt(parts.year, parts.month, parts.day)
        .and_then(|d| d.and_hms_opt(parts.hour, parts.minute, parts.second))
        .ok_or_else(|| FinderError::DateUnavailable {
            message: format!(
                "invalid date {:04}-{:02}-{:02} {:02}:{:02}:{:02}",
                parts.year, parts.month, parts.day, parts.hour, parts.minute, parts.second
            ),
        })
}

/// Value a date element group takes for a given date.
///
/// Returns `None` for names that are not date elements.
pub fn date_element_value(date: &NaiveDateTime, name: &str) -> Option<Value> {
    let value = match name {
        "Y" => Value::Int(i64::from(date.year())),
        "m" => Value::Int(i64::from(date.month())),
        "d" => Value::Int(i64::from(date.day())),
        "j" => Value::Int(i64::from(date.ordinal())),
        "H" => Value::Int(i64::from(date.hour())),
        "M" => Value::Int(i64::from(date.minute())),
        "S" => Value::Int(i64::from(date.second())),
        "B" => Value::Str(date.format("%B").to_string()),
        "F" => Value::Str(date.format("%Y-%m-%d").to_string()),
        "x" => Value::Int(parse_formatted(date, "%Y%m%d")?),
        "X" => Value::Int(parse_formatted(date, "%H%M%S")?),
        _ => return None,
    };
    Some(value)
}

fn parse_formatted(date: &NaiveDateTime, fmt: &str) -> Option<i64> {
    date.format(fmt).to_string().parse().ok()
}

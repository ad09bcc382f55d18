//! Format specs: value <-> string <-> regex.
//!
//! A group's format spec follows a subset of the usual format mini-language:
//!
//! ```text
//! [[fill]align][sign]["0"][width]["." precision][type]
//! ```
//!
//! with `type` one of `s`, `d`, `f`, `e`, `E` (`s` when omitted). From a spec we
//! derive three things:
//!
//! - a formatter producing the canonical string of a value,
//! - a regex fragment matching any string the formatter could produce,
//! - a parser stripping the padding and converting back to a typed value.
//!
//! The regex does not enforce the width: padding runs are matched with `fill*`.
//!
//! ## Dangerous formats
//!
//! Padding is stripped from the side(s) given by the alignment, stopping at the
//! first character that is not the fill character. For numbers this is only
//! sound if the fill character cannot start or end the number itself, so a
//! numeric spec with a width and a fill among digits, `+`, `-` or `.` is
//! rejected (except the usual sign-aware zero padding, `05d`).
//!
//! For strings any fill is accepted; the value must not start or end with the
//! fill character.

use std::fmt;

use thiserror::Error;
use winnow::ascii::digit1;
use winnow::combinator::{alt, opt, preceded};
use winnow::prelude::*;
use winnow::token::{any, one_of};
use winnow::ModalResult;

use crate::value::Value;

/// Error type for format spec operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormatError {
    /// The format spec does not follow the grammar, or combines incompatible options.
    #[error("invalid format spec '{spec}': {message}")]
    Malformed { spec: String, message: String },

    /// The type letter is not one of `sdfeE`.
    #[error("unsupported format type '{kind}' in '{spec}'")]
    UnsupportedType { spec: String, kind: char },

    /// Padding could not be stripped unambiguously.
    #[error("dangerous format spec '{spec}': {reason}")]
    Dangerous { spec: String, reason: String },

    /// The value cannot be formatted, or the string cannot be parsed.
    #[error("format '{spec}': {message}")]
    Value { spec: String, message: String },
}

// ============================================================================
// Spec Components
// ============================================================================

/// Kind of value a spec handles, one variant per supported type letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatKind {
    /// `s`
    String,
    /// `d`
    Integer,
    /// `f`
    Fixed,
    /// `e`
    ExpLower,
    /// `E`
    ExpUpper,
}

impl FormatKind {
    fn from_char(c: char) -> Option<Self> {
        match c {
            's' => Some(FormatKind::String),
            'd' => Some(FormatKind::Integer),
            'f' => Some(FormatKind::Fixed),
            'e' => Some(FormatKind::ExpLower),
            'E' => Some(FormatKind::ExpUpper),
            _ => None,
        }
    }

    /// Returns true for the numeric kinds.
    pub fn is_numeric(&self) -> bool {
        !matches!(self, FormatKind::String)
    }

    fn is_float(&self) -> bool {
        matches!(
            self,
            FormatKind::Fixed | FormatKind::ExpLower | FormatKind::ExpUpper
        )
    }
}

/// Alignment of the value inside its padded width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    /// `<`
    Left,
    /// `>`
    Right,
    /// `^`
    Center,
    /// `=`: padding goes between the sign and the digits.
    SignAware,
}

impl Align {
    fn from_char(c: char) -> Self {
        match c {
            '<' => Align::Left,
            '^' => Align::Center,
            '=' => Align::SignAware,
            _ => Align::Right,
        }
    }
}

/// Sign policy for numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    /// `-`: only negative numbers carry a sign (default).
    Minus,
    /// `+`: always print the sign.
    Plus,
    /// ` `: a space in front of non-negative numbers.
    Space,
}

impl Sign {
    fn from_char(c: char) -> Self {
        match c {
            '+' => Sign::Plus,
            ' ' => Sign::Space,
            _ => Sign::Minus,
        }
    }

    fn regex(&self) -> &'static str {
        match self {
            Sign::Minus => "-?",
            Sign::Plus => "[+-]",
            Sign::Space => "[ -]",
        }
    }

    fn prefix(&self, negative: bool) -> &'static str {
        match (negative, self) {
            (true, _) => "-",
            (false, Sign::Minus) => "",
            (false, Sign::Plus) => "+",
            (false, Sign::Space) => " ",
        }
    }
}

/// Components exactly as written in the format spec, before defaults are applied.
#[derive(Debug, Default)]
struct RawSpec {
    fill: Option<char>,
    align: Option<char>,
    sign: Option<char>,
    zero: bool,
    width: Option<usize>,
    precision: Option<usize>,
    kind: Option<char>,
}

// ============================================================================
// FormatSpec
// ============================================================================

/// A parsed format spec.
#[derive(Debug, Clone, PartialEq)]
pub struct FormatSpec {
    spec: String,
    kind: FormatKind,
    fill: char,
    align: Align,
    sign: Sign,
    zero_pad: bool,
    width: usize,
    precision: Option<usize>,
}

impl FormatSpec {
    /// Parse a format spec.
    ///
    /// # Errors
    ///
    /// - `Malformed` if the format spec does not follow the grammar or combines options
    ///   that make no sense for its type (sign on a string, precision on an integer).
    /// - `UnsupportedType` for a type letter other than `sdfeE`.
    /// - `Dangerous` when padding could not be stripped back unambiguously.
    pub fn parse(spec: &str) -> Result<Self, FormatError> {
        let raw = parse_raw_spec.parse(spec).map_err(|e| FormatError::Malformed {
            spec: spec.to_string(),
            message: format!("{:?}", e),
        })?;
        Self::from_raw(spec, raw)
    }

    fn from_raw(spec: &str, raw: RawSpec) -> Result<Self, FormatError> {
        let malformed = |message: &str| FormatError::Malformed {
            spec: spec.to_string(),
            message: message.to_string(),
        };

        let kind_char = raw.kind.unwrap_or('s');
        let kind = FormatKind::from_char(kind_char).ok_or_else(|| FormatError::UnsupportedType {
            spec: spec.to_string(),
            kind: kind_char,
        })?;

        if kind == FormatKind::String {
            if raw.sign.is_some() {
                return Err(malformed("sign not allowed in string format"));
            }
            if raw.align == Some('=') {
                return Err(malformed("'=' alignment not allowed in string format"));
            }
        }
        if kind == FormatKind::Integer && raw.precision.is_some() {
            return Err(malformed("precision not allowed in integer format"));
        }

        let default_align = if kind.is_numeric() {
            Align::Right
        } else {
            Align::Left
        };

        // '0' without explicit alignment is sign-aware zero padding for numbers.
        let (fill, align, zero_pad) = match (raw.align, raw.zero) {
            (None, true) if kind.is_numeric() => ('0', Align::SignAware, true),
            (None, true) => ('0', default_align, false),
            (Some(a), true) => (raw.fill.unwrap_or('0'), Align::from_char(a), false),
            (Some(a), false) => (raw.fill.unwrap_or(' '), Align::from_char(a), false),
            (None, false) => (' ', default_align, false),
        };

        let precision = match (kind.is_float(), raw.precision) {
            (true, None) => Some(6),
            (_, p) => p,
        };

        let format = FormatSpec {
            spec: spec.to_string(),
            kind,
            fill,
            align,
            sign: raw.sign.map(Sign::from_char).unwrap_or(Sign::Minus),
            zero_pad,
            width: raw.width.unwrap_or(0),
            precision,
        };
        format.check_dangerous()?;
        Ok(format)
    }

    fn check_dangerous(&self) -> Result<(), FormatError> {
        if !self.kind.is_numeric() || self.width == 0 {
            return Ok(());
        }
        if self.fill == '0' && self.align == Align::SignAware {
            return Ok(());
        }
        if self.fill.is_ascii_digit() || matches!(self.fill, '+' | '-' | '.') {
            return Err(FormatError::Dangerous {
                spec: self.spec.clone(),
                reason: format!(
                    "fill character '{}' cannot be told apart from the number",
                    self.fill
                ),
            });
        }
        Ok(())
    }

    /// The format spec as written.
    pub fn as_str(&self) -> &str {
        &self.spec
    }

    pub fn kind(&self) -> FormatKind {
        self.kind
    }

    pub fn fill(&self) -> char {
        self.fill
    }

    pub fn align(&self) -> Align {
        self.align
    }

    pub fn sign(&self) -> Sign {
        self.sign
    }

    pub fn zero_pad(&self) -> bool {
        self.zero_pad
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn precision(&self) -> Option<usize> {
        self.precision
    }

    fn value_error(&self, message: String) -> FormatError {
        FormatError::Value {
            spec: self.spec.clone(),
            message,
        }
    }

    // ------------------------------------------------------------------------
    // Formatting
    // ------------------------------------------------------------------------

    /// Format a value into its canonical string.
    ///
    /// Integers are accepted by the float kinds. Numbers given to a string
    /// spec are rendered with their plain representation.
    pub fn format(&self, value: &Value) -> Result<String, FormatError> {
        match self.kind {
            FormatKind::String => {
                let text = match value {
                    Value::Str(s) => s.clone(),
                    Value::Int(_) | Value::Float(_) => value.to_string(),
                    other => {
                        return Err(self.value_error(format!("cannot format a {}", other.kind())))
                    }
                };
                let text = match self.precision {
                    Some(p) => text.chars().take(p).collect(),
                    None => text,
                };
                Ok(self.pad("", &text))
            }
            FormatKind::Integer => {
                let v = value.as_int().ok_or_else(|| {
                    self.value_error(format!("cannot format a {} as integer", value.kind()))
                })?;
                let sign = self.sign.prefix(v < 0);
                Ok(self.pad(sign, &v.unsigned_abs().to_string()))
            }
            FormatKind::Fixed | FormatKind::ExpLower | FormatKind::ExpUpper => {
                let v = value.as_float().ok_or_else(|| {
                    self.value_error(format!("cannot format a {} as float", value.kind()))
                })?;
                let sign = self.sign.prefix(v.is_sign_negative() && !v.is_nan());
                let precision = self.precision.unwrap_or(6);
                let digits = match self.kind {
                    FormatKind::Fixed => format!("{:.*}", precision, v.abs()),
                    FormatKind::ExpLower => exponent_notation(v.abs(), precision, 'e'),
                    _ => exponent_notation(v.abs(), precision, 'E'),
                };
                Ok(self.pad(sign, &digits))
            }
        }
    }

    /// Apply alignment and fill to a sign prefix and the value body.
    fn pad(&self, sign: &str, body: &str) -> String {
        let len = sign.chars().count() + body.chars().count();
        if self.width <= len {
            return format!("{}{}", sign, body);
        }
        let missing = self.width - len;
        let fill = |n: usize| self.fill.to_string().repeat(n);
        match self.align {
            Align::Left => format!("{}{}{}", sign, body, fill(missing)),
            Align::Right => format!("{}{}{}", fill(missing), sign, body),
            Align::Center => {
                let left = missing / 2;
                format!("{}{}{}{}", fill(left), sign, body, fill(missing - left))
            }
            Align::SignAware => format!("{}{}{}", sign, fill(missing), body),
        }
    }

    // ------------------------------------------------------------------------
    // Regex generation
    // ------------------------------------------------------------------------

    /// Regex fragment matching any string produced by [`FormatSpec::format`].
    ///
    /// Width is not enforced: `04d` gives `-?0*\d+`, which also matches
    /// values wider than four digits or with fewer leading zeros. Fix a group
    /// or give it an explicit `rgx` to match an exact width.
    pub fn regex(&self) -> String {
        let fill_rgx = format!("{}*", regex::escape(&self.fill.to_string()));
        let padded = self.width > 0;

        let body = match self.kind {
            FormatKind::String => match self.precision {
                Some(p) => format!(".{{0,{}}}?", p),
                None => ".*?".to_string(),
            },
            kind => {
                let mut rgx = self.sign.regex().to_string();
                if padded && self.align == Align::SignAware {
                    rgx.push_str(&fill_rgx);
                }
                let fraction = match self.precision {
                    Some(p) if p > 0 => format!(r"\.\d{{{}}}", p),
                    _ => String::new(),
                };
                match kind {
                    FormatKind::Integer => rgx.push_str(r"\d+"),
                    FormatKind::Fixed => {
                        rgx.push_str(r"\d+");
                        rgx.push_str(&fraction);
                    }
                    FormatKind::ExpLower | FormatKind::ExpUpper => {
                        let marker = if kind == FormatKind::ExpLower { 'e' } else { 'E' };
                        rgx.push_str(r"\d");
                        rgx.push_str(&fraction);
                        rgx.push_str(&format!(r"{}[+-]\d+", marker));
                    }
                    FormatKind::String => {}
                }
                rgx
            }
        };

        if !padded {
            return body;
        }
        match self.align {
            Align::Right => format!("{}{}", fill_rgx, body),
            Align::Left => format!("{}{}", body, fill_rgx),
            Align::Center => format!("{}{}{}", fill_rgx, body, fill_rgx),
            Align::SignAware => body,
        }
    }

    // ------------------------------------------------------------------------
    // Parsing
    // ------------------------------------------------------------------------

    /// Parse a string produced by this spec back into a value.
    pub fn parse_value(&self, s: &str) -> Result<Value, FormatError> {
        match self.kind {
            FormatKind::String => Ok(Value::Str(self.strip_padding(s).to_string())),
            FormatKind::Integer => {
                let cleaned = self.clean_number(s);
                cleaned
                    .parse::<i64>()
                    .map(Value::Int)
                    .map_err(|e| self.value_error(format!("cannot parse '{}': {}", s, e)))
            }
            _ => {
                let cleaned = self.clean_number(s);
                cleaned
                    .parse::<f64>()
                    .map(Value::Float)
                    .map_err(|e| self.value_error(format!("cannot parse '{}': {}", s, e)))
            }
        }
    }

    /// Remove fill characters on the side(s) given by the alignment.
    fn strip_padding<'a>(&self, s: &'a str) -> &'a str {
        if self.width == 0 {
            return s;
        }
        match self.align {
            Align::Left => s.trim_end_matches(self.fill),
            Align::Right => s.trim_start_matches(self.fill),
            Align::Center => s.trim_matches(self.fill),
            Align::SignAware => s,
        }
    }

    /// Strip padding and the space sign so the standard parsers accept the number.
    fn clean_number(&self, s: &str) -> String {
        // Zero padding is understood by the number parsers.
        let unpadded = if self.fill == '0' {
            s.to_string()
        } else if self.width > 0 && self.align == Align::SignAware {
            match s.chars().next() {
                Some(c @ ('+' | '-' | ' ')) => {
                    let rest = &s[c.len_utf8()..];
                    format!("{}{}", c, rest.trim_start_matches(self.fill))
                }
                _ => s.trim_start_matches(self.fill).to_string(),
            }
        } else {
            self.strip_padding(s).to_string()
        };
        unpadded.trim_start_matches(' ').to_string()
    }
}

impl fmt::Display for FormatSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.spec)
    }
}

/// Exponent notation with a signed exponent of at least two digits (`1.50e+03`).
fn exponent_notation(v: f64, precision: usize, marker: char) -> String {
    let formatted = format!("{:.*e}", precision, v);
    match formatted.split_once('e') {
        Some((mantissa, exponent)) => {
            let exp: i32 = exponent.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{}{}{}{:02}", mantissa, marker, sign, exp.unsigned_abs())
        }
        // inf / NaN have no exponent
        None => formatted,
    }
}

// ============================================================================
// Parser implementation using winnow
// ============================================================================

const ALIGN_CHARS: [char; 4] = ['<', '>', '=', '^'];

/// Parse the whole spec.
fn parse_raw_spec(input: &mut &str) -> ModalResult<RawSpec> {
    let (fill, align) = parse_fill_align(input)?;
    let sign = opt(one_of(['+', '-', ' '])).parse_next(input)?;
    let zero = opt('0').parse_next(input)?.is_some();
    let width = opt(parse_number).parse_next(input)?;
    let precision = opt(preceded('.', parse_number)).parse_next(input)?;
    let kind = opt(one_of(|c: char| c.is_ascii_alphabetic())).parse_next(input)?;

    Ok(RawSpec {
        fill,
        align,
        sign,
        zero,
        width,
        precision,
        kind,
    })
}

/// Parse `[[fill]align]`.
fn parse_fill_align(input: &mut &str) -> ModalResult<(Option<char>, Option<char>)> {
    let parsed = opt(alt((
        (any, one_of(ALIGN_CHARS)).map(|(fill, align)| (Some(fill), Some(align))),
        one_of(ALIGN_CHARS).map(|align| (None, Some(align))),
    )))
    .parse_next(input)?;
    Ok(parsed.unwrap_or((None, None)))
}

/// Parse a run of digits into a number.
fn parse_number(input: &mut &str) -> ModalResult<usize> {
    digit1.try_map(|s: &str| s.parse::<usize>()).parse_next(input)
}

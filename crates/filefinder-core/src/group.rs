//! Groups: the varying segments of a filename pattern.
//!
//! A group is written `%(name[:property]*)` in a pattern. Properties come in
//! any order, each at most once:
//!
//! - `fmt=<spec>`: format spec, the regex is derived from it.
//! - `rgx=<regex>`: custom regex, used verbatim.
//! - `bool=<true>[:<false>]`: two alternatives selected by a boolean.
//! - `opt`: the group may be absent (`(...)?`).
//! - `discard`: the group is skipped when retrieving or fixing values.
//!
//! At most one of `fmt`, `rgx` and `bool` is allowed. Without any of them the
//! name is looked up in [`DEFAULT_GROUPS`]; an unknown name is a plain string.
//!
//! Inside custom and default regexes, `%<letter>` expands to the regex of the
//! default group of that name (recursively) and `%%` is a literal percent.

use std::fmt;

use crate::date::is_date_element;
use crate::error::{FinderError, FinderResult};
use crate::format::FormatSpec;
use crate::value::{Fix, Value};

/// Regex and format spec of the well-known group names.
pub const DEFAULT_GROUPS: &[(&str, &str, &str)] = &[
    ("I", r"\d+", "d"),
    ("Y", r"\d{4}", "04d"),
    ("m", r"\d\d", "02d"),
    ("d", r"\d\d", "02d"),
    ("j", r"\d{3}", "03d"),
    ("H", r"\d\d", "02d"),
    ("M", r"\d\d", "02d"),
    ("S", r"\d\d", "02d"),
    ("x", "%Y%m%d", "08d"),
    ("X", "%H%M%S", "06d"),
    ("F", "%Y-%m-%d", "s"),
    ("B", "[a-zA-Z]*", "s"),
    ("text", r"\w", "s"),
    ("char", r"\S*", "s"),
];

/// Look up the default `(regex, format)` of a group name.
pub fn default_group(name: &str) -> Option<(&'static str, &'static str)> {
    DEFAULT_GROUPS
        .iter()
        .find(|(n, _, _)| *n == name)
        .map(|(_, rgx, fmt)| (*rgx, *fmt))
}

// ============================================================================
// Group Selection
// ============================================================================

/// Selects one or more groups: by index, or by name (all groups sharing it).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupKey {
    Index(usize),
    Name(String),
}

impl GroupKey {
    /// Whether this is the `date` pseudo-group name.
    pub fn is_date(&self) -> bool {
        matches!(self, GroupKey::Name(name) if name == "date")
    }
}

impl From<usize> for GroupKey {
    fn from(index: usize) -> Self {
        GroupKey::Index(index)
    }
}

impl From<&str> for GroupKey {
    fn from(name: &str) -> Self {
        GroupKey::Name(name.to_string())
    }
}

impl From<String> for GroupKey {
    fn from(name: String) -> Self {
        GroupKey::Name(name)
    }
}

impl From<&GroupKey> for GroupKey {
    fn from(key: &GroupKey) -> Self {
        key.clone()
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Index(i) => write!(f, "{}", i),
            GroupKey::Name(name) => write!(f, "{}", name),
        }
    }
}

/// Resolve a key to the indices of the groups it selects, in pattern order.
///
/// When `date_is_first_class` is set, `"date"` selects every date element
/// group (`Y`, `m`, `d`, ...). Discarded groups are included; callers filter
/// them as they see fit.
pub fn resolve_key(
    groups: &[Group],
    key: &GroupKey,
    date_is_first_class: bool,
) -> FinderResult<Vec<usize>> {
    let selected: Vec<usize> = match key {
        GroupKey::Index(i) if *i < groups.len() => vec![*i],
        GroupKey::Index(_) => Vec::new(),
        GroupKey::Name(_) if date_is_first_class && key.is_date() => groups
            .iter()
            .filter(|g| is_date_element(&g.name))
            .map(|g| g.index)
            .collect(),
        GroupKey::Name(name) => groups
            .iter()
            .filter(|g| &g.name == name)
            .map(|g| g.index)
            .collect(),
    };
    if selected.is_empty() {
        return Err(FinderError::group_not_found(key));
    }
    Ok(selected)
}

// ============================================================================
// Group
// ============================================================================

/// Where the regex of a group comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegexSource {
    /// Derived from the format spec (`fmt=` or an unknown name).
    Format,
    /// Given with `rgx=`.
    Custom,
    /// Taken from [`DEFAULT_GROUPS`].
    Default,
    /// Built from the `bool=` alternatives.
    Bool,
}

/// One group of a pattern.
#[derive(Debug, Clone)]
pub struct Group {
    definition: String,
    index: usize,
    name: String,
    regex: String,
    format: FormatSpec,
    source: RegexSource,
    options: Option<(String, String)>,
    optional: bool,
    discard: bool,
}

/// Properties found in a definition, before building the group.
#[derive(Default)]
struct Properties<'a> {
    fmt: Option<&'a str>,
    rgx: Option<&'a str>,
    bool: Option<&'a str>,
    opt: bool,
    discard: bool,
}

impl Group {
    /// Build a group from its definition (the text inside `%(...)`).
    pub fn parse(definition: &str, index: usize) -> FinderResult<Self> {
        let malformed = |message: String| FinderError::malformed(definition, message);

        if definition.is_empty() {
            return Err(malformed("empty group definition".to_string()));
        }
        let (name, rest) = match definition.find(':') {
            Some(pos) => definition.split_at(pos),
            None => (definition, ""),
        };
        if name.is_empty() {
            return Err(malformed("group has no name".to_string()));
        }
        let props = parse_properties(definition, rest)?;

        let default = default_group(name);
        let default_format = default.map(|(_, fmt)| fmt).unwrap_or("s");

        let mut options = None;
        let (format, regex, source) = if let Some(spec) = props.fmt {
            let format = FormatSpec::parse(spec)?;
            let regex = format.regex();
            (format, regex, RegexSource::Format)
        } else if let Some(rgx) = props.rgx {
            let regex = expand_defaults(rgx, definition)?;
            (FormatSpec::parse(default_format)?, regex, RegexSource::Custom)
        } else if let Some(alternatives) = props.bool {
            let (on, off) = alternatives.split_once(':').unwrap_or((alternatives, ""));
            let regex = expand_defaults(&format!("{}|{}", on, off), definition)?;
            options = Some((on.to_string(), off.to_string()));
            (FormatSpec::parse("s")?, regex, RegexSource::Bool)
        } else if let Some((rgx, fmt)) = default {
            let regex = expand_defaults(rgx, definition)?;
            (FormatSpec::parse(fmt)?, regex, RegexSource::Default)
        } else {
            let format = FormatSpec::parse("s")?;
            let regex = format.regex();
            (format, regex, RegexSource::Format)
        };

        Ok(Group {
            definition: definition.to_string(),
            index,
            name: name.to_string(),
            regex,
            format,
            source,
            options,
            optional: props.opt,
            discard: props.discard,
        })
    }

    /// Text between `%(` and `)` this group was built from.
    pub fn definition(&self) -> &str {
        &self.definition
    }

    /// Position of the group in the pattern.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Regex of the group, without the capturing parentheses.
    pub fn raw_regex(&self) -> &str {
        &self.regex
    }

    pub fn format(&self) -> &FormatSpec {
        &self.format
    }

    pub fn source(&self) -> RegexSource {
        self.source
    }

    /// `(true, false)` alternatives of a `bool` group.
    pub fn options(&self) -> Option<(&str, &str)> {
        self.options.as_ref().map(|(t, f)| (t.as_str(), f.as_str()))
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn is_discard(&self) -> bool {
        self.discard
    }

    // ------------------------------------------------------------------------
    // Regex
    // ------------------------------------------------------------------------

    /// Wrap a regex body in the capturing group, optional if `:opt` was given.
    fn capture(&self, body: &str) -> String {
        if self.optional {
            format!("({})?", body)
        } else {
            format!("({})", body)
        }
    }

    /// Capturing regex of the group when it is not fixed.
    pub fn regex(&self) -> String {
        self.capture(&self.regex)
    }

    /// Capturing regex of the group, narrowed by a fix if given.
    pub fn regex_with(&self, fix: Option<&Fix>) -> FinderResult<String> {
        match fix {
            Some(fix) => Ok(self.capture(&self.fixed_regex(fix)?)),
            None => Ok(self.regex()),
        }
    }

    /// Regex body matching the fixed value(s).
    ///
    /// Strings are used verbatim as regexes, numbers are formatted then
    /// escaped, booleans select one of the `bool` alternatives. Several values
    /// are joined in an alternation.
    pub fn fixed_regex(&self, fix: &Fix) -> FinderResult<String> {
        let values = fix.values();
        if values.is_empty() {
            return Err(self.invalid_fix("a list of fixes must contain at least one element"));
        }
        let parts = values
            .iter()
            .map(|v| match v {
                Value::Int(_) | Value::Float(_) => Ok(regex::escape(&self.format_value(v)?)),
                _ => self.fixed_text(v),
            })
            .collect::<FinderResult<Vec<_>>>()?;
        Ok(parts.join("|"))
    }

    /// Text standing for the fix in a generated filename: the first value, unescaped.
    pub fn fixed_string(&self, fix: &Fix) -> FinderResult<String> {
        let value = fix
            .first()
            .ok_or_else(|| self.invalid_fix("a list of fixes must contain at least one element"))?;
        match value {
            Value::Int(_) | Value::Float(_) => self.format_value(value),
            _ => self.fixed_text(value),
        }
    }

    fn fixed_text(&self, value: &Value) -> FinderResult<String> {
        match value {
            Value::Str(s) => Ok(s.clone()),
            Value::Bool(b) => match &self.options {
                Some((on, off)) => Ok(if *b { on.clone() } else { off.clone() }),
                None => Err(self.invalid_fix("group has no bool options, cannot fix it with a boolean")),
            },
            Value::Date(_) => Err(self.invalid_fix("only the 'date' pseudo-group accepts a date")),
            number => self.format_value(number),
        }
    }

    fn invalid_fix(&self, message: &str) -> FinderError {
        FinderError::invalid_fix(self.to_string(), message)
    }

    // ------------------------------------------------------------------------
    // Values
    // ------------------------------------------------------------------------

    /// Format a value with the group format spec.
    pub fn format_value(&self, value: &Value) -> FinderResult<String> {
        self.format
            .format(value)
            .map_err(|e| self.invalid_fix(&e.to_string()))
    }

    /// Parse a matched string into a value.
    pub fn parse_match(&self, raw: &str) -> FinderResult<Value> {
        self.parse_raw(raw).map_err(|message| FinderError::ParseValue {
            group: self.to_string(),
            value: raw.to_string(),
            message,
        })
    }

    pub(crate) fn parse_raw(&self, raw: &str) -> Result<Value, String> {
        match &self.options {
            Some((on, _)) => Ok(Value::Bool(raw == on)),
            None => self.format.parse_value(raw).map_err(|e| e.to_string()),
        }
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.index)
    }
}

// ============================================================================
// Definition Parsing
// ============================================================================

const VALUE_PROPERTIES: [&str; 3] = ["fmt", "rgx", "bool"];
const FLAG_PROPERTIES: [&str; 2] = ["opt", "discard"];

/// Whether a property token starts at the beginning of `s`.
fn starts_property(s: &str) -> bool {
    let value = VALUE_PROPERTIES
        .iter()
        .any(|p| s.strip_prefix(p).is_some_and(|r| r.starts_with('=')));
    let flag = FLAG_PROPERTIES.iter().any(|p| {
        s.strip_prefix(p)
            .is_some_and(|r| r.is_empty() || r.starts_with(':') || r.starts_with('='))
    });
    value || flag
}

/// Split `:prop:prop=value...` into tokens.
///
/// Values may contain `:` as long as what follows does not look like a property.
fn split_properties(rest: &str) -> Vec<&str> {
    let mut starts: Vec<usize> = rest
        .char_indices()
        .filter(|(i, c)| *c == ':' && starts_property(&rest[i + 1..]))
        .map(|(i, _)| i)
        .collect();
    // leading text that is not a known property is kept as its own token
    if !rest.is_empty() && starts.first() != Some(&0) {
        starts.insert(0, 0);
    }
    starts
        .iter()
        .enumerate()
        .map(|(n, &start)| {
            let end = starts.get(n + 1).copied().unwrap_or(rest.len());
            &rest[start + 1..end]
        })
        .collect()
}

fn parse_properties<'a>(definition: &str, rest: &'a str) -> FinderResult<Properties<'a>> {
    let malformed = |message: String| FinderError::malformed(definition, message);
    let mut props = Properties::default();

    for token in split_properties(rest) {
        let (key, value) = match token.split_once('=') {
            Some((k, v)) => (k, Some(v)),
            None => (token, None),
        };
        match (key, value) {
            ("opt" | "discard", Some(_)) => {
                return Err(malformed(format!("flag '{}' takes no value", key)));
            }
            ("opt", None) if props.opt => return Err(malformed("duplicate 'opt'".to_string())),
            ("opt", None) => props.opt = true,
            ("discard", None) if props.discard => {
                return Err(malformed("duplicate 'discard'".to_string()))
            }
            ("discard", None) => props.discard = true,
            ("fmt" | "rgx" | "bool", Some("")) => {
                return Err(malformed(format!("empty '{}' property", key)));
            }
            ("fmt" | "rgx" | "bool", Some(v)) => {
                let slot = match key {
                    "fmt" => &mut props.fmt,
                    "rgx" => &mut props.rgx,
                    _ => &mut props.bool,
                };
                if slot.is_some() {
                    return Err(malformed(format!("duplicate '{}'", key)));
                }
                *slot = Some(v);
            }
            _ => return Err(malformed(format!("unknown property '{}'", token))),
        }
    }

    let exclusive = [props.fmt, props.rgx, props.bool]
        .iter()
        .filter(|p| p.is_some())
        .count();
    if exclusive > 1 {
        return Err(malformed(
            "at most one of 'fmt', 'rgx' and 'bool' can be given".to_string(),
        ));
    }
    Ok(props)
}

/// Recursively replace `%<letter>` by the regex of that default group.
fn expand_defaults(regex: &str, definition: &str) -> FinderResult<String> {
    let mut out = String::with_capacity(regex.len());
    let mut chars = regex.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('%') => out.push('%'),
            Some(letter) if letter.is_ascii_alphabetic() => {
                let (rgx, _) = default_group(&letter.to_string()).ok_or_else(|| {
                    FinderError::malformed(
                        definition,
                        format!("unknown replacement '%{}'", letter),
                    )
                })?;
                out.push_str(&expand_defaults(rgx, definition)?);
            }
            Some(other) => {
                out.push('%');
                out.push(other);
            }
            None => out.push('%'),
        }
    }
    Ok(out)
}

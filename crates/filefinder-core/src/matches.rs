//! Match sets: the result of matching one filename.
//!
//! A [`Matches`] holds one [`Match`] per group of the pattern, in pattern
//! order. Each match keeps its position and raw string; the parsed value is
//! computed on first access and cached.

use std::cell::OnceCell;
use std::fmt;
use std::sync::Arc;

use chrono::NaiveDateTime;
use regex::Captures;
use tracing::{debug, warn};

use crate::date;
use crate::error::{FinderError, FinderResult};
use crate::group::{resolve_key, Group, GroupKey};
use crate::value::Value;

// ============================================================================
// Match
// ============================================================================

/// Match of a single group in a filename.
#[derive(Debug, Clone)]
pub struct Match {
    index: usize,
    start: usize,
    end: usize,
    raw: String,
    groups: Arc<[Group]>,
    parsed: OnceCell<Result<Value, String>>,
}

impl Match {
    fn new(index: usize, start: usize, end: usize, raw: &str, groups: Arc<[Group]>) -> Self {
        Match {
            index,
            start,
            end,
            raw: raw.to_string(),
            groups,
            parsed: OnceCell::new(),
        }
    }

    /// Group that produced this match.
    pub fn group(&self) -> &Group {
        &self.groups[self.index]
    }

    /// Index of the group in the pattern.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Byte offset of the match in the filename.
    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    /// Matched string. Empty for an optional group that matched nothing.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Parsed value, computed once.
    pub fn value(&self) -> FinderResult<Value> {
        let parsed = self.parsed.get_or_init(|| {
            let result = self.group().parse_raw(&self.raw);
            if let Err(message) = &result {
                debug!(group = %self.group(), raw = %self.raw, "parse failed: {}", message);
            }
            result
        });
        parsed.clone().map_err(|message| FinderError::ParseValue {
            group: self.group().to_string(),
            value: self.raw.clone(),
            message,
        })
    }

    /// Parsed value, or the raw string when `parse` is false.
    pub fn get(&self, parse: bool) -> FinderResult<Value> {
        if parse {
            self.value()
        } else {
            Ok(Value::Str(self.raw.clone()))
        }
    }
}

impl fmt::Display for Match {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} = '{}' ({}..{})",
            self.group(),
            self.raw,
            self.start,
            self.end
        )
    }
}

// ============================================================================
// Matches
// ============================================================================

/// Matches of every group for one filename.
#[derive(Debug, Clone)]
pub struct Matches {
    matches: Vec<Match>,
    groups: Arc<[Group]>,
    date_is_first_class: bool,
}

impl Matches {
    /// Build from the captures of the full regex.
    ///
    /// Capture `i + 1` belongs to group `i`. Optional groups that did not
    /// participate get an empty match at offset 0.
    pub(crate) fn from_captures(
        captures: &Captures<'_>,
        groups: Arc<[Group]>,
        date_is_first_class: bool,
    ) -> Self {
        let matches = (0..groups.len())
            .map(|i| match captures.get(i + 1) {
                Some(m) => Match::new(i, m.start(), m.end(), m.as_str(), Arc::clone(&groups)),
                None => Match::new(i, 0, 0, "", Arc::clone(&groups)),
            })
            .collect();
        Matches {
            matches,
            groups,
            date_is_first_class,
        }
    }

    /// Match of the group at `index`.
    pub fn get(&self, index: usize) -> Option<&Match> {
        self.matches.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Match> {
        self.matches.iter()
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// Matches selected by a key, in pattern order.
    ///
    /// Discarded groups are skipped unless `keep_discard` is set.
    ///
    /// # Errors
    ///
    /// `GroupNotFound` if nothing is left once discarded groups are removed.
    pub fn get_matches(
        &self,
        key: impl Into<GroupKey>,
        keep_discard: bool,
    ) -> FinderResult<Vec<&Match>> {
        let key = key.into();
        let selected: Vec<&Match> = resolve_key(&self.groups, &key, self.date_is_first_class)?
            .into_iter()
            .filter_map(|i| self.matches.get(i))
            .filter(|m| keep_discard || !m.group().is_discard())
            .collect();
        if selected.is_empty() {
            return Err(FinderError::group_not_found(&key));
        }
        Ok(selected)
    }

    /// Parsed values of the non-discarded groups selected by a key.
    pub fn get_values(&self, key: impl Into<GroupKey>) -> FinderResult<Vec<Value>> {
        self.get_values_with(key, true, false)
    }

    /// Values selected by a key: parsed, or raw strings when `parse` is false.
    pub fn get_values_with(
        &self,
        key: impl Into<GroupKey>,
        parse: bool,
        keep_discard: bool,
    ) -> FinderResult<Vec<Value>> {
        self.get_matches(key, keep_discard)?
            .into_iter()
            .map(|m| m.get(parse))
            .collect()
    }

    /// First parsed value of the non-discarded groups selected by a key.
    pub fn get_value(&self, key: impl Into<GroupKey>) -> FinderResult<Value> {
        self.get_value_with(key, true, false)
    }

    /// First value selected by a key.
    ///
    /// A warning is logged if the selected groups do not all hold the same value.
    pub fn get_value_with(
        &self,
        key: impl Into<GroupKey>,
        parse: bool,
        keep_discard: bool,
    ) -> FinderResult<Value> {
        let key = key.into();
        let values = self.get_values_with(&key, parse, keep_discard)?;
        let first = values
            .first()
            .cloned()
            .ok_or_else(|| FinderError::group_not_found(&key))?;
        if values.iter().any(|v| *v != first) {
            let listed: Vec<String> = values.iter().map(|v| v.to_string()).collect();
            warn!(
                key = %key,
                "different values for the same key: {}, taking the first one",
                listed.join(", ")
            );
        }
        Ok(first)
    }

    /// Date assembled from the date element groups.
    pub fn get_date(&self, default: Option<date::DefaultDate>) -> FinderResult<NaiveDateTime> {
        date::get_date(self, default)
    }
}

impl<'a> IntoIterator for &'a Matches {
    type Item = &'a Match;
    type IntoIter = std::slice::Iter<'a, Match>;

    fn into_iter(self) -> Self::IntoIter {
        self.matches.iter()
    }
}

impl fmt::Display for Matches {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, m) in self.matches.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", m)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::Pattern;

    fn matches(pattern: &str, filename: &str) -> Matches {
        let pattern = Pattern::parse(pattern, false).unwrap();
        pattern.match_filename(filename, true).unwrap()
    }

    // =========================================================================
    // Retrieval
    // =========================================================================

    mod retrieval {
        use super::*;

        #[test]
        fn test_offsets_and_raw() {
            let m = matches("A_%(Y)_%(m).nc", "A_2007_03.nc");
            let first = m.get(0).unwrap();
            assert_eq!(first.raw(), "2007");
            assert_eq!((first.start(), first.end()), (2, 6));
            assert_eq!(m.get(1).unwrap().raw(), "03");
        }

        #[test]
        fn test_discarded_occurrence_skipped() {
            let m = matches("A_%(Y)%(j)_%(Y)%(j:discard).nc", "A_2007001_2007008.nc");
            assert_eq!(m.get_values("j").unwrap(), vec![Value::Int(1)]);
            assert_eq!(m.get_value("j").unwrap(), Value::Int(1));
            assert_eq!(
                m.get_values_with("j", true, true).unwrap(),
                vec![Value::Int(1), Value::Int(8)]
            );
        }

        #[test]
        fn test_all_discarded_is_not_found() {
            let m = matches("%(Y:discard).nc", "2007.nc");
            let err = m.get_values("Y").unwrap_err();
            assert!(matches!(err, FinderError::GroupNotFound { .. }));
        }

        #[test]
        fn test_raw_values() {
            let m = matches("%(m).nc", "03.nc");
            assert_eq!(
                m.get_values_with("m", false, false).unwrap(),
                vec![Value::from("03")]
            );
        }

        #[test]
        fn test_by_index() {
            let m = matches("%(Y)_%(Y).nc", "2007_2008.nc");
            assert_eq!(m.get_value(1usize).unwrap(), Value::Int(2008));
        }

        #[test]
        fn test_differing_values_takes_first() {
            let m = matches("%(Y)_%(Y).nc", "2007_2008.nc");
            assert_eq!(m.get_value("Y").unwrap(), Value::Int(2007));
        }

        #[test]
        fn test_optional_group_absent() {
            let m = matches("data%(suffix:rgx=_\\w+:opt).nc", "data.nc");
            assert_eq!(m.get(0).unwrap().raw(), "");
        }

        #[test]
        fn test_parse_error_is_cached() {
            let m = matches(r"%(Y:rgx=\w+).nc", "abcd.nc");
            assert!(matches!(m.get_value("Y"), Err(FinderError::ParseValue { .. })));
            assert!(matches!(m.get_value("Y"), Err(FinderError::ParseValue { .. })));
        }

        #[test]
        fn test_date() {
            let m = matches("%(Y)%(m)%(d).nc", "20070308.nc");
            assert_eq!(
                m.get_date(None).unwrap().to_string(),
                "2007-03-08 00:00:00"
            );
        }
    }
}

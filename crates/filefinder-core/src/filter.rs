//! Filters applied to every matching file after the regex.
//!
//! Three kinds of filters exist:
//!
//! - `Basic`: a freestanding predicate over `(finder, filename, matches)`.
//! - `ByGroup`: generated by `fix_by_filter`; called once per value of the
//!   groups it was installed for.
//! - `ByDate`: generated by `fix_by_filter("date", ...)`; called once with the
//!   date assembled from the date element groups.
//!
//! Filters run in insertion order; the first one rejecting a file stops the
//! evaluation. Extra arguments are bound by capturing them in the closure.

use std::fmt;

use tracing::debug;

use crate::date::{get_date, DefaultDate};
use crate::finder::Finder;
use crate::matches::Matches;
use crate::value::Value;

/// Predicate over a whole file.
pub type FilterFn = Box<dyn Fn(&Finder, &str, &Matches) -> bool>;

/// Predicate over a single value.
pub type ValueFilterFn = Box<dyn Fn(&Value) -> bool>;

// ============================================================================
// Filter
// ============================================================================

/// What a filter tests.
pub enum FilterKind {
    /// Freestanding predicate.
    Basic(FilterFn),
    /// Predicate over the values of some groups.
    ByGroup {
        /// Groups the filter was installed for.
        indices: Vec<usize>,
        /// Give the raw string to the predicate when parsing fails.
        pass_unparsed: bool,
        func: ValueFilterFn,
    },
    /// Predicate over the date of the file.
    ByDate {
        /// Fields missing from the filename are taken from this date.
        default_date: Option<DefaultDate>,
        func: ValueFilterFn,
    },
}

/// A named filter.
pub struct Filter {
    name: String,
    kind: FilterKind,
}

impl Filter {
    pub fn new(name: impl Into<String>, kind: FilterKind) -> Self {
        Filter {
            name: name.into(),
            kind,
        }
    }

    /// Freestanding filter.
    pub fn basic<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Finder, &str, &Matches) -> bool + 'static,
    {
        Self::new(name, FilterKind::Basic(Box::new(func)))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &FilterKind {
        &self.kind
    }

    /// Groups this filter was installed for (empty for other kinds).
    pub fn indices(&self) -> &[usize] {
        match &self.kind {
            FilterKind::ByGroup { indices, .. } => indices,
            _ => &[],
        }
    }

    pub fn is_by_date(&self) -> bool {
        matches!(self.kind, FilterKind::ByDate { .. })
    }

    /// Whether the file passes this filter.
    pub fn is_valid(&self, finder: &Finder, filename: &str, matches: &Matches) -> bool {
        match &self.kind {
            FilterKind::Basic(func) => func(finder, filename, matches),
            FilterKind::ByGroup {
                indices,
                pass_unparsed,
                func,
            } => indices.iter().filter_map(|&i| matches.get(i)).all(|m| {
                match m.value() {
                    Ok(value) => func(&value),
                    Err(_) if *pass_unparsed => func(&Value::Str(m.raw().to_string())),
                    // unparsable values do not take part
                    Err(_) => true,
                }
            }),
            FilterKind::ByDate { default_date, func } => match get_date(matches, *default_date) {
                Ok(date) => func(&Value::Date(date)),
                Err(e) => {
                    debug!(filename, "no date for filter '{}': {}", self.name, e);
                    false
                }
            },
        }
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            FilterKind::Basic(_) => write!(f, "<Filter:{}>", self.name),
            FilterKind::ByGroup { indices, .. } => {
                let indices: Vec<String> = indices.iter().map(|i| i.to_string()).collect();
                write!(f, "<FilterByGroup:{}:{}>", indices.join(","), self.name)
            }
            FilterKind::ByDate { .. } => write!(f, "<FilterByDate:{}>", self.name),
        }
    }
}

// ============================================================================
// FilterList
// ============================================================================

/// Ordered list of filters.
#[derive(Debug, Default)]
pub struct FilterList {
    filters: Vec<Filter>,
}

impl FilterList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, filter: Filter) {
        self.filters.push(filter);
    }

    /// Remove the given groups from group filters; filters left without a
    /// group are dropped. Returns true if anything changed.
    pub fn remove_by_group(&mut self, indices: &[usize]) -> bool {
        let mut changed = false;
        for filter in &mut self.filters {
            if let FilterKind::ByGroup { indices: own, .. } = &mut filter.kind {
                let before = own.len();
                own.retain(|i| !indices.contains(i));
                changed |= own.len() != before;
            }
        }
        let before = self.filters.len();
        self.filters
            .retain(|f| !matches!(&f.kind, FilterKind::ByGroup { indices, .. } if indices.is_empty()));
        changed || self.filters.len() != before
    }

    /// Drop every date filter. Returns true if anything was removed.
    pub fn remove_by_date(&mut self) -> bool {
        let before = self.filters.len();
        self.filters.retain(|f| !f.is_by_date());
        self.filters.len() != before
    }

    /// Drop every group and date filter, keeping freestanding ones.
    pub fn remove_generated(&mut self) -> bool {
        let before = self.filters.len();
        self.filters
            .retain(|f| matches!(f.kind, FilterKind::Basic(_)));
        self.filters.len() != before
    }

    pub fn clear(&mut self) {
        self.filters.clear();
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Filter> {
        self.filters.iter()
    }

    /// Whether a file passes every filter, stopping at the first failure.
    pub fn is_valid(&self, finder: &Finder, filename: &str, matches: &Matches) -> bool {
        self.filters
            .iter()
            .all(|f| f.is_valid(finder, filename, matches))
    }
}

//! Constraint set: fixed values and filters.
//!
//! Every mutation bumps a revision counter. The finder keeps the revision its
//! scan cache was built at and rescans when it differs.

use std::collections::BTreeMap;

use crate::filter::{Filter, FilterList};
use crate::value::Fix;

/// Fixed values by group index, plus the ordered filter list.
#[derive(Debug, Default)]
pub struct ConstraintSet {
    fixes: BTreeMap<usize, Fix>,
    filters: FilterList,
    revision: u64,
}

impl ConstraintSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Monotonic counter bumped on every change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Bump the revision for a change made outside the set.
    pub(crate) fn touch(&mut self) {
        self.revision += 1;
    }

    pub fn fixes(&self) -> &BTreeMap<usize, Fix> {
        &self.fixes
    }

    pub fn fix(&self, index: usize) -> Option<&Fix> {
        self.fixes.get(&index)
    }

    pub fn is_fixed(&self, index: usize) -> bool {
        self.fixes.contains_key(&index)
    }

    pub fn set_fix(&mut self, index: usize, fix: Fix) {
        self.fixes.insert(index, fix);
        self.touch();
    }

    /// Remove the fix of a group and the group filters installed for it.
    pub fn unfix(&mut self, index: usize) {
        self.fixes.remove(&index);
        self.filters.remove_by_group(&[index]);
        self.touch();
    }

    /// Remove every fix and every generated filter.
    pub fn unfix_all(&mut self) {
        self.fixes.clear();
        self.filters.remove_generated();
        self.touch();
    }

    pub fn filters(&self) -> &FilterList {
        &self.filters
    }

    pub fn add_filter(&mut self, filter: Filter) {
        self.filters.add(filter);
        self.touch();
    }

    pub fn remove_date_filters(&mut self) {
        if self.filters.remove_by_date() {
            self.touch();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterKind;

    #[test]
    fn test_revision_bumps_on_change() {
        let mut set = ConstraintSet::new();
        let r0 = set.revision();
        set.set_fix(0, Fix::from(2007));
        assert!(set.revision() > r0);
        assert!(set.is_fixed(0));

        let r1 = set.revision();
        set.unfix(0);
        assert!(set.revision() > r1);
        assert!(!set.is_fixed(0));
    }

    #[test]
    fn test_unfix_removes_group_filter() {
        let mut set = ConstraintSet::new();
        set.set_fix(1, Fix::from(3));
        set.add_filter(Filter::new(
            "gt",
            FilterKind::ByGroup {
                indices: vec![1],
                pass_unparsed: false,
                func: Box::new(|_| true),
            },
        ));
        set.add_filter(Filter::basic("keep", |_, _, _| true));

        set.unfix(1);
        assert!(set.fix(1).is_none());
        assert_eq!(set.filters().len(), 1);
        assert_eq!(set.filters().iter().next().unwrap().name(), "keep");
    }

    #[test]
    fn test_unfix_all_keeps_basic_filters() {
        let mut set = ConstraintSet::new();
        set.set_fix(0, Fix::from(1));
        set.add_filter(Filter::basic("keep", |_, _, _| true));
        set.unfix_all();
        assert!(set.fixes().is_empty());
        assert_eq!(set.filters().len(), 1);
    }
}

//! The finder: pattern + constraints + directory scan.
//!
//! A [`Finder`] owns a root directory, a compiled [`Pattern`] and a
//! [`ConstraintSet`]. Scanning lists every file under the root whose path
//! (relative to the root, `/` separated) matches the pattern, then runs the
//! filters. Results are sorted by filename and cached until the constraints
//! or the configuration change.
//!
//! ## Pruning
//!
//! By default the pattern is split at `/` into one regex per directory level,
//! and a directory is only entered if its name matches the regex of its
//! level. Files are only looked for at the last level. When a group regex
//! may itself match a `/` this is unsound, and every directory down to
//! `max_depth` is explored instead (`scan_everything`).

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf, MAIN_SEPARATOR};
use std::sync::Arc;

use chrono::NaiveDateTime;
use regex::Regex;
use tracing::{debug, trace, warn};
use walkdir::{DirEntry, WalkDir};

use crate::constraint::ConstraintSet;
use crate::date::{date_element_value, DefaultDate};
use crate::error::{FinderError, FinderResult};
use crate::filter::{Filter, FilterKind};
use crate::group::{resolve_key, Group, GroupKey};
use crate::matches::Matches;
use crate::pattern::Pattern;
use crate::value::{Fix, Value};

/// Default depth limit when every directory is explored.
pub const DEFAULT_MAX_DEPTH: usize = 32;

// ============================================================================
// Configuration
// ============================================================================

/// Options of a [`Finder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinderConfig {
    /// Literal text outside groups is a regex, not escaped.
    pub use_regex: bool,
    /// Explore every directory instead of pruning by level.
    pub scan_everything: bool,
    /// Depth limit when exploring every directory.
    pub max_depth: usize,
    /// Follow symbolic links while walking.
    pub follow_links: bool,
    /// Treat `"date"` as a selector for all date element groups.
    pub date_is_first_class: bool,
}

impl Default for FinderConfig {
    fn default() -> Self {
        FinderConfig {
            use_regex: false,
            scan_everything: false,
            max_depth: DEFAULT_MAX_DEPTH,
            follow_links: false,
            date_is_first_class: true,
        }
    }
}

impl FinderConfig {
    pub fn with_use_regex(mut self, use_regex: bool) -> Self {
        self.use_regex = use_regex;
        self
    }

    pub fn with_scan_everything(mut self, scan_everything: bool) -> Self {
        self.scan_everything = scan_everything;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_follow_links(mut self, follow_links: bool) -> Self {
        self.follow_links = follow_links;
        self
    }

    pub fn with_date_is_first_class(mut self, date_is_first_class: bool) -> Self {
        self.date_is_first_class = date_is_first_class;
        self
    }
}

// ============================================================================
// Finder
// ============================================================================

struct ScanCache {
    revision: u64,
    files: Vec<(String, Matches)>,
}

/// Finds files matching a pattern under a root directory.
pub struct Finder {
    root: PathBuf,
    pattern: Pattern,
    config: FinderConfig,
    constraints: ConstraintSet,
    cache: Option<ScanCache>,
}

impl Finder {
    /// Create a finder with the default configuration.
    pub fn new(root: impl Into<PathBuf>, pattern: &str) -> FinderResult<Self> {
        Self::with_config(root, pattern, FinderConfig::default())
    }

    pub fn with_config(
        root: impl Into<PathBuf>,
        pattern: &str,
        config: FinderConfig,
    ) -> FinderResult<Self> {
        let pattern = Pattern::parse(pattern, config.use_regex)?;
        Ok(Finder {
            root: root.into(),
            pattern,
            config,
            constraints: ConstraintSet::new(),
            cache: None,
        })
    }

    // ------------------------------------------------------------------------
    // Accessors and configuration
    // ------------------------------------------------------------------------

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn set_root(&mut self, root: impl Into<PathBuf>) {
        self.root = root.into();
        self.constraints.touch();
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    /// Replace the pattern. Fixes and generated filters are dropped.
    pub fn set_pattern(&mut self, pattern: &str) -> FinderResult<()> {
        self.pattern = Pattern::parse(pattern, self.config.use_regex)?;
        self.constraints.unfix_all();
        Ok(())
    }

    pub fn config(&self) -> &FinderConfig {
        &self.config
    }

    pub fn constraints(&self) -> &ConstraintSet {
        &self.constraints
    }

    pub fn set_use_regex(&mut self, use_regex: bool) -> FinderResult<()> {
        self.pattern = Pattern::parse(self.pattern.as_str(), use_regex)?;
        self.config.use_regex = use_regex;
        self.constraints.touch();
        Ok(())
    }

    pub fn set_scan_everything(&mut self, scan_everything: bool) {
        self.config.scan_everything = scan_everything;
        self.constraints.touch();
    }

    pub fn set_max_depth(&mut self, max_depth: usize) {
        self.config.max_depth = max_depth;
        self.constraints.touch();
    }

    pub fn set_follow_links(&mut self, follow_links: bool) {
        self.config.follow_links = follow_links;
        self.constraints.touch();
    }

    pub fn set_date_is_first_class(&mut self, date_is_first_class: bool) {
        self.config.date_is_first_class = date_is_first_class;
        self.constraints.touch();
    }

    pub fn n_groups(&self) -> usize {
        self.pattern.n_groups()
    }

    pub fn groups(&self) -> &[Group] {
        self.pattern.groups()
    }

    /// Groups selected by a key, discarded ones included.
    pub fn get_groups(&self, key: impl Into<GroupKey>) -> FinderResult<Vec<&Group>> {
        let key = key.into();
        let groups = self.pattern.groups();
        Ok(resolve_key(groups, &key, self.config.date_is_first_class)?
            .into_iter()
            .map(|i| &groups[i])
            .collect())
    }

    /// Full regex with the current fixes, anchored.
    pub fn get_regex(&self) -> FinderResult<String> {
        Ok(self.pattern.compile(self.constraints.fixes())?.as_str().to_string())
    }

    // ------------------------------------------------------------------------
    // Fixing
    // ------------------------------------------------------------------------

    /// Fix the non-discarded groups selected by `key`.
    ///
    /// Numbers are formatted by the group, strings are used as regexes,
    /// booleans select a `bool` alternative. With a list, scanning matches
    /// any of the values and generating a filename uses the first one.
    ///
    /// Fixing `"date"` with date(s) fixes every date element group present.
    pub fn fix_group(&mut self, key: impl Into<GroupKey>, fix: impl Into<Fix>) -> FinderResult<()> {
        self.fix_group_with(key, fix, false)
    }

    /// Fix groups, including discarded ones if `fix_discard` is set.
    pub fn fix_group_with(
        &mut self,
        key: impl Into<GroupKey>,
        fix: impl Into<Fix>,
        fix_discard: bool,
    ) -> FinderResult<()> {
        for (index, fix) in self.resolve_fix(&key.into(), fix.into(), fix_discard)? {
            self.constraints.set_fix(index, fix);
        }
        Ok(())
    }

    /// Fix several groups.
    ///
    /// Every fix is checked before any is applied.
    pub fn fix_groups<K, V>(&mut self, fixes: impl IntoIterator<Item = (K, V)>) -> FinderResult<()>
    where
        K: Into<GroupKey>,
        V: Into<Fix>,
    {
        let mut resolved = Vec::new();
        for (key, fix) in fixes {
            resolved.extend(self.resolve_fix(&key.into(), fix.into(), false)?);
        }
        for (index, fix) in resolved {
            self.constraints.set_fix(index, fix);
        }
        Ok(())
    }

    /// Remove fixes and group filters of the groups selected by `key`.
    ///
    /// For `"date"`, date filters are removed as well.
    pub fn unfix_group(&mut self, key: impl Into<GroupKey>) -> FinderResult<()> {
        let key = key.into();
        let groups = self.pattern.groups();
        if key.is_date() && self.config.date_is_first_class {
            let indices = resolve_key(groups, &key, true).unwrap_or_default();
            for index in indices {
                self.constraints.unfix(index);
            }
            self.constraints.remove_date_filters();
            return Ok(());
        }
        for index in resolve_key(groups, &key, self.config.date_is_first_class)? {
            self.constraints.unfix(index);
        }
        Ok(())
    }

    /// Remove every fix and generated filter. Freestanding filters are kept.
    pub fn unfix_all(&mut self) {
        self.constraints.unfix_all();
    }

    /// Resolve a fix to `(index, fix)` pairs, checking each against its group.
    fn resolve_fix(
        &self,
        key: &GroupKey,
        fix: Fix,
        fix_discard: bool,
    ) -> FinderResult<Vec<(usize, Fix)>> {
        let groups = self.pattern.groups();
        let indices = self.selected_indices(key, fix_discard)?;

        let resolved: Vec<(usize, Fix)> = if key.is_date() && self.config.date_is_first_class {
            let dates = fix
                .values()
                .iter()
                .map(|v| {
                    v.as_date().ok_or_else(|| {
                        FinderError::invalid_fix("date", format!("expected a date, got a {}", v.kind()))
                    })
                })
                .collect::<FinderResult<Vec<NaiveDateTime>>>()?;
            indices
                .into_iter()
                .map(|i| {
                    let values: Vec<Value> = dates
                        .iter()
                        .filter_map(|d| date_element_value(d, groups[i].name()))
                        .collect();
                    let fix = match <[Value; 1]>::try_from(values) {
                        Ok([one]) => Fix::One(one),
                        Err(many) => Fix::Many(many),
                    };
                    (i, fix)
                })
                .collect()
        } else {
            indices.into_iter().map(|i| (i, fix.clone())).collect()
        };

        for (index, fix) in &resolved {
            groups[*index].fixed_regex(fix)?;
        }
        Ok(resolved)
    }

    /// Indices selected by a key, without discarded groups unless asked.
    fn selected_indices(&self, key: &GroupKey, keep_discard: bool) -> FinderResult<Vec<usize>> {
        let groups = self.pattern.groups();
        let indices: Vec<usize> = resolve_key(groups, key, self.config.date_is_first_class)?
            .into_iter()
            .filter(|&i| keep_discard || !groups[i].is_discard())
            .collect();
        if indices.is_empty() {
            return Err(FinderError::group_not_found(key));
        }
        Ok(indices)
    }

    // ------------------------------------------------------------------------
    // Filters
    // ------------------------------------------------------------------------

    /// Add a freestanding filter over `(finder, filename, matches)`.
    pub fn add_filter<F>(&mut self, name: impl Into<String>, func: F)
    where
        F: Fn(&Finder, &str, &Matches) -> bool + 'static,
    {
        self.constraints.add_filter(Filter::basic(name, func));
    }

    /// Filter files on the values of the groups selected by `key`.
    ///
    /// The predicate is called once per non-discarded group; a file is kept
    /// if every call returns true. Values that fail to parse are skipped, or
    /// passed as raw strings with `pass_unparsed`.
    ///
    /// For `"date"` the predicate receives the date of the file (see
    /// [`Finder::fix_by_date`]). The pattern must hold at least one date
    /// element, or `GroupNotFound` is returned.
    pub fn fix_by_filter<F>(
        &mut self,
        key: impl Into<GroupKey>,
        func: F,
        pass_unparsed: bool,
    ) -> FinderResult<()>
    where
        F: Fn(&Value) -> bool + 'static,
    {
        let key = key.into();
        let indices = self.selected_indices(&key, false)?;
        if key.is_date() && self.config.date_is_first_class {
            self.fix_by_date(func, None);
            return Ok(());
        }
        self.constraints.add_filter(Filter::new(
            key.to_string(),
            FilterKind::ByGroup {
                indices,
                pass_unparsed,
                func: Box::new(func),
            },
        ));
        Ok(())
    }

    /// Filter files on their date, given to the predicate as `Value::Date`.
    ///
    /// Fields absent from the filename are taken from `default_date`. Files
    /// without a usable date are discarded.
    pub fn fix_by_date<F>(&mut self, func: F, default_date: Option<DefaultDate>)
    where
        F: Fn(&Value) -> bool + 'static,
    {
        self.constraints.add_filter(Filter::new(
            "date",
            FilterKind::ByDate {
                default_date,
                func: Box::new(func),
            },
        ));
    }

    // ------------------------------------------------------------------------
    // Scanning
    // ------------------------------------------------------------------------

    /// Whether the cache holds files for the current constraints.
    pub fn is_scanned(&self) -> bool {
        self.cache
            .as_ref()
            .is_some_and(|c| c.revision == self.constraints.revision())
    }

    /// Matching files and their matches, scanning if needed.
    pub fn files(&mut self) -> FinderResult<&[(String, Matches)]> {
        if !self.is_scanned() {
            self.find_files()?;
        }
        Ok(self
            .cache
            .as_ref()
            .map(|c| c.files.as_slice())
            .unwrap_or(&[]))
    }

    /// Scan the root now, replacing the cache.
    pub fn find_files(&mut self) -> FinderResult<()> {
        let files = self.scan()?;
        self.cache = Some(ScanCache {
            revision: self.constraints.revision(),
            files,
        });
        Ok(())
    }

    /// Paths of the matching files, relative to the root or absolute.
    pub fn get_files(&mut self, relative: bool) -> FinderResult<Vec<PathBuf>> {
        let root = self.root.clone();
        Ok(self
            .files()?
            .iter()
            .map(|(name, _)| {
                if relative {
                    to_native_path(Path::new(""), name)
                } else {
                    to_native_path(&root, name)
                }
            })
            .collect())
    }

    /// Paths of the matching files, grouped by the matched text of each key.
    ///
    /// The first key is the outermost level. Within a level, buckets keep the
    /// order in which their text first appears in the sorted file list. The
    /// text of a key is the concatenation of the raw matches of every group
    /// it selects.
    ///
    /// # Errors
    ///
    /// `GroupNotFound` if a key selects no group.
    pub fn get_files_nested<K>(
        &mut self,
        keys: impl IntoIterator<Item = K>,
        relative: bool,
    ) -> FinderResult<NestedFiles>
    where
        K: Into<GroupKey>,
    {
        let levels = keys
            .into_iter()
            .map(|key| resolve_key(self.pattern.groups(), &key.into(), self.config.date_is_first_class))
            .collect::<FinderResult<Vec<_>>>()?;
        let root = if relative {
            PathBuf::new()
        } else {
            self.root.clone()
        };
        let files: Vec<&(String, Matches)> = self.files()?.iter().collect();
        Ok(nest_files(&files, &levels, &root))
    }

    fn scan(&self) -> FinderResult<Vec<(String, Matches)>> {
        let fixes = self.constraints.fixes();
        let regex = self.pattern.compile(fixes)?;
        debug!(regex = %regex.as_str(), root = %self.root.display(), "scanning");

        let levels = if self.config.scan_everything {
            None
        } else {
            let levels = self.pattern.level_regexes(fixes)?;
            if levels.is_none() {
                warn!("a group regex may match '/', exploring every directory instead");
            }
            levels
        };

        let candidates = match &levels {
            Some(levels) => {
                for (depth, level) in levels.iter().enumerate() {
                    debug!(depth, regex = %level.as_str(), "level regex");
                }
                self.walk_levels(levels)?
            }
            None => self.walk_everything()?,
        };

        let groups = self.pattern.groups();
        let mut files = Vec::new();
        for filename in candidates {
            let matches = match regex.captures(&filename) {
                Some(captures) => Matches::from_captures(
                    &captures,
                    Arc::clone(groups),
                    self.config.date_is_first_class,
                ),
                None => continue,
            };
            if self.constraints.filters().is_valid(self, &filename, &matches) {
                files.push((filename, matches));
            }
        }
        files.sort_by(|a, b| a.0.cmp(&b.0));

        debug!(count = files.len(), "found matching files");
        Ok(files)
    }

    /// Walk one level per pattern level, pruning directories that do not match.
    fn walk_levels(&self, levels: &[Regex]) -> FinderResult<Vec<String>> {
        let n_levels = levels.len();
        let walker = WalkDir::new(&self.root)
            .max_depth(n_levels)
            .follow_links(self.config.follow_links)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| keep_entry(e, levels));

        let mut candidates = Vec::new();
        for entry in walker {
            let Some(entry) = skip_walk_error(entry)? else {
                continue;
            };
            if entry.depth() != n_levels || entry.file_type().is_dir() {
                continue;
            }
            if let Some(name) = self.relative_name(entry.path())? {
                candidates.push(name);
            }
        }
        Ok(candidates)
    }

    /// Walk every directory down to `max_depth`.
    fn walk_everything(&self) -> FinderResult<Vec<String>> {
        let walker = WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(self.config.max_depth)
            .follow_links(self.config.follow_links)
            .sort_by_file_name();

        let mut candidates = Vec::new();
        for entry in walker {
            let Some(entry) = skip_walk_error(entry)? else {
                continue;
            };
            if entry.file_type().is_dir() {
                continue;
            }
            if let Some(name) = self.relative_name(entry.path())? {
                candidates.push(name);
            }
        }
        Ok(candidates)
    }

    fn relative_name(&self, path: &Path) -> FinderResult<Option<String>> {
        let relative = path.strip_prefix(&self.root).map_err(io::Error::other)?;
        match relative.to_str() {
            Some(s) => Ok(Some(s.replace(MAIN_SEPARATOR, "/"))),
            None => {
                debug!(path = %path.display(), "skipping non UTF-8 path");
                Ok(None)
            }
        }
    }

    // ------------------------------------------------------------------------
    // Single files
    // ------------------------------------------------------------------------

    /// Match one filename (relative to the root, or absolute) with the current fixes.
    ///
    /// Filters are not applied.
    pub fn find_matches(&self, filename: &str) -> FinderResult<Matches> {
        let relative = if Path::new(filename).is_absolute() {
            self.get_relative(Path::new(filename))
                .ok_or_else(|| FinderError::NoMatch {
                    filename: filename.to_string(),
                })?
        } else {
            filename.to_string()
        };
        let regex = self.pattern.compile(self.constraints.fixes())?;
        self.pattern
            .match_with(&regex, &relative, self.config.date_is_first_class)
    }

    /// Generate a filename from the current fixes plus `fixes`.
    ///
    /// Extra fixes also apply to discarded groups. Every group must end up
    /// fixed.
    pub fn make_filename<K, V>(
        &self,
        fixes: impl IntoIterator<Item = (K, V)>,
        relative: bool,
    ) -> FinderResult<PathBuf>
    where
        K: Into<GroupKey>,
        V: Into<Fix>,
    {
        let mut merged: BTreeMap<usize, Fix> = self.constraints.fixes().clone();
        for (key, fix) in fixes {
            merged.extend(self.resolve_fix(&key.into(), fix.into(), true)?);
        }
        let name = self.pattern.make_filename(&merged)?;
        if relative {
            Ok(to_native_path(Path::new(""), &name))
        } else {
            Ok(to_native_path(&self.root, &name))
        }
    }

    /// `/` separated name of a path relative to the root, if it is under it.
    pub fn get_relative(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        relative.to_str().map(|s| s.replace(MAIN_SEPARATOR, "/"))
    }

    /// Absolute path of a `/` separated name relative to the root.
    pub fn get_absolute(&self, name: &str) -> PathBuf {
        to_native_path(&self.root, name)
    }
}

impl fmt::Display for Finder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "root: {}", self.root.display())?;
        writeln!(f, "pattern: {}", self.pattern)?;
        match self.get_regex() {
            Ok(regex) => writeln!(f, "regex: {}", regex)?,
            Err(e) => writeln!(f, "regex: <{}>", e)?,
        }
        let fixes = self.constraints.fixes();
        if !fixes.is_empty() {
            writeln!(f, "fixed groups:")?;
            for (index, fix) in fixes {
                writeln!(f, "  {}: {}", self.pattern.groups()[*index], fix)?;
            }
        }
        let filters = self.constraints.filters();
        if !filters.is_empty() {
            let names: Vec<String> = filters.iter().map(|flt| flt.to_string()).collect();
            writeln!(f, "filters: {}", names.join(", "))?;
        }
        match &self.cache {
            Some(cache) if self.is_scanned() => write!(f, "scanned: {} files", cache.files.len()),
            _ => write!(f, "not scanned"),
        }
    }
}

/// Files listed by [`Finder::get_files_nested`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NestedFiles {
    /// Innermost level.
    Files(Vec<PathBuf>),
    /// One bucket per distinct matched text.
    Groups(Vec<(String, NestedFiles)>),
}

impl NestedFiles {
    /// Every file, in order, flattened.
    pub fn flatten(&self) -> Vec<&Path> {
        match self {
            NestedFiles::Files(files) => files.iter().map(PathBuf::as_path).collect(),
            NestedFiles::Groups(buckets) => buckets.iter().flat_map(|(_, n)| n.flatten()).collect(),
        }
    }
}

fn nest_files(files: &[&(String, Matches)], levels: &[Vec<usize>], root: &Path) -> NestedFiles {
    let Some((indices, inner)) = levels.split_first() else {
        return NestedFiles::Files(
            files
                .iter()
                .map(|(name, _)| to_native_path(root, name))
                .collect(),
        );
    };
    let mut buckets: Vec<(String, Vec<&(String, Matches)>)> = Vec::new();
    for &file in files {
        let text: String = indices
            .iter()
            .filter_map(|&i| file.1.get(i))
            .map(|m| m.raw())
            .collect();
        match buckets.iter_mut().find(|(t, _)| *t == text) {
            Some((_, bucket)) => bucket.push(file),
            None => buckets.push((text, vec![file])),
        }
    }
    NestedFiles::Groups(
        buckets
            .into_iter()
            .map(|(text, bucket)| {
                let nested = nest_files(&bucket, inner, root);
                (text, nested)
            })
            .collect(),
    )
}

/// Join a `/` separated name onto a base path.
fn to_native_path(base: &Path, name: &str) -> PathBuf {
    name.split('/')
        .filter(|part| !part.is_empty())
        .fold(base.to_path_buf(), |path, part| path.join(part))
}

/// Errors below the root are logged and the entry skipped; the root itself must be readable.
fn skip_walk_error(entry: walkdir::Result<DirEntry>) -> FinderResult<Option<DirEntry>> {
    match entry {
        Ok(entry) => Ok(Some(entry)),
        Err(err) if err.depth() == 0 => Err(err.into()),
        Err(err) => {
            warn!(error = %err, "skipping unreadable entry");
            Ok(None)
        }
    }
}

/// Prune directories whose name does not match their level.
fn keep_entry(entry: &DirEntry, levels: &[Regex]) -> bool {
    let depth = entry.depth();
    if depth == 0 || depth >= levels.len() {
        return true;
    }
    if !entry.file_type().is_dir() {
        return false;
    }
    let keep = entry
        .file_name()
        .to_str()
        .is_some_and(|name| levels[depth - 1].is_match(name));
    if !keep {
        trace!(path = %entry.path().display(), "pruned");
    }
    keep
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn finder(pattern: &str) -> Finder {
        Finder::new("/data", pattern).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    mod config {
        use super::*;

        #[test]
        fn test_defaults() {
            let config = FinderConfig::default();
            assert!(!config.use_regex);
            assert!(!config.scan_everything);
            assert_eq!(config.max_depth, DEFAULT_MAX_DEPTH);
            assert!(config.date_is_first_class);
        }

        #[test]
        fn test_builder() {
            let config = FinderConfig::default()
                .with_scan_everything(true)
                .with_max_depth(3)
                .with_date_is_first_class(false);
            assert!(config.scan_everything);
            assert_eq!(config.max_depth, 3);
            assert!(!config.date_is_first_class);
        }

        #[test]
        fn test_setters_bump_revision() {
            let mut f = finder("%(Y).nc");
            let r0 = f.constraints().revision();
            f.set_scan_everything(true);
            assert!(f.constraints().revision() > r0);
        }

        #[test]
        fn test_set_pattern_drops_fixes() {
            let mut f = finder("%(Y).nc");
            f.fix_group("Y", 2007).unwrap();
            f.set_pattern("%(m).nc").unwrap();
            assert!(f.constraints().fixes().is_empty());
            assert_eq!(f.groups()[0].name(), "m");
        }
    }

    // =========================================================================
    // Fixing
    // =========================================================================

    mod fixing {
        use super::*;

        #[test]
        fn test_fix_by_name_fixes_all_groups() {
            let mut f = finder("%(Y)/%(m)_%(Y).nc");
            f.fix_group("Y", 2007).unwrap();
            assert_eq!(
                f.get_regex().unwrap(),
                r"^(?:(2007)/(\d\d)_(2007)\.nc)$"
            );
        }

        #[test]
        fn test_fix_skips_discarded() {
            let mut f = finder("%(Y)_%(Y:discard).nc");
            f.fix_group("Y", 2007).unwrap();
            assert!(f.constraints().is_fixed(0));
            assert!(!f.constraints().is_fixed(1));

            f.fix_group_with("Y", 2008, true).unwrap();
            assert!(f.constraints().is_fixed(1));
        }

        #[test]
        fn test_fix_only_discarded_is_not_found() {
            let mut f = finder("%(Y:discard).nc");
            let err = f.fix_group("Y", 2007).unwrap_err();
            assert!(matches!(err, FinderError::GroupNotFound { .. }));
        }

        #[test]
        fn test_fix_unknown_group() {
            let mut f = finder("%(Y).nc");
            assert!(matches!(
                f.fix_group("m", 1),
                Err(FinderError::GroupNotFound { .. })
            ));
            assert!(matches!(
                f.fix_group(3usize, 1),
                Err(FinderError::GroupNotFound { .. })
            ));
        }

        #[test]
        fn test_fix_groups_checks_all_first() {
            let mut f = finder("%(Y)_%(m).nc");
            let result = f.fix_groups(vec![("Y", Fix::from(2007)), ("m", Fix::from(true))]);
            assert!(matches!(result, Err(FinderError::InvalidFix { .. })));
            assert!(f.constraints().fixes().is_empty());
        }

        #[test]
        fn test_fix_date_decomposes() {
            let mut f = finder("%(Y)/%(j)_%(B).nc");
            f.fix_group("date", date(2007, 1, 8)).unwrap();
            assert_eq!(f.constraints().fix(0), Some(&Fix::from(2007)));
            assert_eq!(f.constraints().fix(1), Some(&Fix::from(8)));
            assert_eq!(f.constraints().fix(2), Some(&Fix::from("January")));
        }

        #[test]
        fn test_fix_date_list() {
            let mut f = finder("%(Y)%(m).nc");
            f.fix_group("date", vec![date(2007, 1, 1), date(2008, 2, 1)])
                .unwrap();
            assert_eq!(f.constraints().fix(0), Some(&Fix::from(vec![2007, 2008])));
            assert_eq!(f.constraints().fix(1), Some(&Fix::from(vec![1, 2])));
        }

        #[test]
        fn test_fix_date_requires_dates() {
            let mut f = finder("%(Y).nc");
            assert!(matches!(
                f.fix_group("date", 2007),
                Err(FinderError::InvalidFix { .. })
            ));
        }

        #[test]
        fn test_date_not_first_class() {
            let config = FinderConfig::default().with_date_is_first_class(false);
            let mut f = Finder::with_config("/data", "%(Y).nc", config).unwrap();
            assert!(matches!(
                f.fix_group("date", date(2007, 1, 1)),
                Err(FinderError::GroupNotFound { .. })
            ));
        }

        #[test]
        fn test_unfix_removes_fix_and_filter() {
            let mut f = finder("%(Y)_%(m).nc");
            f.fix_group("Y", 2007).unwrap();
            f.fix_by_filter("Y", |v| v.as_int() == Some(2007), false)
                .unwrap();
            f.add_filter("always", |_, _, _| true);
            assert_eq!(f.constraints().filters().len(), 2);

            f.unfix_group("Y").unwrap();
            assert!(f.constraints().fixes().is_empty());
            assert_eq!(f.constraints().filters().len(), 1);
        }

        #[test]
        fn test_filter_date_without_date_elements() {
            let mut f = finder("%(I).txt");
            assert!(matches!(
                f.fix_by_filter("date", |_| true, false),
                Err(FinderError::GroupNotFound { .. })
            ));
            assert!(f.constraints().filters().is_empty());
        }

        #[test]
        fn test_unfix_date() {
            let mut f = finder("%(Y)%(m)_%(I).nc");
            f.fix_group("date", date(2007, 1, 1)).unwrap();
            f.fix_group("I", 3).unwrap();
            f.fix_by_filter("date", |_| true, false).unwrap();
            f.unfix_group("date").unwrap();
            assert_eq!(f.constraints().fixes().len(), 1);
            assert!(f.constraints().filters().is_empty());
        }
    }

    // =========================================================================
    // Single files
    // =========================================================================

    mod single {
        use super::*;

        #[test]
        fn test_make_filename() {
            let mut f = finder("%(Y)/A_%(Y)%(m:discard).nc");
            f.fix_group("Y", 2007).unwrap();
            let name = f.make_filename([("m", 3)], true).unwrap();
            assert_eq!(name, PathBuf::from("2007").join("A_200703.nc"));
            let absolute = f.make_filename([("m", 3)], false).unwrap();
            assert_eq!(absolute, Path::new("/data").join("2007").join("A_200703.nc"));
        }

        #[test]
        fn test_make_filename_with_date() {
            let f = finder("%(x)_%(I).nc");
            let fixes: Vec<(&str, Fix)> =
                vec![("date", Fix::from(date(2007, 1, 8))), ("I", Fix::from(2))];
            let name = f.make_filename(fixes, true).unwrap();
            assert_eq!(name, PathBuf::from("20070108_2.nc"));
        }

        #[test]
        fn test_find_matches_absolute() {
            let f = finder("%(Y)/%(m).nc");
            let m = f.find_matches("/data/2007/03.nc").unwrap();
            assert_eq!(m.get_value("m").unwrap(), Value::Int(3));
            assert!(matches!(
                f.find_matches("/other/2007/03.nc"),
                Err(FinderError::NoMatch { .. })
            ));
        }

        #[test]
        fn test_relative_absolute() {
            let f = finder("%(Y).nc");
            let abs = f.get_absolute("a/b.nc");
            assert_eq!(abs, Path::new("/data").join("a").join("b.nc"));
            assert_eq!(f.get_relative(&abs).as_deref(), Some("a/b.nc"));
        }

        #[test]
        fn test_display() {
            let mut f = finder("%(Y).nc");
            f.fix_group("Y", 2007).unwrap();
            let text = f.to_string();
            assert!(text.contains("pattern: %(Y).nc"));
            assert!(text.contains("Y:0: 2007"));
            assert!(text.contains("not scanned"));
        }
    }
}

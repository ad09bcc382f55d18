//! Integration tests for directory scanning.

use std::cell::Cell;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use chrono::{Datelike, NaiveDate};
use filefinder_core::date::DefaultDate;
use filefinder_core::{Finder, FinderConfig, FinderError, NestedFiles, Value};
use tempfile::TempDir;

fn touch(root: &Path, name: &str) {
    let path = root.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, b"").unwrap();
}

/// `root/<year>/SST_<year><month><day>.nc` for a few days, plus noise.
fn create_dataset() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    for year in [2007, 2008] {
        for month in 1..=3 {
            for day in [1, 15] {
                touch(
                    root,
                    &format!("{}/SST_{}{:02}{:02}.nc", year, year, month, day),
                );
            }
        }
    }
    touch(root, "2007/README.txt");
    touch(root, "notes.txt");
    dir
}

const PATTERN: &str = "%(Y)/SST_%(Y)%(m)%(d).nc";

fn names(finder: &mut Finder) -> Vec<String> {
    finder
        .files()
        .unwrap()
        .iter()
        .map(|(name, _)| name.clone())
        .collect()
}

// ============================================================================
// Basic scanning
// ============================================================================

#[test]
fn test_scan_finds_all_sorted() {
    let dir = create_dataset();
    let mut finder = Finder::new(dir.path(), PATTERN).unwrap();
    let files = names(&mut finder);
    assert_eq!(files.len(), 12);
    assert_eq!(files[0], "2007/SST_20070101.nc");
    assert_eq!(files[11], "2008/SST_20080315.nc");
    let mut sorted = files.clone();
    sorted.sort();
    assert_eq!(files, sorted);
}

#[test]
fn test_scan_matches_hold_values() {
    let dir = create_dataset();
    let mut finder = Finder::new(dir.path(), PATTERN).unwrap();
    let files = finder.files().unwrap();
    let (_, matches) = &files[1];
    assert_eq!(matches.get_value("Y").unwrap(), Value::Int(2007));
    assert_eq!(matches.get_value("d").unwrap(), Value::Int(15));
}

#[test]
fn test_empty_result_is_not_an_error() {
    let dir = TempDir::new().unwrap();
    touch(dir.path(), "unrelated/file.txt");
    let mut finder = Finder::new(dir.path(), PATTERN).unwrap();
    assert!(finder.files().unwrap().is_empty());
}

#[test]
fn test_missing_root_is_an_error() {
    let dir = TempDir::new().unwrap();
    let mut finder = Finder::new(dir.path().join("missing"), PATTERN).unwrap();
    assert!(matches!(finder.files(), Err(FinderError::Walk(_))));
}

#[test]
fn test_get_files_paths() {
    let dir = create_dataset();
    let mut finder = Finder::new(dir.path(), PATTERN).unwrap();
    let date = NaiveDate::from_ymd_opt(2008, 2, 15).unwrap();
    finder.fix_group("date", date).unwrap();
    let relative = finder.get_files(true).unwrap();
    assert_eq!(relative, vec![Path::new("2008").join("SST_20080215.nc")]);
    let absolute = finder.get_files(false).unwrap();
    assert_eq!(
        absolute,
        vec![dir.path().join("2008").join("SST_20080215.nc")]
    );
    assert!(absolute[0].is_file());
}

#[test]
fn test_get_files_nested() {
    let dir = create_dataset();
    let mut finder = Finder::new(dir.path(), PATTERN).unwrap();
    finder.fix_group("m", vec![1, 2]).unwrap();
    let nested = finder.get_files_nested(["Y", "m"], true).unwrap();

    let NestedFiles::Groups(years) = &nested else {
        panic!("Expected groups, got {:?}", nested);
    };
    let year_keys: Vec<&str> = years.iter().map(|(k, _)| k.as_str()).collect();
    // Both `Y` groups match the same text.
    assert_eq!(year_keys, vec!["20072007", "20082008"]);

    let NestedFiles::Groups(months) = &years[1].1 else {
        panic!("Expected groups, got {:?}", years[1].1);
    };
    assert_eq!(months.len(), 2);
    assert_eq!(months[0].0, "01");
    assert_eq!(
        months[1].1,
        NestedFiles::Files(vec![
            Path::new("2008").join("SST_20080201.nc"),
            Path::new("2008").join("SST_20080215.nc"),
        ])
    );

    let flat: Vec<_> = nested.flatten().into_iter().map(Path::to_path_buf).collect();
    assert_eq!(flat, finder.get_files(true).unwrap());
}

#[test]
fn test_get_files_nested_absolute_and_empty_keys() {
    let dir = create_dataset();
    let mut finder = Finder::new(dir.path(), PATTERN).unwrap();
    finder.fix_group("Y", 2007).unwrap();
    let nested = finder.get_files_nested(Vec::<&str>::new(), false).unwrap();
    assert_eq!(nested, NestedFiles::Files(finder.get_files(false).unwrap()));
}

#[test]
fn test_get_files_nested_unknown_key() {
    let dir = create_dataset();
    let mut finder = Finder::new(dir.path(), PATTERN).unwrap();
    assert!(matches!(
        finder.get_files_nested(["H"], true),
        Err(FinderError::GroupNotFound { .. })
    ));
}

// ============================================================================
// Pruning
// ============================================================================

#[cfg(unix)]
#[test]
fn test_symlink_loop_is_skipped() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    touch(root, "2007/SST_20070101.nc");
    fs::create_dir_all(root.join("misc")).unwrap();
    std::os::unix::fs::symlink(root.join("misc"), root.join("misc").join("loop")).unwrap();

    let config = FinderConfig::default().with_follow_links(true);
    let mut pruned = Finder::with_config(root, PATTERN, config.clone()).unwrap();
    assert_eq!(names(&mut pruned), vec!["2007/SST_20070101.nc"]);

    let config = config.with_scan_everything(true);
    let mut everything = Finder::with_config(root, PATTERN, config).unwrap();
    assert_eq!(names(&mut everything), vec!["2007/SST_20070101.nc"]);
}

#[cfg(unix)]
#[test]
fn test_dangling_symlink_is_skipped() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    touch(root, "2007/SST_20070101.nc");
    std::os::unix::fs::symlink(root.join("nowhere"), root.join("2007").join("dangling")).unwrap();

    let config = FinderConfig::default().with_follow_links(true);
    let mut finder = Finder::with_config(root, PATTERN, config.clone()).unwrap();
    assert_eq!(finder.files().unwrap().len(), 1);

    let mut everything =
        Finder::with_config(root, PATTERN, config.with_scan_everything(true)).unwrap();
    assert_eq!(everything.files().unwrap().len(), 1);
}

#[test]
fn test_files_outside_last_level_ignored() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    touch(root, "2007/SST_20070101.nc");
    touch(root, "archive/SST_20070101.nc");
    touch(root, "SST_20070101.nc");
    touch(root, "2007/extra/SST_20070101.nc");

    let mut finder = Finder::new(root, PATTERN).unwrap();
    assert_eq!(names(&mut finder), vec!["2007/SST_20070101.nc"]);
}

#[test]
fn test_fixed_value_prunes_directories() {
    let dir = create_dataset();
    let mut finder = Finder::new(dir.path(), PATTERN).unwrap();
    finder.fix_group("Y", 2008).unwrap();
    let files = names(&mut finder);
    assert_eq!(files.len(), 6);
    assert!(files.iter().all(|f| f.starts_with("2008/")));
}

#[test]
fn test_scan_everything_with_depth_limit() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    touch(root, "a/data_1.txt");
    touch(root, "a/b/data_2.txt");
    touch(root, "a/b/c/data_3.txt");

    let pattern = r"%(dir:rgx=[a-z/]+)/data_%(I).txt";
    let mut finder = Finder::new(root, pattern).unwrap();
    assert_eq!(names(&mut finder).len(), 3);

    finder.set_max_depth(3);
    assert_eq!(
        names(&mut finder),
        vec!["a/b/data_2.txt", "a/data_1.txt"]
    );
}

// ============================================================================
// Fixes
// ============================================================================

#[test]
fn test_fix_list_alternation() {
    let dir = create_dataset();
    let mut finder = Finder::new(dir.path(), PATTERN).unwrap();
    finder.fix_group("m", vec![1, 3]).unwrap();
    let files = names(&mut finder);
    assert_eq!(files.len(), 8);
    assert!(files.iter().all(|f| &f[13..15] != "02"));

    let name = finder
        .make_filename([("Y", 2007), ("d", 1)], true)
        .unwrap();
    assert_eq!(name, Path::new("2007").join("SST_20070101.nc"));
}

#[test]
fn test_fix_string_is_regex() {
    let dir = create_dataset();
    let mut finder = Finder::new(dir.path(), PATTERN).unwrap();
    finder.fix_group("d", "1.").unwrap();
    assert_eq!(names(&mut finder).len(), 6);
}

#[test]
fn test_unfix_invalidates_cache() {
    let dir = create_dataset();
    let mut finder = Finder::new(dir.path(), PATTERN).unwrap();
    finder.fix_group("Y", 2007).unwrap();
    assert_eq!(names(&mut finder).len(), 6);
    assert!(finder.is_scanned());

    finder.unfix_group("Y").unwrap();
    assert!(!finder.is_scanned());
    assert_eq!(names(&mut finder).len(), 12);
}

#[test]
fn test_cache_reused_until_change() {
    let dir = create_dataset();
    let mut finder = Finder::new(dir.path(), PATTERN).unwrap();
    assert_eq!(names(&mut finder).len(), 12);

    // Not seen until something changes.
    touch(dir.path(), "2007/SST_20070401.nc");
    assert_eq!(names(&mut finder).len(), 12);

    finder.find_files().unwrap();
    assert_eq!(names(&mut finder).len(), 13);
}

// ============================================================================
// Filters
// ============================================================================

#[test]
fn test_fix_by_filter_on_group() {
    let dir = create_dataset();
    let mut finder = Finder::new(dir.path(), PATTERN).unwrap();
    finder
        .fix_by_filter("d", |v| v.as_int().is_some_and(|d| d > 10), false)
        .unwrap();
    let files = names(&mut finder);
    assert_eq!(files.len(), 6);
    assert!(files.iter().all(|f| f.ends_with("15.nc")));

    finder.unfix_group("d").unwrap();
    assert_eq!(names(&mut finder).len(), 12);
}

#[test]
fn test_fix_by_filter_on_date() {
    let dir = create_dataset();
    let mut finder = Finder::new(dir.path(), PATTERN).unwrap();
    finder
        .fix_by_filter(
            "date",
            |v| v.as_date().is_some_and(|d| d.month() == 2 && d.year() == 2008),
            false,
        )
        .unwrap();
    assert_eq!(
        names(&mut finder),
        vec!["2008/SST_20080201.nc", "2008/SST_20080215.nc"]
    );
}

#[test]
fn test_fix_by_date_with_partial_default() {
    let dir = TempDir::new().unwrap();
    touch(dir.path(), "obs_0229.txt");
    touch(dir.path(), "obs_0301.txt");
    let mut finder = Finder::new(dir.path(), "obs_%(m)%(d).txt").unwrap();
    // 02-29 only exists in a leap year.
    finder.fix_by_date(|_| true, Some(DefaultDate::new().with_year(2001)));
    assert_eq!(names(&mut finder), vec!["obs_0301.txt"]);

    finder.unfix_group("date").unwrap();
    finder.fix_by_date(
        |v| v.as_date().is_some_and(|d| d.year() == 2004),
        Some(DefaultDate::new().with_year(2004)),
    );
    assert_eq!(names(&mut finder), vec!["obs_0229.txt", "obs_0301.txt"]);
}

#[test]
fn test_filter_pass_unparsed() {
    let dir = TempDir::new().unwrap();
    touch(dir.path(), "run_12.txt");
    touch(dir.path(), "run_ab.txt");
    let pattern = r"run_%(I:rgx=\w+).txt";

    let mut skipping = Finder::new(dir.path(), pattern).unwrap();
    skipping
        .fix_by_filter("I", |v| v.as_int() == Some(12), false)
        .unwrap();
    assert_eq!(names(&mut skipping), vec!["run_12.txt", "run_ab.txt"]);

    let mut passing = Finder::new(dir.path(), pattern).unwrap();
    passing
        .fix_by_filter("I", |v| v.as_int() == Some(12), true)
        .unwrap();
    assert_eq!(names(&mut passing), vec!["run_12.txt"]);
}

#[test]
fn test_basic_filter_short_circuits() {
    let dir = create_dataset();
    let calls = Rc::new(Cell::new(0));
    let mut finder = Finder::new(dir.path(), PATTERN).unwrap();
    finder.add_filter("january", |_, filename, _| filename.contains("01"));
    let counter = Rc::clone(&calls);
    finder.add_filter("count", move |_, _, _| {
        counter.set(counter.get() + 1);
        true
    });
    let files = names(&mut finder);
    assert_eq!(calls.get(), files.len());
    assert!(files.len() < 12);
}

// ============================================================================
// Discarded groups
// ============================================================================

#[test]
fn test_discarded_group_values() {
    let dir = TempDir::new().unwrap();
    touch(dir.path(), "A_2007001_2007008.nc");
    let mut finder = Finder::new(dir.path(), "A_%(Y)%(j)_%(Y)%(j:discard).nc").unwrap();
    let files = finder.files().unwrap();
    assert_eq!(files.len(), 1);
    let (_, matches) = &files[0];
    assert_eq!(matches.get_values("j").unwrap(), vec![Value::Int(1)]);
    assert_eq!(matches.get_value("j").unwrap(), Value::Int(1));
}

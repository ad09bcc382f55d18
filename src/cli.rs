//! Command implementations behind the `ff` binary.
//!
//! Each `run_*` function builds the response of one subcommand. The binary
//! only parses arguments and prints what these return, so everything here is
//! testable without spawning a process.

use std::path::Path;

use tracing::debug;

use crate::error::FinderResult;
use crate::finder::{Finder, FinderConfig};
use crate::group::GroupKey;
use crate::output::{
    FileEntry, FindResponse, MakeResponse, MatchInfo, ParseResponse, RegexResponse, SCHEMA_VERSION,
};
use crate::value::{Fix, Value};

/// Parse a `--fix` argument in `KEY=VALUE[,VALUE...]` format.
///
/// A key made of digits selects a group by index. Several comma separated
/// values are fixed as a list.
pub fn parse_fix_arg(s: &str) -> Result<(GroupKey, Fix), String> {
    let Some((key, values)) = s.split_once('=') else {
        return Err(format!(
            "invalid fix format '{}', expected 'KEY=VALUE' (e.g., 'Y=2007' or 'm=1,2,3')",
            s
        ));
    };
    if key.is_empty() {
        return Err(format!("invalid fix '{}': empty group key", s));
    }
    let key = match key.parse::<usize>() {
        Ok(index) => GroupKey::Index(index),
        Err(_) => GroupKey::Name(key.to_string()),
    };
    let mut parsed: Vec<Value> = values.split(',').map(parse_cli_value).collect();
    let fix = if parsed.len() == 1 {
        Fix::One(parsed.remove(0))
    } else {
        Fix::Many(parsed)
    };
    Ok((key, fix))
}

/// Interpret a command line value: integer, then float, then boolean,
/// otherwise a string (used as a regex when scanning).
pub fn parse_cli_value(s: &str) -> Value {
    if let Ok(v) = s.parse::<i64>() {
        return Value::Int(v);
    }
    if let Ok(v) = s.parse::<f64>() {
        return Value::Float(v);
    }
    match s {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::Str(s.to_string()),
    }
}

/// Compile a pattern with fixes applied.
pub fn run_regex(
    pattern: &str,
    fixes: Vec<(GroupKey, Fix)>,
    config: FinderConfig,
) -> FinderResult<RegexResponse> {
    let mut finder = Finder::with_config(".", pattern, config)?;
    finder.fix_groups(fixes)?;
    Ok(RegexResponse {
        status: "ok".to_string(),
        schema_version: SCHEMA_VERSION.to_string(),
        pattern: pattern.to_string(),
        regex: finder.get_regex()?,
    })
}

/// Scan `root` for files matching `pattern`.
///
/// Paths are relative to the root when `relative` is set.
pub fn run_find(
    root: &Path,
    pattern: &str,
    fixes: Vec<(GroupKey, Fix)>,
    config: FinderConfig,
    relative: bool,
) -> FinderResult<FindResponse> {
    let mut finder = Finder::with_config(root, pattern, config)?;
    finder.fix_groups(fixes)?;
    let found = finder.files()?.to_vec();
    debug!("found {} files under {}", found.len(), root.display());

    let files: Vec<FileEntry> = found
        .iter()
        .map(|(name, matches)| FileEntry {
            path: if relative {
                name.clone()
            } else {
                finder.get_absolute(name).display().to_string()
            },
            matches: MatchInfo::from_matches(matches, false),
        })
        .collect();

    Ok(FindResponse {
        status: "ok".to_string(),
        schema_version: SCHEMA_VERSION.to_string(),
        root: root.display().to_string(),
        pattern: pattern.to_string(),
        count: files.len(),
        files,
    })
}

/// Generate a filename. Without a root the filename is relative.
pub fn run_make(
    pattern: &str,
    root: Option<&Path>,
    fixes: Vec<(GroupKey, Fix)>,
    config: FinderConfig,
) -> FinderResult<MakeResponse> {
    let finder = Finder::with_config(root.unwrap_or(Path::new("")), pattern, config)?;
    let path = finder.make_filename(fixes, root.is_none())?;
    Ok(MakeResponse {
        status: "ok".to_string(),
        schema_version: SCHEMA_VERSION.to_string(),
        filename: path.display().to_string(),
    })
}

/// Match a single filename and parse every group.
pub fn run_parse(pattern: &str, filename: &str, config: FinderConfig) -> FinderResult<ParseResponse> {
    let finder = Finder::with_config("", pattern, config)?;
    let matches = finder.find_matches(filename)?;
    let date = matches.get_date(None).ok().map(|d| Value::Date(d).to_string());
    Ok(ParseResponse {
        status: "ok".to_string(),
        schema_version: SCHEMA_VERSION.to_string(),
        filename: filename.to_string(),
        matches: MatchInfo::from_matches(&matches, true),
        date,
    })
}

// ============================================================================
// Tests
// ============================================================================

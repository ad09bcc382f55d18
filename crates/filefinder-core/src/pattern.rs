//! Pattern compilation.
//!
//! A pattern is literal text interspersed with groups `%(...)`. It is parsed
//! once into an ordered list of [`Segment`]s. Regexes are then generated on
//! demand, taking the fixed values of the constraint set into account:
//!
//! - the full regex, anchored, used to match paths relative to the root,
//! - one regex per directory level, obtained by splitting the literal
//!   segments at `/`, used to prune the walk.
//!
//! Directory separators are always written `/` in a pattern.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use regex::Regex;
use tracing::debug;

use crate::error::{FinderError, FinderResult};
use crate::group::Group;
use crate::matches::Matches;
use crate::value::Fix;

/// Piece of a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Literal text, unescaped.
    Literal(String),
    /// Group, by index.
    Group(usize),
}

/// A compiled pattern.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    segments: Vec<Segment>,
    groups: Arc<[Group]>,
    use_regex: bool,
}

impl Pattern {
    /// Parse a pattern.
    ///
    /// With `use_regex`, literal text is inserted in regexes as is; otherwise
    /// it is escaped. `%%` in literal text stands for a single `%`.
    ///
    /// # Errors
    ///
    /// `MalformedPattern` for an unclosed group, or any error raised while
    /// building a group.
    pub fn parse(pattern: &str, use_regex: bool) -> FinderResult<Self> {
        let mut segments = Vec::new();
        let mut groups = Vec::new();
        let mut literal = String::new();
        let mut rest = pattern;

        while let Some(start) = rest.find('%') {
            literal.push_str(&rest[..start]);
            let after = &rest[start + 1..];
            if let Some(tail) = after.strip_prefix('%') {
                literal.push('%');
                rest = tail;
                continue;
            }
            if !after.starts_with('(') {
                literal.push('%');
                rest = after;
                continue;
            }
            let body = &after[1..];
            let end = find_group_end(body)
                .ok_or_else(|| FinderError::malformed(pattern, "no group end found"))?;

            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            let index = groups.len();
            groups.push(Group::parse(&body[..end], index)?);
            segments.push(Segment::Group(index));
            rest = &body[end + 1..];
        }
        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        debug!(pattern, groups = groups.len(), "parsed pattern");
        Ok(Pattern {
            source: pattern.to_string(),
            segments,
            groups: groups.into(),
            use_regex,
        })
    }

    /// The pattern as written.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn groups(&self) -> &Arc<[Group]> {
        &self.groups
    }

    pub fn n_groups(&self) -> usize {
        self.groups.len()
    }

    pub fn use_regex(&self) -> bool {
        self.use_regex
    }

    /// Number of `/` separated levels (1 for a pattern without directories).
    pub fn n_levels(&self) -> usize {
        1 + self
            .segments
            .iter()
            .map(|s| match s {
                Segment::Literal(text) => text.matches('/').count(),
                Segment::Group(_) => 0,
            })
            .sum::<usize>()
    }

    fn literal_regex(&self, text: &str) -> String {
        if self.use_regex {
            text.to_string()
        } else {
            regex::escape(text)
        }
    }

    // ------------------------------------------------------------------------
    // Regex generation
    // ------------------------------------------------------------------------

    /// Full regex body (not anchored), with groups narrowed by `fixes`.
    pub fn regex(&self, fixes: &BTreeMap<usize, Fix>) -> FinderResult<String> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(&self.literal_regex(text)),
                Segment::Group(i) => out.push_str(&self.groups[*i].regex_with(fixes.get(i))?),
            }
        }
        Ok(out)
    }

    /// Compile the anchored full regex.
    ///
    /// # Errors
    ///
    /// `MalformedPattern` if the regex is invalid, or if some group regex
    /// holds a capturing group of its own.
    pub fn compile(&self, fixes: &BTreeMap<usize, Fix>) -> FinderResult<Regex> {
        let body = self.regex(fixes)?;
        let regex = compile_anchored(&self.source, &body)?;
        if regex.captures_len() != self.groups.len() + 1 {
            return Err(FinderError::malformed(
                &self.source,
                format!(
                    "regex has {} capturing groups, expected {} (use '(?:...)' inside groups)",
                    regex.captures_len() - 1,
                    self.groups.len()
                ),
            ));
        }
        Ok(regex)
    }

    /// Anchored regexes for each directory level, the file name level last.
    ///
    /// Returns `None` when some group regex may match a `/`, in which case
    /// levels cannot be told apart.
    pub fn level_regexes(&self, fixes: &BTreeMap<usize, Fix>) -> FinderResult<Option<Vec<Regex>>> {
        let mut levels = vec![String::new()];
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => {
                    for (n, part) in text.split('/').enumerate() {
                        if n > 0 {
                            levels.push(String::new());
                        }
                        if let Some(level) = levels.last_mut() {
                            level.push_str(&self.literal_regex(part));
                        }
                    }
                }
                Segment::Group(i) => {
                    let rgx = self.groups[*i].regex_with(fixes.get(i))?;
                    if rgx.contains('/') {
                        return Ok(None);
                    }
                    if let Some(level) = levels.last_mut() {
                        level.push_str(&rgx);
                    }
                }
            }
        }
        levels
            .iter()
            .map(|body| compile_anchored(&self.source, body))
            .collect::<FinderResult<Vec<_>>>()
            .map(Some)
    }

    // ------------------------------------------------------------------------
    // Matching and generation
    // ------------------------------------------------------------------------

    /// Match a filename against the unfixed pattern.
    pub fn match_filename(&self, filename: &str, date_is_first_class: bool) -> FinderResult<Matches> {
        let regex = self.compile(&BTreeMap::new())?;
        self.match_with(&regex, filename, date_is_first_class)
    }

    /// Match a filename with an already compiled full regex.
    pub(crate) fn match_with(
        &self,
        regex: &Regex,
        filename: &str,
        date_is_first_class: bool,
    ) -> FinderResult<Matches> {
        let captures = regex.captures(filename).ok_or_else(|| FinderError::NoMatch {
            filename: filename.to_string(),
        })?;
        Ok(Matches::from_captures(
            &captures,
            Arc::clone(&self.groups),
            date_is_first_class,
        ))
    }

    /// Generate a filename (relative to the root) from fixed values.
    ///
    /// # Errors
    ///
    /// - `RegexMode` if literal text is a regex.
    /// - `NotAllFixed` listing the groups without a fix.
    pub fn make_filename(&self, fixes: &BTreeMap<usize, Fix>) -> FinderResult<String> {
        if self.use_regex {
            return Err(FinderError::RegexMode);
        }
        let missing: Vec<String> = self
            .groups
            .iter()
            .filter(|g| !fixes.contains_key(&g.index()))
            .map(|g| g.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(FinderError::NotAllFixed { groups: missing });
        }

        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Group(i) => {
                    if let Some(fix) = fixes.get(i) {
                        out.push_str(&self.groups[*i].fixed_string(fix)?);
                    }
                }
            }
        }
        Ok(out)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

/// Position of the `)` closing a group, `body` starting right after `%(`.
fn find_group_end(body: &str) -> Option<usize> {
    let mut depth = 1usize;
    for (i, c) in body.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn compile_anchored(pattern: &str, body: &str) -> FinderResult<Regex> {
    Regex::new(&format!("^(?:{})$", body))
        .map_err(|e| FinderError::malformed(pattern, format!("invalid regex: {}", e)))
}

//! Core of filefinder.
//!
//! This crate provides the pattern machinery:
//! - Format specs converting values to strings, regexes, and back
//! - Groups and the pattern compiler
//! - Constraints (fixed values) and filters
//! - Match sets and date aggregation
//! - The finder scanning a directory tree with level pruning
//!
//! ```no_run
//! use filefinder_core::Finder;
//!
//! let mut finder = Finder::new("/data", "%(Y)/SST_%(Y)%(m)%(d).nc")?;
//! finder.fix_group("m", vec![1, 2, 3])?;
//! for (filename, matches) in finder.files()? {
//!     println!("{} {}", filename, matches.get_value("d")?);
//! }
//! # Ok::<(), filefinder_core::FinderError>(())
//! ```

pub mod constraint;
pub mod date;
pub mod error;
pub mod filter;
pub mod finder;
pub mod format;
pub mod group;
pub mod matches;
pub mod pattern;
pub mod value;

pub use error::{FinderError, FinderResult, OutputErrorCode};
pub use finder::{Finder, FinderConfig, NestedFiles};
pub use group::{Group, GroupKey};
pub use matches::{Match, Matches};
pub use pattern::Pattern;
pub use value::{Fix, Value};

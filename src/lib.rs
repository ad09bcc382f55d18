//! filefinder: find files whose names follow a structured pattern.
//!
//! A pattern such as `%(Y)/SST_%(Y)%(m)%(d).nc` describes a family of
//! filenames. Groups can be fixed to values or filtered, the directory tree
//! is scanned with per-level pruning, and values are parsed back out of the
//! matched filenames.

// Core library - re-exported from filefinder-core
pub use filefinder_core::constraint;
pub use filefinder_core::date;
pub use filefinder_core::error;
pub use filefinder_core::filter;
pub use filefinder_core::finder;
pub use filefinder_core::format;
pub use filefinder_core::group;
pub use filefinder_core::matches;
pub use filefinder_core::pattern;
pub use filefinder_core::value;

pub use filefinder_core::{
    Finder, FinderConfig, FinderError, FinderResult, Fix, Group, GroupKey, Match, Matches,
    NestedFiles, OutputErrorCode, Pattern, Value,
};

// Front door
pub mod cli;
pub mod output;

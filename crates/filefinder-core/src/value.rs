//! Typed values exchanged with groups.
//!
//! A [`Value`] is what a group parses out of a filename, and what a caller
//! hands back to generate one. A [`Fix`] is the argument of the fixing API:
//! a single value or a list of alternatives.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// A value parsed from (or formatted into) a filename.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Signed integer (`d` format).
    Int(i64),
    /// Floating point number (`f`, `e`, `E` formats).
    Float(f64),
    /// String. When used to fix a group it is taken verbatim as a regex.
    Str(String),
    /// Selects one of the two alternatives of a `bool` group.
    Bool(bool),
    /// Date, for the `date` pseudo-group.
    Date(NaiveDateTime),
}

impl Value {
    /// Return the integer if this is an `Int`.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Return the number as a float if this is an `Int` or `Float`.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Return the string if this is a `Str`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Return the boolean if this is a `Bool`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Return the date if this is a `Date`.
    pub fn as_date(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Short name of the variant, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Bool(_) => "bool",
            Value::Date(_) => "date",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Str(s) => write!(f, "{}", s),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Date(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v.and_time(NaiveTime::MIN))
    }
}

// ============================================================================
// Fix
// ============================================================================

/// Value(s) a group is fixed to.
///
/// A list is joined as a regex alternation when scanning; only its first
/// element is used when generating a filename.
#[derive(Debug, Clone, PartialEq)]
pub enum Fix {
    One(Value),
    Many(Vec<Value>),
}

impl Fix {
    /// All values of the fix, in order.
    pub fn values(&self) -> &[Value] {
        match self {
            Fix::One(v) => std::slice::from_ref(v),
            Fix::Many(vs) => vs,
        }
    }

    /// First value, the one used for filename generation.
    pub fn first(&self) -> Option<&Value> {
        self.values().first()
    }
}

impl fmt::Display for Fix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fix::One(v) => write!(f, "{}", v),
            Fix::Many(vs) => {
                let parts: Vec<String> = vs.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
        }
    }
}

impl From<Value> for Fix {
    fn from(v: Value) -> Self {
        Fix::One(v)
    }
}

impl From<Vec<Value>> for Fix {
    fn from(v: Vec<Value>) -> Self {
        Fix::Many(v)
    }
}

macro_rules! impl_fix_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Fix {
                fn from(v: $ty) -> Self {
                    Fix::One(Value::from(v))
                }
            }

            impl From<Vec<$ty>> for Fix {
                fn from(v: Vec<$ty>) -> Self {
                    Fix::Many(v.into_iter().map(Value::from).collect())
                }
            }
        )*
    };
}

impl_fix_from!(i64, i32, u32, f64, bool, &str, String, NaiveDateTime, NaiveDate);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_fix_keeps_order() {
        let fix = Fix::from(vec![1, 3, 5, 7]);
        assert_eq!(
            fix.values(),
            &[Value::Int(1), Value::Int(3), Value::Int(5), Value::Int(7)]
        );
        assert_eq!(fix.first(), Some(&Value::Int(1)));
    }

    #[test]
    fn date_from_naive_date_is_midnight() {
        let date = NaiveDate::from_ymd_opt(2007, 1, 8).unwrap();
        let value = Value::from(date);
        assert_eq!(value.to_string(), "2007-01-08 00:00:00");
    }

    #[test]
    fn int_widens_to_float() {
        assert_eq!(Value::Int(3).as_float(), Some(3.0));
        assert_eq!(Value::Str("3".into()).as_float(), None);
    }
}

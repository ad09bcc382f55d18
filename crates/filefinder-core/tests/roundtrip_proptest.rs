//! Property-based tests for value <-> string <-> regex conversions.
//!
//! For every format spec, a formatted value must be matched by the format regex
//! and parse back to the same value. The same holds for whole filenames
//! generated from a pattern and matched again.

use filefinder_core::format::FormatSpec;
use filefinder_core::{Finder, Fix, Value};
use proptest::prelude::*;
use regex::Regex;

fn full_match(rgx: &str, s: &str) -> bool {
    Regex::new(&format!("^(?:{})$", rgx)).unwrap().is_match(s)
}

fn integer_spec_strategy() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("d"),
        Just("04d"),
        Just("+d"),
        Just(" d"),
        Just("+06d"),
        Just("x>6d"),
        Just("_<5d"),
        Just("x^7d"),
        Just("x=8d"),
    ]
}

fn fixed_spec_strategy() -> impl Strategy<Value = (&'static str, i32)> {
    prop_oneof![
        Just((".0f", 0)),
        Just((".2f", 2)),
        Just(("08.3f", 3)),
        Just(("+.1f", 1)),
        Just(("_>12.2f", 2)),
        Just(("f", 6)),
    ]
}

fn exp_spec_strategy() -> impl Strategy<Value = (&'static str, usize)> {
    prop_oneof![
        Just((".2e", 2)),
        Just((".0e", 0)),
        Just(("E", 6)),
        Just(("+.3E", 3)),
        Just(("x>14.1e", 1)),
    ]
}

fn string_spec_strategy() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("s"),
        Just("12s"),
        Just(">12s"),
        Just("-^14s"),
        Just("0<6s"),
    ]
}

proptest! {
    #[test]
    fn integers_roundtrip(spec in integer_spec_strategy(), v in -1_000_000i64..1_000_000) {
        let format = FormatSpec::parse(spec).unwrap();
        let s = format.format(&Value::Int(v)).unwrap();
        prop_assert!(full_match(&format.regex(), &s), "'{}' not matched by '{}'", s, format.regex());
        prop_assert_eq!(format.parse_value(&s).unwrap(), Value::Int(v));
    }

    #[test]
    fn fixed_floats_roundtrip((spec, precision) in fixed_spec_strategy(), k in -1_000_000i64..1_000_000) {
        // k * 10^-precision has exactly `precision` decimals
        let v: f64 = format!("{}e-{}", k, precision).parse().unwrap();
        let format = FormatSpec::parse(spec).unwrap();
        let s = format.format(&Value::Float(v)).unwrap();
        prop_assert!(full_match(&format.regex(), &s), "'{}' not matched by '{}'", s, format.regex());
        prop_assert_eq!(format.parse_value(&s).unwrap(), Value::Float(v));
    }

    #[test]
    fn exponent_floats_roundtrip(
        (spec, precision) in exp_spec_strategy(),
        negative in any::<bool>(),
        digits in proptest::collection::vec(0u8..10, 7),
        lead in 1u8..10,
        exponent in -20i32..20,
    ) {
        let fraction: String = digits[..precision].iter().map(|d| d.to_string()).collect();
        let sign = if negative { "-" } else { "" };
        let text = if precision > 0 {
            format!("{}{}.{}e{}", sign, lead, fraction, exponent)
        } else {
            format!("{}{}e{}", sign, lead, exponent)
        };
        let v: f64 = text.parse().unwrap();
        let format = FormatSpec::parse(spec).unwrap();
        let s = format.format(&Value::Float(v)).unwrap();
        prop_assert!(full_match(&format.regex(), &s), "'{}' not matched by '{}'", s, format.regex());
        prop_assert_eq!(format.parse_value(&s).unwrap(), Value::Float(v));
    }

    #[test]
    fn strings_roundtrip(spec in string_spec_strategy(), v in "[a-z][a-z_0-9]{0,10}[a-z]") {
        let format = FormatSpec::parse(spec).unwrap();
        let s = format.format(&Value::from(v.as_str())).unwrap();
        prop_assert!(full_match(&format.regex(), &s));
        prop_assert_eq!(format.parse_value(&s).unwrap(), Value::from(v.as_str()));
    }

    #[test]
    fn filenames_roundtrip(
        year in 1000i64..10000,
        month in 1i64..13,
        index in -9999i64..10000,
        k in -100_000i64..100_000,
        flag in any::<bool>(),
    ) {
        let finder = Finder::new(
            "/data",
            "%(Y)/run_%(m)_%(idx:fmt=+05d)_%(val:fmt=.3f)_%(flag:bool=hi:lo).dat",
        )
        .unwrap();
        let val: f64 = format!("{}e-3", k).parse().unwrap();
        let fixes: Vec<(&str, Fix)> = vec![
            ("Y", Fix::from(year)),
            ("m", Fix::from(month)),
            ("idx", Fix::from(index)),
            ("val", Fix::from(val)),
            ("flag", Fix::from(flag)),
        ];
        let path = finder.make_filename(fixes, true).unwrap();
        let name = path
            .to_str()
            .unwrap()
            .replace(std::path::MAIN_SEPARATOR, "/");

        let matches = finder.find_matches(&name).unwrap();
        prop_assert_eq!(matches.get_value("Y").unwrap(), Value::Int(year));
        prop_assert_eq!(matches.get_value("m").unwrap(), Value::Int(month));
        prop_assert_eq!(matches.get_value("idx").unwrap(), Value::Int(index));
        prop_assert_eq!(matches.get_value("val").unwrap(), Value::Float(val));
        prop_assert_eq!(matches.get_value("flag").unwrap(), Value::Bool(flag));
    }
}

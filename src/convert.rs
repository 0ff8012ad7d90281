//! Converters turn a property's string value into a typed value.
//!
//! A converter is anything implementing [`Converter<T>`], which includes
//! every `Fn(&str) -> Result<T, FormatError>`. The functions here build the
//! common ones and compose: `list(",", int_in_range(1, 65535))` parses a
//! comma-separated list of ports.
//!
//! Failures are plain [`FormatError`]s. The registry (or
//! [`Property::value_as`](crate::Property::value_as)) adds the property name
//! and location.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;
use std::num::IntErrorKind;

use crate::error::FormatError;

pub trait Converter<T> {
    fn convert(&self, raw: &str) -> Result<T, FormatError>;
}

impl<T, F> Converter<T> for F
where
    F: Fn(&str) -> Result<T, FormatError>,
{
    fn convert(&self, raw: &str) -> Result<T, FormatError> {
        self(raw)
    }
}

pub fn string() -> impl Converter<String> {
    |raw: &str| Ok(raw.to_string())
}

/// The value with surrounding whitespace removed.
pub fn trimmed() -> impl Converter<String> {
    |raw: &str| Ok(raw.trim().to_string())
}

/// A decimal integer, or hexadecimal with a `0x` prefix.
pub fn int() -> impl Converter<i64> {
    parse_int
}

pub fn int_in_range(min: i64, max: i64) -> impl Converter<i64> {
    move |raw: &str| check_range(parse_int(raw)?, min, max, i64::MIN, i64::MAX)
}

pub fn int_in_set(values: impl IntoIterator<Item = i64>) -> impl Converter<i64> {
    let legal: BTreeSet<i64> = values.into_iter().collect();
    move |raw: &str| {
        let v = parse_int(raw)?;
        if legal.contains(&v) {
            Ok(v)
        } else {
            Err(not_one_of(legal.iter()))
        }
    }
}

/// A finite floating-point number.
pub fn double() -> impl Converter<f64> {
    parse_double
}

pub fn double_in_range(min: f64, max: f64) -> impl Converter<f64> {
    move |raw: &str| check_range(parse_double(raw)?, min, max, f64::MIN, f64::MAX)
}

pub fn double_in_set(values: impl IntoIterator<Item = f64>) -> impl Converter<f64> {
    let mut legal: Vec<f64> = values.into_iter().collect();
    legal.sort_by(f64::total_cmp);
    move |raw: &str| {
        let v = parse_double(raw)?;
        if legal.contains(&v) {
            Ok(v)
        } else {
            Err(not_one_of(legal.iter()))
        }
    }
}

/// A string between `min` and `max` (inclusive) in byte-wise order.
pub fn string_in_range(min: impl Into<String>, max: impl Into<String>) -> impl Converter<String> {
    let (min, max) = (min.into(), max.into());
    move |raw: &str| {
        if raw < min.as_str() || raw > max.as_str() {
            return Err(FormatError::new(format!(
                "Value must be between \"{min}\" and \"{max}\" (inclusive)"
            )));
        }
        Ok(raw.to_string())
    }
}

pub fn string_in_set<S: Into<String>>(values: impl IntoIterator<Item = S>) -> impl Converter<String> {
    let legal: BTreeSet<String> = values.into_iter().map(Into::into).collect();
    move |raw: &str| {
        if legal.contains(raw) {
            Ok(raw.to_string())
        } else {
            Err(not_one_of(legal.iter().map(|s| format!("\"{s}\""))))
        }
    }
}

/// A `separator`-delimited list, each item stripped and converted by `item`.
///
/// A blank value is an empty list; a blank item is an error.
pub fn list<T>(separator: impl Into<String>, item: impl Converter<T>) -> impl Converter<Vec<T>> {
    let separator = separator.into();
    move |raw: &str| split_items(raw, &separator).map(|s| convert_item(&item, s)).collect()
}

/// Like [`list`], collected into an ordered set. Repeated items collapse.
pub fn set<T: Ord>(
    separator: impl Into<String>,
    item: impl Converter<T>,
) -> impl Converter<BTreeSet<T>> {
    let separator = separator.into();
    move |raw: &str| split_items(raw, &separator).map(|s| convert_item(&item, s)).collect()
}

fn split_items<'a>(raw: &'a str, separator: &'a str) -> impl Iterator<Item = &'a str> {
    let blank = raw.trim().is_empty();
    raw.split(separator)
        .take_while(move |_| !blank)
        .map(str::trim)
}

fn convert_item<T>(item: &impl Converter<T>, text: &str) -> Result<T, FormatError> {
    if text.is_empty() {
        return Err(FormatError::new("List contains a missing value"));
    }
    item.convert(text).map_err(|e| FormatError {
        value: Some(e.value.unwrap_or_else(|| text.to_string())),
        description: e.description,
    })
}

/// Maps symbolic names to values, e.g. log level names to an enum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueMap<V> {
    values: BTreeMap<String, V>,
}

impl<V> Default for ValueMap<V> {
    fn default() -> Self {
        Self {
            values: BTreeMap::new(),
        }
    }
}

impl<V: Clone> ValueMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: impl Into<String>, value: V) {
        self.values.insert(name.into(), value);
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn get(&self, name: &str) -> Result<V, FormatError> {
        self.values.get(name).cloned().ok_or_else(|| {
            let keys: Vec<_> = self.keys().collect();
            FormatError::with_value(
                name,
                format!("Legal values are \"{}\"", keys.join("\", \"")),
            )
        })
    }
}

impl<S: Into<String>, V: Clone> FromIterator<(S, V)> for ValueMap<V> {
    fn from_iter<I: IntoIterator<Item = (S, V)>>(iter: I) -> Self {
        let mut map = ValueMap::new();
        for (name, value) in iter {
            map.add(name, value);
        }
        map
    }
}

impl<V: Clone> Converter<V> for ValueMap<V> {
    fn convert(&self, raw: &str) -> Result<V, FormatError> {
        self.get(raw)
    }
}

fn parse_int(raw: &str) -> Result<i64, FormatError> {
    let (negative, digits) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw.strip_prefix('+').unwrap_or(raw)),
    };
    let parsed = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        Some(hex) if !hex.starts_with(['+', '-']) => {
            let signed = if negative { format!("-{hex}") } else { hex.to_string() };
            i64::from_str_radix(&signed, 16)
        }
        Some(_) => return Err(FormatError::new("Value is not a valid integer")),
        None if digits.starts_with(['+', '-']) => {
            return Err(FormatError::new("Value is not a valid integer"));
        }
        None => raw.parse::<i64>(),
    };
    parsed.map_err(|e| match e.kind() {
        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => {
            FormatError::new("Value is out of range")
        }
        _ => FormatError::new("Value is not a valid integer"),
    })
}

fn parse_double(raw: &str) -> Result<f64, FormatError> {
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        Ok(v) if v.is_nan() => Err(FormatError::new("Value is not a valid number")),
        Ok(_) => Err(FormatError::new("Value is out of range")),
        Err(_) => Err(FormatError::new("Value is not a valid number")),
    }
}

/// `unbounded_min`/`unbounded_max` mark a side with no limit, which changes
/// the wording.
fn check_range<T: PartialOrd + Display>(
    v: T,
    min: T,
    max: T,
    unbounded_min: T,
    unbounded_max: T,
) -> Result<T, FormatError> {
    if v >= min && v <= max {
        return Ok(v);
    }
    let description = if min == unbounded_min {
        format!("Value must be at most {max}")
    } else if max == unbounded_max {
        format!("Value must be at least {min}")
    } else {
        format!("Value must be between {min} and {max} (inclusive)")
    };
    Err(FormatError::new(description))
}

fn not_one_of<T: Display>(legal: impl Iterator<Item = T>) -> FormatError {
    let legal: Vec<String> = legal.map(|v| v.to_string()).collect();
    FormatError::new(format!("Value must be one of {}", legal.join(", ")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn err<T: std::fmt::Debug>(r: Result<T, FormatError>) -> FormatError {
        r.unwrap_err()
    }

    #[test]
    fn strings() {
        assert_eq!(string().convert("  a b ").unwrap(), "  a b ");
        assert_eq!(trimmed().convert("  a b ").unwrap(), "a b");
    }

    #[test]
    fn integers() {
        let c = int();
        assert_eq!(c.convert("42").unwrap(), 42);
        assert_eq!(c.convert("-7").unwrap(), -7);
        assert_eq!(c.convert("+7").unwrap(), 7);
        assert_eq!(c.convert("0x1F").unwrap(), 31);
        assert_eq!(c.convert("-0x10").unwrap(), -16);
        assert_eq!(err(c.convert("4x")).description, "Value is not a valid integer");
        assert_eq!(err(c.convert("")).description, "Value is not a valid integer");
        assert_eq!(err(c.convert("--1")).description, "Value is not a valid integer");
        assert_eq!(err(c.convert("0x-1")).description, "Value is not a valid integer");
        assert_eq!(err(c.convert(" 1")).description, "Value is not a valid integer");
        assert_eq!(
            err(c.convert("99999999999999999999")).description,
            "Value is out of range"
        );
    }

    #[test]
    fn integer_range() {
        let c = int_in_range(1, 10);
        assert_eq!(c.convert("1").unwrap(), 1);
        assert_eq!(c.convert("10").unwrap(), 10);
        assert_eq!(
            err(c.convert("11")).description,
            "Value must be between 1 and 10 (inclusive)"
        );
        assert_eq!(
            err(int_in_range(i64::MIN, 0).convert("1")).description,
            "Value must be at most 0"
        );
        assert_eq!(
            err(int_in_range(5, i64::MAX).convert("1")).description,
            "Value must be at least 5"
        );
    }

    #[test]
    fn integer_set() {
        let c = int_in_set([8, 2, 4]);
        assert_eq!(c.convert("4").unwrap(), 4);
        assert_eq!(err(c.convert("3")).description, "Value must be one of 2, 4, 8");
    }

    #[test]
    fn doubles() {
        assert_eq!(double().convert("2.5").unwrap(), 2.5);
        assert_eq!(double().convert("-1e3").unwrap(), -1000.0);
        assert_eq!(err(double().convert("abc")).description, "Value is not a valid number");
        assert_eq!(err(double().convert("inf")).description, "Value is out of range");
        assert_eq!(err(double().convert("1e999")).description, "Value is out of range");
        assert_eq!(err(double().convert("NaN")).description, "Value is not a valid number");
        let r = double_in_range(0.0, 1.0);
        assert_eq!(r.convert("0.25").unwrap(), 0.25);
        assert_eq!(
            err(r.convert("1.5")).description,
            "Value must be between 0 and 1 (inclusive)"
        );
        let s = double_in_set([0.5, 0.25]);
        assert_eq!(s.convert("0.5").unwrap(), 0.5);
        assert_eq!(err(s.convert("1")).description, "Value must be one of 0.25, 0.5");
    }

    #[test]
    fn string_range_and_set() {
        let r = string_in_range("b", "d");
        assert_eq!(r.convert("c").unwrap(), "c");
        assert_eq!(
            err(r.convert("e")).description,
            "Value must be between \"b\" and \"d\" (inclusive)"
        );
        let s = string_in_set(["red", "green"]);
        assert_eq!(s.convert("red").unwrap(), "red");
        assert_eq!(
            err(s.convert("blue")).description,
            "Value must be one of \"green\", \"red\""
        );
    }

    #[test]
    fn lists_strip_items() {
        let c = list(",", int());
        assert_eq!(c.convert(" 1, 2 ,3 ").unwrap(), vec![1, 2, 3]);
        assert_eq!(c.convert("").unwrap(), Vec::<i64>::new());
        assert_eq!(c.convert("   ").unwrap(), Vec::<i64>::new());
        let words = list("|", string());
        assert_eq!(words.convert("a b| c").unwrap(), vec!["a b", "c"]);
    }

    #[test]
    fn list_rejects_missing_item() {
        let e = err(list(",", string()).convert("a,,b"));
        assert_eq!(e.description, "List contains a missing value");
        let e = err(list(",", string()).convert("a, "));
        assert_eq!(e.description, "List contains a missing value");
    }

    #[test]
    fn list_item_error_names_item() {
        let e = err(list(",", int_in_range(1, 5)).convert("1, 9, 2"));
        assert_eq!(e.value.as_deref(), Some("9"));
        assert!(e.description.contains("between 1 and 5"));
    }

    #[test]
    fn sets_collapse_duplicates() {
        let c = set(",", string_in_set(["a", "b", "c"]));
        let got = c.convert("c, a, c").unwrap();
        assert_eq!(got.into_iter().collect::<Vec<_>>(), ["a", "c"]);
        assert!(c.convert("a, z").is_err());
    }

    #[test]
    fn value_map_lookup() {
        #[derive(Debug, Clone, Copy, PartialEq)]
        enum Level {
            Low,
            High,
        }
        let levels: ValueMap<Level> = [("low", Level::Low), ("high", Level::High)]
            .into_iter()
            .collect();
        assert_eq!(levels.len(), 2);
        assert_eq!(levels.convert("high").unwrap(), Level::High);
        let e = err(levels.convert("mid"));
        assert_eq!(e.value.as_deref(), Some("mid"));
        assert_eq!(e.description, "Legal values are \"high\", \"low\"");
        let list_of = list(",", levels.clone());
        assert_eq!(list_of.convert("low,high").unwrap(), vec![Level::Low, Level::High]);
    }

    #[test]
    fn closures_are_converters() {
        let hex_color = |raw: &str| -> Result<u32, FormatError> {
            let digits = raw
                .strip_prefix('#')
                .ok_or_else(|| FormatError::new("Value does not begin with '#'"))?;
            u32::from_str_radix(digits, 16).map_err(|_| FormatError::new("Bad color"))
        };
        assert_eq!(hex_color.convert("#ff0000").unwrap(), 0xff0000);
        assert!(list(",", hex_color).convert("#00ff00, red").is_err());
    }
}

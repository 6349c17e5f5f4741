//! Column type predicate.
//!
//! The numeric kind is split in two: whole numbers belong to `int`, numbers
//! with a fractional part belong to `double`. A whole number is never a valid
//! `double` and a fractional number is never a valid `int`.

use serde_json::{Number, Value};

use crate::types::{CellValue, ColumnType};

/// Returns true iff `value` may be written to a column of `column_type`.
///
/// Never panics. Nulls, arrays and objects are rejected for every type.
pub fn is_same_type(value: &Value, column_type: ColumnType) -> bool {
    match (value, column_type) {
        (Value::Bool(_), ColumnType::Boolean) => true,
        (Value::String(_), ColumnType::String) => true,
        (Value::Number(n), ColumnType::Int) => integral(n).is_some(),
        (Value::Number(n), ColumnType::Double) => is_fractional(n),
        _ => false,
    }
}

/// Integral reading of `n`, if it has no fractional part.
///
/// Whole floats that fit `i64` are normalized to integer form so that `2.0`
/// and `2` store the same literal. Larger ones keep their float form.
pub(crate) fn integral(n: &Number) -> Option<Number> {
    if n.is_i64() || n.is_u64() {
        return Some(n.clone());
    }
    let f = n.as_f64()?;
    if !f.is_finite() || f.fract() != 0.0 {
        return None;
    }
    // i64::MAX is not representable as f64; the bound is the next power of two.
    if f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(Number::from(f as i64))
    } else {
        Number::from_f64(f)
    }
}

fn is_fractional(n: &Number) -> bool {
    if n.is_i64() || n.is_u64() {
        return false;
    }
    n.as_f64().is_some_and(|f| f.is_finite() && f.fract() != 0.0)
}

impl CellValue {
    /// Converts an accepted JSON value into the literal stored for the column.
    ///
    /// Returns `None` whenever [`is_same_type`] would return false.
    pub fn from_json(value: &Value, column_type: ColumnType) -> Option<CellValue> {
        match (value, column_type) {
            (Value::Bool(b), ColumnType::Boolean) => Some(CellValue::Boolean(*b)),
            (Value::String(s), ColumnType::String) => Some(CellValue::String(s.clone())),
            (Value::Number(n), ColumnType::Int) => integral(n).map(CellValue::Int),
            (Value::Number(n), ColumnType::Double) if is_fractional(n) => {
                n.as_f64().map(CellValue::Double)
            }
            _ => None,
        }
    }

    /// Whether this stored literal satisfies the column type.
    pub fn matches(&self, column_type: ColumnType) -> bool {
        match (self, column_type) {
            (CellValue::Boolean(_), ColumnType::Boolean) => true,
            (CellValue::String(_), ColumnType::String) => true,
            (CellValue::Int(n), ColumnType::Int) => integral(n).is_some(),
            (CellValue::Double(d), ColumnType::Double) => d.is_finite() && d.fract() != 0.0,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_boolean_and_string_columns() {
        assert!(is_same_type(&json!(true), ColumnType::Boolean));
        assert!(is_same_type(&json!(false), ColumnType::Boolean));
        assert!(!is_same_type(&json!("true"), ColumnType::Boolean));
        assert!(!is_same_type(&json!(1), ColumnType::Boolean));

        assert!(is_same_type(&json!("hello"), ColumnType::String));
        assert!(is_same_type(&json!(""), ColumnType::String));
        assert!(!is_same_type(&json!(1), ColumnType::String));
        assert!(!is_same_type(&json!(false), ColumnType::String));
    }

    #[test]
    fn test_numeric_split_is_exclusive_and_exhaustive() {
        let samples = [
            json!(0),
            json!(-7),
            json!(42),
            json!(2.0),
            json!(-3.0),
            json!(0.5),
            json!(-1.25),
            json!(1e15),
            json!(123456.789),
            json!(1e20),
            json!(-1e19),
            json!(u64::MAX),
            json!(i64::MIN),
        ];
        for v in &samples {
            let int = is_same_type(v, ColumnType::Int);
            let double = is_same_type(v, ColumnType::Double);
            assert!(int ^ double, "exactly one numeric type must accept {}", v);
            let integral = v.as_f64().unwrap().fract() == 0.0;
            assert_eq!(int, integral, "int acceptance of {}", v);
        }
    }

    #[test]
    fn test_whole_float_is_int_not_double() {
        assert!(is_same_type(&json!(2.0), ColumnType::Int));
        assert!(!is_same_type(&json!(2.0), ColumnType::Double));
        assert!(!is_same_type(&json!(2.5), ColumnType::Int));
        assert!(is_same_type(&json!(2.5), ColumnType::Double));
    }

    #[test]
    fn test_malformed_values_are_rejected() {
        for t in ColumnType::ALL {
            assert!(!is_same_type(&Value::Null, t));
            assert!(!is_same_type(&json!([1]), t));
            assert!(!is_same_type(&json!({"a": 1}), t));
        }
    }

    #[test]
    fn test_integral_values_beyond_i64_are_int() {
        for v in [json!(1e20), json!(-1e19), json!(u64::MAX)] {
            assert!(is_same_type(&v, ColumnType::Int), "{} as int", v);
            assert!(!is_same_type(&v, ColumnType::Double), "{} as double", v);
            let cell = CellValue::from_json(&v, ColumnType::Int).unwrap();
            assert!(cell.matches(ColumnType::Int));
            assert_eq!(cell.to_json().as_f64(), v.as_f64());
        }
        assert_eq!(
            CellValue::from_json(&json!(u64::MAX), ColumnType::Int),
            Some(CellValue::Int(Number::from(u64::MAX)))
        );
    }

    #[test]
    fn test_from_json_agrees_with_predicate() {
        let samples = [
            json!(true),
            json!("x"),
            json!(3),
            json!(3.0),
            json!(3.5),
            Value::Null,
        ];
        for v in &samples {
            for t in ColumnType::ALL {
                let converted = CellValue::from_json(v, t);
                assert_eq!(converted.is_some(), is_same_type(v, t), "{} as {}", v, t);
                if let Some(cell) = converted {
                    assert!(cell.matches(t));
                }
            }
        }
        assert_eq!(CellValue::from_json(&json!(3.0), ColumnType::Int), Some(CellValue::int(3)));
    }

    #[test]
    fn test_matches_rejects_whole_double() {
        assert!(!CellValue::Double(4.0).matches(ColumnType::Double));
        assert!(CellValue::Double(4.5).matches(ColumnType::Double));
        assert!(!CellValue::int(4).matches(ColumnType::Double));
    }
}

//! Field extraction shared by the per-exchange normalizers.
//!
//! Exchanges report numbers either as JSON numbers or as decimal strings, and
//! omit fields freely. Everything here returns `Option` so each normalizer can
//! spell out its fallback order explicitly.

use serde_json::Value;

/// Numeric field `key` of `row`, accepting numbers and numeric strings.
pub fn number(row: &Value, key: &str) -> Option<f64> {
    let v = row.get(key)?;
    let n = v
        .as_f64()
        .or_else(|| v.as_str().and_then(|s| s.trim().parse::<f64>().ok()))?;
    n.is_finite().then_some(n)
}

/// Same as [`number`] but reads through an optional row.
pub fn field(row: Option<&Value>, key: &str) -> Option<f64> {
    row.and_then(|r| number(r, key))
}

/// First candidate that is present and strictly positive, in the given order.
pub fn first_positive<I>(candidates: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    candidates.into_iter().flatten().find(|p| *p > 0.0)
}

/// `numerator / denominator` when the denominator is positive.
pub fn ratio(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    let (n, d) = (numerator?, denominator?);
    (d > 0.0).then(|| n / d)
}

/// A ticker payload that is either a bare object or a one-element array of objects.
pub fn single_row(v: &Value) -> Option<&Value> {
    match v {
        Value::Array(rows) => rows.first().filter(|r| r.is_object()),
        Value::Object(_) => Some(v),
        _ => None,
    }
}

/// First element of the array at `path` (e.g. `["result", "list"]`).
pub fn first_in(v: &Value, path: &[&str]) -> Option<Value> {
    let mut cur = v;
    for key in path {
        cur = cur.get(*key)?;
    }
    cur.as_array()?.first().cloned()
}

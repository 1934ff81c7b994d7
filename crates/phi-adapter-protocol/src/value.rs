//! Scalar values for command and state payloads.

use std::fmt::Write as _;

use crate::error::JsonResult;
use crate::json;

/// Hot-path value container used for channel values, action results, and
/// error parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ScalarValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

/// Ordered sequence of scalars.
pub type ScalarList = Vec<ScalarValue>;

impl ScalarValue {
    /// Appends the JSON form of this scalar. Non-finite floats encode as
    /// `null`; integers keep their integer form.
    pub fn append_json(&self, out: &mut String) {
        match self {
            Self::Null => out.push_str("null"),
            Self::Bool(value) => out.push_str(if *value { "true" } else { "false" }),
            Self::Int(value) => {
                let _ = write!(out, "{value}");
            }
            Self::Float(value) => {
                if value.is_finite() {
                    let _ = write!(out, "{value}");
                } else {
                    out.push_str("null");
                }
            }
            Self::Text(value) => json::append_quoted(out, value),
        }
    }

    /// JSON form of this scalar as an owned string.
    pub fn to_json(&self) -> String {
        let mut out = String::new();
        self.append_json(&mut out);
        out
    }
}

impl From<bool> for ScalarValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for ScalarValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for ScalarValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<String> for ScalarValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for ScalarValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Decodes one raw JSON token into a scalar, dispatching on its first
/// character: quote → string, `t`/`f` → bool, `n` → null, otherwise number.
/// A number token is a float iff it contains `.`, `e`, or `E`.
pub fn decode_scalar(token: &str) -> Option<ScalarValue> {
    let token = json::trim_ws(token);
    if token.is_empty() {
        return None;
    }
    if token.starts_with('"') {
        return json::decode_string(token).ok().map(ScalarValue::Text);
    }
    match token {
        "true" => Some(ScalarValue::Bool(true)),
        "false" => Some(ScalarValue::Bool(false)),
        "null" => Some(ScalarValue::Null),
        _ => {
            if token.contains(['.', 'e', 'E']) {
                json::decode_f64(token).map(ScalarValue::Float)
            } else {
                json::decode_i64(token).map(ScalarValue::Int)
            }
        }
    }
}

/// Decodes a JSON array token into a scalar list.
pub fn decode_scalar_list(token: &str) -> JsonResult<Option<ScalarList>> {
    let elements = json::parse_array_elements(token)?;
    let mut values = ScalarList::with_capacity(elements.len());
    for element in elements {
        match decode_scalar(element) {
            Some(value) => values.push(value),
            None => return Ok(None),
        }
    }
    Ok(Some(values))
}

/// Appends a JSON array of scalars.
pub fn append_scalar_list(out: &mut String, values: &[ScalarValue]) {
    out.push('[');
    let mut first = true;
    for value in values {
        if !first {
            out.push(',');
        }
        first = false;
        value.append_json(out);
    }
    out.push(']');
}
